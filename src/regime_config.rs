//! Regime label → display configuration lookup.
//!
//! Upstream labels are free text; rendering needs a small closed set of
//! display configs. Resolution is layered: exact canonical key, then known
//! display-label variants, then substring containment, then the `range`
//! default. Total function — never fails, no side effects.

use serde::Serialize;

/// Display configuration for one canonical regime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RegimeConfig {
    pub key: &'static str,
    pub label: &'static str,
    pub color: &'static str,
    pub icon: &'static str,
}

pub const BULL: RegimeConfig = RegimeConfig {
    key: "bull",
    label: "Bull Market",
    color: "#16a34a",
    icon: "trending-up",
};

pub const BEAR: RegimeConfig = RegimeConfig {
    key: "bear",
    label: "Bear Market",
    color: "#dc2626",
    icon: "trending-down",
};

pub const RANGE: RegimeConfig = RegimeConfig {
    key: "range",
    label: "Range-Bound",
    color: "#64748b",
    icon: "move-horizontal",
};

pub const VOLATILE: RegimeConfig = RegimeConfig {
    key: "volatile",
    label: "High Volatility",
    color: "#d97706",
    icon: "zap",
};

const CANONICAL: [&RegimeConfig; 4] = [&BULL, &BEAR, &RANGE, &VOLATILE];

/// Display-label spellings seen in upstream data, mapped back to canon.
const VARIANTS: &[(&str, &RegimeConfig)] = &[
    ("bull market", &BULL),
    ("bullish", &BULL),
    ("uptrend", &BULL),
    ("bear market", &BEAR),
    ("bearish", &BEAR),
    ("downtrend", &BEAR),
    ("range-bound", &RANGE),
    ("ranging", &RANGE),
    ("sideways", &RANGE),
    ("neutral", &RANGE),
    ("high volatility", &VOLATILE),
    ("choppy", &VOLATILE),
    ("turbulent", &VOLATILE),
];

/// Resolve a free-text regime label to its display config.
pub fn resolve(label: &str) -> &'static RegimeConfig {
    let needle = label.trim().to_ascii_lowercase();

    for cfg in CANONICAL {
        if needle == cfg.key {
            return cfg;
        }
    }
    for (variant, cfg) in VARIANTS {
        if needle == *variant {
            return *cfg;
        }
    }
    // Containment order matters: "volatile bull" reads as bull first.
    if needle.contains("bull") {
        return &BULL;
    }
    if needle.contains("bear") {
        return &BEAR;
    }
    if needle.contains("volat") {
        return &VOLATILE;
    }
    &RANGE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_key_match_is_case_insensitive() {
        assert_eq!(resolve("BULL").key, "bull");
        assert_eq!(resolve("Bear").key, "bear");
        assert_eq!(resolve("volatile").key, "volatile");
    }

    #[test]
    fn display_label_variants_resolve() {
        assert_eq!(resolve("Bull Market").key, "bull");
        assert_eq!(resolve("Sideways").key, "range");
        assert_eq!(resolve("High Volatility").key, "volatile");
    }

    #[test]
    fn substring_containment_with_priority() {
        assert_eq!(resolve("early bull phase").key, "bull");
        assert_eq!(resolve("deep bear territory").key, "bear");
        assert_eq!(resolve("volatility spike").key, "volatile");
        // bull wins over volatile when both appear
        assert_eq!(resolve("volatile bull").key, "bull");
    }

    #[test]
    fn unknown_labels_default_to_range() {
        assert_eq!(resolve("").key, "range");
        assert_eq!(resolve("???").key, "range");
        assert_eq!(resolve("accumulation").key, "range");
    }
}
