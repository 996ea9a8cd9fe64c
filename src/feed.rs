//! Feed composition: one deterministic pass over independent sources,
//! producing an ordered sequence of typed entries.
//!
//! Section order is fixed by construction: greeting, regime, price pair,
//! posture (or anonymous CTA), allocation insights, market-context divider,
//! metric snippets, recent signals with temporal grouping, educational
//! entries. Missing optional sources silently skip their section; compose
//! never fails.

use chrono::{DateTime, Duration, Timelike, Utc};
use serde::Serialize;

use crate::records::{LearnItem, MarketMetrics, PortfolioSnapshot, RegimeStatus, SignalNote};
use crate::regime_config;

/// Allocation gap thresholds for the inline feed insights, percentage points.
const FEED_BTC_GAP_PP: f64 = 3.0;
const FEED_ETH_GAP_PP: f64 = 5.0;
/// Confidence narrative bands, 0-1.
const HIGH_CONFIDENCE: f64 = 0.70;
const MODERATE_CONFIDENCE: f64 = 0.50;
/// Caps on trailing sections.
const MAX_SIGNALS: usize = 5;
const MAX_LEARN: usize = 2;

/// One discrete unit of feed content. Renderers switch on `kind`.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FeedEntry {
    Greeting {
        text: String,
    },
    Regime {
        regime: String,
        display_label: String,
        color: String,
        icon: String,
        narrative: String,
    },
    PricePair {
        btc_price: f64,
        eth_price: f64,
    },
    Posture {
        posture: String,
        misalignment_pct: f64,
    },
    Insight {
        icon: String,
        variant: String,
        text: String,
        subtext: Option<String>,
        link: Option<String>,
    },
    MarketSnippet {
        label: String,
        value: String,
    },
    Signal {
        asset: String,
        action: String,
        severity: u8,
        reason: String,
        time_text: String,
    },
    Learn {
        title: String,
        body: String,
        link: Option<String>,
    },
    Divider {
        label: Option<String>,
    },
    AnonymousCta {
        text: String,
    },
}

/// Everything the composer may draw on. Any field may be empty or absent.
#[derive(Debug, Clone, Default)]
pub struct FeedSources {
    /// None = unauthenticated viewer.
    pub user_name: Option<String>,
    pub regime: Option<RegimeStatus>,
    pub btc_price: Option<f64>,
    pub eth_price: Option<f64>,
    pub portfolio: Option<PortfolioSnapshot>,
    pub metrics: Option<MarketMetrics>,
    /// Most-recent-first.
    pub signals: Vec<SignalNote>,
    pub learn_items: Vec<LearnItem>,
    pub explainer: Option<LearnItem>,
}

/// Composer output: ordered entries plus one rendering flag.
#[derive(Debug, Clone, Serialize)]
pub struct ComposedFeed {
    pub entries: Vec<FeedEntry>,
    /// Set only for authenticated users with zero holdings.
    pub show_empty_portfolio_cta: bool,
}

/// Assemble the feed. `now` drives the greeting and signal bucketing and is
/// injected for determinism.
pub fn compose(sources: &FeedSources, now: DateTime<Utc>) -> ComposedFeed {
    let mut entries = Vec::new();
    let mut show_empty_portfolio_cta = false;
    let authenticated = sources.user_name.is_some();
    let has_holdings = sources
        .portfolio
        .as_ref()
        .is_some_and(|p| !p.allocations.is_empty());

    // (1) Greeting, always.
    entries.push(FeedEntry::Greeting { text: greeting_text(sources.user_name.as_deref(), now) });

    // (2) Regime narrative.
    if let Some(status) = &sources.regime {
        let cfg = regime_config::resolve(&status.regime);
        entries.push(FeedEntry::Regime {
            regime: cfg.key.to_string(),
            display_label: cfg.label.to_string(),
            color: cfg.color.to_string(),
            icon: cfg.icon.to_string(),
            narrative: regime_narrative(status, cfg.label),
        });
    }

    // (3) Price pair requires both legs.
    if let (Some(btc), Some(eth)) = (sources.btc_price, sources.eth_price) {
        entries.push(FeedEntry::PricePair { btc_price: btc, eth_price: eth });
    }

    // (4) Posture slot.
    if authenticated {
        match &sources.portfolio {
            Some(p) if !p.allocations.is_empty() => {
                entries.push(FeedEntry::Posture {
                    posture: p.posture.clone(),
                    misalignment_pct: (p.misalignment * 100.0).round(),
                });
            }
            _ => show_empty_portfolio_cta = true,
        }
    } else {
        entries.push(FeedEntry::AnonymousCta {
            text: "Sign in to see how your portfolio lines up with the current regime.".to_string(),
        });
    }

    // (5) Allocation deviation insights, authenticated holders only.
    if authenticated && has_holdings {
        if let Some(p) = &sources.portfolio {
            push_gap_insight(&mut entries, p, "BTC", FEED_BTC_GAP_PP);
            push_gap_insight(&mut entries, p, "ETH", FEED_ETH_GAP_PP);
        }
    }

    // (6) Market context divider, always.
    entries.push(FeedEntry::Divider { label: Some("Market context".to_string()) });

    // (7) Metric snippets, each independently optional.
    if let Some(m) = &sources.metrics {
        push_metric_snippets(&mut entries, m);
    }

    // (8) Recent signals with temporal grouping, authenticated only.
    if authenticated {
        push_signal_section(&mut entries, &sources.signals, now);
    }

    // (9) Educational tail.
    if sources.learn_items.len() >= 2 {
        for item in sources.learn_items.iter().take(MAX_LEARN) {
            entries.push(FeedEntry::Learn {
                title: item.title.clone(),
                body: item.body.clone(),
                link: item.link.clone(),
            });
        }
    } else if let Some(item) = &sources.explainer {
        entries.push(FeedEntry::Learn {
            title: item.title.clone(),
            body: item.body.clone(),
            link: item.link.clone(),
        });
    }

    ComposedFeed { entries, show_empty_portfolio_cta }
}

fn greeting_text(user_name: Option<&str>, now: DateTime<Utc>) -> String {
    let salutation = match now.hour() {
        5..=11 => "Good morning",
        12..=17 => "Good afternoon",
        _ => "Good evening",
    };
    match user_name {
        Some(name) => format!("{}, {}.", salutation, name),
        None => format!("{}.", salutation),
    }
}

fn regime_narrative(status: &RegimeStatus, display_label: &str) -> String {
    let days = status.persistence_days.max(1);
    let confidence = if status.confidence >= HIGH_CONFIDENCE {
        "Confidence is high."
    } else if status.confidence >= MODERATE_CONFIDENCE {
        "Confidence is moderate."
    } else {
        "Confidence is weak — the regime may shift."
    };
    format!(
        "{} for {} day{}. {}",
        display_label,
        days,
        if days == 1 { "" } else { "s" },
        confidence
    )
}

fn push_gap_insight(entries: &mut Vec<FeedEntry>, p: &PortfolioSnapshot, asset: &str, threshold_pp: f64) {
    let Some(alloc) = p.allocation(asset) else {
        return;
    };
    let gap = alloc.gap_pp();
    if gap.abs() <= threshold_pp {
        return;
    }
    let direction = if gap > 0.0 { "above" } else { "below" };
    entries.push(FeedEntry::Insight {
        icon: "scale".to_string(),
        variant: "warn".to_string(),
        text: format!("{} is {:.1}pp {} its target allocation.", asset, gap.abs(), direction),
        subtext: None,
        link: Some("/rebalance".to_string()),
    });
}

fn push_metric_snippets(entries: &mut Vec<FeedEntry>, m: &MarketMetrics) {
    if let Some(value) = m.fear_greed {
        let value_text = match &m.fear_greed_label {
            Some(label) => format!("{} ({})", value, label),
            None => value.to_string(),
        };
        entries.push(FeedEntry::MarketSnippet {
            label: "Fear & Greed".to_string(),
            value: value_text,
        });
    }
    if let Some(dom) = m.btc_dominance_pct {
        entries.push(FeedEntry::MarketSnippet {
            label: "BTC dominance".to_string(),
            value: format!("{:.1}%", dom),
        });
    }
    if let Some(alt) = m.alt_season {
        entries.push(FeedEntry::MarketSnippet {
            label: "Altcoin season".to_string(),
            value: format!("{}/100", alt),
        });
    }
    if let Some(vol) = m.total_volume_usd {
        entries.push(FeedEntry::MarketSnippet {
            label: "24h volume".to_string(),
            value: format!("${:.1}B", vol / 1e9),
        });
    }
}

// =============================================================================
// Temporal grouping of signals
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimeBucket {
    Today,
    Yesterday,
    Older,
}

impl TimeBucket {
    fn divider_label(self) -> &'static str {
        match self {
            TimeBucket::Today => "Today",
            TimeBucket::Yesterday => "Yesterday",
            TimeBucket::Older => "Earlier",
        }
    }
}

/// Bucket a signal's time text relative to `now`. Parseable timestamps are
/// compared by calendar date; free text falls back to keyword matching, and
/// anything unrecognized lands in `Older`.
fn classify_bucket(time_text: &str, now: DateTime<Utc>) -> TimeBucket {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(time_text) {
        let date = parsed.with_timezone(&Utc).date_naive();
        let today = now.date_naive();
        if date == today {
            return TimeBucket::Today;
        }
        if date == today - Duration::days(1) {
            return TimeBucket::Yesterday;
        }
        return TimeBucket::Older;
    }

    let lower = time_text.trim().to_ascii_lowercase();
    if lower.contains("yesterday") || lower == "1d ago" || lower == "1 day ago" {
        return TimeBucket::Yesterday;
    }
    if lower.contains("just now")
        || lower.contains("today")
        || lower.contains("min")
        || lower.contains("hour")
        || lower.ends_with("m ago")
        || lower.ends_with("h ago")
    {
        return TimeBucket::Today;
    }
    TimeBucket::Older
}

/// Append up to `MAX_SIGNALS` signal entries, inserting exactly one divider
/// at each bucket-boundary transition and never before the first item.
fn push_signal_section(entries: &mut Vec<FeedEntry>, signals: &[SignalNote], now: DateTime<Utc>) {
    let mut previous: Option<TimeBucket> = None;
    for signal in signals.iter().take(MAX_SIGNALS) {
        let bucket = classify_bucket(&signal.time_text, now);
        if previous.is_some_and(|p| p != bucket) {
            entries.push(FeedEntry::Divider {
                label: Some(bucket.divider_label().to_string()),
            });
        }
        previous = Some(bucket);
        entries.push(FeedEntry::Signal {
            asset: signal.asset.clone(),
            action: signal.action.clone(),
            severity: signal.severity.clamp(1, 3),
            reason: signal.reason.clone(),
            time_text: signal.time_text.clone(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::Allocation;
    use chrono::TimeZone;

    fn noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap()
    }

    fn signal(asset: &str, time_text: &str) -> SignalNote {
        SignalNote {
            asset: asset.into(),
            action: "reduce".into(),
            severity: 2,
            reason: "volatility expansion".into(),
            time_text: time_text.into(),
        }
    }

    fn holdings_portfolio() -> PortfolioSnapshot {
        PortfolioSnapshot {
            posture: "defensive".into(),
            misalignment: 0.2,
            allocations: vec![
                Allocation { asset: "BTC".into(), current_pct: 48.0, target_pct: 40.0 },
                Allocation { asset: "ETH".into(), current_pct: 22.0, target_pct: 20.0 },
            ],
        }
    }

    fn kinds(feed: &ComposedFeed) -> Vec<&'static str> {
        feed.entries
            .iter()
            .map(|e| match e {
                FeedEntry::Greeting { .. } => "greeting",
                FeedEntry::Regime { .. } => "regime",
                FeedEntry::PricePair { .. } => "price_pair",
                FeedEntry::Posture { .. } => "posture",
                FeedEntry::Insight { .. } => "insight",
                FeedEntry::MarketSnippet { .. } => "market_snippet",
                FeedEntry::Signal { .. } => "signal",
                FeedEntry::Learn { .. } => "learn",
                FeedEntry::Divider { .. } => "divider",
                FeedEntry::AnonymousCta { .. } => "anonymous_cta",
            })
            .collect()
    }

    #[test]
    fn empty_sources_still_produce_greeting_and_divider() {
        let feed = compose(&FeedSources::default(), noon());
        let k = kinds(&feed);
        assert_eq!(k, vec!["greeting", "anonymous_cta", "divider"]);
        assert!(!feed.show_empty_portfolio_cta);
    }

    #[test]
    fn anonymous_viewer_gets_no_posture_or_allocation_insights() {
        let sources = FeedSources {
            user_name: None,
            portfolio: Some(holdings_portfolio()),
            ..Default::default()
        };
        let feed = compose(&sources, noon());
        let k = kinds(&feed);
        assert!(!k.contains(&"posture"));
        assert!(!k.contains(&"insight"));
        assert!(k.contains(&"anonymous_cta"));
        assert!(!feed.show_empty_portfolio_cta);
    }

    #[test]
    fn authenticated_empty_portfolio_sets_cta_flag() {
        let sources = FeedSources {
            user_name: Some("Kim".into()),
            portfolio: Some(PortfolioSnapshot {
                posture: "none".into(),
                misalignment: 0.0,
                allocations: vec![],
            }),
            ..Default::default()
        };
        let feed = compose(&sources, noon());
        assert!(feed.show_empty_portfolio_cta);
        assert!(!kinds(&feed).contains(&"posture"));
        assert!(!kinds(&feed).contains(&"anonymous_cta"));
    }

    #[test]
    fn authenticated_holder_gets_posture_and_btc_gap_insight() {
        let sources = FeedSources {
            user_name: Some("Kim".into()),
            portfolio: Some(holdings_portfolio()),
            ..Default::default()
        };
        let feed = compose(&sources, noon());
        let k = kinds(&feed);
        assert!(k.contains(&"posture"));
        // BTC gap 8pp > 3pp fires; ETH gap 2pp <= 5pp does not.
        let insight_count = k.iter().filter(|&&s| s == "insight").count();
        assert_eq!(insight_count, 1);
    }

    #[test]
    fn price_pair_needs_both_legs() {
        let only_btc = FeedSources { btc_price: Some(64_000.0), ..Default::default() };
        assert!(!kinds(&compose(&only_btc, noon())).contains(&"price_pair"));

        let both = FeedSources {
            btc_price: Some(64_000.0),
            eth_price: Some(3_200.0),
            ..Default::default()
        };
        assert!(kinds(&compose(&both, noon())).contains(&"price_pair"));
    }

    #[test]
    fn regime_narrative_bands() {
        let status = RegimeStatus { regime: "bull".into(), persistence_days: 12, confidence: 0.82 };
        assert!(regime_narrative(&status, "Bull Market").contains("Confidence is high."));
        let status = RegimeStatus { regime: "bull".into(), persistence_days: 12, confidence: 0.55 };
        assert!(regime_narrative(&status, "Bull Market").contains("moderate"));
        let status = RegimeStatus { regime: "bull".into(), persistence_days: 12, confidence: 0.41 };
        assert!(regime_narrative(&status, "Bull Market").contains("may shift"));
    }

    #[test]
    fn one_divider_per_bucket_boundary() {
        let sources = FeedSources {
            user_name: Some("Kim".into()),
            signals: vec![
                signal("BTC", "2h ago"),
                signal("ETH", "5h ago"),
                signal("SOL", "yesterday"),
            ],
            ..Default::default()
        };
        let feed = compose(&sources, noon());
        let k = kinds(&feed);
        // One "Market context" divider plus exactly one bucket divider.
        let dividers = k.iter().filter(|&&s| s == "divider").count();
        assert_eq!(dividers, 2);
        // The bucket divider sits between the second and third signal.
        let tail: Vec<&&str> = k.iter().filter(|&&s| s == "signal" || s == "divider").collect();
        assert_eq!(tail[1..], [&"signal", &"signal", &"divider", &"signal"]);
    }

    #[test]
    fn no_divider_before_first_signal() {
        let sources = FeedSources {
            user_name: Some("Kim".into()),
            signals: vec![signal("BTC", "yesterday")],
            ..Default::default()
        };
        let feed = compose(&sources, noon());
        let k = kinds(&feed);
        let divider_idx = k.iter().rposition(|&s| s == "divider").unwrap();
        let signal_idx = k.iter().position(|&s| s == "signal").unwrap();
        // Only the market-context divider exists, and it precedes the signal.
        assert_eq!(k.iter().filter(|&&s| s == "divider").count(), 1);
        assert!(divider_idx < signal_idx);
    }

    #[test]
    fn signals_capped_at_five() {
        let sources = FeedSources {
            user_name: Some("Kim".into()),
            signals: (0..8).map(|i| signal("BTC", &format!("{}h ago", i + 1))).collect(),
            ..Default::default()
        };
        let feed = compose(&sources, noon());
        assert_eq!(kinds(&feed).iter().filter(|&&s| s == "signal").count(), 5);
    }

    #[test]
    fn rfc3339_timestamps_bucket_by_calendar_date() {
        assert_eq!(classify_bucket("2025-03-10T09:00:00Z", noon()), TimeBucket::Today);
        assert_eq!(classify_bucket("2025-03-09T23:30:00Z", noon()), TimeBucket::Yesterday);
        assert_eq!(classify_bucket("2025-03-01T10:00:00Z", noon()), TimeBucket::Older);
    }

    #[test]
    fn free_text_bucketing() {
        assert_eq!(classify_bucket("just now", noon()), TimeBucket::Today);
        assert_eq!(classify_bucket("45 min ago", noon()), TimeBucket::Today);
        assert_eq!(classify_bucket("3h ago", noon()), TimeBucket::Today);
        assert_eq!(classify_bucket("Yesterday", noon()), TimeBucket::Yesterday);
        assert_eq!(classify_bucket("last week", noon()), TimeBucket::Older);
        assert_eq!(classify_bucket("", noon()), TimeBucket::Older);
    }

    #[test]
    fn learn_section_prefers_multiple_items_over_explainer() {
        let learn = |t: &str| LearnItem { title: t.into(), body: "…".into(), link: None };
        let sources = FeedSources {
            learn_items: vec![learn("a"), learn("b"), learn("c")],
            explainer: Some(learn("explainer")),
            ..Default::default()
        };
        let feed = compose(&sources, noon());
        assert_eq!(kinds(&feed).iter().filter(|&&s| s == "learn").count(), 2);

        let sources = FeedSources {
            learn_items: vec![learn("a")],
            explainer: Some(learn("explainer")),
            ..Default::default()
        };
        let feed = compose(&sources, noon());
        let learns: Vec<&FeedEntry> = feed
            .entries
            .iter()
            .filter(|e| matches!(e, FeedEntry::Learn { .. }))
            .collect();
        assert_eq!(learns.len(), 1);
        assert!(matches!(learns[0], FeedEntry::Learn { title, .. } if title == "explainer"));
    }

    #[test]
    fn metric_snippets_are_independent() {
        let sources = FeedSources {
            metrics: Some(MarketMetrics {
                fear_greed: Some(72),
                fear_greed_label: Some("Greed".into()),
                btc_dominance_pct: None,
                alt_season: Some(31),
                total_volume_usd: None,
            }),
            ..Default::default()
        };
        let feed = compose(&sources, noon());
        assert_eq!(kinds(&feed).iter().filter(|&&s| s == "market_snippet").count(), 2);
    }

    #[test]
    fn greeting_follows_time_of_day() {
        let morning = Utc.with_ymd_and_hms(2025, 3, 10, 8, 0, 0).unwrap();
        assert!(greeting_text(Some("Kim"), morning).starts_with("Good morning"));
        let night = Utc.with_ymd_and_hms(2025, 3, 10, 23, 0, 0).unwrap();
        assert!(greeting_text(None, night).starts_with("Good evening"));
    }

    #[test]
    fn serialized_entries_carry_kind_tags() {
        let feed = compose(&FeedSources::default(), noon());
        let json = serde_json::to_value(&feed).unwrap();
        assert_eq!(json["entries"][0]["kind"], "greeting");
    }
}
