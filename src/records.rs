//! Input shapes consumed by the analytics and feed cores.
//!
//! Everything here arrives already fetched and validated by the caller; the
//! core never reaches out for data. Record slices follow a newest-first
//! convention (index 0 is the most recent day) — functions that consume them
//! say so in their names or docs.

use serde::{Deserialize, Serialize};

/// One per-day regime classification row, produced upstream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegimeRecord {
    /// ISO-8601 timestamp of the classification.
    pub ts: String,
    /// Free-text regime label ("bull", "Bear Market", ...).
    pub regime: String,
    /// Label the regime changed from, when `changed` is set.
    #[serde(default)]
    pub previous_regime: Option<String>,
    /// True on the day the classifier flipped regimes.
    #[serde(default)]
    pub changed: bool,
    /// Classifier confidence, 0.0 - 1.0.
    pub confidence: f64,
    /// BTC spot price at classification time (0.0 = missing).
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub return_1d: f64,
    #[serde(default)]
    pub return_7d: f64,
    #[serde(default)]
    pub volatility_7d: f64,
    #[serde(default)]
    pub eth_price: f64,
    #[serde(default)]
    pub eth_return_7d: f64,
    #[serde(default)]
    pub eth_volatility_7d: f64,
}

impl RegimeRecord {
    /// Confidence clamped into [0, 1]; malformed rows never propagate
    /// out-of-range values into the aggregates.
    pub fn confidence_clamped(&self) -> f64 {
        self.confidence.clamp(0.0, 1.0)
    }
}

/// Current regime standing, distilled from the newest records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegimeStatus {
    pub regime: String,
    /// Consecutive most-recent days in this regime.
    pub persistence_days: usize,
    /// Confidence of the newest record, 0.0 - 1.0.
    pub confidence: f64,
}

/// One asset line of a user portfolio, in percent of total value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Allocation {
    pub asset: String,
    pub current_pct: f64,
    pub target_pct: f64,
}

impl Allocation {
    /// Signed gap between current and target, in percentage points.
    pub fn gap_pp(&self) -> f64 {
        self.current_pct - self.target_pct
    }
}

/// Portfolio state as supplied by the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioSnapshot {
    /// Qualitative posture label ("defensive", "aligned", ...).
    pub posture: String,
    /// Normalized divergence from regime targets, 0.0 - 1.0.
    pub misalignment: f64,
    #[serde(default)]
    pub allocations: Vec<Allocation>,
}

impl PortfolioSnapshot {
    pub fn allocation(&self, asset: &str) -> Option<&Allocation> {
        self.allocations
            .iter()
            .find(|a| a.asset.eq_ignore_ascii_case(asset))
    }

    /// Sum of allocation percentages matching a predicate.
    pub fn pct_where<F: Fn(&Allocation) -> bool>(&self, pred: F) -> f64 {
        self.allocations
            .iter()
            .filter(|a| pred(a))
            .map(|a| a.current_pct)
            .sum()
    }
}

/// Stablecoin test used by allocation insights. Symbol match, not an oracle.
pub fn is_stablecoin(asset: &str) -> bool {
    let upper = asset.to_ascii_uppercase();
    matches!(upper.as_str(), "USDT" | "USDC" | "DAI" | "TUSD" | "BUSD" | "FDUSD" | "USD")
}

/// A recent trading signal shown in the feed. `time_text` may be either a
/// parseable ISO-8601 timestamp or free text ("2h ago", "yesterday").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalNote {
    pub asset: String,
    pub action: String,
    /// Severity band 1-3 (3 = strongest).
    pub severity: u8,
    pub reason: String,
    pub time_text: String,
}

/// Broad market metrics; every field independently optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MarketMetrics {
    #[serde(default)]
    pub fear_greed: Option<u32>,
    #[serde(default)]
    pub fear_greed_label: Option<String>,
    #[serde(default)]
    pub btc_dominance_pct: Option<f64>,
    #[serde(default)]
    pub alt_season: Option<u32>,
    #[serde(default)]
    pub total_volume_usd: Option<f64>,
}

/// Educational content item surfaced at the end of the feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearnItem {
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub link: Option<String>,
}
