//! Period-level aggregation of regime runs into a renderable summary.

use serde::Serialize;

use crate::records::RegimeRecord;
use crate::regime_config;
use crate::runs::Run;
use crate::trajectory::{self, Trend};

/// Per-regime rollup across all runs of one label.
#[derive(Debug, Clone, Serialize)]
pub struct RegimeBreakdown {
    pub regime: String,
    /// Display label from the config resolver.
    pub display_label: String,
    pub total_days: usize,
    /// Number of distinct runs of this regime.
    pub instances: usize,
    pub avg_confidence: f64,
    /// Share of the period, rounded percent of total days.
    pub pct_of_period: u32,
    pub trend: Trend,
}

/// The full analytical summary for one query window. Recomputed per call,
/// never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct PeriodAggregate {
    pub total_days: usize,
    pub transition_count: usize,
    /// Rounded percent mean of per-record confidence.
    pub avg_confidence_pct: u32,
    /// Sorted by total_days descending.
    pub breakdowns: Vec<RegimeBreakdown>,
    /// Largest breakdown by days, if any.
    pub dominant: Option<RegimeBreakdown>,
    /// BTC price change over the period, percent. None without two valid
    /// prices.
    pub btc_period_change_pct: Option<f64>,
}

/// Combine chronological runs and the raw newest-first records into a
/// `PeriodAggregate`.
pub fn aggregate(runs: &[Run], records: &[RegimeRecord]) -> PeriodAggregate {
    let total_days = records.len();
    let transition_count = runs.len().saturating_sub(1);

    // Group runs by label. Newest run first so concatenated confidence
    // sequences stay newest-first for the trajectory classifier. The label
    // domain is tiny, so a Vec scan beats a map here.
    let mut groups: Vec<(String, Vec<&Run>)> = Vec::new();
    for run in runs.iter().rev() {
        match groups.iter_mut().find(|(label, _)| *label == run.regime) {
            Some((_, members)) => members.push(run),
            None => groups.push((run.regime.clone(), vec![run])),
        }
    }

    let mut breakdowns: Vec<RegimeBreakdown> = groups
        .into_iter()
        .map(|(regime, members)| {
            let days: usize = members.iter().map(|r| r.day_count).sum();
            let confidences: Vec<f64> = members
                .iter()
                .flat_map(|r| r.confidences.iter().copied())
                .collect();
            let avg_confidence = mean(&confidences);
            let pct_of_period = if total_days > 0 {
                (days as f64 / total_days as f64 * 100.0).round() as u32
            } else {
                0
            };
            RegimeBreakdown {
                display_label: regime_config::resolve(&regime).label.to_string(),
                regime,
                total_days: days,
                instances: members.len(),
                avg_confidence,
                pct_of_period,
                trend: trajectory::classify_newest_first(&confidences),
            }
        })
        .collect();

    breakdowns.sort_by(|a, b| b.total_days.cmp(&a.total_days));
    let dominant = breakdowns.first().cloned();

    let record_confidences: Vec<f64> =
        records.iter().map(|r| r.confidence_clamped()).collect();
    let avg_confidence_pct = (mean(&record_confidences) * 100.0).round() as u32;

    PeriodAggregate {
        total_days,
        transition_count,
        avg_confidence_pct,
        breakdowns,
        dominant,
        btc_period_change_pct: btc_period_change(records),
    }
}

/// Percent change between the newest and oldest positive BTC price in a
/// newest-first slice. Needs at least two valid prices.
fn btc_period_change(records: &[RegimeRecord]) -> Option<f64> {
    let newest_idx = records.iter().position(|r| r.price > 0.0)?;
    let oldest_idx = records.iter().rposition(|r| r.price > 0.0)?;
    if newest_idx == oldest_idx {
        return None;
    }
    let newest = records[newest_idx].price;
    let oldest = records[oldest_idx].price;
    Some((newest - oldest) / oldest * 100.0)
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}
