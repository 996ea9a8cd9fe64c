//! Confidence trajectory classification over a run's confidence sequence.

use serde::Serialize;

/// Direction of a confidence sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Up,
    Down,
    Stable,
}

/// Minimum mean shift between thirds before a sequence leaves `Stable`.
pub const TREND_THRESHOLD: f64 = 0.03;

/// Classify a newest-first confidence sequence.
///
/// Fewer than 3 values cannot show a trend. Otherwise the sequence is
/// reversed to chronological and split into thirds by ceiling division; the
/// early-third mean is compared against the late-third mean at a fixed
/// threshold. Example: newest-first `[0.9, 0.9, 0.5, 0.5, 0.5, 0.2]`
/// classifies as `Down`.
pub fn classify_newest_first(confidences: &[f64]) -> Trend {
    if confidences.len() < 3 {
        return Trend::Stable;
    }
    let chrono: Vec<f64> = confidences.iter().rev().copied().collect();
    let n = chrono.len();
    let third = n.div_ceil(3);

    let early = mean(&chrono[..third]);
    let late = mean(&chrono[n - third..]);
    let delta = early - late;

    if delta > TREND_THRESHOLD {
        Trend::Up
    } else if delta < -TREND_THRESHOLD {
        Trend::Down
    } else {
        Trend::Stable
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}
