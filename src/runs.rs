//! Run-length compression of regime history.
//!
//! Input records are newest-first; output runs are chronological (oldest run
//! first). Within a run the confidence and price sequences keep the
//! newest-first order of the source records, which is what the trajectory
//! classifier expects.

use serde::Serialize;

use crate::records::{RegimeRecord, RegimeStatus};

/// A maximal consecutive span of records sharing one regime label.
#[derive(Debug, Clone, Serialize)]
pub struct Run {
    pub regime: String,
    pub day_count: usize,
    /// Timestamp of the oldest record in the span.
    pub start_ts: String,
    /// Timestamp of the newest record in the span.
    pub end_ts: String,
    /// Confidence values, newest-first.
    pub confidences: Vec<f64>,
    /// `price` values, newest-first.
    pub prices: Vec<f64>,
}

impl Run {
    fn open(record: &RegimeRecord) -> Self {
        Run {
            regime: record.regime.clone(),
            day_count: 1,
            start_ts: record.ts.clone(),
            end_ts: record.ts.clone(),
            confidences: vec![record.confidence_clamped()],
            prices: vec![record.price],
        }
    }

    fn absorb(&mut self, record: &RegimeRecord) {
        self.day_count += 1;
        // Scanning newest-first, so each absorbed record pushes the start
        // of the span further back in time.
        self.start_ts = record.ts.clone();
        self.confidences.push(record.confidence_clamped());
        self.prices.push(record.price);
    }
}

/// Compress newest-first records into chronological maximal runs.
///
/// Single forward pass with one accumulator; the run list is reversed at the
/// end so callers receive oldest-first output. The runs partition the input:
/// day counts sum to the input length and no two adjacent runs share a label.
pub fn compress_newest_first(records: &[RegimeRecord]) -> Vec<Run> {
    let mut runs: Vec<Run> = Vec::new();
    let mut current: Option<Run> = None;

    for record in records {
        match current.take() {
            Some(mut run) if run.regime == record.regime => {
                run.absorb(record);
                current = Some(run);
            }
            Some(done) => {
                runs.push(done);
                current = Some(Run::open(record));
            }
            None => current = Some(Run::open(record)),
        }
    }
    if let Some(done) = current {
        runs.push(done);
    }

    // Scan order was newest-first; flip to chronological.
    runs.reverse();
    runs
}

/// Current regime standing: label and confidence from the newest record,
/// persistence from the length of the newest run.
pub fn current_status(records: &[RegimeRecord]) -> Option<RegimeStatus> {
    let newest = records.first()?;
    let persistence_days = records
        .iter()
        .take_while(|r| r.regime == newest.regime)
        .count();
    Some(RegimeStatus {
        regime: newest.regime.clone(),
        persistence_days,
        confidence: newest.confidence_clamped(),
    })
}
