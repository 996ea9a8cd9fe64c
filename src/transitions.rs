//! Regime transition tallies from change-flagged records.

use serde::Serialize;

use crate::records::RegimeRecord;

/// One aggregated from→to transition pair.
#[derive(Debug, Clone, Serialize)]
pub struct Transition {
    pub from: String,
    pub to: String,
    pub count: usize,
    /// ISO-8601 timestamp of the most recent occurrence.
    pub last_seen: String,
}

/// Tally regime transitions in a newest-first record slice.
///
/// Only records carrying the change flag and a previous label participate.
/// Pairs are keyed by the ordered previous→current labels. The scan order
/// makes the first occurrence the most recent one; the timestamp comparison
/// below still guards against out-of-order input (ISO-8601 strings compare
/// lexicographically). Output is sorted by count descending, ties broken by
/// last-seen descending.
pub fn aggregate_newest_first(records: &[RegimeRecord]) -> Vec<Transition> {
    let mut transitions: Vec<Transition> = Vec::new();

    for record in records {
        if !record.changed {
            continue;
        }
        let Some(from) = record.previous_regime.as_deref() else {
            continue;
        };
        match transitions
            .iter_mut()
            .find(|t| t.from == from && t.to == record.regime)
        {
            Some(t) => {
                t.count += 1;
                if record.ts > t.last_seen {
                    t.last_seen = record.ts.clone();
                }
            }
            None => transitions.push(Transition {
                from: from.to_string(),
                to: record.regime.clone(),
                count: 1,
                last_seen: record.ts.clone(),
            }),
        }
    }

    transitions.sort_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then_with(|| b.last_seen.cmp(&a.last_seen))
    });
    transitions
}

#[cfg(test)]
mod tests {
    use super::*;

    fn change(ts: &str, from: Option<&str>, to: &str) -> RegimeRecord {
        RegimeRecord {
            ts: ts.into(),
            regime: to.into(),
            previous_regime: from.map(|s| s.to_string()),
            changed: from.is_some(),
            confidence: 0.5,
            price: 0.0,
            return_1d: 0.0,
            return_7d: 0.0,
            volatility_7d: 0.0,
            eth_price: 0.0,
            eth_return_7d: 0.0,
            eth_volatility_7d: 0.0,
        }
    }

    #[test]
    fn counts_and_orders_pairs() {
        let records = vec![
            change("2025-03-09T00:00:00Z", Some("bull"), "bear"),
            change("2025-03-06T00:00:00Z", Some("bear"), "bull"),
            change("2025-03-02T00:00:00Z", Some("bull"), "bear"),
        ];
        let out = aggregate_newest_first(&records);
        assert_eq!(out.len(), 2);
        assert_eq!((out[0].from.as_str(), out[0].to.as_str(), out[0].count), ("bull", "bear", 2));
        assert_eq!((out[1].from.as_str(), out[1].to.as_str(), out[1].count), ("bear", "bull", 1));
    }

    #[test]
    fn direction_matters() {
        let records = vec![
            change("2025-03-04T00:00:00Z", Some("bear"), "bull"),
            change("2025-03-02T00:00:00Z", Some("bull"), "bear"),
        ];
        let out = aggregate_newest_first(&records);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn last_seen_is_most_recent_occurrence() {
        let records = vec![
            change("2025-03-08T00:00:00Z", Some("bull"), "bear"),
            change("2025-03-01T00:00:00Z", Some("bull"), "bear"),
        ];
        let out = aggregate_newest_first(&records);
        assert_eq!(out[0].last_seen, "2025-03-08T00:00:00Z");
    }

    #[test]
    fn tolerates_out_of_order_input() {
        // Oldest first, violating the convention; last_seen still lands on
        // the greater timestamp.
        let records = vec![
            change("2025-03-01T00:00:00Z", Some("bull"), "bear"),
            change("2025-03-08T00:00:00Z", Some("bull"), "bear"),
        ];
        let out = aggregate_newest_first(&records);
        assert_eq!(out[0].last_seen, "2025-03-08T00:00:00Z");
    }

    #[test]
    fn ignores_unflagged_and_unlabeled_records() {
        let mut unflagged = change("2025-03-05T00:00:00Z", Some("bull"), "bear");
        unflagged.changed = false;
        let mut no_prev = change("2025-03-04T00:00:00Z", None, "bull");
        no_prev.changed = true;
        assert!(aggregate_newest_first(&[unflagged, no_prev]).is_empty());
    }

    #[test]
    fn count_ties_break_by_recency() {
        let records = vec![
            change("2025-03-09T00:00:00Z", Some("range"), "bull"),
            change("2025-03-05T00:00:00Z", Some("bull"), "bear"),
        ];
        let out = aggregate_newest_first(&records);
        assert_eq!(out[0].to, "bull");
        assert_eq!(out[1].to, "bear");
    }
}
