//! Diagnostic tool: run the full analytics + feed pipeline over a JSON
//! fixture and print the results as one JSON document.
//!
//! Input shape:
//! `{ "records": [...], "user_name": ..., "portfolio": ..., "signals": [...],
//!    "metrics": ..., "learn_items": [...], "explainer": ... }`

use std::fs;

use anyhow::{Context, Result};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use regimefeed::feed::FeedSources;
use regimefeed::insights::{self, InsightContext};
use regimefeed::logging::{json_log, obj, params_hash, v_num, v_str};
use regimefeed::records::{
    LearnItem, MarketMetrics, PortfolioSnapshot, RegimeRecord, SignalNote,
};
use regimefeed::{aggregate, aggregate_transitions, compress_newest_first, current_status};

#[derive(Deserialize)]
struct ReportInput {
    /// Newest-first regime records.
    records: Vec<RegimeRecord>,
    #[serde(default)]
    user_name: Option<String>,
    #[serde(default)]
    portfolio: Option<PortfolioSnapshot>,
    #[serde(default)]
    signals: Vec<SignalNote>,
    #[serde(default)]
    metrics: Option<MarketMetrics>,
    #[serde(default)]
    learn_items: Vec<LearnItem>,
    #[serde(default)]
    explainer: Option<LearnItem>,
}

fn main() -> Result<()> {
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "fixtures/report.json".to_string());

    let raw = fs::read_to_string(&path).with_context(|| format!("cannot read {}", path))?;
    let input: ReportInput =
        serde_json::from_str(&raw).with_context(|| format!("cannot parse {}", path))?;

    json_log(
        "report",
        obj(&[
            ("event", v_str("loaded")),
            ("path", v_str(&path)),
            ("input_hash", v_str(&params_hash(&raw))),
            ("records", v_num(input.records.len() as f64)),
        ]),
    );

    let runs = compress_newest_first(&input.records);
    let period = aggregate(&runs, &input.records);
    let transitions = aggregate_transitions(&input.records);
    let status = current_status(&input.records);

    let ctx = InsightContext {
        regime: status.as_ref(),
        portfolio: input.portfolio.as_ref(),
    };
    let entries = insights::generate(&ctx, insights::DEFAULT_MAX);

    let sources = FeedSources {
        user_name: input.user_name,
        regime: status.clone(),
        btc_price: input.records.first().map(|r| r.price).filter(|p| *p > 0.0),
        eth_price: input.records.first().map(|r| r.eth_price).filter(|p| *p > 0.0),
        portfolio: input.portfolio,
        metrics: input.metrics,
        signals: input.signals,
        learn_items: input.learn_items,
        explainer: input.explainer,
    };
    let feed = regimefeed::compose(&sources, Utc::now());

    json_log(
        "report",
        obj(&[
            ("event", v_str("composed")),
            ("runs", v_num(runs.len() as f64)),
            ("transitions", v_num(transitions.len() as f64)),
            ("insights", v_num(entries.len() as f64)),
            ("feed_entries", v_num(feed.entries.len() as f64)),
        ]),
    );

    let out = json!({
        "status": status,
        "aggregate": period,
        "transitions": transitions,
        "insights": entries,
        "feed": feed,
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}
