//! Prioritized insight rule engine.
//!
//! A fixed ordered table of templates, each a pure predicate plus a builder
//! over the regime/portfolio context. Evaluation walks the table in order and
//! keeps the first `max` matches; earlier templates claim slots even when
//! later ones would also match. Each template runs inside its own panic
//! boundary so one bad rule cannot take down the rest of the evaluation.

use std::panic::{catch_unwind, AssertUnwindSafe};

use serde::Serialize;

use crate::logging::{json_log, obj, v_str};
use crate::records::{is_stablecoin, PortfolioSnapshot, RegimeStatus};
use crate::regime_config;

/// Default number of insights surfaced per evaluation.
pub const DEFAULT_MAX: usize = 4;

/// Allocation gap vs target, percentage points.
const TARGET_GAP_PP: f64 = 5.0;
/// Combined non-BTC/ETH/stable allocation share, percent.
const NON_CORE_PCT: f64 = 40.0;
/// Single-asset dominance, percent.
const CONCENTRATION_PCT: f64 = 60.0;
/// Stablecoin share, percent.
const STABLE_PCT: f64 = 30.0;
/// Misalignment bands, 0-1.
const ALIGNED_BAND: f64 = 0.15;
const DRIFTED_BAND: f64 = 0.5;
/// Regime persistence bands, days.
const FRESH_CHANGE_DAYS: usize = 2;
const PERSISTENT_DAYS: usize = 7;
/// Confidence floor, 0-1.
const LOW_CONFIDENCE: f64 = 0.5;

/// Evaluation context; either side may be absent.
#[derive(Debug, Clone, Copy)]
pub struct InsightContext<'a> {
    pub regime: Option<&'a RegimeStatus>,
    pub portfolio: Option<&'a PortfolioSnapshot>,
}

/// One built insight, ready for feed rendering.
#[derive(Debug, Clone, Serialize)]
pub struct InsightEntry {
    pub icon: &'static str,
    /// Visual variant: "info", "warn", or "positive".
    pub variant: &'static str,
    pub text: String,
    pub subtext: Option<String>,
    pub link: Option<&'static str>,
}

/// A rule: stable id, match predicate, entry builder. Plain function
/// pointers; the table order is the priority order.
pub struct InsightTemplate {
    pub id: &'static str,
    pub matches: fn(&InsightContext) -> bool,
    pub build: fn(&InsightContext) -> InsightEntry,
}

/// Evaluate the built-in template table against a context, first `max`
/// matches win.
pub fn generate(ctx: &InsightContext, max: usize) -> Vec<InsightEntry> {
    evaluate(TEMPLATES, ctx, max)
}

/// Walk an ordered template slice, collecting the first `max` matches.
pub fn evaluate(templates: &[InsightTemplate], ctx: &InsightContext, max: usize) -> Vec<InsightEntry> {
    let mut out = Vec::new();
    for template in templates {
        if out.len() >= max {
            break;
        }
        let result = catch_unwind(AssertUnwindSafe(|| {
            if (template.matches)(ctx) {
                Some((template.build)(ctx))
            } else {
                None
            }
        }));
        match result {
            Ok(Some(entry)) => out.push(entry),
            Ok(None) => {}
            Err(_) => {
                json_log(
                    "insights",
                    obj(&[
                        ("event", v_str("template_panicked")),
                        ("template_id", v_str(template.id)),
                    ]),
                );
            }
        }
    }
    out
}

// =============================================================================
// Template table (order = priority)
// =============================================================================

pub static TEMPLATES: &[InsightTemplate] = &[
    InsightTemplate { id: "fresh_regime_change", matches: fresh_change_matches, build: fresh_change_build },
    InsightTemplate { id: "portfolio_drifted", matches: drifted_matches, build: drifted_build },
    InsightTemplate { id: "btc_target_gap", matches: btc_gap_matches, build: btc_gap_build },
    InsightTemplate { id: "eth_target_gap", matches: eth_gap_matches, build: eth_gap_build },
    InsightTemplate { id: "non_core_heavy", matches: non_core_matches, build: non_core_build },
    InsightTemplate { id: "single_asset_dominance", matches: dominance_matches, build: dominance_build },
    InsightTemplate { id: "stablecoin_heavy", matches: stable_matches, build: stable_build },
    InsightTemplate { id: "low_confidence", matches: low_confidence_matches, build: low_confidence_build },
    InsightTemplate { id: "persistent_regime", matches: persistent_matches, build: persistent_build },
    InsightTemplate { id: "well_aligned", matches: aligned_matches, build: aligned_build },
];

fn regime_label(ctx: &InsightContext) -> String {
    ctx.regime
        .map(|r| regime_config::resolve(&r.regime).label.to_string())
        .unwrap_or_else(|| "the current regime".to_string())
}

fn asset_gap(ctx: &InsightContext, asset: &str) -> Option<f64> {
    ctx.portfolio?.allocation(asset).map(|a| a.gap_pp())
}

fn fresh_change_matches(ctx: &InsightContext) -> bool {
    ctx.regime.is_some_and(|r| r.persistence_days <= FRESH_CHANGE_DAYS)
}

fn fresh_change_build(ctx: &InsightContext) -> InsightEntry {
    let days = ctx.regime.map_or(0, |r| r.persistence_days);
    InsightEntry {
        icon: "refresh",
        variant: "info",
        text: format!("The market just shifted into {}.", regime_label(ctx)),
        subtext: Some(format!(
            "{} day{} into the new regime — early readings can be noisy.",
            days,
            if days == 1 { "" } else { "s" }
        )),
        link: None,
    }
}

fn drifted_matches(ctx: &InsightContext) -> bool {
    ctx.portfolio.is_some_and(|p| p.misalignment > DRIFTED_BAND)
}

fn drifted_build(ctx: &InsightContext) -> InsightEntry {
    let pct = ctx.portfolio.map_or(0.0, |p| p.misalignment * 100.0);
    InsightEntry {
        icon: "alert-triangle",
        variant: "warn",
        text: format!(
            "Your portfolio has drifted {:.0}% from its {} targets.",
            pct,
            regime_label(ctx)
        ),
        subtext: None,
        link: Some("/rebalance"),
    }
}

fn btc_gap_matches(ctx: &InsightContext) -> bool {
    asset_gap(ctx, "BTC").is_some_and(|g| g.abs() > TARGET_GAP_PP)
}

fn btc_gap_build(ctx: &InsightContext) -> InsightEntry {
    build_gap_entry("BTC", asset_gap(ctx, "BTC").unwrap_or(0.0))
}

fn eth_gap_matches(ctx: &InsightContext) -> bool {
    asset_gap(ctx, "ETH").is_some_and(|g| g.abs() > TARGET_GAP_PP)
}

fn eth_gap_build(ctx: &InsightContext) -> InsightEntry {
    build_gap_entry("ETH", asset_gap(ctx, "ETH").unwrap_or(0.0))
}

fn build_gap_entry(asset: &str, gap: f64) -> InsightEntry {
    let direction = if gap > 0.0 { "above" } else { "below" };
    InsightEntry {
        icon: "scale",
        variant: "warn",
        text: format!(
            "{} allocation is {:.1}pp {} target.",
            asset,
            gap.abs(),
            direction
        ),
        subtext: None,
        link: Some("/rebalance"),
    }
}

fn non_core_matches(ctx: &InsightContext) -> bool {
    ctx.portfolio.is_some_and(|p| {
        p.pct_where(|a| {
            !a.asset.eq_ignore_ascii_case("BTC")
                && !a.asset.eq_ignore_ascii_case("ETH")
                && !is_stablecoin(&a.asset)
        }) > NON_CORE_PCT
    })
}

fn non_core_build(ctx: &InsightContext) -> InsightEntry {
    let pct = ctx.portfolio.map_or(0.0, |p| {
        p.pct_where(|a| {
            !a.asset.eq_ignore_ascii_case("BTC")
                && !a.asset.eq_ignore_ascii_case("ETH")
                && !is_stablecoin(&a.asset)
        })
    });
    InsightEntry {
        icon: "pie-chart",
        variant: "info",
        text: format!("{:.0}% of your portfolio sits outside BTC, ETH and stables.", pct),
        subtext: Some("Altcoin-heavy books move faster in both directions.".to_string()),
        link: None,
    }
}

fn dominance_matches(ctx: &InsightContext) -> bool {
    ctx.portfolio
        .is_some_and(|p| p.allocations.iter().any(|a| a.current_pct > CONCENTRATION_PCT))
}

fn dominance_build(ctx: &InsightContext) -> InsightEntry {
    let (asset, pct) = ctx
        .portfolio
        .and_then(|p| {
            p.allocations
                .iter()
                .find(|a| a.current_pct > CONCENTRATION_PCT)
                .map(|a| (a.asset.clone(), a.current_pct))
        })
        .unwrap_or_else(|| (String::new(), 0.0));
    InsightEntry {
        icon: "target",
        variant: "info",
        text: format!("{} makes up {:.0}% of your portfolio.", asset, pct),
        subtext: Some("Concentration cuts both ways.".to_string()),
        link: None,
    }
}

fn stable_matches(ctx: &InsightContext) -> bool {
    ctx.portfolio
        .is_some_and(|p| p.pct_where(|a| is_stablecoin(&a.asset)) > STABLE_PCT)
}

fn stable_build(ctx: &InsightContext) -> InsightEntry {
    let pct = ctx
        .portfolio
        .map_or(0.0, |p| p.pct_where(|a| is_stablecoin(&a.asset)));
    InsightEntry {
        icon: "shield",
        variant: "info",
        text: format!("You are holding {:.0}% in stablecoins.", pct),
        subtext: Some(format!("Dry powder during {} conditions.", regime_label(ctx))),
        link: None,
    }
}

fn low_confidence_matches(ctx: &InsightContext) -> bool {
    ctx.regime.is_some_and(|r| r.confidence < LOW_CONFIDENCE)
}

fn low_confidence_build(ctx: &InsightContext) -> InsightEntry {
    let pct = ctx.regime.map_or(0.0, |r| r.confidence * 100.0);
    InsightEntry {
        icon: "help-circle",
        variant: "info",
        text: format!(
            "Regime confidence is only {:.0}% — the classification may flip.",
            pct
        ),
        subtext: None,
        link: None,
    }
}

fn persistent_matches(ctx: &InsightContext) -> bool {
    ctx.regime.is_some_and(|r| r.persistence_days >= PERSISTENT_DAYS)
}

fn persistent_build(ctx: &InsightContext) -> InsightEntry {
    let days = ctx.regime.map_or(0, |r| r.persistence_days);
    InsightEntry {
        icon: "calendar",
        variant: "info",
        text: format!("{} has held for {} days.", regime_label(ctx), days),
        subtext: Some("Established regimes tend to persist, but none last forever.".to_string()),
        link: None,
    }
}

fn aligned_matches(ctx: &InsightContext) -> bool {
    ctx.portfolio.is_some_and(|p| p.misalignment < ALIGNED_BAND)
}

fn aligned_build(ctx: &InsightContext) -> InsightEntry {
    InsightEntry {
        icon: "check-circle",
        variant: "positive",
        text: format!("Your portfolio is well aligned with {}.", regime_label(ctx)),
        subtext: None,
        link: None,
    }
}
