//! regimefeed: market-regime history analytics and narrative feed assembly.
//!
//! Operates purely on caller-supplied, already-fetched records; owns no
//! persistence or transport. Two pipelines:
//!
//! - analytics: newest-first regime records → chronological runs → period
//!   aggregate + transition tallies
//! - narrative: regime + portfolio + signals + metrics → prioritized
//!   insights → ordered typed feed entries

pub mod aggregate;
pub mod feed;
pub mod insights;
pub mod logging;
pub mod records;
pub mod regime_config;
pub mod runs;
pub mod trajectory;
pub mod transitions;

pub use aggregate::{aggregate, PeriodAggregate, RegimeBreakdown};
pub use feed::{compose, ComposedFeed, FeedEntry, FeedSources};
pub use insights::{generate, InsightContext, InsightEntry, DEFAULT_MAX};
pub use records::{
    Allocation, LearnItem, MarketMetrics, PortfolioSnapshot, RegimeRecord, RegimeStatus,
    SignalNote,
};
pub use runs::{compress_newest_first, current_status, Run};
pub use trajectory::Trend;
pub use transitions::{aggregate_newest_first as aggregate_transitions, Transition};
