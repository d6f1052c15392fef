//! Ad creative performance: derived rate/cost metrics, ranking, and
//! creative media classification.

pub mod creative;
pub mod metrics;

pub use creative::{Creative, MediaType, ModalMedia};
pub use metrics::{
    derive_metrics, rank_ads, AdPerformance, DerivedAdMetrics, LeadOutcomes, MetricKey,
    RawMetricRecord, ScoreBand,
};
