//! Grouping and aggregation: records in, labelled (x, y) series out.

pub mod aggregate;
pub mod group;

pub use aggregate::{
    Aggregate, AggregationPlan, Figure, Metric, RatioPlan, Series, Skipped, metric_figures,
    ratio_figures,
};
