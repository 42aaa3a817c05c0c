pub mod exposition;
pub mod sync_metrics;
