pub mod consent;
pub mod engagement_sample;
pub mod metric_sink;
pub mod session_report;
