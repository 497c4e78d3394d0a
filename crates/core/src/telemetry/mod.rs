pub mod domain;
pub mod infrastructure;
pub mod metric_recorder;
