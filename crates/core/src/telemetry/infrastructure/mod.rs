pub mod fan_out_metric_sink;
pub mod jsonl_metric_sink;
pub mod memory_metric_sink;
pub mod rest_metric_sink;
