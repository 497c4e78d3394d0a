use crate::telemetry::domain::engagement_sample::EngagementSample;
use crate::telemetry::domain::metric_sink::{MetricSink, SinkError};

/// Writes each sample to several sinks in order.
///
/// Stops at the first failure, so later sinks only ever hold samples the
/// earlier ones accepted and a retried sample is not duplicated downstream.
pub struct FanOutMetricSink {
    sinks: Vec<Box<dyn MetricSink>>,
}

impl FanOutMetricSink {
    pub fn new(sinks: Vec<Box<dyn MetricSink>>) -> Self {
        Self { sinks }
    }
}

impl MetricSink for FanOutMetricSink {
    fn insert(&mut self, sample: &EngagementSample) -> Result<(), SinkError> {
        for sink in &mut self.sinks {
            sink.insert(sample)?;
        }
        Ok(())
    }
}
