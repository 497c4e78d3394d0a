use std::sync::{Arc, Mutex};

use crate::telemetry::domain::engagement_sample::EngagementSample;
use crate::telemetry::domain::metric_sink::{MetricSink, SinkError};

/// Keeps samples in memory. Clones share the same store, so a caller can
/// keep one handle after boxing another into a recorder.
#[derive(Clone, Default)]
pub struct MemoryMetricSink {
    samples: Arc<Mutex<Vec<EngagementSample>>>,
}

impl MemoryMetricSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn samples(&self) -> Vec<EngagementSample> {
        self.samples
            .lock()
            .map(|s| s.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    pub fn len(&self) -> usize {
        self.samples().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl MetricSink for MemoryMetricSink {
    fn insert(&mut self, sample: &EngagementSample) -> Result<(), SinkError> {
        self.samples
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(sample.clone());
        Ok(())
    }
}
