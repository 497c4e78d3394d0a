use std::path::PathBuf;

use thiserror::Error;

use crate::telemetry::domain::engagement_sample::EngagementSample;

#[derive(Error, Debug)]
pub enum SinkError {
    #[error("failed to serialize sample: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} rejected sample with status {status}")]
    Rejected { url: String, status: u16 },
}

/// Destination for engagement samples.
pub trait MetricSink: Send {
    fn insert(&mut self, sample: &EngagementSample) -> Result<(), SinkError>;
}
