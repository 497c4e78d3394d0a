use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::telemetry::domain::engagement_sample::EngagementSample;
use crate::telemetry::domain::metric_sink::{MetricSink, SinkError};

/// Appends one JSON object per sample to a file.
pub struct JsonLinesMetricSink {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl JsonLinesMetricSink {
    /// Opens `path` for appending, creating it if needed.
    pub fn create(path: &Path) -> Result<Self, SinkError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|source| SinkError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(Self {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl MetricSink for JsonLinesMetricSink {
    fn insert(&mut self, sample: &EngagementSample) -> Result<(), SinkError> {
        let line = serde_json::to_string(sample)?;
        writeln!(self.writer, "{line}")
            .and_then(|_| self.writer.flush())
            .map_err(|source| SinkError::Io {
                path: self.path.clone(),
                source,
            })
    }
}
