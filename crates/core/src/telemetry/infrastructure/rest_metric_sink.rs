use std::time::Duration;

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};

use crate::telemetry::domain::engagement_sample::EngagementSample;
use crate::telemetry::domain::metric_sink::{MetricSink, SinkError};

const METRICS_TABLE_PATH: &str = "rest/v1/engagement_metrics";
const DEFAULT_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(250);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Inserts samples into the hosted `engagement_metrics` table over its REST
/// interface.
///
/// Transport failures and 5xx responses are retried up to `max_attempts`
/// times; a 4xx response is returned immediately.
pub struct RestMetricSink {
    client: reqwest::blocking::Client,
    url: String,
    api_key: String,
    max_attempts: u32,
    retry_delay: Duration,
}

impl RestMetricSink {
    pub fn new(base_url: &str, api_key: impl Into<String>) -> Result<Self, SinkError> {
        let url = format!("{}/{METRICS_TABLE_PATH}", base_url.trim_end_matches('/'));
        let client = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|source| SinkError::Request {
                url: url.clone(),
                source,
            })?;
        Ok(Self {
            client,
            url,
            api_key: api_key.into(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_delay: DEFAULT_RETRY_DELAY,
        })
    }

    pub fn with_retry(mut self, max_attempts: u32, retry_delay: Duration) -> Self {
        self.max_attempts = max_attempts.max(1);
        self.retry_delay = retry_delay;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn post(&self, body: &[u8]) -> Result<(), SinkError> {
        let response = self
            .client
            .post(&self.url)
            .header("apikey", &self.api_key)
            .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
            .header(CONTENT_TYPE, "application/json")
            .header("Prefer", "return=minimal")
            .body(body.to_vec())
            .send()
            .map_err(|source| SinkError::Request {
                url: self.url.clone(),
                source,
            })?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(SinkError::Rejected {
                url: self.url.clone(),
                status: status.as_u16(),
            })
        }
    }
}

fn is_retryable(error: &SinkError) -> bool {
    match error {
        SinkError::Request { .. } => true,
        SinkError::Rejected { status, .. } => *status >= 500,
        _ => false,
    }
}

impl MetricSink for RestMetricSink {
    fn insert(&mut self, sample: &EngagementSample) -> Result<(), SinkError> {
        let body = serde_json::to_vec(sample)?;
        let mut attempt = 1;
        loop {
            match self.post(&body) {
                Ok(()) => return Ok(()),
                Err(e) if attempt < self.max_attempts && is_retryable(&e) => {
                    log::debug!(
                        "Metric insert attempt {attempt}/{} failed: {e}",
                        self.max_attempts
                    );
                    std::thread::sleep(self.retry_delay);
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
