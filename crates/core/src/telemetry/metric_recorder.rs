use chrono::{DateTime, Utc};

use crate::detection::domain::detection_result::DetectionResult;
use crate::shared::constants::METRIC_INTERVAL_MS;
use crate::telemetry::domain::consent::Consent;
use crate::telemetry::domain::engagement_sample::{EngagementSample, Participant};
use crate::telemetry::domain::metric_sink::MetricSink;

/// What [`MetricRecorder::observe`] did with a detection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordOutcome {
    Recorded,
    NoConsent,
    CameraOff,
    Throttled,
    Failed,
}

/// Turns the stream of published detections into persisted samples.
///
/// At most one sample per [`METRIC_INTERVAL_MS`], and only while consent is
/// given and the camera is on. A failed write leaves the throttle where it
/// was, so the next detection retries.
pub struct MetricRecorder {
    sink: Box<dyn MetricSink>,
    participant: Participant,
    consent: Consent,
    last_sent: Option<DateTime<Utc>>,
    failures: usize,
}

impl MetricRecorder {
    pub fn new(sink: Box<dyn MetricSink>, participant: Participant, consent: Consent) -> Self {
        Self {
            sink,
            participant,
            consent,
            last_sent: None,
            failures: 0,
        }
    }

    pub fn consent(&self) -> &Consent {
        &self.consent
    }

    pub fn set_consent(&mut self, consent: Consent) {
        self.consent = consent;
    }

    pub fn withdraw_consent(&mut self) {
        self.consent.withdraw();
    }

    pub fn failures(&self) -> usize {
        self.failures
    }

    pub fn observe(
        &mut self,
        detection: &DetectionResult,
        camera_on: bool,
        now: DateTime<Utc>,
    ) -> RecordOutcome {
        if !self.consent.is_given() {
            return RecordOutcome::NoConsent;
        }
        if !camera_on {
            return RecordOutcome::CameraOff;
        }
        if let Some(last) = self.last_sent {
            if (now - last).num_milliseconds() < METRIC_INTERVAL_MS {
                return RecordOutcome::Throttled;
            }
        }

        let sample = EngagementSample::from_detection(&self.participant, detection, camera_on, now);
        match self.sink.insert(&sample) {
            Ok(()) => {
                self.last_sent = Some(now);
                RecordOutcome::Recorded
            }
            Err(e) => {
                self.failures += 1;
                log::warn!("Failed to record engagement sample: {e}");
                RecordOutcome::Failed
            }
        }
    }
}
