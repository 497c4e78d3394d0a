use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::detection::domain::detection_result::EngagementLevel;
use crate::telemetry::domain::engagement_sample::EngagementSample;

/// Aggregate engagement figures for one finished session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionReport {
    pub session_id: String,
    pub total_participants: u32,
    /// Mean attention score as a rounded percentage.
    pub avg_engagement_score: i64,
    pub fully_engaged_count: usize,
    pub partially_engaged_count: usize,
    pub passively_present_count: usize,
    pub total_duration_minutes: i64,
    pub report_data: ReportData,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportData {
    pub total_metrics: usize,
    pub camera_on_rate: f64,
    pub face_detection_rate: f64,
}

impl SessionReport {
    /// Summarizes `samples`. Returns `None` when there is nothing to report.
    ///
    /// The duration is zero unless both session bounds are known.
    pub fn from_samples(
        samples: &[EngagementSample],
        total_participants: u32,
        started_at: Option<DateTime<Utc>>,
        ended_at: Option<DateTime<Utc>>,
    ) -> Option<Self> {
        let first = samples.first()?;
        let n = samples.len() as f64;

        let mean_score = samples.iter().map(|s| s.attention_score).sum::<f64>() / n;
        let count = |level: EngagementLevel| {
            samples
                .iter()
                .filter(|s| s.engagement_level == level)
                .count()
        };
        let rate = |pred: fn(&EngagementSample) -> bool| {
            samples.iter().filter(|s| pred(s)).count() as f64 / n
        };

        let total_duration_minutes = match (started_at, ended_at) {
            (Some(start), Some(end)) => {
                round_half_up((end - start).num_milliseconds() as f64 / 60_000.0)
            }
            _ => 0,
        };

        Some(Self {
            session_id: first.session_id.clone(),
            total_participants,
            avg_engagement_score: round_half_up(mean_score * 100.0),
            fully_engaged_count: count(EngagementLevel::FullyEngaged),
            partially_engaged_count: count(EngagementLevel::PartiallyEngaged),
            passively_present_count: count(EngagementLevel::PassivelyPresent),
            total_duration_minutes,
            report_data: ReportData {
                total_metrics: samples.len(),
                camera_on_rate: rate(|s: &EngagementSample| s.camera_on),
                face_detection_rate: rate(|s: &EngagementSample| s.face_detected),
            },
        })
    }
}

/// Rounds ties toward positive infinity.
fn round_half_up(value: f64) -> i64 {
    (value + 0.5).floor() as i64
}
