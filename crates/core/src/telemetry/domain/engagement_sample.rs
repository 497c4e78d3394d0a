use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::detection::domain::detection_result::{DetectionResult, EngagementLevel};

/// Who a sample belongs to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Participant {
    pub session_id: String,
    pub participant_id: String,
}

impl Participant {
    pub fn new(session_id: impl Into<String>, participant_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            participant_id: participant_id.into(),
        }
    }
}

/// One persisted engagement measurement, shaped like an
/// `engagement_metrics` row.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EngagementSample {
    pub session_id: String,
    pub participant_id: String,
    pub timestamp: DateTime<Utc>,
    pub face_detected: bool,
    pub eye_gaze_focused: bool,
    pub head_pose_engaged: bool,
    pub attention_score: f64,
    pub engagement_level: EngagementLevel,
    pub camera_on: bool,
    pub screen_focused: bool,
}

impl EngagementSample {
    pub fn from_detection(
        participant: &Participant,
        detection: &DetectionResult,
        camera_on: bool,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            session_id: participant.session_id.clone(),
            participant_id: participant.participant_id.clone(),
            timestamp,
            face_detected: detection.face_detected,
            eye_gaze_focused: detection.eye_gaze_focused,
            head_pose_engaged: detection.head_pose_engaged,
            attention_score: detection.attention_score,
            engagement_level: detection.engagement_level(),
            camera_on,
            // Window focus is not observable from the capture loop.
            screen_focused: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn participant() -> Participant {
        Participant::new("session-1", "participant-7")
    }

    #[test]
    fn test_from_detection_copies_signals() {
        let at = Utc.with_ymd_and_hms(2024, 5, 2, 14, 0, 0).unwrap();
        let detection = DetectionResult::new(true, true, false, None);
        let sample = EngagementSample::from_detection(&participant(), &detection, true, at);

        assert_eq!(sample.session_id, "session-1");
        assert_eq!(sample.participant_id, "participant-7");
        assert!(sample.face_detected);
        assert!(sample.eye_gaze_focused);
        assert!(!sample.head_pose_engaged);
        assert_eq!(sample.attention_score, detection.attention_score);
        assert_eq!(sample.engagement_level, EngagementLevel::FullyEngaged);
        assert!(sample.camera_on);
        assert!(sample.screen_focused);
    }

    #[test]
    fn test_no_face_sample_is_away() {
        let sample = EngagementSample::from_detection(
            &participant(),
            &DetectionResult::no_face(),
            true,
            Utc::now(),
        );
        assert_eq!(sample.engagement_level, EngagementLevel::Away);
        assert_eq!(sample.attention_score, 0.0);
    }

    #[test]
    fn test_serializes_as_metric_row() {
        let at = Utc.with_ymd_and_hms(2024, 5, 2, 14, 0, 0).unwrap();
        let detection = DetectionResult::new(true, false, false, None);
        let sample = EngagementSample::from_detection(&participant(), &detection, true, at);

        let json = serde_json::to_value(&sample).unwrap();
        assert_eq!(json["timestamp"], "2024-05-02T14:00:00Z");
        assert_eq!(json["engagement_level"], "partially_engaged");
        assert_eq!(json["camera_on"], true);
        assert!(json.get("bounding_box").is_none());
    }
}
