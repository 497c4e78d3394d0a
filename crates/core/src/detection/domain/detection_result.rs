use serde::{Deserialize, Serialize};

use crate::shared::bounding_box::BoundingBox;

pub const FACE_WEIGHT: f64 = 0.40;
pub const GAZE_WEIGHT: f64 = 0.35;
pub const POSE_WEIGHT: f64 = 0.25;

pub const FULLY_ENGAGED_THRESHOLD: f64 = 0.7;
pub const PARTIALLY_ENGAGED_THRESHOLD: f64 = 0.4;

/// Output of one frame analysis.
///
/// Built only through [`DetectionResult::new`] / [`DetectionResult::no_face`]
/// so `attention_score` always follows from the three signals.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DetectionResult {
    pub face_detected: bool,
    pub eye_gaze_focused: bool,
    pub head_pose_engaged: bool,
    pub attention_score: f64,
    pub bounding_box: Option<BoundingBox>,
}

impl DetectionResult {
    pub fn new(
        face_detected: bool,
        eye_gaze_focused: bool,
        head_pose_engaged: bool,
        bounding_box: Option<BoundingBox>,
    ) -> Self {
        Self {
            face_detected,
            eye_gaze_focused,
            head_pose_engaged,
            attention_score: attention_score(face_detected, eye_gaze_focused, head_pose_engaged),
            bounding_box,
        }
    }

    pub fn no_face() -> Self {
        Self::new(false, false, false, None)
    }

    pub fn engagement_level(&self) -> EngagementLevel {
        EngagementLevel::classify(Some(self))
    }
}

/// Weighted sum of the signals that hold, capped at 1.0.
pub fn attention_score(face_detected: bool, eye_gaze_focused: bool, head_pose_engaged: bool) -> f64 {
    let mut score = 0.0;
    if face_detected {
        score += FACE_WEIGHT;
    }
    if eye_gaze_focused {
        score += GAZE_WEIGHT;
    }
    if head_pose_engaged {
        score += POSE_WEIGHT;
    }
    score.min(1.0)
}

/// Four-bucket discretization stored with every engagement sample.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngagementLevel {
    Away,
    PassivelyPresent,
    PartiallyEngaged,
    FullyEngaged,
}

impl EngagementLevel {
    pub const ALL: &[EngagementLevel] = &[
        EngagementLevel::Away,
        EngagementLevel::PassivelyPresent,
        EngagementLevel::PartiallyEngaged,
        EngagementLevel::FullyEngaged,
    ];

    /// A missing detection counts as `Away`.
    pub fn classify(detection: Option<&DetectionResult>) -> Self {
        match detection {
            Some(d) if d.face_detected => {
                if d.attention_score >= FULLY_ENGAGED_THRESHOLD {
                    Self::FullyEngaged
                } else if d.attention_score >= PARTIALLY_ENGAGED_THRESHOLD {
                    Self::PartiallyEngaged
                } else {
                    Self::PassivelyPresent
                }
            }
            _ => Self::Away,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Away => "away",
            Self::PassivelyPresent => "passively_present",
            Self::PartiallyEngaged => "partially_engaged",
            Self::FullyEngaged => "fully_engaged",
        }
    }
}

impl std::fmt::Display for EngagementLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
