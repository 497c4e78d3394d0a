use thiserror::Error;

const DEFAULT_CAMERA_MESSAGE: &str = "Failed to access camera";

/// Failures of the capture loop and its collaborators.
///
/// Only [`CaptureError::CameraUnavailable`] is ever shown to the user; the
/// other kinds are handled inside the tick loop by repeating the previous
/// detection.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CaptureError {
    #[error("camera unavailable: {}", .0.as_deref().unwrap_or(DEFAULT_CAMERA_MESSAGE))]
    CameraUnavailable(Option<String>),
    #[error("frame not ready")]
    FrameNotReady,
    #[error("capture failed: {}", .0.as_deref().unwrap_or("unknown error"))]
    Unknown(Option<String>),
}

impl CaptureError {
    pub fn camera(detail: impl Into<String>) -> Self {
        Self::CameraUnavailable(Some(detail.into()))
    }

    pub fn unknown(detail: impl Into<String>) -> Self {
        Self::Unknown(Some(detail.into()))
    }

    /// Message suitable for a retry prompt.
    pub fn user_message(&self) -> String {
        match self {
            Self::CameraUnavailable(detail) | Self::Unknown(detail) => detail
                .clone()
                .unwrap_or_else(|| DEFAULT_CAMERA_MESSAGE.to_string()),
            Self::FrameNotReady => "Camera is starting".to_string(),
        }
    }

    /// Soft errors skip one tick; the loop keeps running.
    pub fn is_soft(&self) -> bool {
        !matches!(self, Self::CameraUnavailable(_))
    }
}
