use crate::detection::domain::detection_result::DetectionResult;
use crate::shared::capture_error::CaptureError;
use crate::shared::frame::Frame;

/// Domain interface for turning one frame into a [`DetectionResult`].
///
/// Implementations are stateless: the same frame always yields the same
/// result, hence `&self`.
pub trait FrameAnalyzer: Send {
    fn analyze(&self, frame: &Frame) -> Result<DetectionResult, CaptureError>;
}
