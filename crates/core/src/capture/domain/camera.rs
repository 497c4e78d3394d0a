use crate::shared::capture_error::CaptureError;
use crate::shared::constants::{FACING_MODE, TARGET_HEIGHT, TARGET_WIDTH};

/// What the capture loop asks the platform for.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StreamConstraints {
    pub ideal_width: u32,
    pub ideal_height: u32,
    pub facing_mode: &'static str,
    pub audio: bool,
}

impl Default for StreamConstraints {
    fn default() -> Self {
        Self {
            ideal_width: TARGET_WIDTH,
            ideal_height: TARGET_HEIGHT,
            facing_mode: FACING_MODE,
            audio: false,
        }
    }
}

/// Something the analyzer can pull RGBA pixels from.
pub trait FrameSource: Send {
    /// Native resolution, once the source knows it.
    fn dimensions(&self) -> Option<(u32, u32)>;

    /// Renders the current frame into `buffer` as `width × height` RGBA,
    /// resizing `buffer` as needed.
    ///
    /// Returns [`CaptureError::FrameNotReady`] when no decodable frame is
    /// available yet.
    fn read_pixels(
        &mut self,
        width: u32,
        height: u32,
        buffer: &mut Vec<u8>,
    ) -> Result<(), CaptureError>;
}

/// A granted camera stream bound to a frame source.
pub trait CameraStream: FrameSource {
    /// Starts delivering frames. May fail after the stream was granted.
    fn play(&mut self) -> Result<(), CaptureError>;

    /// Stops every track of the stream. Must be safe to call twice.
    fn stop_tracks(&mut self);
}

/// Platform camera access.
pub trait CameraProvider: Send {
    /// Requests a stream; may block on a permission prompt.
    fn acquire(
        &mut self,
        constraints: &StreamConstraints,
    ) -> Result<Box<dyn CameraStream>, CaptureError>;
}
