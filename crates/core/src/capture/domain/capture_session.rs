use crate::capture::domain::camera::CameraStream;
use crate::capture::domain::tick_scheduler::TickHandle;
use crate::detection::domain::detection_result::DetectionResult;
use crate::shared::capture_error::CaptureError;
use crate::shared::constants::{ANALYZE_EVERY_N_TICKS, TARGET_HEIGHT, TARGET_WIDTH};
use crate::shared::frame::{expected_len, Frame};

/// All mutable state of one active capture.
///
/// Created when a stream is granted and dropped on stop; nothing here is
/// shared with other sessions.
pub struct CaptureSession {
    stream: Box<dyn CameraStream>,
    pending_tick: Option<TickHandle>,
    last_detection: Option<DetectionResult>,
    frame_count: u64,
    pixel_buffer: Vec<u8>,
}

impl CaptureSession {
    pub fn new(stream: Box<dyn CameraStream>) -> Self {
        Self {
            stream,
            pending_tick: None,
            last_detection: None,
            frame_count: 0,
            pixel_buffer: Vec::new(),
        }
    }

    pub fn pending_tick(&self) -> Option<TickHandle> {
        self.pending_tick
    }

    pub fn set_pending_tick(&mut self, handle: TickHandle) {
        self.pending_tick = Some(handle);
    }

    pub fn take_pending_tick(&mut self) -> Option<TickHandle> {
        self.pending_tick.take()
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Counts one tick and reports whether it is an analysis tick.
    pub fn advance(&mut self) -> bool {
        self.frame_count += 1;
        self.frame_count % ANALYZE_EVERY_N_TICKS == 0
    }

    pub fn last_detection(&self) -> Option<&DetectionResult> {
        self.last_detection.as_ref()
    }

    pub fn record(&mut self, detection: DetectionResult) {
        self.last_detection = Some(detection);
    }

    /// Reads the current frame into the session's reusable buffer.
    ///
    /// Unknown source dimensions fall back to the capture target size.
    pub fn read_frame(&mut self) -> Result<Frame, CaptureError> {
        let (width, height) = self
            .stream
            .dimensions()
            .unwrap_or((TARGET_WIDTH, TARGET_HEIGHT));

        let mut buffer = std::mem::take(&mut self.pixel_buffer);
        if let Err(e) = self.stream.read_pixels(width, height, &mut buffer) {
            self.pixel_buffer = buffer;
            return Err(e);
        }
        if buffer.len() != expected_len(width, height) {
            let len = buffer.len();
            self.pixel_buffer = buffer;
            return Err(CaptureError::unknown(format!(
                "source wrote {len} bytes for a {width}x{height} frame"
            )));
        }
        Ok(Frame::new(buffer, width, height, self.frame_count))
    }

    /// Hands a frame's buffer back for the next read.
    pub fn recycle(&mut self, frame: Frame) {
        self.pixel_buffer = frame.into_data();
    }

    /// Stops the stream tracks, ending the session.
    pub fn close(mut self) {
        self.stream.stop_tracks();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::domain::camera::FrameSource;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct FakeStream {
        dims: Option<(u32, u32)>,
        bytes_per_pixel: usize,
        stops: Arc<AtomicUsize>,
    }

    impl FrameSource for FakeStream {
        fn dimensions(&self) -> Option<(u32, u32)> {
            self.dims
        }

        fn read_pixels(
            &mut self,
            width: u32,
            height: u32,
            buffer: &mut Vec<u8>,
        ) -> Result<(), CaptureError> {
            buffer.clear();
            buffer.resize(width as usize * height as usize * self.bytes_per_pixel, 7);
            Ok(())
        }
    }

    impl CameraStream for FakeStream {
        fn play(&mut self) -> Result<(), CaptureError> {
            Ok(())
        }

        fn stop_tracks(&mut self) {
            self.stops.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn session(dims: Option<(u32, u32)>, bytes_per_pixel: usize) -> (CaptureSession, Arc<AtomicUsize>) {
        let stops = Arc::new(AtomicUsize::new(0));
        let stream = FakeStream {
            dims,
            bytes_per_pixel,
            stops: stops.clone(),
        };
        (CaptureSession::new(Box::new(stream)), stops)
    }

    #[test]
    fn test_advance_flags_every_third_tick() {
        let (mut s, _) = session(None, 4);
        let flags: Vec<bool> = (0..9).map(|_| s.advance()).collect();
        assert_eq!(
            flags,
            [false, false, true, false, false, true, false, false, true]
        );
        assert_eq!(s.frame_count(), 9);
    }

    #[test]
    fn test_read_frame_defaults_to_target_size() {
        let (mut s, _) = session(None, 4);
        let frame = s.read_frame().unwrap();
        assert_eq!((frame.width(), frame.height()), (640, 480));
    }

    #[test]
    fn test_read_frame_uses_native_size() {
        let (mut s, _) = session(Some((320, 240)), 4);
        s.advance();
        let frame = s.read_frame().unwrap();
        assert_eq!((frame.width(), frame.height()), (320, 240));
        assert_eq!(frame.tick(), 1);
    }

    #[test]
    fn test_read_frame_rejects_wrong_buffer_size() {
        let (mut s, _) = session(Some((8, 8)), 3);
        assert!(matches!(s.read_frame(), Err(CaptureError::Unknown(_))));
    }

    #[test]
    fn test_recycled_buffer_is_reused() {
        let (mut s, _) = session(Some((8, 8)), 4);
        let frame = s.read_frame().unwrap();
        let ptr = frame.data().as_ptr();
        s.recycle(frame);
        let again = s.read_frame().unwrap();
        assert_eq!(again.data().as_ptr(), ptr);
    }

    #[test]
    fn test_pending_tick_roundtrip() {
        let (mut s, _) = session(None, 4);
        assert!(s.pending_tick().is_none());
        s.set_pending_tick(TickHandle::new(3));
        assert_eq!(s.take_pending_tick(), Some(TickHandle::new(3)));
        assert!(s.pending_tick().is_none());
    }

    #[test]
    fn test_close_stops_tracks() {
        let (s, stops) = session(None, 4);
        s.close();
        assert_eq!(stops.load(Ordering::SeqCst), 1);
    }
}
