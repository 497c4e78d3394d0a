use crossbeam_channel::{Receiver, Sender};

use crate::capture::domain::camera::{CameraProvider, StreamConstraints};
use crate::capture::domain::capture_session::CaptureSession;
use crate::capture::domain::tick_scheduler::{TickHandle, TickScheduler};
use crate::detection::domain::detection_result::DetectionResult;
use crate::detection::domain::frame_analyzer::FrameAnalyzer;
use crate::shared::capture_error::CaptureError;

/// Coarse lifecycle flags exposed to the embedding UI.
///
/// `is_loading` is only set while [`CaptureController::start`] runs; hosts
/// see it through [`CaptureController::subscribe_state`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CaptureState {
    pub is_loading: bool,
    pub is_active: bool,
    pub error: Option<CaptureError>,
}

/// What a delivered tick did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    /// Stale or cancelled handle, or no active session.
    Ignored,
    /// Not an analysis tick; the previous result was re-published.
    Repeated,
    /// A fresh frame was analyzed.
    Analyzed,
    /// Analysis was due but the frame was unusable; the previous result
    /// was re-published.
    Skipped,
    /// The camera went away; the session was torn down.
    CameraLost,
}

/// Owns the camera stream and drives the analysis cadence.
///
/// Ticks arrive from the injected [`TickScheduler`]; every
/// [`ANALYZE_EVERY_N_TICKS`](crate::shared::constants::ANALYZE_EVERY_N_TICKS)th
/// tick reads a frame and runs the [`FrameAnalyzer`], the others repeat the
/// last result. Dropping the controller stops any active capture.
pub struct CaptureController {
    camera: Box<dyn CameraProvider>,
    scheduler: Box<dyn TickScheduler>,
    analyzer: Box<dyn FrameAnalyzer>,
    constraints: StreamConstraints,
    session: Option<CaptureSession>,
    state: CaptureState,
    subscribers: Vec<Sender<DetectionResult>>,
    state_subscribers: Vec<Sender<CaptureState>>,
}

impl CaptureController {
    pub fn new(
        camera: Box<dyn CameraProvider>,
        scheduler: Box<dyn TickScheduler>,
        analyzer: Box<dyn FrameAnalyzer>,
    ) -> Self {
        Self {
            camera,
            scheduler,
            analyzer,
            constraints: StreamConstraints::default(),
            session: None,
            state: CaptureState::default(),
            subscribers: Vec::new(),
            state_subscribers: Vec::new(),
        }
    }

    pub fn with_constraints(mut self, constraints: StreamConstraints) -> Self {
        self.constraints = constraints;
        self
    }

    /// Receives every published detection, in tick order.
    pub fn subscribe(&mut self) -> Receiver<DetectionResult> {
        let (tx, rx) = crossbeam_channel::unbounded();
        self.subscribers.push(tx);
        rx
    }

    /// Receives every lifecycle transition, starting with the next one.
    pub fn subscribe_state(&mut self) -> Receiver<CaptureState> {
        let (tx, rx) = crossbeam_channel::unbounded();
        self.state_subscribers.push(tx);
        rx
    }

    pub fn state(&self) -> &CaptureState {
        &self.state
    }

    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    pub fn detection(&self) -> Option<&DetectionResult> {
        self.session.as_ref().and_then(|s| s.last_detection())
    }

    pub fn frame_count(&self) -> u64 {
        self.session.as_ref().map_or(0, |s| s.frame_count())
    }

    /// Acquires the camera and schedules the first tick.
    ///
    /// A no-op while already active. Any failure is reported as
    /// [`CaptureError::CameraUnavailable`], stored in [`CaptureState::error`]
    /// and not retried.
    pub fn start(&mut self) -> Result<(), CaptureError> {
        if self.session.is_some() {
            log::debug!("Capture already active, ignoring start");
            return Ok(());
        }

        self.set_state(CaptureState {
            is_loading: true,
            is_active: false,
            error: None,
        });
        log::info!(
            "Requesting camera: {}x{}, facing {}",
            self.constraints.ideal_width,
            self.constraints.ideal_height,
            self.constraints.facing_mode
        );

        let mut stream = match self.camera.acquire(&self.constraints) {
            Ok(stream) => stream,
            Err(e) => return Err(self.fail_start(e)),
        };
        if let Err(e) = stream.play() {
            stream.stop_tracks();
            return Err(self.fail_start(e));
        }

        let mut session = CaptureSession::new(stream);
        session.set_pending_tick(self.scheduler.schedule_next());
        self.session = Some(session);
        self.set_state(CaptureState {
            is_loading: false,
            is_active: true,
            error: None,
        });
        log::info!("Capture started");
        Ok(())
    }

    /// Cancels the pending tick, releases the stream and clears all state.
    /// Safe to call when already stopped.
    pub fn stop(&mut self) {
        if let Some(mut session) = self.session.take() {
            if let Some(handle) = session.take_pending_tick() {
                self.scheduler.cancel(handle);
            }
            let ticks = session.frame_count();
            session.close();
            log::info!("Capture stopped after {ticks} ticks");
        }
        self.set_state(CaptureState::default());
    }

    /// Handles one refresh tick. Handles other than the pending one are
    /// ignored, so a tick firing after [`stop`](Self::stop) does nothing.
    pub fn on_tick(&mut self, handle: TickHandle) -> TickOutcome {
        let Some(session) = self.session.as_mut() else {
            return TickOutcome::Ignored;
        };
        if session.pending_tick() != Some(handle) {
            log::debug!("Ignoring stale tick {}", handle.id());
            return TickOutcome::Ignored;
        }
        session.take_pending_tick();

        let outcome = if session.advance() {
            match analyze_current_frame(session, &*self.analyzer) {
                Ok(()) => TickOutcome::Analyzed,
                Err(e) if e.is_soft() => {
                    log::debug!("Skipping analysis on tick {}: {e}", session.frame_count());
                    TickOutcome::Skipped
                }
                Err(e) => {
                    self.lose_camera(e);
                    return TickOutcome::CameraLost;
                }
            }
        } else {
            TickOutcome::Repeated
        };

        if let Some(detection) = session.last_detection() {
            publish(&mut self.subscribers, detection);
        }
        session.set_pending_tick(self.scheduler.schedule_next());
        outcome
    }

    fn fail_start(&mut self, error: CaptureError) -> CaptureError {
        let error = match error {
            CaptureError::CameraUnavailable(_) => error,
            other => CaptureError::CameraUnavailable(Some(other.user_message())),
        };
        log::warn!("Camera start failed: {error}");
        self.set_state(CaptureState {
            is_loading: false,
            is_active: false,
            error: Some(error.clone()),
        });
        error
    }

    fn lose_camera(&mut self, error: CaptureError) {
        log::warn!("Camera lost during capture: {error}");
        self.stop();
        self.set_state(CaptureState {
            error: Some(error),
            ..CaptureState::default()
        });
    }

    fn set_state(&mut self, state: CaptureState) {
        if self.state != state {
            publish(&mut self.state_subscribers, &state);
            self.state = state;
        }
    }
}

impl Drop for CaptureController {
    fn drop(&mut self) {
        self.stop();
    }
}

fn analyze_current_frame(
    session: &mut CaptureSession,
    analyzer: &dyn FrameAnalyzer,
) -> Result<(), CaptureError> {
    let frame = session.read_frame()?;
    let result = analyzer.analyze(&frame);
    session.recycle(frame);
    session.record(result?);
    Ok(())
}

fn publish<T: Clone>(subscribers: &mut Vec<Sender<T>>, value: &T) {
    subscribers.retain(|tx| tx.send(value.clone()).is_ok());
}
