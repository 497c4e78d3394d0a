use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;

use crate::capture::capture_controller::{CaptureController, TickOutcome};
use crate::capture::infrastructure::frame_clock_scheduler::FrameClock;
use crate::detection::domain::detection_result::DetectionResult;
use crate::pipeline::tracking_logger::TrackingLogger;
use crate::shared::capture_error::CaptureError;
use crate::telemetry::metric_recorder::{MetricRecorder, RecordOutcome};

/// What one tracking run did.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TrackingOutcome {
    pub ticks: u64,
    pub analyses: u64,
    pub samples_recorded: usize,
    pub last_result: Option<DetectionResult>,
    /// Set when the camera went away mid-run.
    pub camera_error: Option<CaptureError>,
}

/// Live tracking loop: start capture → deliver ticks → record published
/// detections → stop.
///
/// The controller's scheduler must be the one paired with `clock`. The run
/// ends after `max_ticks` delivered ticks, when the cancel flag is raised,
/// or when the camera is lost; the controller is stopped in every case.
pub struct TrackEngagementUseCase {
    controller: CaptureController,
    clock: FrameClock,
    recorder: Option<MetricRecorder>,
    logger: Box<dyn TrackingLogger>,
    max_ticks: Option<u64>,
    cancelled: Arc<AtomicBool>,
}

impl TrackEngagementUseCase {
    pub fn new(
        controller: CaptureController,
        clock: FrameClock,
        recorder: Option<MetricRecorder>,
        logger: Box<dyn TrackingLogger>,
    ) -> Self {
        Self {
            controller,
            clock,
            recorder,
            logger,
            max_ticks: None,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_max_ticks(mut self, max_ticks: u64) -> Self {
        self.max_ticks = Some(max_ticks);
        self
    }

    /// Raising this flag ends the run at the next tick boundary.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        self.cancelled.clone()
    }

    pub fn recorder(&self) -> Option<&MetricRecorder> {
        self.recorder.as_ref()
    }

    pub fn execute(&mut self) -> Result<TrackingOutcome, Box<dyn std::error::Error>> {
        let detections = self.controller.subscribe();
        self.controller.start()?;
        self.logger.info("Tracking started");

        let mut outcome = TrackingOutcome::default();
        while !self.should_stop(outcome.ticks) {
            let Some(handle) = self.clock.wait_for_tick() else {
                break;
            };

            let tick_start = Instant::now();
            let tick = self.controller.on_tick(handle);
            outcome.ticks += 1;
            match tick {
                TickOutcome::Analyzed => {
                    outcome.analyses += 1;
                    self.logger
                        .timing("analyze", tick_start.elapsed().as_secs_f64() * 1000.0);
                }
                TickOutcome::CameraLost => {
                    outcome.camera_error = self.controller.state().error.clone();
                }
                _ => {}
            }

            let camera_on = self.controller.is_active();
            for detection in detections.try_iter() {
                self.logger.engagement(detection.engagement_level());
                self.logger.metric("attention_score", detection.attention_score);
                if let Some(recorder) = self.recorder.as_mut() {
                    let record_start = Instant::now();
                    if recorder.observe(&detection, camera_on, Utc::now()) == RecordOutcome::Recorded
                    {
                        outcome.samples_recorded += 1;
                        self.logger
                            .timing("record", record_start.elapsed().as_secs_f64() * 1000.0);
                    }
                }
                outcome.last_result = Some(detection);
            }

            if tick == TickOutcome::CameraLost {
                self.logger.info("Camera lost, ending tracking");
                break;
            }
        }

        self.controller.stop();
        self.logger.info(&format!(
            "Tracking finished: {} ticks, {} analyses, {} samples",
            outcome.ticks, outcome.analyses, outcome.samples_recorded
        ));
        self.logger.summary();
        Ok(outcome)
    }

    fn should_stop(&self, ticks: u64) -> bool {
        self.cancelled.load(Ordering::Relaxed) || self.max_ticks.is_some_and(|max| ticks >= max)
    }
}
