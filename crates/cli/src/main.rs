mod settings;

use std::path::{Path, PathBuf};
use std::process;

use chrono::Utc;
use clap::Parser;
use serde::Serialize;

use focustrack_core::capture::capture_controller::CaptureController;
use focustrack_core::capture::infrastructure::ffmpeg_camera::FfmpegCameraProvider;
use focustrack_core::capture::infrastructure::frame_clock_scheduler::FrameClockScheduler;
use focustrack_core::capture::infrastructure::still_image_source::StillImageSource;
use focustrack_core::detection::domain::detection_result::{DetectionResult, EngagementLevel};
use focustrack_core::detection::domain::frame_analyzer::FrameAnalyzer;
use focustrack_core::detection::infrastructure::skin_tone_analyzer::SkinToneAnalyzer;
use focustrack_core::pipeline::track_engagement_use_case::TrackEngagementUseCase;
use focustrack_core::pipeline::tracking_logger::StdoutTrackingLogger;
use focustrack_core::telemetry::domain::consent::Consent;
use focustrack_core::telemetry::domain::engagement_sample::Participant;
use focustrack_core::telemetry::domain::metric_sink::MetricSink;
use focustrack_core::telemetry::domain::session_report::SessionReport;
use focustrack_core::telemetry::infrastructure::fan_out_metric_sink::FanOutMetricSink;
use focustrack_core::telemetry::infrastructure::jsonl_metric_sink::JsonLinesMetricSink;
use focustrack_core::telemetry::infrastructure::memory_metric_sink::MemoryMetricSink;
use focustrack_core::telemetry::infrastructure::rest_metric_sink::RestMetricSink;
use focustrack_core::telemetry::metric_recorder::MetricRecorder;

use settings::Settings;

const DEFAULT_SESSION_ID: &str = "local";
const DEFAULT_PARTICIPANT_ID: &str = "participant";

/// Webcam attention tracking for video meetings.
#[derive(Parser, Debug)]
#[command(name = "focustrack")]
struct Cli {
    /// Capture device or media URL (e.g. /dev/video0, rtsp://host/stream).
    #[arg(long)]
    device: Option<String>,

    /// Capture backend for --device: v4l2, avfoundation or dshow.
    #[arg(long)]
    input_format: Option<String>,

    /// Analyze a single still image and print the result as JSON.
    #[arg(long)]
    image: Option<PathBuf>,

    /// Stop after this many ticks (default: until the camera goes away).
    #[arg(long)]
    ticks: Option<u64>,

    /// Session the samples belong to.
    #[arg(long, default_value = DEFAULT_SESSION_ID)]
    session_id: String,

    /// Participant the samples belong to.
    #[arg(long)]
    participant_id: Option<String>,

    /// Consent to recording engagement samples.
    #[arg(long)]
    consent: bool,

    /// Append samples to this JSON lines file.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Metrics store base URL; samples are inserted over REST.
    #[arg(long)]
    endpoint: Option<String>,

    /// API key for --endpoint.
    #[arg(long)]
    api_key: Option<String>,

    /// Tick rate of the capture loop in Hz.
    #[arg(long)]
    refresh_hz: Option<u32>,

    /// Print a session report as JSON when tracking ends.
    #[arg(long)]
    report: bool,

    /// Persist device, endpoint, API key, participant and refresh rate as
    /// defaults for later runs.
    #[arg(long)]
    save_settings: bool,

    /// Set when `endpoint` came from the saved settings, not the command line.
    #[arg(skip)]
    endpoint_from_settings: bool,
}

/// Where live samples are written, besides the in-memory report store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RecordingTarget<'a> {
    Rest { endpoint: &'a str, api_key: &'a str },
    JsonLines(&'a Path),
}

#[derive(Serialize)]
struct ImageAnalysis<'a> {
    #[serde(flatten)]
    detection: &'a DetectionResult,
    engagement_level: EngagementLevel,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = apply_settings(Cli::parse(), Settings::load());
    validate(&cli)?;

    if cli.save_settings {
        let path = settings_from(&cli).save()?;
        log::info!("Settings saved to {}", path.display());
    }

    match &cli.image {
        Some(path) => run_image(path),
        None => run_live(&cli),
    }
}

/// Fills flags the user left out from the saved settings.
fn apply_settings(mut cli: Cli, settings: Settings) -> Cli {
    if cli.image.is_none() {
        cli.device = cli.device.or(settings.device);
    }
    cli.input_format = cli.input_format.or(settings.input_format);
    if cli.endpoint.is_none() && settings.endpoint.is_some() {
        cli.endpoint = settings.endpoint;
        cli.endpoint_from_settings = true;
    }
    cli.api_key = cli.api_key.or(settings.api_key);
    cli.participant_id = cli.participant_id.or(settings.participant_id);
    cli.refresh_hz = cli.refresh_hz.or(Some(settings.refresh_hz));
    cli
}

fn settings_from(cli: &Cli) -> Settings {
    let defaults = Settings::default();
    Settings {
        device: cli.device.clone(),
        input_format: cli.input_format.clone(),
        endpoint: cli.endpoint.clone(),
        api_key: cli.api_key.clone(),
        participant_id: cli.participant_id.clone(),
        refresh_hz: cli.refresh_hz.unwrap_or(defaults.refresh_hz),
    }
}

fn run_image(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let mut source = StillImageSource::open(path)?;
    let frame = source.frame()?;
    let detection = SkinToneAnalyzer::new().analyze(&frame)?;
    log::info!(
        "Analyzed {} ({}x{})",
        path.display(),
        frame.width(),
        frame.height()
    );

    let analysis = ImageAnalysis {
        detection: &detection,
        engagement_level: detection.engagement_level(),
    };
    println!("{}", serde_json::to_string_pretty(&analysis)?);
    Ok(())
}

fn run_live(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let device = cli.device.as_deref().ok_or("--device is required")?;
    let refresh_hz = cli.refresh_hz.unwrap_or_default();

    let mut camera = FfmpegCameraProvider::new(device);
    if let Some(format) = &cli.input_format {
        camera = camera.with_input_format(format);
    }
    let (scheduler, clock) = FrameClockScheduler::new(refresh_hz);
    let controller = CaptureController::new(
        Box::new(camera),
        Box::new(scheduler),
        Box::new(SkinToneAnalyzer::new()),
    );

    let report_store = cli.report.then(MemoryMetricSink::new);
    let recorder = build_sink(cli, report_store.as_ref())?.map(|sink| {
        let participant = Participant::new(
            cli.session_id.clone(),
            cli.participant_id
                .clone()
                .unwrap_or_else(|| DEFAULT_PARTICIPANT_ID.to_string()),
        );
        let consent = if cli.consent {
            Consent::granted(Utc::now())
        } else {
            Consent::default()
        };
        MetricRecorder::new(sink, participant, consent)
    });

    let mut use_case = TrackEngagementUseCase::new(
        controller,
        clock,
        recorder,
        Box::new(StdoutTrackingLogger::new()),
    );
    if let Some(ticks) = cli.ticks {
        use_case = use_case.with_max_ticks(ticks);
    }

    let started_at = Utc::now();
    let outcome = use_case.execute()?;
    let ended_at = Utc::now();

    if let Some(error) = &outcome.camera_error {
        log::warn!("Tracking ended early: {}", error.user_message());
    }
    if let Some(failures) = use_case.recorder().map(|r| r.failures()).filter(|&n| n > 0) {
        log::warn!("{failures} samples could not be recorded");
    }

    if let Some(store) = &report_store {
        let samples = store.samples();
        match SessionReport::from_samples(&samples, 1, Some(started_at), Some(ended_at)) {
            Some(report) => println!("{}", serde_json::to_string_pretty(&report)?),
            None => log::warn!("No samples recorded, skipping session report"),
        }
    }
    Ok(())
}

/// Picks where samples go. An endpoint given on the command line wins, then
/// `--output`, then a saved endpoint. A saved endpoint is skipped without
/// `--consent`, so tracking still runs.
fn recording_target(cli: &Cli) -> Option<RecordingTarget<'_>> {
    let rest = match (&cli.endpoint, &cli.api_key) {
        (Some(endpoint), Some(api_key)) => Some(RecordingTarget::Rest { endpoint, api_key }),
        _ => None,
    };
    if !cli.endpoint_from_settings && rest.is_some() {
        return rest;
    }
    if let Some(path) = &cli.output {
        return Some(RecordingTarget::JsonLines(path));
    }
    if rest.is_some() && !cli.consent {
        log::warn!("No --consent given, not recording to the saved endpoint");
        return None;
    }
    rest
}

/// Builds the sink for the recording target, plus the report store when a
/// report was asked for.
fn build_sink(
    cli: &Cli,
    report_store: Option<&MemoryMetricSink>,
) -> Result<Option<Box<dyn MetricSink>>, Box<dyn std::error::Error>> {
    let mut sinks: Vec<Box<dyn MetricSink>> = Vec::new();
    match recording_target(cli) {
        Some(RecordingTarget::Rest { endpoint, api_key }) => {
            log::info!("Recording samples to {endpoint}");
            sinks.push(Box::new(RestMetricSink::new(endpoint, api_key)?));
        }
        Some(RecordingTarget::JsonLines(path)) => {
            log::info!("Recording samples to {}", path.display());
            sinks.push(Box::new(JsonLinesMetricSink::create(path)?));
        }
        None => {}
    }
    if let Some(store) = report_store {
        sinks.push(Box::new(store.clone()));
    }

    if sinks.len() > 1 {
        return Ok(Some(Box::new(FanOutMetricSink::new(sinks))));
    }
    Ok(sinks.pop())
}

fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(image) = &cli.image {
        if cli.device.is_some() {
            return Err("--image and --device are mutually exclusive".into());
        }
        if !image.exists() {
            return Err(format!("Image file not found: {}", image.display()).into());
        }
        return Ok(());
    }
    if cli.device.is_none() {
        return Err("Either --device or --image is required".into());
    }
    if cli.refresh_hz == Some(0) {
        return Err("Refresh rate must be greater than 0".into());
    }
    if cli.ticks == Some(0) {
        return Err("Ticks must be greater than 0".into());
    }
    if cli.endpoint.is_some() && cli.api_key.is_none() {
        return Err("--endpoint requires --api-key".into());
    }
    let explicit_endpoint = cli.endpoint.is_some() && !cli.endpoint_from_settings;
    let records = explicit_endpoint || cli.output.is_some() || cli.report;
    if records && !cli.consent {
        return Err("Recording engagement samples requires --consent".into());
    }
    Ok(())
}
