/// Ideal capture resolution requested from the camera; also the frame size
/// assumed when a source has not negotiated one yet.
pub const TARGET_WIDTH: u32 = 640;
pub const TARGET_HEIGHT: u32 = 480;

/// Front-facing camera.
pub const FACING_MODE: &str = "user";

/// Pixel sampling stride on both axes.
pub const SAMPLE_STRIDE: usize = 4;

/// Run the analyzer on every Nth tick of the capture loop.
pub const ANALYZE_EVERY_N_TICKS: u64 = 3;

/// Bytes per pixel of frames handed to the analyzer.
pub const RGBA_CHANNELS: u8 = 4;

/// Display refresh rate assumed by the frame clock when none is configured.
pub const DEFAULT_REFRESH_HZ: u32 = 60;

/// Minimum spacing between two persisted engagement samples.
pub const METRIC_INTERVAL_MS: i64 = 1000;
