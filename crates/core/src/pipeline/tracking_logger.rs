use std::collections::HashMap;
use std::time::Instant;

use crate::detection::domain::detection_result::EngagementLevel;

/// Cross-cutting logger for tracking-loop events.
///
/// Decouples the use case from where its observations end up, so the CLI
/// and tests can watch the loop without changing it.
pub trait TrackingLogger: Send {
    /// Record how long a named stage took for one tick.
    fn timing(&mut self, stage: &str, duration_ms: f64);

    /// Record a point-in-time metric (e.g. attention score).
    fn metric(&mut self, name: &str, value: f64);

    /// Count one published detection at `level`.
    fn engagement(&mut self, level: EngagementLevel);

    /// Log a human-readable status message.
    fn info(&mut self, message: &str);

    /// Emit an end-of-run summary. Default: no-op.
    fn summary(&self) {}
}

/// Silent logger that discards all events.
pub struct NullTrackingLogger;

impl TrackingLogger for NullTrackingLogger {
    fn timing(&mut self, _stage: &str, _duration_ms: f64) {}
    fn metric(&mut self, _name: &str, _value: f64) {}
    fn engagement(&mut self, _level: EngagementLevel) {}
    fn info(&mut self, _message: &str) {}
}

/// CLI-oriented logger that tallies stage timings, metrics and engagement
/// levels, and reports them when tracking ends.
pub struct StdoutTrackingLogger {
    timings: HashMap<String, Vec<f64>>,
    metrics: HashMap<String, Vec<f64>>,
    levels: HashMap<EngagementLevel, usize>,
    start_time: Instant,
}

impl StdoutTrackingLogger {
    pub fn new() -> Self {
        Self {
            timings: HashMap::new(),
            metrics: HashMap::new(),
            levels: HashMap::new(),
            start_time: Instant::now(),
        }
    }

    /// Returns the formatted summary string, or `None` if nothing was recorded.
    pub fn summary_string(&self) -> Option<String> {
        if self.timings.is_empty() && self.metrics.is_empty() && self.levels.is_empty() {
            return None;
        }

        let elapsed_ms = self.start_time.elapsed().as_secs_f64() * 1000.0;
        let published: usize = self.levels.values().sum();
        let mut lines = vec![format!(
            "Tracking summary ({published} detections, {:.1}s total):",
            elapsed_ms / 1000.0
        )];

        let mut stages: Vec<_> = self.timings.keys().collect();
        stages.sort();
        for stage in stages {
            let durations = &self.timings[stage];
            let total_ms: f64 = durations.iter().sum();
            let avg_ms = total_ms / durations.len().max(1) as f64;
            lines.push(format!(
                "  {stage:12}: avg {avg_ms:6.1}ms  max {:6.1}ms  ({} runs)",
                durations.iter().cloned().fold(0.0, f64::max),
                durations.len()
            ));
        }

        let mut metric_names: Vec<_> = self.metrics.keys().collect();
        metric_names.sort();
        for name in metric_names {
            let values = &self.metrics[name];
            let avg = values.iter().sum::<f64>() / values.len().max(1) as f64;
            lines.push(format!("  {name}: avg {avg:.2}"));
        }

        for level in EngagementLevel::ALL {
            let count = self.levels.get(level).copied().unwrap_or(0);
            if count > 0 {
                let pct = count as f64 / published as f64 * 100.0;
                lines.push(format!("  {level}: {count} ({pct:.1}%)"));
            }
        }

        Some(lines.join("\n"))
    }

    pub fn timings_for(&self, stage: &str) -> Option<&[f64]> {
        self.timings.get(stage).map(|v| v.as_slice())
    }

    pub fn metrics_for(&self, name: &str) -> Option<&[f64]> {
        self.metrics.get(name).map(|v| v.as_slice())
    }

    pub fn engagement_count(&self, level: EngagementLevel) -> usize {
        self.levels.get(&level).copied().unwrap_or(0)
    }
}

impl Default for StdoutTrackingLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl TrackingLogger for StdoutTrackingLogger {
    fn timing(&mut self, stage: &str, duration_ms: f64) {
        self.timings
            .entry(stage.to_string())
            .or_default()
            .push(duration_ms);
    }

    fn metric(&mut self, name: &str, value: f64) {
        self.metrics
            .entry(name.to_string())
            .or_default()
            .push(value);
    }

    fn engagement(&mut self, level: EngagementLevel) {
        *self.levels.entry(level).or_default() += 1;
    }

    fn info(&mut self, message: &str) {
        log::info!("{message}");
    }

    fn summary(&self) {
        if let Some(text) = self.summary_string() {
            log::info!("\n\n{text}");
        }
    }
}
