//! Clock and timing utilities.
//!
//! Output files are named with a high-resolution wall-clock stamp so that
//! consecutive jobs never collide, and render durations are measured on a
//! monotonic clock.

use std::time::Instant;

/// A monotonic stopwatch anchored to the moment a job started.
#[derive(Debug, Clone)]
pub struct JobClock {
    /// The instant the job started.
    epoch: Instant,

    /// Wall-clock time at epoch (ISO 8601 string).
    epoch_wall: String,
}

impl JobClock {
    /// Create a new clock anchored to now.
    pub fn start() -> Self {
        Self {
            epoch: Instant::now(),
            epoch_wall: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Get seconds elapsed since the job started.
    pub fn elapsed_secs(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64()
    }

    /// Wall-clock time at job start.
    pub fn epoch_wall(&self) -> &str {
        &self.epoch_wall
    }
}

/// Wall-clock stamp in microseconds since the Unix epoch, for output names.
pub fn output_stamp() -> String {
    chrono::Utc::now().timestamp_micros().to_string()
}

/// Current wall-clock time as RFC 3339.
pub fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Format seconds for engine arguments: fixed precision, no trailing zeros.
pub fn format_secs(value: f64) -> String {
    let fixed = format!("{value:.6}");
    let trimmed = fixed.trim_end_matches('0').trim_end_matches('.');
    if trimmed.is_empty() || trimmed == "-" {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}
