//! # Profiler
//!
//! Stage timing for progress logs. Each line is the label padded with dots
//! to a fixed column, followed by the seconds since the profiler started.
//!
//! ```text
//! Separating loose parts.......................................0.4 s
//! ```

use std::time::Instant;

use config::constants::PROFILER_LABEL_WIDTH;
use tracing::info;

/// Wall-clock stopwatch started at construction.
#[derive(Debug, Clone, Copy)]
pub struct Profiler {
    start: Instant,
}

impl Default for Profiler {
    fn default() -> Self {
        Self::new()
    }
}

impl Profiler {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Formats `label` with the elapsed time.
    pub fn timed(&self, label: &str) -> String {
        format_timed(label, self.start.elapsed().as_secs_f64())
    }

    /// Logs `label` with the elapsed time at info level.
    pub fn log(&self, label: &str) {
        info!("{}", self.timed(label));
    }
}

fn format_timed(label: &str, seconds: f64) -> String {
    format!("{label:.<width$}{seconds:.1} s", width = PROFILER_LABEL_WIDTH)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_pads_with_dots() {
        let line = format_timed("Multisecting", 1.25);
        assert!(line.starts_with("Multisecting...."));
        assert!(line.ends_with("1.2 s") || line.ends_with("1.3 s"));
        assert_eq!(line.find(char::is_numeric), Some(PROFILER_LABEL_WIDTH));
    }

    #[test]
    fn test_long_label_is_not_truncated() {
        let label = "x".repeat(PROFILER_LABEL_WIDTH + 5);
        let line = format_timed(&label, 0.0);
        assert!(line.starts_with(&label));
        assert!(line.ends_with("0.0 s"));
    }

    #[test]
    fn test_timed_uses_elapsed() {
        let profiler = Profiler::new();
        assert!(profiler.timed("Start").ends_with(" s"));
    }
}
