//! Statistics region.
//!
//! Brackets the measured part of a benchmark. Nothing outside the region
//! counts toward its time.

use std::time::{Duration, Instant};

use tracing::debug;

/// Open statistics region.
#[derive(Debug)]
#[must_use = "close the region with `off()`"]
pub struct StatsRegion {
    label: &'static str,
    start: Instant,
}

/// Start counting stats for `label`.
pub fn stats_on(label: &'static str) -> StatsRegion {
    debug!("stats on: {label}");
    StatsRegion {
        label,
        start: Instant::now(),
    }
}

impl StatsRegion {
    /// Stop counting and return the time spent inside the region.
    pub fn off(self) -> Duration {
        let elapsed = self.start.elapsed();
        debug!("stats off: {} ({} µs)", self.label, elapsed.as_micros());
        elapsed
    }

    /// Label the region was opened with.
    pub const fn label(&self) -> &'static str {
        self.label
    }
}
