//! Prometheus-style counters for pipeline runs.
//!
//! Without an installed recorder these are no-ops.

use std::time::Duration;

use ::metrics::{counter, histogram};

pub const SWATHS_PROCESSED: &str = "viirs_swaths_processed_total";
pub const SWATHS_SKIPPED: &str = "viirs_swaths_skipped_total";
pub const SWATHS_FAILED: &str = "viirs_swaths_failed_total";
pub const COMPOSITES_PRODUCED: &str = "viirs_composites_produced_total";
pub const DYNAMICS_PRODUCED: &str = "viirs_dynamics_produced_total";
pub const RUN_DURATION: &str = "viirs_run_duration_seconds";

pub fn swath_processed() {
    counter!(SWATHS_PROCESSED).increment(1);
}

pub fn swath_skipped() {
    counter!(SWATHS_SKIPPED).increment(1);
}

pub fn swath_failed(kind: &'static str) {
    counter!(SWATHS_FAILED, "error" => kind).increment(1);
}

pub fn composite_produced() {
    counter!(COMPOSITES_PRODUCED).increment(1);
}

pub fn dynamics_produced() {
    counter!(DYNAMICS_PRODUCED).increment(1);
}

pub fn run_finished(duration: Duration) {
    histogram!(RUN_DURATION).record(duration.as_secs_f64());
}
