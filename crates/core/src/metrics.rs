//! Prometheus metrics for engine invocations.

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, Opts};

/// Engine jobs total by operation and result.
pub static JOBS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("soundshift_jobs_total", "Total engine jobs"),
        &["operation", "result"], // operation: "convert", "edit"
    )
    .unwrap()
});

/// Engine job duration in seconds.
pub static JOB_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "soundshift_job_duration_seconds",
            "Duration of engine runs",
        )
        .buckets(vec![0.1, 0.5, 1.0, 5.0, 10.0, 30.0, 60.0, 300.0, 900.0]),
        &["operation"],
    )
    .unwrap()
});

/// Result label for a finished job.
pub fn result_label<T>(result: &Result<T, crate::converter::ConverterError>) -> &'static str {
    match result {
        Ok(_) => "success",
        Err(e) if e.is_killed() => "killed",
        Err(e) => match e.kind() {
            "execution_failed" => "failed",
            kind => kind,
        },
    }
}

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![Box::new(JOBS_TOTAL.clone()), Box::new(JOB_DURATION.clone())]
}
