//! Prometheus metrics for the worker.

use std::net::{Ipv4Addr, SocketAddr};

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::error::{WorkerError, WorkerResult};

/// Install the Prometheus recorder with an HTTP listener on `port`.
///
/// Must be called from within the Tokio runtime.
pub fn init_metrics(port: u16) -> WorkerResult<SocketAddr> {
    let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, port));
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| WorkerError::config_error(format!("metrics exporter: {}", e)))?;
    Ok(addr)
}

/// Metric names as constants for consistency.
pub mod names {
    // Job metrics
    pub const JOBS_STARTED_TOTAL: &str = "framegrab_jobs_started_total";
    pub const JOBS_COMPLETED_TOTAL: &str = "framegrab_jobs_completed_total";
    pub const JOBS_FAILED_TOTAL: &str = "framegrab_jobs_failed_total";
    pub const JOBS_MALFORMED_TOTAL: &str = "framegrab_jobs_malformed_total";
    pub const JOB_DURATION_SECONDS: &str = "framegrab_job_duration_seconds";

    // Queue metrics
    pub const QUEUE_ERRORS_TOTAL: &str = "framegrab_queue_errors_total";

    // Processing metrics
    pub const FRAMES_EXTRACTED_TOTAL: &str = "framegrab_frames_extracted_total";
    pub const FRAMES_UPLOADED_TOTAL: &str = "framegrab_frames_uploaded_total";
    pub const PIPELINE_DURATION_SECONDS: &str = "framegrab_pipeline_duration_seconds";
    pub const UPLOAD_DURATION_SECONDS: &str = "framegrab_upload_duration_seconds";
}

pub fn record_job_started() {
    counter!(names::JOBS_STARTED_TOTAL).increment(1);
}

pub fn record_job_completed(duration_secs: f64) {
    counter!(names::JOBS_COMPLETED_TOTAL).increment(1);
    histogram!(names::JOB_DURATION_SECONDS, "outcome" => "done").record(duration_secs);
}

/// Record job failed, labelled by failure kind.
pub fn record_job_failed(kind: &'static str, duration_secs: f64) {
    counter!(names::JOBS_FAILED_TOTAL, "kind" => kind).increment(1);
    histogram!(names::JOB_DURATION_SECONDS, "outcome" => "error").record(duration_secs);
}

pub fn record_malformed_job() {
    counter!(names::JOBS_MALFORMED_TOTAL).increment(1);
}

pub fn record_queue_error() {
    counter!(names::QUEUE_ERRORS_TOTAL).increment(1);
}

pub fn record_frames_extracted(count: usize) {
    counter!(names::FRAMES_EXTRACTED_TOTAL).increment(count as u64);
}

pub fn record_frames_uploaded(count: usize) {
    counter!(names::FRAMES_UPLOADED_TOTAL).increment(count as u64);
}

pub fn record_pipeline_duration(duration_secs: f64) {
    histogram!(names::PIPELINE_DURATION_SECONDS).record(duration_secs);
}

pub fn record_upload_duration(duration_secs: f64) {
    histogram!(names::UPLOAD_DURATION_SECONDS).record(duration_secs);
}
