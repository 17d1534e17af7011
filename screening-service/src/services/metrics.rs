//! Metrics collection and Prometheus export.
//!
//! Initializes the metrics exporter and provides the /metrics endpoint handler.

use crate::models::Finding;
use metrics::counter;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;

/// Global handle to the Prometheus recorder.
pub static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Initialize the metrics recorder.
///
/// This must be called once at startup before any metrics are recorded.
/// Panics if called more than once.
pub fn init_metrics() {
    let builder = PrometheusBuilder::new();
    let handle = builder
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    if METRICS_HANDLE.set(handle).is_err() {
        panic!("failed to set metrics handle: already initialized");
    }
}

/// Get the current metrics in Prometheus text format.
pub fn get_metrics() -> String {
    METRICS_HANDLE
        .get()
        .map(|handle| handle.render())
        .unwrap_or_else(|| "# Metrics recorder not initialized".to_string())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisOutcome {
    Success,
    RejectedInput,
    Failed,
}

impl AnalysisOutcome {
    fn as_str(&self) -> &'static str {
        match self {
            AnalysisOutcome::Success => "success",
            AnalysisOutcome::RejectedInput => "rejected_input",
            AnalysisOutcome::Failed => "failed",
        }
    }
}

pub fn record_analysis(outcome: AnalysisOutcome, findings: &[Finding]) {
    counter!("screening_analyses_total", "outcome" => outcome.as_str()).increment(1);
    for finding in findings {
        counter!("screening_findings_total", "type" => finding.kind.as_str()).increment(1);
    }
}
