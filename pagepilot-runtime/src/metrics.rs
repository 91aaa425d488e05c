//! Metrics instrumentation for runtime observability.

use std::time::Instant;

/// Record model request latency, retries included.
pub fn record_model_latency(duration_ms: f64) {
    metrics::histogram!("model_request_latency", duration_ms);
}

/// Record tool execution latency.
pub fn record_tool_latency(duration_ms: f64) {
    metrics::histogram!("tool_execution_latency", duration_ms);
}

/// Record one full conversation run.
pub fn record_run_duration(duration_ms: f64) {
    metrics::histogram!("conversation_run_duration", duration_ms);
}

pub fn increment_model_retries() {
    metrics::counter!("model_retry_count", 1);
}

pub fn increment_tool_errors() {
    metrics::counter!("tool_error_count", 1);
}

pub fn record_images_pruned(count: usize) {
    metrics::counter!("images_pruned", count as u64);
}

/// RAII timer for automatic metric recording.
pub struct MetricTimer {
    start: Instant,
    metric_name: &'static str,
}

impl MetricTimer {
    pub fn new(metric_name: &'static str) -> Self {
        Self {
            start: Instant::now(),
            metric_name,
        }
    }
}

impl Drop for MetricTimer {
    fn drop(&mut self) {
        let duration_ms = self.start.elapsed().as_secs_f64() * 1000.0;
        match self.metric_name {
            "model_request_latency" => record_model_latency(duration_ms),
            "tool_execution_latency" => record_tool_latency(duration_ms),
            "conversation_run_duration" => record_run_duration(duration_ms),
            _ => {}
        }
    }
}
