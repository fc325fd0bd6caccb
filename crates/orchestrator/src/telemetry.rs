//! Structured per-node and per-request telemetry (C12, §4.12): one
//! `tracing` record at node end carrying `latency_ms` plus node-specific
//! fields, mirrored into Prometheus counters/histograms for `GET /metrics`.

use std::time::Instant;

use docqa_core::category::ErrorCategory;
use docqa_core::pipeline::PipelineNode;

/// Starts timing a node; call `finish` when the node completes.
pub struct NodeTimer {
    node: PipelineNode,
    start: Instant,
}

impl NodeTimer {
    pub fn start(node: PipelineNode) -> Self {
        Self { node, start: Instant::now() }
    }

    /// Emits the node-end structured log and records Prometheus metrics.
    /// `fields` are extra node-specific attributes already rendered (e.g.
    /// `"count=3"`) since `tracing`'s macro can't take a dynamic field list.
    pub fn finish(self, fields: &str) {
        let latency_ms = self.start.elapsed().as_millis() as u64;
        let node = self.node.as_str();
        tracing::info!(node, latency_ms, fields, "pipeline node completed");
        metrics::counter!("docqa_pipeline_requests_total", "node" => node.to_string()).increment(1);
        metrics::histogram!("docqa_pipeline_node_latency_ms", "node" => node.to_string()).record(latency_ms as f64);
    }

    /// Variant for a node that failed; records the error category instead of
    /// node-specific output fields.
    pub fn finish_error(self, category: ErrorCategory) {
        let latency_ms = self.start.elapsed().as_millis() as u64;
        let node = self.node.as_str();
        let category_str = category.as_str();
        tracing::warn!(node, latency_ms, category = category_str, "pipeline node failed");
        metrics::counter!("docqa_pipeline_errors_total", "category" => category_str.to_string()).increment(1);
    }
}

/// Times the whole request; call `finish` once with the terminal outcome.
pub struct RequestTimer {
    start: Instant,
}

impl RequestTimer {
    pub fn start() -> Self {
        Self { start: Instant::now() }
    }

    pub fn finish_generated(self) {
        let total_duration_ms = self.start.elapsed().as_millis() as u64;
        tracing::info!(total_duration_ms, outcome = "generated", "pipeline request completed");
        metrics::histogram!("docqa_pipeline_request_duration_ms").record(total_duration_ms as f64);
    }

    pub fn finish_failed(self, category: ErrorCategory) {
        let total_duration_ms = self.start.elapsed().as_millis() as u64;
        let category_str = category.as_str();
        tracing::warn!(total_duration_ms, outcome = "failed", category = category_str, "pipeline request completed");
        metrics::histogram!("docqa_pipeline_request_duration_ms").record(total_duration_ms as f64);
        metrics::counter!("docqa_pipeline_errors_total", "category" => category_str.to_string()).increment(1);
    }
}
