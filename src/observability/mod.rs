//! Observability
//!
//! Per-executor metrics with Prometheus text export.

pub mod metrics;

pub use metrics::ExecutionMetrics;
