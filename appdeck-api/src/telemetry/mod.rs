//! AppDeck Telemetry - Observability Infrastructure
//!
//! Structured logging, Prometheus metrics and the in-process performance
//! aggregate. Everything works standalone without external collectors.

pub mod metrics;
pub mod middleware;
pub mod performance;
pub mod tracer;

pub use metrics::{metrics_handler, AppdeckMetrics, METRICS};
pub use middleware::observability_middleware;
pub use performance::{PerformanceSnapshot, PerformanceStats};
pub use tracer::{init_tracer, LogFormat, TelemetryConfig};
