//! Prometheus metrics backend for the murphy orchestrator.
//!
//! [`PrometheusMetrics`] implements [`murphy_core::MetricsBackend`]; hand it to
//! `Orchestrator::with_metrics` and serve [`PrometheusMetrics::encode`] from any HTTP
//! framework.
//!
//! ## Metrics
//! - `murphy_containers_requested_total` - Counter
//! - `murphy_containers_granted_total` - Counter
//! - `murphy_containers_completed_total{outcome}` - Counter
//! - `murphy_containers_running` - Gauge
//! - `murphy_protocol_errors_total{kind}` - Counter
//! - `murphy_launch_errors_total{kind}` - Counter
//! - `murphy_manager_errors_total` - Counter

mod backend;
pub use backend::PrometheusMetrics;

pub use prometheus::{Encoder, Registry, TextEncoder};
