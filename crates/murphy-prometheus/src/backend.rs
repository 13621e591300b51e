use prometheus::{
    Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
    proto::MetricFamily,
};

use murphy_core::{MetricsBackend, ProtocolErrorKind, TaskOutcome};

/// Prometheus-backed [`MetricsBackend`]. Cheap to clone; clones share the registry.
#[derive(Clone)]
pub struct PrometheusMetrics {
    registry: Registry,
    requested: IntCounter,
    granted: IntCounter,
    completed: IntCounterVec,
    running: IntGauge,
    protocol_errors: IntCounterVec,
    launch_errors: IntCounterVec,
    manager_errors: IntCounter,
}

impl PrometheusMetrics {
    /// Register all metrics in a fresh registry.
    pub fn new() -> Result<Self, prometheus::Error> {
        Self::with_registry(Registry::new())
    }

    /// Register all metrics in `registry`; fails on duplicate names.
    pub fn with_registry(registry: Registry) -> Result<Self, prometheus::Error> {
        let requested = IntCounter::new(
            "murphy_containers_requested_total",
            "Containers requested from the resource manager",
        )?;
        registry.register(Box::new(requested.clone()))?;

        let granted = IntCounter::new(
            "murphy_containers_granted_total",
            "Grants matched to a queued request",
        )?;
        registry.register(Box::new(granted.clone()))?;

        let completed = IntCounterVec::new(
            Opts::new(
                "murphy_containers_completed_total",
                "Containers completed, by outcome",
            ),
            &["outcome"],
        )?;
        registry.register(Box::new(completed.clone()))?;

        let running = IntGauge::new(
            "murphy_containers_running",
            "Containers granted and not yet completed",
        )?;
        registry.register(Box::new(running.clone()))?;

        let protocol_errors = IntCounterVec::new(
            Opts::new(
                "murphy_protocol_errors_total",
                "Grant and completion bookkeeping mismatches",
            ),
            &["kind"],
        )?;
        registry.register(Box::new(protocol_errors.clone()))?;

        let launch_errors = IntCounterVec::new(
            Opts::new("murphy_launch_errors_total", "Node agent errors, by kind"),
            &["kind"],
        )?;
        registry.register(Box::new(launch_errors.clone()))?;

        let manager_errors = IntCounter::new(
            "murphy_manager_errors_total",
            "Errors reported by the resource manager client",
        )?;
        registry.register(Box::new(manager_errors.clone()))?;

        Ok(Self {
            registry,
            requested,
            granted,
            completed,
            running,
            protocol_errors,
            launch_errors,
            manager_errors,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn gather(&self) -> Vec<MetricFamily> {
        self.registry.gather()
    }

    /// Render every metric in the text exposition format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }

    /// Content type of [`PrometheusMetrics::encode`] output.
    pub fn content_type(&self) -> &'static str {
        prometheus::TEXT_FORMAT
    }
}

impl MetricsBackend for PrometheusMetrics {
    fn record_requested(&self, count: u32) {
        self.requested.inc_by(u64::from(count));
    }

    fn record_granted(&self) {
        self.granted.inc();
        self.running.inc();
    }

    fn record_completed(&self, outcome: TaskOutcome) {
        self.completed.with_label_values(&[outcome.as_str()]).inc();
        self.running.dec();
    }

    fn record_protocol_error(&self, kind: ProtocolErrorKind) {
        self.protocol_errors.with_label_values(&[kind.as_str()]).inc();
    }

    fn record_launch_error(&self, kind: &'static str) {
        self.launch_errors.with_label_values(&[kind]).inc();
    }

    fn record_manager_error(&self) {
        self.manager_errors.inc();
    }
}
