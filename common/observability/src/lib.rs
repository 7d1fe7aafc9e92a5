use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder,
};

/// Metric set for hub dispatches and token issuance.
#[derive(Clone)]
pub struct DispatchMetrics {
    pub registry: Registry,
    pub dispatch_total: IntCounterVec,
    pub dispatch_duration_seconds: HistogramVec,
    pub tokens_issued_total: IntCounterVec,
}

impl DispatchMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        Self::with_registry(Registry::new())
    }

    /// Register the metric set on an existing registry (e.g. the host's global one).
    pub fn with_registry(registry: Registry) -> Result<Self, prometheus::Error> {
        let dispatch_total = IntCounterVec::new(
            Opts::new("hub_dispatch_total", "Hub REST dispatches by operation and outcome"),
            &["operation", "outcome"],
        )?;
        let dispatch_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "hub_dispatch_duration_seconds",
                "Round-trip time of a hub REST dispatch",
            )
            .buckets(vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]),
            &["operation"],
        )?;
        let tokens_issued_total = IntCounterVec::new(
            Opts::new("hub_tokens_issued_total", "Hub access tokens minted by kind"),
            &["kind"],
        )?;

        registry.register(Box::new(dispatch_total.clone()))?;
        registry.register(Box::new(dispatch_duration_seconds.clone()))?;
        registry.register(Box::new(tokens_issued_total.clone()))?;

        Ok(Self {
            registry,
            dispatch_total,
            dispatch_duration_seconds,
            tokens_issued_total,
        })
    }

    pub fn record_dispatch(&self, operation: &str, outcome: &str, elapsed_seconds: f64) {
        self.dispatch_total
            .with_label_values(&[operation, outcome])
            .inc();
        self.dispatch_duration_seconds
            .with_label_values(&[operation])
            .observe(elapsed_seconds);
    }

    pub fn record_token(&self, kind: &str) {
        self.tokens_issued_total.with_label_values(&[kind]).inc();
    }

    /// Text exposition of everything registered on this metric set's registry.
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|err| prometheus::Error::Msg(err.to_string()))
    }
}
