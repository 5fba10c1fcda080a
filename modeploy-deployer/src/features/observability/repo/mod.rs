use prometheus::{
    opts, Counter, CounterVec, Encoder, Gauge, HistogramOpts, HistogramVec, Registry, TextEncoder,
};

pub struct ObservabilityRepository {
    registry: Registry,
    deploy_total: CounterVec,
    undeploy_total: CounterVec,
    status_query_total: Counter,
    running_modules: Gauge,
    invalid_instance_names_total: Counter,
    api_request_latency_seconds: HistogramVec,
}

impl ObservabilityRepository {
    pub fn new() -> Result<Self, String> {
        let registry = Registry::new();

        let deploy_total = CounterVec::new(
            opts!("modeploy_deploy_total", "Deploy requests by outcome"),
            &["outcome"],
        )
        .map_err(|e| e.to_string())?;
        let undeploy_total = CounterVec::new(
            opts!("modeploy_undeploy_total", "Undeploy requests by outcome"),
            &["outcome"],
        )
        .map_err(|e| e.to_string())?;
        let status_query_total = Counter::with_opts(opts!(
            "modeploy_status_query_total",
            "Status queries against the cluster"
        ))
        .map_err(|e| e.to_string())?;
        let running_modules = Gauge::with_opts(opts!(
            "modeploy_running_modules",
            "Modules with at least one running instance at the last status query"
        ))
        .map_err(|e| e.to_string())?;
        let invalid_instance_names_total = Counter::with_opts(opts!(
            "modeploy_invalid_instance_names_total",
            "Instance names carrying the deployer prefix that failed to decode"
        ))
        .map_err(|e| e.to_string())?;
        let api_request_latency_seconds = HistogramVec::new(
            HistogramOpts::new(
                "modeploy_api_request_latency_seconds",
                "Deployer API request latency (seconds)",
            ),
            &["endpoint"],
        )
        .map_err(|e| e.to_string())?;

        registry
            .register(Box::new(deploy_total.clone()))
            .map_err(|e| e.to_string())?;
        registry
            .register(Box::new(undeploy_total.clone()))
            .map_err(|e| e.to_string())?;
        registry
            .register(Box::new(status_query_total.clone()))
            .map_err(|e| e.to_string())?;
        registry
            .register(Box::new(running_modules.clone()))
            .map_err(|e| e.to_string())?;
        registry
            .register(Box::new(invalid_instance_names_total.clone()))
            .map_err(|e| e.to_string())?;
        registry
            .register(Box::new(api_request_latency_seconds.clone()))
            .map_err(|e| e.to_string())?;

        Ok(Self {
            registry,
            deploy_total,
            undeploy_total,
            status_query_total,
            running_modules,
            invalid_instance_names_total,
            api_request_latency_seconds,
        })
    }

    pub fn inc_deploy(&self, outcome: &str) {
        self.deploy_total.with_label_values(&[outcome]).inc();
    }

    pub fn inc_undeploy(&self, outcome: &str) {
        self.undeploy_total.with_label_values(&[outcome]).inc();
    }

    pub fn inc_status_query(&self) {
        self.status_query_total.inc();
    }

    pub fn set_running_modules(&self, count: f64) {
        self.running_modules.set(count);
    }

    pub fn inc_invalid_instance_names(&self, count: u64) {
        self.invalid_instance_names_total.inc_by(count as f64);
    }

    pub fn observe_api_request(&self, endpoint: &str, seconds: f64) {
        self.api_request_latency_seconds
            .with_label_values(&[endpoint])
            .observe(seconds);
    }

    pub fn render_metrics(&self) -> Result<String, String> {
        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();
        let families = self.registry.gather();
        encoder
            .encode(&families, &mut buffer)
            .map_err(|e| e.to_string())?;
        String::from_utf8(buffer).map_err(|e| e.to_string())
    }
}
