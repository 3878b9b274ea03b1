use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder,
};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub assignment_commands_total: IntCounterVec,
    pub assignment_conflicts_total: IntCounterVec,
    pub assignment_command_latency_seconds: HistogramVec,
    pub report_exports_total: IntCounterVec,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let assignment_commands_total = IntCounterVec::new(
            Opts::new(
                "assignment_commands_total",
                "Assignment commands by operation and outcome",
            ),
            &["operation", "outcome"],
        )
        .expect("valid assignment_commands_total metric");

        let assignment_conflicts_total = IntCounterVec::new(
            Opts::new(
                "assignment_conflicts_total",
                "Rejected assignment writes by colliding subject",
            ),
            &["subject"],
        )
        .expect("valid assignment_conflicts_total metric");

        let assignment_command_latency_seconds = HistogramVec::new(
            HistogramOpts::new(
                "assignment_command_latency_seconds",
                "Latency of assignment commands in seconds",
            ),
            &["operation"],
        )
        .expect("valid assignment_command_latency_seconds metric");

        let report_exports_total = IntCounterVec::new(
            Opts::new("report_exports_total", "Report CSV exports by outcome"),
            &["outcome"],
        )
        .expect("valid report_exports_total metric");

        registry
            .register(Box::new(assignment_commands_total.clone()))
            .expect("register assignment_commands_total");
        registry
            .register(Box::new(assignment_conflicts_total.clone()))
            .expect("register assignment_conflicts_total");
        registry
            .register(Box::new(assignment_command_latency_seconds.clone()))
            .expect("register assignment_command_latency_seconds");
        registry
            .register(Box::new(report_exports_total.clone()))
            .expect("register report_exports_total");

        Self {
            registry,
            assignment_commands_total,
            assignment_conflicts_total,
            assignment_command_latency_seconds,
            report_exports_total,
        }
    }

    pub fn encode(&self) -> Result<String, String> {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();

        TextEncoder::new()
            .encode(&metric_families, &mut buffer)
            .map_err(|err| format!("failed to encode metrics: {err}"))?;

        String::from_utf8(buffer).map_err(|err| format!("metrics are not valid utf8: {err}"))
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
