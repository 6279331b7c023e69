use prometheus::{Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

// ============================================================================
// Metrics Module - Prometheus metrics for the order pipeline
// ============================================================================
//
// Tracks:
// - Pipeline runs by outcome, and their latency
// - Per-stage invocations and rejections
// - Runs cut short by cancellation
//
// Exposed over HTTP at /metrics by the api module.
// ============================================================================

pub struct PipelineMetrics {
    registry: Registry,

    pub runs_total: IntCounterVec,
    pub run_duration: Histogram,
    pub stage_invocations_total: IntCounterVec,
    pub stage_failures_total: IntCounterVec,
    pub cancellations_total: IntCounter,
}

impl PipelineMetrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let runs_total = IntCounterVec::new(
            Opts::new("pipeline_runs_total", "Total pipeline runs"),
            &["outcome"],
        )?;
        registry.register(Box::new(runs_total.clone()))?;

        let run_duration = Histogram::with_opts(
            HistogramOpts::new("pipeline_run_duration_seconds", "Pipeline run duration")
                .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]),
        )?;
        registry.register(Box::new(run_duration.clone()))?;

        let stage_invocations_total = IntCounterVec::new(
            Opts::new("pipeline_stage_invocations_total", "Total stage invocations"),
            &["stage"],
        )?;
        registry.register(Box::new(stage_invocations_total.clone()))?;

        let stage_failures_total = IntCounterVec::new(
            Opts::new("pipeline_stage_failures_total", "Total orders rejected by a stage"),
            &["stage"],
        )?;
        registry.register(Box::new(stage_failures_total.clone()))?;

        let cancellations_total = IntCounter::new(
            "pipeline_cancellations_total",
            "Total runs cancelled between stages",
        )?;
        registry.register(Box::new(cancellations_total.clone()))?;

        Ok(Self {
            registry,
            runs_total,
            run_duration,
            stage_invocations_total,
            stage_failures_total,
            cancellations_total,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn record_run(&self, success: bool, duration_secs: f64) {
        let outcome = if success { "success" } else { "failure" };
        self.runs_total.with_label_values(&[outcome]).inc();
        self.run_duration.observe(duration_secs);
    }

    pub fn record_stage_invocation(&self, stage: &str) {
        self.stage_invocations_total.with_label_values(&[stage]).inc();
    }

    pub fn record_stage_failure(&self, stage: &str) {
        self.stage_failures_total.with_label_values(&[stage]).inc();
    }

    pub fn record_cancellation(&self) {
        self.cancellations_total.inc();
    }

    pub fn runs(&self, outcome: &str) -> u64 {
        self.runs_total.with_label_values(&[outcome]).get()
    }

    pub fn stage_invocations(&self, stage: &str) -> u64 {
        self.stage_invocations_total.with_label_values(&[stage]).get()
    }

    pub fn stage_failures(&self, stage: &str) -> u64 {
        self.stage_failures_total.with_label_values(&[stage]).get()
    }

    /// Render every registered metric in the Prometheus text format
    pub fn encode(&self) -> anyhow::Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_creation() {
        let metrics = PipelineMetrics::new().unwrap();
        // Vec metrics only show up once a label set is touched
        assert!(!metrics.registry().gather().is_empty());
    }

    #[test]
    fn test_record_run() {
        let metrics = PipelineMetrics::new().unwrap();
        metrics.record_run(true, 0.01);
        metrics.record_run(true, 0.02);
        metrics.record_run(false, 0.03);

        assert_eq!(metrics.runs("success"), 2);
        assert_eq!(metrics.runs("failure"), 1);
        assert_eq!(metrics.run_duration.get_sample_count(), 3);
    }

    #[test]
    fn test_stage_counters_are_per_stage() {
        let metrics = PipelineMetrics::new().unwrap();
        metrics.record_stage_invocation("validation");
        metrics.record_stage_invocation("inventory");
        metrics.record_stage_failure("inventory");

        assert_eq!(metrics.stage_invocations("validation"), 1);
        assert_eq!(metrics.stage_invocations("inventory"), 1);
        assert_eq!(metrics.stage_failures("inventory"), 1);
        assert_eq!(metrics.stage_failures("validation"), 0);
    }

    #[test]
    fn test_encode_contains_metric_names() {
        let metrics = PipelineMetrics::new().unwrap();
        metrics.record_cancellation();
        metrics.record_run(false, 0.5);

        let text = metrics.encode().unwrap();
        assert!(text.contains("pipeline_cancellations_total 1"));
        assert!(text.contains("pipeline_runs_total{outcome=\"failure\"} 1"));
    }
}
