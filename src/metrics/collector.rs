// src/metrics/collector.rs
use crate::health::{Execution, State};
use anyhow::Result;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, IntGaugeVec, Opts, Registry,
    TextEncoder,
};
use std::sync::Arc;

pub struct MetricsRegistry {
    registry: Registry,
    collector: Arc<MetricsCollector>,
}

impl MetricsRegistry {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();
        let collector = Arc::new(MetricsCollector::new(&registry)?);

        Ok(Self {
            registry,
            collector,
        })
    }

    pub fn collector(&self) -> Arc<MetricsCollector> {
        self.collector.clone()
    }

    /// Prometheus text encoding of every registered metric.
    pub fn gather(&self) -> Result<Vec<u8>> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(buffer)
    }
}

pub struct MetricsCollector {
    pub check_executions_total: IntCounterVec,
    pub check_duration_seconds: HistogramVec,
    pub check_state: IntGaugeVec,
    pub check_timeouts_total: IntCounterVec,
    pub check_panics_total: IntCounterVec,
    pub registered_checks: IntGauge,
}

impl MetricsCollector {
    pub fn new(registry: &Registry) -> Result<Self> {
        let check_executions_total = IntCounterVec::new(
            Opts::new(
                "health_check_executions_total",
                "Total number of health check executions",
            ),
            &["check", "state"],
        )?;
        registry.register(Box::new(check_executions_total.clone()))?;

        let check_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "health_check_duration_seconds",
                "Health check execution time in seconds",
            ),
            &["check"],
        )?;
        registry.register(Box::new(check_duration_seconds.clone()))?;

        let check_state = IntGaugeVec::new(
            Opts::new(
                "health_check_state",
                "Last cached health check state (0=down, 1=warn, 2=up)",
            ),
            &["check"],
        )?;
        registry.register(Box::new(check_state.clone()))?;

        let check_timeouts_total = IntCounterVec::new(
            Opts::new(
                "health_check_timeouts_total",
                "Health check executions that outlived their timeout",
            ),
            &["check"],
        )?;
        registry.register(Box::new(check_timeouts_total.clone()))?;

        let check_panics_total = IntCounterVec::new(
            Opts::new(
                "health_check_panics_total",
                "Health check functions that panicked",
            ),
            &["check"],
        )?;
        registry.register(Box::new(check_panics_total.clone()))?;

        let registered_checks = IntGauge::new(
            "health_registered_checks",
            "Number of health checks currently being polled",
        )?;
        registry.register(Box::new(registered_checks.clone()))?;

        Ok(Self {
            check_executions_total,
            check_duration_seconds,
            check_state,
            check_timeouts_total,
            check_panics_total,
            registered_checks,
        })
    }

    pub fn record_execution(&self, check: &str, execution: &Execution) {
        let state = execution.check_status.state();
        self.check_executions_total
            .with_label_values(&[check, state.as_str()])
            .inc();

        self.check_duration_seconds
            .with_label_values(&[check])
            .observe(execution.elapsed.as_secs_f64());

        if execution.timed_out {
            self.check_timeouts_total.with_label_values(&[check]).inc();
        }

        if execution.panicked {
            self.check_panics_total.with_label_values(&[check]).inc();
        }

        self.update_check_state(check, state);
    }

    pub fn update_check_state(&self, check: &str, state: State) {
        self.check_state
            .with_label_values(&[check])
            .set(i64::from(state.rank()));
    }

    /// A polling task started; its state begins at the `Down` placeholder.
    pub fn check_started(&self, check: &str) {
        self.registered_checks.inc();
        self.update_check_state(check, State::Down);
    }

    /// A polling task exited. Its state gauge is dropped so a stopped check
    /// is not exported as live.
    pub fn check_stopped(&self, check: &str) {
        self.registered_checks.dec();
        let _ = self.check_state.remove_label_values(&[check]);
    }
}
