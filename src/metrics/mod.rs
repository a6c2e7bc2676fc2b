// Private module declaration
mod server;

use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry};

// Re-export for public API
pub use server::start_metrics_server;

// ============================================================================
// Metrics Module - Prometheus metrics for the registration flow
// ============================================================================
//
// Covers:
// - Read-after-write polling (attempts, found vs. timed out, wait time)
// - Saga outcomes per operation
// - Command dispatch
//
// All metrics live in one registry scraped via /metrics
// ============================================================================

pub struct Metrics {
    registry: Registry,

    // Polling
    pub poll_attempts_total: IntCounterVec,
    pub poll_outcomes_total: IntCounterVec,
    pub poll_wait_seconds: HistogramVec,

    // Saga
    pub saga_outcomes_total: IntCounterVec,

    // Commands
    pub commands_dispatched_total: IntCounterVec,
    pub command_dispatch_failures_total: IntCounterVec,
}

impl Metrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let poll_attempts_total = IntCounterVec::new(
            Opts::new("registration_poll_attempts_total", "Read model reads issued while polling"),
            &["profile"],
        )?;
        registry.register(Box::new(poll_attempts_total.clone()))?;

        let poll_outcomes_total = IntCounterVec::new(
            Opts::new("registration_poll_outcomes_total", "Polls by outcome (found, timed_out)"),
            &["profile", "outcome"],
        )?;
        registry.register(Box::new(poll_outcomes_total.clone()))?;

        let poll_wait_seconds = HistogramVec::new(
            HistogramOpts::new("registration_poll_wait_seconds", "Time spent waiting for the read model")
                .buckets(vec![0.001, 0.01, 0.1, 0.3, 0.5, 1.0, 2.0, 5.0, 10.0]),
            &["profile"],
        )?;
        registry.register(Box::new(poll_wait_seconds.clone()))?;

        let saga_outcomes_total = IntCounterVec::new(
            Opts::new("registration_saga_outcomes_total", "Registration step results"),
            &["operation", "outcome"],
        )?;
        registry.register(Box::new(saga_outcomes_total.clone()))?;

        let commands_dispatched_total = IntCounterVec::new(
            Opts::new("registration_commands_dispatched_total", "Commands accepted by the bus"),
            &["command_type"],
        )?;
        registry.register(Box::new(commands_dispatched_total.clone()))?;

        let command_dispatch_failures_total = IntCounterVec::new(
            Opts::new(
                "registration_command_dispatch_failures_total",
                "Commands the bus refused",
            ),
            &["command_type"],
        )?;
        registry.register(Box::new(command_dispatch_failures_total.clone()))?;

        Ok(Self {
            registry,
            poll_attempts_total,
            poll_outcomes_total,
            poll_wait_seconds,
            saga_outcomes_total,
            commands_dispatched_total,
            command_dispatch_failures_total,
        })
    }

    /// Get the Prometheus registry for exposing metrics via HTTP
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn record_poll(&self, profile: &str, attempts: u32, wait_secs: f64, found: bool) {
        self.poll_attempts_total
            .with_label_values(&[profile])
            .inc_by(u64::from(attempts));
        let outcome = if found { "found" } else { "timed_out" };
        self.poll_outcomes_total.with_label_values(&[profile, outcome]).inc();
        self.poll_wait_seconds.with_label_values(&[profile]).observe(wait_secs);
    }

    pub fn record_saga_outcome(&self, operation: &str, outcome: &str) {
        self.saga_outcomes_total.with_label_values(&[operation, outcome]).inc();
    }

    pub fn record_dispatch(&self, command_type: &str, success: bool) {
        if success {
            self.commands_dispatched_total.with_label_values(&[command_type]).inc();
        } else {
            self.command_dispatch_failures_total.with_label_values(&[command_type]).inc();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counter(metrics: &Metrics, name: &str) -> Vec<f64> {
        metrics
            .registry()
            .gather()
            .iter()
            .find(|m| m.name() == name)
            .map(|m| m.metric.iter().map(|x| x.counter.value.unwrap_or_default()).collect())
            .unwrap_or_default()
    }

    #[test]
    fn test_metrics_creation() {
        let metrics = Metrics::new().unwrap();
        metrics.record_saga_outcome("start_registration", "reservation_editor");
        assert!(!metrics.registry().gather().is_empty());
    }

    #[test]
    fn test_record_poll() {
        let metrics = Metrics::new().unwrap();
        metrics.record_poll("reservation", 3, 1.2, true);
        metrics.record_poll("reservation", 10, 5.0, false);

        assert_eq!(counter(&metrics, "registration_poll_attempts_total"), vec![13.0]);
        assert_eq!(counter(&metrics, "registration_poll_outcomes_total").len(), 2);
    }

    #[test]
    fn test_record_dispatch() {
        let metrics = Metrics::new().unwrap();
        metrics.record_dispatch("ConfirmOrder", true);
        metrics.record_dispatch("ConfirmOrder", true);
        metrics.record_dispatch("ConfirmOrder", false);

        assert_eq!(counter(&metrics, "registration_commands_dispatched_total"), vec![2.0]);
        assert_eq!(
            counter(&metrics, "registration_command_dispatch_failures_total"),
            vec![1.0]
        );
    }
}
