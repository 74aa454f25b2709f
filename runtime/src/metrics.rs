//! Prometheus metrics for the booking payment lifecycle engine.
//!
//! Covers the three things an on-call engineer needs at 3am: is the PSP
//! healthy (circuit breaker / retry counters), are the scheduled jobs
//! keeping up (worker run counters and durations), and is money moving
//! (authorization / capture counters).
//!
//! ```rust,no_run
//! use booking_runtime::metrics::MetricsServer;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut server = MetricsServer::new("0.0.0.0:9090".parse()?);
//! server.start()?;
//! # Ok(())
//! # }
//! ```

use metrics::{describe_counter, describe_gauge, describe_histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

pub use metrics::{counter, gauge, histogram};

/// Errors from metrics operations.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Failed to build the metrics exporter.
    #[error("failed to build metrics exporter: {0}")]
    Build(String),
    /// Failed to install the metrics exporter.
    #[error("failed to install metrics exporter: {0}")]
    Install(String),
    /// Failed to bind the metrics HTTP server.
    #[error("failed to bind metrics server: {0}")]
    Bind(#[from] std::io::Error),
}

/// Prometheus metrics server, exposing `/metrics` for scraping.
pub struct MetricsServer {
    addr: SocketAddr,
    handle: Option<PrometheusHandle>,
}

impl MetricsServer {
    /// Create a new metrics server bound to `addr`.
    #[must_use]
    pub const fn new(addr: SocketAddr) -> Self {
        Self { addr, handle: None }
    }

    /// Register metric descriptions and install the Prometheus recorder.
    ///
    /// # Errors
    ///
    /// Returns `MetricsError::Build` if histogram buckets cannot be
    /// configured, or `MetricsError::Install` if a recorder is already
    /// installed for a reason other than test re-entry.
    pub fn start(&mut self) -> Result<(), MetricsError> {
        register_metrics();

        let builder = PrometheusBuilder::new()
            .set_buckets_for_metric(
                Matcher::Suffix("duration_seconds".to_string()),
                &[
                    0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0,
                ],
            )
            .map_err(|e| MetricsError::Build(e.to_string()))?;

        match builder.install_recorder() {
            Ok(handle) => {
                self.handle = Some(handle);
                tracing::info!(addr = %self.addr, "metrics server started");
                Ok(())
            }
            Err(e) => {
                let err_msg = e.to_string();
                if err_msg.contains("already initialized") {
                    tracing::warn!("metrics recorder already initialized, skipping");
                    Ok(())
                } else {
                    Err(MetricsError::Install(err_msg))
                }
            }
        }
    }

    /// The installed recorder's handle, if `start` has succeeded.
    #[must_use]
    pub const fn handle(&self) -> Option<&PrometheusHandle> {
        self.handle.as_ref()
    }

    /// Render currently recorded metrics in Prometheus text format.
    #[must_use]
    pub fn render(&self) -> Option<String> {
        self.handle.as_ref().map(PrometheusHandle::render)
    }
}

fn register_metrics() {
    describe_counter!(
        "booking_authorizations_total",
        "Total number of authorization attempts, labeled by outcome"
    );
    describe_counter!(
        "booking_captures_total",
        "Total number of capture attempts, labeled by outcome"
    );
    describe_counter!(
        "booking_refunds_total",
        "Total number of refund attempts, labeled by outcome"
    );
    describe_histogram!(
        "booking_psp_call_duration_seconds",
        "Time taken for a single PSP adapter call"
    );

    describe_gauge!(
        "booking_circuit_breaker_state",
        "Current PSP circuit breaker state (0=closed, 1=half-open, 2=open)"
    );
    describe_counter!("booking_circuit_breaker_calls_total", "Total calls through the PSP circuit breaker");
    describe_counter!("booking_circuit_breaker_rejections_total", "Calls rejected because the circuit was open");

    describe_counter!("booking_retry_attempts_total", "Total PSP retry attempts");
    describe_counter!("booking_retry_exhausted_total", "PSP operations that exhausted retries");

    describe_counter!(
        "booking_worker_runs_total",
        "Total scheduled worker job runs, labeled by job name and outcome"
    );
    describe_histogram!(
        "booking_worker_duration_seconds",
        "Time taken for a worker job pass over its candidate bookings"
    );
    describe_counter!(
        "booking_lock_contended_total",
        "Total times a worker skipped a booking because its lock was held"
    );

    describe_gauge!(
        "booking_authorization_overdue_count",
        "SCHEDULED bookings whose auth_scheduled_for has passed without authorizing"
    );
}

/// PSP adapter metrics recorder.
pub struct PspMetrics;

impl PspMetrics {
    /// Record an authorization attempt outcome (e.g. `"succeeded"`, `"card_declined"`).
    pub fn record_authorization(outcome: &'static str, duration: Duration) {
        counter!("booking_authorizations_total", "outcome" => outcome).increment(1);
        histogram!("booking_psp_call_duration_seconds").record(duration.as_secs_f64());
    }

    /// Record a capture attempt outcome.
    pub fn record_capture(outcome: &'static str, duration: Duration) {
        counter!("booking_captures_total", "outcome" => outcome).increment(1);
        histogram!("booking_psp_call_duration_seconds").record(duration.as_secs_f64());
    }

    /// Record a refund attempt outcome.
    pub fn record_refund(outcome: &'static str, duration: Duration) {
        counter!("booking_refunds_total", "outcome" => outcome).increment(1);
        histogram!("booking_psp_call_duration_seconds").record(duration.as_secs_f64());
    }
}

/// Circuit breaker metrics recorder.
pub struct CircuitBreakerMetrics;

impl CircuitBreakerMetrics {
    /// Record the circuit breaker's current state (0 = Closed, 1 = `HalfOpen`, 2 = Open).
    pub fn record_state(state: f64) {
        gauge!("booking_circuit_breaker_state").set(state);
    }

    /// Record a call attempt.
    pub fn record_call() {
        counter!("booking_circuit_breaker_calls_total").increment(1);
    }

    /// Record a call rejected because the circuit was open.
    pub fn record_rejection() {
        counter!("booking_circuit_breaker_rejections_total").increment(1);
    }
}

/// Retry metrics recorder.
pub struct RetryMetrics;

impl RetryMetrics {
    /// Record a retry attempt.
    pub fn record_attempt() {
        counter!("booking_retry_attempts_total").increment(1);
    }

    /// Record a retry sequence that exhausted its budget.
    pub fn record_exhausted() {
        counter!("booking_retry_exhausted_total").increment(1);
    }
}

/// Scheduled worker job metrics recorder.
pub struct WorkerMetrics;

impl WorkerMetrics {
    /// Record a single job pass.
    pub fn record_run(job: &'static str, outcome: &'static str, duration: Duration) {
        counter!("booking_worker_runs_total", "job" => job, "outcome" => outcome).increment(1);
        histogram!("booking_worker_duration_seconds").record(duration.as_secs_f64());
    }

    /// Record a booking skipped because its lock was already held.
    pub fn record_lock_contended(job: &'static str) {
        counter!("booking_lock_contended_total", "job" => job).increment(1);
    }

    /// Record the current count of overdue pending authorizations.
    pub fn record_authorization_overdue_count(count: usize) {
        gauge!("booking_authorization_overdue_count").set(count as f64);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn metrics_server_starts_without_a_handle_before_start() {
        let addr = "127.0.0.1:0".parse().unwrap();
        let server = MetricsServer::new(addr);
        assert!(server.handle().is_none());
    }

    #[test]
    fn metrics_server_start_is_idempotent_across_tests() {
        let addr = "127.0.0.1:0".parse().unwrap();
        let mut server = MetricsServer::new(addr);
        assert!(server.start().is_ok());
    }

    #[test]
    fn psp_and_worker_metrics_record_without_panicking() {
        let addr = "127.0.0.1:0".parse().unwrap();
        let mut server = MetricsServer::new(addr);
        server.start().unwrap();

        PspMetrics::record_authorization("succeeded", Duration::from_millis(120));
        PspMetrics::record_capture("card_declined", Duration::from_millis(80));
        WorkerMetrics::record_run("capture_completed_lessons", "ok", Duration::from_millis(500));
        WorkerMetrics::record_lock_contended("retry_failed_authorizations");
        CircuitBreakerMetrics::record_state(0.0);

        if let Some(rendered) = server.render() {
            assert!(rendered.contains("booking_authorizations_total"));
            assert!(rendered.contains("booking_worker_runs_total"));
        }
    }
}
