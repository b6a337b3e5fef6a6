use crate::client::AuthorClient;
use crate::config::ScenarioConfig;
use crate::metrics::{Check, Trend};
use crate::payload::AuthorPayload;
use anyhow::Result;
use rand::Rng;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::warn;

/// What a single iteration observed.
#[derive(Debug, Clone)]
pub struct IterationOutcome {
    pub status: u16,
    pub check_passed: bool,
    /// Value appended to the trend, in milliseconds
    pub trend_sample_ms: f64,
    /// Response body that was logged because the status was unexpected
    pub diagnostic: Option<String>,
}

/// The create-author scenario: build payload, POST, record, check, pause.
///
/// Shared read-only between virtual users; the trend and check are
/// internally synchronized.
pub struct Scenario {
    client: Arc<dyn AuthorClient>,
    trend: Arc<Trend>,
    check: Arc<Check>,
    expected_status: u16,
    think_time: Duration,
    iterations: AtomicU64,
    errors: AtomicU64,
}

impl Scenario {
    pub fn new(
        client: Arc<dyn AuthorClient>,
        trend: Arc<Trend>,
        check: Arc<Check>,
        expected_status: u16,
        think_time: Duration,
    ) -> Self {
        Self {
            client,
            trend,
            check,
            expected_status,
            think_time,
            iterations: AtomicU64::new(0),
            errors: AtomicU64::new(0),
        }
    }

    /// Build a scenario with a fresh trend and check named after `config`.
    pub fn from_config(client: Arc<dyn AuthorClient>, config: &ScenarioConfig) -> Self {
        Self::new(
            client,
            Arc::new(Trend::new(config.trend_name.clone())),
            Arc::new(Check::new(format!("status was {}", config.expected_status))),
            config.expected_status,
            Duration::from_millis(config.think_time_ms),
        )
    }

    pub fn trend(&self) -> &Arc<Trend> {
        &self.trend
    }

    pub fn check(&self) -> &Arc<Check> {
        &self.check
    }

    pub fn client_name(&self) -> &'static str {
        self.client.name()
    }

    pub fn think_time(&self) -> Duration {
        self.think_time
    }

    /// Iterations that got a response, counted when the check is recorded.
    pub fn iterations(&self) -> u64 {
        self.iterations.load(Ordering::Relaxed)
    }

    /// Iterations that ended in a transport error.
    pub fn errors(&self) -> u64 {
        self.errors.load(Ordering::Relaxed)
    }

    /// Run one iteration. An unexpected status is reported through the check
    /// and the log only. A transport error records neither trend nor check and
    /// is returned to the caller, after the same think-time pause.
    pub async fn run_iteration<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
    ) -> Result<IterationOutcome> {
        let payload = AuthorPayload::generate(rng);
        let response = match self.client.post_author(&payload).await {
            Ok(response) => response,
            Err(e) => {
                self.errors.fetch_add(1, Ordering::Relaxed);
                sleep(self.think_time).await;
                return Err(e);
            }
        };

        let diagnostic = if response.status != self.expected_status {
            warn!(
                status = response.status,
                body = %response.body,
                "Unexpected response status"
            );
            Some(response.body)
        } else {
            None
        };

        let trend_sample_ms = self
            .trend
            .add(response.timings.sending + response.timings.receiving);
        let check_passed = self.check.record(response.status == self.expected_status);
        self.iterations.fetch_add(1, Ordering::Relaxed);

        sleep(self.think_time).await;

        Ok(IterationOutcome {
            status: response.status,
            check_passed,
            trend_sample_ms,
            diagnostic,
        })
    }
}
