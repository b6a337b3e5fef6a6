use crate::config::Config;
use crate::metrics::{CheckSummary, TrendSummary};
use crate::ramp::RampPlanner;
use crate::scenario::Scenario;
use anyhow::Result;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub tick: Duration,
    pub graceful_stop: Duration,
    /// Base seed; virtual user `n` uses `seed + n`
    pub seed: Option<u64>,
    /// Progress log interval; `None` disables progress logging
    pub print_every: Option<Duration>,
}

impl RunOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            tick: Duration::from_millis(config.runner.tick_ms),
            graceful_stop: Duration::from_millis(config.runner.graceful_stop_ms),
            seed: config.scenario.seed,
            print_every: None,
        }
    }
}

struct VirtualUser {
    id: u64,
    stop: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub duration_ms: u64,
    pub max_vus: u64,
    /// Iterations that got a response, including those of aborted users
    pub iterations: u64,
    /// Iterations aborted by a transport error
    pub errors: u64,
    pub trend: TrendSummary,
    pub check: CheckSummary,
}

/// Drives virtual users along a ramp plan. Each virtual user is a tokio task
/// looping over `Scenario::run_iteration` until told to stop.
pub struct Runner {
    scenario: Arc<Scenario>,
    planner: RampPlanner,
    options: RunOptions,
}

impl Runner {
    pub fn new(scenario: Arc<Scenario>, planner: RampPlanner, options: RunOptions) -> Self {
        Self {
            scenario,
            planner,
            options,
        }
    }

    pub async fn run(self) -> Result<RunSummary> {
        let start_time = Instant::now();
        let mut active: Vec<VirtualUser> = Vec::new();
        let mut stopping: Vec<VirtualUser> = Vec::new();
        let mut next_id = 0u64;
        let mut max_vus = 0u64;
        let mut last_print = Instant::now();

        info!(
            "Running scenario with {} client: {} ramp stages, total duration {}ms, peak {} VUs",
            self.scenario.client_name(),
            self.planner.stages().len(),
            self.planner.total_duration_ms(),
            self.planner.peak_vus()
        );

        loop {
            let elapsed_ms = start_time.elapsed().as_millis() as u64;
            let Some(target) = self.planner.target_vus(elapsed_ms) else {
                break;
            };

            while (active.len() as u64) < target {
                active.push(self.spawn_vu(next_id));
                next_id += 1;
            }
            while (active.len() as u64) > target {
                if let Some(vu) = active.pop() {
                    debug!(vu = vu.id, "Ramping down virtual user");
                    let _ = vu.stop.send(true);
                    stopping.push(vu);
                }
            }
            max_vus = max_vus.max(active.len() as u64);

            if let Some(every) = self.options.print_every {
                if last_print.elapsed() >= every {
                    self.print_progress(active.len(), start_time);
                    last_print = Instant::now();
                }
            }

            sleep(self.options.tick).await;
        }

        info!(
            "Ramp finished, stopping {} virtual users...",
            active.len() + stopping.len()
        );
        for vu in &active {
            let _ = vu.stop.send(true);
        }
        stopping.extend(active);

        let deadline = Instant::now() + self.options.graceful_stop;
        for vu in stopping {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let abort = vu.handle.abort_handle();
            match timeout(remaining, vu.handle).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!(vu = vu.id, "Virtual user task failed: {}", e),
                Err(_) => {
                    warn!(vu = vu.id, "Virtual user did not stop in time, aborting");
                    abort.abort();
                }
            }
        }

        Ok(RunSummary {
            duration_ms: start_time.elapsed().as_millis() as u64,
            max_vus,
            iterations: self.scenario.iterations(),
            errors: self.scenario.errors(),
            trend: self.scenario.trend().summary(),
            check: self.scenario.check().summary(),
        })
    }

    fn spawn_vu(&self, id: u64) -> VirtualUser {
        let (stop, mut stop_rx) = watch::channel(false);
        let scenario = self.scenario.clone();
        let mut rng = match self.options.seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(id)),
            None => StdRng::from_entropy(),
        };

        let handle = tokio::spawn(async move {
            // An in-flight iteration always runs to completion; the stop flag
            // is only observed between iterations.
            loop {
                let stopped = *stop_rx.borrow_and_update();
                if stopped {
                    break;
                }
                if let Err(e) = scenario.run_iteration(&mut rng).await {
                    warn!(vu = id, "Iteration failed: {:#}", e);
                }
            }
        });

        VirtualUser { id, stop, handle }
    }

    fn print_progress(&self, vus: usize, start_time: Instant) {
        let trend = self.scenario.trend().summary();
        let check = self.scenario.check().summary();
        info!(
            "Progress: elapsed={}ms vus={} samples={} checks_passed={} checks_failed={} {}: med={:.2}ms p95={:.2}ms",
            start_time.elapsed().as_millis(),
            vus,
            trend.count,
            check.passes,
            check.fails,
            trend.name,
            trend.med,
            trend.p95
        );
    }
}
