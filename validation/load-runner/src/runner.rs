//! Virtual-user orchestration and HTTP request execution.

use crate::check::{CheckResult, StatusCheck};
use crate::config::RunConfig;
use crate::error::{ConfigError, ConfigResult};
use crate::metrics::{RunInfo, RunSummary, SummaryCollector};
use chrono::Utc;
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::Url;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Barrier, Notify};
use tokio::task::JoinSet;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

const PROGRESS_TICK: Duration = Duration::from_millis(250);
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// Lifecycle of a run. Moves forward only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    NotStarted,
    Running,
    Completed,
}

impl RunState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => RunState::NotStarted,
            1 => RunState::Running,
            _ => RunState::Completed,
        }
    }
}

#[derive(Debug, Default)]
struct HandleInner {
    aborted: AtomicBool,
    state: AtomicU8,
    wake: Notify,
}

/// Observes and controls a run from outside the runner.
#[derive(Debug, Clone, Default)]
pub struct RunHandle {
    inner: Arc<HandleInner>,
}

impl RunHandle {
    /// Stop the run early.
    ///
    /// Each virtual user finishes its in-flight request, then stops at the top
    /// of its next iteration. Pending inter-iteration sleeps are cut short.
    pub fn abort(&self) {
        self.inner.aborted.store(true, Ordering::SeqCst);
        self.inner.wake.notify_waiters();
    }

    pub fn is_aborted(&self) -> bool {
        self.inner.aborted.load(Ordering::SeqCst)
    }

    pub fn state(&self) -> RunState {
        RunState::from_u8(self.inner.state.load(Ordering::SeqCst))
    }

    fn set_state(&self, state: RunState) {
        self.inner.state.store(state as u8, Ordering::SeqCst);
    }
}

/// Executes a load test with one task per virtual user.
pub struct LoadRunner {
    client: reqwest::Client,
    config: RunConfig,
    target: Url,
    check: StatusCheck,
    handle: RunHandle,
    progress: bool,
}

impl LoadRunner {
    /// Validate the config and build the HTTP client.
    ///
    /// Fails before any request is sent if the config is invalid.
    pub fn new(config: RunConfig) -> ConfigResult<Self> {
        let target = config.validate()?;

        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .pool_max_idle_per_host(config.virtual_users as usize)
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;

        Ok(Self {
            client,
            config,
            target,
            check: StatusCheck::default(),
            handle: RunHandle::default(),
            progress: false,
        })
    }

    /// Show a progress bar on stderr while running.
    pub fn with_progress(mut self, enabled: bool) -> Self {
        self.progress = enabled;
        self
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Handle for aborting the run or observing its state.
    pub fn handle(&self) -> RunHandle {
        self.handle.clone()
    }

    /// Run the load test to completion.
    pub async fn run(self) -> RunSummary {
        let LoadRunner {
            client,
            config,
            target,
            check,
            handle,
            progress,
        } = self;

        handle.set_state(RunState::Running);
        info!(
            name = %config.name,
            target = %target,
            virtual_users = config.virtual_users,
            duration_secs = config.duration.as_secs_f64(),
            "Starting load test"
        );

        let collector = Arc::new(SummaryCollector::new());
        let check = Arc::new(check);
        let barrier = Arc::new(Barrier::new(config.virtual_users as usize));

        let started_at = Utc::now();
        let start = Instant::now();
        let deadline = start
            .checked_add(config.duration)
            .unwrap_or_else(|| start + FAR_FUTURE);

        let pb = progress_bar(progress, config.duration);
        let ticker = tokio::spawn(tick_progress(pb.clone(), collector.clone(), start));

        let mut users = JoinSet::new();
        for id in 0..config.virtual_users {
            let user = VirtualUser {
                id,
                client: client.clone(),
                target: target.clone(),
                check: check.clone(),
                collector: collector.clone(),
                handle: handle.clone(),
                barrier: barrier.clone(),
                deadline,
                delay: config.inter_iteration_delay,
            };
            users.spawn(user.run());
        }

        while let Some(joined) = users.join_next().await {
            match joined {
                Ok(iterations) => debug!(iterations, "Virtual user finished"),
                Err(e) => warn!(error = %e, "Virtual user task failed"),
            }
        }

        ticker.abort();
        let aborted = handle.is_aborted();
        pb.finish_with_message(if aborted { "Aborted" } else { "Complete" });

        handle.set_state(RunState::Completed);

        let summary = collector.summary(RunInfo {
            name: config.name.clone(),
            target_url: target.to_string(),
            check_name: check.name.clone(),
            virtual_users: config.virtual_users,
            started_at,
            elapsed: start.elapsed(),
            aborted,
        });

        info!(
            total = summary.total_requests,
            passed = summary.total_passed,
            failed = summary.total_failed,
            elapsed_secs = summary.elapsed_secs,
            aborted,
            "Load test finished"
        );
        summary
    }
}

/// Validate `config` and run it to completion.
pub async fn run(config: RunConfig) -> ConfigResult<RunSummary> {
    Ok(LoadRunner::new(config)?.run().await)
}

struct VirtualUser {
    id: u32,
    client: reqwest::Client,
    target: Url,
    check: Arc<StatusCheck>,
    collector: Arc<SummaryCollector>,
    handle: RunHandle,
    barrier: Arc<Barrier>,
    deadline: Instant,
    delay: Duration,
}

impl VirtualUser {
    /// Loop until the deadline or an abort. Returns the number of requests sent.
    async fn run(self) -> u64 {
        self.barrier.wait().await;

        let mut iterations = 0u64;
        loop {
            if self.handle.is_aborted() {
                break;
            }

            let result = execute_request(&self.client, &self.target, &self.check).await;
            if let Some(ref err) = result.error {
                debug!(
                    vu = self.id,
                    status = result.status_code,
                    error = %err,
                    "Check failed"
                );
            }
            self.collector.record(&result);
            iterations += 1;

            if Instant::now() >= self.deadline {
                break;
            }

            if !self.delay.is_zero() {
                // Register before re-checking the flag so an abort can't slip between
                let woken = self.handle.inner.wake.notified();
                if self.handle.is_aborted() {
                    break;
                }
                let interrupted = tokio::select! {
                    _ = sleep(self.delay) => false,
                    _ = woken => true,
                };
                if interrupted || Instant::now() >= self.deadline {
                    break;
                }
            }
        }
        iterations
    }
}

/// Issue one GET and classify the response.
async fn execute_request(client: &reqwest::Client, url: &Url, check: &StatusCheck) -> CheckResult {
    match client.get(url.clone()).send().await {
        Ok(response) => {
            let status = response.status().as_u16();

            // Drain the body so the connection goes back to the pool
            if let Err(e) = response.bytes().await {
                return CheckResult::fail(status, e.into());
            }

            check.evaluate(status)
        }
        Err(e) => CheckResult::no_response(e.into()),
    }
}

fn progress_bar(enabled: bool, duration: Duration) -> ProgressBar {
    if !enabled {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(duration.as_secs().max(1));
    let style = ProgressStyle::default_bar()
        .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len}s {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("##-");
    pb.set_style(style);
    pb
}

async fn tick_progress(pb: ProgressBar, collector: Arc<SummaryCollector>, start: Instant) {
    let mut interval = tokio::time::interval(PROGRESS_TICK);
    loop {
        interval.tick().await;
        pb.set_position(start.elapsed().as_secs());
        pb.set_message(format!(
            "{} requests, {} failed",
            collector.total(),
            collector.failed()
        ));
    }
}
