//! Pass/fail aggregation across virtual users.

use crate::check::CheckResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Shared counters. Every virtual user records into the same collector.
#[derive(Debug, Default)]
pub struct SummaryCollector {
    requests_total: AtomicU64,
    requests_passed: AtomicU64,
    requests_failed: AtomicU64,
}

impl SummaryCollector {
    /// Create a new collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one check result.
    pub fn record(&self, result: &CheckResult) {
        if result.passed {
            self.requests_passed.fetch_add(1, Ordering::Relaxed);
        } else {
            self.requests_failed.fetch_add(1, Ordering::Relaxed);
        }
        self.requests_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Requests recorded so far. Used for progress display while running.
    pub fn total(&self) -> u64 {
        self.requests_total.load(Ordering::Relaxed)
    }

    /// Failed requests recorded so far.
    pub fn failed(&self) -> u64 {
        self.requests_failed.load(Ordering::Relaxed)
    }

    /// Snapshot the counters into a final summary.
    ///
    /// Must only be called once every virtual user has joined, otherwise the
    /// three counts may be observed mid-update.
    pub fn summary(&self, run: RunInfo) -> RunSummary {
        RunSummary {
            name: run.name,
            target_url: run.target_url,
            check_name: run.check_name,
            virtual_users: run.virtual_users,
            started_at: run.started_at,
            elapsed_secs: run.elapsed.as_secs_f64(),
            total_requests: self.requests_total.load(Ordering::Acquire),
            total_passed: self.requests_passed.load(Ordering::Acquire),
            total_failed: self.requests_failed.load(Ordering::Acquire),
            aborted: run.aborted,
        }
    }
}

/// Run metadata attached to a summary.
#[derive(Debug, Clone)]
pub struct RunInfo {
    pub name: String,
    pub target_url: String,
    pub check_name: String,
    pub virtual_users: u32,
    pub started_at: DateTime<Utc>,
    pub elapsed: Duration,
    pub aborted: bool,
}

/// Final run results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub name: String,
    pub target_url: String,
    pub check_name: String,
    pub virtual_users: u32,
    pub started_at: DateTime<Utc>,
    pub elapsed_secs: f64,

    pub total_requests: u64,
    pub total_passed: u64,
    pub total_failed: u64,

    /// The run was stopped before its deadline.
    #[serde(default)]
    pub aborted: bool,
}

impl RunSummary {
    /// Percentage of requests that passed, or `None` if nothing was sent.
    pub fn pass_rate(&self) -> Option<f64> {
        if self.total_requests == 0 {
            None
        } else {
            Some(self.total_passed as f64 / self.total_requests as f64 * 100.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RequestError;
    use std::sync::Arc;

    fn run_info() -> RunInfo {
        RunInfo {
            name: "test".to_string(),
            target_url: "http://localhost/".to_string(),
            check_name: "Response code 200".to_string(),
            virtual_users: 4,
            started_at: Utc::now(),
            elapsed: Duration::from_millis(1500),
            aborted: false,
        }
    }

    #[test]
    fn test_record_pass_and_fail() {
        let collector = SummaryCollector::new();
        collector.record(&CheckResult::pass(200));
        collector.record(&CheckResult::pass(200));
        collector.record(&CheckResult::fail(500, RequestError::UnexpectedStatus(500)));
        collector.record(&CheckResult::no_response(RequestError::Timeout));

        let summary = collector.summary(run_info());
        assert_eq!(summary.total_requests, 4);
        assert_eq!(summary.total_passed, 2);
        assert_eq!(summary.total_failed, 2);
        assert_eq!(summary.elapsed_secs, 1.5);
        assert_eq!(summary.pass_rate(), Some(50.0));
    }

    #[test]
    fn test_empty_summary() {
        let summary = SummaryCollector::new().summary(run_info());
        assert_eq!(summary.total_requests, 0);
        assert_eq!(summary.pass_rate(), None);
    }

    #[test]
    fn test_concurrent_records_are_not_lost() {
        let collector = Arc::new(SummaryCollector::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let collector = collector.clone();
                std::thread::spawn(move || {
                    for n in 0..1000 {
                        if (i + n) % 3 == 0 {
                            collector.record(&CheckResult::no_response(RequestError::Timeout));
                        } else {
                            collector.record(&CheckResult::pass(200));
                        }
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let summary = collector.summary(run_info());
        assert_eq!(summary.total_requests, 8000);
        assert_eq!(
            summary.total_requests,
            summary.total_passed + summary.total_failed
        );
    }
}
