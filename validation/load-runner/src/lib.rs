//! Virtual-user HTTP load runner.
//!
//! This crate provides tools to:
//! - Run a fixed number of virtual users against one URL for a fixed duration
//! - Check every response for status 200 and count passes and failures
//! - Load run parameters from YAML scenario files
//! - Output results in multiple formats (console, JSON, CSV)

pub mod check;
pub mod config;
pub mod error;
pub mod metrics;
pub mod report;
pub mod runner;

pub use check::{CheckResult, StatusCheck};
pub use config::{RunConfig, Scenario};
pub use error::{ConfigError, RequestError};
pub use metrics::{RunSummary, SummaryCollector};
pub use report::{OutputFormat, ReportError, ResultsReport};
pub use runner::{run, LoadRunner, RunHandle, RunState};
