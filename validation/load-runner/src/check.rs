//! Response checks.

use crate::error::RequestError;
use chrono::{DateTime, Utc};

/// Boolean assertion on the status code of a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusCheck {
    pub name: String,
    pub expected: u16,
}

impl Default for StatusCheck {
    fn default() -> Self {
        Self {
            name: "Response code 200".to_string(),
            expected: 200,
        }
    }
}

impl StatusCheck {
    /// Classify a completed response.
    pub fn evaluate(&self, status: u16) -> CheckResult {
        if status == self.expected {
            CheckResult::pass(status)
        } else {
            CheckResult::fail(status, RequestError::UnexpectedStatus(status))
        }
    }
}

/// Outcome of one request. Never mutated once recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckResult {
    pub passed: bool,
    /// `0` when no response was received.
    pub status_code: u16,
    pub timestamp: DateTime<Utc>,
    pub error: Option<RequestError>,
}

impl CheckResult {
    pub fn pass(status_code: u16) -> Self {
        Self {
            passed: true,
            status_code,
            timestamp: Utc::now(),
            error: None,
        }
    }

    pub fn fail(status_code: u16, error: RequestError) -> Self {
        Self {
            passed: false,
            status_code,
            timestamp: Utc::now(),
            error: Some(error),
        }
    }

    /// Failed request that produced no response at all.
    pub fn no_response(error: RequestError) -> Self {
        Self::fail(0, error)
    }
}
