//! Transient-failure classification
//!
//! Every retrying caller consults [`is_transient`]. Errors carrying a
//! [`BackendError`] category are decided by that category; anything else is
//! decided by matching known phrases in the error messages along its source
//! chain, so the predicate does not depend on a specific transport.

use crate::llm::BackendError;
use regex::Regex;
use std::error::Error;
use std::time::Duration;

const TRANSIENT_PHRASES: &[&str] = &[
    "rate limit",
    "rate_limit",
    "too many requests",
    "internal server error",
    "bad gateway",
    "service unavailable",
    "gateway timeout",
    "overloaded",
    "temporarily unavailable",
    "timeout",
    "timed out",
    "connection reset",
    "connection refused",
    "broken pipe",
    "deadline exceeded",
];

/// Returns true when the error is worth retrying once.
pub fn is_transient(error: &(dyn Error + 'static)) -> bool {
    let mut current: Option<&(dyn Error + 'static)> = Some(error);
    while let Some(err) = current {
        if let Some(backend) = err.downcast_ref::<BackendError>() {
            if let Some(decision) = classify_backend(backend) {
                return decision;
            }
        }
        if is_transient_message(&err.to_string()) {
            return true;
        }
        current = err.source();
    }
    false
}

/// Phrase-based classification of a bare error message.
pub fn is_transient_message(message: &str) -> bool {
    let lower = message.to_lowercase();
    if TRANSIENT_PHRASES.iter().any(|phrase| lower.contains(phrase)) {
        return true;
    }
    server_status(&lower).is_some()
}

fn server_status(lower: &str) -> Option<u16> {
    let re = Regex::new(r"\b(5\d\d)\b").expect("valid regex");
    re.captures(lower)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<u16>().ok())
        .filter(|code| (500..600).contains(code))
}

/// Category decision for backend errors; `None` defers to message matching.
fn classify_backend(error: &BackendError) -> Option<bool> {
    match error {
        BackendError::RateLimitError { .. }
        | BackendError::TimeoutError { .. }
        | BackendError::NetworkError { .. } => Some(true),
        BackendError::AuthenticationError { .. } | BackendError::ConfigurationError { .. } => {
            Some(false)
        }
        BackendError::ApiError {
            status_code: Some(code),
            ..
        } => Some(*code >= 500 || *code == 429 || *code == 408),
        BackendError::ApiError {
            status_code: None, ..
        }
        | BackendError::Other { .. } => None,
    }
}

/// Single-retry policy applied by the completion client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub backoff: Duration,
}

impl RetryPolicy {
    pub const DEFAULT_BACKOFF: Duration = Duration::from_millis(2000);

    pub fn new(backoff: Duration) -> Self {
        Self { backoff }
    }

    /// No wait between attempts; used by tests.
    pub fn immediate() -> Self {
        Self {
            backoff: Duration::ZERO,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(Self::DEFAULT_BACKOFF)
    }
}
