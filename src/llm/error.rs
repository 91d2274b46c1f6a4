//! Completion backend errors
//!
//! Every [`LLMClient`](super::LLMClient) reports failures as a
//! [`BackendError`] whose variant is the failure category. The retry
//! classifier decides on the category without re-parsing provider payloads.

use regex::Regex;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    #[error("API error{}: {message}", status_label(.status_code))]
    ApiError {
        message: String,
        status_code: Option<u16>,
    },

    #[error("Authentication failed: {message}")]
    AuthenticationError { message: String },

    #[error("Request timed out after {seconds} seconds")]
    TimeoutError { seconds: u64 },

    #[error("Rate limit exceeded{}", retry_label(.retry_after))]
    RateLimitError { retry_after: Option<u64> },

    /// Missing API key, unknown model and similar setup problems
    #[error("Configuration error: {message}")]
    ConfigurationError { message: String },

    #[error("Network error: {message}")]
    NetworkError { message: String },

    #[error("Error: {message}")]
    Other { message: String },
}

fn status_label(status: &Option<u16>) -> String {
    status.map(|code| format!(" ({})", code)).unwrap_or_default()
}

fn retry_label(retry_after: &Option<u64>) -> String {
    retry_after
        .map(|secs| format!(", retry after {} seconds", secs))
        .unwrap_or_default()
}

impl BackendError {
    /// HTTP status the failure corresponds to, when known
    pub fn status_code(&self) -> Option<u16> {
        match self {
            BackendError::ApiError { status_code, .. } => *status_code,
            BackendError::AuthenticationError { .. } => Some(401),
            BackendError::RateLimitError { .. } => Some(429),
            _ => None,
        }
    }

    /// Recovers a category from a provider's formatted error text.
    ///
    /// Provider SDKs report transport and status failures as strings, so the
    /// category comes from known phrases and any embedded 4xx/5xx status.
    pub fn from_provider_message(provider: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        let lower = message.to_lowercase();
        let status_code = Regex::new(r"\b([45]\d\d)\b")
            .expect("valid regex")
            .captures(&lower)
            .and_then(|caps| caps[1].parse::<u16>().ok());

        match status_code {
            Some(401) | Some(403) => {
                return BackendError::AuthenticationError {
                    message: format!("{} rejected credentials: {}", provider, message),
                }
            }
            Some(429) => return BackendError::RateLimitError { retry_after: None },
            _ => {}
        }

        if lower.contains("unauthorized") || lower.contains("invalid api key") {
            BackendError::AuthenticationError {
                message: format!("{} rejected credentials: {}", provider, message),
            }
        } else if lower.contains("rate limit") {
            BackendError::RateLimitError { retry_after: None }
        } else if status_code.is_none()
            && ["connect", "dns", "unreachable"]
                .iter()
                .any(|hint| lower.contains(hint))
        {
            BackendError::NetworkError {
                message: format!("{} unreachable: {}", provider, message),
            }
        } else {
            BackendError::ApiError {
                message: format!("{} request failed: {}", provider, message),
                status_code,
            }
        }
    }
}
