//! Completion client and transient-failure classifier
//!
//! [`CompletionClient`] wraps an [`LLMClient`](crate::llm::LLMClient) with the
//! single-retry policy; [`is_transient`] is the shared predicate every
//! retrying caller consults.

mod client;
mod retry;

pub use client::{
    CompletionClient, CompletionError, CompletionRequest, ResponseMode, ESCALATED_MAX_TOKENS,
};
pub use retry::{is_transient, is_transient_message, RetryPolicy};
