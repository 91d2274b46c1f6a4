use super::error::BackendError;
use super::types::{LLMRequest, LLMResponse};
use async_trait::async_trait;

/// A text-completion backend.
///
/// Implementations perform exactly one call per `chat`; retrying is the
/// caller's job.
#[async_trait]
pub trait LLMClient: Send + Sync {
    async fn chat(&self, request: LLMRequest) -> Result<LLMResponse, BackendError>;

    /// Provider name for logs
    fn name(&self) -> &str;

    fn model(&self) -> Option<&str> {
        None
    }
}
