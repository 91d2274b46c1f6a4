use super::retry::{is_transient, RetryPolicy};
use crate::llm::{BackendError, ChatMessage, LLMClient, LLMRequest};
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Output-size cap applied to the retry attempt when the caller set none.
pub const ESCALATED_MAX_TOKENS: u32 = 4096;

/// Preferred shape of the completion text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseMode {
    #[default]
    FreeForm,
    /// Strict JSON-object response mode
    Structured,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub system: Option<String>,
    pub prompt: String,
    pub mode: ResponseMode,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl CompletionRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            system: None,
            prompt: prompt.into(),
            mode: ResponseMode::FreeForm,
            temperature: None,
            max_tokens: None,
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_mode(mut self, mode: ResponseMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Request used for the single retry: strict mode plus an output cap.
    fn escalated(&self) -> Self {
        let mut next = self.clone();
        next.mode = ResponseMode::Structured;
        next.max_tokens.get_or_insert(ESCALATED_MAX_TOKENS);
        next
    }

    fn to_llm_request(&self) -> LLMRequest {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = &self.system {
            messages.push(ChatMessage::system(system.clone()));
        }
        messages.push(ChatMessage::user(self.prompt.clone()));

        let mut request =
            LLMRequest::new(messages).with_json_mode(self.mode == ResponseMode::Structured);
        if let Some(temperature) = self.temperature {
            request = request.with_temperature(temperature);
        }
        if let Some(max_tokens) = self.max_tokens {
            request = request.with_max_tokens(max_tokens);
        }
        request
    }
}

#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("Completion service returned no usable content")]
    UpstreamEmpty,

    #[error("Completion service failed after {attempts} attempt(s): {source}")]
    Upstream {
        #[source]
        source: BackendError,
        attempts: u32,
    },

    #[error("Completion request was cancelled")]
    Cancelled,
}

/// Sends prompts to the completion service with a bounded retry.
#[derive(Clone)]
pub struct CompletionClient {
    llm: Arc<dyn LLMClient>,
    policy: RetryPolicy,
}

impl CompletionClient {
    pub fn new(llm: Arc<dyn LLMClient>) -> Self {
        Self::with_policy(llm, RetryPolicy::default())
    }

    pub fn with_policy(llm: Arc<dyn LLMClient>, policy: RetryPolicy) -> Self {
        Self { llm, policy }
    }

    pub fn backend_name(&self) -> &str {
        self.llm.name()
    }

    /// Returns the completion text for `request`.
    ///
    /// A transient failure is retried exactly once after the policy backoff,
    /// with the request escalated to strict structured mode. Cancellation is
    /// observed during the call and during the backoff.
    pub async fn complete(
        &self,
        request: CompletionRequest,
        cancel: &CancellationToken,
    ) -> Result<String, CompletionError> {
        match self.attempt(&request, cancel).await {
            Ok(text) => Ok(text),
            Err(AttemptError::Backend(err)) if is_transient(&err) => {
                warn!(
                    backend = self.llm.name(),
                    error = %err,
                    backoff_ms = self.policy.backoff.as_millis() as u64,
                    "Transient completion failure, retrying once in strict mode"
                );

                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Err(CompletionError::Cancelled),
                    _ = tokio::time::sleep(self.policy.backoff) => {}
                }

                let retry = request.escalated();
                match self.attempt(&retry, cancel).await {
                    Ok(text) => {
                        info!(backend = self.llm.name(), "Completion succeeded on retry");
                        Ok(text)
                    }
                    Err(err) => Err(err.into_completion_error(2)),
                }
            }
            Err(err) => Err(err.into_completion_error(1)),
        }
    }

    async fn attempt(
        &self,
        request: &CompletionRequest,
        cancel: &CancellationToken,
    ) -> Result<String, AttemptError> {
        debug!(
            backend = self.llm.name(),
            mode = ?request.mode,
            prompt_len = request.prompt.len(),
            "Sending completion request"
        );

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(AttemptError::Cancelled),
            result = self.llm.chat(request.to_llm_request()) => result,
        };
        let response = result.map_err(AttemptError::Backend)?;

        if response.is_blank() {
            return Err(AttemptError::Empty);
        }

        debug!(
            backend = self.llm.name(),
            response_len = response.content.len(),
            elapsed_ms = response.response_time.as_millis() as u64,
            "Completion received"
        );
        Ok(response.content)
    }
}

impl std::fmt::Debug for CompletionClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionClient")
            .field("backend", &self.llm.name())
            .field("policy", &self.policy)
            .finish()
    }
}

enum AttemptError {
    Backend(BackendError),
    Empty,
    Cancelled,
}

impl AttemptError {
    fn into_completion_error(self, attempts: u32) -> CompletionError {
        match self {
            AttemptError::Backend(source) => CompletionError::Upstream { source, attempts },
            AttemptError::Empty => CompletionError::UpstreamEmpty,
            AttemptError::Cancelled => CompletionError::Cancelled,
        }
    }
}
