//! genai-backed completion client
//!
//! One client covers every provider genai supports (OpenAI, Anthropic,
//! Gemini, Groq, xAI, Ollama, ...). Set `SITESMITH_API_BASE_URL` to send
//! requests to a compatible endpoint instead of the provider default.

use super::client::LLMClient;
use super::error::BackendError;
use super::types::{ChatMessage, LLMRequest, LLMResponse, MessageRole};
use async_trait::async_trait;
use genai::adapter::AdapterKind;
use genai::chat::{
    ChatMessage as GenAIChatMessage, ChatOptions, ChatRequest as GenAIChatRequest,
    ChatResponseFormat,
};
use genai::resolver::{AuthData, Endpoint, ServiceTargetResolver};
use genai::{Client, ModelIden, ServiceTarget};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

pub struct GenAIClient {
    client: Client,
    model: String,
    provider: AdapterKind,
    timeout: Duration,
}

impl GenAIClient {
    pub fn new(provider: AdapterKind, model: String, timeout: Duration) -> Self {
        let client = match std::env::var("SITESMITH_API_BASE_URL") {
            Ok(base_url) if !base_url.trim().is_empty() => {
                debug!(provider = provider.as_str(), %base_url, "Using custom completion endpoint");
                with_endpoint(provider, model.clone(), base_url)
            }
            _ => Client::default(),
        };

        debug!(provider = provider.as_str(), %model, "Created genai client");
        Self {
            client,
            model,
            provider,
            timeout,
        }
    }
}

/// Client whose every request targets `base_url`, authenticated with the
/// provider's usual API-key variable.
fn with_endpoint(provider: AdapterKind, model: String, base_url: String) -> Client {
    let resolver = ServiceTargetResolver::from_resolver_fn(
        move |_target: ServiceTarget| -> Result<ServiceTarget, genai::resolver::Error> {
            let auth = provider
                .default_key_env_name()
                .map(|var| AuthData::from_env(var))
                .unwrap_or_else(|| AuthData::from_single(""));
            Ok(ServiceTarget {
                endpoint: Endpoint::from_owned(base_url.clone()),
                auth,
                model: ModelIden::new(provider, &model),
            })
        },
    );

    Client::builder()
        .with_service_target_resolver(resolver)
        .build()
}

fn to_genai_message(message: &ChatMessage) -> GenAIChatMessage {
    match message.role {
        MessageRole::System => GenAIChatMessage::system(&message.content),
        MessageRole::User => GenAIChatMessage::user(&message.content),
    }
}

fn chat_options(request: &LLMRequest) -> ChatOptions {
    let mut options = ChatOptions::default();
    if let Some(temperature) = request.temperature {
        options = options.with_temperature(temperature as f64);
    }
    if let Some(max_tokens) = request.max_tokens {
        options = options.with_max_tokens(max_tokens);
    }
    if request.json_mode {
        options = options.with_response_format(ChatResponseFormat::JsonMode);
    }
    options
}

#[async_trait]
impl LLMClient for GenAIClient {
    async fn chat(&self, request: LLMRequest) -> Result<LLMResponse, BackendError> {
        let start = Instant::now();
        let chat_request =
            GenAIChatRequest::new(request.messages.iter().map(to_genai_message).collect());
        let options = chat_options(&request);

        let call = self
            .client
            .exec_chat(&self.model, chat_request, Some(&options));
        let response = match tokio::time::timeout(self.timeout, call).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                warn!(provider = self.provider.as_str(), error = %e, "Completion call failed");
                return Err(BackendError::from_provider_message(
                    self.provider.as_str(),
                    e.to_string(),
                ));
            }
            Err(_) => {
                warn!(
                    provider = self.provider.as_str(),
                    timeout_secs = self.timeout.as_secs(),
                    "Completion call timed out"
                );
                return Err(BackendError::TimeoutError {
                    seconds: self.timeout.as_secs(),
                });
            }
        };

        let content = response.first_text().unwrap_or_default().to_string();
        Ok(LLMResponse::text(content, start.elapsed()))
    }

    fn name(&self) -> &str {
        self.provider.as_str()
    }

    fn model(&self) -> Option<&str> {
        Some(&self.model)
    }
}

impl std::fmt::Debug for GenAIClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenAIClient")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("timeout", &self.timeout)
            .finish()
    }
}
