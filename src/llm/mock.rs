//! Scripted backend for tests
//!
//! Responses are served in the order they were queued. Every request is
//! recorded so tests can inspect what the completion client actually sent.

use super::client::LLMClient;
use super::error::BackendError;
use super::types::{LLMRequest, LLMResponse};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Clone)]
pub enum MockResponse {
    Text(String),
    Error(BackendError),
}

impl MockResponse {
    pub fn text(content: impl Into<String>) -> Self {
        MockResponse::Text(content.into())
    }

    pub fn error(error: BackendError) -> Self {
        MockResponse::Error(error)
    }
}

#[derive(Default)]
struct Script {
    queue: VecDeque<MockResponse>,
    seen: Vec<LLMRequest>,
}

#[derive(Default)]
pub struct MockLLMClient {
    script: Mutex<Script>,
}

impl MockLLMClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_response(&self, response: MockResponse) {
        self.script.lock().unwrap().queue.push_back(response);
    }

    pub fn add_responses(&self, responses: impl IntoIterator<Item = MockResponse>) {
        self.script.lock().unwrap().queue.extend(responses);
    }

    /// Requests received so far, oldest first
    pub fn requests(&self) -> Vec<LLMRequest> {
        self.script.lock().unwrap().seen.clone()
    }

    pub fn call_count(&self) -> usize {
        self.script.lock().unwrap().seen.len()
    }

    pub fn pending(&self) -> usize {
        self.script.lock().unwrap().queue.len()
    }
}

#[async_trait]
impl LLMClient for MockLLMClient {
    async fn chat(&self, request: LLMRequest) -> Result<LLMResponse, BackendError> {
        let next = {
            let mut script = self.script.lock().unwrap();
            script.seen.push(request);
            script.queue.pop_front()
        };

        match next {
            Some(MockResponse::Text(content)) => {
                Ok(LLMResponse::text(content, Duration::from_millis(1)))
            }
            Some(MockResponse::Error(error)) => Err(error),
            None => Err(BackendError::Other {
                message: "mock script exhausted".to_string(),
            }),
        }
    }

    fn name(&self) -> &str {
        "mock"
    }
}

impl std::fmt::Debug for MockLLMClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockLLMClient")
            .field("pending", &self.pending())
            .field("calls", &self.call_count())
            .finish()
    }
}
