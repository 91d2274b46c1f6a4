//! Chat backends behind a single [`LLMClient`] trait.
//!
//! [`GenAIClient`] talks to a real provider; [`MockLLMClient`] replays a
//! scripted queue in tests.

mod client;
mod error;
mod genai_client;
mod mock;
mod types;

pub use client::LLMClient;
pub use error::BackendError;
pub use genai_client::GenAIClient;
pub use mock::{MockLLMClient, MockResponse};
pub use types::{ChatMessage, LLMRequest, LLMResponse, MessageRole};
