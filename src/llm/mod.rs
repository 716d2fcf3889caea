//! Language model access for content analysis
//!
//! [`LanguageModel`] is the seam the analysis code talks to. The production
//! implementation is an OpenAI-compatible chat completions client; tests use
//! scripted fakes.

pub mod analyst;
pub mod client;
pub mod prompts;

use async_trait::async_trait;
use serde::Deserialize;
use serde::Serialize;

pub use analyst::LlmAnalyst;
pub use analyst::LlmSentiment;
pub use client::OpenAiChatClient;
pub use prompts::PromptTemplate;
pub use prompts::ResearchPrompts;
pub use prompts::TaskPrompt;

use crate::Result;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// `system`, `user` or `assistant`
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[async_trait]
pub trait LanguageModel: Send + Sync {
    fn model_name(&self) -> &str;

    /// Complete a conversation, returning the assistant reply text
    async fn chat(&self, messages: &[ChatMessage]) -> Result<String>;
}
