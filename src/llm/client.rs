//! OpenAI-compatible chat completions client

use std::time::Duration;
use std::time::Instant;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde::Serialize;
use tracing::debug;

use super::ChatMessage;
use super::LanguageModel;
use crate::config::LlmConfig;
use crate::errors::ResearchError;
use crate::retry::RetryPolicy;
use crate::Result;

pub struct OpenAiChatClient {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
    retry: RetryPolicy,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiChatClient {
    pub fn new(config: &LlmConfig, api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(ResearchError::ConfigError(
                "OpenAI API key not provided".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ResearchError::HttpError(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            api_key,
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            retry: RetryPolicy::from_millis(
                config.retry_attempts,
                config.retry_min_wait_ms,
                config.retry_max_wait_ms,
            ),
        })
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    async fn complete_once(&self, messages: &[ChatMessage]) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.endpoint))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ResearchError::Upstream {
                service: "OpenAI",
                status: status.as_u16(),
                message: error_text,
            });
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| ResearchError::LlmError(format!("Failed to parse response: {e}")))?;

        body.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|content| content.trim().to_string())
            .ok_or_else(|| ResearchError::LlmError("No response from OpenAI".to_string()))
    }
}

#[async_trait]
impl LanguageModel for OpenAiChatClient {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn chat(&self, messages: &[ChatMessage]) -> Result<String> {
        let start = Instant::now();
        let reply = self
            .retry
            .run("OpenAI chat completion", || self.complete_once(messages))
            .await?;

        debug!(
            "OpenAI chat completion ({}) took {}ms, {} chars",
            self.model,
            start.elapsed().as_millis(),
            reply.len()
        );
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requires_api_key() {
        assert!(matches!(
            OpenAiChatClient::new(&LlmConfig::default(), "  "),
            Err(ResearchError::ConfigError(_))
        ));
    }

    #[test]
    fn test_request_shape() {
        let messages = vec![ChatMessage::system("be brief"), ChatMessage::user("hi")];
        let request = ChatRequest {
            model: "gpt-4o-mini",
            messages: &messages,
            temperature: 0.0,
            max_tokens: 10,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "gpt-4o-mini");
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "hi");
    }

    #[test]
    fn test_response_without_content() {
        let body: ChatResponse =
            serde_json::from_str(r#"{"choices":[{"message":{"role":"assistant"}}]}"#).unwrap();
        assert!(body.choices[0].message.content.is_none());
    }

    #[tokio::test]
    #[ignore = "Requires API key"]
    async fn test_chat_against_openai() {
        let key = std::env::var("OPENAI_API_KEY").unwrap();
        let client = OpenAiChatClient::new(&LlmConfig::default(), key).unwrap();
        let reply = client
            .chat(&[ChatMessage::user("Reply with the single word: pong")])
            .await
            .unwrap();
        assert!(reply.to_lowercase().contains("pong"));
    }
}
