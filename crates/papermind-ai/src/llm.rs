use std::time::Duration;

use async_trait::async_trait;
use papermind_core::config::LlmConfig;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{AiError, Result};

/// A chat model answering a single system + user exchange.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete(&self, system: &str, user: &str) -> Result<String>;

    fn model_name(&self) -> &str;
}

/// Client for any OpenAI-compatible `/chat/completions` endpoint.
pub struct OpenAiChat {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Deserialize)]
struct ChatMessageResponse {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

impl OpenAiChat {
    pub fn new(
        base_url: &str,
        api_key: &str,
        model: &str,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .pool_max_idle_per_host(0)
            .build()?;
        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            api_key: api_key.to_string(),
            model: model.to_string(),
            temperature,
            max_tokens,
        })
    }

    /// Client for `model` using the endpoint, key and sampling settings of `config`.
    pub fn from_config(config: &LlmConfig, model: &str) -> Result<Self> {
        let api_key = config
            .api_key
            .as_deref()
            .ok_or_else(|| AiError::Llm("OPENAI_API_KEY is not set".to_string()))?;
        Self::new(
            &config.base_url,
            api_key,
            model,
            config.temperature,
            config.max_tokens,
        )
    }
}

#[async_trait]
impl ChatModel for OpenAiChat {
    async fn complete(&self, system: &str, user: &str) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        debug!(model = %self.model, prompt_chars = user.len(), "chat completion request");
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AiError::Llm(format!("API error {status}: {body}")));
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| AiError::Llm(format!("failed to parse response: {e}")))?;

        chat.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|s| s.trim().to_string())
            .ok_or_else(|| AiError::Llm("empty response".to_string()))
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};

    #[tokio::test]
    async fn completes_against_compatible_endpoint() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("POST", "/v1/chat/completions")
            .match_header("authorization", "Bearer sk-test")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "model": "gpt-4o-mini",
                "temperature": 0.0
            })))
            .with_status(200)
            .with_body(r#"{"choices": [{"message": {"role": "assistant", "content": " The answer. "}}]}"#)
            .create_async()
            .await;

        let chat = OpenAiChat::new(
            &format!("{}/v1", server.url()),
            "sk-test",
            "gpt-4o-mini",
            0.0,
            256,
        )
        .unwrap();
        let text = chat.complete("system", "question").await.unwrap();
        assert_eq!(text, "The answer.");
        assert_eq!(chat.model_name(), "gpt-4o-mini");
    }

    #[tokio::test]
    async fn api_error_is_reported() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("POST", "/chat/completions")
            .with_status(401)
            .with_body("invalid key")
            .create_async()
            .await;

        let chat = OpenAiChat::new(&server.url(), "bad", "m", 0.0, 16).unwrap();
        let err = chat.complete("s", "u").await.unwrap_err();
        assert!(err.to_string().contains("401"));
    }

    #[test]
    fn from_config_requires_key() {
        let config = LlmConfig {
            api_key: None,
            ..Default::default()
        };
        assert!(OpenAiChat::from_config(&config, "gpt-4o-mini").is_err());
    }
}
