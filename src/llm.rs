//! Chat-completion client for the hosted language model.
//!
//! Groq exposes an OpenAI-compatible `chat/completions` endpoint; the
//! request/response shapes below cover the subset this tool uses. The
//! [`ChatModel`] seam lets tests substitute a canned model.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::config::AppConfig;
use crate::types::AskError;

/// Synthesizes an answer from a system instruction and a user message.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete(&self, system: &str, user: &str) -> Result<String, AskError>;
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

/// Groq chat-completion client.
///
/// No `Debug` impl; the struct carries the API credential.
#[derive(Clone)]
pub struct GroqChat {
    client: Client,
    base_url: Url,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl GroqChat {
    pub fn new(client: Client, config: &AppConfig) -> Self {
        Self {
            client,
            base_url: config.chat_base_url.clone(),
            api_key: config.groq_api_key.clone(),
            model: config.chat_model.clone(),
            temperature: 0.9,
            max_tokens: 500,
        }
    }

    fn endpoint(&self) -> Result<Url, AskError> {
        let mut url = self.base_url.clone();
        // Url::join would drop a versioned base path like `/openai/v1`.
        url.path_segments_mut()
            .map_err(|_| AskError::Llm("chat base URL cannot be a base".into()))?
            .pop_if_empty()
            .extend(["chat", "completions"]);
        Ok(url)
    }
}

#[async_trait]
impl ChatModel for GroqChat {
    async fn complete(&self, system: &str, user: &str) -> Result<String, AskError> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: system.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: user.to_string(),
                },
            ],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        let response = self
            .client
            .post(self.endpoint()?)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AskError::Llm(format!("{status}: {body}")));
        }

        let payload: ChatResponse = response
            .json()
            .await
            .map_err(|err| AskError::Llm(err.to_string()))?;
        let content = payload
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| AskError::Llm("response contained no choices".into()))?;

        debug!(model = %self.model, chars = content.len(), "chat completion");
        Ok(content)
    }
}
