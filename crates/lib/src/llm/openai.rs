//! OpenAI chat completions client (https://api.openai.com/v1 by default).
//! Non-streaming; one system instruction plus one user message per call.

use crate::config::CompletionConfig;
use crate::llm::CompletionBackend;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("completion service not configured: {0}")]
    NotConfigured(&'static str),
    #[error("completion request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("completion api error: {0}")]
    Api(String),
    #[error("malformed completion response: {0}")]
    Malformed(String),
}

/// Client for an OpenAI-compatible `/chat/completions` endpoint.
#[derive(Clone)]
pub struct OpenAiClient {
    base_url: String,
    api_key: Option<String>,
    model: String,
    system_prompt: String,
    max_tokens: u32,
    temperature: f32,
    client: reqwest::Client,
}

impl OpenAiClient {
    pub fn new(config: &CompletionConfig, client: reqwest::Client) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            system_prompt: config.system_prompt.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            client,
        }
    }

    fn request_body(&self, user_text: &str) -> ChatRequest {
        ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: self.system_prompt.clone(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: user_text.to_string(),
                },
            ],
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        }
    }

    /// POST /chat/completions — returns the trimmed content of the first choice.
    pub async fn chat(&self, user_text: &str) -> Result<String, UpstreamError> {
        let api_key = self
            .api_key
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or(UpstreamError::NotConfigured("api key"))?;
        let url = format!("{}/chat/completions", self.base_url);
        let res = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&self.request_body(user_text))
            .send()
            .await?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(UpstreamError::Api(format!("{} {}", status, body)));
        }
        let body = res.text().await?;
        first_choice_content(&body)
    }
}

/// Extract `choices[0].message.content`, trimmed.
fn first_choice_content(body: &str) -> Result<String, UpstreamError> {
    let data: ChatResponse =
        serde_json::from_str(body).map_err(|e| UpstreamError::Malformed(format!("{}: {}", e, body)))?;
    let content = data
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message)
        .and_then(|m| m.content)
        .ok_or_else(|| UpstreamError::Malformed(format!("no choice content: {}", body)))?;
    Ok(content.trim().to_string())
}

#[async_trait]
impl CompletionBackend for OpenAiClient {
    async fn complete(&self, text: &str) -> Result<String, UpstreamError> {
        self.chat(text).await
    }
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    #[serde(default)]
    message: Option<ChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}
