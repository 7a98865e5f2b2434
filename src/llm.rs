//! Chat-completion clients implementing [`TextGenerator`].
//!
//! Used for query expansion and regulatory analysis. Both backends send a
//! single user message and return the assistant's text unmodified; the
//! caller applies its own timeout.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub use lexfuse_core::llm::TextGenerator;

use crate::config::LlmConfig;
use crate::http;

/// Build the configured generator, or `None` when `llm.provider = "disabled"`.
pub fn create_generator(config: &LlmConfig) -> Result<Option<Arc<dyn TextGenerator>>> {
    let generator: Arc<dyn TextGenerator> = match config.provider.as_str() {
        "disabled" => return Ok(None),
        "openai" => Arc::new(OpenAiChat::new(config)?),
        "ollama" => Arc::new(OllamaChat::new(config)?),
        other => bail!("Unknown llm provider: {}", other),
    };
    Ok(Some(generator))
}

#[derive(Serialize, Deserialize)]
struct Message {
    role: String,
    content: String,
}

fn user_message(prompt: &str) -> Vec<Message> {
    vec![Message {
        role: "user".to_string(),
        content: prompt.to_string(),
    }]
}

fn model_of(config: &LlmConfig) -> Result<String> {
    config
        .model
        .clone()
        .ok_or_else(|| anyhow::anyhow!("llm.model required for provider '{}'", config.provider))
}

// ─── OpenAI-compatible ───────────────────────────────────

#[derive(Serialize)]
struct OpenAiChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message>,
    temperature: f32,
}

#[derive(Deserialize)]
struct OpenAiChatResponse {
    choices: Vec<OpenAiChoice>,
}

#[derive(Deserialize)]
struct OpenAiChoice {
    message: OpenAiResponseMessage,
}

#[derive(Deserialize)]
struct OpenAiResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

pub struct OpenAiChat {
    model: String,
    url: String,
    api_key: String,
    temperature: f32,
    client: reqwest::Client,
}

impl OpenAiChat {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let base = config.url.as_deref().unwrap_or(http::OPENAI_BASE);
        Ok(Self {
            model: model_of(config)?,
            url: format!("{}/chat/completions", base.trim_end_matches('/')),
            api_key: http::openai_key()?,
            temperature: config.temperature,
            client: http::client(config.timeout_secs)?,
        })
    }
}

fn openai_content(response: OpenAiChatResponse) -> Result<String> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| anyhow::anyhow!("OpenAI chat response has no content"))
}

#[async_trait]
impl TextGenerator for OpenAiChat {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        let req = OpenAiChatRequest {
            model: &self.model,
            messages: user_message(prompt),
            temperature: self.temperature,
        };
        let json = http::post_json(&self.client, &self.url, Some(&self.api_key), &req, 0, "OpenAI chat API")
            .await?;
        let body: OpenAiChatResponse =
            serde_json::from_value(json).context("Invalid OpenAI chat response")?;
        openai_content(body)
    }
}

// ─── Ollama ──────────────────────────────────────────────

#[derive(Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message>,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Serialize)]
struct OllamaOptions {
    temperature: f32,
}

#[derive(Deserialize)]
struct OllamaChatResponse {
    message: Message,
}

pub struct OllamaChat {
    model: String,
    url: String,
    temperature: f32,
    client: reqwest::Client,
}

impl OllamaChat {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let base = config.url.as_deref().unwrap_or(http::OLLAMA_BASE);
        Ok(Self {
            model: model_of(config)?,
            url: format!("{}/api/chat", base.trim_end_matches('/')),
            temperature: config.temperature,
            client: http::client(config.timeout_secs)?,
        })
    }
}

#[async_trait]
impl TextGenerator for OllamaChat {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        let req = OllamaChatRequest {
            model: &self.model,
            messages: user_message(prompt),
            stream: false,
            options: OllamaOptions {
                temperature: self.temperature,
            },
        };
        let json = http::post_json(&self.client, &self.url, None, &req, 0, "Ollama chat API").await?;
        let body: OllamaChatResponse =
            serde_json::from_value(json).context("Invalid Ollama chat response")?;
        Ok(body.message.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_yields_none() {
        assert!(create_generator(&LlmConfig::default()).unwrap().is_none());
    }

    #[test]
    fn test_ollama_requires_model() {
        let config = LlmConfig {
            provider: "ollama".to_string(),
            ..Default::default()
        };
        assert!(create_generator(&config).is_err());
    }

    #[test]
    fn test_ollama_builds_chat_url() {
        let config = LlmConfig {
            provider: "ollama".to_string(),
            model: Some("llama3".to_string()),
            url: Some("http://gpu-box:11434/".to_string()),
            ..Default::default()
        };
        let chat = OllamaChat::new(&config).unwrap();
        assert_eq!(chat.url, "http://gpu-box:11434/api/chat");
        assert_eq!(chat.model_name(), "llama3");
    }

    #[test]
    fn test_openai_content_extraction() {
        let body: OpenAiChatResponse = serde_json::from_value(serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": "SUMMARY\nok"}}]
        }))
        .unwrap();
        assert_eq!(openai_content(body).unwrap(), "SUMMARY\nok");

        let empty: OpenAiChatResponse =
            serde_json::from_value(serde_json::json!({"choices": []})).unwrap();
        assert!(openai_content(empty).is_err());
    }
}
