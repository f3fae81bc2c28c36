//! OpenAI-compatible chat-completions backend (Groq by default)

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{GenerativeBackend, Prompt};
use crate::config::defaults::GENERATIVE_CONNECT_TIMEOUT_SECS;
use crate::config::GenerativeConfig;
use crate::error::GenerativeError;

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f64,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
}

fn chat_request<'a>(model: &'a str, prompt: &'a Prompt, max_tokens: u32, temperature: f64) -> ChatRequest<'a> {
    ChatRequest {
        model,
        messages: vec![
            ChatMessage {
                role: "system",
                content: &prompt.system,
            },
            ChatMessage {
                role: "user",
                content: &prompt.user,
            },
        ],
        max_tokens,
        temperature,
    }
}

/// HTTP backend for any OpenAI-compatible `/chat/completions` endpoint
#[derive(Clone)]
pub struct ChatCompletionsBackend {
    http: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: String,
    max_tokens: u32,
    temperature: f64,
}

impl ChatCompletionsBackend {
    pub fn new(config: &GenerativeConfig, api_key: String) -> Result<Self, GenerativeError> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(GENERATIVE_CONNECT_TIMEOUT_SECS))
            .build()
            .map_err(|e| GenerativeError::Unreachable(format!("HTTP client build failed: {e}")))?;

        Ok(Self {
            http,
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            api_key,
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        })
    }

    /// Build from config, reading the API key from the configured env var.
    ///
    /// Returns `None` when generation is disabled or no key is set; the
    /// advisory generator then always takes the fallback path.
    pub fn from_config(config: &GenerativeConfig) -> Option<Self> {
        if !config.enabled {
            return None;
        }
        let api_key = match std::env::var(&config.api_key_env) {
            Ok(key) if !key.trim().is_empty() => key,
            _ => {
                warn!(
                    env = %config.api_key_env,
                    "Generative API key not set, advisories will use fallback templates"
                );
                return None;
            }
        };
        match Self::new(config, api_key) {
            Ok(backend) => Some(backend),
            Err(e) => {
                warn!(error = %e, "Failed to build generative backend");
                None
            }
        }
    }
}

#[async_trait]
impl GenerativeBackend for ChatCompletionsBackend {
    async fn complete(&self, prompt: &Prompt, timeout: Duration) -> Result<String, GenerativeError> {
        let start = Instant::now();
        let body = chat_request(&self.model, prompt, self.max_tokens, self.temperature);

        let timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        let resp = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .timeout(timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GenerativeError::Timeout(timeout_ms)
                } else {
                    GenerativeError::Unreachable(e.to_string())
                }
            })?;

        let status = resp.status();
        if status.is_server_error() {
            return Err(GenerativeError::ServerError(status.as_u16()));
        }
        if !status.is_success() {
            return Err(GenerativeError::ClientError(status.as_u16()));
        }

        let parsed: ChatResponse = resp.json().await.map_err(|e| {
            if e.is_timeout() {
                GenerativeError::Timeout(timeout_ms)
            } else {
                GenerativeError::Malformed(e.to_string())
            }
        })?;

        if let Some(usage) = &parsed.usage {
            debug!(
                model = %self.model,
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                latency_ms = start.elapsed().as_millis() as u64,
                "Chat completion returned"
            );
        }

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| GenerativeError::Malformed("no completion content".to_string()))
    }

    fn backend_name(&self) -> &'static str {
        "chat-completions"
    }

    fn model(&self) -> &str {
        &self.model
    }
}
