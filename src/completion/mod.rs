//! Language model clients used to synthesize answers, summaries, and relation reports.
//!
//! Ollama is reached through `/api/generate`; OpenAI and Groq share the OpenAI chat-completions
//! wire format. Every client runs with temperature `0` so repeated requests over the same
//! context stay stable.

use crate::config::{Config, LlmProvider};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

const DEFAULT_OLLAMA_URL: &str = "http://127.0.0.1:11434";
const DEFAULT_OPENAI_URL: &str = "https://api.openai.com/v1";
const DEFAULT_GROQ_URL: &str = "https://api.groq.com/openai/v1";

/// Errors surfaced while asking a language model for a completion.
#[derive(Debug, Error)]
pub enum CompletionError {
    /// Provider was unreachable or the endpoint does not exist.
    #[error("Completion provider unavailable: {0}")]
    ProviderUnavailable(String),
    /// Provider returned an error response.
    #[error("Failed to generate completion: {0}")]
    GenerationFailed(String),
    /// Provider response could not be parsed.
    #[error("Malformed provider response: {0}")]
    InvalidResponse(String),
}

/// Interface implemented by language model providers.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Complete the supplied prompt and return the generated text.
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError>;
}

/// Build a completion client based on configuration.
pub fn build_completion_client(
    config: &Config,
) -> Result<Box<dyn CompletionClient>, CompletionError> {
    tracing::debug!(provider = ?config.llm_provider, model = %config.llm_model, "Building completion client");
    Ok(match config.llm_provider {
        LlmProvider::Ollama => Box::new(OllamaCompletionClient::new(
            config
                .ollama_url
                .clone()
                .unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string()),
            config.llm_model.clone(),
        )?),
        LlmProvider::OpenAI => Box::new(ChatCompletionClient::new(
            config
                .openai_base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_OPENAI_URL.to_string()),
            config.openai_api_key.clone().unwrap_or_default(),
            config.llm_model.clone(),
        )?),
        LlmProvider::Groq => Box::new(ChatCompletionClient::new(
            DEFAULT_GROQ_URL.to_string(),
            config.groq_api_key.clone().unwrap_or_default(),
            config.llm_model.clone(),
        )?),
    })
}

fn http_client() -> Result<Client, CompletionError> {
    Client::builder()
        .user_agent("pdfrag/completion")
        .build()
        .map_err(|error| CompletionError::ProviderUnavailable(error.to_string()))
}

/// Completion client for a local Ollama runtime.
pub struct OllamaCompletionClient {
    http: Client,
    base_url: String,
    model: String,
}

impl OllamaCompletionClient {
    /// Create a client targeting `base_url` with the given model.
    pub fn new(base_url: String, model: String) -> Result<Self, CompletionError> {
        Ok(Self {
            http: http_client()?,
            base_url,
            model,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/api/generate", self.base_url.trim_end_matches('/'))
    }
}

#[derive(Debug, Deserialize)]
struct OllamaResponse {
    response: String,
    done: bool,
}

#[async_trait]
impl CompletionClient for OllamaCompletionClient {
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
        let payload = json!({
            "model": self.model,
            "prompt": prompt,
            "stream": false,
            "options": { "temperature": 0 }
        });

        let response = self
            .http
            .post(self.endpoint())
            .json(&payload)
            .send()
            .await
            .map_err(|error| {
                CompletionError::ProviderUnavailable(format!(
                    "failed to reach Ollama at {}: {error}",
                    self.base_url
                ))
            })?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(CompletionError::ProviderUnavailable(format!(
                "Ollama endpoint {} returned 404",
                self.endpoint()
            )));
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(CompletionError::GenerationFailed(format!(
                "Ollama returned {status}: {body}"
            )));
        }

        let body: OllamaResponse = response.json().await.map_err(|error| {
            CompletionError::InvalidResponse(format!("failed to decode Ollama response: {error}"))
        })?;

        if !body.done {
            return Err(CompletionError::InvalidResponse(
                "Ollama response incomplete (streaming not supported)".into(),
            ));
        }

        Ok(body.response.trim().to_string())
    }
}

/// Completion client for OpenAI-compatible chat-completion APIs (OpenAI, Groq).
pub struct ChatCompletionClient {
    http: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl ChatCompletionClient {
    /// Create a client targeting an OpenAI-compatible `base_url`.
    pub fn new(base_url: String, api_key: String, model: String) -> Result<Self, CompletionError> {
        Ok(Self {
            http: http_client()?,
            base_url,
            api_key,
            model,
        })
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl CompletionClient for ChatCompletionClient {
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
        let payload = json!({
            "model": self.model,
            "temperature": 0,
            "messages": [{ "role": "user", "content": prompt }]
        });

        let response = self
            .http
            .post(format!(
                "{}/chat/completions",
                self.base_url.trim_end_matches('/')
            ))
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|error| {
                CompletionError::ProviderUnavailable(format!(
                    "failed to reach {}: {error}",
                    self.base_url
                ))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(CompletionError::GenerationFailed(format!(
                "provider returned {status}: {body}"
            )));
        }

        let body: ChatResponse = response.json().await.map_err(|error| {
            CompletionError::InvalidResponse(format!("failed to decode chat response: {error}"))
        })?;

        body.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .ok_or_else(|| CompletionError::InvalidResponse("response had no choices".into()))
    }
}
