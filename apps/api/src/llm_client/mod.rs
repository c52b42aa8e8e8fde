/// LLM Client — the single outbound path to the course's model proxy.
///
/// ARCHITECTURAL RULE: No other module may talk to the proxy directly.
/// Everything goes through a `ModelBackend`, which `ModelClient` implements over HTTP.
///
/// The proxy is a thin pass-through: it takes `{system, messages, model, max_tokens}`
/// and answers `{content, usage?}` or `{error}` with a non-2xx status.
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

#[cfg(test)]
pub mod mock;
pub mod parse;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("LLM returned empty content")]
    EmptyContent,
}

#[derive(Debug, Serialize)]
struct ProxyRequest<'a> {
    system: &'a str,
    messages: Vec<ProxyMessage<'a>>,
    model: &'a str,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ProxyMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ProxyResponse {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct ProxyError {
    error: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// A successful model reply: raw text plus token accounting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelReply {
    pub content: String,
    pub usage: Usage,
}

/// Seam between the interview engine and whatever answers its prompts.
///
/// Carried in `AppState` and the engine as `Arc<dyn ModelBackend>`.
#[async_trait]
pub trait ModelBackend: Send + Sync {
    /// One system prompt, one user message, one reply.
    async fn call(&self, system: &str, user_message: &str) -> Result<ModelReply, LlmError>;

    /// Model id recorded in export metadata.
    fn model_name(&self) -> &str;
}

/// HTTP client for the model proxy.
#[derive(Clone)]
pub struct ModelClient {
    client: Client,
    endpoint: String,
    model: String,
    max_tokens: u32,
}

impl ModelClient {
    pub fn new(endpoint: String, model: String, max_tokens: u32) -> Self {
        Self {
            client: Client::new(),
            endpoint,
            model,
            max_tokens,
        }
    }
}

#[async_trait]
impl ModelBackend for ModelClient {
    /// Makes a single POST to the proxy. No retries here: a failed turn is
    /// retried by the student, never behind their back.
    async fn call(&self, system: &str, user_message: &str) -> Result<ModelReply, LlmError> {
        let request_body = ProxyRequest {
            system,
            messages: vec![ProxyMessage {
                role: "user",
                content: user_message,
            }],
            model: &self.model,
            max_tokens: self.max_tokens,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .header("content-type", "application/json")
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            // Prefer the proxy's own error message when it sent one
            let message = serde_json::from_str::<ProxyError>(&body)
                .map(|e| e.error)
                .unwrap_or_else(|_| {
                    status
                        .canonical_reason()
                        .map(String::from)
                        .unwrap_or(body)
                });
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.text().await?;
        if body.trim().is_empty() {
            return Err(LlmError::EmptyContent);
        }
        let parsed: ProxyResponse = serde_json::from_str(&body)?;
        let content = parsed.content.unwrap_or_default();
        if content.trim().is_empty() {
            return Err(LlmError::EmptyContent);
        }
        let usage = parsed.usage.unwrap_or_default();

        debug!(
            "LLM call succeeded: input_tokens={}, output_tokens={}",
            usage.input_tokens, usage.output_tokens
        );

        Ok(ModelReply { content, usage })
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
