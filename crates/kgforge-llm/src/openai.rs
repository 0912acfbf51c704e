//! OpenAI-compatible chat completion provider (`/v1/chat/completions`).
//!
//! Blocking client: build workers call the extraction service inline, one chunk
//! at a time, so an async client would only add a runtime hop. The wire types are
//! private to this module.
//!
//! # Examples
//!
//! ```no_run
//! use kgforge_llm::OpenAiCompatibleProvider;
//! use kgforge_domain::traits::LlmProvider;
//!
//! let provider = OpenAiCompatibleProvider::new(
//!     "http://localhost:11434/v1/chat/completions",
//!     "qwen2.5:7b",
//!     0.3,
//!     60,
//!     None,
//! ).unwrap();
//! let reply = provider.generate("Extract triples from: ...").unwrap();
//! ```

use crate::LlmError;
use kgforge_domain::traits::LlmProvider as LlmProviderTrait;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error};

/// Default endpoint (a local OpenAI-compatible server)
pub const DEFAULT_ENDPOINT: &str = "http://localhost:11434/v1/chat/completions";

/// Default request timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Adapter for any HTTP endpoint implementing `/v1/chat/completions`
#[derive(Debug, Clone)]
pub struct OpenAiCompatibleProvider {
    client: Client,
    api_base_url: String,
    model: String,
    temperature: f32,
    api_key: Option<String>,
}

#[derive(Debug, Serialize)]
struct Message {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<Message>,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiCompatibleProvider {
    /// Build a provider from config values and an optional API key
    ///
    /// `api_key` is `None` for keyless local models; when present it is sent as a
    /// bearer token on every request.
    pub fn new(
        api_base_url: impl Into<String>,
        model: impl Into<String>,
        temperature: f32,
        timeout_secs: u64,
        api_key: Option<String>,
    ) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| LlmError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_base_url: api_base_url.into(),
            model: model.into(),
            temperature,
            api_key,
        })
    }

    /// Provider against [`DEFAULT_ENDPOINT`] with default timeout and no key
    pub fn default_endpoint(model: impl Into<String>) -> Result<Self, LlmError> {
        Self::new(DEFAULT_ENDPOINT, model, 0.0, DEFAULT_TIMEOUT_SECS, None)
    }

    fn complete(&self, prompt: &str) -> Result<Option<String>, LlmError> {
        let payload = ChatCompletionRequest {
            model: &self.model,
            messages: vec![Message {
                role: "user",
                content: prompt.to_string(),
            }],
            temperature: self.temperature,
        };

        debug!(model = %self.model, prompt_len = prompt.len(), "sending extraction request");

        let mut request = self.client.post(&self.api_base_url).json(&payload);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().map_err(|e| {
            error!(url = %self.api_base_url, error = %e, "extraction request failed (transport)");
            LlmError::Communication(format!("Request failed: {}", e))
        })?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(LlmError::ModelNotAvailable(self.model.clone()));
        }
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(LlmError::RateLimitExceeded);
        }
        if !status.is_success() {
            let body = response
                .text()
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(LlmError::Communication(format!("HTTP {}: {}", status, body)));
        }

        let parsed: ChatCompletionResponse = response
            .json()
            .map_err(|e| LlmError::InvalidResponse(format!("Failed to parse response: {}", e)))?;

        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty());

        debug!(has_content = text.is_some(), "received extraction response");
        Ok(text)
    }
}

impl LlmProviderTrait for OpenAiCompatibleProvider {
    type Error = LlmError;

    fn generate(&self, prompt: &str) -> Result<Option<String>, Self::Error> {
        self.complete(prompt)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
