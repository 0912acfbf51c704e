//! kgforge Extraction Service Layer
//!
//! Pluggable implementations of the `LlmProvider` trait from `kgforge-domain`.
//!
//! # Providers
//!
//! - `MockProvider`: Deterministic mock for testing
//! - `OpenAiCompatibleProvider`: Any `/v1/chat/completions` endpoint
//!
//! # Examples
//!
//! ```
//! use kgforge_llm::MockProvider;
//! use kgforge_domain::traits::LlmProvider;
//!
//! let provider = MockProvider::new(r#"{"attributes": {}, "triples": [], "entity_types": {}}"#);
//! let result = provider.generate("test prompt").unwrap();
//! assert!(result.unwrap().contains("triples"));
//! ```

#![warn(missing_docs)]

pub mod openai;

use kgforge_domain::traits::LlmProvider as LlmProviderTrait;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;

pub use openai::OpenAiCompatibleProvider;

/// Errors that can occur during extraction-service calls
#[derive(Error, Debug)]
pub enum LlmError {
    /// Network or API communication error
    #[error("Communication error: {0}")]
    Communication(String),

    /// Invalid response from the service
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Rate limit exceeded
    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    /// Model not available
    #[error("Model not available: {0}")]
    ModelNotAvailable(String),

    /// Provider misconfiguration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic error
    #[error("LLM error: {0}")]
    Other(String),
}

/// Scripted reply for prompts containing a marker
#[derive(Debug, Clone)]
enum Scripted {
    Reply(Option<String>),
    Error,
}

/// Mock extraction service for deterministic testing
///
/// Replies are matched by substring against the prompt, so tests can key responses
/// on a chunk's text without reproducing the full prompt. The first matching rule
/// wins; unmatched prompts get the default response.
///
/// # Examples
///
/// ```
/// use kgforge_llm::MockProvider;
/// use kgforge_domain::traits::LlmProvider;
///
/// let mut provider = MockProvider::new("default");
/// provider.add_response("chunk one", "first");
/// provider.add_empty("chunk two");
///
/// assert_eq!(provider.generate("... chunk one ...").unwrap().as_deref(), Some("first"));
/// assert_eq!(provider.generate("... chunk two ...").unwrap(), None);
/// assert_eq!(provider.generate("other").unwrap().as_deref(), Some("default"));
/// ```
#[derive(Debug, Clone)]
pub struct MockProvider {
    default_response: Option<String>,
    rules: Arc<Mutex<Vec<(String, Scripted)>>>,
    delays: Arc<Mutex<Vec<(String, Duration)>>>,
    call_count: Arc<Mutex<usize>>,
    prompts: Arc<Mutex<Vec<String>>>,
}

impl MockProvider {
    /// Create a new MockProvider with a fixed response for all prompts
    pub fn new(response: impl Into<String>) -> Self {
        Self::with_default(Some(response.into()))
    }

    /// Create a MockProvider that answers without content by default
    pub fn silent() -> Self {
        Self::with_default(None)
    }

    fn with_default(default_response: Option<String>) -> Self {
        Self {
            default_response,
            rules: Arc::new(Mutex::new(Vec::new())),
            delays: Arc::new(Mutex::new(Vec::new())),
            call_count: Arc::new(Mutex::new(0)),
            prompts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Reply with `response` to prompts containing `marker`
    pub fn add_response(&mut self, marker: impl Into<String>, response: impl Into<String>) {
        self.push_rule(marker.into(), Scripted::Reply(Some(response.into())));
    }

    /// Reply without content to prompts containing `marker`
    pub fn add_empty(&mut self, marker: impl Into<String>) {
        self.push_rule(marker.into(), Scripted::Reply(None));
    }

    /// Fail prompts containing `marker`
    pub fn add_error(&mut self, marker: impl Into<String>) {
        self.push_rule(marker.into(), Scripted::Error);
    }

    /// Sleep before answering prompts containing `marker`
    pub fn add_delay(&mut self, marker: impl Into<String>, delay: Duration) {
        if let Ok(mut delays) = self.delays.lock() {
            delays.push((marker.into(), delay));
        }
    }

    fn push_rule(&mut self, marker: String, scripted: Scripted) {
        if let Ok(mut rules) = self.rules.lock() {
            rules.push((marker, scripted));
        }
    }

    /// Get the number of times generate was called
    pub fn call_count(&self) -> usize {
        self.call_count.lock().map(|count| *count).unwrap_or(0)
    }

    /// Reset the call count
    pub fn reset_call_count(&self) {
        if let Ok(mut count) = self.call_count.lock() {
            *count = 0;
        }
    }

    /// Prompts received so far, in call order
    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .map(|prompts| prompts.clone())
            .unwrap_or_default()
    }
}

fn poisoned<T>(_: std::sync::PoisonError<T>) -> LlmError {
    LlmError::Other("mock state poisoned".to_string())
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new(r#"{"attributes": {}, "triples": [], "entity_types": {}}"#)
    }
}

impl LlmProviderTrait for MockProvider {
    type Error = LlmError;

    fn generate(&self, prompt: &str) -> Result<Option<String>, Self::Error> {
        *self.call_count.lock().map_err(poisoned)? += 1;
        self.prompts.lock().map_err(poisoned)?.push(prompt.to_string());

        let delay = self
            .delays
            .lock()
            .map_err(poisoned)?
            .iter()
            .find(|(marker, _)| prompt.contains(marker.as_str()))
            .map(|(_, delay)| *delay);
        if let Some(delay) = delay {
            std::thread::sleep(delay);
        }

        let rules = self.rules.lock().map_err(poisoned)?;
        match rules.iter().find(|(marker, _)| prompt.contains(marker.as_str())) {
            Some((_, Scripted::Reply(reply))) => Ok(reply.clone()),
            Some((_, Scripted::Error)) => Err(LlmError::Other("Mock error".to_string())),
            None => Ok(self.default_response.clone()),
        }
    }

    fn model_name(&self) -> &str {
        "mock"
    }
}
