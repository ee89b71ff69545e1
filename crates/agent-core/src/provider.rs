//! LLM Provider Strategy Pattern
//!
//! Defines a common interface for all LLM providers (Ollama, Gemini, ...)
//! so the trade agent can work with any backend without code changes.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use agent_core::provider::{complete_within, GenerationOptions, LlmProvider};
//!
//! let provider = OllamaProvider::from_env()?;
//! let completion = complete_within(&provider, &messages, &options, timeout).await?;
//! ```

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{AgentError, Result};
use crate::message::Message;

/// Output format requested from the model
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseFormat {
    /// Free text
    #[default]
    Text,
    /// A single JSON document (provider-side structured output when supported)
    Json,
}

/// Configuration for LLM generation
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GenerationOptions {
    /// Model identifier (e.g., "llama3.2", "gemini-1.5-flash")
    pub model: String,

    /// Temperature for sampling (0.0 = deterministic, 1.0 = creative)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens to generate
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Top-p nucleus sampling
    #[serde(default = "default_top_p")]
    pub top_p: f32,

    /// Requested output format
    #[serde(default)]
    pub response_format: ResponseFormat,
}

fn default_temperature() -> f32 {
    0.7
}
fn default_max_tokens() -> u32 {
    2048
}
fn default_top_p() -> f32 {
    0.9
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            model: "llama3.2".into(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            top_p: default_top_p(),
            response_format: ResponseFormat::Text,
        }
    }
}

impl GenerationOptions {
    /// Same options, asking for a JSON document at temperature 0
    pub fn structured(&self) -> Self {
        Self {
            temperature: 0.0,
            response_format: ResponseFormat::Json,
            ..self.clone()
        }
    }
}

/// Response from an LLM completion
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Completion {
    /// The generated text
    pub content: String,

    /// Model that generated this response
    pub model: String,

    /// Token usage statistics (if available)
    pub usage: Option<TokenUsage>,

    /// Finish reason
    pub finish_reason: Option<FinishReason>,
}

impl Completion {
    /// Plain completion with no usage data
    pub fn text(content: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            model: model.into(),
            usage: None,
            finish_reason: Some(FinishReason::Stop),
        }
    }
}

/// Token usage statistics
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Reason for completion finishing
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    Stop,
    Length,
    ContentFilter,
    Error,
}

/// Provider metadata
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProviderInfo {
    /// Provider name (e.g., "Ollama", "Gemini")
    pub name: String,

    /// Available models
    pub models: Vec<ModelInfo>,

    /// Whether the provider enforces JSON output natively
    pub supports_json_mode: bool,
}

/// Information about a model
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ModelInfo {
    pub id: String,
    pub name: String,
}

/// Strategy trait for LLM providers
///
/// Implement this trait to add support for new LLM backends.
/// The agent works exclusively through this interface.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Get provider information and capabilities
    async fn info(&self) -> Result<ProviderInfo>;

    /// Check if the provider is available and configured correctly
    async fn health_check(&self) -> Result<bool>;

    /// Generate a completion from messages
    async fn complete(
        &self,
        messages: &[Message],
        options: &GenerationOptions,
    ) -> Result<Completion>;

    /// List available models
    async fn list_models(&self) -> Result<Vec<ModelInfo>>;
}

/// Run a completion, giving up after `timeout`
///
/// Expiry is reported as [`AgentError::Timeout`], which is retryable.
pub async fn complete_within(
    provider: &dyn LlmProvider,
    messages: &[Message],
    options: &GenerationOptions,
    timeout: Duration,
) -> Result<Completion> {
    match tokio::time::timeout(timeout, provider.complete(messages, options)).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(model = %options.model, ?timeout, "LLM completion timed out");
            Err(AgentError::Timeout(timeout))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct SlowProvider;

    #[async_trait]
    impl LlmProvider for SlowProvider {
        async fn info(&self) -> Result<ProviderInfo> {
            Ok(ProviderInfo {
                name: "slow".into(),
                models: vec![],
                supports_json_mode: false,
            })
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(true)
        }

        async fn complete(&self, _: &[Message], options: &GenerationOptions) -> Result<Completion> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(Completion::text("late", &options.model))
        }

        async fn list_models(&self) -> Result<Vec<ModelInfo>> {
            Ok(vec![])
        }
    }

    #[test]
    fn test_generation_options_defaults() {
        let opts = GenerationOptions::default();
        assert_eq!(opts.temperature, 0.7);
        assert_eq!(opts.max_tokens, 2048);
        assert_eq!(opts.model, "llama3.2");
        assert_eq!(opts.response_format, ResponseFormat::Text);
    }

    #[test]
    fn test_structured_options() {
        let opts = GenerationOptions {
            model: "m".into(),
            ..Default::default()
        }
        .structured();
        assert_eq!(opts.model, "m");
        assert_eq!(opts.temperature, 0.0);
        assert_eq!(opts.response_format, ResponseFormat::Json);
    }

    #[tokio::test(start_paused = true)]
    async fn test_complete_within_times_out() {
        let err = complete_within(
            &SlowProvider,
            &[Message::user("hi")],
            &GenerationOptions::default(),
            Duration::from_millis(50),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, AgentError::Timeout(_)));
        assert!(err.is_retryable());
    }
}
