//! # agent-runtime
//!
//! Runtime providers for the trade agent.
//!
//! ## Providers
//!
//! - **Ollama** (default): local inference through `ollama-rs`
//! - **Gemini** (feature `gemini`): Google Generative Language API
//!
//! ## Usage
//!
//! ```rust,ignore
//! use agent_runtime::ollama::{OllamaConfig, OllamaProvider};
//!
//! let provider = OllamaProvider::from_config(OllamaConfig::from_env())?;
//! let completion = provider.complete(&messages, &options).await?;
//! ```

#[cfg(feature = "gemini")]
mod http;

#[cfg(feature = "ollama")]
pub mod ollama;

#[cfg(feature = "gemini")]
pub mod gemini;

#[cfg(feature = "ollama")]
pub use ollama::{OllamaConfig, OllamaProvider};

#[cfg(feature = "gemini")]
pub use gemini::{GeminiConfig, GeminiProvider};

// Re-export core types for convenience
pub use agent_core::{AgentError, LlmProvider, Message, Result, Role};
