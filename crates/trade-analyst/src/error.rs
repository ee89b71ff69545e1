//! Error Types for the Trade Analyst

use std::path::PathBuf;

use agent_core::AgentError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AnalystError>;

/// Failure to bring the trade dataset into memory (startup-fatal)
#[derive(Error, Debug)]
pub enum DataLoadError {
    #[error("Cannot read trade file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Trade file {path} is not a valid trade list: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Duplicate trade identifier: {0}")]
    DuplicateId(String),
}

/// Per-request errors surfaced by the agent pipeline
#[derive(Error, Debug)]
pub enum AnalystError {
    /// The LLM's query plan could not be parsed or failed validation
    #[error("Invalid query plan: {0}")]
    InvalidPlan(String),

    /// The LLM could not be reached, failed, or timed out
    #[error("LLM unavailable: {source}")]
    LlmUnavailable {
        #[source]
        source: AgentError,
    },

    /// No dataset is available to answer from
    #[error("Trade data unavailable: {0}")]
    DataUnavailable(#[from] DataLoadError),
}

impl AnalystError {
    /// Machine-readable kind for API payloads
    pub fn kind(&self) -> &'static str {
        match self {
            AnalystError::InvalidPlan(_) => "invalid_plan",
            AnalystError::LlmUnavailable { .. } => "llm_unavailable",
            AnalystError::DataUnavailable(_) => "data_unavailable",
        }
    }

    /// Whether the client may retry the same request
    pub fn is_retryable(&self) -> bool {
        match self {
            AnalystError::LlmUnavailable { source } => source.is_retryable(),
            _ => false,
        }
    }

    /// Convert to a user-friendly message
    pub fn user_message(&self) -> String {
        match self {
            AnalystError::InvalidPlan(reason) => {
                format!(
                    "I couldn't turn that question into a query over your trades ({}). Try rephrasing it.",
                    reason
                )
            }
            AnalystError::LlmUnavailable { source } => source.user_message(),
            AnalystError::DataUnavailable(_) => "Trade history is not available right now.".into(),
        }
    }
}

impl From<AgentError> for AnalystError {
    fn from(source: AgentError) -> Self {
        AnalystError::LlmUnavailable { source }
    }
}
