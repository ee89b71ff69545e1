//! Application State

use std::sync::Arc;

use agent_core::LlmProvider;
use trade_analyst::TradeAgent;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Chat pipeline over the loaded trade history
    pub agent: Arc<TradeAgent>,

    /// LLM provider (Ollama or Gemini), kept for health checks
    pub provider: Arc<dyn LlmProvider>,
}
