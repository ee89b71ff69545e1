//! Trade Agent
//!
//! One chat turn: route → execute → compose.

use std::sync::Arc;
use std::time::Duration;

use agent_core::{GenerationOptions, LlmProvider};
use serde::Serialize;

use crate::composer::ResponseComposer;
use crate::error::Result;
use crate::executor::execute;
use crate::persona::{PersonaProfile, analyze};
use crate::plan::QueryType;
use crate::router::{QueryRouter, RouterConfig};
use crate::store::TradeStore;

/// Agent-wide LLM settings
#[derive(Clone, Debug)]
pub struct AgentConfig {
    /// Base generation options (model, temperature)
    pub options: GenerationOptions,

    /// Deadline for each LLM call
    pub timeout: Duration,

    /// Router re-prompts after a rejected plan
    pub repair_attempts: u32,
}

impl Default for AgentConfig {
    fn default() -> Self {
        let router = RouterConfig::default();
        Self {
            options: router.options,
            timeout: router.timeout,
            repair_attempts: router.repair_attempts,
        }
    }
}

/// Reply to a chat message
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ChatAnswer {
    pub response: String,
    pub query_type: QueryType,
}

pub struct TradeAgent {
    store: Arc<TradeStore>,
    router: QueryRouter,
    composer: ResponseComposer,
}

impl TradeAgent {
    pub fn new(
        store: Arc<TradeStore>,
        provider: Arc<dyn LlmProvider>,
        config: AgentConfig,
    ) -> Self {
        let router = QueryRouter::new(
            provider.clone(),
            RouterConfig {
                options: config.options.clone(),
                timeout: config.timeout,
                repair_attempts: config.repair_attempts,
            },
        );
        let composer = ResponseComposer::new(provider, config.options, config.timeout);

        Self {
            store,
            router,
            composer,
        }
    }

    /// Answer a question about the trade history
    #[tracing::instrument(name = "chat", skip_all, fields(chars = message.len()))]
    pub async fn answer(&self, message: &str) -> Result<ChatAnswer> {
        let plan = self.router.route(message, self.store.schema()).await?;

        let result = execute(self.store.trades(), &plan);
        tracing::info!(query_type = %plan.query_type(), empty = result.is_empty(), "Executed plan");

        let persona = self.persona();
        let response = self
            .composer
            .compose(message, &plan, &result, &persona)
            .await?;

        Ok(ChatAnswer {
            response,
            query_type: plan.query_type(),
        })
    }

    /// Persona derived from the current store
    pub fn persona(&self) -> PersonaProfile {
        analyze(self.store.trades())
    }

    pub fn store(&self) -> &TradeStore {
        &self.store
    }
}
