//! Response Composer
//!
//! Second LLM call of a chat turn: phrase the executor's result in the
//! persona's voice. Numbers come from the result; the model only words them.

use std::sync::Arc;
use std::time::Duration;

use agent_core::{
    AgentError, GenerationOptions, LlmProvider, Message, ResponseFormat, complete_within,
};

use crate::error::Result;
use crate::executor::QueryResult;
use crate::persona::PersonaProfile;
use crate::plan::QueryPlan;

pub struct ResponseComposer {
    provider: Arc<dyn LlmProvider>,
    options: GenerationOptions,
    timeout: Duration,
}

impl ResponseComposer {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        options: GenerationOptions,
        timeout: Duration,
    ) -> Self {
        Self {
            provider,
            options: GenerationOptions {
                response_format: ResponseFormat::Text,
                ..options
            },
            timeout,
        }
    }

    pub async fn compose(
        &self,
        message: &str,
        plan: &QueryPlan,
        result: &QueryResult,
        persona: &PersonaProfile,
    ) -> Result<String> {
        let messages = [
            Message::system(voice_prompt(persona)),
            Message::user(answer_prompt(message, plan, result)),
        ];

        let completion = complete_within(
            self.provider.as_ref(),
            &messages,
            &self.options,
            self.timeout,
        )
        .await?;
        let text = completion.content.trim();

        if text.is_empty() {
            return Err(AgentError::Provider("empty response".into()).into());
        }

        tracing::debug!(chars = text.len(), "Composed response");
        Ok(text.to_string())
    }
}

fn voice_prompt(persona: &PersonaProfile) -> String {
    format!(
        "You are a conversational AI acting as a trader. Your personality is defined by the \
         following profile.\n\nPERSONA:\n{}\n\n\
         Answer in the first person (\"I\", \"my\"), stay in character, and keep it concise. \
         Only use figures that appear in the data you are given.",
        serde_json::to_string_pretty(persona).unwrap_or_default()
    )
}

fn answer_prompt(message: &str, plan: &QueryPlan, result: &QueryResult) -> String {
    let label = match result {
        QueryResult::Retrieval { .. } => "RELEVANT TRADE EXAMPLES",
        QueryResult::Aggregation(_) => "CALCULATED DATA",
    };

    let context = if result.is_empty() {
        "No matching trades. Say plainly that none of my trades match; do not invent any."
            .to_string()
    } else {
        serde_json::to_string(result).unwrap_or_default()
    };

    format!(
        "QUERY PLAN: {}\n\nCONTEXT: {}:\n{}\n\nUSER'S QUESTION:\n\"{}\"\n\nYour conversational and concise response:",
        serde_json::to_string(plan).unwrap_or_default(),
        label,
        context,
        message
    )
}
