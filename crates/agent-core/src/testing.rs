//! Scripted provider for tests
//!
//! Replies are served in order; every prompt received is recorded so tests
//! can assert on what the agent sent.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{AgentError, Result};
use crate::message::Message;
use crate::provider::{Completion, GenerationOptions, LlmProvider, ModelInfo, ProviderInfo};

/// One scripted reply
#[derive(Clone, Debug)]
pub enum ScriptedReply {
    /// Return this text
    Text(String),
    /// Fail as if the backend were down
    Unavailable(String),
    /// Sleep before answering (for timeout tests)
    Delayed(Duration, String),
}

/// A provider that plays back canned replies
#[derive(Default)]
pub struct ScriptedProvider {
    replies: Mutex<VecDeque<ScriptedReply>>,
    requests: Mutex<Vec<(Vec<Message>, GenerationOptions)>>,
}

impl ScriptedProvider {
    pub fn new(replies: impl IntoIterator<Item = ScriptedReply>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Convenience constructor for text-only scripts
    pub fn texts<S: Into<String>>(replies: impl IntoIterator<Item = S>) -> Self {
        Self::new(replies.into_iter().map(|r| ScriptedReply::Text(r.into())))
    }

    /// Number of completions requested so far
    pub fn call_count(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or(0)
    }

    /// Prompts received, oldest first
    pub fn requests(&self) -> Vec<(Vec<Message>, GenerationOptions)> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    async fn info(&self) -> Result<ProviderInfo> {
        Ok(ProviderInfo {
            name: "Scripted".into(),
            models: self.list_models().await?,
            supports_json_mode: true,
        })
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    async fn complete(
        &self,
        messages: &[Message],
        options: &GenerationOptions,
    ) -> Result<Completion> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push((messages.to_vec(), options.clone()));
        }

        let reply = self
            .replies
            .lock()
            .ok()
            .and_then(|mut r| r.pop_front())
            .ok_or_else(|| AgentError::ProviderUnavailable("script exhausted".into()))?;

        match reply {
            ScriptedReply::Text(text) => Ok(Completion::text(text, &options.model)),
            ScriptedReply::Unavailable(reason) => Err(AgentError::ProviderUnavailable(reason)),
            ScriptedReply::Delayed(delay, text) => {
                tokio::time::sleep(delay).await;
                Ok(Completion::text(text, &options.model))
            }
        }
    }

    async fn list_models(&self) -> Result<Vec<ModelInfo>> {
        Ok(vec![ModelInfo {
            id: "scripted".into(),
            name: "scripted".into(),
        }])
    }
}
