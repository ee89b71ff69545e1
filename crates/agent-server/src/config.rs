//! Server Configuration
//!
//! Everything comes from the environment (after `.env` is loaded).

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use agent_core::GenerationOptions;
use thiserror::Error;
use trade_analyst::AgentConfig;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {key}: '{value}' ({reason})")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Which LLM backend to talk to
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProviderKind {
    Ollama,
    Gemini,
}

impl ProviderKind {
    pub fn default_model(&self) -> &'static str {
        match self {
            ProviderKind::Ollama => "llama3.2",
            ProviderKind::Gemini => "gemini-1.5-flash",
        }
    }
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ollama" => Ok(ProviderKind::Ollama),
            "gemini" => Ok(ProviderKind::Gemini),
            _ => Err("expected 'ollama' or 'gemini'".into()),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ServerConfig {
    /// Listen address
    pub bind_addr: String,

    /// Trade history JSON file
    pub trades_path: PathBuf,

    pub provider: ProviderKind,
    pub model: String,
    pub temperature: f32,

    /// Deadline for each LLM call
    pub llm_timeout: Duration,

    /// Router re-prompts after a rejected plan
    pub repair_attempts: u32,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup (the environment in production)
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let provider: ProviderKind =
            parse(&lookup, "LLM_PROVIDER")?.unwrap_or(ProviderKind::Ollama);
        let defaults = GenerationOptions::default();

        let timeout_secs: u64 = parse(&lookup, "LLM_TIMEOUT_SECS")?.unwrap_or(60);
        if timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "LLM_TIMEOUT_SECS",
                value: "0".into(),
                reason: "must be at least 1".into(),
            });
        }

        Ok(Self {
            bind_addr: lookup("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:3000".into()),
            trades_path: lookup("TRADES_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("data/trades.json")),
            provider,
            model: lookup("LLM_MODEL").unwrap_or_else(|| provider.default_model().into()),
            temperature: parse(&lookup, "LLM_TEMPERATURE")?.unwrap_or(defaults.temperature),
            llm_timeout: Duration::from_secs(timeout_secs),
            repair_attempts: parse(&lookup, "ROUTER_REPAIR_ATTEMPTS")?.unwrap_or(1),
        })
    }

    pub fn agent_config(&self) -> AgentConfig {
        AgentConfig {
            options: GenerationOptions {
                model: self.model.clone(),
                temperature: self.temperature,
                ..Default::default()
            },
            timeout: self.llm_timeout,
            repair_attempts: self.repair_attempts,
        }
    }
}

fn parse<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|e: T::Err| ConfigError::Invalid {
                key,
                reason: e.to_string(),
                value,
            }),
    }
}
