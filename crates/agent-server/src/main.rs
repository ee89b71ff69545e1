//! Trade Persona Agent HTTP Server
//!
//! Axum server exposing the trade-history chat agent:
//! `POST /chat`, `GET /persona`, `GET /health`.

mod config;
mod handlers;
mod routes;
mod state;

use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use agent_core::LlmProvider;
use trade_analyst::{TradeAgent, TradeStore};

use crate::config::{ProviderKind, ServerConfig};
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment
    dotenvy::dotenv().ok();
    let config = ServerConfig::from_env()?;

    // Trade history is required; fail before binding
    let store = TradeStore::load(&config.trades_path)
        .with_context(|| format!("loading trades from {}", config.trades_path.display()))?;
    tracing::info!(
        "✓ Loaded {} trades from {}",
        store.len(),
        config.trades_path.display()
    );

    // Initialize LLM provider
    let provider = build_provider(&config)?;

    match provider.health_check().await {
        Ok(true) => {
            tracing::info!(
                "✓ Connected to {:?} (model {})",
                config.provider,
                config.model
            );
            if let Ok(models) = provider.list_models().await {
                for model in models {
                    tracing::info!("  Model: {}", model.id);
                }
            }
        }
        Ok(false) | Err(_) => {
            tracing::warn!(
                "⚠ {:?} not available - /chat will return llm_unavailable",
                config.provider
            );
            if config.provider == ProviderKind::Ollama {
                tracing::warn!("  Make sure Ollama is running: ollama serve");
            }
        }
    }

    let agent = TradeAgent::new(Arc::new(store), provider.clone(), config.agent_config());
    let persona = agent.persona();
    tracing::info!(
        "Persona: {} ({})",
        persona.persona,
        persona.summary.summary_line
    );

    let app = routes::app(AppState {
        agent: Arc::new(agent),
        provider,
    });

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;

    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!(
        "🚀 trade persona agent running on http://{}",
        config.bind_addr
    );
    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("");
    tracing::info!("Endpoints:");
    tracing::info!("  GET  /health   - Health check");
    tracing::info!("  GET  /persona  - Trader persona");
    tracing::info!("  POST /chat     - Ask about your trades");
    tracing::info!("");

    axum::serve(listener, app).await?;

    Ok(())
}

fn build_provider(config: &ServerConfig) -> anyhow::Result<Arc<dyn LlmProvider>> {
    match config.provider {
        #[cfg(feature = "ollama")]
        ProviderKind::Ollama => Ok(Arc::new(agent_runtime::OllamaProvider::from_env()?)),
        #[cfg(feature = "gemini")]
        ProviderKind::Gemini => {
            let gemini = agent_runtime::GeminiConfig {
                timeout_secs: config.llm_timeout.as_secs(),
                ..agent_runtime::GeminiConfig::from_env()?
            };
            Ok(Arc::new(agent_runtime::GeminiProvider::from_config(
                gemini,
            )?))
        }
        #[allow(unreachable_patterns)]
        other => anyhow::bail!(
            "LLM provider {:?} is not compiled in; enable the matching cargo feature",
            other
        ),
    }
}
