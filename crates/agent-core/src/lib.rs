//! # agent-core
//!
//! Provider-agnostic LLM abstraction shared by the trade agent crates.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        agent-core                             │
//! │  ┌─────────────┐  ┌──────────────────┐  ┌─────────────────┐  │
//! │  │  Messages   │──│   LlmProvider    │──│   Structured    │  │
//! │  │             │  │   (Strategy)     │  │   output (JSON) │  │
//! │  └─────────────┘  └──────────────────┘  └─────────────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! The `LlmProvider` trait lets the agent swap between Ollama, Gemini,
//! or a scripted test double without touching domain logic.

pub mod error;
pub mod message;
pub mod provider;
pub mod structured;

pub use error::{AgentError, Result};
pub use message::{Message, Role};
pub use provider::{Completion, GenerationOptions, LlmProvider, ResponseFormat, complete_within};
pub use structured::{extract_json_object, parse_structured};

#[cfg(feature = "testing")]
pub mod testing;
