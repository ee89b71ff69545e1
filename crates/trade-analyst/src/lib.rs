//! # trade-analyst
//!
//! Answers natural-language questions about a trader's history, in the
//! trader's own voice.
//!
//! ## Pipeline
//!
//! ```text
//! question ──► QueryRouter ──► QueryPlan ──► executor ──► QueryResult
//!              (LLM call 1)    (validated)   (local)          │
//!                                                             ▼
//!              PersonaProfile ─────────────────────► ResponseComposer ──► answer
//!              (persona::analyze)                     (LLM call 2)
//! ```
//!
//! The LLM never touches the data directly: it proposes a plan, the plan is
//! validated against the [`TableSchema`], and the [`executor`] evaluates it
//! deterministically with `rust_decimal` arithmetic.

pub mod agent;
pub mod composer;
pub mod error;
pub mod executor;
pub mod model;
pub mod persona;
pub mod plan;
pub mod router;
pub mod schema;
pub mod store;

pub use agent::{AgentConfig, ChatAnswer, TradeAgent};
pub use error::{AnalystError, DataLoadError, Result};
pub use executor::{AggregateResult, QueryResult};
pub use model::{Outcome, Side, Style, Tags, Trade};
pub use persona::{PersonaLabel, PersonaProfile};
pub use plan::{QueryPlan, QueryType};
pub use router::{QueryRouter, RouterConfig};
pub use schema::{Field, TableSchema};
pub use store::TradeStore;
