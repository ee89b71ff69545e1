//! Query Router
//!
//! First LLM call of a chat turn: turn the user's question into a validated
//! [`QueryPlan`]. The model only ever proposes a plan; the executor runs it.

use std::sync::Arc;
use std::time::Duration;

use agent_core::{GenerationOptions, LlmProvider, Message, complete_within};
use chrono::{NaiveDate, Utc};

use crate::error::{AnalystError, Result};
use crate::executor::DEFAULT_LIMIT;
use crate::plan::{AggregateFn, Operator, QueryPlan};
use crate::schema::TableSchema;

const FEW_SHOT_EXAMPLES: &str = r#"Question: "Show me my last 5 DOGE buys"
{"kind": "retrieval", "predicates": [{"field": "asset", "op": "equals", "value": "DOGE"}, {"field": "side", "op": "equals", "value": "Buy"}], "limit": 5}

Question: "How many profitable trades did I have?"
{"kind": "aggregation", "predicates": [{"field": "outcome", "op": "equals", "value": "Profit"}], "group_by": null, "function": "count", "field": null, "rank": null}

Question: "What's my total traded volume per asset?"
{"kind": "aggregation", "predicates": [], "group_by": "asset", "function": "sum", "field": "volume", "rank": null}

Question: "What was my most profitable trade?"
{"kind": "aggregation", "predicates": [], "group_by": null, "function": "max", "field": "pnl", "rank": {"order": "most", "by": "pnl"}}

Question: "Which trades in January 2024 were risk-management plays?"
{"kind": "retrieval", "predicates": [{"field": "date", "op": "in_range", "value": ["2024-01-01", "2024-01-31"]}, {"field": "tags", "op": "contains_tag", "value": "Risk-Management"}], "limit": null}"#;

/// Router settings
#[derive(Clone, Debug)]
pub struct RouterConfig {
    /// Generation options; forced to JSON output at temperature 0
    pub options: GenerationOptions,

    /// Per-completion deadline
    pub timeout: Duration,

    /// Re-prompts carrying the validation error (0 disables)
    pub repair_attempts: u32,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            options: GenerationOptions::default(),
            timeout: Duration::from_secs(60),
            repair_attempts: 1,
        }
    }
}

pub struct QueryRouter {
    provider: Arc<dyn LlmProvider>,
    config: RouterConfig,
}

impl QueryRouter {
    pub fn new(provider: Arc<dyn LlmProvider>, config: RouterConfig) -> Self {
        Self { provider, config }
    }

    /// Ask the LLM for a plan and validate it against `schema`
    pub async fn route(&self, message: &str, schema: &TableSchema) -> Result<QueryPlan> {
        self.route_on(message, schema, Utc::now().date_naive())
            .await
    }

    async fn route_on(
        &self,
        message: &str,
        schema: &TableSchema,
        today: NaiveDate,
    ) -> Result<QueryPlan> {
        let options = self.config.options.structured();
        let mut messages = vec![
            Message::system(planning_prompt(schema, today)),
            Message::user(message),
        ];
        let mut repairs = 0;

        loop {
            let completion = complete_within(
                self.provider.as_ref(),
                &messages,
                &options,
                self.config.timeout,
            )
            .await?;

            match QueryPlan::parse(&completion.content, schema) {
                Ok(plan) => {
                    tracing::info!(query_type = %plan.query_type(), repairs, "Routed question");
                    tracing::debug!(?plan, "Validated plan");
                    return Ok(plan);
                }
                Err(AnalystError::InvalidPlan(reason)) if repairs < self.config.repair_attempts => {
                    repairs += 1;
                    tracing::warn!(%reason, attempt = repairs, "Plan rejected, asking for a corrected one");
                    messages.push(Message::assistant(completion.content));
                    messages.push(Message::user(repair_prompt(&reason)));
                }
                Err(err) => {
                    tracing::warn!(error = %err, "Plan rejected");
                    return Err(err);
                }
            }
        }
    }
}

fn planning_prompt(schema: &TableSchema, today: NaiveDate) -> String {
    let operators: Vec<&str> = Operator::ALL.iter().map(|o| o.as_str()).collect();
    let functions: Vec<&str> = AggregateFn::ALL.iter().map(|f| f.as_str()).collect();

    format!(
        r#"You translate questions about a trader's history into a JSON query plan.
Today's date is {today}.

{schema}
A plan is exactly one JSON object of one of two kinds:

1. Listing trades:
{{"kind": "retrieval", "predicates": [...], "limit": <integer or null>}}

2. Counting or computing numbers:
{{"kind": "aggregation", "predicates": [...], "group_by": <field or null>,
  "function": <function>, "field": <numeric field or null>,
  "rank": {{"order": "most" | "least", "by": <numeric field>}} or null}}

"limit" keeps the most recent N matching trades; null keeps the latest {default_limit}.

Each predicate is {{"field": <field>, "op": <operator>, "value": <value>}}.
Operators: {operators}.
- greater_than, less_than and in_range only apply to numeric fields and date.
- in_range takes [low, high], both inclusive.
- contains_tag only applies to tags.
Functions: {functions}. Every function except count needs a numeric "field".
Use "rank" for "most/least/best/worst/biggest" questions.
Use only the fields listed above. Dates are YYYY-MM-DD.

Examples:
{examples}

Respond with the JSON object only."#,
        today = today.format("%Y-%m-%d"),
        schema = schema.describe(),
        operators = operators.join(", "),
        functions = functions.join(", "),
        default_limit = DEFAULT_LIMIT,
        examples = FEW_SHOT_EXAMPLES,
    )
}

fn repair_prompt(reason: &str) -> String {
    format!(
        "That plan was rejected: {}. Reply with a corrected JSON plan using only the listed fields, \
         operators and functions.",
        reason
    )
}
