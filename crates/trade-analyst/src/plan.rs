//! Query Plans
//!
//! The LLM describes what it wants as JSON. That JSON is untrusted: it is
//! first read into a closed raw shape (unknown keys rejected) and then
//! validated against the [`TableSchema`] into typed plans. Nothing that fails
//! either step reaches the executor.
//!
//! ```text
//! {"kind": "retrieval",
//!  "predicates": [{"field": "asset", "op": "equals", "value": "BTC"}],
//!  "limit": 5}
//!
//! {"kind": "aggregation",
//!  "predicates": [{"field": "outcome", "op": "equals", "value": "Profit"}],
//!  "group_by": null, "function": "count", "field": null, "rank": null}
//! ```

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{AnalystError, Result};
use crate::model::{Outcome, Side, Style, parse_timestamp};
use crate::schema::{Field, FieldKind, TableSchema};

// ============================================================================
// Raw (untrusted) shape
// ============================================================================

/// Plan exactly as the LLM emitted it
#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RawPlan {
    Retrieval(RawRetrieval),
    Aggregation(RawAggregation),
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawRetrieval {
    #[serde(default)]
    pub predicates: Vec<RawPredicate>,
    #[serde(default)]
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawAggregation {
    #[serde(default)]
    pub predicates: Vec<RawPredicate>,
    #[serde(default)]
    pub group_by: Option<String>,
    pub function: String,
    #[serde(default)]
    pub field: Option<String>,
    #[serde(default)]
    pub rank: Option<RawRank>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawPredicate {
    pub field: String,
    #[serde(alias = "operator")]
    pub op: String,
    #[serde(default)]
    pub value: Value,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawRank {
    pub order: String,
    pub by: String,
}

// ============================================================================
// Validated shape
// ============================================================================

/// Allowed comparison operators
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operator {
    Equals,
    NotEquals,
    GreaterThan,
    LessThan,
    InRange,
    ContainsTag,
}

impl Operator {
    pub const ALL: [Operator; 6] = [
        Operator::Equals,
        Operator::NotEquals,
        Operator::GreaterThan,
        Operator::LessThan,
        Operator::InRange,
        Operator::ContainsTag,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Equals => "equals",
            Operator::NotEquals => "not_equals",
            Operator::GreaterThan => "greater_than",
            Operator::LessThan => "less_than",
            Operator::InRange => "in_range",
            Operator::ContainsTag => "contains_tag",
        }
    }

    fn accepts(&self, kind: FieldKind) -> bool {
        match self {
            Operator::Equals | Operator::NotEquals => kind != FieldKind::Tags,
            Operator::GreaterThan | Operator::LessThan | Operator::InRange => {
                matches!(kind, FieldKind::Number | FieldKind::Date)
            }
            Operator::ContainsTag => kind == FieldKind::Tags,
        }
    }
}

impl FromStr for Operator {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        Operator::ALL
            .into_iter()
            .find(|op| op.as_str() == normalized)
            .ok_or_else(|| format!("unsupported operator '{}'", s))
    }
}

/// A typed comparison value
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Scalar {
    Text(String),
    Side(Side),
    Outcome(Outcome),
    Style(Style),
    Number(Decimal),
    Date(DateTime<Utc>),
}

/// Operator with its typed operand(s)
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "op", content = "value", rename_all = "snake_case")]
pub enum Condition {
    Equals(Scalar),
    NotEquals(Scalar),
    GreaterThan(Scalar),
    LessThan(Scalar),
    /// Inclusive on both ends
    InRange(Scalar, Scalar),
    ContainsTag(String),
}

/// One validated filter clause
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Predicate {
    pub field: Field,
    #[serde(flatten)]
    pub condition: Condition,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregateFn {
    Count,
    Sum,
    Average,
    Min,
    Max,
}

impl AggregateFn {
    pub const ALL: [AggregateFn; 5] = [
        AggregateFn::Count,
        AggregateFn::Sum,
        AggregateFn::Average,
        AggregateFn::Min,
        AggregateFn::Max,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AggregateFn::Count => "count",
            AggregateFn::Sum => "sum",
            AggregateFn::Average => "average",
            AggregateFn::Min => "min",
            AggregateFn::Max => "max",
        }
    }
}

impl FromStr for AggregateFn {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "count" => Ok(AggregateFn::Count),
            "sum" => Ok(AggregateFn::Sum),
            "average" | "avg" | "mean" => Ok(AggregateFn::Average),
            "min" => Ok(AggregateFn::Min),
            "max" => Ok(AggregateFn::Max),
            _ => Err(format!("unsupported aggregate function '{}'", s)),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RankDirection {
    Most,
    Least,
}

impl FromStr for RankDirection {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "most" | "top" | "highest" => Ok(RankDirection::Most),
            "least" | "bottom" | "lowest" => Ok(RankDirection::Least),
            _ => Err(format!("unsupported rank order '{}'", s)),
        }
    }
}

/// "Most/least X" modifier: pick a single record by a numeric column
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Rank {
    pub direction: RankDirection,
    pub by: Field,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RetrievalPlan {
    pub predicates: Vec<Predicate>,
    /// Keep only the `limit` most recent matches; `None` falls back to the executor default
    pub limit: Option<usize>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AggregationPlan {
    pub predicates: Vec<Predicate>,
    pub group_by: Option<Field>,
    pub function: AggregateFn,
    pub field: Option<Field>,
    pub rank: Option<Rank>,
}

/// Which pipeline a question was routed to
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryType {
    Retrieval,
    Aggregation,
}

impl fmt::Display for QueryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryType::Retrieval => write!(f, "retrieval"),
            QueryType::Aggregation => write!(f, "aggregation"),
        }
    }
}

/// A validated plan, safe to execute
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QueryPlan {
    Retrieval(RetrievalPlan),
    Aggregation(AggregationPlan),
}

impl QueryPlan {
    pub fn query_type(&self) -> QueryType {
        match self {
            QueryPlan::Retrieval(_) => QueryType::Retrieval,
            QueryPlan::Aggregation(_) => QueryType::Aggregation,
        }
    }

    /// Extract, deserialize and validate a plan from raw LLM output
    pub fn parse(content: &str, schema: &TableSchema) -> Result<Self> {
        let raw: RawPlan = agent_core::parse_structured(content)
            .map_err(|e| AnalystError::InvalidPlan(e.to_string()))?;
        Self::validate(raw, schema)
    }

    /// Check a raw plan against the schema
    pub fn validate(raw: RawPlan, schema: &TableSchema) -> Result<Self> {
        validate_plan(raw, schema).map_err(AnalystError::InvalidPlan)
    }
}

// ============================================================================
// Validation
// ============================================================================

fn validate_plan(raw: RawPlan, schema: &TableSchema) -> std::result::Result<QueryPlan, String> {
    match raw {
        RawPlan::Retrieval(r) => {
            let limit = match r.limit {
                None => None,
                Some(n) if n >= 1 => {
                    Some(usize::try_from(n).map_err(|_| format!("limit {} is too large", n))?)
                }
                Some(n) => return Err(format!("limit must be at least 1, got {}", n)),
            };

            Ok(QueryPlan::Retrieval(RetrievalPlan {
                predicates: validate_predicates(r.predicates, schema)?,
                limit,
            }))
        }
        RawPlan::Aggregation(a) => {
            let function: AggregateFn = a.function.parse()?;

            let field = a
                .field
                .as_deref()
                .map(|name| schema.resolve(name))
                .transpose()?;

            if function != AggregateFn::Count {
                match field {
                    Some(f) if f.is_numeric() => {}
                    Some(f) => {
                        return Err(format!(
                            "{} needs a numeric field, '{}' is not numeric",
                            function.as_str(),
                            f
                        ));
                    }
                    None => return Err(format!("{} needs a field", function.as_str())),
                }
            }

            let group_by = a
                .group_by
                .as_deref()
                .map(|name| schema.resolve(name))
                .transpose()?;

            if let Some(g) = group_by {
                if !g.is_groupable() {
                    return Err(format!("cannot group by '{}'", g));
                }
            }

            let rank = a
                .rank
                .map(|r| -> std::result::Result<Rank, String> {
                    let by = schema.resolve(&r.by)?;
                    if !by.is_numeric() {
                        return Err(format!("cannot rank by non-numeric field '{}'", by));
                    }
                    Ok(Rank {
                        direction: r.order.parse()?,
                        by,
                    })
                })
                .transpose()?;

            Ok(QueryPlan::Aggregation(AggregationPlan {
                predicates: validate_predicates(a.predicates, schema)?,
                group_by,
                function,
                field,
                rank,
            }))
        }
    }
}

fn validate_predicates(
    raw: Vec<RawPredicate>,
    schema: &TableSchema,
) -> std::result::Result<Vec<Predicate>, String> {
    raw.into_iter()
        .map(|p| validate_predicate(p, schema))
        .collect()
}

fn validate_predicate(
    raw: RawPredicate,
    schema: &TableSchema,
) -> std::result::Result<Predicate, String> {
    let field = schema.resolve(&raw.field)?;
    let op: Operator = raw.op.parse()?;
    let kind = field.kind();

    if !op.accepts(kind) {
        return Err(format!(
            "operator '{}' cannot be applied to field '{}'",
            op.as_str(),
            field
        ));
    }

    let condition = match op {
        Operator::Equals => Condition::Equals(scalar(kind, &raw.value, field)?),
        Operator::NotEquals => Condition::NotEquals(scalar(kind, &raw.value, field)?),
        Operator::GreaterThan => Condition::GreaterThan(scalar(kind, &raw.value, field)?),
        Operator::LessThan => Condition::LessThan(scalar(kind, &raw.value, field)?),
        Operator::InRange => {
            let (lo, hi) = range_bounds(&raw.value).ok_or_else(|| {
                format!(
                    "in_range on '{}' needs [low, high] or {{\"min\", \"max\"}}",
                    field
                )
            })?;
            let lo = scalar(kind, lo, field)?;
            let hi = scalar(kind, hi, field)?;
            if !ordered(&lo, &hi) {
                return Err(format!(
                    "in_range on '{}' has low bound above high bound",
                    field
                ));
            }
            Condition::InRange(lo, hi)
        }
        Operator::ContainsTag => match &raw.value {
            Value::String(tag) if !tag.trim().is_empty() => {
                Condition::ContainsTag(tag.trim().to_string())
            }
            other => return Err(format!("contains_tag needs a tag string, got {}", other)),
        },
    };

    Ok(Predicate { field, condition })
}

fn range_bounds(value: &Value) -> Option<(&Value, &Value)> {
    match value {
        Value::Array(items) if items.len() == 2 => Some((&items[0], &items[1])),
        Value::Object(map) => Some((map.get("min")?, map.get("max")?)),
        _ => None,
    }
}

fn ordered(lo: &Scalar, hi: &Scalar) -> bool {
    match (lo, hi) {
        (Scalar::Number(a), Scalar::Number(b)) => a <= b,
        (Scalar::Date(a), Scalar::Date(b)) => a <= b,
        _ => false,
    }
}

fn scalar(kind: FieldKind, value: &Value, field: Field) -> std::result::Result<Scalar, String> {
    let mismatch = || format!("value {} is not valid for field '{}'", value, field);

    match kind {
        FieldKind::Text => match value {
            Value::String(s) if !s.trim().is_empty() => Ok(Scalar::Text(s.trim().to_string())),
            _ => Err(mismatch()),
        },
        FieldKind::Side => as_str(value)
            .ok_or_else(mismatch)?
            .parse()
            .map(Scalar::Side),
        FieldKind::Outcome => as_str(value)
            .ok_or_else(mismatch)?
            .parse()
            .map(Scalar::Outcome),
        FieldKind::Style => as_str(value)
            .ok_or_else(mismatch)?
            .parse()
            .map(Scalar::Style),
        FieldKind::Number => {
            let text = match value {
                Value::Number(n) => n.to_string(),
                Value::String(s) => s.trim().to_string(),
                _ => return Err(mismatch()),
            };
            Decimal::from_str(&text)
                .or_else(|_| Decimal::from_scientific(&text))
                .map(Scalar::Number)
                .map_err(|_| mismatch())
        }
        FieldKind::Date => as_str(value)
            .and_then(parse_timestamp)
            .map(Scalar::Date)
            .ok_or_else(mismatch),
        FieldKind::Tags => Err(mismatch()),
    }
}

fn as_str(value: &Value) -> Option<&str> {
    value.as_str()
}
