//! Table Schema
//!
//! The columns a query plan may reference, their types, and how each is read
//! off a [`Trade`]. Derived columns (`notional`, `pnl`) are computed per row.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::Serialize;

use crate::model::{Outcome, Side, Style, Trade};

/// Value type of a column
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Text,
    Side,
    Outcome,
    Style,
    Number,
    Date,
    Tags,
}

/// A queryable column
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Id,
    Asset,
    Side,
    Price,
    Volume,
    Notional,
    Pnl,
    Date,
    Outcome,
    Strategy,
    Style,
    Tags,
}

impl Field {
    pub const ALL: [Field; 12] = [
        Field::Id,
        Field::Asset,
        Field::Side,
        Field::Price,
        Field::Volume,
        Field::Notional,
        Field::Pnl,
        Field::Date,
        Field::Outcome,
        Field::Strategy,
        Field::Style,
        Field::Tags,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Field::Id => "id",
            Field::Asset => "asset",
            Field::Side => "side",
            Field::Price => "price",
            Field::Volume => "volume",
            Field::Notional => "notional",
            Field::Pnl => "pnl",
            Field::Date => "date",
            Field::Outcome => "outcome",
            Field::Strategy => "strategy",
            Field::Style => "style",
            Field::Tags => "tags",
        }
    }

    /// Column header used in the trade file, where there is one
    fn source_column(&self) -> Option<&'static str> {
        match self {
            Field::Id => Some("Trade ID"),
            Field::Asset => Some("Asset"),
            Field::Side => Some("Buy/Sell"),
            Field::Price => Some("Price"),
            Field::Volume => Some("Volume"),
            Field::Date => Some("Date"),
            Field::Outcome => Some("Outcome"),
            Field::Tags => Some("Tags"),
            Field::Notional | Field::Pnl | Field::Strategy | Field::Style => None,
        }
    }

    pub fn kind(&self) -> FieldKind {
        match self {
            Field::Id | Field::Asset | Field::Strategy => FieldKind::Text,
            Field::Side => FieldKind::Side,
            Field::Outcome => FieldKind::Outcome,
            Field::Style => FieldKind::Style,
            Field::Price | Field::Volume | Field::Notional | Field::Pnl => FieldKind::Number,
            Field::Date => FieldKind::Date,
            Field::Tags => FieldKind::Tags,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Field::Id => "unique trade identifier",
            Field::Asset => "ticker symbol",
            Field::Side => "trade direction",
            Field::Price => "execution price",
            Field::Volume => "quantity traded",
            Field::Notional => "price * volume",
            Field::Pnl => "profit proxy: +notional for Profit, -notional for Loss, 0 for Neutral",
            Field::Date => "trade timestamp (UTC)",
            Field::Outcome => "result of the trade",
            Field::Strategy => "first tag, free-text strategy name",
            Field::Style => "second tag, trading style",
            Field::Tags => "both tags; use with contains_tag",
        }
    }

    pub fn is_numeric(&self) -> bool {
        self.kind() == FieldKind::Number
    }

    /// Whether rows can be grouped on this column
    pub fn is_groupable(&self) -> bool {
        matches!(
            self,
            Field::Asset
                | Field::Side
                | Field::Outcome
                | Field::Strategy
                | Field::Style
                | Field::Date
        )
    }

    /// Numeric cell value, for numeric columns
    pub fn number(&self, trade: &Trade) -> Option<Decimal> {
        match self {
            Field::Price => Some(trade.price),
            Field::Volume => Some(trade.volume),
            Field::Notional => trade.notional(),
            Field::Pnl => trade.pnl(),
            _ => None,
        }
    }

    /// Text cell value, for text-like columns
    pub fn text<'a>(&self, trade: &'a Trade) -> Option<&'a str> {
        match self {
            Field::Id => Some(&trade.id),
            Field::Asset => Some(&trade.asset),
            Field::Strategy => Some(&trade.tags.strategy),
            _ => None,
        }
    }

    /// Grouping key; dates group by calendar day
    pub fn group_key(&self, trade: &Trade) -> Option<String> {
        match self {
            Field::Asset => Some(trade.asset.to_uppercase()),
            Field::Side => Some(trade.side.as_str().to_string()),
            Field::Outcome => Some(trade.outcome.as_str().to_string()),
            Field::Strategy => Some(trade.tags.strategy.clone()),
            Field::Style => Some(trade.tags.style.as_str().to_string()),
            Field::Date => Some(trade.timestamp.format("%Y-%m-%d").to_string()),
            _ => None,
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Field {
    type Err = String;

    /// Accepts the canonical name or the trade file's column header
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Field::ALL
            .into_iter()
            .find(|f| {
                f.name().eq_ignore_ascii_case(s)
                    || f.source_column().is_some_and(|c| c.eq_ignore_ascii_case(s))
            })
            .ok_or_else(|| format!("unknown field '{}'", s))
    }
}

/// Columns plus the concrete values seen in the loaded dataset
#[derive(Clone, Debug, Serialize)]
pub struct TableSchema {
    fields: Vec<Field>,
    assets: Vec<String>,
    strategies: Vec<String>,
    row_count: usize,
}

impl TableSchema {
    pub fn from_trades(trades: &[Trade]) -> Self {
        let assets: BTreeSet<String> = trades.iter().map(|t| t.asset.to_uppercase()).collect();
        let strategies: BTreeSet<String> = trades.iter().map(|t| t.tags.strategy.clone()).collect();

        Self {
            fields: Field::ALL.to_vec(),
            assets: assets.into_iter().collect(),
            strategies: strategies.into_iter().collect(),
            row_count: trades.len(),
        }
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn assets(&self) -> &[String] {
        &self.assets
    }

    /// Resolve a field name the LLM produced against this schema
    pub fn resolve(&self, name: &str) -> Result<Field, String> {
        let field: Field = name.parse()?;
        if self.fields.contains(&field) {
            Ok(field)
        } else {
            Err(format!("field '{}' is not part of the table", name))
        }
    }

    /// Human/LLM-readable column listing
    pub fn describe(&self) -> String {
        let mut out = format!("Table `trades` ({} rows) with columns:\n", self.row_count);

        for field in &self.fields {
            let kind = match field.kind() {
                FieldKind::Text => "text".to_string(),
                FieldKind::Number => "decimal".to_string(),
                FieldKind::Date => "date (YYYY-MM-DD or RFC 3339)".to_string(),
                FieldKind::Tags => "list of 2 tags".to_string(),
                FieldKind::Side => one_of(Side::ALL.iter().map(|s| s.as_str())),
                FieldKind::Outcome => one_of(Outcome::ALL.iter().map(|o| o.as_str())),
                FieldKind::Style => one_of(Style::ALL.iter().map(|s| s.as_str())),
            };
            out.push_str(&format!(
                "- `{}` ({}): {}\n",
                field.name(),
                kind,
                field.description()
            ));
        }

        if !self.assets.is_empty() {
            out.push_str(&format!("\nKnown assets: {}\n", self.assets.join(", ")));
        }
        if !self.strategies.is_empty() {
            out.push_str(&format!(
                "Known strategy tags: {}\n",
                self.strategies.join(", ")
            ));
        }

        out
    }
}

fn one_of<'a>(values: impl Iterator<Item = &'a str>) -> String {
    format!("one of {}", values.collect::<Vec<_>>().join(" | "))
}
