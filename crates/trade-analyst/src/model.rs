//! Domain Models
//!
//! Trade records as they appear in the trader's history file.
//! Uses `rust_decimal` for price and volume - never use f64 for money!

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

/// Trade direction
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub const ALL: [Side; 2] = [Side::Buy, Side::Sell];

    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "Buy",
            Side::Sell => "Sell",
        }
    }
}

/// How a trade ended
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome {
    Profit,
    Loss,
    Neutral,
}

impl Outcome {
    pub const ALL: [Outcome; 3] = [Outcome::Profit, Outcome::Loss, Outcome::Neutral];

    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Profit => "Profit",
            Outcome::Loss => "Loss",
            Outcome::Neutral => "Neutral",
        }
    }
}

/// Trading style vocabulary carried in the second tag slot
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Style {
    Technical,
    Sentiment,
    Value,
    #[serde(rename = "Risk-Management")]
    RiskManagement,
}

impl Style {
    pub const ALL: [Style; 4] = [
        Style::Technical,
        Style::Sentiment,
        Style::Value,
        Style::RiskManagement,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Style::Technical => "Technical",
            Style::Sentiment => "Sentiment",
            Style::Value => "Value",
            Style::RiskManagement => "Risk-Management",
        }
    }
}

macro_rules! vocabulary_from_str {
    ($ty:ident, $what:literal) => {
        impl FromStr for $ty {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let s = s.trim();
                $ty::ALL
                    .into_iter()
                    .find(|v| v.as_str().eq_ignore_ascii_case(s))
                    .ok_or_else(|| {
                        let allowed: Vec<&str> = $ty::ALL.iter().map(|v| v.as_str()).collect();
                        format!(
                            "unknown {} '{}' (expected one of: {})",
                            $what,
                            s,
                            allowed.join(", ")
                        )
                    })
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

vocabulary_from_str!(Side, "side");
vocabulary_from_str!(Outcome, "outcome");
vocabulary_from_str!(Style, "style tag");

/// The two tags attached to every trade: a free-text strategy and a style
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct Tags {
    /// Strategy tag (e.g. "breakout", "long-term")
    pub strategy: String,

    /// Style tag from the fixed vocabulary
    pub style: Style,
}

impl Tags {
    pub fn new(strategy: impl Into<String>, style: Style) -> Self {
        Self {
            strategy: strategy.into(),
            style,
        }
    }

    /// Case-insensitive match against either tag
    pub fn contains(&self, tag: &str) -> bool {
        let tag = tag.trim();
        self.strategy.eq_ignore_ascii_case(tag) || self.style.as_str().eq_ignore_ascii_case(tag)
    }
}

impl TryFrom<Vec<String>> for Tags {
    type Error = String;

    fn try_from(tags: Vec<String>) -> Result<Self, Self::Error> {
        let [strategy, style]: [String; 2] = tags
            .try_into()
            .map_err(|v: Vec<String>| format!("expected exactly 2 tags, got {}", v.len()))?;

        Ok(Self {
            strategy,
            style: style.parse()?,
        })
    }
}

impl From<Tags> for Vec<String> {
    fn from(tags: Tags) -> Self {
        vec![tags.strategy, tags.style.as_str().to_string()]
    }
}

/// A single historical trade
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    /// Unique trade identifier
    #[serde(rename = "Trade ID", alias = "id", alias = "trade_id")]
    pub id: String,

    /// Ticker symbol (e.g. "BTC")
    #[serde(rename = "Asset", alias = "asset")]
    pub asset: String,

    #[serde(rename = "Buy/Sell", alias = "side")]
    pub side: Side,

    /// Execution price
    #[serde(rename = "Price", alias = "price")]
    pub price: Decimal,

    /// Quantity traded
    #[serde(rename = "Volume", alias = "volume")]
    pub volume: Decimal,

    /// When the trade happened
    #[serde(
        rename = "Date",
        alias = "date",
        alias = "timestamp",
        deserialize_with = "deserialize_timestamp"
    )]
    pub timestamp: DateTime<Utc>,

    #[serde(rename = "Outcome", alias = "outcome")]
    pub outcome: Outcome,

    #[serde(rename = "Tags", alias = "tags")]
    pub tags: Tags,
}

impl Trade {
    /// Price x volume; `None` if the product overflows
    pub fn notional(&self) -> Option<Decimal> {
        self.price.checked_mul(self.volume)
    }

    /// Signed profit proxy: +notional on Profit, -notional on Loss, zero otherwise
    pub fn pnl(&self) -> Option<Decimal> {
        match self.outcome {
            Outcome::Profit => self.notional(),
            Outcome::Loss => self.notional().map(|n| -n),
            Outcome::Neutral => Some(Decimal::ZERO),
        }
    }
}

/// Parse the timestamp formats seen in trade files and in query values
///
/// Accepts RFC 3339, a naive `YYYY-MM-DDTHH:MM:SS[.f]` / `YYYY-MM-DD HH:MM:SS`
/// (taken as UTC), or a bare `YYYY-MM-DD` (midnight UTC).
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid date '{}'", raw)))
}
