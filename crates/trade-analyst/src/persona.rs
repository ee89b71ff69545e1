//! Persona Analyzer
//!
//! Descriptive statistics over the trade history, mapped onto a fixed set of
//! trader archetypes. Pure: same trades in, same profile out.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::model::{Outcome, Style, Trade};

// ============================================================================
// Labels
// ============================================================================

/// Named trader archetype
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum PersonaLabel {
    #[serde(rename = "Value Investor")]
    ValueInvestor,
    #[serde(rename = "Risk-Averse Trader")]
    RiskAverseTrader,
    #[serde(rename = "Technical Trader")]
    TechnicalTrader,
    #[serde(rename = "Sentiment-Driven Trader")]
    SentimentDrivenTrader,
    #[serde(rename = "Balanced Trader")]
    BalancedTrader,
}

impl PersonaLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            PersonaLabel::ValueInvestor => "Value Investor",
            PersonaLabel::RiskAverseTrader => "Risk-Averse Trader",
            PersonaLabel::TechnicalTrader => "Technical Trader",
            PersonaLabel::SentimentDrivenTrader => "Sentiment-Driven Trader",
            PersonaLabel::BalancedTrader => "Balanced Trader",
        }
    }

    /// Canned, data-free description
    pub fn description(&self) -> &'static str {
        match self {
            PersonaLabel::ValueInvestor => {
                "A patient, fundamentals-first investor who buys what looks undervalued, \
                 sizes positions carefully and is comfortable waiting for the thesis to play out."
            }
            PersonaLabel::RiskAverseTrader => {
                "A capital-preservation-first trader who leans on stop-losses, hedges and \
                 position sizing, and would rather miss a move than take an outsized loss."
            }
            PersonaLabel::TechnicalTrader => {
                "A chart reader who trades breakouts, trends and key levels, and lets price \
                 action rather than headlines decide the entries and exits."
            }
            PersonaLabel::SentimentDrivenTrader => {
                "A momentum-chasing trader who follows the crowd, the news flow and social \
                 buzz, and is willing to ride hype for a quick move."
            }
            PersonaLabel::BalancedTrader => {
                "No trading history yet, so no particular style stands out. A neutral, \
                 even-handed trader persona is used until trades are recorded."
            }
        }
    }

    fn for_style(style: Style) -> Self {
        match style {
            Style::Value => PersonaLabel::ValueInvestor,
            Style::RiskManagement => PersonaLabel::RiskAverseTrader,
            Style::Technical => PersonaLabel::TechnicalTrader,
            Style::Sentiment => PersonaLabel::SentimentDrivenTrader,
        }
    }
}

impl fmt::Display for PersonaLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Statistics
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum HoldingPeriod {
    Intraday,
    Swing,
    #[serde(rename = "Long-term")]
    LongTerm,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum RiskAppetite {
    Low,
    Medium,
    High,
}

/// Fraction of trades carrying each style tag
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct StyleShares {
    pub technical: f64,
    pub sentiment: f64,
    pub value: f64,
    pub risk_management: f64,
}

impl StyleShares {
    pub fn get(&self, style: Style) -> f64 {
        match style {
            Style::Technical => self.technical,
            Style::Sentiment => self.sentiment,
            Style::Value => self.value,
            Style::RiskManagement => self.risk_management,
        }
    }

    /// Largest share; ties resolved Value, Risk-Management, Technical, Sentiment
    pub fn dominant(&self) -> Style {
        const PRIORITY: [Style; 4] = [
            Style::Value,
            Style::RiskManagement,
            Style::Technical,
            Style::Sentiment,
        ];

        let mut best = PRIORITY[0];
        for style in &PRIORITY[1..] {
            if self.get(*style) > self.get(best) {
                best = *style;
            }
        }
        best
    }
}

/// Summary figures reported alongside the persona
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TradeStats {
    pub total_trades: usize,
    pub style_shares: StyleShares,
    pub dominant_style: Option<Style>,
    /// Profit / total
    pub win_rate: f64,
    pub outcome_distribution: BTreeMap<String, usize>,
    pub holding_period: HoldingPeriod,
    /// 1 - Risk-Management share
    pub risk_exposure: f64,
    /// Share of the most traded asset
    pub asset_concentration: f64,
    pub favorite_asset: Option<String>,
    pub top_strategy: Option<String>,
    /// Highest win rate; ties broken alphabetically
    pub best_performing_asset: Option<String>,
    pub strategy_distribution: BTreeMap<String, usize>,
    /// Win rate per strategy tag
    pub strategy_win_rates: BTreeMap<String, f64>,
    pub risk_score: f64,
    pub risk_appetite: RiskAppetite,
}

impl TradeStats {
    pub fn from_trades(trades: &[Trade]) -> Self {
        let total = trades.len();
        let share = |count: usize| {
            if total == 0 {
                0.0
            } else {
                count as f64 / total as f64
            }
        };

        let mut style_counts: BTreeMap<Style, usize> = BTreeMap::new();
        let mut outcomes: BTreeMap<String, usize> = BTreeMap::new();
        let mut assets: BTreeMap<String, (usize, usize)> = BTreeMap::new();
        let mut strategies: BTreeMap<String, (usize, usize)> = BTreeMap::new();

        for trade in trades {
            let won = usize::from(trade.outcome == Outcome::Profit);
            *style_counts.entry(trade.tags.style).or_default() += 1;
            *outcomes
                .entry(trade.outcome.as_str().to_string())
                .or_default() += 1;

            let asset = assets.entry(trade.asset.to_uppercase()).or_default();
            asset.0 += 1;
            asset.1 += won;

            let strategy = strategies.entry(trade.tags.strategy.clone()).or_default();
            strategy.0 += 1;
            strategy.1 += won;
        }

        let style_share = |style| share(style_counts.get(&style).copied().unwrap_or(0));
        let style_shares = StyleShares {
            technical: style_share(Style::Technical),
            sentiment: style_share(Style::Sentiment),
            value: style_share(Style::Value),
            risk_management: style_share(Style::RiskManagement),
        };

        let wins = outcomes.get(Outcome::Profit.as_str()).copied().unwrap_or(0);
        let losses = outcomes.get(Outcome::Loss.as_str()).copied().unwrap_or(0);
        let win_rate = share(wins);

        let decisive = share(wins + losses);
        let holding_period = if decisive >= 0.85 {
            HoldingPeriod::Intraday
        } else if decisive >= 0.60 {
            HoldingPeriod::Swing
        } else {
            HoldingPeriod::LongTerm
        };

        let favorite = most_frequent(assets.iter().map(|(k, (n, _))| (k, *n)));
        let asset_concentration = favorite.map(|(_, n)| share(n)).unwrap_or(0.0);

        let best_performing_asset = most_frequent_by(
            assets
                .iter()
                .map(|(k, (n, won))| (k, *won as f64 / *n as f64)),
        );

        let strategy_win_rates = strategies
            .iter()
            .map(|(k, (n, won))| (k.clone(), round2(*won as f64 / *n as f64)))
            .collect();

        let risk_score = risk_score(trades, &style_shares, win_rate);

        Self {
            total_trades: total,
            style_shares,
            dominant_style: (total > 0).then(|| style_shares.dominant()),
            win_rate: round2(win_rate),
            outcome_distribution: outcomes,
            holding_period,
            risk_exposure: round2(1.0 - style_shares.risk_management),
            asset_concentration: round2(asset_concentration),
            favorite_asset: favorite.map(|(k, _)| k.clone()),
            top_strategy: most_frequent(strategies.iter().map(|(k, (n, _))| (k, *n)))
                .map(|(k, _)| k.clone()),
            best_performing_asset,
            strategy_distribution: strategies
                .iter()
                .map(|(k, (n, _))| (k.clone(), *n))
                .collect(),
            strategy_win_rates,
            risk_score: round2(risk_score),
            risk_appetite: if risk_score < 2.5 {
                RiskAppetite::Low
            } else if risk_score <= 4.0 {
                RiskAppetite::Medium
            } else {
                RiskAppetite::High
            },
        }
    }
}

/// Highest count; BTreeMap order makes ties alphabetical
fn most_frequent<'a>(
    counts: impl Iterator<Item = (&'a String, usize)>,
) -> Option<(&'a String, usize)> {
    let mut best: Option<(&String, usize)> = None;
    for (key, n) in counts {
        if best.is_none_or(|(_, b)| n > b) {
            best = Some((key, n));
        }
    }
    best
}

fn most_frequent_by<'a>(scores: impl Iterator<Item = (&'a String, f64)>) -> Option<String> {
    let mut best: Option<(&String, f64)> = None;
    for (key, score) in scores {
        if best.is_none_or(|(_, b)| score > b) {
            best = Some((key, score));
        }
    }
    best.map(|(k, _)| k.clone())
}

fn asset_risk(asset: &str) -> f64 {
    match asset.to_uppercase().as_str() {
        "BTC" | "ETH" => 1.0,
        "ADA" | "MATIC" | "LINK" => 2.0,
        "XRP" => 3.0,
        "SOL" => 4.0,
        "DOGE" | "PEPE" => 5.0,
        _ => 3.0,
    }
}

fn risk_score(trades: &[Trade], shares: &StyleShares, win_rate: f64) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }

    let mut score = trades.iter().map(|t| asset_risk(&t.asset)).sum::<f64>() / trades.len() as f64;
    if shares.sentiment > 0.0 {
        score += 1.5;
    }
    if shares.risk_management > 0.0 {
        score -= 1.0;
    }
    if win_rate < 0.4 {
        score += 1.0;
    }
    score
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

// ============================================================================
// Rules
// ============================================================================

struct PersonaRule {
    label: PersonaLabel,
    applies: fn(&StyleShares) -> bool,
}

fn value_heavy(s: &StyleShares) -> bool {
    s.value + s.risk_management >= 0.6 && s.value >= s.risk_management
}

fn risk_heavy(s: &StyleShares) -> bool {
    s.risk_management >= 0.4
}

fn technical_heavy(s: &StyleShares) -> bool {
    s.technical >= 0.4 && s.technical >= s.sentiment
}

fn sentiment_heavy(s: &StyleShares) -> bool {
    s.sentiment >= 0.4
}

/// Evaluated top to bottom, first match wins
const PERSONA_RULES: [PersonaRule; 4] = [
    PersonaRule {
        label: PersonaLabel::ValueInvestor,
        applies: value_heavy,
    },
    PersonaRule {
        label: PersonaLabel::RiskAverseTrader,
        applies: risk_heavy,
    },
    PersonaRule {
        label: PersonaLabel::TechnicalTrader,
        applies: technical_heavy,
    },
    PersonaRule {
        label: PersonaLabel::SentimentDrivenTrader,
        applies: sentiment_heavy,
    },
];

fn classify(stats: &TradeStats) -> PersonaLabel {
    if stats.total_trades == 0 {
        return PersonaLabel::BalancedTrader;
    }

    PERSONA_RULES
        .iter()
        .find(|rule| (rule.applies)(&stats.style_shares))
        .map(|rule| rule.label)
        .unwrap_or_else(|| PersonaLabel::for_style(stats.style_shares.dominant()))
}

// ============================================================================
// Profile
// ============================================================================

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PersonaSummary {
    /// One-line characterization
    pub summary_line: String,
    #[serde(flatten)]
    pub stats: TradeStats,
}

/// What `GET /persona` returns and what the composer speaks as
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PersonaProfile {
    pub persona: PersonaLabel,
    pub description: String,
    pub summary: PersonaSummary,
}

pub fn analyze(trades: &[Trade]) -> PersonaProfile {
    let stats = TradeStats::from_trades(trades);
    let persona = classify(&stats);

    let summary_line = match stats.dominant_style {
        Some(style) => format!(
            "A {:?}-risk, {} trader with a focus on {} strategies.",
            stats.risk_appetite,
            match stats.holding_period {
                HoldingPeriod::Intraday => "intraday",
                HoldingPeriod::Swing => "swing",
                HoldingPeriod::LongTerm => "long-term",
            },
            style
        ),
        None => "No trades recorded yet.".to_string(),
    };

    tracing::debug!(persona = %persona, trades = stats.total_trades, "Persona analyzed");

    PersonaProfile {
        persona,
        description: persona.description().to_string(),
        summary: PersonaSummary {
            summary_line,
            stats,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Side, Tags};
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn trade(i: usize, asset: &str, outcome: Outcome, style: Style) -> Trade {
        Trade {
            id: format!("T{}", i),
            asset: asset.into(),
            side: Side::Buy,
            price: dec!(100),
            volume: dec!(1),
            timestamp: Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap(),
            outcome,
            tags: Tags::new(format!("strategy-{}", i % 2), style),
        }
    }

    fn with_styles(styles: &[(Style, usize)]) -> Vec<Trade> {
        styles
            .iter()
            .flat_map(|(style, n)| std::iter::repeat_n(*style, *n))
            .enumerate()
            .map(|(i, style)| trade(i, "BTC", Outcome::Profit, style))
            .collect()
    }

    #[test]
    fn test_empty_history_is_balanced() {
        let profile = analyze(&[]);
        assert_eq!(profile.persona, PersonaLabel::BalancedTrader);
        assert_eq!(profile.summary.stats.total_trades, 0);
        assert_eq!(profile.summary.stats.favorite_asset, None);
    }

    #[test]
    fn test_value_investor() {
        let trades = with_styles(&[
            (Style::Value, 5),
            (Style::RiskManagement, 3),
            (Style::Technical, 2),
        ]);
        let profile = analyze(&trades);
        assert_eq!(profile.persona, PersonaLabel::ValueInvestor);
        assert!(!profile.description.chars().any(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_risk_averse_beats_value_when_rm_dominates() {
        let trades = with_styles(&[
            (Style::RiskManagement, 5),
            (Style::Value, 2),
            (Style::Technical, 3),
        ]);
        assert_eq!(analyze(&trades).persona, PersonaLabel::RiskAverseTrader);
    }

    #[test]
    fn test_value_risk_split_goes_to_the_larger_side() {
        // 30% Value + 50% Risk-Management clears the 60% bar, but Risk-Management leads
        let trades = with_styles(&[
            (Style::Value, 3),
            (Style::RiskManagement, 5),
            (Style::Technical, 2),
        ]);
        assert_eq!(analyze(&trades).persona, PersonaLabel::RiskAverseTrader);

        // An even split stays with Value
        let trades = with_styles(&[
            (Style::Value, 4),
            (Style::RiskManagement, 4),
            (Style::Sentiment, 2),
        ]);
        assert_eq!(analyze(&trades).persona, PersonaLabel::ValueInvestor);
    }

    #[test]
    fn test_technical_and_sentiment() {
        let trades = with_styles(&[
            (Style::Technical, 5),
            (Style::Sentiment, 4),
            (Style::Value, 1),
        ]);
        assert_eq!(analyze(&trades).persona, PersonaLabel::TechnicalTrader);

        let trades = with_styles(&[
            (Style::Sentiment, 5),
            (Style::Technical, 4),
            (Style::Value, 1),
        ]);
        assert_eq!(
            analyze(&trades).persona,
            PersonaLabel::SentimentDrivenTrader
        );
    }

    #[test]
    fn test_fallback_uses_dominant_style() {
        // No share reaches 0.4
        let trades = with_styles(&[
            (Style::Technical, 3),
            (Style::Sentiment, 3),
            (Style::Value, 2),
            (Style::RiskManagement, 2),
        ]);
        assert_eq!(analyze(&trades).persona, PersonaLabel::TechnicalTrader);
    }

    #[test]
    fn test_dominant_tie_priority() {
        let shares = StyleShares {
            technical: 0.25,
            sentiment: 0.25,
            value: 0.25,
            risk_management: 0.25,
        };
        assert_eq!(shares.dominant(), Style::Value);
    }

    #[test]
    fn test_stats() {
        let trades = vec![
            trade(0, "BTC", Outcome::Profit, Style::Technical),
            trade(1, "DOGE", Outcome::Loss, Style::Sentiment),
            trade(2, "DOGE", Outcome::Profit, Style::Sentiment),
            trade(3, "ETH", Outcome::Neutral, Style::RiskManagement),
        ];
        let stats = TradeStats::from_trades(&trades);

        assert_eq!(stats.win_rate, 0.5);
        assert_eq!(stats.favorite_asset.as_deref(), Some("DOGE"));
        assert_eq!(stats.asset_concentration, 0.5);
        assert_eq!(stats.best_performing_asset.as_deref(), Some("BTC"));
        assert_eq!(stats.holding_period, HoldingPeriod::Swing);
        assert_eq!(stats.risk_exposure, 0.75);
        assert_eq!(stats.outcome_distribution["Profit"], 2);
        // mean asset risk (1 + 5 + 5 + 1) / 4 = 3, +1.5 sentiment, -1 risk-management
        assert_eq!(stats.risk_score, 3.5);
        assert_eq!(stats.risk_appetite, RiskAppetite::Medium);
    }

    #[test]
    fn test_analyze_is_pure() {
        let trades = with_styles(&[(Style::Value, 3), (Style::Sentiment, 3)]);
        assert_eq!(analyze(&trades), analyze(&trades));
    }

    #[test]
    fn test_profile_json_shape() {
        let json = serde_json::to_value(analyze(&with_styles(&[(Style::Value, 4)]))).unwrap();
        assert_eq!(json["persona"], "Value Investor");
        assert_eq!(json["summary"]["total_trades"], 4);
        assert_eq!(json["summary"]["holding_period"], "Intraday");
        assert!(json["summary"]["summary_line"].is_string());
    }
}
