//! Query Executor
//!
//! Deterministic, local evaluation of validated plans over the trade table.
//! All arithmetic stays in [`Decimal`].

use std::cmp::Ordering;
use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::Serialize;

use crate::model::Trade;
use crate::plan::{
    AggregateFn, AggregationPlan, Condition, Predicate, QueryPlan, Rank, RankDirection,
    RetrievalPlan, Scalar,
};
use crate::schema::Field;

/// Group key used when a plan has no `group_by`
pub const ALL_GROUP: &str = "all";

/// Rows a retrieval returns when the plan sets no limit
pub const DEFAULT_LIMIT: usize = 5;

// ============================================================================
// Predicates
// ============================================================================

impl Predicate {
    /// Whether a trade satisfies this clause
    pub fn matches(&self, trade: &Trade) -> bool {
        match &self.condition {
            Condition::Equals(v) => equals(self.field, trade, v),
            Condition::NotEquals(v) => !equals(self.field, trade, v),
            Condition::GreaterThan(v) => compare(self.field, trade, v) == Some(Ordering::Greater),
            Condition::LessThan(v) => compare(self.field, trade, v) == Some(Ordering::Less),
            Condition::InRange(lo, hi) => in_range(self.field, trade, lo, hi),
            Condition::ContainsTag(tag) => trade.tags.contains(tag),
        }
    }
}

fn equals(field: Field, trade: &Trade, value: &Scalar) -> bool {
    match value {
        Scalar::Text(expected) => field
            .text(trade)
            .is_some_and(|t| t.eq_ignore_ascii_case(expected)),
        Scalar::Side(side) => field == Field::Side && trade.side == *side,
        Scalar::Outcome(outcome) => field == Field::Outcome && trade.outcome == *outcome,
        Scalar::Style(style) => field == Field::Style && trade.tags.style == *style,
        Scalar::Number(n) => field.number(trade).is_some_and(|x| x == *n),
        // Dates compare by calendar day
        Scalar::Date(d) => field == Field::Date && trade.timestamp.date_naive() == d.date_naive(),
    }
}

fn compare(field: Field, trade: &Trade, value: &Scalar) -> Option<Ordering> {
    match value {
        Scalar::Number(n) => field.number(trade).map(|x| x.cmp(n)),
        Scalar::Date(d) if field == Field::Date => Some(trade.timestamp.cmp(d)),
        _ => None,
    }
}

fn in_range(field: Field, trade: &Trade, lo: &Scalar, hi: &Scalar) -> bool {
    match (lo, hi) {
        (Scalar::Number(lo), Scalar::Number(hi)) => {
            field.number(trade).is_some_and(|x| *lo <= x && x <= *hi)
        }
        (Scalar::Date(lo), Scalar::Date(hi)) if field == Field::Date => {
            let day = trade.timestamp.date_naive();
            lo.date_naive() <= day && day <= hi.date_naive()
        }
        _ => false,
    }
}

// ============================================================================
// Retrieval
// ============================================================================

/// Conjunction of predicates; keeps file order
pub fn filter<'a>(trades: &'a [Trade], predicates: &[Predicate]) -> Vec<&'a Trade> {
    trades
        .iter()
        .filter(|t| predicates.iter().all(|p| p.matches(t)))
        .collect()
}

/// Filter, then keep the `limit` most recent matches ([`DEFAULT_LIMIT`] when unset).
///
/// Recency is by timestamp, not file position; the survivors come back in
/// dataset order.
pub fn retrieve<'a>(trades: &'a [Trade], plan: &RetrievalPlan) -> Vec<&'a Trade> {
    let matched = filter(trades, &plan.predicates);
    let limit = plan.limit.unwrap_or(DEFAULT_LIMIT);
    if matched.len() <= limit {
        return matched;
    }

    // Newest first; the later row wins a timestamp tie
    let mut newest: Vec<usize> = (0..matched.len()).collect();
    newest.sort_by(|&a, &b| {
        matched[b]
            .timestamp
            .cmp(&matched[a].timestamp)
            .then(b.cmp(&a))
    });
    newest.truncate(limit);
    newest.sort_unstable();

    newest.into_iter().map(|i| matched[i]).collect()
}

// ============================================================================
// Aggregation
// ============================================================================

/// One group's figures
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GroupValue {
    pub count: usize,

    /// Result of the aggregate function; `None` when the group is empty or the figure overflows
    pub value: Option<Decimal>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AggregateResult {
    pub function: AggregateFn,
    pub field: Option<Field>,
    pub group_by: Option<Field>,

    /// Sorted by key; a single `"all"` group when ungrouped
    pub groups: BTreeMap<String, GroupValue>,

    /// Record picked by a most/least rank
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ranked: Option<Trade>,

    /// Top/bottom group when both rank and group_by are set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub designated_group: Option<String>,

    /// Rows that passed the filter
    pub matched: usize,
}

impl AggregateResult {
    pub fn is_empty(&self) -> bool {
        self.matched == 0
    }
}

pub fn aggregate(trades: &[Trade], plan: &AggregationPlan) -> AggregateResult {
    let rows = filter(trades, &plan.predicates);

    let mut buckets: BTreeMap<String, Vec<&Trade>> = BTreeMap::new();
    match plan.group_by {
        Some(group_by) => {
            for &trade in &rows {
                if let Some(key) = group_by.group_key(trade) {
                    buckets.entry(key).or_default().push(trade);
                }
            }
        }
        None => {
            buckets.insert(ALL_GROUP.to_string(), rows.clone());
        }
    }

    let groups: BTreeMap<String, GroupValue> = buckets
        .into_iter()
        .map(|(key, members)| {
            let value = apply(plan.function, plan.field, &members);
            (
                key,
                GroupValue {
                    count: members.len(),
                    value,
                },
            )
        })
        .collect();

    let ranked = plan.rank.and_then(|rank| rank_record(&rows, rank)).cloned();

    let designated_group = match (plan.rank, plan.group_by) {
        (Some(rank), Some(_)) => designate_group(&groups, rank.direction),
        _ => None,
    };

    AggregateResult {
        function: plan.function,
        field: plan.field,
        group_by: plan.group_by,
        groups,
        ranked,
        designated_group,
        matched: rows.len(),
    }
}

fn apply(function: AggregateFn, field: Option<Field>, rows: &[&Trade]) -> Option<Decimal> {
    if function == AggregateFn::Count {
        return Some(Decimal::from(rows.len()));
    }

    let field = field?;
    let values: Vec<Decimal> = rows.iter().filter_map(|t| field.number(t)).collect();
    if values.is_empty() {
        return None;
    }

    let value = match function {
        AggregateFn::Count => Some(Decimal::from(values.len())),
        AggregateFn::Sum => checked_sum(&values),
        AggregateFn::Average => checked_sum(&values)
            .and_then(|total| total.checked_div(Decimal::from(values.len())))
            .map(|avg| avg.normalize()),
        AggregateFn::Min => values.into_iter().min(),
        AggregateFn::Max => values.into_iter().max(),
    };

    if value.is_none() {
        tracing::warn!(function = function.as_str(), %field, "Aggregate overflowed; reporting no value");
    }
    value
}

fn checked_sum(values: &[Decimal]) -> Option<Decimal> {
    values
        .iter()
        .try_fold(Decimal::ZERO, |acc, v| acc.checked_add(*v))
}

/// Full scan; ties go to the earliest timestamp, then to dataset order
fn rank_record<'a>(rows: &[&'a Trade], rank: Rank) -> Option<&'a Trade> {
    let mut best: Option<(&Trade, Decimal)> = None;

    for &trade in rows {
        let Some(value) = rank.by.number(trade) else {
            continue;
        };

        let better = match best {
            None => true,
            Some((current, current_value)) => {
                let ord = match rank.direction {
                    RankDirection::Most => value.cmp(&current_value),
                    RankDirection::Least => current_value.cmp(&value),
                };
                ord == Ordering::Greater
                    || (ord == Ordering::Equal && trade.timestamp < current.timestamp)
            }
        };

        if better {
            best = Some((trade, value));
        }
    }

    best.map(|(trade, _)| trade)
}

/// Ties go to the smallest key
fn designate_group(
    groups: &BTreeMap<String, GroupValue>,
    direction: RankDirection,
) -> Option<String> {
    let mut best: Option<(&String, Decimal)> = None;

    for (key, group) in groups {
        let Some(value) = group.value else { continue };
        let better = match best {
            None => true,
            Some((_, current)) => match direction {
                RankDirection::Most => value > current,
                RankDirection::Least => value < current,
            },
        };
        if better {
            best = Some((key, value));
        }
    }

    best.map(|(key, _)| key.clone())
}

// ============================================================================
// Plan dispatch
// ============================================================================

/// Outcome of executing a plan
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QueryResult {
    Retrieval { trades: Vec<Trade> },
    Aggregation(AggregateResult),
}

impl QueryResult {
    /// No rows matched the plan's filter
    pub fn is_empty(&self) -> bool {
        match self {
            QueryResult::Retrieval { trades } => trades.is_empty(),
            QueryResult::Aggregation(result) => result.is_empty(),
        }
    }
}

pub fn execute(trades: &[Trade], plan: &QueryPlan) -> QueryResult {
    match plan {
        QueryPlan::Retrieval(plan) => QueryResult::Retrieval {
            trades: retrieve(trades, plan).into_iter().cloned().collect(),
        },
        QueryPlan::Aggregation(plan) => QueryResult::Aggregation(aggregate(trades, plan)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Outcome, Side, Style, Tags};
    use chrono::{Duration, TimeZone, Utc};
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn trade(
        id: &str,
        asset: &str,
        price: Decimal,
        day: i64,
        outcome: Outcome,
        style: Style,
    ) -> Trade {
        Trade {
            id: id.into(),
            asset: asset.into(),
            side: Side::Buy,
            price,
            volume: dec!(1),
            timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::days(day),
            outcome,
            tags: Tags::new("breakout", style),
        }
    }

    fn sample() -> Vec<Trade> {
        vec![
            trade(
                "T1",
                "BTC",
                dec!(42000),
                0,
                Outcome::Profit,
                Style::Technical,
            ),
            trade("T2", "ETH", dec!(2500), 1, Outcome::Loss, Style::Sentiment),
            trade("T3", "BTC", dec!(43000), 2, Outcome::Loss, Style::Value),
            trade(
                "T4",
                "DOGE",
                dec!(0.15),
                3,
                Outcome::Profit,
                Style::Sentiment,
            ),
            trade(
                "T5",
                "ETH",
                dec!(2600),
                4,
                Outcome::Neutral,
                Style::RiskManagement,
            ),
        ]
    }

    fn pred(field: Field, condition: Condition) -> Predicate {
        Predicate { field, condition }
    }

    fn count_plan(predicates: Vec<Predicate>, group_by: Option<Field>) -> AggregationPlan {
        AggregationPlan {
            predicates,
            group_by,
            function: AggregateFn::Count,
            field: None,
            rank: None,
        }
    }

    #[test]
    fn test_filter_conjunction_keeps_order() {
        let trades = sample();
        let rows = filter(
            &trades,
            &[
                pred(Field::Asset, Condition::Equals(Scalar::Text("btc".into()))),
                pred(
                    Field::Price,
                    Condition::GreaterThan(Scalar::Number(dec!(1000))),
                ),
            ],
        );
        let ids: Vec<_> = rows.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, ["T1", "T3"]);
    }

    #[test]
    fn test_filter_empty_is_valid() {
        let trades = sample();
        let rows = filter(
            &trades,
            &[pred(
                Field::Asset,
                Condition::Equals(Scalar::Text("PEPE".into())),
            )],
        );
        assert!(rows.is_empty());
    }

    #[test]
    fn test_tag_and_date_predicates() {
        let trades = sample();
        let jan2 = Utc.with_ymd_and_hms(2024, 1, 2, 15, 0, 0).unwrap();
        let jan4 = Utc.with_ymd_and_hms(2024, 1, 4, 0, 0, 0).unwrap();

        let tagged = filter(
            &trades,
            &[pred(
                Field::Tags,
                Condition::ContainsTag("sentiment".into()),
            )],
        );
        assert_eq!(tagged.len(), 2);

        let same_day = filter(
            &trades,
            &[pred(Field::Date, Condition::Equals(Scalar::Date(jan2)))],
        );
        assert_eq!(same_day[0].id, "T2");

        let ranged = filter(
            &trades,
            &[pred(
                Field::Date,
                Condition::InRange(Scalar::Date(jan2), Scalar::Date(jan4)),
            )],
        );
        let ids: Vec<_> = ranged.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, ["T2", "T3", "T4"]);
    }

    #[test]
    fn test_retrieve_keeps_latest_matches() {
        let trades = sample();
        let plan = RetrievalPlan {
            predicates: vec![],
            limit: Some(2),
        };
        let ids: Vec<_> = retrieve(&trades, &plan)
            .iter()
            .map(|t| t.id.as_str())
            .collect();
        assert_eq!(ids, ["T4", "T5"]);

        let plan = RetrievalPlan {
            predicates: vec![],
            limit: Some(50),
        };
        assert_eq!(retrieve(&trades, &plan).len(), 5);
    }

    #[test]
    fn test_retrieve_picks_latest_by_date_not_file_position() {
        // File order is not chronological
        let trades = vec![
            trade(
                "T1",
                "DOGE",
                dec!(0.10),
                10,
                Outcome::Profit,
                Style::Sentiment,
            ),
            trade("T2", "DOGE", dec!(0.11), 0, Outcome::Loss, Style::Sentiment),
            trade(
                "T3",
                "DOGE",
                dec!(0.12),
                20,
                Outcome::Profit,
                Style::Sentiment,
            ),
            trade(
                "T4",
                "DOGE",
                dec!(0.13),
                5,
                Outcome::Neutral,
                Style::Sentiment,
            ),
        ];

        let plan = RetrievalPlan {
            predicates: vec![],
            limit: Some(2),
        };
        let ids: Vec<_> = retrieve(&trades, &plan)
            .iter()
            .map(|t| t.id.as_str())
            .collect();
        assert_eq!(ids, ["T1", "T3"]);

        let plan = RetrievalPlan {
            predicates: vec![],
            limit: Some(1),
        };
        assert_eq!(retrieve(&trades, &plan)[0].id, "T3");
    }

    #[test]
    fn test_retrieve_timestamp_tie_prefers_later_row() {
        let trades = vec![
            trade("T1", "BTC", dec!(1), 3, Outcome::Profit, Style::Technical),
            trade("T2", "BTC", dec!(2), 3, Outcome::Profit, Style::Technical),
            trade("T3", "BTC", dec!(3), 1, Outcome::Profit, Style::Technical),
        ];
        let plan = RetrievalPlan {
            predicates: vec![],
            limit: Some(1),
        };
        assert_eq!(retrieve(&trades, &plan)[0].id, "T2");
    }

    #[test]
    fn test_retrieve_defaults_to_five_most_recent() {
        let trades: Vec<Trade> = (0..8)
            .map(|day| {
                trade(
                    &format!("T{}", day),
                    "ETH",
                    dec!(2500),
                    7 - day,
                    Outcome::Profit,
                    Style::Value,
                )
            })
            .collect();

        let plan = RetrievalPlan {
            predicates: vec![],
            limit: None,
        };
        let ids: Vec<_> = retrieve(&trades, &plan)
            .iter()
            .map(|t| t.id.as_str())
            .collect();
        assert_eq!(ids.len(), DEFAULT_LIMIT);
        assert_eq!(ids, ["T0", "T1", "T2", "T3", "T4"]);
    }

    #[test]
    fn test_count_profitable() {
        let trades = sample();
        let result = aggregate(
            &trades,
            &count_plan(
                vec![pred(
                    Field::Outcome,
                    Condition::Equals(Scalar::Outcome(Outcome::Profit)),
                )],
                None,
            ),
        );
        assert_eq!(
            result.groups[ALL_GROUP],
            GroupValue {
                count: 2,
                value: Some(dec!(2))
            }
        );
    }

    #[test]
    fn test_group_by_sorted_keys() {
        let trades = sample();
        let result = aggregate(&trades, &count_plan(vec![], Some(Field::Asset)));
        let keys: Vec<_> = result.groups.keys().cloned().collect();
        assert_eq!(keys, ["BTC", "DOGE", "ETH"]);
        assert_eq!(result.groups["BTC"].count, 2);
    }

    #[test]
    fn test_empty_ungrouped_aggregate() {
        let result = aggregate(
            &[],
            &AggregationPlan {
                predicates: vec![],
                group_by: None,
                function: AggregateFn::Average,
                field: Some(Field::Price),
                rank: None,
            },
        );
        assert_eq!(
            result.groups[ALL_GROUP],
            GroupValue {
                count: 0,
                value: None
            }
        );
        assert!(result.is_empty());

        let counted = aggregate(&[], &count_plan(vec![], None));
        assert_eq!(counted.groups[ALL_GROUP].value, Some(Decimal::ZERO));
    }

    #[test]
    fn test_sum_average_min_max() {
        let trades = sample();
        let eth = vec![pred(
            Field::Asset,
            Condition::Equals(Scalar::Text("ETH".into())),
        )];
        let run = |function| {
            aggregate(
                &trades,
                &AggregationPlan {
                    predicates: eth.clone(),
                    group_by: None,
                    function,
                    field: Some(Field::Price),
                    rank: None,
                },
            )
            .groups[ALL_GROUP]
                .value
        };

        assert_eq!(run(AggregateFn::Sum), Some(dec!(5100)));
        assert_eq!(run(AggregateFn::Average), Some(dec!(2550)));
        assert_eq!(run(AggregateFn::Min), Some(dec!(2500)));
        assert_eq!(run(AggregateFn::Max), Some(dec!(2600)));
    }

    #[test]
    fn test_rank_most_and_designated_group() {
        let trades = sample();
        let result = aggregate(
            &trades,
            &AggregationPlan {
                predicates: vec![],
                group_by: Some(Field::Asset),
                function: AggregateFn::Sum,
                field: Some(Field::Pnl),
                rank: Some(Rank {
                    direction: RankDirection::Most,
                    by: Field::Pnl,
                }),
            },
        );

        assert_eq!(result.ranked.as_ref().map(|t| t.id.as_str()), Some("T1"));
        // BTC: 42000 - 43000, DOGE: 0.15, ETH: -2500
        assert_eq!(result.designated_group.as_deref(), Some("DOGE"));
    }

    #[test]
    fn test_rank_ties_prefer_earliest() {
        let mut trades = sample();
        trades.push(trade(
            "T0",
            "BTC",
            dec!(43000),
            -5,
            Outcome::Loss,
            Style::Value,
        ));
        let result = aggregate(
            &trades,
            &AggregationPlan {
                predicates: vec![],
                group_by: None,
                function: AggregateFn::Max,
                field: Some(Field::Price),
                rank: Some(Rank {
                    direction: RankDirection::Most,
                    by: Field::Price,
                }),
            },
        );
        assert_eq!(result.ranked.unwrap().id, "T0");
        assert_eq!(result.designated_group, None);
    }

    #[test]
    fn test_designated_group_tie_takes_smallest_key() {
        let trades = vec![
            trade("T1", "SOL", dec!(10), 0, Outcome::Profit, Style::Technical),
            trade("T2", "ETH", dec!(100), 1, Outcome::Profit, Style::Technical),
            trade("T3", "BTC", dec!(100), 2, Outcome::Profit, Style::Technical),
            trade("T4", "DOGE", dec!(10), 3, Outcome::Profit, Style::Technical),
        ];
        let run = |direction| {
            aggregate(
                &trades,
                &AggregationPlan {
                    predicates: vec![],
                    group_by: Some(Field::Asset),
                    function: AggregateFn::Sum,
                    field: Some(Field::Price),
                    rank: Some(Rank {
                        direction,
                        by: Field::Price,
                    }),
                },
            )
            .designated_group
        };

        assert_eq!(run(RankDirection::Most).as_deref(), Some("BTC"));
        assert_eq!(run(RankDirection::Least).as_deref(), Some("DOGE"));
    }

    #[test]
    fn test_overflowing_aggregate_reports_no_value() {
        let huge = dec!(50000000000000000000000000000);
        let trades = vec![
            trade("T1", "BTC", huge, 0, Outcome::Profit, Style::Technical),
            trade("T2", "BTC", huge, 1, Outcome::Profit, Style::Technical),
        ];
        let run = |function, field| {
            aggregate(
                &trades,
                &AggregationPlan {
                    predicates: vec![],
                    group_by: None,
                    function,
                    field: Some(field),
                    rank: None,
                },
            )
            .groups[ALL_GROUP]
                .clone()
        };

        assert_eq!(
            run(AggregateFn::Sum, Field::Price),
            GroupValue {
                count: 2,
                value: None
            }
        );
        assert_eq!(run(AggregateFn::Average, Field::Price).value, None);
        assert_eq!(run(AggregateFn::Max, Field::Price).value, Some(huge));
        assert_eq!(run(AggregateFn::Count, Field::Price).value, Some(dec!(2)));
    }

    #[test]
    fn test_overflowing_notional_is_skipped() {
        let mut big = trade(
            "T1",
            "BTC",
            dec!(50000000000000000000000000000),
            0,
            Outcome::Loss,
            Style::Value,
        );
        big.volume = dec!(2);
        let trades = vec![
            big,
            trade("T2", "ETH", dec!(2500), 1, Outcome::Profit, Style::Value),
        ];

        let result = aggregate(
            &trades,
            &AggregationPlan {
                predicates: vec![],
                group_by: None,
                function: AggregateFn::Min,
                field: Some(Field::Pnl),
                rank: Some(Rank {
                    direction: RankDirection::Least,
                    by: Field::Notional,
                }),
            },
        );
        assert_eq!(result.groups[ALL_GROUP].value, Some(dec!(2500)));
        assert_eq!(result.ranked.map(|t| t.id), Some("T2".to_string()));
    }

    #[test]
    fn test_execute_reports_empty() {
        let trades = sample();
        let plan = QueryPlan::Retrieval(RetrievalPlan {
            predicates: vec![pred(
                Field::Asset,
                Condition::Equals(Scalar::Text("SOL".into())),
            )],
            limit: None,
        });
        let result = execute(&trades, &plan);
        assert!(result.is_empty());
        assert_eq!(serde_json::to_value(&result).unwrap()["kind"], "retrieval");
    }

    // ------------------------------------------------------------------------
    // Properties
    // ------------------------------------------------------------------------

    fn arb_trades() -> impl Strategy<Value = Vec<Trade>> {
        let row = (
            prop::sample::select(vec!["BTC", "ETH", "DOGE", "SOL"]),
            1i64..10_000_000,
            0i64..60,
            prop::sample::select(Outcome::ALL.to_vec()),
            prop::sample::select(Style::ALL.to_vec()),
        );
        prop::collection::vec(row, 0..40).prop_map(|rows| {
            rows.into_iter()
                .enumerate()
                .map(|(i, (asset, cents, day, outcome, style))| {
                    trade(
                        &format!("T{}", i),
                        asset,
                        Decimal::new(cents, 2),
                        day,
                        outcome,
                        style,
                    )
                })
                .collect()
        })
    }

    proptest! {
        #[test]
        fn prop_filter_is_ordered_subsequence(
            trades in arb_trades(),
            asset in prop::sample::select(vec!["BTC", "ETH", "DOGE", "SOL"]),
            threshold in 0i64..10_000_000,
        ) {
            let predicates = vec![
                pred(Field::Asset, Condition::Equals(Scalar::Text(asset.into()))),
                pred(Field::Price, Condition::GreaterThan(Scalar::Number(Decimal::new(threshold, 2)))),
            ];
            let rows = filter(&trades, &predicates);

            for row in &rows {
                prop_assert!(predicates.iter().all(|p| p.matches(row)));
            }

            let positions: Vec<usize> = rows
                .iter()
                .map(|r| trades.iter().position(|t| t.id == r.id).unwrap())
                .collect();
            prop_assert!(positions.windows(2).all(|w| w[0] < w[1]));

            let expected = trades.iter().filter(|t| predicates.iter().all(|p| p.matches(t))).count();
            prop_assert_eq!(rows.len(), expected);
        }

        #[test]
        fn prop_rank_matches_full_scan(trades in arb_trades()) {
            let plan = AggregationPlan {
                predicates: vec![],
                group_by: None,
                function: AggregateFn::Max,
                field: Some(Field::Price),
                rank: Some(Rank { direction: RankDirection::Most, by: Field::Price }),
            };
            let first = aggregate(&trades, &plan);
            let second = aggregate(&trades, &plan);
            prop_assert_eq!(&first, &second);

            match trades.iter().map(|t| t.price).max() {
                Some(max) => {
                    let ranked = first.ranked.unwrap();
                    prop_assert_eq!(ranked.price, max);
                    let earliest = trades.iter().filter(|t| t.price == max).map(|t| t.timestamp).min();
                    prop_assert_eq!(Some(ranked.timestamp), earliest);
                }
                None => prop_assert!(first.ranked.is_none()),
            }
        }

        #[test]
        fn prop_group_counts_cover_matches(trades in arb_trades()) {
            let result = aggregate(&trades, &count_plan(vec![], Some(Field::Style)));
            let total: usize = result.groups.values().map(|g| g.count).sum();
            prop_assert_eq!(total, trades.len());
            prop_assert_eq!(result.matched, trades.len());
        }
    }
}
