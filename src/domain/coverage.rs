//! Price coverage check for the markets a set of decisions references.
//!
//! A gap does not stop a run; valuation reports the affected model later.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

use super::decision::ModelInvestmentDecisions;
use super::market::MarketSeries;
use crate::ports::data_port::MarketDataPort;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GapReason {
    /// The data source failed or returned nothing for the market.
    NoData { message: String },
    /// The first price comes after the first decision that needs it.
    StartsLate { first_needed: NaiveDate, first_price: NaiveDate },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageGap {
    pub market_id: String,
    pub reason: GapReason,
}

pub struct CoverageReport {
    pub series: Vec<MarketSeries>,
    pub gaps: Vec<CoverageGap>,
}

impl CoverageReport {
    pub fn is_complete(&self) -> bool {
        self.gaps.is_empty()
    }
}

/// Earliest target date on which each referenced market is needed.
pub fn first_needed_dates(records: &[ModelInvestmentDecisions]) -> BTreeMap<String, NaiveDate> {
    let mut needed: BTreeMap<String, NaiveDate> = BTreeMap::new();
    for record in records {
        for market_id in record.market_ids() {
            needed
                .entry(market_id.to_string())
                .and_modify(|d| *d = (*d).min(record.target_date))
                .or_insert(record.target_date);
        }
    }
    needed
}

/// Fetch every market the records bet on and report the ones that cannot
/// be priced from their first decision onward.
pub fn check_coverage(
    records: &[ModelInvestmentDecisions],
    data_port: &dyn MarketDataPort,
) -> CoverageReport {
    let mut series = Vec::new();
    let mut gaps = Vec::new();

    for (market_id, first_needed) in first_needed_dates(records) {
        let fetched = match data_port.fetch_prices(&market_id) {
            Ok(s) => s,
            Err(e) => {
                warn!(market = %market_id, error = %e, "no price data");
                gaps.push(CoverageGap {
                    market_id,
                    reason: GapReason::NoData {
                        message: e.to_string(),
                    },
                });
                continue;
            }
        };

        match fetched.prices.first() {
            None => {
                warn!(market = %market_id, "price series is empty");
                gaps.push(CoverageGap {
                    market_id,
                    reason: GapReason::NoData {
                        message: "empty series".to_string(),
                    },
                });
                continue;
            }
            Some(first) if first.date > first_needed => {
                warn!(
                    market = %market_id,
                    %first_needed,
                    first_price = %first.date,
                    "price series starts after first decision"
                );
                gaps.push(CoverageGap {
                    market_id: market_id.clone(),
                    reason: GapReason::StartsLate {
                        first_needed,
                        first_price: first.date,
                    },
                });
            }
            Some(_) => {
                debug!(market = %market_id, points = fetched.prices.len(), "coverage ok");
            }
        }
        series.push(fetched);
    }

    CoverageReport { series, gaps }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::decision::{
        EventInvestmentDecisions, MarketInvestmentDecision, ModelInfo, SingleModelDecision,
    };
    use crate::domain::error::BetbenchError;
    use crate::domain::series::DataPointSeries;
    use chrono::{TimeZone, Utc};

    struct Fixed(BTreeMap<String, DataPointSeries>);

    impl MarketDataPort for Fixed {
        fn fetch_prices(&self, market_id: &str) -> Result<MarketSeries, BetbenchError> {
            self.0
                .get(market_id)
                .map(|prices| MarketSeries {
                    market_id: market_id.to_string(),
                    prices: prices.clone(),
                    volumes: None,
                })
                .ok_or_else(|| BetbenchError::data(format!("unknown market {market_id}")))
        }

        fn list_markets(&self) -> Result<Vec<String>, BetbenchError> {
            Ok(self.0.keys().cloned().collect())
        }
    }

    fn record(day: u32, markets: &[&str]) -> ModelInvestmentDecisions {
        ModelInvestmentDecisions {
            model_id: "m".into(),
            model_info: ModelInfo::new("m", "M"),
            target_date: NaiveDate::from_ymd_opt(2025, 1, day).unwrap(),
            decision_datetime: Utc.with_ymd_and_hms(2025, 1, day, 9, 0, 0).unwrap(),
            event_investment_decisions: vec![EventInvestmentDecisions::with_withheld_capital(
                "e",
                "Event",
                markets
                    .iter()
                    .map(|id| MarketInvestmentDecision {
                        market_id: id.to_string(),
                        model_decision: SingleModelDecision {
                            rationale: String::new(),
                            odds: 0.5,
                            bet: 1.0 / markets.len() as f64,
                        },
                        market_question: None,
                    })
                    .collect(),
            )],
        }
    }

    fn port() -> Fixed {
        let mut map = BTreeMap::new();
        map.insert(
            "early".to_string(),
            DataPointSeries::from_iso_pairs(&[("2025-01-01", 0.5)]).unwrap(),
        );
        map.insert(
            "late".to_string(),
            DataPointSeries::from_iso_pairs(&[("2025-01-10", 0.5)]).unwrap(),
        );
        map.insert("empty".to_string(), DataPointSeries::default());
        Fixed(map)
    }

    #[test]
    fn first_needed_uses_earliest_target_date() {
        let needed = first_needed_dates(&[record(5, &["a"]), record(3, &["a", "b"])]);
        assert_eq!(needed["a"], NaiveDate::from_ymd_opt(2025, 1, 3).unwrap());
        assert_eq!(needed["b"], NaiveDate::from_ymd_opt(2025, 1, 3).unwrap());
    }

    #[test]
    fn fully_covered_markets_have_no_gaps() {
        let report = check_coverage(&[record(2, &["early"])], &port());
        assert!(report.is_complete());
        assert_eq!(report.series.len(), 1);
        assert_eq!(report.series[0].market_id, "early");
    }

    #[test]
    fn reports_missing_empty_and_late_markets() {
        let report = check_coverage(&[record(2, &["early", "late", "empty", "nowhere"])], &port());
        let ids: Vec<&str> = report.gaps.iter().map(|g| g.market_id.as_str()).collect();
        assert_eq!(ids, vec!["empty", "late", "nowhere"]);
        assert!(matches!(report.gaps[1].reason, GapReason::StartsLate { .. }));
        // late markets are still usable once their prices start
        let usable: Vec<&str> = report.series.iter().map(|s| s.market_id.as_str()).collect();
        assert_eq!(usable, vec!["early", "late"]);
    }
}
