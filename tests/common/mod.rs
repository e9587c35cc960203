#![allow(dead_code)]

use betbench::domain::decision::{
    EventInvestmentDecisions, MarketInvestmentDecision, ModelInfo, ModelInvestmentDecisions,
    SingleModelDecision,
};
use betbench::domain::error::BetbenchError;
use betbench::domain::market::MarketSeries;
use betbench::domain::series::DataPointSeries;
use betbench::ports::data_port::MarketDataPort;
use betbench::ports::decision_port::DecisionPort;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use std::collections::BTreeMap;

pub struct MockDataPort {
    pub data: BTreeMap<String, MarketSeries>,
    pub errors: BTreeMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: BTreeMap::new(),
            errors: BTreeMap::new(),
        }
    }

    pub fn with_prices(mut self, market_id: &str, prices: &[(&str, f64)]) -> Self {
        self.data
            .insert(market_id.to_string(), market_series(market_id, prices));
        self
    }

    pub fn with_series(mut self, series: MarketSeries) -> Self {
        self.data.insert(series.market_id.clone(), series);
        self
    }

    pub fn with_error(mut self, market_id: &str, reason: &str) -> Self {
        self.errors
            .insert(market_id.to_string(), reason.to_string());
        self
    }
}

impl MarketDataPort for MockDataPort {
    fn fetch_prices(&self, market_id: &str) -> Result<MarketSeries, BetbenchError> {
        if let Some(reason) = self.errors.get(market_id) {
            return Err(BetbenchError::data(reason.clone()));
        }
        self.data
            .get(market_id)
            .cloned()
            .ok_or_else(|| BetbenchError::data(format!("no data for {market_id}")))
    }

    fn list_markets(&self) -> Result<Vec<String>, BetbenchError> {
        Ok(self.data.keys().cloned().collect())
    }
}

pub struct MockDecisionPort {
    pub records: Vec<ModelInvestmentDecisions>,
}

impl DecisionPort for MockDecisionPort {
    fn load_decisions(&self) -> Result<Vec<ModelInvestmentDecisions>, BetbenchError> {
        Ok(self.records.clone())
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn at(y: i32, m: u32, d: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, hour, 0, 0).unwrap()
}

pub fn series(points: &[(&str, f64)]) -> DataPointSeries {
    DataPointSeries::from_iso_pairs(points).unwrap()
}

pub fn market_series(market_id: &str, prices: &[(&str, f64)]) -> MarketSeries {
    MarketSeries {
        market_id: market_id.to_string(),
        prices: series(prices),
        volumes: None,
    }
}

pub fn bet(market_id: &str, odds: f64, bet: f64) -> MarketInvestmentDecision {
    MarketInvestmentDecision {
        market_id: market_id.to_string(),
        model_decision: SingleModelDecision {
            rationale: format!("bet {bet} on {market_id}"),
            odds,
            bet,
        },
        market_question: None,
    }
}

/// Event whose unallocated capital balances its bets.
pub fn event(event_id: &str, bets: Vec<MarketInvestmentDecision>) -> EventInvestmentDecisions {
    EventInvestmentDecisions::with_withheld_capital(event_id, format!("Event {event_id}"), bets)
}

pub fn decision(
    model_id: &str,
    target: NaiveDate,
    events: Vec<EventInvestmentDecisions>,
) -> ModelInvestmentDecisions {
    ModelInvestmentDecisions {
        model_id: model_id.to_string(),
        model_info: ModelInfo::new(model_id, format!("{model_id} (pretty)")),
        target_date: target,
        decision_datetime: target.and_hms_opt(9, 0, 0).unwrap().and_utc(),
        event_investment_decisions: events,
    }
}
