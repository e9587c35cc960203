//! Normalized decision records produced by a model for one decision point.
//!
//! Records are validated at ingestion, before any portfolio sees them:
//! odds within `[0, 1]`, bets within `[-1, 1]`, and for every event the
//! unallocated capital plus the absolute bets must add up to one.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::error::BetbenchError;

pub const CAPITAL_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SingleModelDecision {
    pub rationale: String,
    pub odds: f64,
    pub bet: f64,
}

impl SingleModelDecision {
    pub fn validate(&self) -> Result<(), BetbenchError> {
        if !self.odds.is_finite() || !(0.0..=1.0).contains(&self.odds) {
            return Err(BetbenchError::schema(format!(
                "odds {} outside [0, 1]",
                self.odds
            )));
        }
        if !self.bet.is_finite() || !(-1.0..=1.0).contains(&self.bet) {
            return Err(BetbenchError::schema(format!(
                "bet {} outside [-1, 1]",
                self.bet
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketInvestmentDecision {
    pub market_id: String,
    pub model_decision: SingleModelDecision,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub market_question: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventInvestmentDecisions {
    pub event_id: String,
    pub event_title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_description: Option<String>,
    pub market_investment_decisions: Vec<MarketInvestmentDecision>,
    pub unallocated_capital: f64,
}

impl EventInvestmentDecisions {
    /// Build an event whose unallocated capital is whatever the bets leave over.
    pub fn with_withheld_capital(
        event_id: impl Into<String>,
        event_title: impl Into<String>,
        market_investment_decisions: Vec<MarketInvestmentDecision>,
    ) -> Self {
        let deployed: f64 = market_investment_decisions
            .iter()
            .map(|m| m.model_decision.bet.abs())
            .sum();
        EventInvestmentDecisions {
            event_id: event_id.into(),
            event_title: event_title.into(),
            event_description: None,
            market_investment_decisions,
            unallocated_capital: (1.0 - deployed).max(0.0),
        }
    }

    pub fn deployed_capital(&self) -> f64 {
        self.market_investment_decisions
            .iter()
            .map(|m| m.model_decision.bet.abs())
            .sum()
    }

    pub fn validate(&self) -> Result<(), BetbenchError> {
        if self.event_id.trim().is_empty() {
            return Err(BetbenchError::schema("event_id is empty"));
        }
        for market in &self.market_investment_decisions {
            if market.market_id.trim().is_empty() {
                return Err(BetbenchError::schema(format!(
                    "event {}: market_id is empty",
                    self.event_id
                )));
            }
            market.model_decision.validate().map_err(|e| {
                BetbenchError::schema(format!(
                    "event {} market {}: {}",
                    self.event_id, market.market_id, e
                ))
            })?;
        }
        if !self.unallocated_capital.is_finite() || self.unallocated_capital < 0.0 {
            return Err(BetbenchError::schema(format!(
                "event {}: unallocated_capital {} must be non-negative",
                self.event_id, self.unallocated_capital
            )));
        }
        let total = self.unallocated_capital + self.deployed_capital();
        if (total - 1.0).abs() > CAPITAL_TOLERANCE {
            return Err(BetbenchError::schema(format!(
                "event {}: unallocated {} + sum |bet| {} = {}, expected 1",
                self.event_id,
                self.unallocated_capital,
                self.deployed_capital(),
                total
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub model_id: String,
    pub pretty_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
}

impl ModelInfo {
    pub fn new(model_id: impl Into<String>, pretty_name: impl Into<String>) -> Self {
        ModelInfo {
            model_id: model_id.into(),
            pretty_name: pretty_name.into(),
            provider: None,
        }
    }
}

/// Everything one model decided at one decision point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInvestmentDecisions {
    pub model_id: String,
    pub model_info: ModelInfo,
    pub target_date: NaiveDate,
    pub decision_datetime: DateTime<Utc>,
    pub event_investment_decisions: Vec<EventInvestmentDecisions>,
}

impl ModelInvestmentDecisions {
    pub fn validate(&self) -> Result<(), BetbenchError> {
        if self.model_id.trim().is_empty() {
            return Err(BetbenchError::schema("model_id is empty"));
        }
        for event in &self.event_investment_decisions {
            event.validate().map_err(|e| {
                BetbenchError::schema(format!(
                    "model {} on {}: {}",
                    self.model_id, self.target_date, e
                ))
            })?;
        }
        Ok(())
    }

    /// Every market this record bets on, in record order.
    pub fn market_ids(&self) -> impl Iterator<Item = &str> {
        self.event_investment_decisions.iter().flat_map(|e| {
            e.market_investment_decisions
                .iter()
                .map(|m| m.market_id.as_str())
        })
    }

    fn recency_key(&self) -> (NaiveDate, DateTime<Utc>) {
        (self.target_date, self.decision_datetime)
    }
}

/// Keep one record per `(model_id, target_date)`: the one decided last.
///
/// Output is sorted by model id, then target date.
pub fn select_latest_per_target_date(
    records: &[ModelInvestmentDecisions],
) -> Vec<ModelInvestmentDecisions> {
    let mut latest: BTreeMap<(&str, NaiveDate), &ModelInvestmentDecisions> = BTreeMap::new();
    for record in records {
        let key = (record.model_id.as_str(), record.target_date);
        match latest.get(&key) {
            Some(kept) if kept.decision_datetime >= record.decision_datetime => {}
            _ => {
                latest.insert(key, record);
            }
        }
    }
    latest.into_values().cloned().collect()
}

/// Per event, the decision from the most recent record of `model_id`.
///
/// Recency is `target_date` first, `decision_datetime` second.
pub fn latest_event_decisions<'a>(
    records: &'a [ModelInvestmentDecisions],
    model_id: &str,
) -> BTreeMap<&'a str, (&'a ModelInvestmentDecisions, &'a EventInvestmentDecisions)> {
    let mut latest: BTreeMap<&str, (&ModelInvestmentDecisions, &EventInvestmentDecisions)> =
        BTreeMap::new();
    for record in records.iter().filter(|r| r.model_id == model_id) {
        for event in &record.event_investment_decisions {
            match latest.get(event.event_id.as_str()) {
                Some((kept, _)) if kept.recency_key() >= record.recency_key() => {}
                _ => {
                    latest.insert(event.event_id.as_str(), (record, event));
                }
            }
        }
    }
    latest
}
