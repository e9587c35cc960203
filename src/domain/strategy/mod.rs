//! Investment strategies.
//!
//! Every strategy exposes the same three capabilities, called by
//! [`crate::domain::engine::StrategyEngine`] in a fixed order:
//! - `callback_before_investment`: adjust the current portfolio (cash injections)
//! - `perform_investment_strategy`: build the next portfolio
//! - `callback_after_investment`: adjust the validated portfolio (fees)
//!
//! Concrete variants:
//! - [`DecisionAllocator`]: follows a model's recorded decisions
//! - [`VolumeWeighted`]: contrarian heuristic weighted by traded volume
//! - [`RandomBaseline`]: seeded random bets

pub mod decision_allocator;
pub mod random_baseline;
pub mod volume_weighted;

pub use decision_allocator::DecisionAllocator;
pub use random_baseline::RandomBaseline;
pub use volume_weighted::VolumeWeighted;

use chrono::{DateTime, NaiveDate, Utc};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use super::decision::ModelInvestmentDecisions;
use super::error::BetbenchError;
use super::execution::{self, ExecutionConfig};
use super::market::{MarketSnapshot, PriceBook};
use super::portfolio::Portfolio;

/// Everything a strategy may look at for one decision point.
#[derive(Debug, Clone)]
pub struct MarketContext<'a> {
    pub date: NaiveDate,
    pub prices: &'a PriceBook,
    pub markets: Vec<MarketSnapshot>,
    pub decision: Option<&'a ModelInvestmentDecisions>,
    /// Final YES price of markets that have settled by `date`.
    pub resolutions: BTreeMap<String, f64>,
}

impl<'a> MarketContext<'a> {
    pub fn new(date: NaiveDate, prices: &'a PriceBook) -> Self {
        MarketContext {
            date,
            prices,
            markets: Vec::new(),
            decision: None,
            resolutions: BTreeMap::new(),
        }
    }

    pub fn with_decision(mut self, decision: &'a ModelInvestmentDecisions) -> Self {
        self.decision = Some(decision);
        self
    }

    pub fn with_markets(mut self, markets: Vec<MarketSnapshot>) -> Self {
        self.markets = markets;
        self
    }

    pub fn with_resolutions(mut self, resolutions: BTreeMap<String, f64>) -> Self {
        self.resolutions = resolutions;
        self
    }

    pub fn price(&self, market_id: &str) -> Result<f64, BetbenchError> {
        self.prices.price_at(market_id, self.date)
    }
}

pub trait InvestmentStrategy {
    fn name(&self) -> &str;

    /// Runs against the pre-transition portfolio. Default: no change.
    fn callback_before_investment(
        &mut self,
        _as_of: DateTime<Utc>,
        portfolio: &Portfolio,
    ) -> Result<Portfolio, BetbenchError> {
        Ok(portfolio.clone())
    }

    /// Build the next portfolio. Must not change total value.
    fn perform_investment_strategy(
        &mut self,
        as_of: DateTime<Utc>,
        portfolio: &Portfolio,
        context: &MarketContext<'_>,
    ) -> Result<Portfolio, BetbenchError>;

    /// Runs against the validated candidate. Default: no change.
    fn callback_after_investment(
        &mut self,
        _as_of: DateTime<Utc>,
        _previous: &Portfolio,
        candidate: Portfolio,
    ) -> Result<Portfolio, BetbenchError> {
        Ok(candidate)
    }
}

/// Add the configured allowance to cash.
pub fn inject_allowance(config: &ExecutionConfig, portfolio: &Portfolio) -> Portfolio {
    let mut next = portfolio.clone();
    if config.allowance_per_step > 0.0 {
        next.unallocated_cash += config.allowance_per_step;
    }
    next
}

/// Charge the configured fee on notional opened between `previous` and `candidate`.
pub fn deduct_fees(config: &ExecutionConfig, previous: &Portfolio, candidate: Portfolio) -> Portfolio {
    if config.fee_pct <= 0.0 {
        return candidate;
    }
    let mut next = candidate;
    let fee = execution::calculate_fee(execution::opened_notional(previous, &next), config);
    execution::charge_fee(&mut next, fee);
    next
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StrategyKind {
    Decisions,
    VolumeWeighted,
    Random,
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StrategyKind::Decisions => write!(f, "decisions"),
            StrategyKind::VolumeWeighted => write!(f, "volume"),
            StrategyKind::Random => write!(f, "random"),
        }
    }
}

impl FromStr for StrategyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "decisions" => Ok(StrategyKind::Decisions),
            "volume" | "volume_weighted" => Ok(StrategyKind::VolumeWeighted),
            "random" => Ok(StrategyKind::Random),
            other => Err(format!("unknown strategy: {other}")),
        }
    }
}

/// One of the concrete strategies, dispatched by tag.
#[derive(Debug, Clone)]
pub enum AnyStrategy {
    Decisions(DecisionAllocator),
    VolumeWeighted(VolumeWeighted),
    Random(RandomBaseline),
}

impl AnyStrategy {
    fn inner(&mut self) -> &mut dyn InvestmentStrategy {
        match self {
            AnyStrategy::Decisions(s) => s,
            AnyStrategy::VolumeWeighted(s) => s,
            AnyStrategy::Random(s) => s,
        }
    }
}

impl InvestmentStrategy for AnyStrategy {
    fn name(&self) -> &str {
        match self {
            AnyStrategy::Decisions(s) => s.name(),
            AnyStrategy::VolumeWeighted(s) => s.name(),
            AnyStrategy::Random(s) => s.name(),
        }
    }

    fn callback_before_investment(
        &mut self,
        as_of: DateTime<Utc>,
        portfolio: &Portfolio,
    ) -> Result<Portfolio, BetbenchError> {
        self.inner().callback_before_investment(as_of, portfolio)
    }

    fn perform_investment_strategy(
        &mut self,
        as_of: DateTime<Utc>,
        portfolio: &Portfolio,
        context: &MarketContext<'_>,
    ) -> Result<Portfolio, BetbenchError> {
        self.inner()
            .perform_investment_strategy(as_of, portfolio, context)
    }

    fn callback_after_investment(
        &mut self,
        as_of: DateTime<Utc>,
        previous: &Portfolio,
        candidate: Portfolio,
    ) -> Result<Portfolio, BetbenchError> {
        self.inner()
            .callback_after_investment(as_of, previous, candidate)
    }
}
