//! Allocation driven by a model's recorded investment decisions.

use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use tracing::{debug, warn};

use super::{InvestmentStrategy, MarketContext, deduct_fees, inject_allowance};
use crate::domain::error::BetbenchError;
use crate::domain::execution::{self, EntryResult, ExecutionConfig};
use crate::domain::portfolio::Portfolio;
use crate::domain::position::Outcome;

/// Follows the decision record in the market context.
///
/// On each step, settled positions are redeemed and positions in events the
/// record re-decides are sold. Cash is then split equally across the
/// record's events, and each event buys `|bet|` of its share per market;
/// the event's unallocated fraction stays in cash. Events the record does
/// not mention keep their positions.
#[derive(Debug, Clone, Default)]
pub struct DecisionAllocator {
    config: ExecutionConfig,
}

impl DecisionAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_execution(config: ExecutionConfig) -> Self {
        DecisionAllocator { config }
    }
}

impl InvestmentStrategy for DecisionAllocator {
    fn name(&self) -> &str {
        "decisions"
    }

    fn callback_before_investment(
        &mut self,
        _as_of: DateTime<Utc>,
        portfolio: &Portfolio,
    ) -> Result<Portfolio, BetbenchError> {
        Ok(inject_allowance(&self.config, portfolio))
    }

    fn perform_investment_strategy(
        &mut self,
        as_of: DateTime<Utc>,
        portfolio: &Portfolio,
        context: &MarketContext<'_>,
    ) -> Result<Portfolio, BetbenchError> {
        let mut next = portfolio.clone();
        execution::apply_resolutions(&mut next, &context.resolutions);
        execution::redeem_resolved(&mut next);

        let Some(decision) = context.decision else {
            return Ok(next);
        };
        if decision.event_investment_decisions.is_empty() {
            return Ok(next);
        }

        let redecided: BTreeSet<&str> = decision
            .event_investment_decisions
            .iter()
            .map(|e| e.event_id.as_str())
            .collect();
        execution::exit_positions(&mut next, context.prices, context.date, |p| {
            redecided.contains(p.event_id.as_str())
        })?;

        let event_capital =
            next.unallocated_cash / decision.event_investment_decisions.len() as f64;

        for event in &decision.event_investment_decisions {
            for market in &event.market_investment_decisions {
                let bet = market.model_decision.bet;
                if bet == 0.0 {
                    continue;
                }
                let yes_price = context.price(&market.market_id)?;
                let result = execution::enter_position(
                    &mut next,
                    &event.event_id,
                    &market.market_id,
                    Outcome::from_bet(bet),
                    yes_price,
                    self.config.net_of_fee(bet.abs() * event_capital),
                    as_of,
                )?;
                match result {
                    EntryResult::Entered { shares, .. } => {
                        debug!(model = %decision.model_id, market = %market.market_id, shares, "bet placed");
                    }
                    EntryResult::Skipped(reason) => {
                        warn!(
                            model = %decision.model_id,
                            market = %market.market_id,
                            yes_price,
                            ?reason,
                            "bet skipped, capital kept as cash"
                        );
                    }
                }
            }
        }

        Ok(next)
    }

    fn callback_after_investment(
        &mut self,
        _as_of: DateTime<Utc>,
        previous: &Portfolio,
        candidate: Portfolio,
    ) -> Result<Portfolio, BetbenchError> {
        Ok(deduct_fees(&self.config, previous, candidate))
    }
}
