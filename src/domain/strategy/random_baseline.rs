//! Seeded random baseline.

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::{InvestmentStrategy, MarketContext, deduct_fees, inject_allowance};
use crate::domain::error::BetbenchError;
use crate::domain::execution::{self, ExecutionConfig};
use crate::domain::portfolio::Portfolio;
use crate::domain::position::Outcome;

/// Draws a signed bet in `[-1, 1)` for every tradable market, then scales
/// the draws so their absolute values sum to `invest_fraction`.
#[derive(Debug, Clone)]
pub struct RandomBaseline {
    rng: StdRng,
    invest_fraction: f64,
    config: ExecutionConfig,
}

impl RandomBaseline {
    pub fn new(seed: u64, invest_fraction: f64) -> Self {
        RandomBaseline {
            rng: StdRng::seed_from_u64(seed),
            invest_fraction: invest_fraction.clamp(0.0, 1.0),
            config: ExecutionConfig::default(),
        }
    }

    pub fn with_execution(mut self, config: ExecutionConfig) -> Self {
        self.config = config;
        self
    }
}

impl InvestmentStrategy for RandomBaseline {
    fn name(&self) -> &str {
        "random"
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
        execution::exit_positions(&mut next, context.prices, context.date, |_| true)?;

        let mut draws = Vec::with_capacity(context.markets.len());
        for market in &context.markets {
            let yes_price = context.price(&market.market_id)?;
            let bet: f64 = self.rng.gen_range(-1.0..1.0);
            draws.push((market, yes_price, bet));
        }

        let total: f64 = draws.iter().map(|(_, _, b)| b.abs()).sum();
        if total <= 0.0 {
            return Ok(next);
        }

        let budget = next.unallocated_cash * self.invest_fraction;
        for (market, yes_price, bet) in draws {
            execution::enter_position(
                &mut next,
                &market.event_id,
                &market.market_id,
                Outcome::from_bet(bet),
                yes_price,
                self.config.net_of_fee(budget * bet.abs() / total),
                as_of,
            )?;
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
