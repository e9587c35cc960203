//! Contrarian heuristic weighted by traded volume.

use chrono::{DateTime, Utc};
use tracing::debug;

use super::{InvestmentStrategy, MarketContext, deduct_fees, inject_allowance};
use crate::domain::error::BetbenchError;
use crate::domain::execution::{self, ExecutionConfig};
use crate::domain::market::MarketSnapshot;
use crate::domain::portfolio::Portfolio;
use crate::domain::position::Outcome;

/// Rebuilds the whole book each step: the `max_markets` most traded markets
/// share `invest_fraction` of portfolio cash in proportion to volume. Markets
/// priced below 0.5 get YES, the rest NO.
#[derive(Debug, Clone)]
pub struct VolumeWeighted {
    invest_fraction: f64,
    max_markets: usize,
    config: ExecutionConfig,
}

impl VolumeWeighted {
    pub fn new(invest_fraction: f64, max_markets: usize) -> Self {
        VolumeWeighted {
            invest_fraction: invest_fraction.clamp(0.0, 1.0),
            max_markets,
            config: ExecutionConfig::default(),
        }
    }

    pub fn with_execution(mut self, config: ExecutionConfig) -> Self {
        self.config = config;
        self
    }

    fn pick<'m>(&self, markets: &'m [MarketSnapshot], context: &MarketContext<'_>) -> Vec<(&'m MarketSnapshot, f64)> {
        let mut ranked: Vec<(&MarketSnapshot, f64)> = markets
            .iter()
            .filter(|m| m.volume.is_finite() && m.volume > 0.0)
            .filter_map(|m| {
                context
                    .price(&m.market_id)
                    .ok()
                    .filter(|p| *p > 0.0 && *p < 1.0)
                    .map(|p| (m, p))
            })
            .collect();
        ranked.sort_by(|a, b| {
            b.0.volume
                .total_cmp(&a.0.volume)
                .then_with(|| a.0.market_id.cmp(&b.0.market_id))
        });
        ranked.truncate(self.max_markets);
        ranked
    }
}

impl InvestmentStrategy for VolumeWeighted {
    fn name(&self) -> &str {
        "volume"
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

        let picks = self.pick(&context.markets, context);
        let total_volume: f64 = picks.iter().map(|(m, _)| m.volume).sum();
        if picks.is_empty() || total_volume <= 0.0 {
            return Ok(next);
        }

        let budget = next.unallocated_cash * self.invest_fraction;
        for (market, yes_price) in picks {
            let outcome = if yes_price < 0.5 { Outcome::Yes } else { Outcome::No };
            execution::enter_position(
                &mut next,
                &market.event_id,
                &market.market_id,
                outcome,
                yes_price,
                self.config.net_of_fee(budget * market.volume / total_volume),
                as_of,
            )?;
        }
        debug!(positions = next.position_count(), "volume-weighted book rebuilt");

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
