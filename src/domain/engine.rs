//! Strategy engine: drives one strategy through its step lifecycle and owns
//! the resulting portfolio history.
//!
//! Each [`StrategyEngine::run`] walks
//! `Idle → PreInvest → Deciding → Validating → PostInvest → Committed`.
//! Nothing is appended unless every stage succeeds.

use chrono::{DateTime, Utc};
use tracing::{debug, error};

use super::error::BetbenchError;
use super::portfolio::{Portfolio, Snapshot};
use super::strategy::{InvestmentStrategy, MarketContext};

/// Relative tolerance of the conservation check.
pub const CONSERVATION_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Idle,
    PreInvest,
    Deciding,
    Validating,
    PostInvest,
    Committed,
}

#[derive(Debug)]
pub struct StrategyEngine<S> {
    strategy: S,
    history: Vec<Snapshot>,
    state: EngineState,
}

impl<S: InvestmentStrategy> StrategyEngine<S> {
    pub fn new(strategy: S, seed: Snapshot) -> Self {
        StrategyEngine {
            strategy,
            history: vec![seed],
            state: EngineState::Idle,
        }
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn history(&self) -> &[Snapshot] {
        &self.history
    }

    pub fn into_history(self) -> Vec<Snapshot> {
        self.history
    }

    pub fn current(&self) -> &Snapshot {
        // history always holds at least the seed
        &self.history[self.history.len() - 1]
    }

    /// Perform one decision step and append its portfolio.
    ///
    /// On error the history is unchanged and the engine is back in `Idle`.
    pub fn run(
        &mut self,
        as_of: DateTime<Utc>,
        context: &MarketContext<'_>,
    ) -> Result<&Snapshot, BetbenchError> {
        match self.step(as_of, context) {
            Ok((portfolio, injected)) => {
                let contributed = self.current().contributed + injected;
                self.history
                    .push(Snapshot::new(as_of, portfolio).with_contributed(contributed));
                self.state = EngineState::Committed;
                debug!(
                    strategy = self.strategy.name(),
                    %as_of,
                    steps = self.history.len() - 1,
                    "step committed"
                );
                Ok(self.current())
            }
            Err(e) => {
                self.state = EngineState::Idle;
                Err(e)
            }
        }
    }

    fn step(
        &mut self,
        as_of: DateTime<Utc>,
        context: &MarketContext<'_>,
    ) -> Result<(Portfolio, f64), BetbenchError> {
        self.state = EngineState::PreInvest;
        let current = self.current().portfolio.clone();
        let funded = self.strategy.callback_before_investment(as_of, &current)?;

        self.state = EngineState::Deciding;
        let candidate = self
            .strategy
            .perform_investment_strategy(as_of, &funded, context)?;

        self.state = EngineState::Validating;
        let candidate = Portfolio::new(candidate.open_positions, candidate.unallocated_cash)?;
        let held = current.value(context.prices, context.date)?;
        let before = funded.value(context.prices, context.date)?;
        let after = candidate.value(context.prices, context.date)?;
        if !conserves_value(before, after) {
            error!(
                strategy = self.strategy.name(),
                %as_of,
                before,
                after,
                "portfolio transition changed total value"
            );
            return Err(BetbenchError::InvalidPortfolioTransition { before, after });
        }

        self.state = EngineState::PostInvest;
        let settled = self
            .strategy
            .callback_after_investment(as_of, &funded, candidate)?;
        let settled = Portfolio::new(settled.open_positions, settled.unallocated_cash)?;
        Ok((settled, before - held))
    }
}

fn conserves_value(before: f64, after: f64) -> bool {
    before.is_finite()
        && after.is_finite()
        && (before - after).abs() <= CONSERVATION_TOLERANCE * before.abs().max(1.0)
}
