//! Fill simulation for binary-outcome shares.
//!
//! Entries convert cash into shares at the outcome price; exits and
//! redemptions turn shares back into cash at the current or settlement
//! price. None of these helpers change total portfolio value.

use chrono::{DateTime, NaiveDate, Utc};
use std::collections::BTreeMap;
use tracing::debug;

use super::error::BetbenchError;
use super::market::PriceBook;
use super::portfolio::Portfolio;
use super::position::{Outcome, Position};

/// Cash flows that surround each decision step.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ExecutionConfig {
    /// Cash injected before every step.
    pub allowance_per_step: f64,
    /// Percentage of newly opened notional charged after every step.
    pub fee_pct: f64,
}

impl ExecutionConfig {
    /// Notional that leaves room for its own fee inside `capital`:
    /// `capital / (1 + fee_pct / 100)`.
    pub fn net_of_fee(&self, capital: f64) -> f64 {
        capital / (1.0 + self.fee_pct.max(0.0) / 100.0)
    }
}

/// fee = notional * pct / 100
pub fn calculate_fee(notional: f64, config: &ExecutionConfig) -> f64 {
    notional * config.fee_pct / 100.0
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NoCapital,
    UnpricedOutcome,
}

/// Result of an entry attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum EntryResult {
    Entered {
        shares: f64,
        purchase_price: f64,
        cost: f64,
    },
    Skipped(SkipReason),
}

/// Buy `capital` worth of `outcome` shares at the market's YES price.
///
/// Capital is capped at the available cash. Outcome prices of zero or less
/// cannot be bought and leave the portfolio untouched.
pub fn enter_position(
    portfolio: &mut Portfolio,
    event_id: &str,
    market_id: &str,
    outcome: Outcome,
    yes_price: f64,
    capital: f64,
    as_of: DateTime<Utc>,
) -> Result<EntryResult, BetbenchError> {
    let cost = capital.min(portfolio.unallocated_cash);
    if !cost.is_finite() || cost <= 0.0 {
        return Ok(EntryResult::Skipped(SkipReason::NoCapital));
    }

    let purchase_price = outcome.price_from_yes(yes_price);
    if !purchase_price.is_finite() || purchase_price <= 0.0 || purchase_price > 1.0 {
        return Ok(EntryResult::Skipped(SkipReason::UnpricedOutcome));
    }

    let shares = cost / purchase_price;
    let position = Position::new(event_id, market_id, outcome, shares, purchase_price, as_of)?;

    portfolio.unallocated_cash -= cost;
    portfolio.open_positions.push(position);

    Ok(EntryResult::Entered {
        shares,
        purchase_price,
        cost,
    })
}

/// Result of closing a position.
#[derive(Debug, Clone, PartialEq)]
pub struct ExitResult {
    pub market_id: String,
    pub shares: f64,
    pub exit_price: f64,
    pub proceeds: f64,
    pub pnl: f64,
}

fn settle(portfolio: &mut Portfolio, position: &Position, exit_price: f64) -> ExitResult {
    let proceeds = position.shares * exit_price;
    portfolio.unallocated_cash += proceeds;
    ExitResult {
        market_id: position.market_id.clone(),
        shares: position.shares,
        exit_price,
        proceeds,
        pnl: proceeds - position.cost_basis(),
    }
}

/// Sell every position matching `predicate` at its price on `date`.
///
/// Resolved positions settle at their sell price. Prices are looked up
/// before anything is removed, so a missing price leaves the portfolio as it was.
pub fn exit_positions<F>(
    portfolio: &mut Portfolio,
    prices: &PriceBook,
    date: NaiveDate,
    predicate: F,
) -> Result<Vec<ExitResult>, BetbenchError>
where
    F: Fn(&Position) -> bool,
{
    let exit_prices = portfolio
        .open_positions
        .iter()
        .map(|p| {
            if !predicate(p) {
                return Ok(None);
            }
            match p.sell_price {
                Some(sell) => Ok(Some(sell)),
                None => Ok(Some(p.price_for(prices.price_at(&p.market_id, date)?))),
            }
        })
        .collect::<Result<Vec<_>, BetbenchError>>()?;

    let positions = std::mem::take(&mut portfolio.open_positions);
    let mut results = Vec::new();
    for (position, exit_price) in positions.into_iter().zip(exit_prices) {
        match exit_price {
            Some(price) => {
                let result = settle(portfolio, &position, price);
                debug!(market = %result.market_id, pnl = result.pnl, "position exited");
                results.push(result);
            }
            None => portfolio.open_positions.push(position),
        }
    }
    Ok(results)
}

/// Turn every resolved position into cash at its sell price.
pub fn redeem_resolved(portfolio: &mut Portfolio) -> Vec<ExitResult> {
    let positions = std::mem::take(&mut portfolio.open_positions);
    let mut results = Vec::new();
    for position in positions {
        match position.sell_price {
            Some(sell) => results.push(settle(portfolio, &position, sell)),
            None => portfolio.open_positions.push(position),
        }
    }
    results
}

/// Stamp a sell price on open positions whose market has resolved.
///
/// `resolutions` maps market id to the final YES price.
pub fn apply_resolutions(portfolio: &mut Portfolio, resolutions: &BTreeMap<String, f64>) -> usize {
    let mut count = 0;
    for position in portfolio.open_positions.iter_mut() {
        if position.sell_price.is_some() {
            continue;
        }
        if let Some(&yes_price) = resolutions.get(&position.market_id) {
            *position = position.resolve(yes_price);
            count += 1;
        }
    }
    count
}

/// Cost basis of positions present in `candidate` but not in `previous`.
pub fn opened_notional(previous: &Portfolio, candidate: &Portfolio) -> f64 {
    candidate
        .open_positions
        .iter()
        .filter(|p| !previous.open_positions.contains(p))
        .map(Position::cost_basis)
        .sum()
}

/// Deduct a fee from cash, never below zero. Returns the amount charged.
///
/// Strategies size entries with [`ExecutionConfig::net_of_fee`], so the
/// cash for the fee is already set aside and the floor only absorbs rounding.
pub fn charge_fee(portfolio: &mut Portfolio, fee: f64) -> f64 {
    let charged = fee.max(0.0).min(portfolio.unallocated_cash);
    portfolio.unallocated_cash -= charged;
    charged
}
