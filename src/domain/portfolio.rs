//! Portfolio snapshots: open positions plus unallocated cash.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::error::BetbenchError;
use super::market::PriceBook;
use super::position::Position;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Portfolio {
    pub open_positions: Vec<Position>,
    pub unallocated_cash: f64,
}

/// A position whose market had no usable price on the valuation date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceGap {
    pub market_id: String,
    pub date: NaiveDate,
}

impl Portfolio {
    pub fn new(open_positions: Vec<Position>, unallocated_cash: f64) -> Result<Self, BetbenchError> {
        if !unallocated_cash.is_finite() || unallocated_cash < 0.0 {
            return Err(BetbenchError::InvalidPortfolio {
                reason: format!("unallocated cash {unallocated_cash} must be non-negative"),
            });
        }
        for position in &open_positions {
            position.validate()?;
        }
        Ok(Portfolio {
            open_positions,
            unallocated_cash,
        })
    }

    /// All-cash portfolio.
    pub fn seed(cash: f64) -> Result<Self, BetbenchError> {
        Self::new(Vec::new(), cash)
    }

    pub fn position_count(&self) -> usize {
        self.open_positions.len()
    }

    pub fn positions_in_event<'a>(&'a self, event_id: &'a str) -> impl Iterator<Item = &'a Position> {
        self.open_positions
            .iter()
            .filter(move |p| p.event_id == event_id)
    }

    /// Cash plus every position marked at `date`. Any missing price is an error.
    pub fn value(&self, prices: &PriceBook, date: NaiveDate) -> Result<f64, BetbenchError> {
        let mut total = self.unallocated_cash;
        for position in &self.open_positions {
            total += match position.sell_price {
                Some(sell) => position.shares * sell,
                None => position.market_value(prices.price_at(&position.market_id, date)?),
            };
        }
        Ok(total)
    }

    /// Like [`Portfolio::value`], but unpriced positions count as zero and are reported.
    pub fn value_with_gaps(&self, prices: &PriceBook, date: NaiveDate) -> (f64, Vec<PriceGap>) {
        let mut total = self.unallocated_cash;
        let mut gaps = Vec::new();
        for position in &self.open_positions {
            match position.sell_price {
                Some(sell) => total += position.shares * sell,
                None => match prices.price_at(&position.market_id, date) {
                    Ok(price) => total += position.market_value(price),
                    Err(_) => gaps.push(PriceGap {
                        market_id: position.market_id.clone(),
                        date,
                    }),
                },
            }
        }
        (total, gaps)
    }
}

/// One entry of a strategy's history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub as_of: DateTime<Utc>,
    pub portfolio: Portfolio,
    /// External cash added since the seed, up to and including this step.
    #[serde(default)]
    pub contributed: f64,
}

impl Snapshot {
    pub fn new(as_of: DateTime<Utc>, portfolio: Portfolio) -> Self {
        Snapshot {
            as_of,
            portfolio,
            contributed: 0.0,
        }
    }

    pub fn with_contributed(mut self, contributed: f64) -> Self {
        self.contributed = contributed;
        self
    }

    pub fn date(&self) -> NaiveDate {
        self.as_of.date_naive()
    }
}
