//! Share holdings in a single binary market.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::BetbenchError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Yes,
    No,
}

impl Outcome {
    /// Direction encoded by a signed bet.
    pub fn from_bet(bet: f64) -> Self {
        if bet < 0.0 { Outcome::No } else { Outcome::Yes }
    }

    /// Price of one share of this outcome given the market's YES price.
    pub fn price_from_yes(self, yes_price: f64) -> f64 {
        match self {
            Outcome::Yes => yes_price,
            Outcome::No => 1.0 - yes_price,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub event_id: String,
    pub market_id: String,
    pub outcome: Outcome,
    pub shares: f64,
    pub purchase_price: f64,
    pub decision_datetime: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sell_price: Option<f64>,
}

impl Position {
    pub fn new(
        event_id: impl Into<String>,
        market_id: impl Into<String>,
        outcome: Outcome,
        shares: f64,
        purchase_price: f64,
        decision_datetime: DateTime<Utc>,
    ) -> Result<Self, BetbenchError> {
        let position = Position {
            event_id: event_id.into(),
            market_id: market_id.into(),
            outcome,
            shares,
            purchase_price,
            decision_datetime,
            sell_price: None,
        };
        position.validate()?;
        Ok(position)
    }

    pub fn validate(&self) -> Result<(), BetbenchError> {
        if !self.shares.is_finite() || self.shares < 0.0 {
            return Err(BetbenchError::InvalidPosition {
                reason: format!("{}: shares {} must be non-negative", self.market_id, self.shares),
            });
        }
        if !self.purchase_price.is_finite() || !(0.0..=1.0).contains(&self.purchase_price) {
            return Err(BetbenchError::InvalidPosition {
                reason: format!(
                    "{}: purchase price {} outside [0, 1]",
                    self.market_id, self.purchase_price
                ),
            });
        }
        if let Some(p) = self.sell_price {
            if !p.is_finite() || !(0.0..=1.0).contains(&p) {
                return Err(BetbenchError::InvalidPosition {
                    reason: format!("{}: sell price {} outside [0, 1]", self.market_id, p),
                });
            }
        }
        Ok(())
    }

    pub fn is_resolved(&self) -> bool {
        self.sell_price.is_some()
    }

    /// Mark this position as settled at the market's final YES price.
    pub fn resolve(&self, yes_price: f64) -> Position {
        Position {
            sell_price: Some(self.outcome.price_from_yes(yes_price)),
            ..self.clone()
        }
    }

    /// Share price implied by the market's YES price, or the settlement price once resolved.
    pub fn price_for(&self, yes_price: f64) -> f64 {
        self.sell_price
            .unwrap_or_else(|| self.outcome.price_from_yes(yes_price))
    }

    pub fn cost_basis(&self) -> f64 {
        self.shares * self.purchase_price
    }

    pub fn market_value(&self, yes_price: f64) -> f64 {
        self.shares * self.price_for(yes_price)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn when() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 15, 12, 0, 0).unwrap()
    }

    fn yes_position() -> Position {
        Position::new("e1", "m1", Outcome::Yes, 100.0, 0.4, when()).unwrap()
    }

    fn no_position() -> Position {
        Position::new("e1", "m2", Outcome::No, 50.0, 0.3, when()).unwrap()
    }

    #[test]
    fn outcome_from_bet_sign() {
        assert_eq!(Outcome::from_bet(0.3), Outcome::Yes);
        assert_eq!(Outcome::from_bet(-0.3), Outcome::No);
    }

    #[test]
    fn no_outcome_prices_complement() {
        assert!((Outcome::No.price_from_yes(0.7) - 0.3).abs() < 1e-12);
        assert!((Outcome::Yes.price_from_yes(0.7) - 0.7).abs() < 1e-12);
    }

    #[test]
    fn negative_shares_rejected() {
        let err = Position::new("e1", "m1", Outcome::Yes, -1.0, 0.5, when()).unwrap_err();
        assert!(matches!(err, BetbenchError::InvalidPosition { .. }));
    }

    #[test]
    fn purchase_price_out_of_range_rejected() {
        assert!(Position::new("e1", "m1", Outcome::Yes, 1.0, 1.5, when()).is_err());
        assert!(Position::new("e1", "m1", Outcome::Yes, 1.0, f64::NAN, when()).is_err());
    }

    #[test]
    fn market_value_yes() {
        let pos = yes_position();
        assert!((pos.market_value(0.5) - 50.0).abs() < 1e-9);
    }

    #[test]
    fn market_value_no() {
        let pos = no_position();
        // NO share at YES 0.6 is worth 0.4
        assert!((pos.market_value(0.6) - 20.0).abs() < 1e-9);
    }


    #[test]
    fn resolved_position_ignores_market_price() {
        let pos = no_position().resolve(0.0);
        assert!(pos.is_resolved());
        assert_eq!(pos.sell_price, Some(1.0));
        assert!((pos.market_value(0.9) - 50.0).abs() < 1e-9);
    }
}
