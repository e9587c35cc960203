//! Market data access port trait.

use crate::domain::error::BetbenchError;
use crate::domain::market::MarketSeries;
use chrono::NaiveDate;

pub trait MarketDataPort {
    /// YES price history (and volume history, when known) of one market.
    fn fetch_prices(&self, market_id: &str) -> Result<MarketSeries, BetbenchError>;

    fn list_markets(&self) -> Result<Vec<String>, BetbenchError>;

    /// First date, last date and number of price points, if the market has any.
    fn get_data_range(
        &self,
        market_id: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, BetbenchError> {
        let series = self.fetch_prices(market_id)?;
        Ok(match (series.prices.first(), series.prices.last()) {
            (Some(first), Some(last)) => Some((first.date, last.date, series.prices.len())),
            _ => None,
        })
    }
}
