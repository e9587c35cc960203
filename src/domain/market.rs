//! Market price data as the core consumes it.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::error::BetbenchError;
use super::series::DataPointSeries;

/// Historical data for one market as delivered by a data provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketSeries {
    pub market_id: String,
    pub prices: DataPointSeries,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volumes: Option<DataPointSeries>,
}

/// YES price series for every known market.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceBook {
    series: BTreeMap<String, DataPointSeries>,
}

impl PriceBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, market_id: impl Into<String>, prices: DataPointSeries) {
        self.series.insert(market_id.into(), prices);
    }

    pub fn with_series(mut self, market_id: impl Into<String>, prices: DataPointSeries) -> Self {
        self.insert(market_id, prices);
        self
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    /// YES price of `market_id` on `date`, falling back to the latest earlier price.
    pub fn price_at(&self, market_id: &str, date: NaiveDate) -> Result<f64, BetbenchError> {
        self.series
            .get(market_id)
            .and_then(|s| s.value_at_or_before(date))
            .map(|p| p.value)
            .ok_or_else(|| BetbenchError::MissingPriceData {
                market_id: market_id.to_string(),
                date,
            })
    }

    /// Markets whose series has ended at 0 or 1 on or before `date`, mapped
    /// to that final YES price.
    pub fn resolutions_at(&self, date: NaiveDate) -> BTreeMap<String, f64> {
        self.series
            .iter()
            .filter_map(|(id, s)| {
                s.last()
                    .filter(|p| p.date <= date && (p.value == 0.0 || p.value == 1.0))
                    .map(|p| (id.clone(), p.value))
            })
            .collect()
    }
}

impl FromIterator<MarketSeries> for PriceBook {
    fn from_iter<I: IntoIterator<Item = MarketSeries>>(iter: I) -> Self {
        PriceBook {
            series: iter.into_iter().map(|m| (m.market_id, m.prices)).collect(),
        }
    }
}

/// A tradable market as seen on one decision date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub event_id: String,
    pub market_id: String,
    pub price: f64,
    pub volume: f64,
}
