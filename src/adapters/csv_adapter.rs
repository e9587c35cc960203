//! CSV price data adapter.
//!
//! One file per market, `<prices_dir>/<market_id>.csv`, with a
//! `date,price[,volume]` header. Rows may come in any order.

use crate::domain::error::BetbenchError;
use crate::domain::market::MarketSeries;
use crate::domain::series::{DATE_FORMAT, DataPoint, DataPointSeries};
use crate::ports::data_port::MarketDataPort;
use chrono::NaiveDate;
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;

pub struct CsvAdapter {
    base_path: PathBuf,
}

#[derive(Debug, Deserialize)]
struct PriceRow {
    date: String,
    price: f64,
    #[serde(default)]
    volume: Option<f64>,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, market_id: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", market_id))
    }
}

impl MarketDataPort for CsvAdapter {
    fn fetch_prices(&self, market_id: &str) -> Result<MarketSeries, BetbenchError> {
        let path = self.csv_path(market_id);
        let content = fs::read_to_string(&path).map_err(|e| {
            BetbenchError::data(format!("failed to read {}: {}", path.display(), e))
        })?;

        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(content.as_bytes());
        let mut prices = Vec::new();
        let mut volumes = Vec::new();

        for (line, result) in rdr.deserialize::<PriceRow>().enumerate() {
            let row = result.map_err(|e| {
                BetbenchError::data(format!("{}: CSV parse error: {}", path.display(), e))
            })?;
            let date = NaiveDate::parse_from_str(&row.date, DATE_FORMAT).map_err(|e| {
                BetbenchError::data(format!(
                    "{} row {}: invalid date {:?}: {}",
                    path.display(),
                    line + 1,
                    row.date,
                    e
                ))
            })?;
            if !row.price.is_finite() || !(0.0..=1.0).contains(&row.price) {
                return Err(BetbenchError::data(format!(
                    "{} row {}: price {} outside [0, 1]",
                    path.display(),
                    line + 1,
                    row.price
                )));
            }
            prices.push(DataPoint::new(date, row.price));
            if let Some(volume) = row.volume {
                volumes.push(DataPoint::new(date, volume));
            }
        }

        Ok(MarketSeries {
            market_id: market_id.to_string(),
            prices: DataPointSeries::from_unsorted(prices),
            volumes: if volumes.is_empty() {
                None
            } else {
                Some(DataPointSeries::from_unsorted(volumes))
            },
        })
    }

    fn list_markets(&self) -> Result<Vec<String>, BetbenchError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| {
            BetbenchError::data(format!(
                "failed to read directory {}: {}",
                self.base_path.display(),
                e
            ))
        })?;

        let mut markets = Vec::new();
        for entry in entries {
            let entry = entry?;
            let name = entry.file_name();
            let name_str = name.to_string_lossy();
            if let Some(market_id) = name_str.strip_suffix(".csv") {
                markets.push(market_id.to_string());
            }
        }

        markets.sort();
        Ok(markets)
    }
}
