//! Portfolio valuation and cumulative returns.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::warn;

use super::error::BetbenchError;
use super::market::PriceBook;
use super::portfolio::{PriceGap, Snapshot};
use super::series::{DataPoint, DataPointSeries};

/// Portfolio value per date, plus every position that could not be priced.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Valuation {
    pub values: DataPointSeries,
    /// Cumulative external cash behind each value, on the same dates.
    #[serde(default)]
    pub contributed: DataPointSeries,
    pub gaps: Vec<PriceGap>,
}

impl Valuation {
    pub fn is_complete(&self) -> bool {
        self.gaps.is_empty()
    }

    /// The valuation itself, or its first gap as a `MissingPriceData` error.
    pub fn require_complete(self) -> Result<Self, BetbenchError> {
        match self.gaps.first() {
            Some(gap) => Err(BetbenchError::MissingPriceData {
                market_id: gap.market_id.clone(),
                date: gap.date,
            }),
            None => Ok(self),
        }
    }
}

/// Value each distinct snapshot date; the last snapshot of a date wins.
pub fn value_history(history: &[Snapshot], prices: &PriceBook) -> Valuation {
    let grid: Vec<NaiveDate> = history
        .iter()
        .map(Snapshot::date)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    value_on_grid(history, prices, &grid)
}

/// Value a history on `grid`, carrying holdings forward between snapshots.
///
/// For each grid date on or after the first snapshot, the latest snapshot
/// dated on or before it is marked to market on that grid date. Grid dates
/// before the first snapshot are skipped.
pub fn value_on_grid(history: &[Snapshot], prices: &PriceBook, grid: &[NaiveDate]) -> Valuation {
    let mut ordered: Vec<&Snapshot> = history.iter().collect();
    ordered.sort_by_key(|s| s.as_of);

    let mut dates: Vec<NaiveDate> = grid.to_vec();
    dates.sort();
    dates.dedup();

    let mut points = Vec::with_capacity(dates.len());
    let mut contributed = Vec::with_capacity(dates.len());
    let mut gaps = Vec::new();
    for date in dates {
        let idx = ordered.partition_point(|s| s.date() <= date);
        let Some(snapshot) = idx.checked_sub(1).map(|i| ordered[i]) else {
            continue;
        };
        let (value, mut missing) = snapshot.portfolio.value_with_gaps(prices, date);
        gaps.append(&mut missing);
        points.push(DataPoint::new(date, value));
        contributed.push(DataPoint::new(date, snapshot.contributed));
    }

    Valuation {
        values: DataPointSeries::from_unsorted(points),
        contributed: DataPointSeries::from_unsorted(contributed),
        gaps,
    }
}

/// Sorted union of every snapshot date across `histories`.
pub fn union_dates<'a, I>(histories: I) -> Vec<NaiveDate>
where
    I: IntoIterator<Item = &'a [Snapshot]>,
{
    let dates: BTreeSet<NaiveDate> = histories
        .into_iter()
        .flat_map(|h| h.iter().map(Snapshot::date))
        .collect();
    dates.into_iter().collect()
}

/// Value of the seed snapshot on its own date, before any step touched it.
///
/// `None` for an empty history. The seed is the earliest snapshot; on equal
/// instants the one recorded first.
pub fn starting_value(history: &[Snapshot], prices: &PriceBook) -> Result<Option<f64>, BetbenchError> {
    history
        .iter()
        .min_by_key(|s| s.as_of)
        .map(|seed| seed.portfolio.value(prices, seed.date()))
        .transpose()
}

/// `(value[t] - contributed[t]) / base - 1` for every point.
///
/// `base` is the starting capital. Cash contributed after the seed is taken
/// out of each value, so it never shows up as return; fees paid on any step
/// do. A zero or non-finite base leaves the return undefined.
pub fn cumulative_returns(
    model_id: &str,
    base: f64,
    valuation: &Valuation,
) -> Result<DataPointSeries, BetbenchError> {
    if valuation.values.is_empty() {
        return Ok(DataPointSeries::default());
    }
    if base == 0.0 || !base.is_finite() {
        return Err(BetbenchError::UndefinedReturn {
            model_id: model_id.to_string(),
        });
    }
    let points = valuation
        .values
        .points()
        .iter()
        .map(|p| {
            let contributed = valuation.contributed.value_at(p.date).unwrap_or(0.0);
            DataPoint::new(p.date, (p.value - contributed) / base - 1.0)
        })
        .collect();
    DataPointSeries::new(points)
}

/// Why a model has no return series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum Exclusion {
    MissingPriceData { market_id: String, date: NaiveDate },
    UndefinedReturn,
    EmptySeries,
    SimulationFailed { message: String },
}

impl Exclusion {
    pub fn from_error(err: &BetbenchError) -> Self {
        match err {
            BetbenchError::MissingPriceData { market_id, date } => Exclusion::MissingPriceData {
                market_id: market_id.clone(),
                date: *date,
            },
            BetbenchError::UndefinedReturn { .. } => Exclusion::UndefinedReturn,
            other => Exclusion::SimulationFailed {
                message: other.to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelReturns {
    pub values: BTreeMap<String, DataPointSeries>,
    pub returns: BTreeMap<String, DataPointSeries>,
    pub excluded: BTreeMap<String, Exclusion>,
}

/// Align every model on the union of snapshot dates and compute cumulative returns.
///
/// Returns are measured against each model's seed, so the first grid date
/// already reflects that day's step. A model that cannot be fully priced, or
/// whose starting value is zero, is moved to `excluded` with the reason; the
/// other models are unaffected.
pub fn compute_model_returns(
    histories: &BTreeMap<String, Vec<Snapshot>>,
    prices: &PriceBook,
) -> ModelReturns {
    let grid = union_dates(histories.values().map(Vec::as_slice));
    let mut out = ModelReturns::default();

    for (model_id, history) in histories {
        let result = value_on_grid(history, prices, &grid)
            .require_complete()
            .and_then(|valuation| {
                let returns = match starting_value(history, prices)? {
                    Some(base) => cumulative_returns(model_id, base, &valuation)?,
                    None => DataPointSeries::default(),
                };
                Ok((valuation.values, returns))
            });
        match result {
            Ok((values, returns)) => {
                out.values.insert(model_id.clone(), values);
                out.returns.insert(model_id.clone(), returns);
            }
            Err(e) => {
                warn!(model = %model_id, error = %e, "model excluded from returns");
                out.excluded.insert(model_id.clone(), Exclusion::from_error(&e));
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::portfolio::Portfolio;
    use crate::domain::position::{Outcome, Position};
    use approx::assert_relative_eq;
    use chrono::{DateTime, TimeZone, Utc};

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, day, 10, 0, 0).unwrap()
    }

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, day).unwrap()
    }

    fn yes(market: &str, shares: f64, price: f64, day: u32) -> Position {
        Position::new("e1", market, Outcome::Yes, shares, price, at(day)).unwrap()
    }

    fn prices() -> PriceBook {
        PriceBook::new().with_series(
            "m1",
            DataPointSeries::from_iso_pairs(&[
                ("2025-01-01", 0.5),
                ("2025-01-02", 0.6),
                ("2025-01-04", 0.8),
            ])
            .unwrap(),
        )
    }

    fn history() -> Vec<Snapshot> {
        vec![
            Snapshot::new(at(1), Portfolio::seed(1.0).unwrap()),
            Snapshot::new(at(1), Portfolio::new(vec![yes("m1", 1.0, 0.5, 1)], 0.5).unwrap()),
            Snapshot::new(at(4), Portfolio::new(vec![yes("m1", 1.0, 0.5, 1)], 0.5).unwrap()),
        ]
    }

    #[test]
    fn value_history_one_point_per_date_last_snapshot_wins() {
        let v = value_history(&history(), &prices());
        assert!(v.is_complete());
        let values: Vec<f64> = v.values.values().collect();
        assert_eq!(v.values.len(), 2);
        assert_relative_eq!(values[0], 1.0);
        assert_relative_eq!(values[1], 1.3);
    }

    #[test]
    fn grid_carries_holdings_forward_and_marks_to_market() {
        let v = value_on_grid(&history(), &prices(), &[d(2), d(3), d(4)]);
        let values: Vec<f64> = v.values.values().collect();
        // day 3 has no quote; day 2 price carries forward
        assert_eq!(values.len(), 3);
        assert_relative_eq!(values[0], 1.1);
        assert_relative_eq!(values[1], 1.1);
        assert_relative_eq!(values[2], 1.3);
    }

    #[test]
    fn grid_dates_before_first_snapshot_are_skipped() {
        let late = vec![Snapshot::new(at(3), Portfolio::seed(2.0).unwrap())];
        let v = value_on_grid(&late, &prices(), &[d(1), d(2), d(3), d(5)]);
        assert_eq!(v.values.dates().collect::<Vec<_>>(), vec![d(3), d(5)]);
    }

    #[test]
    fn resolved_positions_use_sell_price() {
        let resolved = yes("gone", 2.0, 0.5, 1).resolve(1.0);
        let h = vec![Snapshot::new(at(2), Portfolio::new(vec![resolved], 0.0).unwrap())];
        let v = value_history(&h, &PriceBook::new());
        assert!(v.is_complete());
        assert_relative_eq!(v.values.last().unwrap().value, 2.0);
    }

    #[test]
    fn missing_price_is_flagged_not_dropped() {
        let h = vec![Snapshot::new(at(2), Portfolio::new(vec![yes("m9", 1.0, 0.5, 1)], 0.25).unwrap())];
        let v = value_history(&h, &prices());
        assert_eq!(v.gaps.len(), 1);
        assert_relative_eq!(v.values.last().unwrap().value, 0.25);
        assert!(matches!(
            v.require_complete(),
            Err(BetbenchError::MissingPriceData { ref market_id, .. }) if market_id == "m9"
        ));
    }

    fn valuation(values: &[(&str, f64)], contributed: &[(&str, f64)]) -> Valuation {
        Valuation {
            values: DataPointSeries::from_iso_pairs(values).unwrap(),
            contributed: DataPointSeries::from_iso_pairs(contributed).unwrap(),
            gaps: Vec::new(),
        }
    }

    #[test]
    fn cumulative_returns_relative_to_base() {
        let v = valuation(&[("2025-01-01", 2.0), ("2025-01-02", 2.5), ("2025-01-03", 1.0)], &[]);
        let r: Vec<f64> = cumulative_returns("m", 2.0, &v).unwrap().values().collect();
        assert_relative_eq!(r[0], 0.0);
        assert_relative_eq!(r[1], 0.25);
        assert_relative_eq!(r[2], -0.5);
    }

    #[test]
    fn first_point_can_differ_from_base() {
        // a fee paid on the first step
        let v = valuation(&[("2025-01-01", 0.95), ("2025-01-02", 0.95)], &[]);
        let r: Vec<f64> = cumulative_returns("m", 1.0, &v).unwrap().values().collect();
        assert_relative_eq!(r[0], -0.05, epsilon = 1e-12);
        assert_relative_eq!(r[1], -0.05, epsilon = 1e-12);
    }

    #[test]
    fn contributed_cash_is_not_return() {
        let v = valuation(
            &[("2025-01-01", 1.5), ("2025-01-02", 2.0), ("2025-01-03", 2.75)],
            &[("2025-01-01", 0.5), ("2025-01-02", 1.0), ("2025-01-03", 1.5)],
        );
        let r: Vec<f64> = cumulative_returns("m", 1.0, &v).unwrap().values().collect();
        assert_relative_eq!(r[0], 0.0);
        assert_relative_eq!(r[1], 0.0);
        assert_relative_eq!(r[2], 0.25);
    }

    #[test]
    fn cumulative_returns_zero_base_is_undefined() {
        let v = valuation(&[("2025-01-01", 0.0), ("2025-01-02", 1.0)], &[]);
        assert!(matches!(
            cumulative_returns("zero", 0.0, &v),
            Err(BetbenchError::UndefinedReturn { ref model_id }) if model_id == "zero"
        ));
    }

    #[test]
    fn cumulative_returns_of_empty_series_is_empty() {
        assert!(cumulative_returns("m", 1.0, &Valuation::default()).unwrap().is_empty());
    }

    #[test]
    fn starting_value_is_the_seed_not_the_first_step() {
        let h = history();
        assert_eq!(starting_value(&h, &prices()).unwrap(), Some(1.0));
        let mut charged = h.clone();
        charged[1].portfolio.unallocated_cash = 0.45;
        let mut histories = BTreeMap::new();
        histories.insert("charged".to_string(), charged);
        let out = compute_model_returns(&histories, &prices());
        assert_relative_eq!(out.returns["charged"].first().unwrap().value, -0.05, epsilon = 1e-12);
        assert_eq!(starting_value(&[], &prices()).unwrap(), None);
    }

    #[test]
    fn valuation_carries_contributions_per_date() {
        let h = vec![
            Snapshot::new(at(1), Portfolio::seed(1.0).unwrap()),
            Snapshot::new(at(2), Portfolio::seed(1.5).unwrap()).with_contributed(0.5),
        ];
        let v = value_on_grid(&h, &prices(), &[d(1), d(2), d(3)]);
        let c: Vec<f64> = v.contributed.values().collect();
        assert_eq!(c, vec![0.0, 0.5, 0.5]);
    }

    #[test]
    fn union_dates_merges_models() {
        let a = vec![Snapshot::new(at(1), Portfolio::seed(1.0).unwrap()), Snapshot::new(at(3), Portfolio::seed(1.0).unwrap())];
        let b = vec![Snapshot::new(at(2), Portfolio::seed(1.0).unwrap()), Snapshot::new(at(3), Portfolio::seed(1.0).unwrap())];
        assert_eq!(union_dates([a.as_slice(), b.as_slice()]), vec![d(1), d(2), d(3)]);
    }

    #[test]
    fn compute_model_returns_aligns_and_excludes() {
        let mut histories = BTreeMap::new();
        histories.insert("good".to_string(), history());
        histories.insert(
            "late".to_string(),
            vec![Snapshot::new(at(2), Portfolio::seed(1.0).unwrap())],
        );
        histories.insert(
            "broke".to_string(),
            vec![Snapshot::new(at(1), Portfolio::seed(0.0).unwrap())],
        );
        histories.insert(
            "blind".to_string(),
            vec![Snapshot::new(at(1), Portfolio::new(vec![yes("m9", 1.0, 0.5, 1)], 0.0).unwrap())],
        );

        let out = compute_model_returns(&histories, &prices());

        let good = &out.returns["good"];
        assert_eq!(good.dates().collect::<Vec<_>>(), vec![d(1), d(2), d(4)]);
        assert_relative_eq!(good.last().unwrap().value, 0.3, epsilon = 1e-12);

        assert_eq!(out.returns["late"].dates().collect::<Vec<_>>(), vec![d(2), d(4)]);

        assert_eq!(out.excluded["broke"], Exclusion::UndefinedReturn);
        assert!(matches!(out.excluded["blind"], Exclusion::MissingPriceData { .. }));
        assert!(!out.returns.contains_key("blind"));
    }
}
