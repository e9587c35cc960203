//! Date-keyed scalar time series used for prices, valuations and returns.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::error::BetbenchError;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DataPoint {
    pub date: NaiveDate,
    pub value: f64,
}

impl DataPoint {
    pub fn new(date: NaiveDate, value: f64) -> Self {
        DataPoint { date, value }
    }

    pub fn date_string(&self) -> String {
        self.date.format(DATE_FORMAT).to_string()
    }
}

/// A series of [`DataPoint`]s whose dates never decrease.
///
/// Every constructor upholds the ordering, so consumers can binary search
/// without re-checking it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<DataPoint>", into = "Vec<DataPoint>")]
pub struct DataPointSeries {
    points: Vec<DataPoint>,
}

impl DataPointSeries {
    /// Wrap already-ordered points, rejecting any backwards step.
    pub fn new(points: Vec<DataPoint>) -> Result<Self, BetbenchError> {
        if let Some(w) = points.windows(2).find(|w| w[0].date > w[1].date) {
            return Err(BetbenchError::InvalidSeries {
                reason: format!("{} follows {}", w[1].date, w[0].date),
            });
        }
        Ok(DataPointSeries { points })
    }

    /// Stable sort by date; equal dates keep their input order.
    pub fn from_unsorted(mut points: Vec<DataPoint>) -> Self {
        points.sort_by_key(|p| p.date);
        DataPointSeries { points }
    }

    pub fn from_map(map: &BTreeMap<NaiveDate, f64>) -> Self {
        DataPointSeries {
            points: map.iter().map(|(&d, &v)| DataPoint::new(d, v)).collect(),
        }
    }

    /// Parse `(YYYY-MM-DD, value)` pairs; the pairs must be chronological.
    pub fn from_iso_pairs<S: AsRef<str>>(pairs: &[(S, f64)]) -> Result<Self, BetbenchError> {
        let points = pairs
            .iter()
            .map(|(d, v)| {
                NaiveDate::parse_from_str(d.as_ref(), DATE_FORMAT)
                    .map(|date| DataPoint::new(date, *v))
                    .map_err(|e| BetbenchError::InvalidSeries {
                        reason: format!("bad date {:?}: {}", d.as_ref(), e),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(points)
    }

    /// Date-indexed view. Duplicate dates collapse to the last value.
    pub fn to_map(&self) -> BTreeMap<NaiveDate, f64> {
        self.points.iter().map(|p| (p.date, p.value)).collect()
    }

    pub fn to_iso_pairs(&self) -> Vec<(String, f64)> {
        self.points
            .iter()
            .map(|p| (p.date_string(), p.value))
            .collect()
    }

    pub fn points(&self) -> &[DataPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first(&self) -> Option<&DataPoint> {
        self.points.first()
    }

    pub fn last(&self) -> Option<&DataPoint> {
        self.points.last()
    }

    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.points.iter().map(|p| p.value)
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.points.iter().map(|p| p.date)
    }

    /// Exact lookup. With duplicate dates the last one wins.
    pub fn value_at(&self, date: NaiveDate) -> Option<f64> {
        self.value_at_or_before(date)
            .filter(|p| p.date == date)
            .map(|p| p.value)
    }

    /// Last observation carried forward: the latest point dated on or before `date`.
    pub fn value_at_or_before(&self, date: NaiveDate) -> Option<&DataPoint> {
        let idx = self.points.partition_point(|p| p.date <= date);
        idx.checked_sub(1).map(|i| &self.points[i])
    }

    /// Append a point; fails if it would go back in time.
    pub fn push(&mut self, point: DataPoint) -> Result<(), BetbenchError> {
        if let Some(last) = self.points.last() {
            if point.date < last.date {
                return Err(BetbenchError::InvalidSeries {
                    reason: format!("{} follows {}", point.date, last.date),
                });
            }
        }
        self.points.push(point);
        Ok(())
    }
}

impl TryFrom<Vec<DataPoint>> for DataPointSeries {
    type Error = BetbenchError;

    fn try_from(points: Vec<DataPoint>) -> Result<Self, Self::Error> {
        Self::new(points)
    }
}

impl From<DataPointSeries> for Vec<DataPoint> {
    fn from(series: DataPointSeries) -> Self {
        series.points
    }
}
