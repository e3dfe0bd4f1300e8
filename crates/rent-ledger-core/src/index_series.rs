//! Published index series and point-in-time lookup.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A single published index value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexPoint {
    #[serde(alias = "d")]
    pub date: NaiveDate,
    #[serde(alias = "v")]
    pub value: Decimal,
}

/// A row as delivered by a provider, before its date is validated.
#[derive(Debug, Clone, Deserialize)]
pub struct RawIndexPoint {
    #[serde(alias = "d")]
    pub date: String,
    #[serde(alias = "v")]
    pub value: Decimal,
}

/// Date-ordered index series.
///
/// Points are sorted ascending on construction (stable, so equal dates keep
/// their input order) and lookups never depend on the order a provider
/// happened to return them in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<IndexPoint>", into = "Vec<IndexPoint>")]
pub struct IndexSeries {
    points: Vec<IndexPoint>,
}

impl IndexSeries {
    pub fn new(mut points: Vec<IndexPoint>) -> Self {
        points.sort_by_key(|p| p.date);
        Self { points }
    }

    /// Build from provider rows, dropping rows whose date is not `YYYY-MM-DD`.
    /// Returns the series and the number of rows dropped.
    pub fn from_raw(rows: Vec<RawIndexPoint>) -> (Self, usize) {
        let total = rows.len();
        let points: Vec<IndexPoint> = rows
            .into_iter()
            .filter_map(|row| {
                NaiveDate::parse_from_str(row.date.trim(), "%Y-%m-%d")
                    .ok()
                    .map(|date| IndexPoint { date, value: row.value })
            })
            .collect();
        let dropped = total - points.len();
        (Self::new(points), dropped)
    }

    pub fn points(&self) -> &[IndexPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Value of the latest point dated on or before `target`, or `None` if
    /// every point is later than `target`.
    pub fn value_at(&self, target: NaiveDate) -> Option<Decimal> {
        let qualifying = self.points.partition_point(|p| p.date <= target);
        qualifying.checked_sub(1).map(|i| self.points[i].value)
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.points.first().map(|p| p.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.points.last().map(|p| p.date)
    }
}

impl From<Vec<IndexPoint>> for IndexSeries {
    fn from(points: Vec<IndexPoint>) -> Self {
        Self::new(points)
    }
}

impl From<IndexSeries> for Vec<IndexPoint> {
    fn from(series: IndexSeries) -> Self {
        series.points
    }
}
