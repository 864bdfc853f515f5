//! Price history series used for momentum scoring.

use chrono::NaiveDate;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub close: f64,
}

impl PricePoint {
    pub fn new(date: NaiveDate, close: f64) -> Self {
        PricePoint { date, close }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SeriesError {
    #[error("empty price series for {0}")]
    Empty(String),

    #[error("dates not strictly increasing for {code} at {date}")]
    Unordered { code: String, date: NaiveDate },
}

/// Adjusted close prices for one instrument, oldest first.
///
/// Always non-empty with strictly increasing dates, so the first and last
/// observations needed for a return calculation are both present.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSeries {
    code: String,
    points: Vec<PricePoint>,
}

impl PriceSeries {
    pub fn new(code: impl Into<String>, points: Vec<PricePoint>) -> Result<Self, SeriesError> {
        let code = code.into();
        if points.is_empty() {
            return Err(SeriesError::Empty(code));
        }
        for pair in points.windows(2) {
            if pair[1].date <= pair[0].date {
                return Err(SeriesError::Unordered {
                    code,
                    date: pair[1].date,
                });
            }
        }
        Ok(PriceSeries { code, points })
    }

    /// Sorts the points by date before validating. Duplicate dates are still rejected.
    pub fn from_unsorted(
        code: impl Into<String>,
        mut points: Vec<PricePoint>,
    ) -> Result<Self, SeriesError> {
        points.sort_by_key(|p| p.date);
        Self::new(code, points)
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first(&self) -> &PricePoint {
        &self.points[0]
    }

    pub fn last(&self) -> &PricePoint {
        &self.points[self.points.len() - 1]
    }
}
