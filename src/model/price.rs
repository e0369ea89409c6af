use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::Serialize;

use crate::error::{ForecastError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub close: f64,
}

/// Daily closes with strictly increasing dates and positive finite prices.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PriceSeries {
    points: Vec<PricePoint>,
}

impl PriceSeries {
    pub fn new(points: Vec<PricePoint>) -> Result<Self> {
        for (i, p) in points.iter().enumerate() {
            if !p.close.is_finite() || p.close <= 0.0 {
                return Err(ForecastError::InvalidSeries(format!(
                    "price at index {} ({}) must be positive and finite, got {}",
                    i, p.date, p.close
                )));
            }
            if i > 0 && points[i - 1].date >= p.date {
                return Err(ForecastError::InvalidSeries(format!(
                    "dates must be strictly increasing: {} follows {}",
                    p.date,
                    points[i - 1].date
                )));
            }
        }
        Ok(Self { points })
    }

    /// Builds a series of consecutive business days starting at `start`.
    pub fn from_closes(start: NaiveDate, closes: &[f64]) -> Result<Self> {
        let mut date = start;
        let mut points = Vec::with_capacity(closes.len());
        for (i, close) in closes.iter().enumerate() {
            if i > 0 {
                date = next_business_day(date);
            }
            points.push(PricePoint {
                date,
                close: *close,
            });
        }
        Self::new(points)
    }

    pub(crate) fn from_subsequence(points: Vec<PricePoint>) -> Self {
        Self { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn closes(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.close).collect()
    }

    pub fn last(&self) -> Option<&PricePoint> {
        self.points.last()
    }
}

pub fn next_business_day(date: NaiveDate) -> NaiveDate {
    let mut next = date + Duration::days(1);
    while matches!(next.weekday(), Weekday::Sat | Weekday::Sun) {
        next += Duration::days(1);
    }
    next
}

/// `count` dates starting at `first`, each the business day after the previous.
pub fn business_days_from(first: NaiveDate, count: usize) -> Vec<NaiveDate> {
    let mut out = Vec::with_capacity(count);
    let mut date = first;
    for i in 0..count {
        if i > 0 {
            date = next_business_day(date);
        }
        out.push(date);
    }
    out
}
