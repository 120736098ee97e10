//! Timeline normalization and trailing returns.
//!
//! Every series is expressed as percent change against the first point of the
//! timeline. A zero baseline divides by 1 instead so the result stays finite;
//! callers that care about true zero baselines must check the raw values.

use crate::error::AnalyticsError;
use crate::models::{PeriodReturns, Series, SeriesReturns, TimelinePoint};
use chrono::NaiveDate;
use serde::Serialize;

/// A timeline point with both its absolute values and its percent changes.
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct NormalizedPoint {
    pub date: NaiveDate,
    pub absolute: TimelinePoint,
    pub portfolio_pct: f64,
    pub benchmark_a_pct: f64,
    pub benchmark_b_pct: f64,
}

impl NormalizedPoint {
    pub fn pct(&self, series: Series) -> f64 {
        match series {
            Series::Portfolio => self.portfolio_pct,
            Series::BenchmarkA => self.benchmark_a_pct,
            Series::BenchmarkB => self.benchmark_b_pct,
        }
    }
}

/// Percent change of `value` relative to `baseline`. A zero baseline divides by 1.
pub fn pct_change(value: f64, baseline: f64) -> f64 {
    let divisor = if baseline == 0.0 { 1.0 } else { baseline };
    (value - baseline) / divisor * 100.0
}

/// Normalize every series against the first point.
pub fn normalize(timeline: &[TimelinePoint]) -> Result<Vec<NormalizedPoint>, AnalyticsError> {
    let baseline = timeline.first().ok_or(AnalyticsError::EmptyInput)?;

    Ok(timeline
        .iter()
        .map(|p| NormalizedPoint {
            date: p.date,
            absolute: *p,
            portfolio_pct: pct_change(p.portfolio, baseline.portfolio),
            benchmark_a_pct: pct_change(p.benchmark_a, baseline.benchmark_a),
            benchmark_b_pct: pct_change(p.benchmark_b, baseline.benchmark_b),
        })
        .collect())
}

fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}

/// Return of `current` over `past`, absent when `past` is not positive.
fn simple_return(current: f64, past: f64) -> Option<f64> {
    if past > 0.0 {
        Some(round1((current - past) / past * 100.0))
    } else {
        None
    }
}

/// Trailing 1-month, 3-month and 1-year returns for each series.
///
/// Points are assumed monthly: the 1-month return compares the last point
/// with the one before it, the 3-month return with the point three steps back
/// (or the first point on short timelines), the 1-year return with the first.
pub fn period_returns(timeline: &[TimelinePoint]) -> Result<Vec<SeriesReturns>, AnalyticsError> {
    let n = timeline.len();
    match n {
        0 => return Err(AnalyticsError::EmptyInput),
        1 => return Err(AnalyticsError::InsufficientHistory),
        _ => {}
    }

    let current = &timeline[n - 1];
    let month1 = &timeline[n - 2];
    let months3 = if n >= 4 {
        &timeline[n - 4]
    } else {
        &timeline[0]
    };
    let year1 = &timeline[0];

    Ok(Series::ALL
        .iter()
        .map(|&s| {
            let now = s.value_of(current);
            SeriesReturns {
                series: s.label().to_string(),
                returns: PeriodReturns {
                    month1: simple_return(now, s.value_of(month1)),
                    months3: simple_return(now, s.value_of(months3)),
                    year1: simple_return(now, s.value_of(year1)),
                },
            }
        })
        .collect())
}
