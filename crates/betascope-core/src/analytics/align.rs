use std::collections::HashMap;

use thiserror::Error;
use time::Date;

use crate::domain::PriceSeries;

/// Minimum aligned prices before returns are computed.
pub const MIN_ALIGNED_POINTS: usize = 2;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AlignError {
    #[error("only {aligned} aligned price points, need at least {required}")]
    InsufficientData { aligned: usize, required: usize },
}

/// Benchmark closes keyed by calendar date. Built once per request and
/// shared read-only by every alignment.
#[derive(Debug, Clone, Default)]
pub struct BenchmarkLookup {
    closes: HashMap<Date, f64>,
}

impl BenchmarkLookup {
    pub fn from_series(series: &PriceSeries) -> Self {
        let closes = series
            .points
            .iter()
            .filter_map(|point| point.usable_close().map(|close| (point.date, close)))
            .collect();
        Self { closes }
    }

    pub fn get(&self, date: Date) -> Option<f64> {
        self.closes.get(&date).copied()
    }

    pub fn len(&self) -> usize {
        self.closes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.closes.is_empty()
    }
}

/// Target and benchmark closes on the dates both series share.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedPrices {
    pub dates: Vec<Date>,
    pub stock: Vec<f64>,
    pub market: Vec<f64>,
}

impl AlignedPrices {
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// Daily fractional returns between consecutive aligned prices.
    pub fn returns(&self) -> AlignedReturnPair {
        AlignedReturnPair {
            dates: self.dates.iter().skip(1).copied().collect(),
            stock: simple_returns(&self.stock),
            market: simple_returns(&self.market),
        }
    }
}

/// Equal-length return sequences; `dates[i]` is the later day of return `i`.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedReturnPair {
    pub dates: Vec<Date>,
    pub stock: Vec<f64>,
    pub market: Vec<f64>,
}

impl AlignedReturnPair {
    pub fn len(&self) -> usize {
        self.stock.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stock.is_empty()
    }
}

/// Keeps the target's dates that also carry a benchmark close, in the
/// target's order. No interpolation, no forward fill, no re-sorting.
pub fn align(target: &PriceSeries, benchmark: &BenchmarkLookup) -> Result<AlignedPrices, AlignError> {
    let mut aligned = AlignedPrices {
        dates: Vec::with_capacity(target.len()),
        stock: Vec::with_capacity(target.len()),
        market: Vec::with_capacity(target.len()),
    };

    for point in &target.points {
        let (Some(stock), Some(market)) = (point.usable_close(), benchmark.get(point.date)) else {
            continue;
        };
        aligned.dates.push(point.date);
        aligned.stock.push(stock);
        aligned.market.push(market);
    }

    if aligned.len() < MIN_ALIGNED_POINTS {
        return Err(AlignError::InsufficientData {
            aligned: aligned.len(),
            required: MIN_ALIGNED_POINTS,
        });
    }
    Ok(aligned)
}

fn simple_returns(prices: &[f64]) -> Vec<f64> {
    prices
        .windows(2)
        .map(|pair| (pair[1] - pair[0]) / pair[0])
        .collect()
}
