use time::Date;

use crate::domain::Symbol;

/// One daily close. `close` is `None` when the provider reported a gap.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricePoint {
    pub date: Date,
    pub close: Option<f64>,
}

impl PricePoint {
    pub const fn new(date: Date, close: Option<f64>) -> Self {
        Self { date, close }
    }

    /// Close usable for return computation: present, finite and non-zero.
    pub fn usable_close(&self) -> Option<f64> {
        self.close.filter(|close| close.is_finite() && *close != 0.0)
    }
}

/// Daily closes for one instrument, ascending by date. Missing trading days
/// are expected; the series is never re-sorted after construction.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSeries {
    pub symbol: Symbol,
    pub points: Vec<PricePoint>,
}

impl PriceSeries {
    pub fn new(symbol: Symbol, points: Vec<PricePoint>) -> Self {
        Self { symbol, points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// A series needs at least two real closes before it is worth
    /// aligning. Dates whose close is missing do not count.
    pub fn is_usable(&self) -> bool {
        self.points
            .iter()
            .filter(|point| point.usable_close().is_some())
            .nth(1)
            .is_some()
    }
}
