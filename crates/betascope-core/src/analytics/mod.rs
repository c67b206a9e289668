//! # Financial Metrics Engine
//!
//! Date alignment of a target series against a benchmark, then OLS
//! regression statistics over the aligned daily returns.
//!
//! ```
//! use betascope_core::analytics::{measure, BenchmarkLookup};
//! use betascope_core::{PricePoint, PriceSeries, Symbol};
//! use time::macros::date;
//!
//! let days = [date!(2024 - 01 - 01), date!(2024 - 01 - 02), date!(2024 - 01 - 03), date!(2024 - 01 - 04)];
//! let series = |symbol: &str, closes: [f64; 4]| {
//!     PriceSeries::new(
//!         Symbol::parse(symbol).unwrap(),
//!         days.iter().zip(closes).map(|(day, close)| PricePoint::new(*day, Some(close))).collect(),
//!     )
//! };
//!
//! let benchmark = BenchmarkLookup::from_series(&series("^NSEI", [200.0, 202.0, 200.0, 208.0]));
//! let stats = measure(&series("TCS.NS", [100.0, 102.0, 101.0, 105.0]), &benchmark).unwrap();
//! assert!(stats.beta > 0.9 && stats.beta < 1.1);
//! ```

mod align;
mod regression;

use thiserror::Error;

pub use align::{align, AlignError, AlignedPrices, AlignedReturnPair, BenchmarkLookup};
pub use regression::{regress, RegressionResult, TRADING_DAYS_PER_YEAR};

use crate::domain::PriceSeries;

/// Why metrics could not be computed for a series.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MetricsError {
    #[error(transparent)]
    Align(#[from] AlignError),
    #[error("regression undefined: stock or market returns have zero variance")]
    Undefined,
}

/// Aligns `target` against the benchmark and regresses the daily returns.
pub fn measure(
    target: &PriceSeries,
    benchmark: &BenchmarkLookup,
) -> Result<RegressionResult, MetricsError> {
    let returns = align(target, benchmark)?.returns();
    regress(&returns).ok_or(MetricsError::Undefined)
}
