use serde::{Deserialize, Serialize};

use super::AlignedReturnPair;

/// Annualization factor for daily volatility.
pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// OLS statistics of stock returns regressed on market returns.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegressionResult {
    pub beta: f64,
    /// Daily intercept, not annualized.
    pub alpha: f64,
    pub correlation: f64,
    pub r_squared: f64,
    /// Annualized sample standard deviation of stock returns.
    pub volatility: f64,
}

/// Regresses the pair. Returns `None` when there are fewer than two returns,
/// the sequences differ in length, or either side has zero variance.
pub fn regress(pair: &AlignedReturnPair) -> Option<RegressionResult> {
    let n = pair.stock.len();
    if n != pair.market.len() || n < 2 {
        return None;
    }

    let count = n as f64;
    let mean_stock = pair.stock.iter().sum::<f64>() / count;
    let mean_market = pair.market.iter().sum::<f64>() / count;

    let mut covariance = 0.0;
    let mut variance_stock = 0.0;
    let mut variance_market = 0.0;
    for (stock, market) in pair.stock.iter().zip(&pair.market) {
        let diff_stock = stock - mean_stock;
        let diff_market = market - mean_market;
        covariance += diff_stock * diff_market;
        variance_stock += diff_stock * diff_stock;
        variance_market += diff_market * diff_market;
    }

    // Sums of squared deviations; the shared 1/n factor cancels in every ratio.
    if variance_market == 0.0 || variance_stock == 0.0 {
        return None;
    }

    let beta = covariance / variance_market;
    let alpha = mean_stock - beta * mean_market;
    let correlation = covariance / (variance_stock.sqrt() * variance_market.sqrt());
    let volatility = (variance_stock / (count - 1.0)).sqrt() * TRADING_DAYS_PER_YEAR.sqrt();

    let result = RegressionResult {
        beta,
        alpha,
        correlation,
        r_squared: correlation * correlation,
        volatility,
    };
    result.is_finite().then_some(result)
}

impl RegressionResult {
    fn is_finite(&self) -> bool {
        [self.beta, self.alpha, self.correlation, self.r_squared, self.volatility]
            .iter()
            .all(|value| value.is_finite())
    }
}
