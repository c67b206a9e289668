//! # Request and Report Types
//!
//! [`BetaRequestInput`] is the raw camelCase payload, validated into a
//! [`BetaRequest`]. The orchestrator produces a [`BetaReport`], which is
//! rendered on the wire as a [`BetaResponse`]. Failures surface as
//! [`BetaError`] with a status code and an [`ErrorBody`] that never carries
//! provider internals.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::{Date, Duration};
use uuid::Uuid;

use crate::analytics::{MetricsError, RegressionResult};
use crate::domain::{parse_iso_date, Benchmark, Exchange, Period, Symbol};
use crate::peers::VerifiedPeer;
use crate::ValidationError;

/// Unvalidated request as received from a caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BetaRequestInput {
    pub ticker: String,
    pub exchange: String,
    pub period: Option<String>,
    pub start_date: String,
    pub end_date: String,
}

impl BetaRequestInput {
    /// Validates fields in declaration order and reports the first failure
    /// with its field name.
    pub fn validate(&self) -> Result<BetaRequest, BetaError> {
        let (ticker, exchange, period) = self.identity()?;
        let start = parse_iso_date(&self.start_date).map_err(|source| BetaError::invalid("startDate", source))?;
        let end = parse_iso_date(&self.end_date).map_err(|source| BetaError::invalid("endDate", source))?;

        BetaRequest::new(ticker, exchange, period, start, end)
    }

    /// Like [`validate`](Self::validate), but derives the window from the
    /// period. `startDate` is ignored; a blank `endDate` means `default_end`.
    pub fn validate_trailing(&self, default_end: Date) -> Result<BetaRequest, BetaError> {
        let (ticker, exchange, period) = self.identity()?;
        let end = match self.end_date.trim() {
            "" => default_end,
            raw => parse_iso_date(raw).map_err(|source| BetaError::invalid("endDate", source))?,
        };
        BetaRequest::trailing(ticker, exchange, period, end)
    }

    fn identity(&self) -> Result<(Symbol, Exchange, Period), BetaError> {
        let ticker = Symbol::parse(&self.ticker).map_err(|source| BetaError::invalid("ticker", source))?;
        let exchange = self
            .exchange
            .parse::<Exchange>()
            .map_err(|source| BetaError::invalid("exchange", source))?;
        let period = match self.period.as_deref().map(str::trim) {
            None | Some("") => Period::default(),
            Some(value) => value
                .parse::<Period>()
                .map_err(|source| BetaError::invalid("period", source))?,
        };
        Ok((ticker, exchange, period))
    }
}

/// Validated beta request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BetaRequest {
    pub ticker: Symbol,
    pub exchange: Exchange,
    pub period: Period,
    pub start: Date,
    pub end: Date,
}

impl BetaRequest {
    pub fn new(
        ticker: Symbol,
        exchange: Exchange,
        period: Period,
        start: Date,
        end: Date,
    ) -> Result<Self, BetaError> {
        if start >= end {
            return Err(BetaError::invalid(
                "endDate",
                ValidationError::InvalidDateRange {
                    start: start.to_string(),
                    end: end.to_string(),
                },
            ));
        }
        Ok(Self {
            ticker,
            exchange,
            period,
            start,
            end,
        })
    }

    /// Window of `period` years ending at `end`.
    pub fn trailing(
        ticker: Symbol,
        exchange: Exchange,
        period: Period,
        end: Date,
    ) -> Result<Self, BetaError> {
        let start = end
            .replace_year(end.year() - period.years())
            .unwrap_or_else(|_| end - Duration::days(365 * i64::from(period.years())));
        Self::new(ticker, exchange, period, start, end)
    }
}

/// Metrics for one verified peer; `metrics` is `None` when its own data
/// could not support a regression.
#[derive(Debug, Clone, PartialEq)]
pub struct PeerReport {
    pub peer: VerifiedPeer,
    pub name: String,
    pub metrics: Option<RegressionResult>,
}

/// Outcome of one beta calculation. Built once, never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct BetaReport {
    pub request_id: Uuid,
    /// Listing whose history produced the metrics. After an exchange
    /// fallback this is the alternate listing rather than the requested
    /// one, and the persisted search records it the same way.
    pub ticker: Symbol,
    pub exchange: Exchange,
    pub name: String,
    pub benchmark: Benchmark,
    pub period: Period,
    pub start: Date,
    pub end: Date,
    pub metrics: RegressionResult,
    /// Rank order: ascending market-cap distance.
    pub peers: Vec<PeerReport>,
    /// Ranked peers left out because no price history could be fetched.
    pub dropped_peers: usize,
}

/// Wire shape of a successful response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BetaResponse {
    pub ticker: String,
    pub name: String,
    pub market_index: String,
    pub beta: f64,
    pub volatility: f64,
    pub alpha: f64,
    pub correlation: f64,
    pub r_squared: f64,
    pub period: String,
    pub peers: Vec<PeerResponse>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeerResponse {
    pub ticker: String,
    pub name: String,
    pub beta: Option<f64>,
    pub volatility: Option<f64>,
    pub alpha: Option<f64>,
    pub correlation: Option<f64>,
    pub r_squared: Option<f64>,
    pub market_cap: f64,
    pub sector: String,
}

impl From<&PeerReport> for PeerResponse {
    fn from(report: &PeerReport) -> Self {
        let metrics = report.metrics.as_ref();
        Self {
            ticker: report.peer.symbol.to_string(),
            name: report.name.clone(),
            beta: metrics.map(|m| m.beta),
            volatility: metrics.map(|m| m.volatility),
            alpha: metrics.map(|m| m.alpha),
            correlation: metrics.map(|m| m.correlation),
            r_squared: metrics.map(|m| m.r_squared),
            market_cap: report.peer.market_cap,
            sector: report.peer.sector_path.clone(),
        }
    }
}

impl From<&BetaReport> for BetaResponse {
    fn from(report: &BetaReport) -> Self {
        Self {
            ticker: report.ticker.to_string(),
            name: report.name.clone(),
            market_index: report.benchmark.label.to_owned(),
            beta: report.metrics.beta,
            volatility: report.metrics.volatility,
            alpha: report.metrics.alpha,
            correlation: report.metrics.correlation,
            r_squared: report.metrics.r_squared,
            period: report.period.to_string(),
            peers: report.peers.iter().map(PeerResponse::from).collect(),
        }
    }
}

/// Error payload returned to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

/// Failure class of a beta request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Validation,
    UpstreamUnavailable,
    InsufficientData,
    Internal,
}

#[derive(Debug, Error)]
pub enum BetaError {
    #[error("{source}")]
    Validation {
        field: &'static str,
        #[source]
        source: ValidationError,
    },

    /// No usable history for the target on either exchange.
    #[error("Failed to fetch data for {ticker}. Check ticker or date range.")]
    TargetUnavailable { ticker: Symbol },

    #[error("Failed to fetch market index data")]
    BenchmarkUnavailable { index: Symbol },

    #[error("Insufficient data points to calculate metrics")]
    InsufficientData(#[source] MetricsError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl BetaError {
    pub fn invalid(field: &'static str, source: ValidationError) -> Self {
        Self::Validation { field, source }
    }

    pub const fn class(&self) -> ErrorClass {
        match self {
            Self::Validation { .. } => ErrorClass::Validation,
            Self::TargetUnavailable { .. } | Self::BenchmarkUnavailable { .. } => {
                ErrorClass::UpstreamUnavailable
            }
            Self::InsufficientData(_) => ErrorClass::InsufficientData,
            Self::Internal(_) => ErrorClass::Internal,
        }
    }

    /// HTTP-equivalent status code.
    pub const fn status(&self) -> u16 {
        match self {
            Self::Validation { .. } | Self::InsufficientData(_) => 400,
            Self::TargetUnavailable { .. } => 404,
            Self::BenchmarkUnavailable { .. } | Self::Internal(_) => 500,
        }
    }

    pub fn field(&self) -> Option<&'static str> {
        match self {
            Self::Validation { field, .. } => Some(*field),
            _ => None,
        }
    }

    /// Message safe to show a caller.
    pub fn public_message(&self) -> String {
        match self {
            Self::Internal(_) => String::from("Internal server error"),
            other => other.to_string(),
        }
    }

    pub fn to_body(&self) -> ErrorBody {
        ErrorBody {
            message: self.public_message(),
            field: self.field().map(str::to_owned),
        }
    }
}
