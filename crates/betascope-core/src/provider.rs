//! # Market-Data Provider Contract
//!
//! Everything the engine needs from a market-data vendor, expressed as narrow
//! result types. Adapters translate vendor payloads into these types and
//! vendor failures into [`ProviderError`]; the engine never sees raw vendor
//! data.

use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;

use time::Date;

use crate::domain::{CompanyProfile, PriceSeries, QuoteSnapshot, SearchHit, Symbol};

/// Failure class reported by a provider call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderErrorKind {
    Unavailable,
    RateLimited,
    InvalidRequest,
    NotFound,
    Malformed,
    Internal,
}

impl ProviderErrorKind {
    /// Failures that say the upstream itself is struggling, as opposed to
    /// an answer about the request.
    pub const fn is_outage(self) -> bool {
        matches!(self, Self::Unavailable | Self::RateLimited | Self::Internal)
    }
}

/// Structured provider error with a stable machine code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderError {
    kind: ProviderErrorKind,
    message: String,
    retryable: bool,
}

impl ProviderError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::build(ProviderErrorKind::Unavailable, message, true)
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::build(ProviderErrorKind::RateLimited, message, true)
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::build(ProviderErrorKind::InvalidRequest, message, false)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::build(ProviderErrorKind::NotFound, message, false)
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::build(ProviderErrorKind::Malformed, message, false)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::build(ProviderErrorKind::Internal, message, false)
    }

    fn build(kind: ProviderErrorKind, message: impl Into<String>, retryable: bool) -> Self {
        Self {
            kind,
            message: message.into(),
            retryable,
        }
    }

    pub const fn kind(&self) -> ProviderErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn retryable(&self) -> bool {
        self.retryable
    }

    pub const fn code(&self) -> &'static str {
        match self.kind {
            ProviderErrorKind::Unavailable => "provider.unavailable",
            ProviderErrorKind::RateLimited => "provider.rate_limited",
            ProviderErrorKind::InvalidRequest => "provider.invalid_request",
            ProviderErrorKind::NotFound => "provider.not_found",
            ProviderErrorKind::Malformed => "provider.malformed",
            ProviderErrorKind::Internal => "provider.internal",
        }
    }
}

impl Display for ProviderError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code())
    }
}

impl std::error::Error for ProviderError {}

/// Daily history request. `start` is inclusive, `end` exclusive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryRequest {
    pub symbol: Symbol,
    pub start: Date,
    pub end: Date,
}

impl HistoryRequest {
    pub fn new(symbol: Symbol, start: Date, end: Date) -> Result<Self, ProviderError> {
        if start >= end {
            return Err(ProviderError::invalid_request(format!(
                "history window start {start} must be before end {end}"
            )));
        }
        Ok(Self { symbol, start, end })
    }

    /// Same window for another instrument.
    pub fn for_symbol(&self, symbol: Symbol) -> Self {
        Self {
            symbol,
            start: self.start,
            end: self.end,
        }
    }
}

/// Market-data collaborator used by the metrics and peer engines.
///
/// Every call is best-effort. Callers treat an error as an absent result.
pub trait MarketDataProvider: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &'static str;

    /// Daily closes, ascending by date.
    fn fetch_history<'a>(
        &'a self,
        request: &'a HistoryRequest,
    ) -> Pin<Box<dyn Future<Output = Result<PriceSeries, ProviderError>> + Send + 'a>>;

    fn fetch_quote<'a>(
        &'a self,
        symbol: &'a Symbol,
    ) -> Pin<Box<dyn Future<Output = Result<QuoteSnapshot, ProviderError>> + Send + 'a>>;

    fn fetch_profile<'a>(
        &'a self,
        symbol: &'a Symbol,
    ) -> Pin<Box<dyn Future<Output = Result<CompanyProfile, ProviderError>> + Send + 'a>>;

    fn search<'a>(
        &'a self,
        query: &'a str,
        limit: usize,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<SearchHit>, ProviderError>> + Send + 'a>>;

    /// Symbols the vendor recommends as related to `symbol`.
    fn related_symbols<'a>(
        &'a self,
        symbol: &'a Symbol,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Symbol>, ProviderError>> + Send + 'a>>;
}
