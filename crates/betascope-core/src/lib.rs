//! # Betascope Core
//!
//! Equity beta against Indian benchmark indices, plus discovery and
//! ranking of same-industry peers.
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`adapters`] | Yahoo Finance market-data adapter |
//! | [`analytics`] | Date alignment and OLS regression statistics |
//! | [`circuit_breaker`] | Outage guard driven by provider error kinds |
//! | [`config`] | Engine tuning knobs |
//! | [`domain`] | Symbols, exchanges, price series, company data |
//! | [`error`] | Core error types |
//! | [`http_client`] | GET-only HTTP transport |
//! | [`orchestrator`] | End-to-end beta request pipeline |
//! | [`peers`] | Candidate aggregation, verification and ranking |
//! | [`persistence`] | Report sinks (warehouse, memory, no-op) |
//! | [`provider`] | Market-data provider contract |
//! | [`report`] | Request validation, report and response shapes |
//! | [`retry`] | Retry and backoff policy |
//! | [`throttle`] | Outbound request pacing |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use betascope_core::{
//!     BetaOrchestrator, BetaRequestInput, EngineConfig, IndustryTable, YahooConfig, YahooProvider,
//! };
//!
//! let provider = Arc::new(YahooProvider::new(YahooConfig::from_env())?);
//! let table = Arc::new(IndustryTable::from_csv_path("industries.csv")?);
//! let engine = BetaOrchestrator::without_sink(provider, table, EngineConfig::default());
//!
//! let request = BetaRequestInput {
//!     ticker: "TCS".into(),
//!     exchange: "NSE".into(),
//!     start_date: "2020-01-01".into(),
//!     end_date: "2024-01-01".into(),
//!     ..Default::default()
//! }
//! .validate()?;
//! let report = engine.calculate(&request).await?;
//! println!("beta = {:.3}", report.metrics.beta);
//! ```

pub mod adapters;
pub mod analytics;
pub mod circuit_breaker;
pub mod config;
pub mod domain;
pub mod error;
pub mod http_client;
pub mod orchestrator;
pub mod peers;
pub mod persistence;
pub mod provider;
pub mod report;
pub mod retry;
pub mod throttle;

pub use adapters::{YahooConfig, YahooProvider, YahooSession};
pub use analytics::{measure, BenchmarkLookup, MetricsError, RegressionResult};
pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
pub use config::EngineConfig;
pub use domain::{
    Benchmark, CompanyProfile, Exchange, Period, PricePoint, PriceSeries, QuoteSnapshot, SearchHit,
    Symbol,
};
pub use error::{CoreError, ValidationError};
pub use http_client::{
    HttpClient, HttpError, HttpRequest, HttpResponse, ReqwestHttpClient,
};
pub use orchestrator::{alternate_listing, BetaOrchestrator};
pub use peers::{
    CandidateAggregator, CandidateSet, CandidateSource, IndustryTable, PeerVerifier, TargetClass,
    VerifiedPeer,
};
pub use persistence::{MemorySink, NoopSink, ReportSink, SinkError, WarehouseSink};
pub use provider::{HistoryRequest, MarketDataProvider, ProviderError, ProviderErrorKind};
pub use report::{
    BetaError, BetaReport, BetaRequest, BetaRequestInput, BetaResponse, ErrorBody, ErrorClass,
    PeerReport, PeerResponse,
};
pub use retry::{Backoff, RetryPolicy};
pub use throttle::RequestThrottle;
