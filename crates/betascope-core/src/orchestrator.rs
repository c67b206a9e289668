//! # Beta Orchestrator
//!
//! Drives one request through its stages:
//!
//! ```text
//! RESOLVE_TICKER -> FETCH_TARGET_AND_BENCHMARK -> COMPUTE_TARGET_METRICS
//!   -> DISCOVER_PEERS -> VERIFY_AND_RANK_PEERS -> COMPUTE_PEER_METRICS
//!   -> ASSEMBLE_REPORT
//! ```
//!
//! Target failures end the request. Peer failures only shrink or null the
//! peer list.

use std::future::Future;
use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::Semaphore;
use tracing::Instrument;
use uuid::Uuid;

use crate::analytics::{measure, BenchmarkLookup};
use crate::config::EngineConfig;
use crate::domain::{Exchange, PriceSeries, QuoteSnapshot, Symbol};
use crate::peers::{CandidateAggregator, IndustryTable, PeerVerifier, TargetClass, VerifiedPeer};
use crate::persistence::{NoopSink, ReportSink};
use crate::provider::{HistoryRequest, MarketDataProvider, ProviderError};
use crate::report::{BetaError, BetaReport, BetaRequest, PeerReport};

/// Listing of the same base symbol on the other national exchange.
pub fn alternate_listing(symbol: &Symbol, exchange: Exchange) -> Symbol {
    let listed_on = symbol.exchange().unwrap_or(exchange);
    symbol.on_exchange(listed_on.alternate())
}

/// History and quote fetched for one listing.
struct Listing {
    symbol: Symbol,
    history: Option<PriceSeries>,
    quote: Option<QuoteSnapshot>,
}

impl Listing {
    fn is_usable(&self) -> bool {
        self.history.as_ref().is_some_and(PriceSeries::is_usable)
    }
}

pub struct BetaOrchestrator {
    provider: Arc<dyn MarketDataProvider>,
    table: Arc<IndustryTable>,
    sink: Arc<dyn ReportSink>,
    config: EngineConfig,
    aggregator: CandidateAggregator,
    verifier: PeerVerifier,
}

impl BetaOrchestrator {
    pub fn new(
        provider: Arc<dyn MarketDataProvider>,
        table: Arc<IndustryTable>,
        sink: Arc<dyn ReportSink>,
        config: EngineConfig,
    ) -> Self {
        let aggregator = CandidateAggregator::new(
            Arc::clone(&provider),
            Arc::clone(&table),
            config.search_threshold,
            config.search_limit,
        );
        let verifier = PeerVerifier::new(
            Arc::clone(&provider),
            Arc::clone(&table),
            config.max_concurrency,
            config.max_peers,
        );
        Self {
            provider,
            table,
            sink,
            config,
            aggregator,
            verifier,
        }
    }

    /// Orchestrator that persists nothing.
    pub fn without_sink(
        provider: Arc<dyn MarketDataProvider>,
        table: Arc<IndustryTable>,
        config: EngineConfig,
    ) -> Self {
        Self::new(provider, table, Arc::new(NoopSink), config)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Runs a full beta calculation for `request`.
    pub async fn calculate(&self, request: &BetaRequest) -> Result<BetaReport, BetaError> {
        let request_id = Uuid::new_v4();
        let span = tracing::info_span!(
            "beta_request",
            request_id = %request_id,
            ticker = %request.ticker,
            exchange = %request.exchange
        );
        self.run(request_id, request).instrument(span).await
    }

    async fn run(&self, request_id: Uuid, request: &BetaRequest) -> Result<BetaReport, BetaError> {
        let exchange = request.exchange;
        let primary = exchange.resolve(&request.ticker);
        let benchmark = exchange.benchmark();
        let window = HistoryRequest::new(primary.clone(), request.start, request.end)
            .map_err(|error| BetaError::Internal(error.to_string()))?;
        tracing::info!(symbol = %primary, benchmark = %benchmark.symbol, "resolved ticker");

        let benchmark_window = window.for_symbol(benchmark.symbol.clone());
        let (benchmark_history, mut target) = tokio::join!(
            self.provider.fetch_history(&benchmark_window),
            self.fetch_listing(&window, primary.clone(), None),
        );

        if !target.is_usable() {
            let alternate = alternate_listing(&primary, exchange);
            tracing::info!(primary = %primary, alternate = %alternate, "no usable history, trying alternate listing");
            target = self.fetch_listing(&window, alternate, None).await;
            if !target.is_usable() {
                return Err(BetaError::TargetUnavailable { ticker: primary });
            }
        }

        let benchmark_history = match benchmark_history {
            Ok(series) if series.is_usable() => series,
            Ok(_) => {
                tracing::warn!(index = %benchmark.symbol, "benchmark history is empty");
                return Err(BetaError::BenchmarkUnavailable {
                    index: benchmark.symbol,
                });
            }
            Err(error) => {
                tracing::warn!(index = %benchmark.symbol, error = %error, "benchmark history unavailable");
                return Err(BetaError::BenchmarkUnavailable {
                    index: benchmark.symbol,
                });
            }
        };

        let Listing {
            symbol: resolved,
            history,
            quote,
        } = target;
        let history = history.ok_or_else(|| BetaError::Internal(String::from("usable listing without history")))?;
        let lookup = BenchmarkLookup::from_series(&benchmark_history);
        let metrics = measure(&history, &lookup).map_err(|error| {
            tracing::info!(symbol = %resolved, reason = %error, "target metrics unavailable");
            BetaError::InsufficientData(error)
        })?;
        tracing::info!(symbol = %resolved, beta = metrics.beta, points = history.len(), "target metrics computed");

        let name = quote
            .as_ref()
            .and_then(QuoteSnapshot::headline_name)
            .unwrap_or(request.ticker.as_str())
            .to_owned();

        let ranked = self.rank_peers(&resolved).await;
        let window = window.for_symbol(resolved.clone());
        let peers = self.peer_reports(&ranked, &window, &lookup, exchange).await;
        let dropped_peers = ranked.len() - peers.len();
        tracing::info!(peers = peers.len(), dropped = dropped_peers, "peer metrics computed");

        let report = BetaReport {
            request_id,
            ticker: resolved,
            exchange,
            name,
            benchmark,
            period: request.period,
            start: request.start,
            end: request.end,
            metrics,
            peers,
            dropped_peers,
        };

        if let Err(error) = self.sink.record(&report).await {
            tracing::warn!(error = %error, "failed to persist report");
        }
        Ok(report)
    }

    /// Discovery and ranking only, for a ticker on `exchange`.
    pub async fn discover_peers(&self, ticker: &Symbol, exchange: Exchange) -> Vec<VerifiedPeer> {
        let symbol = exchange.resolve(ticker);
        let span = tracing::info_span!("peer_discovery", ticker = %symbol);
        self.rank_peers(&symbol).instrument(span).await
    }

    async fn rank_peers(&self, target: &Symbol) -> Vec<VerifiedPeer> {
        let profile = match self.provider.fetch_profile(target).await {
            Ok(profile) => profile,
            Err(error) => {
                tracing::warn!(symbol = %target, error = %error, "target profile unavailable, skipping peers");
                return Vec::new();
            }
        };

        let candidates = self.aggregator.collect(target, profile.industry()).await;
        let class = TargetClass::new(target, &profile, &self.table);
        self.verifier.verify_and_rank(class, &candidates).await
    }

    /// Peer metrics under the shared concurrency limit, one permit per
    /// provider call. Output keeps rank order regardless of completion order.
    async fn peer_reports(
        &self,
        ranked: &[VerifiedPeer],
        window: &HistoryRequest,
        lookup: &BenchmarkLookup,
        exchange: Exchange,
    ) -> Vec<PeerReport> {
        let semaphore = Semaphore::new(self.config.max_concurrency.max(1));
        let tasks = ranked
            .iter()
            .map(|peer| self.peer_report(peer, window, lookup, exchange, &semaphore));
        join_all(tasks).await.into_iter().flatten().collect()
    }

    async fn peer_report(
        &self,
        peer: &VerifiedPeer,
        window: &HistoryRequest,
        lookup: &BenchmarkLookup,
        exchange: Exchange,
        limit: &Semaphore,
    ) -> Option<PeerReport> {
        let mut listing = self
            .fetch_listing(window, peer.symbol.clone(), Some(limit))
            .await;
        if !listing.is_usable() {
            let alternate = alternate_listing(&peer.symbol, exchange);
            tracing::debug!(peer = %peer.symbol, alternate = %alternate, "peer history unusable, trying alternate listing");
            let fallback = self.fetch_listing(window, alternate, Some(limit)).await;
            listing = Listing {
                quote: fallback.quote.or(listing.quote),
                ..fallback
            };
        }

        let Some(history) = listing.history.filter(PriceSeries::is_usable) else {
            tracing::debug!(peer = %peer.symbol, "dropping peer without price history");
            return None;
        };

        let metrics = match measure(&history, lookup) {
            Ok(metrics) => Some(metrics),
            Err(error) => {
                tracing::debug!(peer = %peer.symbol, reason = %error, "peer metrics unavailable");
                None
            }
        };

        let name = listing
            .quote
            .as_ref()
            .and_then(QuoteSnapshot::compact_name)
            .or(peer.display_name.as_deref())
            .unwrap_or(peer.symbol.as_str())
            .to_owned();

        Some(PeerReport {
            peer: peer.clone(),
            name,
            metrics,
        })
    }

    async fn fetch_listing(
        &self,
        window: &HistoryRequest,
        symbol: Symbol,
        limit: Option<&Semaphore>,
    ) -> Listing {
        let request = window.for_symbol(symbol);
        let (history, quote) = tokio::join!(
            limited(limit, self.provider.fetch_history(&request)),
            limited(limit, self.provider.fetch_quote(&request.symbol)),
        );
        Listing {
            history: absent_on_error(&request.symbol, "history", history),
            quote: absent_on_error(&request.symbol, "quote", quote),
            symbol: request.symbol,
        }
    }
}

/// Runs `call` while holding one permit of `limit`, if there is one.
async fn limited<T>(limit: Option<&Semaphore>, call: impl Future<Output = T>) -> T {
    let _permit = match limit {
        Some(semaphore) => semaphore.acquire().await.ok(),
        None => None,
    };
    call.await
}

fn absent_on_error<T>(symbol: &Symbol, call: &'static str, result: Result<T, ProviderError>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(error) => {
            tracing::debug!(symbol = %symbol, call, code = error.code(), error = %error, "provider call failed");
            None
        }
    }
}

impl std::fmt::Debug for BetaOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BetaOrchestrator")
            .field("provider", &self.provider.name())
            .field("industry_table", &self.table.len())
            .field("config", &self.config)
            .finish()
    }
}
