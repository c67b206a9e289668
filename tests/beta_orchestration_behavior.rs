//! Behavior-driven tests for the beta orchestrator: ticker resolution,
//! exchange fallback, target failure classes, peer degradation and report
//! persistence.

mod support;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use betascope_core::{
    BetaError, BetaOrchestrator, BetaReport, BetaRequest, BetaResponse, EngineConfig, Exchange,
    IndustryTable, MemorySink, NoopSink, Period, PricePoint, PriceSeries, ReportSink, SinkError,
    WarehouseSink,
};
use time::macros::date;
use time::{Date, Duration};

use support::{
    closes_from_returns, market_returns, profile, quote, series, symbol, trading_days,
    ScriptedProvider,
};

const DAYS: usize = 40;

fn days() -> Vec<Date> {
    trading_days(date!(2023 - 01 - 02), DAYS)
}

fn request(ticker: &str, exchange: Exchange) -> BetaRequest {
    let days = days();
    let end = *days.last().expect("non-empty") + Duration::days(1);
    BetaRequest::new(symbol(ticker), exchange, Period::OneYear, days[0], end).expect("valid window")
}

fn benchmark(index: &str) -> PriceSeries {
    series(index, &days(), &closes_from_returns(20_000.0, &market_returns(DAYS - 1)))
}

/// Closes whose daily returns are exactly `beta * market + drift`.
fn stock(raw: &str, beta: f64, drift: f64) -> PriceSeries {
    let returns: Vec<f64> = market_returns(DAYS - 1)
        .iter()
        .map(|market| beta * market + drift)
        .collect();
    series(raw, &days(), &closes_from_returns(1_000.0, &returns))
}

/// Every trading day present, every close missing.
fn blank(raw: &str) -> PriceSeries {
    PriceSeries::new(
        symbol(raw),
        days().into_iter().map(|day| PricePoint::new(day, None)).collect(),
    )
}

fn flat(raw: &str) -> PriceSeries {
    series(raw, &days(), &[500.0; DAYS])
}

fn engine(provider: Arc<ScriptedProvider>, table: IndustryTable, sink: Arc<dyn ReportSink>) -> BetaOrchestrator {
    BetaOrchestrator::new(provider, Arc::new(table), sink, EngineConfig::default())
}

/// TCS on NSE with three same-industry peers.
fn it_services_market() -> ScriptedProvider {
    ScriptedProvider::new()
        .with_history(benchmark("^NSEI"))
        .with_history(stock("TCS.NS", 1.2, 0.0005))
        .with_quote("TCS.NS", quote("Tata Consultancy Services Limited", "TCS"))
        .with_profile("TCS.NS", profile("Information Technology Services", "Technology", 1_000.0))
        .with_related("TCS.NS", &["INFY.NS", "WIPRO.NS", "HCLTECH.NS"])
        .with_profile("INFY.NS", profile("Information Technology Services", "Technology", 700.0))
        .with_profile("WIPRO.NS", profile("Information Technology Services", "Technology", 300.0))
        .with_profile("HCLTECH.NS", profile("Information Technology Services", "Technology", 1_050.0))
        .with_history(stock("INFY.NS", 0.9, 0.0))
        .with_history(stock("WIPRO.NS", 0.7, -0.0002))
        .with_history(stock("HCLTECH.NS", 1.1, 0.0001))
        .with_quote("INFY.NS", quote("Infosys Limited", "Infosys"))
        .with_quote("WIPRO.NS", quote("Wipro Limited", "Wipro"))
        .with_quote("HCLTECH.NS", quote("HCL Technologies Limited", "HCL Tech"))
}

// =============================================================================
// Happy path
// =============================================================================

#[tokio::test]
async fn when_target_and_peers_have_data_system_reports_ranked_peer_metrics() {
    // Given: a full market for TCS and a recording sink
    let provider = Arc::new(it_services_market());
    let sink = Arc::new(MemorySink::new());
    let engine = engine(provider, IndustryTable::empty(), sink.clone());

    // When: beta is calculated
    let report = engine
        .calculate(&request("TCS", Exchange::Nse))
        .await
        .expect("report");

    // Then: target metrics recover the loading used to build the series
    assert_eq!(report.ticker.as_str(), "TCS.NS");
    assert_eq!(report.name, "Tata Consultancy Services Limited");
    assert_eq!(report.benchmark.label, "NIFTY 50");
    assert!((report.metrics.beta - 1.2).abs() < 1e-9);
    assert!((report.metrics.r_squared - 1.0).abs() < 1e-9);

    // And: peers follow cap distance and use short names
    let order: Vec<&str> = report.peers.iter().map(|peer| peer.peer.symbol.as_str()).collect();
    assert_eq!(order, vec!["HCLTECH.NS", "INFY.NS", "WIPRO.NS"]);
    let names: Vec<&str> = report.peers.iter().map(|peer| peer.name.as_str()).collect();
    assert_eq!(names, vec!["HCL Tech", "Infosys", "Wipro"]);
    let infy = report.peers[1].metrics.expect("infy metrics");
    assert!((infy.beta - 0.9).abs() < 1e-9);
    assert_eq!(report.dropped_peers, 0);

    // And: the report was persisted once
    let records = sink.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].ticker, "TCS.NS");
    assert_eq!(records[0].exchange, "NSE");
    assert_eq!(records[0].peers.as_array().map(Vec::len), Some(3));
}

#[tokio::test]
async fn when_report_is_serialized_system_uses_camel_case_wire_shape() {
    let provider = Arc::new(
        it_services_market()
            .with_history(flat("WIPRO.NS")),
    );
    let engine = engine(provider, IndustryTable::empty(), Arc::new(NoopSink));

    let report = engine
        .calculate(&request("TCS", Exchange::Nse))
        .await
        .expect("report");
    let json = serde_json::to_value(BetaResponse::from(&report)).expect("serializes");

    assert_eq!(json["ticker"], "TCS.NS");
    assert_eq!(json["marketIndex"], "NIFTY 50");
    assert_eq!(json["period"], "1Y");
    assert!(json["rSquared"].is_f64());
    let wipro = &json["peers"][2];
    assert_eq!(wipro["ticker"], "WIPRO.NS");
    assert_eq!(wipro["marketCap"], 300.0);
    assert_eq!(wipro["sector"], "Technology > Information Technology Services");
    assert!(wipro["beta"].is_null());
    assert!(wipro["rSquared"].is_null());
}

// =============================================================================
// Ticker resolution and fallback
// =============================================================================

#[tokio::test]
async fn scenario_d_unsuffixed_ticker_on_bse_resolves_before_any_call() {
    // Given: data only for the BSE listing
    let provider = Arc::new(
        ScriptedProvider::new()
            .with_history(benchmark("^BSESN"))
            .with_history(stock("RELIANCE.BO", 0.8, 0.0))
            .with_quote("RELIANCE.BO", quote("Reliance Industries Limited", "RELIANCE")),
    );
    let engine = engine(provider.clone(), IndustryTable::empty(), Arc::new(NoopSink));

    // When: an unsuffixed ticker is requested on BSE
    let report = engine
        .calculate(&request("RELIANCE", Exchange::Bse))
        .await
        .expect("report");

    // Then: every call used the BSE symbol, never the bare ticker
    assert_eq!(report.ticker.as_str(), "RELIANCE.BO");
    assert_eq!(report.benchmark.label, "BSE SENSEX");
    let histories = provider.calls_to("history");
    assert_eq!(histories[..2], ["^BSESN", "RELIANCE.BO"]);
    assert!(provider
        .calls()
        .iter()
        .all(|call| !call.ends_with(" RELIANCE") && !call.ends_with(" RELIANCE.NS")));
}

#[tokio::test]
async fn when_primary_listing_has_no_history_system_falls_back_to_alternate_exchange() {
    // Given: NSE requested, only the BSE listing has prices
    let provider = Arc::new(
        ScriptedProvider::new()
            .with_history(benchmark("^NSEI"))
            .with_history(stock("SBIN.BO", 1.4, 0.0))
            .with_quote("SBIN.NS", quote("", ""))
            .with_quote("SBIN.BO", quote("State Bank of India", "SBI")),
    );
    let engine = engine(provider.clone(), IndustryTable::empty(), Arc::new(NoopSink));

    // When: beta is calculated
    let report = engine
        .calculate(&request("SBIN", Exchange::Nse))
        .await
        .expect("fallback succeeds");

    // Then: the alternate listing produced the metrics and the name
    assert_eq!(report.ticker.as_str(), "SBIN.BO");
    assert_eq!(report.name, "State Bank of India");
    assert!((report.metrics.beta - 1.4).abs() < 1e-9);
    assert_eq!(report.benchmark.label, "NIFTY 50");
    assert_eq!(provider.calls_to("history"), vec!["^NSEI", "SBIN.NS", "SBIN.BO"]);
}

#[tokio::test]
async fn when_primary_listing_has_only_missing_closes_system_falls_back_to_alternate_exchange() {
    // Given: the NSE chart has every date but no closes; BSE has prices
    let provider = Arc::new(
        ScriptedProvider::new()
            .with_history(benchmark("^NSEI"))
            .with_history(blank("TCS.NS"))
            .with_history(stock("TCS.BO", 1.2, 0.0))
            .with_quote("TCS.BO", quote("Tata Consultancy Services Limited", "TCS")),
    );
    let engine = engine(provider.clone(), IndustryTable::empty(), Arc::new(NoopSink));

    // When: beta is calculated
    let report = engine
        .calculate(&request("TCS", Exchange::Nse))
        .await
        .expect("fallback succeeds");

    // Then: the gap-only series was treated as unusable and BSE was tried
    assert_eq!(provider.calls_to("history"), vec!["^NSEI", "TCS.NS", "TCS.BO"]);
    assert_eq!(report.ticker.as_str(), "TCS.BO");
    assert!((report.metrics.beta - 1.2).abs() < 1e-9);
}

// =============================================================================
// Target failures
// =============================================================================

#[tokio::test]
async fn when_target_has_no_history_on_either_exchange_request_fails_with_404() {
    let provider = Arc::new(ScriptedProvider::new().with_history(benchmark("^NSEI")));
    let sink = Arc::new(MemorySink::new());
    let engine = engine(provider, IndustryTable::empty(), sink.clone());

    let error = engine
        .calculate(&request("NOSUCH", Exchange::Nse))
        .await
        .expect_err("no data");

    assert!(matches!(error, BetaError::TargetUnavailable { .. }));
    assert_eq!(error.status(), 404);
    assert_eq!(
        error.to_body().message,
        "Failed to fetch data for NOSUCH.NS. Check ticker or date range."
    );
    assert!(sink.records().is_empty());
}

#[tokio::test]
async fn when_benchmark_is_unavailable_request_fails_with_generic_index_error() {
    let provider = Arc::new(ScriptedProvider::new().with_history(stock("TCS.NS", 1.0, 0.0)));
    let engine = engine(provider, IndustryTable::empty(), Arc::new(NoopSink));

    let error = engine
        .calculate(&request("TCS.NS", Exchange::Nse))
        .await
        .expect_err("no benchmark");

    assert!(matches!(error, BetaError::BenchmarkUnavailable { .. }));
    assert_eq!(error.status(), 500);
    assert_eq!(error.to_body().message, "Failed to fetch market index data");
    assert_eq!(error.to_body().field, None);
}

#[tokio::test]
async fn when_target_regression_is_undefined_request_fails_with_insufficient_data() {
    // Given: a target whose price never moved
    let provider = Arc::new(
        ScriptedProvider::new()
            .with_history(benchmark("^NSEI"))
            .with_history(flat("IDLE.NS")),
    );
    let sink = Arc::new(MemorySink::new());
    let engine = engine(provider, IndustryTable::empty(), sink.clone());

    // When: beta is calculated
    let error = engine
        .calculate(&request("IDLE", Exchange::Nse))
        .await
        .expect_err("undefined");

    // Then: a 400 with the insufficient-data message, nothing persisted
    assert!(matches!(error, BetaError::InsufficientData(_)));
    assert_eq!(error.status(), 400);
    assert_eq!(error.to_body().message, "Insufficient data points to calculate metrics");
    assert!(sink.records().is_empty());
}

// =============================================================================
// Peer degradation
// =============================================================================

#[tokio::test]
async fn when_peer_data_is_partial_system_falls_back_nulls_or_drops_per_peer() {
    // Given: INFY priced only on BSE, WIPRO flat, HCLTECH with no prices at all
    let provider = Arc::new(
        ScriptedProvider::new()
            .with_history(benchmark("^NSEI"))
            .with_history(stock("TCS.NS", 1.2, 0.0))
            .with_profile("TCS.NS", profile("Information Technology Services", "Technology", 1_000.0))
            .with_related("TCS.NS", &["INFY.NS", "WIPRO.NS", "HCLTECH.NS"])
            .with_profile("INFY.NS", profile("Information Technology Services", "Technology", 900.0))
            .with_profile("WIPRO.NS", profile("Information Technology Services", "Technology", 800.0))
            .with_profile("HCLTECH.NS", profile("Information Technology Services", "Technology", 950.0))
            .with_history(stock("INFY.BO", 0.95, 0.0))
            .with_quote("INFY.BO", quote("Infosys Limited", "Infosys"))
            .with_history(flat("WIPRO.NS")),
    );
    let engine = engine(provider, IndustryTable::empty(), Arc::new(NoopSink));

    // When: beta is calculated
    let report = engine
        .calculate(&request("TCS", Exchange::Nse))
        .await
        .expect("target is fine");

    // Then: INFY recovered via BSE, WIPRO kept without metrics, HCLTECH dropped
    assert_eq!(report.peers.len(), 2);
    assert_eq!(report.dropped_peers, 1);

    let infy = &report.peers[0];
    assert_eq!(infy.peer.symbol.as_str(), "INFY.NS");
    assert_eq!(infy.name, "Infosys");
    assert!((infy.metrics.expect("fallback metrics").beta - 0.95).abs() < 1e-9);

    let wipro = &report.peers[1];
    assert_eq!(wipro.peer.symbol.as_str(), "WIPRO.NS");
    assert_eq!(wipro.metrics, None);
    assert_eq!(wipro.name, "WIPRO.NS");
}

#[tokio::test]
async fn when_target_profile_is_missing_report_has_no_peers() {
    let provider = Arc::new(
        ScriptedProvider::new()
            .with_history(benchmark("^NSEI"))
            .with_history(stock("TCS.NS", 1.2, 0.0))
            .with_related("TCS.NS", &["INFY.NS"]),
    );
    let engine = engine(provider.clone(), IndustryTable::empty(), Arc::new(NoopSink));

    let report = engine
        .calculate(&request("TCS", Exchange::Nse))
        .await
        .expect("report");

    assert!(report.peers.is_empty());
    assert_eq!(report.name, "TCS");
    assert!(provider.calls_to("related").is_empty());
}

#[tokio::test]
async fn when_industry_table_lists_peers_system_uses_them_without_provider_hints() {
    // Given: no recommendation feed, the table lists two cement makers
    let table = IndustryTable::from_rows([
        ("ULTRACEMCO", "UltraTech Cement", "Cement"),
        ("ACC", "ACC Ltd", "Cement"),
        ("AMBUJACEM", "Ambuja Cements", "Cement"),
    ]);
    let provider = Arc::new(
        ScriptedProvider::new()
            .with_history(benchmark("^NSEI"))
            .with_history(stock("ULTRACEMCO.NS", 0.6, 0.0))
            .with_profile("ULTRACEMCO.NS", profile("Building Materials", "Basic Materials", 3_000.0))
            .with_profile("ACC.NS", profile("Construction Materials", "Basic Materials", 400.0))
            .with_profile("AMBUJACEM.NS", profile("Building Materials", "Basic Materials", 1_200.0))
            .with_history(stock("ACC.NS", 0.5, 0.0))
            .with_history(stock("AMBUJACEM.NS", 0.7, 0.0)),
    );
    let engine = engine(provider, table, Arc::new(NoopSink));

    // When: beta is calculated
    let report = engine
        .calculate(&request("ULTRACEMCO", Exchange::Nse))
        .await
        .expect("report");

    // Then: both table peers verify, ACC through the table industry alone
    let order: Vec<&str> = report.peers.iter().map(|peer| peer.peer.symbol.as_str()).collect();
    assert_eq!(order, vec!["AMBUJACEM.NS", "ACC.NS"]);
    assert_eq!(report.peers[1].name, "ACC.NS");
}

// =============================================================================
// Persistence
// =============================================================================

struct FailingSink;

impl ReportSink for FailingSink {
    fn record<'a>(
        &'a self,
        _report: &'a BetaReport,
    ) -> Pin<Box<dyn Future<Output = Result<(), SinkError>> + Send + 'a>> {
        Box::pin(async { Err(SinkError::Task(String::from("disk full"))) })
    }
}

#[tokio::test]
async fn when_persistence_fails_response_is_still_returned() {
    let provider = Arc::new(it_services_market());
    let engine = engine(provider, IndustryTable::empty(), Arc::new(FailingSink));

    let report = engine.calculate(&request("TCS", Exchange::Nse)).await;

    assert!(report.is_ok());
}

#[tokio::test]
async fn when_warehouse_sink_is_used_search_appears_in_history() {
    // Given: a warehouse in a scratch directory behind the sink
    let temp = tempfile::tempdir().expect("tempdir");
    let warehouse = Arc::new(
        betascope_warehouse::Warehouse::open(betascope_warehouse::WarehouseConfig::in_dir(
            temp.path(),
        ))
        .expect("warehouse open"),
    );
    let sink = Arc::new(WarehouseSink::new(Arc::clone(&warehouse)));
    let engine = engine(Arc::new(it_services_market()), IndustryTable::empty(), sink);

    // When: beta is calculated
    let report = engine
        .calculate(&request("TCS", Exchange::Nse))
        .await
        .expect("report");

    // Then: the stored row carries the request id, window and peers
    let searches = warehouse.recent_searches(5).expect("history");
    assert_eq!(searches.len(), 1);
    let stored = &searches[0];
    assert_eq!(stored.request_id.as_deref(), Some(report.request_id.to_string().as_str()));
    assert_eq!(stored.ticker, "TCS.NS");
    assert_eq!(stored.start_date, report.start.to_string());
    assert!((stored.beta.expect("beta") - report.metrics.beta).abs() < 1e-12);
    assert_eq!(stored.peers[0]["ticker"], "HCLTECH.NS");
}

#[tokio::test]
async fn when_peer_listing_has_only_missing_closes_system_uses_alternate_listing() {
    // Given: INFY's NSE chart is all gaps while its BSE listing has prices
    let provider = Arc::new(
        it_services_market()
            .with_history(blank("INFY.NS"))
            .with_history(stock("INFY.BO", 0.9, 0.0)),
    );
    let engine = engine(provider.clone(), IndustryTable::empty(), Arc::new(NoopSink));

    // When: beta is calculated
    let report = engine
        .calculate(&request("TCS", Exchange::Nse))
        .await
        .expect("report");

    // Then: INFY keeps its rank and gets metrics from the BSE listing
    let infy = report
        .peers
        .iter()
        .find(|peer| peer.peer.symbol.as_str() == "INFY.NS")
        .expect("infy reported");
    let metrics = infy.metrics.expect("metrics from the alternate listing");
    assert!((metrics.beta - 0.9).abs() < 1e-9);
    assert!(provider.calls_to("history").contains(&String::from("INFY.BO")));
    assert_eq!(report.dropped_peers, 0);
}

// =============================================================================
// Peer metrics fan-out
// =============================================================================

#[tokio::test]
async fn when_top_ranked_peer_finishes_last_report_keeps_rank_order() {
    // Given: peer data calls are slow, HCLTECH's history slowest of all
    let fast = StdDuration::from_millis(10);
    let mut provider = it_services_market();
    for peer in ["HCLTECH.NS", "INFY.NS", "WIPRO.NS"] {
        provider = provider
            .with_delay_for("history", peer, fast)
            .with_delay_for("quote", peer, fast);
    }
    let provider = Arc::new(provider.with_delay_for("history", "HCLTECH.NS", StdDuration::from_millis(150)));
    let config = EngineConfig {
        max_concurrency: 2,
        ..EngineConfig::default()
    };
    let engine = BetaOrchestrator::new(
        provider.clone(),
        Arc::new(IndustryTable::empty()),
        Arc::new(NoopSink),
        config,
    );

    // When: beta is calculated
    let report = engine
        .calculate(&request("TCS", Exchange::Nse))
        .await
        .expect("report");

    // Then: the top-ranked peer's history really came back last
    let peer_histories: Vec<String> = provider
        .completed()
        .into_iter()
        .filter(|call| call.starts_with("history ") && call != "history ^NSEI" && call != "history TCS.NS")
        .collect();
    assert_eq!(peer_histories.last().map(String::as_str), Some("history HCLTECH.NS"));

    // And: the report still follows rank order
    let order: Vec<&str> = report.peers.iter().map(|peer| peer.peer.symbol.as_str()).collect();
    assert_eq!(order, vec!["HCLTECH.NS", "INFY.NS", "WIPRO.NS"]);

    // And: no more than two peer data calls were ever in flight
    assert_eq!(provider.peak_in_flight(), 2);
}
