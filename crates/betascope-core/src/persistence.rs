use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use betascope_warehouse::{NewSearch, Warehouse, WarehouseError};
use thiserror::Error;

use crate::report::{BetaReport, BetaResponse};

#[derive(Debug, Error)]
pub enum SinkError {
    #[error(transparent)]
    Warehouse(#[from] WarehouseError),

    #[error("failed to encode report: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("persistence task failed: {0}")]
    Task(String),
}

/// Receives every completed report. Failures are reported back but never
/// fail the request that produced the report.
pub trait ReportSink: Send + Sync {
    fn record<'a>(
        &'a self,
        report: &'a BetaReport,
    ) -> Pin<Box<dyn Future<Output = Result<(), SinkError>> + Send + 'a>>;
}

/// Row stored for a report: the target's beta plus the peer rows as JSON.
pub fn search_record(report: &BetaReport) -> Result<NewSearch, serde_json::Error> {
    let response = BetaResponse::from(report);
    Ok(NewSearch {
        request_id: Some(report.request_id.to_string()),
        ticker: report.ticker.to_string(),
        exchange: report.exchange.to_string(),
        start_date: report.start.to_string(),
        end_date: report.end.to_string(),
        beta: Some(report.metrics.beta),
        peers: serde_json::to_value(&response.peers)?,
    })
}

#[derive(Debug, Default)]
pub struct NoopSink;

impl ReportSink for NoopSink {
    fn record<'a>(
        &'a self,
        _report: &'a BetaReport,
    ) -> Pin<Box<dyn Future<Output = Result<(), SinkError>> + Send + 'a>> {
        Box::pin(async { Ok(()) })
    }
}

/// Keeps records in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<NewSearch>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<NewSearch> {
        self.records
            .lock()
            .expect("memory sink lock is not poisoned")
            .clone()
    }
}

impl ReportSink for MemorySink {
    fn record<'a>(
        &'a self,
        report: &'a BetaReport,
    ) -> Pin<Box<dyn Future<Output = Result<(), SinkError>> + Send + 'a>> {
        Box::pin(async move {
            let record = search_record(report)?;
            self.records
                .lock()
                .expect("memory sink lock is not poisoned")
                .push(record);
            Ok(())
        })
    }
}

/// Persists reports into the DuckDB warehouse on the blocking pool.
#[derive(Clone)]
pub struct WarehouseSink {
    warehouse: Arc<Warehouse>,
}

impl WarehouseSink {
    pub fn new(warehouse: Arc<Warehouse>) -> Self {
        Self { warehouse }
    }
}

impl ReportSink for WarehouseSink {
    fn record<'a>(
        &'a self,
        report: &'a BetaReport,
    ) -> Pin<Box<dyn Future<Output = Result<(), SinkError>> + Send + 'a>> {
        Box::pin(async move {
            let record = search_record(report)?;
            let warehouse = Arc::clone(&self.warehouse);
            let id = tokio::task::spawn_blocking(move || warehouse.insert_search(&record))
                .await
                .map_err(|error| SinkError::Task(error.to_string()))??;
            tracing::debug!(search_id = id, ticker = %report.ticker, "search persisted");
            Ok(())
        })
    }
}
