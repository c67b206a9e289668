use std::sync::Arc;

use betascope_core::{
    BetaOrchestrator, BetaReport, BetaRequestInput, BetaResponse, NoopSink, ReportSink,
    WarehouseSink,
};
use betascope_warehouse::Warehouse;
use time::OffsetDateTime;

use crate::cli::BetaArgs;
use crate::error::CliError;
use crate::output::{number_cell, TableView};

use super::{engine_config, industry_table, yahoo_provider, CommandResult};

pub async fn run(args: &BetaArgs) -> Result<CommandResult, CliError> {
    let input = BetaRequestInput {
        ticker: args.ticker.clone(),
        exchange: args.engine.exchange.clone(),
        period: args.period.clone(),
        start_date: args.start.clone().unwrap_or_default(),
        end_date: args.end.clone().unwrap_or_default(),
    };
    let request = if args.start.is_some() {
        input.validate()?
    } else {
        input.validate_trailing(OffsetDateTime::now_utc().date())?
    };

    let config = engine_config(&args.engine)?;
    let table = industry_table(&args.engine)?;
    let provider = yahoo_provider(&config)?;
    let engine = BetaOrchestrator::new(provider, table, report_sink(args.no_persist), config);

    let report = engine.calculate(&request).await?;
    let response = BetaResponse::from(&report);
    let data = serde_json::to_value(&response)?;
    Ok(CommandResult::new(data, table_view(&report, &response)))
}

fn report_sink(no_persist: bool) -> Arc<dyn ReportSink> {
    if no_persist {
        return Arc::new(NoopSink);
    }
    match Warehouse::open_default() {
        Ok(warehouse) => Arc::new(WarehouseSink::new(Arc::new(warehouse))),
        Err(error) => {
            tracing::warn!(error = %error, "warehouse unavailable, search will not be recorded");
            Arc::new(NoopSink)
        }
    }
}

fn table_view(report: &BetaReport, response: &BetaResponse) -> TableView {
    let mut view = TableView::default()
        .with_field("ticker", response.ticker.as_str())
        .with_field("name", response.name.as_str())
        .with_field(
            "index",
            format!("{} ({})", response.market_index, report.benchmark.symbol),
        )
        .with_field("window", format!("{} .. {} ({})", report.start, report.end, response.period))
        .with_field("beta", format!("{:.4}", response.beta))
        .with_field("alpha", format!("{:.6}", response.alpha))
        .with_field("volatility", format!("{:.4}", response.volatility))
        .with_field("correlation", format!("{:.4}", response.correlation))
        .with_field("r_squared", format!("{:.4}", response.r_squared));
    if report.dropped_peers > 0 {
        view = view.with_field("dropped_peers", report.dropped_peers.to_string());
    }

    view = view.with_columns(vec!["peer", "name", "beta", "volatility", "market_cap", "sector"]);
    for peer in &response.peers {
        view.push_row(vec![
            peer.ticker.clone(),
            peer.name.clone(),
            number_cell(peer.beta, 4),
            number_cell(peer.volatility, 4),
            number_cell(Some(peer.market_cap), 0),
            peer.sector.clone(),
        ]);
    }
    view
}
