use betascope_core::{BetaError, BetaOrchestrator, Exchange, Symbol};
use serde_json::json;

use crate::cli::PeersArgs;
use crate::error::CliError;
use crate::output::{number_cell, TableView};

use super::{engine_config, industry_table, yahoo_provider, CommandResult};

pub async fn run(args: &PeersArgs) -> Result<CommandResult, CliError> {
    let ticker = Symbol::parse(&args.ticker).map_err(|source| BetaError::invalid("ticker", source))?;
    let exchange = args
        .engine
        .exchange
        .parse::<Exchange>()
        .map_err(|source| BetaError::invalid("exchange", source))?;

    let config = engine_config(&args.engine)?;
    let table = industry_table(&args.engine)?;
    let engine = BetaOrchestrator::without_sink(yahoo_provider(&config)?, table, config);

    let peers = engine.discover_peers(&ticker, exchange).await;
    let target = exchange.resolve(&ticker);
    let data = json!({
        "ticker": target.as_str(),
        "exchange": exchange.as_str(),
        "peers": peers,
    });

    let mut view = TableView::default()
        .with_field("ticker", target.as_str())
        .with_field("peers", peers.len().to_string())
        .with_columns(vec!["peer", "name", "market_cap", "sector", "source"]);
    for peer in &peers {
        view.push_row(vec![
            peer.symbol.to_string(),
            peer.display_name.clone().unwrap_or_default(),
            number_cell(Some(peer.market_cap), 0),
            peer.sector_path.clone(),
            peer.source.as_str().to_owned(),
        ]);
    }
    Ok(CommandResult::new(data, view))
}
