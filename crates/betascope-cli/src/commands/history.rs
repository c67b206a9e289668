use betascope_warehouse::Warehouse;
use serde_json::json;

use crate::cli::HistoryArgs;
use crate::error::CliError;
use crate::output::{number_cell, TableView};

use super::CommandResult;

pub fn run(args: &HistoryArgs) -> Result<CommandResult, CliError> {
    let warehouse = Warehouse::open_default()?;
    let searches = warehouse.recent_searches(args.limit)?;

    let mut view = TableView::default()
        .with_field("warehouse", warehouse.db_path().display().to_string())
        .with_columns(vec!["id", "ticker", "exchange", "start", "end", "beta", "peers", "created_at"]);
    for search in &searches {
        let peer_count = search.peers.as_array().map_or(0, Vec::len);
        view.push_row(vec![
            search.id.to_string(),
            search.ticker.clone(),
            search.exchange.clone(),
            search.start_date.clone(),
            search.end_date.clone(),
            number_cell(search.beta, 4),
            peer_count.to_string(),
            search.created_at.clone(),
        ]);
    }

    let data = json!({ "searches": searches });
    Ok(CommandResult::new(data, view))
}
