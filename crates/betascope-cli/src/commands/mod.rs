mod beta;
mod history;
mod peers;

use std::sync::Arc;
use std::time::Duration;

use betascope_core::{EngineConfig, IndustryTable, MarketDataProvider, YahooConfig, YahooProvider};
use serde_json::Value;

use crate::cli::{Cli, Command, EngineArgs};
use crate::error::CliError;
use crate::output::TableView;

/// Command output in both renderings.
pub struct CommandResult {
    pub data: Value,
    pub table: TableView,
}

impl CommandResult {
    pub fn new(data: Value, table: TableView) -> Self {
        Self { data, table }
    }
}

pub async fn run(cli: &Cli) -> Result<CommandResult, CliError> {
    match &cli.command {
        Command::Beta(args) => beta::run(args).await,
        Command::Peers(args) => peers::run(args).await,
        Command::History(args) => history::run(args),
    }
}

/// Environment-derived engine limits with flag overrides applied on top.
fn engine_config(args: &EngineArgs) -> Result<EngineConfig, CliError> {
    let mut config = EngineConfig::from_env()?;
    if let Some(max_peers) = args.max_peers {
        config.max_peers = max_peers;
    }
    if let Some(timeout_ms) = args.timeout_ms {
        config.request_timeout = Duration::from_millis(timeout_ms);
    }
    config.validate()?;
    Ok(config)
}

fn industry_table(args: &EngineArgs) -> Result<Arc<IndustryTable>, CliError> {
    match &args.industry_table {
        Some(path) => Ok(Arc::new(IndustryTable::from_csv_path(path)?)),
        None => {
            tracing::warn!("no industry table configured, peer discovery uses provider data only");
            Ok(Arc::new(IndustryTable::empty()))
        }
    }
}

fn yahoo_provider(config: &EngineConfig) -> Result<Arc<dyn MarketDataProvider>, CliError> {
    let yahoo = YahooConfig {
        timeout: config.request_timeout,
        ..YahooConfig::from_env()
    };
    Ok(Arc::new(YahooProvider::new(yahoo)?))
}
