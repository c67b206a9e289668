//! DuckDB-backed history of completed beta calculations.

pub mod duckdb;
pub mod migrations;

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use ::duckdb::{params, Connection};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

pub use duckdb::{DuckDbConnectionManager, PooledConnection};

/// Most recent searches returned when no limit is given.
pub const DEFAULT_RECENT_LIMIT: usize = 10;

#[derive(Debug, Error)]
pub enum WarehouseError {
    #[error(transparent)]
    DuckDb(#[from] ::duckdb::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("stored peers are not valid JSON: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug, Clone)]
pub struct WarehouseConfig {
    pub home: PathBuf,
    pub db_path: PathBuf,
    pub max_pool_size: usize,
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        Self::in_dir(resolve_home())
    }
}

impl WarehouseConfig {
    /// Database at `<home>/warehouse.duckdb`.
    pub fn in_dir(home: impl Into<PathBuf>) -> Self {
        let home = home.into();
        let db_path = home.join("warehouse.duckdb");
        Self {
            home,
            db_path,
            max_pool_size: 4,
        }
    }
}

/// Search about to be stored.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSearch {
    pub request_id: Option<String>,
    pub ticker: String,
    pub exchange: String,
    pub start_date: String,
    pub end_date: String,
    pub beta: Option<f64>,
    pub peers: Value,
}

/// Stored search, newest first when listed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchRecord {
    pub id: i64,
    pub request_id: Option<String>,
    pub ticker: String,
    pub exchange: String,
    pub start_date: String,
    pub end_date: String,
    pub beta: Option<f64>,
    pub peers: Value,
    pub created_at: String,
}

#[derive(Clone)]
pub struct Warehouse {
    config: WarehouseConfig,
    manager: DuckDbConnectionManager,
}

impl Warehouse {
    pub fn open_default() -> Result<Self, WarehouseError> {
        Self::open(WarehouseConfig::default())
    }

    pub fn open(config: WarehouseConfig) -> Result<Self, WarehouseError> {
        if let Some(parent) = config.db_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let manager = DuckDbConnectionManager::open(config.db_path.clone(), config.max_pool_size)?;
        let connection = manager.acquire()?;
        migrations::apply_migrations(&connection)?;
        drop(connection);

        Ok(Self { config, manager })
    }

    pub fn db_path(&self) -> &Path {
        self.manager.db_path()
    }

    pub fn home(&self) -> &Path {
        self.config.home.as_path()
    }

    /// Stores one search and returns its id.
    pub fn insert_search(&self, search: &NewSearch) -> Result<i64, WarehouseError> {
        let peers = serde_json::to_string(&search.peers)?;
        let connection = self.manager.acquire()?;
        connection.execute_batch("BEGIN TRANSACTION")?;
        let result = connection
            .query_row(
                r#"
INSERT INTO searches (request_id, ticker, exchange, start_date, end_date, beta, peers)
VALUES (?, ?, ?, ?, ?, ?, ?)
RETURNING id
"#,
                params![
                    search.request_id,
                    search.ticker,
                    search.exchange,
                    search.start_date,
                    search.end_date,
                    search.beta,
                    peers,
                ],
                |row| row.get::<_, i64>(0),
            )
            .map_err(WarehouseError::from);

        finalize_transaction(&connection, result)
    }

    /// Newest searches first, at most `limit` rows.
    pub fn recent_searches(&self, limit: usize) -> Result<Vec<SearchRecord>, WarehouseError> {
        let connection = self.manager.acquire()?;
        let mut statement = connection.prepare(
            r#"
SELECT id, request_id, ticker, exchange, start_date, end_date, beta, peers,
       CAST(created_at AS VARCHAR)
FROM searches
ORDER BY created_at DESC, id DESC
LIMIT ?
"#,
        )?;

        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = statement.query_map([limit], |row| {
            Ok((
                SearchRecord {
                    id: row.get(0)?,
                    request_id: row.get(1)?,
                    ticker: row.get(2)?,
                    exchange: row.get(3)?,
                    start_date: row.get(4)?,
                    end_date: row.get(5)?,
                    beta: row.get(6)?,
                    peers: Value::Null,
                    created_at: row.get(8)?,
                },
                row.get::<_, String>(7)?,
            ))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (mut record, peers) = row?;
            record.peers = serde_json::from_str(&peers)?;
            records.push(record);
        }
        Ok(records)
    }

    pub fn search_count(&self) -> Result<i64, WarehouseError> {
        let connection = self.manager.acquire()?;
        let count = connection.query_row("SELECT COUNT(*) FROM searches", [], |row| row.get(0))?;
        Ok(count)
    }
}

fn finalize_transaction<T>(
    connection: &Connection,
    result: Result<T, WarehouseError>,
) -> Result<T, WarehouseError> {
    match result {
        Ok(value) => {
            connection.execute_batch("COMMIT")?;
            Ok(value)
        }
        Err(error) => {
            let _ = connection.execute_batch("ROLLBACK");
            Err(error)
        }
    }
}

fn resolve_home() -> PathBuf {
    if let Some(path) = env::var_os("BETASCOPE_HOME") {
        let path = PathBuf::from(path);
        if !path.as_os_str().is_empty() {
            return path;
        }
    }

    if let Some(home) = env::var_os("HOME") {
        return PathBuf::from(home).join(".betascope");
    }

    PathBuf::from(".betascope")
}
