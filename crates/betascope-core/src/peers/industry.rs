use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord, Trim};

use crate::domain::Symbol;
use crate::CoreError;

/// One row of the classification table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndustryEntry {
    pub display_name: String,
    pub industry: String,
}

/// Read-only industry classification keyed by base symbol (`TCS`, not `TCS.NS`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndustryTable {
    entries: BTreeMap<String, IndustryEntry>,
}

impl IndustryTable {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builds a table from `(ticker, display_name, industry)` rows. Later
    /// duplicates of a ticker are ignored.
    pub fn from_rows<I, T, N, S>(rows: I) -> Self
    where
        I: IntoIterator<Item = (T, N, S)>,
        T: AsRef<str>,
        N: Into<String>,
        S: Into<String>,
    {
        let mut entries = BTreeMap::new();
        for (ticker, display_name, industry) in rows {
            let Some(key) = normalize_ticker(ticker.as_ref()) else {
                continue;
            };
            entries.entry(key).or_insert_with(|| IndustryEntry {
                display_name: display_name.into(),
                industry: industry.into().trim().to_owned(),
            });
        }
        Self { entries }
    }

    pub fn from_csv_path(path: impl AsRef<Path>) -> Result<Self, CoreError> {
        let file = File::open(path.as_ref())?;
        let table = Self::from_csv_reader(file)?;
        tracing::info!(
            path = %path.as_ref().display(),
            companies = table.len(),
            "loaded industry table"
        );
        Ok(table)
    }

    /// Loads a CSV export of the classification spreadsheet. Columns are
    /// located by header name; a file without a ticker column yields an
    /// empty table.
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self, CoreError> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(Trim::All)
            .from_reader(reader);

        let columns = Columns::detect(reader.headers()?);
        let Some(ticker_idx) = columns.ticker else {
            tracing::warn!("industry table has no ticker column");
            return Ok(Self::empty());
        };

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            let ticker = record.get(ticker_idx).unwrap_or_default();
            let name = columns.cell(&record, columns.name);
            let industry = columns.cell(&record, columns.industry);
            rows.push((ticker.to_owned(), name.to_owned(), industry.to_owned()));
        }
        Ok(Self::from_rows(rows))
    }

    pub fn get(&self, symbol: &Symbol) -> Option<&IndustryEntry> {
        self.entries.get(symbol.base())
    }

    /// Non-empty industry recorded for the symbol's base ticker.
    pub fn industry_of(&self, symbol: &Symbol) -> Option<&str> {
        self.get(symbol)
            .map(|entry| entry.industry.as_str())
            .filter(|industry| !industry.is_empty())
    }

    /// Base tickers whose industry equals `industry` exactly.
    pub fn members_of<'a>(&'a self, industry: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.entries
            .iter()
            .filter(move |(_, entry)| entry.industry == industry)
            .map(|(ticker, _)| ticker.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// `NSE:TCS` keeps `TCS`; blank cells are skipped.
fn normalize_ticker(raw: &str) -> Option<String> {
    let ticker = raw.rsplit(':').next().unwrap_or(raw).trim();
    (!ticker.is_empty()).then(|| ticker.to_ascii_uppercase())
}

#[derive(Debug, Default)]
struct Columns {
    name: Option<usize>,
    ticker: Option<usize>,
    industry: Option<usize>,
}

impl Columns {
    fn detect(headers: &StringRecord) -> Self {
        let lowered: Vec<String> = headers.iter().map(|h| h.trim().to_lowercase()).collect();

        Self {
            name: position(&lowered, |h| h.contains("company") || h == "name"),
            ticker: position(&lowered, |h| h.contains("ticker") || h == "symbol"),
            industry: position(&lowered, |h| {
                matches!(h, "industry group" | "industry" | "sector")
            }),
        }
    }

    fn cell<'r>(&self, record: &'r StringRecord, column: Option<usize>) -> &'r str {
        column.and_then(|idx| record.get(idx)).unwrap_or_default()
    }
}

fn position(headers: &[String], predicate: impl Fn(&str) -> bool) -> Option<usize> {
    headers.iter().position(|header| predicate(header.as_str()))
}
