use thiserror::Error;

/// Validation errors raised while parsing domain values.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("symbol cannot be empty")]
    EmptySymbol,
    #[error("symbol length {len} exceeds max {max}")]
    SymbolTooLong { len: usize, max: usize },
    #[error("symbol must start with an ASCII letter, digit or '^': '{ch}'")]
    SymbolInvalidStart { ch: char },
    #[error("symbol contains invalid character '{ch}' at index {index}")]
    SymbolInvalidChar { ch: char, index: usize },

    #[error("invalid exchange '{value}', expected one of NSE, BSE")]
    InvalidExchange { value: String },
    #[error("invalid period '{value}', expected one of 1Y, 3Y, 5Y")]
    InvalidPeriod { value: String },

    #[error("date must be ISO-8601 (YYYY-MM-DD or RFC3339): '{value}'")]
    InvalidDate { value: String },
    #[error("start date {start} must be before end date {end}")]
    InvalidDateRange { start: String, end: String },
}

/// Top-level error type for core operations outside the request path.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("industry table error: {0}")]
    IndustryTable(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    Config(String),
}
