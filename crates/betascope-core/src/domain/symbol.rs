use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::domain::Exchange;
use crate::ValidationError;

const MAX_SYMBOL_LEN: usize = 20;

/// Normalized market symbol, optionally carrying an exchange suffix (`TCS.NS`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Symbol(pub(crate) String);

impl Symbol {
    /// Parse and normalize a symbol to uppercase.
    ///
    /// Digits are accepted as a leading character because BSE scrip codes
    /// (`500325.BO`) are numeric; `^` marks index symbols (`^NSEI`).
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptySymbol);
        }

        let normalized = trimmed.to_ascii_uppercase();
        let len = normalized.chars().count();
        if len > MAX_SYMBOL_LEN {
            return Err(ValidationError::SymbolTooLong {
                len,
                max: MAX_SYMBOL_LEN,
            });
        }

        if let Some(first) = normalized.chars().next() {
            if !(first.is_ascii_alphanumeric() || first == '^') {
                return Err(ValidationError::SymbolInvalidStart { ch: first });
            }
        }

        for (index, ch) in normalized.chars().enumerate().skip(1) {
            let valid = ch.is_ascii_alphanumeric() || matches!(ch, '.' | '-' | '&' | '_');
            if !valid {
                return Err(ValidationError::SymbolInvalidChar { ch, index });
            }
        }

        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Symbol without any exchange suffix (`TCS.NS` -> `TCS`).
    pub fn base(&self) -> &str {
        self.0.split('.').next().unwrap_or(&self.0)
    }

    /// Exchange suffix without the dot, if present.
    pub fn suffix(&self) -> Option<&str> {
        self.0
            .split_once('.')
            .map(|(_, suffix)| suffix)
            .filter(|suffix| !suffix.is_empty())
    }

    /// Exchange implied by a recognized national-exchange suffix.
    pub fn exchange(&self) -> Option<Exchange> {
        self.suffix().and_then(Exchange::from_suffix)
    }

    pub fn has_national_suffix(&self) -> bool {
        self.exchange().is_some()
    }

    /// Same base symbol listed on `exchange`.
    pub fn on_exchange(&self, exchange: Exchange) -> Self {
        Self(format!("{}.{}", self.base(), exchange.suffix()))
    }
}

impl Display for Symbol {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for Symbol {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl TryFrom<&str> for Symbol {
    type Error = ValidationError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<Symbol> for String {
    fn from(value: Symbol) -> Self {
        value.0
    }
}
