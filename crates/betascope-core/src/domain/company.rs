use serde::{Deserialize, Serialize};

use crate::domain::Symbol;

/// Display names reported by the quote endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct QuoteSnapshot {
    pub long_name: Option<String>,
    pub short_name: Option<String>,
}

impl QuoteSnapshot {
    /// Name for the report headline: long name first.
    pub fn headline_name(&self) -> Option<&str> {
        non_blank(self.long_name.as_deref()).or_else(|| non_blank(self.short_name.as_deref()))
    }

    /// Name for peer rows: short name first, they render in a table.
    pub fn compact_name(&self) -> Option<&str> {
        non_blank(self.short_name.as_deref()).or_else(|| non_blank(self.long_name.as_deref()))
    }
}

/// Industry classification and size of a listed company.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CompanyProfile {
    pub name: Option<String>,
    pub industry: Option<String>,
    pub sector: Option<String>,
    pub market_cap: Option<f64>,
}

impl CompanyProfile {
    pub fn industry(&self) -> Option<&str> {
        non_blank(self.industry.as_deref())
    }

    pub fn market_cap_or_zero(&self) -> f64 {
        self.market_cap.filter(|cap| cap.is_finite()).unwrap_or(0.0)
    }

    /// `Sector > Industry`, with `Unknown` standing in for missing parts.
    pub fn sector_path(&self) -> String {
        format!(
            "{} > {}",
            non_blank(self.sector.as_deref()).unwrap_or("Unknown"),
            self.industry().unwrap_or("Unknown")
        )
    }
}

/// Instrument returned by a keyword search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    pub symbol: Symbol,
    pub name: Option<String>,
    pub exchange: Option<String>,
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}
