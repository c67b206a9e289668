use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::Symbol;
use crate::ValidationError;

/// National exchanges a target ticker can be resolved against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Exchange {
    #[serde(rename = "NSE")]
    Nse,
    #[serde(rename = "BSE")]
    Bse,
}

impl Exchange {
    pub const ALL: [Self; 2] = [Self::Nse, Self::Bse];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Nse => "NSE",
            Self::Bse => "BSE",
        }
    }

    /// Ticker suffix used by the market-data provider, without the dot.
    pub const fn suffix(self) -> &'static str {
        match self {
            Self::Nse => "NS",
            Self::Bse => "BO",
        }
    }

    pub const fn alternate(self) -> Self {
        match self {
            Self::Nse => Self::Bse,
            Self::Bse => Self::Nse,
        }
    }

    pub const fn benchmark_symbol(self) -> &'static str {
        match self {
            Self::Nse => "^NSEI",
            Self::Bse => "^BSESN",
        }
    }

    pub const fn benchmark_label(self) -> &'static str {
        match self {
            Self::Nse => "NIFTY 50",
            Self::Bse => "BSE SENSEX",
        }
    }

    pub fn benchmark(self) -> Benchmark {
        Benchmark {
            // Both index symbols are static and always pass validation.
            symbol: Symbol(self.benchmark_symbol().to_owned()),
            label: self.benchmark_label(),
        }
    }

    pub fn from_suffix(suffix: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|exchange| exchange.suffix().eq_ignore_ascii_case(suffix))
    }

    /// Appends this exchange's suffix unless the ticker already carries one.
    pub fn resolve(self, ticker: &Symbol) -> Symbol {
        if ticker.suffix().is_some() {
            ticker.clone()
        } else {
            ticker.on_exchange(self)
        }
    }
}

impl Display for Exchange {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Exchange {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "NSE" => Ok(Self::Nse),
            "BSE" => Ok(Self::Bse),
            other => Err(ValidationError::InvalidExchange {
                value: other.to_owned(),
            }),
        }
    }
}

/// Benchmark index the target is regressed against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Benchmark {
    pub symbol: Symbol,
    pub label: &'static str,
}

/// Lookback period requested by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Period {
    #[serde(rename = "1Y")]
    OneYear,
    #[serde(rename = "3Y")]
    ThreeYears,
    #[default]
    #[serde(rename = "5Y")]
    FiveYears,
}

impl Period {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OneYear => "1Y",
            Self::ThreeYears => "3Y",
            Self::FiveYears => "5Y",
        }
    }

    pub const fn years(self) -> i32 {
        match self {
            Self::OneYear => 1,
            Self::ThreeYears => 3,
            Self::FiveYears => 5,
        }
    }
}

impl Display for Period {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Period {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "1Y" => Ok(Self::OneYear),
            "3Y" => Ok(Self::ThreeYears),
            "5Y" => Ok(Self::FiveYears),
            other => Err(ValidationError::InvalidPeriod {
                value: other.to_owned(),
            }),
        }
    }
}
