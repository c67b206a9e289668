//! # Domain Models
//!
//! Canonical types shared by the provider contract, the metrics engine and
//! the peer engine.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Symbol`] | Validated ticker with optional exchange suffix |
//! | [`Exchange`] | NSE / BSE with suffix and benchmark index |
//! | [`Period`] | Requested lookback (1Y, 3Y, 5Y) |
//! | [`PriceSeries`] | Ascending daily closes for one instrument |
//! | [`QuoteSnapshot`] | Display names from the quote endpoint |
//! | [`CompanyProfile`] | Industry, sector and market cap |
//! | [`SearchHit`] | Instrument returned by keyword search |

mod company;
mod date;
mod exchange;
mod prices;
mod symbol;

pub use company::{CompanyProfile, QuoteSnapshot, SearchHit};
pub use date::{date_from_unix, parse_iso_date, unix_midnight};
pub use exchange::{Benchmark, Exchange, Period};
pub use prices::{PricePoint, PriceSeries};
pub use symbol::Symbol;
