//! Concrete [`MarketDataProvider`](crate::provider::MarketDataProvider) implementations.

pub mod yahoo;

pub use yahoo::{YahooConfig, YahooProvider, YahooSession};
