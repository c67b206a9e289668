//! Shared fixtures for the behaviour tests: an in-memory market-data
//! provider scripted per symbol, and helpers for building price series.

#![allow(dead_code)]

pub mod http;

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use betascope_core::{
    CompanyProfile, HistoryRequest, MarketDataProvider, PricePoint, PriceSeries, ProviderError,
    QuoteSnapshot, SearchHit, Symbol,
};
use time::{Date, Weekday};

pub fn symbol(raw: &str) -> Symbol {
    Symbol::parse(raw).expect("test symbol should be valid")
}

/// `count` consecutive weekdays starting at `first` (inclusive).
pub fn trading_days(first: Date, count: usize) -> Vec<Date> {
    let mut days = Vec::with_capacity(count);
    let mut day = first;
    while days.len() < count {
        if !matches!(day.weekday(), Weekday::Saturday | Weekday::Sunday) {
            days.push(day);
        }
        day = day.next_day().expect("date in range");
    }
    days
}

pub fn series(raw: &str, days: &[Date], closes: &[f64]) -> PriceSeries {
    assert_eq!(days.len(), closes.len(), "one close per day");
    PriceSeries::new(
        symbol(raw),
        days.iter()
            .zip(closes)
            .map(|(day, close)| PricePoint::new(*day, Some(*close)))
            .collect(),
    )
}

/// Same closes multiplied by `factor`.
pub fn scaled(series: &PriceSeries, factor: f64) -> PriceSeries {
    PriceSeries::new(
        series.symbol.clone(),
        series
            .points
            .iter()
            .map(|point| PricePoint::new(point.date, point.close.map(|close| close * factor)))
            .collect(),
    )
}

/// Closes compounding `returns` from `start`.
pub fn closes_from_returns(start: f64, returns: &[f64]) -> Vec<f64> {
    let mut closes = Vec::with_capacity(returns.len() + 1);
    closes.push(start);
    for daily in returns {
        let last = *closes.last().expect("seeded");
        closes.push(last * (1.0 + daily));
    }
    closes
}

/// Deterministic, non-constant daily market returns.
pub fn market_returns(count: usize) -> Vec<f64> {
    (0..count)
        .map(|index| {
            let wave = ((index * 7) % 11) as f64 - 5.0;
            wave / 1_000.0 + if index % 3 == 0 { 0.002 } else { -0.001 }
        })
        .collect()
}

pub fn profile(industry: &str, sector: &str, market_cap: f64) -> CompanyProfile {
    CompanyProfile {
        name: None,
        industry: Some(industry.to_owned()),
        sector: Some(sector.to_owned()),
        market_cap: Some(market_cap),
    }
}

pub fn quote(long_name: &str, short_name: &str) -> QuoteSnapshot {
    QuoteSnapshot {
        long_name: Some(long_name.to_owned()),
        short_name: Some(short_name.to_owned()),
    }
}

#[derive(Default)]
struct Script {
    histories: HashMap<String, PriceSeries>,
    quotes: HashMap<String, QuoteSnapshot>,
    profiles: HashMap<String, CompanyProfile>,
    related: HashMap<String, Vec<Symbol>>,
    searches: HashMap<String, Vec<SearchHit>>,
    failing_search: bool,
}

/// Provider answering from per-symbol scripts. Unscripted symbols behave
/// like an unknown ticker: `NotFound`.
#[derive(Default)]
pub struct ScriptedProvider {
    script: Mutex<Script>,
    calls: Mutex<Vec<String>>,
    completed: Mutex<Vec<String>>,
    delay: Option<Duration>,
    delays: HashMap<String, Duration>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_history(self, history: PriceSeries) -> Self {
        self.edit(|script| {
            script
                .histories
                .insert(history.symbol.to_string(), history);
        })
    }

    pub fn with_quote(self, raw: &str, quote: QuoteSnapshot) -> Self {
        self.edit(|script| {
            script.quotes.insert(raw.to_owned(), quote);
        })
    }

    pub fn with_profile(self, raw: &str, profile: CompanyProfile) -> Self {
        self.edit(|script| {
            script.profiles.insert(raw.to_owned(), profile);
        })
    }

    pub fn with_related(self, raw: &str, related: &[&str]) -> Self {
        self.edit(|script| {
            script
                .related
                .insert(raw.to_owned(), related.iter().map(|value| symbol(value)).collect());
        })
    }

    pub fn with_search(self, query: &str, hits: &[&str]) -> Self {
        self.edit(|script| {
            let hits = hits
                .iter()
                .map(|value| SearchHit {
                    symbol: symbol(value),
                    name: None,
                    exchange: None,
                })
                .collect();
            script.searches.insert(query.to_owned(), hits);
        })
    }

    pub fn with_failing_search(self) -> Self {
        self.edit(|script| script.failing_search = true)
    }

    /// Every call sleeps this long, so concurrent calls overlap.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// One call, such as `("history", "INFY.NS")`, sleeps this long instead
    /// of the shared delay.
    pub fn with_delay_for(mut self, method: &str, argument: &str, delay: Duration) -> Self {
        self.delays.insert(format!("{method} {argument}"), delay);
        self
    }

    /// Calls in arrival order, as `"<method> <argument>"`.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("calls lock").clone()
    }

    pub fn calls_to(&self, method: &str) -> Vec<String> {
        let prefix = format!("{method} ");
        self.calls()
            .into_iter()
            .filter_map(|call| call.strip_prefix(&prefix).map(str::to_owned))
            .collect()
    }

    /// Calls in the order they returned.
    pub fn completed(&self) -> Vec<String> {
        self.completed.lock().expect("completed lock").clone()
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    fn edit(self, apply: impl FnOnce(&mut Script)) -> Self {
        {
            let mut script = self.script.lock().expect("script lock");
            apply(&mut *script);
        }
        self
    }

    async fn enter<T>(
        &self,
        call: String,
        answer: impl FnOnce(&Script) -> Result<T, ProviderError>,
    ) -> Result<T, ProviderError> {
        self.calls.lock().expect("calls lock").push(call.clone());
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        if let Some(delay) = self.delays.get(&call).copied().or(self.delay) {
            tokio::time::sleep(delay).await;
        }
        let result = {
            let script = self.script.lock().expect("script lock");
            answer(&*script)
        };
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.completed.lock().expect("completed lock").push(call);
        result
    }
}

fn missing(what: &str, key: &str) -> ProviderError {
    ProviderError::not_found(format!("no {what} scripted for {key}"))
}

impl MarketDataProvider for ScriptedProvider {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn fetch_history<'a>(
        &'a self,
        request: &'a HistoryRequest,
    ) -> Pin<Box<dyn Future<Output = Result<PriceSeries, ProviderError>> + Send + 'a>> {
        Box::pin(self.enter(format!("history {}", request.symbol), move |script| {
            let key = request.symbol.as_str();
            let full = script.histories.get(key).ok_or_else(|| missing("history", key))?;
            let points = full
                .points
                .iter()
                .filter(|point| point.date >= request.start && point.date < request.end)
                .copied()
                .collect();
            Ok(PriceSeries::new(request.symbol.clone(), points))
        }))
    }

    fn fetch_quote<'a>(
        &'a self,
        symbol: &'a Symbol,
    ) -> Pin<Box<dyn Future<Output = Result<QuoteSnapshot, ProviderError>> + Send + 'a>> {
        Box::pin(self.enter(format!("quote {symbol}"), move |script| {
            script
                .quotes
                .get(symbol.as_str())
                .cloned()
                .ok_or_else(|| missing("quote", symbol.as_str()))
        }))
    }

    fn fetch_profile<'a>(
        &'a self,
        symbol: &'a Symbol,
    ) -> Pin<Box<dyn Future<Output = Result<CompanyProfile, ProviderError>> + Send + 'a>> {
        Box::pin(self.enter(format!("profile {symbol}"), move |script| {
            script
                .profiles
                .get(symbol.as_str())
                .cloned()
                .ok_or_else(|| missing("profile", symbol.as_str()))
        }))
    }

    fn search<'a>(
        &'a self,
        query: &'a str,
        limit: usize,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<SearchHit>, ProviderError>> + Send + 'a>> {
        Box::pin(self.enter(format!("search {query}"), move |script| {
            if script.failing_search {
                return Err(ProviderError::unavailable("search backend down"));
            }
            Ok(script
                .searches
                .get(query)
                .map(|hits| hits.iter().take(limit).cloned().collect())
                .unwrap_or_default())
        }))
    }

    fn related_symbols<'a>(
        &'a self,
        symbol: &'a Symbol,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Symbol>, ProviderError>> + Send + 'a>> {
        Box::pin(self.enter(format!("related {symbol}"), move |script| {
            script
                .related
                .get(symbol.as_str())
                .cloned()
                .ok_or_else(|| missing("related symbols", symbol.as_str()))
        }))
    }
}
