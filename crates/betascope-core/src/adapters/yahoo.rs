use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
use crate::domain::{
    date_from_unix, unix_midnight, CompanyProfile, PricePoint, PriceSeries, QuoteSnapshot,
    SearchHit, Symbol,
};
use crate::http_client::{HttpClient, HttpError, HttpRequest, ReqwestHttpClient};
use crate::provider::{HistoryRequest, MarketDataProvider, ProviderError};
use crate::retry::RetryPolicy;
use crate::throttle::RequestThrottle;

const DEFAULT_BASE_URL: &str = "https://query1.finance.yahoo.com";
const FALLBACK_CRUMB_URL: &str = "https://query2.finance.yahoo.com/v1/test/getcrumb";
const SESSION_URL: &str = "https://fc.yahoo.com";
const REFERER: &str = "https://finance.yahoo.com/";

/// Tunables for the Yahoo adapter.
#[derive(Debug, Clone)]
pub struct YahooConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub requests_per_second: u32,
    pub retry: RetryPolicy,
    pub circuit: CircuitBreakerConfig,
    pub session_ttl: Duration,
    /// Session cookie sent on every call, usually from `YAHOO_COOKIE`.
    pub cookie: Option<String>,
}

impl Default for YahooConfig {
    fn default() -> Self {
        Self {
            base_url: String::from(DEFAULT_BASE_URL),
            timeout: Duration::from_secs(10),
            requests_per_second: 8,
            retry: RetryPolicy::default(),
            circuit: CircuitBreakerConfig::default(),
            session_ttl: Duration::from_secs(3_600),
            cookie: None,
        }
    }
}

impl YahooConfig {
    /// Defaults plus the `YAHOO_COOKIE` override when it is set.
    pub fn from_env() -> Self {
        Self {
            cookie: std::env::var("YAHOO_COOKIE")
                .ok()
                .filter(|cookie| !cookie.trim().is_empty()),
            ..Self::default()
        }
    }
}

// ============================================================================
// Session - cookie/crumb handshake
// ============================================================================

#[derive(Debug, Clone)]
struct Crumb {
    value: String,
    fetched_at: Instant,
}

/// Yahoo session state.
///
/// Yahoo's unofficial API wants a session cookie (set by `fc.yahoo.com`) and
/// a crumb token bound to it. The cookie lives in the HTTP client's jar; the
/// crumb is cached here until it expires or Yahoo rejects it.
#[derive(Debug)]
pub struct YahooSession {
    crumb: Mutex<Option<Crumb>>,
    refresh: tokio::sync::Mutex<()>,
    ttl: Duration,
    cookie: Option<String>,
    crumb_urls: [String; 2],
}

impl YahooSession {
    pub fn new(base_url: &str, ttl: Duration, cookie: Option<String>) -> Self {
        Self {
            crumb: Mutex::new(None),
            refresh: tokio::sync::Mutex::new(()),
            ttl,
            cookie,
            crumb_urls: [
                format!("{base_url}/v1/test/getcrumb"),
                String::from(FALLBACK_CRUMB_URL),
            ],
        }
    }

    /// GET with the referer Yahoo expects and the configured cookie, if any.
    fn request(&self, url: impl Into<String>, timeout: Duration) -> HttpRequest {
        let request = HttpRequest::get(url, timeout).header("referer", REFERER);
        match &self.cookie {
            Some(cookie) => request.header("cookie", cookie.as_str()),
            None => request,
        }
    }

    fn cached(&self) -> Option<String> {
        let guard = self.crumb.lock().expect("yahoo crumb lock is not poisoned");
        guard
            .as_ref()
            .filter(|crumb| crumb.fetched_at.elapsed() < self.ttl)
            .map(|crumb| crumb.value.clone())
    }

    /// Returns a valid crumb, performing the handshake when none is cached.
    /// Concurrent callers wait for a single handshake.
    pub async fn crumb(
        &self,
        http_client: &dyn HttpClient,
        timeout: Duration,
    ) -> Result<String, ProviderError> {
        if let Some(crumb) = self.cached() {
            return Ok(crumb);
        }

        let _refresh = self.refresh.lock().await;
        if let Some(crumb) = self.cached() {
            return Ok(crumb);
        }

        let value = self.handshake(http_client, timeout).await?;
        *self.crumb.lock().expect("yahoo crumb lock is not poisoned") = Some(Crumb {
            value: value.clone(),
            fetched_at: Instant::now(),
        });
        tracing::debug!("yahoo session established");
        Ok(value)
    }

    /// Drops the cached crumb so the next call re-runs the handshake.
    pub fn invalidate(&self) {
        *self.crumb.lock().expect("yahoo crumb lock is not poisoned") = None;
    }

    async fn handshake(
        &self,
        http_client: &dyn HttpClient,
        timeout: Duration,
    ) -> Result<String, ProviderError> {
        // fc.yahoo.com answers 404 but still sets the session cookie.
        http_client
            .get(self.request(SESSION_URL, timeout))
            .await
            .map_err(|error| ProviderError::unavailable(format!("failed to open yahoo session: {error}")))?;

        for url in &self.crumb_urls {
            let Ok(response) = http_client.get(self.request(url.as_str(), timeout)).await else {
                continue;
            };
            if response.status == 429 {
                return Err(ProviderError::rate_limited(
                    "yahoo rate limited the crumb request",
                ));
            }
            if !response.is_success() {
                continue;
            }

            let body = response.body.trim();
            if body.to_ascii_lowercase().contains("too many requests") {
                return Err(ProviderError::rate_limited(
                    "yahoo rate limited the crumb request",
                ));
            }
            if is_plausible_crumb(body) {
                return Ok(body.to_owned());
            }
        }

        Err(ProviderError::unavailable(
            "failed to fetch yahoo crumb from all endpoints",
        ))
    }
}

fn is_plausible_crumb(body: &str) -> bool {
    !body.is_empty()
        && body.len() < 100
        && !body.contains(char::is_whitespace)
        && !body.contains('<')
}

// ============================================================================
// Provider
// ============================================================================

/// Yahoo Finance implementation of [`MarketDataProvider`].
pub struct YahooProvider {
    http_client: Arc<dyn HttpClient>,
    session: YahooSession,
    circuit_breaker: CircuitBreaker,
    throttle: RequestThrottle,
    retry: RetryPolicy,
    base_url: String,
    timeout: Duration,
}

impl YahooProvider {
    pub fn new(config: YahooConfig) -> Result<Self, HttpError> {
        Ok(Self::with_http_client(Arc::new(ReqwestHttpClient::new()?), config))
    }

    pub fn with_http_client(http_client: Arc<dyn HttpClient>, config: YahooConfig) -> Self {
        let base_url = config.base_url.trim_end_matches('/').to_owned();
        Self {
            http_client,
            session: YahooSession::new(&base_url, config.session_ttl, config.cookie),
            circuit_breaker: CircuitBreaker::new(config.circuit),
            throttle: RequestThrottle::per_second(config.requests_per_second),
            retry: config.retry,
            base_url,
            timeout: config.timeout,
        }
    }

    pub fn circuit_state(&self) -> CircuitState {
        self.circuit_breaker.state()
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, ProviderError> {
        let body = self.get_body(url).await?;
        serde_json::from_str(&body).map_err(|error| {
            ProviderError::malformed(format!(
                "unexpected yahoo payload from {}: {error}",
                endpoint_path(url)
            ))
        })
    }

    /// One logical call. The breaker sees its final outcome, after retries.
    async fn get_body(&self, url: &str) -> Result<String, ProviderError> {
        self.circuit_breaker.admit("yahoo")?;
        let result = self.call_upstream(url).await;
        self.circuit_breaker
            .observe(result.as_ref().map(|_| ()).map_err(ProviderError::kind));
        result
    }

    /// Pacing, crumb, bounded retries on transient failures and a single
    /// session refresh on 401/429.
    async fn call_upstream(&self, url: &str) -> Result<String, ProviderError> {
        let mut attempt = 0_u32;
        let mut session_refreshed = false;
        loop {
            self.throttle.acquire().await;
            let request = self.authorized_request(url).await;

            let response = match self.http_client.get(request).await {
                Ok(response) => response,
                Err(error) if error.retryable() && self.retry.can_retry(attempt) => {
                    self.pause(attempt, url).await;
                    attempt += 1;
                    continue;
                }
                Err(error) => {
                    return Err(ProviderError::unavailable(format!("yahoo {error}")));
                }
            };

            let status = response.status;
            if response.is_success() {
                return Ok(response.body);
            }

            if matches!(status, 401 | 429) && !session_refreshed {
                tracing::debug!(status, path = endpoint_path(url), "yahoo rejected session, refreshing");
                self.session.invalidate();
                session_refreshed = true;
                continue;
            }

            if self.retry.should_retry_status(status) && self.retry.can_retry(attempt) {
                self.pause(attempt, url).await;
                attempt += 1;
                continue;
            }

            return Err(match status {
                404 => ProviderError::not_found(format!("yahoo has no data at {}", endpoint_path(url))),
                429 => ProviderError::rate_limited("yahoo returned status 429"),
                400 => ProviderError::invalid_request(format!(
                    "yahoo rejected request to {}",
                    endpoint_path(url)
                )),
                _ => ProviderError::unavailable(format!("yahoo returned status {status}")),
            });
        }
    }

    async fn authorized_request(&self, url: &str) -> HttpRequest {
        let url = match self
            .session
            .crumb(self.http_client.as_ref(), self.timeout)
            .await
        {
            Ok(crumb) => {
                let separator = if url.contains('?') { '&' } else { '?' };
                format!("{url}{separator}crumb={}", urlencoding::encode(&crumb))
            }
            Err(error) => {
                tracing::debug!(error = %error, "continuing without yahoo crumb");
                url.to_owned()
            }
        };

        self.session.request(url, self.timeout)
    }

    async fn pause(&self, attempt: u32, url: &str) {
        let delay = self.retry.delay_for_attempt(attempt);
        tracing::debug!(
            attempt = attempt + 1,
            delay_ms = delay.as_millis() as u64,
            path = endpoint_path(url),
            "retrying yahoo call"
        );
        tokio::time::sleep(delay).await;
    }

    async fn history(&self, request: &HistoryRequest) -> Result<PriceSeries, ProviderError> {
        let url = format!(
            "{}/v8/finance/chart/{}?period1={}&period2={}&interval=1d&events=history",
            self.base_url,
            urlencoding::encode(request.symbol.as_str()),
            unix_midnight(request.start),
            unix_midnight(request.end),
        );
        let envelope: ChartEnvelope = self.get_json(&url).await?;
        series_from_chart(request, envelope)
    }

    async fn quote(&self, symbol: &Symbol) -> Result<QuoteSnapshot, ProviderError> {
        let url = format!(
            "{}/v7/finance/quote?symbols={}",
            self.base_url,
            urlencoding::encode(symbol.as_str())
        );
        let envelope: QuoteEnvelope = self.get_json(&url).await?;
        quote_from_envelope(symbol, envelope)
    }

    async fn profile(&self, symbol: &Symbol) -> Result<CompanyProfile, ProviderError> {
        let url = format!(
            "{}/v10/finance/quoteSummary/{}?modules=assetProfile,summaryDetail,price",
            self.base_url,
            urlencoding::encode(symbol.as_str())
        );
        let envelope: SummaryEnvelope = self.get_json(&url).await?;
        profile_from_envelope(symbol, envelope)
    }

    async fn keyword_search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>, ProviderError> {
        if query.trim().is_empty() {
            return Err(ProviderError::invalid_request("search query must not be empty"));
        }
        let url = format!(
            "{}/v1/finance/search?q={}&quotesCount={}&newsCount=0",
            self.base_url,
            urlencoding::encode(query.trim()),
            limit
        );
        let envelope: SearchEnvelope = self.get_json(&url).await?;
        Ok(hits_from_envelope(envelope, limit))
    }

    async fn recommendations(&self, symbol: &Symbol) -> Result<Vec<Symbol>, ProviderError> {
        let url = format!(
            "{}/v6/finance/recommendationsbysymbol/{}",
            self.base_url,
            urlencoding::encode(symbol.as_str())
        );
        let envelope: RecommendationEnvelope = self.get_json(&url).await?;
        recommendations_from_envelope(symbol, envelope)
    }
}

impl MarketDataProvider for YahooProvider {
    fn name(&self) -> &'static str {
        "yahoo"
    }

    fn fetch_history<'a>(
        &'a self,
        request: &'a HistoryRequest,
    ) -> Pin<Box<dyn Future<Output = Result<PriceSeries, ProviderError>> + Send + 'a>> {
        Box::pin(self.history(request))
    }

    fn fetch_quote<'a>(
        &'a self,
        symbol: &'a Symbol,
    ) -> Pin<Box<dyn Future<Output = Result<QuoteSnapshot, ProviderError>> + Send + 'a>> {
        Box::pin(self.quote(symbol))
    }

    fn fetch_profile<'a>(
        &'a self,
        symbol: &'a Symbol,
    ) -> Pin<Box<dyn Future<Output = Result<CompanyProfile, ProviderError>> + Send + 'a>> {
        Box::pin(self.profile(symbol))
    }

    fn search<'a>(
        &'a self,
        query: &'a str,
        limit: usize,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<SearchHit>, ProviderError>> + Send + 'a>> {
        Box::pin(self.keyword_search(query, limit))
    }

    fn related_symbols<'a>(
        &'a self,
        symbol: &'a Symbol,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Symbol>, ProviderError>> + Send + 'a>> {
        Box::pin(self.recommendations(symbol))
    }
}

/// Path portion of an endpoint URL, for log and error messages.
fn endpoint_path(url: &str) -> &str {
    let without_scheme = url.split_once("://").map_or(url, |(_, rest)| rest);
    let path = without_scheme
        .find('/')
        .map_or("/", |index| &without_scheme[index..]);
    path.split('?').next().unwrap_or(path)
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Deserialize)]
struct YahooApiError {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

impl YahooApiError {
    fn into_provider_error(self, symbol: &Symbol) -> ProviderError {
        let description = self.description.unwrap_or_default();
        match self.code.as_deref() {
            Some("Not Found") => ProviderError::not_found(format!("{symbol}: {description}")),
            Some(code) => ProviderError::unavailable(format!("yahoo error {code} for {symbol}: {description}")),
            None => ProviderError::unavailable(format!("yahoo error for {symbol}: {description}")),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    chart: ChartBody,
}

#[derive(Debug, Deserialize)]
struct ChartBody {
    #[serde(default)]
    result: Option<Vec<ChartResult>>,
    #[serde(default)]
    error: Option<YahooApiError>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    timestamp: Option<Vec<i64>>,
    indicators: ChartIndicators,
}

#[derive(Debug, Deserialize)]
struct ChartIndicators {
    #[serde(default)]
    quote: Vec<ChartQuote>,
}

#[derive(Debug, Deserialize)]
struct ChartQuote {
    #[serde(default)]
    close: Option<Vec<Option<f64>>>,
}

#[derive(Debug, Deserialize)]
struct QuoteEnvelope {
    #[serde(rename = "quoteResponse")]
    quote_response: QuoteBody,
}

#[derive(Debug, Deserialize)]
struct QuoteBody {
    #[serde(default)]
    result: Option<Vec<QuoteRow>>,
    #[serde(default)]
    error: Option<YahooApiError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteRow {
    symbol: String,
    long_name: Option<String>,
    short_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SummaryEnvelope {
    #[serde(rename = "quoteSummary")]
    quote_summary: SummaryBody,
}

#[derive(Debug, Deserialize)]
struct SummaryBody {
    #[serde(default)]
    result: Option<Vec<SummaryResult>>,
    #[serde(default)]
    error: Option<YahooApiError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SummaryResult {
    asset_profile: Option<AssetProfile>,
    summary_detail: Option<SummaryDetail>,
    price: Option<PriceModule>,
}

#[derive(Debug, Deserialize)]
struct AssetProfile {
    industry: Option<String>,
    sector: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SummaryDetail {
    market_cap: Option<RawValue>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PriceModule {
    market_cap: Option<RawValue>,
    long_name: Option<String>,
    short_name: Option<String>,
}

/// Yahoo wraps numbers as `{"raw": 1.0, "fmt": "1.00"}`.
#[derive(Debug, Deserialize)]
struct RawValue {
    #[serde(default)]
    raw: Option<f64>,
}

impl RawValue {
    fn value(&self) -> Option<f64> {
        self.raw.filter(|value| value.is_finite())
    }
}

#[derive(Debug, Deserialize)]
struct SearchEnvelope {
    #[serde(default)]
    quotes: Vec<SearchQuote>,
}

#[derive(Debug, Deserialize)]
struct SearchQuote {
    symbol: Option<String>,
    shortname: Option<String>,
    longname: Option<String>,
    exchange: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RecommendationEnvelope {
    finance: RecommendationBody,
}

#[derive(Debug, Deserialize)]
struct RecommendationBody {
    #[serde(default)]
    result: Option<Vec<RecommendationResult>>,
    #[serde(default)]
    error: Option<YahooApiError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecommendationResult {
    #[serde(default)]
    recommended_symbols: Vec<RecommendedSymbol>,
}

#[derive(Debug, Deserialize)]
struct RecommendedSymbol {
    symbol: String,
}

// ============================================================================
// Normalization
// ============================================================================

fn series_from_chart(
    request: &HistoryRequest,
    envelope: ChartEnvelope,
) -> Result<PriceSeries, ProviderError> {
    if let Some(error) = envelope.chart.error {
        return Err(error.into_provider_error(&request.symbol));
    }

    let result = envelope
        .chart
        .result
        .and_then(|results| results.into_iter().next())
        .ok_or_else(|| ProviderError::not_found(format!("no chart data for {}", request.symbol)))?;

    let timestamps = result.timestamp.unwrap_or_default();
    let closes = result
        .indicators
        .quote
        .into_iter()
        .next()
        .and_then(|quote| quote.close)
        .unwrap_or_default();

    let mut points: Vec<PricePoint> = timestamps
        .iter()
        .enumerate()
        .filter_map(|(index, seconds)| {
            let date = date_from_unix(*seconds)?;
            Some(PricePoint::new(date, closes.get(index).copied().flatten()))
        })
        .filter(|point| point.date >= request.start && point.date < request.end)
        .collect();
    points.sort_by_key(|point| point.date);
    points.dedup_by_key(|point| point.date);

    Ok(PriceSeries::new(request.symbol.clone(), points))
}

fn quote_from_envelope(symbol: &Symbol, envelope: QuoteEnvelope) -> Result<QuoteSnapshot, ProviderError> {
    if let Some(error) = envelope.quote_response.error {
        return Err(error.into_provider_error(symbol));
    }

    let rows = envelope.quote_response.result.unwrap_or_default();
    let row = rows
        .iter()
        .find(|row| row.symbol.eq_ignore_ascii_case(symbol.as_str()))
        .or_else(|| rows.first())
        .ok_or_else(|| ProviderError::not_found(format!("no quote for {symbol}")))?;

    Ok(QuoteSnapshot {
        long_name: row.long_name.clone(),
        short_name: row.short_name.clone(),
    })
}

fn profile_from_envelope(symbol: &Symbol, envelope: SummaryEnvelope) -> Result<CompanyProfile, ProviderError> {
    if let Some(error) = envelope.quote_summary.error {
        return Err(error.into_provider_error(symbol));
    }

    let result = envelope
        .quote_summary
        .result
        .and_then(|results| results.into_iter().next())
        .ok_or_else(|| ProviderError::not_found(format!("no summary for {symbol}")))?;
    let profile = result
        .asset_profile
        .ok_or_else(|| ProviderError::not_found(format!("no asset profile for {symbol}")))?;

    let price = result.price;
    let market_cap = result
        .summary_detail
        .and_then(|detail| detail.market_cap)
        .and_then(|cap| cap.value())
        .or_else(|| {
            price
                .as_ref()
                .and_then(|price| price.market_cap.as_ref())
                .and_then(RawValue::value)
        });
    let name = price.and_then(|price| price.long_name.or(price.short_name));

    Ok(CompanyProfile {
        name,
        industry: profile.industry,
        sector: profile.sector,
        market_cap,
    })
}

fn hits_from_envelope(envelope: SearchEnvelope, limit: usize) -> Vec<SearchHit> {
    envelope
        .quotes
        .into_iter()
        .filter_map(|quote| {
            let symbol = Symbol::parse(quote.symbol.as_deref()?).ok()?;
            Some(SearchHit {
                symbol,
                name: quote.longname.or(quote.shortname),
                exchange: quote.exchange,
            })
        })
        .take(limit)
        .collect()
}

fn recommendations_from_envelope(
    symbol: &Symbol,
    envelope: RecommendationEnvelope,
) -> Result<Vec<Symbol>, ProviderError> {
    if let Some(error) = envelope.finance.error {
        return Err(error.into_provider_error(symbol));
    }

    Ok(envelope
        .finance
        .result
        .unwrap_or_default()
        .into_iter()
        .flat_map(|result| result.recommended_symbols)
        .filter_map(|recommended| Symbol::parse(&recommended.symbol).ok())
        .collect())
}
