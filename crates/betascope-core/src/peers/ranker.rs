use std::sync::Arc;

use futures::future::join_all;
use serde::Serialize;
use tokio::sync::Semaphore;

use crate::domain::{CompanyProfile, Symbol};
use crate::peers::{CandidateSet, CandidateSource, IndustryTable, PeerCandidate};
use crate::provider::{MarketDataProvider, ProviderError};

/// Candidate confirmed to share the target's industry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VerifiedPeer {
    pub symbol: Symbol,
    pub display_name: Option<String>,
    pub sector_path: String,
    pub market_cap: f64,
    /// Ranking key only.
    pub cap_distance: f64,
    pub source: CandidateSource,
}

/// What the verifier knows about the target.
#[derive(Debug, Clone, Copy)]
pub struct TargetClass<'a> {
    pub symbol: &'a Symbol,
    pub provider_industry: Option<&'a str>,
    pub table_industry: Option<&'a str>,
    pub market_cap: f64,
}

impl<'a> TargetClass<'a> {
    pub fn new(symbol: &'a Symbol, profile: &'a CompanyProfile, table: &'a IndustryTable) -> Self {
        Self {
            symbol,
            provider_industry: profile.industry(),
            table_industry: table.industry_of(symbol),
            market_cap: profile.market_cap_or_zero(),
        }
    }
}

/// `|peer - target| / target`, or `0` when the target cap is unknown.
pub fn cap_distance(peer_cap: f64, target_cap: f64) -> f64 {
    if target_cap > 0.0 {
        (peer_cap - target_cap).abs() / target_cap
    } else {
        0.0
    }
}

/// Ascending cap distance, ties kept in input order, truncated to `limit`.
pub fn rank(mut peers: Vec<VerifiedPeer>, limit: usize) -> Vec<VerifiedPeer> {
    peers.sort_by(|a, b| a.cap_distance.total_cmp(&b.cap_distance));
    peers.truncate(limit);
    peers
}

/// Fetches candidate profiles, keeps same-industry companies and ranks
/// them by market-cap proximity.
#[derive(Clone)]
pub struct PeerVerifier {
    provider: Arc<dyn MarketDataProvider>,
    table: Arc<IndustryTable>,
    max_concurrency: usize,
    max_peers: usize,
}

impl PeerVerifier {
    pub fn new(
        provider: Arc<dyn MarketDataProvider>,
        table: Arc<IndustryTable>,
        max_concurrency: usize,
        max_peers: usize,
    ) -> Self {
        Self {
            provider,
            table,
            max_concurrency: max_concurrency.max(1),
            max_peers,
        }
    }

    pub async fn verify_and_rank(
        &self,
        target: TargetClass<'_>,
        candidates: &CandidateSet,
    ) -> Vec<VerifiedPeer> {
        let semaphore = Semaphore::new(self.max_concurrency);
        let semaphore = &semaphore;
        let fetches = candidates.iter().map(|candidate| async move {
            let _permit = semaphore.acquire().await.ok();
            self.provider.fetch_profile(&candidate.symbol).await
        });
        let profiles = join_all(fetches).await;

        let verified: Vec<VerifiedPeer> = candidates
            .iter()
            .zip(profiles)
            .filter_map(|(candidate, profile)| self.classify(&target, candidate, profile))
            .collect();

        let ranked = rank(verified, self.max_peers);
        tracing::info!(
            target = %target.symbol,
            candidates = candidates.len(),
            verified = ranked.len(),
            "peers verified and ranked"
        );
        ranked
    }

    fn classify(
        &self,
        target: &TargetClass<'_>,
        candidate: &PeerCandidate,
        profile: Result<CompanyProfile, ProviderError>,
    ) -> Option<VerifiedPeer> {
        if &candidate.symbol == target.symbol {
            return None;
        }

        let profile = match profile {
            Ok(profile) => profile,
            Err(error) => {
                tracing::debug!(candidate = %candidate.symbol, error = %error, "candidate profile unavailable");
                return None;
            }
        };

        let industry = profile.industry()?;
        let provider_match = target.provider_industry == Some(industry);
        let table_match = target
            .table_industry
            .is_some_and(|expected| self.table.industry_of(&candidate.symbol) == Some(expected));
        if !(provider_match || table_match) {
            tracing::debug!(candidate = %candidate.symbol, industry, "candidate in a different industry");
            return None;
        }

        let market_cap = profile.market_cap_or_zero();
        Some(VerifiedPeer {
            symbol: candidate.symbol.clone(),
            display_name: profile.name.clone(),
            sector_path: profile.sector_path(),
            market_cap,
            cap_distance: cap_distance(market_cap, target.market_cap),
            source: candidate.source,
        })
    }
}
