use std::collections::HashSet;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

use serde::Serialize;

use crate::domain::Symbol;
use crate::peers::IndustryTable;
use crate::provider::MarketDataProvider;

/// Where a peer suggestion came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateSource {
    Recommendation,
    IndustryTable,
    Search,
}

impl CandidateSource {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Recommendation => "recommendation",
            Self::IndustryTable => "industry_table",
            Self::Search => "search",
        }
    }
}

impl Display for CandidateSource {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unverified peer hint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerCandidate {
    pub symbol: Symbol,
    pub source: CandidateSource,
}

/// Candidates unique by symbol. The first source to suggest a symbol keeps
/// the tag; iteration follows insertion order.
#[derive(Debug, Clone, Default)]
pub struct CandidateSet {
    candidates: Vec<PeerCandidate>,
    seen: HashSet<Symbol>,
}

impl CandidateSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `symbol` unless already present. Returns whether it was new.
    pub fn insert(&mut self, symbol: Symbol, source: CandidateSource) -> bool {
        if !self.seen.insert(symbol.clone()) {
            return false;
        }
        self.candidates.push(PeerCandidate { symbol, source });
        true
    }

    pub fn extend(
        &mut self,
        symbols: impl IntoIterator<Item = Symbol>,
        source: CandidateSource,
    ) -> usize {
        symbols
            .into_iter()
            .map(|symbol| self.insert(symbol, source))
            .filter(|added| *added)
            .count()
    }

    pub fn contains(&self, symbol: &Symbol) -> bool {
        self.seen.contains(symbol)
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PeerCandidate> {
        self.candidates.iter()
    }

    pub fn symbols(&self) -> impl Iterator<Item = &Symbol> {
        self.candidates.iter().map(|candidate| &candidate.symbol)
    }
}

/// Merges peer suggestions from the recommendation feed, the industry table
/// and, when those are thin, a keyword search on the industry name.
#[derive(Clone)]
pub struct CandidateAggregator {
    provider: Arc<dyn MarketDataProvider>,
    table: Arc<IndustryTable>,
    search_threshold: usize,
    search_limit: usize,
}

impl CandidateAggregator {
    pub fn new(
        provider: Arc<dyn MarketDataProvider>,
        table: Arc<IndustryTable>,
        search_threshold: usize,
        search_limit: usize,
    ) -> Self {
        Self {
            provider,
            table,
            search_threshold,
            search_limit,
        }
    }

    /// Every source is best-effort: a failing source contributes nothing.
    pub async fn collect(&self, target: &Symbol, provider_industry: Option<&str>) -> CandidateSet {
        let mut candidates = CandidateSet::new();

        match self.provider.related_symbols(target).await {
            Ok(related) => {
                let added = candidates.extend(related, CandidateSource::Recommendation);
                tracing::debug!(target = %target, added, "recommendation candidates");
            }
            Err(error) => {
                tracing::warn!(target = %target, error = %error, "recommendation feed unavailable");
            }
        }

        if let Some(industry) = self.table.industry_of(target) {
            let peers = self.table_peers(target, industry);
            let added = candidates.extend(peers, CandidateSource::IndustryTable);
            tracing::debug!(target = %target, industry, added, "industry table candidates");
        }

        let industry = provider_industry
            .map(str::trim)
            .filter(|industry| !industry.is_empty() && candidates.len() < self.search_threshold);
        if let Some(industry) = industry {
            match self.provider.search(industry, self.search_limit).await {
                Ok(hits) => {
                    let listed = hits
                        .into_iter()
                        .map(|hit| hit.symbol)
                        .filter(Symbol::has_national_suffix);
                    let added = candidates.extend(listed, CandidateSource::Search);
                    tracing::debug!(target = %target, industry, added, "search candidates");
                }
                Err(error) => {
                    tracing::warn!(target = %target, industry, error = %error, "industry search failed");
                }
            }
        }

        tracing::info!(target = %target, candidates = candidates.len(), "peer candidates collected");
        candidates
    }

    /// Table members of `industry`, listed on the target's exchange.
    fn table_peers(&self, target: &Symbol, industry: &str) -> Vec<Symbol> {
        let suffix = target.suffix().unwrap_or("NS");
        self.table
            .members_of(industry)
            .filter(|base| *base != target.base())
            .filter_map(|base| Symbol::parse(&format!("{base}.{suffix}")).ok())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn symbol(value: &str) -> Symbol {
        Symbol::parse(value).expect("valid symbol")
    }

    #[test]
    fn deduplicates_across_sources_keeping_first_tag() {
        let mut set = CandidateSet::new();
        set.extend([symbol("X.NS"), symbol("Y.NS")], CandidateSource::Recommendation);
        set.extend([symbol("Y.NS"), symbol("Z.NS")], CandidateSource::IndustryTable);
        let added = set.extend([symbol("Z.NS"), symbol("W.NS")], CandidateSource::Search);

        assert_eq!(added, 1);
        assert_eq!(set.len(), 4);
        let y = set.iter().find(|c| c.symbol.as_str() == "Y.NS").expect("present");
        assert_eq!(y.source, CandidateSource::Recommendation);
        assert!(set.contains(&symbol("W.NS")));
    }
}
