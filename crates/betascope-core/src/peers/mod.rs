//! # Peer Discovery & Ranking Engine
//!
//! [`CandidateAggregator`] gathers suggestions, [`PeerVerifier`] confirms
//! industry membership and orders by market-cap proximity. The
//! [`IndustryTable`] is loaded once and shared read-only.

mod aggregator;
mod industry;
mod ranker;

pub use aggregator::{CandidateAggregator, CandidateSet, CandidateSource, PeerCandidate};
pub use industry::{IndustryEntry, IndustryTable};
pub use ranker::{cap_distance, rank, PeerVerifier, TargetClass, VerifiedPeer};
