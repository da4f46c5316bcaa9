//! # Rosterlink
//!
//! Entity resolution for healthcare provider rosters.
//!
//! Raw rows are normalized, grouped into candidate pairs by five independent
//! blocking strategies, scored with an explainable weighted component table,
//! and clustered with a disjoint-set forest. A post-hoc audit flags clusters
//! that transitive merging joined across an NPI conflict, and every decision
//! that matters for review keeps its component breakdown.
//!
//! ```no_run
//! use rosterlink::{RawRecord, Resolver, ResolverConfig};
//!
//! # fn main() -> anyhow::Result<()> {
//! let resolver = Resolver::new(ResolverConfig::default())?;
//! let rows = vec![RawRecord::default()];
//! let resolution = resolver.resolve(&rows)?;
//! assert_eq!(resolution.roster.len(), 1);
//! # Ok(())
//! # }
//! ```

pub mod assemble;
pub mod blocking;
pub mod config;
pub mod conflicts;
pub mod dsu;
pub mod linker;
pub mod model;
pub mod normalize;
pub mod scoring;
pub mod similarity;

pub use assemble::{ReviewPair, ReviewReport, RosterEntry};
pub use config::{ConfigError, ResolverConfig};
pub use linker::{Cluster, Clusters};
pub use model::{
    CandidatePair, ClusterId, MatchConfidence, MatchDecision, RawRecord, Record, RecordId,
};
pub use scoring::{Component, MatchExplanation, ScoredPair, Scorer};

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

/// Summary counts for one resolution run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionStats {
    pub records: usize,
    pub blocks: usize,
    pub candidate_pairs: usize,
    pub definite_pairs: usize,
    pub possible_pairs: usize,
    pub non_match_pairs: usize,
    pub clusters: usize,
    /// Clusters holding more than one input record
    pub multi_member_clusters: usize,
    pub conflicted_clusters: usize,
}

/// Complete output of one run
#[derive(Debug, Clone)]
pub struct Resolution {
    pub records: Vec<Record>,
    pub clusters: Clusters,
    pub roster: Vec<RosterEntry>,
    pub review: ReviewReport,
    /// Every scored candidate pair in canonical pair order
    pub scored_pairs: Vec<ScoredPair>,
    pub stats: ResolutionStats,
}

impl Resolution {
    /// Scored pairs ordered by total score, highest first; ties keep pair order.
    pub fn pairs_by_score(&self) -> Vec<&ScoredPair> {
        let mut pairs: Vec<&ScoredPair> = self.scored_pairs.iter().collect();
        pairs.sort_by(|a, b| b.total.total_cmp(&a.total));
        pairs
    }
}

/// Main API for provider resolution. Construction validates the
/// configuration, so a `Resolver` never scores with bad weights.
#[derive(Debug, Clone)]
pub struct Resolver {
    config: ResolverConfig,
    scorer: Scorer,
}

impl Resolver {
    pub fn new(config: ResolverConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let scorer = Scorer::new(&config)?;
        Ok(Self { config, scorer })
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    pub fn scorer(&self) -> &Scorer {
        &self.scorer
    }

    /// Run a full resolution pass. Record ids follow the order of `raw_records`.
    /// Either a complete partition is returned or an error; nothing partial.
    #[instrument(skip_all, fields(records = raw_records.len()))]
    pub fn resolve(&self, raw_records: &[RawRecord]) -> Result<Resolution> {
        let records = normalize::normalize_all(raw_records)?;

        let outcome = linker::cluster_records(
            &records,
            &self.scorer,
            self.config.blocking.max_block_size,
            self.config.merge_queue_capacity,
        )?;

        let (roster, review) = assemble::assemble(
            raw_records,
            &outcome.clusters,
            &outcome.review_queue,
            &outcome.scored_pairs,
        )?;

        let count = |decision: MatchDecision| {
            outcome
                .scored_pairs
                .iter()
                .filter(|scored| scored.decision == decision)
                .count()
        };
        let stats = ResolutionStats {
            records: records.len(),
            blocks: outcome.block_count,
            candidate_pairs: outcome.scored_pairs.len(),
            definite_pairs: count(MatchDecision::Definite),
            possible_pairs: count(MatchDecision::Possible),
            non_match_pairs: count(MatchDecision::NonMatch),
            clusters: outcome.clusters.len(),
            multi_member_clusters: outcome
                .clusters
                .iter()
                .filter(|cluster| !cluster.is_singleton())
                .count(),
            conflicted_clusters: review.conflicted_clusters.len(),
        };
        info!(
            records = stats.records,
            candidates = stats.candidate_pairs,
            definite = stats.definite_pairs,
            possible = stats.possible_pairs,
            clusters = stats.clusters,
            multi_member = stats.multi_member_clusters,
            conflicted = stats.conflicted_clusters,
            "resolution complete"
        );

        Ok(Resolution {
            records,
            clusters: outcome.clusters,
            roster,
            review,
            scored_pairs: outcome.scored_pairs,
            stats,
        })
    }
}
