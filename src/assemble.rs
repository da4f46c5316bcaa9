//! # Output Assembler
//!
//! Attaches a cluster id and confidence tag to every input row and builds the
//! review report: possible matches, conflict-flagged clusters and the full
//! decision log, each with its component breakdown.

use crate::conflicts::ConflictedCluster;
use crate::linker::{Clusters, ReviewQueue};
use crate::model::{CandidatePair, ClusterId, MatchConfidence, MatchDecision, RawRecord, RecordId};
use crate::scoring::{MatchExplanation, ScoredPair};
use anyhow::{anyhow, Result};
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

/// One input row augmented with its resolution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RosterEntry {
    pub record_id: RecordId,
    pub provider: RawRecord,
    pub cluster_id: ClusterId,
    pub match_confidence: MatchConfidence,
}

/// A pair awaiting a reviewer's decision
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewPair {
    pub pair: CandidatePair,
    pub total: f64,
    pub cluster_a: ClusterId,
    pub cluster_b: ClusterId,
    pub explanation: MatchExplanation,
}

/// Audit trail handed to human reviewers
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReviewReport {
    pub possible_matches: Vec<ReviewPair>,
    pub conflicted_clusters: Vec<ConflictedCluster>,
    /// Every definite and possible decision, for explaining merges
    pub decisions: Vec<ScoredPair>,
}

impl ReviewReport {
    pub fn is_empty(&self) -> bool {
        self.possible_matches.is_empty() && self.conflicted_clusters.is_empty()
    }
}

/// Build the augmented roster and review report. `raw_records[i]` is the row
/// loaded as record `i`.
pub fn assemble(
    raw_records: &[RawRecord],
    clusters: &Clusters,
    review_queue: &ReviewQueue,
    scored_pairs: &[ScoredPair],
) -> Result<(Vec<RosterEntry>, ReviewReport)> {
    let under_review: FxHashSet<RecordId> = review_queue
        .possible_matches
        .iter()
        .flat_map(|scored| [scored.pair.a, scored.pair.b])
        .collect();

    let roster = raw_records
        .iter()
        .enumerate()
        .map(|(index, provider)| {
            let record_id = RecordId::from_index(index)
                .ok_or_else(|| anyhow!("roster row {index} exceeds the record id space"))?;
            let cluster = clusters.cluster_of(record_id);
            let cluster_id = cluster
                .map(|cluster| cluster.id)
                .unwrap_or_else(|| ClusterId::from_representative(record_id));

            let match_confidence = match cluster {
                Some(cluster) if cluster.conflict_flag => MatchConfidence::FlaggedPossible,
                _ if under_review.contains(&record_id) => MatchConfidence::FlaggedPossible,
                Some(cluster) if !cluster.is_singleton() => MatchConfidence::Definite,
                _ => MatchConfidence::Singleton,
            };

            Ok(RosterEntry {
                record_id,
                provider: provider.clone(),
                cluster_id,
                match_confidence,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let cluster_id_of = |record_id: RecordId| {
        clusters
            .cluster_of(record_id)
            .map(|cluster| cluster.id)
            .unwrap_or_else(|| ClusterId::from_representative(record_id))
    };

    let possible_matches = review_queue
        .possible_matches
        .iter()
        .map(|scored| ReviewPair {
            pair: scored.pair,
            total: scored.total,
            cluster_a: cluster_id_of(scored.pair.a),
            cluster_b: cluster_id_of(scored.pair.b),
            explanation: scored.explanation.clone(),
        })
        .collect();

    let decisions = scored_pairs
        .iter()
        .filter(|scored| scored.decision != MatchDecision::NonMatch)
        .cloned()
        .collect();

    let report = ReviewReport {
        possible_matches,
        conflicted_clusters: review_queue.conflicted_clusters.clone(),
        decisions,
    };

    Ok((roster, report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linker::Cluster;
    use crate::scoring::{Component, Contribution};

    fn cluster(members: &[u32], representative: u32, conflict_flag: bool) -> Cluster {
        Cluster {
            id: ClusterId(representative),
            representative: RecordId(representative),
            members: members.iter().copied().map(RecordId).collect(),
            conflict_flag,
        }
    }

    fn possible(a: u32, b: u32) -> ScoredPair {
        let explanation = MatchExplanation {
            contributions: vec![Contribution {
                component: Component::NameSimilarity,
                feature: 1.0,
                contribution: 3.0,
            }],
        };
        ScoredPair {
            pair: CandidatePair::new(RecordId(a), RecordId(b)).unwrap(),
            total: 3.0,
            decision: MatchDecision::Possible,
            explanation,
        }
    }

    #[test]
    fn roster_tags_each_record() {
        let raws = vec![RawRecord::default(); 6];
        let clusters = Clusters::new(vec![
            cluster(&[0, 1], 1, false),
            cluster(&[2], 2, false),
            cluster(&[3], 3, false),
            cluster(&[4, 5], 4, true),
        ]);
        let review = ReviewQueue {
            possible_matches: vec![possible(2, 0)],
            conflicted_clusters: Vec::new(),
        };

        let (roster, report) =
            assemble(&raws, &clusters, &review, &review.possible_matches).unwrap();

        let tags: Vec<MatchConfidence> = roster.iter().map(|entry| entry.match_confidence).collect();
        assert_eq!(
            tags,
            vec![
                MatchConfidence::FlaggedPossible,
                MatchConfidence::Definite,
                MatchConfidence::FlaggedPossible,
                MatchConfidence::Singleton,
                MatchConfidence::FlaggedPossible,
                MatchConfidence::FlaggedPossible,
            ]
        );
        assert_eq!(roster[0].cluster_id, ClusterId(1));
        assert_eq!(roster[3].cluster_id, ClusterId(3));

        assert_eq!(report.possible_matches.len(), 1);
        assert_eq!(report.possible_matches[0].cluster_a, ClusterId(1));
        assert_eq!(report.possible_matches[0].cluster_b, ClusterId(2));
        assert_eq!(report.decisions.len(), 1);
    }

    #[test]
    fn empty_review_queue_gives_empty_report() {
        let clusters = Clusters::new(vec![cluster(&[0], 0, false)]);
        let (roster, report) =
            assemble(&[RawRecord::default()], &clusters, &ReviewQueue::default(), &[]).unwrap();
        assert_eq!(roster.len(), 1);
        assert_eq!(roster[0].match_confidence, MatchConfidence::Singleton);
        assert!(report.is_empty());
    }
}
