//! # Conflicts Module
//!
//! Post-hoc conflict audit over a finished partition. Union-find merges are
//! transitive, so A~B and B~C put A and C together even when a direct A-C
//! comparison recorded an NPI conflict. The audit finds such clusters by
//! scanning only pairs that were actually scored; it never undoes a union.

use crate::linker::Clusters;
use crate::model::{ClusterId, MatchDecision, RecordId};
use crate::scoring::ScoredPair;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// A merged cluster containing a directly scored pair with an NPI conflict
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConflictedCluster {
    pub cluster_id: ClusterId,
    pub representative: RecordId,
    pub members: Vec<RecordId>,
    /// Scored pairs inside the cluster that carry a conflict component
    pub conflicting_pairs: Vec<ScoredPair>,
    /// Definite edges inside the cluster that joined it
    pub merge_edges: Vec<ScoredPair>,
}

/// Scan every scored pair whose endpoints share a multi-member cluster and
/// report the clusters holding at least one conflicting pair, ordered by
/// cluster id.
pub fn audit_conflicts(clusters: &Clusters, scored_pairs: &[ScoredPair]) -> Vec<ConflictedCluster> {
    let mut conflicts: FxHashMap<ClusterId, Vec<&ScoredPair>> = FxHashMap::default();
    let mut edges: FxHashMap<ClusterId, Vec<&ScoredPair>> = FxHashMap::default();

    for scored in scored_pairs {
        let Some(cluster) = clusters.shared_cluster(scored.pair.a, scored.pair.b) else {
            continue;
        };
        if cluster.members.len() < 2 {
            continue;
        }
        if scored.has_conflict() {
            conflicts.entry(cluster.id).or_default().push(scored);
        }
        if scored.decision == MatchDecision::Definite {
            edges.entry(cluster.id).or_default().push(scored);
        }
    }

    let mut flagged: Vec<ConflictedCluster> = conflicts
        .into_iter()
        .filter_map(|(cluster_id, conflicting)| {
            let cluster = clusters.get(cluster_id)?;
            Some(ConflictedCluster {
                cluster_id,
                representative: cluster.representative,
                members: cluster.members.clone(),
                conflicting_pairs: conflicting.into_iter().cloned().collect(),
                merge_edges: edges
                    .remove(&cluster_id)
                    .unwrap_or_default()
                    .into_iter()
                    .cloned()
                    .collect(),
            })
        })
        .collect();
    flagged.sort_by_key(|conflicted| conflicted.cluster_id);
    flagged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linker::Cluster;
    use crate::model::CandidatePair;
    use crate::scoring::{Component, Contribution, MatchExplanation};

    fn scored(a: u32, b: u32, decision: MatchDecision, conflict: bool) -> ScoredPair {
        let mut contributions = vec![Contribution {
            component: Component::LicenseMatch,
            feature: 1.0,
            contribution: 5.0,
        }];
        if conflict {
            contributions.push(Contribution {
                component: Component::NpiConflict,
                feature: 1.0,
                contribution: -4.0,
            });
        }
        let explanation = MatchExplanation { contributions };
        ScoredPair {
            pair: CandidatePair::new(RecordId(a), RecordId(b)).unwrap(),
            total: explanation.total(),
            decision,
            explanation,
        }
    }

    fn cluster(members: &[u32]) -> Cluster {
        Cluster {
            id: ClusterId(members[0]),
            representative: RecordId(members[0]),
            members: members.iter().copied().map(RecordId).collect(),
            conflict_flag: false,
        }
    }

    #[test]
    fn conflict_inside_cluster_is_reported() {
        let clusters = Clusters::new(vec![cluster(&[0, 1, 2]), cluster(&[3])]);
        let pairs = vec![
            scored(0, 1, MatchDecision::Definite, false),
            scored(1, 2, MatchDecision::Definite, false),
            scored(0, 2, MatchDecision::NonMatch, true),
        ];

        let flagged = audit_conflicts(&clusters, &pairs);
        assert_eq!(flagged.len(), 1);
        assert_eq!(flagged[0].cluster_id, ClusterId(0));
        assert_eq!(flagged[0].conflicting_pairs.len(), 1);
        assert_eq!(flagged[0].merge_edges.len(), 2);
    }

    #[test]
    fn conflict_across_clusters_is_ignored() {
        let clusters = Clusters::new(vec![cluster(&[0, 1]), cluster(&[2, 3])]);
        let pairs = vec![
            scored(0, 1, MatchDecision::Definite, false),
            scored(2, 3, MatchDecision::Definite, false),
            scored(1, 2, MatchDecision::NonMatch, true),
        ];
        assert!(audit_conflicts(&clusters, &pairs).is_empty());
    }

    #[test]
    fn clean_clusters_are_not_flagged() {
        let clusters = Clusters::new(vec![cluster(&[0, 1])]);
        let pairs = vec![scored(0, 1, MatchDecision::Definite, false)];
        assert!(audit_conflicts(&clusters, &pairs).is_empty());
    }

    #[test]
    fn definite_pair_with_conflict_component_is_flagged() {
        let clusters = Clusters::new(vec![cluster(&[4, 9])]);
        let pairs = vec![scored(4, 9, MatchDecision::Definite, true)];
        let flagged = audit_conflicts(&clusters, &pairs);
        assert_eq!(flagged.len(), 1);
        assert_eq!(flagged[0].members, vec![RecordId(4), RecordId(9)]);
    }
}
