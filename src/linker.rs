//! # Linker Module
//!
//! Clustering engine. Candidate pairs are scored in parallel; definite
//! decisions stream through a bounded channel to a single merge stage that
//! owns the disjoint-set forest. Once every union has been applied the
//! partition is audited for conflicts and each cluster gets a representative.

use crate::blocking;
use crate::conflicts::{self, ConflictedCluster};
use crate::dsu::RecordDsu;
use crate::model::{CandidatePair, ClusterId, MatchDecision, Record, RecordId};
use crate::scoring::{ScoredPair, Scorer};
use anyhow::{anyhow, Result};
use crossbeam_channel::{bounded, Receiver};
use rayon::prelude::*;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// A maximal set of records connected through definite-match edges
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cluster {
    pub id: ClusterId,
    pub representative: RecordId,
    /// Members sorted by record id
    pub members: Vec<RecordId>,
    /// Set when a directly scored pair inside the cluster has an NPI conflict
    pub conflict_flag: bool,
}

impl Cluster {
    pub fn is_singleton(&self) -> bool {
        self.members.len() == 1
    }
}

/// Final partition of all records into clusters
#[derive(Debug, Clone, Default)]
pub struct Clusters {
    pub clusters: Vec<Cluster>,
    record_to_cluster: FxHashMap<RecordId, usize>,
    id_to_cluster: FxHashMap<ClusterId, usize>,
}

impl Clusters {
    pub fn new(clusters: Vec<Cluster>) -> Self {
        let mut record_to_cluster = FxHashMap::default();
        let mut id_to_cluster = FxHashMap::default();
        for (index, cluster) in clusters.iter().enumerate() {
            id_to_cluster.insert(cluster.id, index);
            for &member in &cluster.members {
                record_to_cluster.insert(member, index);
            }
        }
        Self {
            clusters,
            record_to_cluster,
            id_to_cluster,
        }
    }

    pub fn len(&self) -> usize {
        self.clusters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Cluster> {
        self.clusters.iter()
    }

    pub fn get(&self, cluster_id: ClusterId) -> Option<&Cluster> {
        self.id_to_cluster
            .get(&cluster_id)
            .map(|&index| &self.clusters[index])
    }

    /// Cluster containing a record
    pub fn cluster_of(&self, record_id: RecordId) -> Option<&Cluster> {
        self.record_to_cluster
            .get(&record_id)
            .map(|&index| &self.clusters[index])
    }

    /// Cluster containing both records, if they share one
    pub fn shared_cluster(&self, a: RecordId, b: RecordId) -> Option<&Cluster> {
        let left = self.record_to_cluster.get(&a)?;
        let right = self.record_to_cluster.get(&b)?;
        (left == right).then(|| &self.clusters[*left])
    }

    fn flag(&mut self, cluster_id: ClusterId) {
        if let Some(&index) = self.id_to_cluster.get(&cluster_id) {
            self.clusters[index].conflict_flag = true;
        }
    }
}

/// Items awaiting manual adjudication
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReviewQueue {
    /// Pairs in the possible band; never merged
    pub possible_matches: Vec<ScoredPair>,
    /// Merged clusters the conflict audit refused to auto-accept
    pub conflicted_clusters: Vec<ConflictedCluster>,
}

/// Everything the clustering engine produces for one run
#[derive(Debug, Clone)]
pub struct ClusterOutcome {
    pub clusters: Clusters,
    pub review_queue: ReviewQueue,
    /// Every scored candidate pair in canonical pair order
    pub scored_pairs: Vec<ScoredPair>,
    pub block_count: usize,
    pub merges: usize,
}

/// Block, score, merge and audit a set of normalized records.
pub fn cluster_records(
    records: &[Record],
    scorer: &Scorer,
    max_block_size: Option<usize>,
    queue_capacity: usize,
) -> Result<ClusterOutcome> {
    let blocks = blocking::build_blocks(records);
    let candidates = blocks.generate_candidates(max_block_size);
    info!(
        records = records.len(),
        blocks = blocks.len(),
        candidates = candidates.len(),
        "generated candidate pairs"
    );

    let (scored_pairs, mut dsu) = score_and_merge(records, &candidates, scorer, queue_capacity)?;
    let merges = dsu.merges();
    let mut outcome = finalize(records, &mut dsu, scored_pairs);
    outcome.block_count = blocks.len();
    outcome.merges = merges;
    Ok(outcome)
}

/// Score candidates on the rayon pool and apply definite unions on a single
/// owner thread. Returns all scored pairs in candidate order and the forest.
pub fn score_and_merge(
    records: &[Record],
    candidates: &[CandidatePair],
    scorer: &Scorer,
    queue_capacity: usize,
) -> Result<(Vec<ScoredPair>, RecordDsu)> {
    let by_id: FxHashMap<RecordId, &Record> =
        records.iter().map(|record| (record.record_id, record)).collect();
    let (decisions, inbox) = bounded::<CandidatePair>(queue_capacity);

    std::thread::scope(|scope| {
        let merger = scope.spawn(move || {
            merge_stage(records.iter().map(|record| record.record_id), inbox)
        });

        let scored: Result<Vec<ScoredPair>> = candidates
            .par_iter()
            .map_with(decisions, |decisions, pair| {
                let a = by_id
                    .get(&pair.a)
                    .ok_or_else(|| anyhow!("candidate references unknown record {}", pair.a))?;
                let b = by_id
                    .get(&pair.b)
                    .ok_or_else(|| anyhow!("candidate references unknown record {}", pair.b))?;
                let scored = scorer.score(a, b);
                if scored.decision == MatchDecision::Definite {
                    decisions
                        .send(scored.pair)
                        .map_err(|_| anyhow!("merge stage stopped before scoring finished"))?;
                }
                Ok(scored)
            })
            .collect();

        let dsu = merger
            .join()
            .map_err(|_| anyhow!("merge stage panicked"))?;
        Ok((scored?, dsu))
    })
}

/// Serialized merge stage: the only code that mutates the forest.
pub fn merge_stage(
    record_ids: impl IntoIterator<Item = RecordId>,
    decisions: Receiver<CandidatePair>,
) -> RecordDsu {
    let mut dsu = RecordDsu::with_records(record_ids);
    for pair in decisions {
        dsu.union(pair.a, pair.b);
    }
    debug!(merges = dsu.merges(), clusters = dsu.num_clusters(), "merge stage drained");
    dsu
}

/// Turn a completed forest into clusters with representatives, run the
/// conflict audit and fill the review queue.
pub fn finalize(records: &[Record], dsu: &mut RecordDsu, scored_pairs: Vec<ScoredPair>) -> ClusterOutcome {
    let by_id: FxHashMap<RecordId, &Record> =
        records.iter().map(|record| (record.record_id, record)).collect();

    let partition = dsu.partition();
    let cluster_list: Vec<Cluster> = partition
        .sets
        .into_iter()
        .map(|members| {
            let representative = select_representative(&members, &by_id);
            Cluster {
                id: ClusterId::from_representative(representative),
                representative,
                members,
                conflict_flag: false,
            }
        })
        .collect();
    let mut clusters = Clusters::new(cluster_list);

    let conflicted_clusters = conflicts::audit_conflicts(&clusters, &scored_pairs);
    for conflicted in &conflicted_clusters {
        warn!(
            cluster = %conflicted.cluster_id,
            members = conflicted.members.len(),
            conflicts = conflicted.conflicting_pairs.len(),
            "conflict inside merged cluster, routing to review"
        );
        clusters.flag(conflicted.cluster_id);
    }

    // A possible pair already joined through other definite edges is settled.
    let possible_matches: Vec<ScoredPair> = scored_pairs
        .iter()
        .filter(|scored| scored.decision == MatchDecision::Possible)
        .filter(|scored| clusters.shared_cluster(scored.pair.a, scored.pair.b).is_none())
        .cloned()
        .collect();

    ClusterOutcome {
        clusters,
        review_queue: ReviewQueue {
            possible_matches,
            conflicted_clusters,
        },
        scored_pairs,
        block_count: 0,
        merges: 0,
    }
}

/// Member with the most populated mandatory fields (npi, license number,
/// name, phone); ties go to the lowest record id.
pub fn select_representative(
    members: &[RecordId],
    records: &FxHashMap<RecordId, &Record>,
) -> RecordId {
    members
        .iter()
        .copied()
        .max_by(|a, b| {
            let score_a = records.get(a).map_or(0, |record| record.completeness());
            let score_b = records.get(b).map_or(0, |record| record.completeness());
            // lower id wins ties, so it must compare as greater
            score_a.cmp(&score_b).then_with(|| b.cmp(a))
        })
        .unwrap_or(RecordId(0))
}
