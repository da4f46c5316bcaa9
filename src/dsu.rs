//! # Disjoint Set Union (DSU)
//!
//! Union-Find forest over record ids: union by rank, path halving on find.
//! The forest starts with every record as its own singleton set and is owned
//! by exactly one merge stage for the lifetime of a run.

use crate::model::RecordId;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// Result of attempting to merge two records
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeResult {
    /// Two distinct sets were joined under `root`
    Merged { root: RecordId },
    /// Both records were already in the set rooted at `root`
    AlreadyUnited { root: RecordId },
}

/// Disjoint set forest keyed by record id
#[derive(Debug, Clone, Default)]
pub struct RecordDsu {
    /// Parent pointers - FxHashMap for fast integer hashing
    parent: FxHashMap<RecordId, RecordId>,
    /// Upper bound on tree height for each root
    rank: FxHashMap<RecordId, u32>,
    /// Current number of disjoint sets
    cluster_count: usize,
    /// Successful merges performed
    merges: usize,
}

impl RecordDsu {
    /// Create an empty forest
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a forest with every given record in its own set
    pub fn with_records(record_ids: impl IntoIterator<Item = RecordId>) -> Self {
        let mut dsu = Self::new();
        for record_id in record_ids {
            dsu.add_record(record_id);
        }
        dsu
    }

    /// Add a record as a singleton set. Adding a known record is a no-op.
    pub fn add_record(&mut self, record_id: RecordId) {
        if self.has_record(record_id) {
            return;
        }
        self.parent.insert(record_id, record_id);
        self.rank.insert(record_id, 0);
        self.cluster_count += 1;
    }

    /// Check if a record exists in the DSU.
    pub fn has_record(&self, record_id: RecordId) -> bool {
        self.parent.contains_key(&record_id)
    }

    /// Find the root of a record, halving the path as it goes.
    /// Untracked records are treated as their own root.
    pub fn find(&mut self, record_id: RecordId) -> RecordId {
        let mut current = record_id;
        loop {
            let Some(&parent) = self.parent.get(&current) else {
                return current;
            };
            if parent == current {
                return current;
            }
            let grandparent = self.parent.get(&parent).copied().unwrap_or(parent);
            // Point current to grandparent (skip parent)
            self.parent.insert(current, grandparent);
            current = grandparent;
        }
    }

    /// Check if two records are in the same set
    pub fn same_cluster(&mut self, a: RecordId, b: RecordId) -> bool {
        self.find(a) == self.find(b)
    }

    /// Merge the sets containing `a` and `b`, adding either record if unknown.
    pub fn union(&mut self, a: RecordId, b: RecordId) -> MergeResult {
        self.add_record(a);
        self.add_record(b);

        let root_a = self.find(a);
        let root_b = self.find(b);
        if root_a == root_b {
            return MergeResult::AlreadyUnited { root: root_a };
        }

        let rank_a = self.rank.get(&root_a).copied().unwrap_or(0);
        let rank_b = self.rank.get(&root_b).copied().unwrap_or(0);

        let root = if rank_a < rank_b {
            self.parent.insert(root_a, root_b);
            root_b
        } else if rank_a > rank_b {
            self.parent.insert(root_b, root_a);
            root_a
        } else {
            self.parent.insert(root_b, root_a);
            self.rank.insert(root_a, rank_a + 1);
            root_a
        };

        self.cluster_count = self.cluster_count.saturating_sub(1);
        self.merges += 1;
        MergeResult::Merged { root }
    }

    /// Current number of disjoint sets
    pub fn num_clusters(&self) -> usize {
        self.cluster_count
    }

    /// Number of records tracked
    pub fn num_records(&self) -> usize {
        self.parent.len()
    }

    /// Successful merges performed so far
    pub fn merges(&self) -> usize {
        self.merges
    }

    /// Snapshot the partition. Members are sorted by record id and sets are
    /// ordered by their smallest member, so the result does not depend on
    /// union order or hash iteration order.
    pub fn partition(&mut self) -> Partition {
        let mut record_ids: Vec<RecordId> = self.parent.keys().copied().collect();
        record_ids.sort_unstable();

        let mut by_root: FxHashMap<RecordId, Vec<RecordId>> = FxHashMap::default();
        for record_id in record_ids {
            let root = self.find(record_id);
            by_root.entry(root).or_default().push(record_id);
        }

        let mut sets: Vec<Vec<RecordId>> = by_root.into_values().collect();
        sets.sort_unstable_by_key(|members| members[0]);
        Partition { sets }
    }
}

/// A complete partition of the tracked records
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Partition {
    pub sets: Vec<Vec<RecordId>>,
}

impl Partition {
    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(range: std::ops::Range<u32>) -> Vec<RecordId> {
        range.map(RecordId).collect()
    }

    #[test]
    fn test_dsu_starts_with_singletons() {
        let mut dsu = RecordDsu::with_records(ids(0..4));
        assert_eq!(dsu.num_clusters(), 4);
        assert_eq!(dsu.find(RecordId(2)), RecordId(2));
        assert_eq!(dsu.partition().len(), 4);
    }

    #[test]
    fn test_add_record_is_idempotent() {
        let mut dsu = RecordDsu::new();
        dsu.add_record(RecordId(1));
        dsu.add_record(RecordId(1));
        assert_eq!(dsu.num_clusters(), 1);
        assert_eq!(dsu.num_records(), 1);
        assert!(dsu.has_record(RecordId(1)));
        assert!(!dsu.has_record(RecordId(2)));
    }

    #[test]
    fn test_union_merges_sets() {
        let mut dsu = RecordDsu::with_records(ids(0..3));
        assert!(matches!(dsu.union(RecordId(0), RecordId(1)), MergeResult::Merged { .. }));
        assert!(dsu.same_cluster(RecordId(0), RecordId(1)));
        assert!(!dsu.same_cluster(RecordId(0), RecordId(2)));
        assert_eq!(dsu.num_clusters(), 2);
    }

    #[test]
    fn test_repeated_union_reports_already_united() {
        let mut dsu = RecordDsu::with_records(ids(0..2));
        dsu.union(RecordId(0), RecordId(1));
        assert!(matches!(
            dsu.union(RecordId(1), RecordId(0)),
            MergeResult::AlreadyUnited { .. }
        ));
        assert_eq!(dsu.merges(), 1);
        assert_eq!(dsu.num_clusters(), 1);
    }

    #[test]
    fn test_transitive_merge() {
        let mut dsu = RecordDsu::with_records(ids(0..3));
        dsu.union(RecordId(0), RecordId(1));
        dsu.union(RecordId(1), RecordId(2));
        assert!(dsu.same_cluster(RecordId(0), RecordId(2)));
    }

    #[test]
    fn test_union_order_does_not_change_partition() {
        let edges = [(0, 1), (2, 3), (1, 3), (5, 6), (7, 5)];

        let mut forward = RecordDsu::with_records(ids(0..9));
        for (a, b) in edges {
            forward.union(RecordId(a), RecordId(b));
        }
        let mut backward = RecordDsu::with_records(ids(0..9));
        for (a, b) in edges.iter().rev() {
            backward.union(RecordId(*b), RecordId(*a));
        }

        let partition = forward.partition();
        assert_eq!(partition, backward.partition());
        assert_eq!(
            partition.sets,
            vec![
                ids(0..4),
                vec![RecordId(4)],
                vec![RecordId(5), RecordId(6), RecordId(7)],
                vec![RecordId(8)],
            ]
        );
    }

    #[test]
    fn test_long_chain_compresses() {
        let mut dsu = RecordDsu::with_records(ids(0..1000));
        for i in 0..999 {
            dsu.union(RecordId(i), RecordId(i + 1));
        }
        let root = dsu.find(RecordId(0));
        assert!((0..1000).all(|i| dsu.find(RecordId(i)) == root));
        assert_eq!(dsu.num_clusters(), 1);
    }
}
