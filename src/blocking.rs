//! # Blocking Module
//!
//! Partitions records into candidate groups under five independent strategies
//! so only plausibly similar pairs are scored. Strategies never combine into a
//! compound key: a pair is a candidate when it shares any single strategy's key.

use crate::model::{CandidatePair, Record, RecordId};
use hashbrown::HashMap;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, warn};

/// Independent key spaces used for candidate generation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockStrategy {
    Npi,
    License,
    Name,
    Phone,
    Taxonomy,
}

impl BlockStrategy {
    pub const ALL: [BlockStrategy; 5] = [
        BlockStrategy::Npi,
        BlockStrategy::License,
        BlockStrategy::Name,
        BlockStrategy::Phone,
        BlockStrategy::Taxonomy,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BlockStrategy::Npi => "npi",
            BlockStrategy::License => "license",
            BlockStrategy::Name => "name",
            BlockStrategy::Phone => "phone",
            BlockStrategy::Taxonomy => "taxonomy",
        }
    }

    /// Extract this strategy's key value from a record, if it has one.
    pub fn key_for(&self, record: &Record) -> Option<String> {
        match self {
            BlockStrategy::Npi => record.npi.clone(),
            BlockStrategy::License => record
                .license_key()
                .map(|(state, number)| format!("{state}::{number}")),
            BlockStrategy::Name => record.last_name_prefix.clone(),
            BlockStrategy::Phone => record.phone_suffix.clone(),
            BlockStrategy::Taxonomy => record.taxonomy_code.clone(),
        }
    }
}

/// A (strategy, value) pair identifying one block
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BlockKey {
    pub strategy: BlockStrategy,
    pub value: String,
}

impl BlockKey {
    pub fn new(strategy: BlockStrategy, value: impl Into<String>) -> Self {
        Self {
            strategy,
            value: value.into(),
        }
    }
}

impl fmt::Display for BlockKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.strategy.as_str(), self.value)
    }
}

/// Block index mapping each key to its member records.
///
/// Each record is inserted at most once per strategy, so member lists behave
/// as sets and keep load order.
#[derive(Debug, Clone, Default)]
pub struct BlockIndex {
    blocks: HashMap<BlockKey, Vec<RecordId>>,
}

impl BlockIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index a single record under every strategy it has a key for.
    pub fn insert(&mut self, record: &Record) {
        for strategy in BlockStrategy::ALL {
            if let Some(value) = strategy.key_for(record) {
                self.blocks
                    .entry(BlockKey::new(strategy, value))
                    .or_default()
                    .push(record.record_id);
            }
        }
    }

    pub fn members(&self, key: &BlockKey) -> &[RecordId] {
        self.blocks.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Emit every unordered pair inside blocks with at least two members,
    /// deduplicated across strategies and returned in canonical order.
    ///
    /// Blocks larger than `max_block_size` are skipped when a cap is set.
    pub fn generate_candidates(&self, max_block_size: Option<usize>) -> Vec<CandidatePair> {
        let mut pairs: FxHashSet<CandidatePair> = FxHashSet::default();
        let mut skipped = 0usize;

        for (key, members) in &self.blocks {
            if members.len() < 2 {
                continue;
            }
            if let Some(cap) = max_block_size {
                if members.len() > cap {
                    warn!(block = %key, size = members.len(), cap, "skipping oversized block");
                    skipped += 1;
                    continue;
                }
            }
            for (i, &left) in members.iter().enumerate() {
                for &right in &members[i + 1..] {
                    if let Some(pair) = CandidatePair::new(left, right) {
                        pairs.insert(pair);
                    }
                }
            }
        }

        let mut candidates: Vec<CandidatePair> = pairs.into_iter().collect();
        candidates.sort_unstable();
        debug!(
            blocks = self.blocks.len(),
            skipped,
            candidates = candidates.len(),
            "generated candidate pairs"
        );
        candidates
    }
}

/// Build the block index over a record set.
pub fn build_blocks(records: &[Record]) -> BlockIndex {
    let mut index = BlockIndex::new();
    for record in records {
        index.insert(record);
    }
    index
}

/// Candidate pairs for a block index, without a block size cap.
pub fn generate_candidates(blocks: &BlockIndex) -> Vec<CandidatePair> {
    blocks.generate_candidates(None)
}
