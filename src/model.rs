//! # Data Model
//!
//! Core data structures for provider entity resolution: raw roster rows,
//! normalized records, candidate pairs and decision tags.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Compact identifier for records, assigned in load order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub u32);

impl RecordId {
    /// Record id for a load-order index; `None` past the `u32` id space.
    pub fn from_index(index: usize) -> Option<Self> {
        u32::try_from(index).ok().map(Self)
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R{}", self.0)
    }
}

/// Identifier for clusters.
///
/// The numeric value is the record id of the cluster's representative, so a
/// singleton's cluster id is its own record id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClusterId(pub u32);

impl ClusterId {
    pub fn from_representative(record_id: RecordId) -> Self {
        Self(record_id.0)
    }

    pub fn representative(&self) -> RecordId {
        RecordId(self.0)
    }
}

impl fmt::Display for ClusterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "C{}", self.0)
    }
}

/// A roster row as handed over by the loader. Every field is an opaque string;
/// missing columns deserialize to empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawRecord {
    pub provider_id: String,
    pub full_name: String,
    pub npi: String,
    pub license_number: String,
    pub license_state: String,
    pub practice_phone: String,
    pub practice_address_line1: String,
    pub practice_city: String,
    pub practice_state: String,
    pub practice_zip: String,
    pub taxonomy_code: String,
}

/// Immutable, normalized provider entry.
///
/// Built once by [`crate::normalize::normalize`] and never mutated; every
/// scoring pass reads the same snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub record_id: RecordId,
    pub npi: Option<String>,
    pub license_number: Option<String>,
    pub license_state: Option<String>,
    pub name_tokens: Vec<String>,
    pub last_name_prefix: Option<String>,
    pub phone_suffix: Option<String>,
    pub address_tokens: BTreeSet<String>,
    pub taxonomy_code: Option<String>,
}

impl Record {
    /// Normalized full name: the name tokens joined by single spaces.
    pub fn full_name(&self) -> String {
        self.name_tokens.join(" ")
    }

    /// License key as (state, number) when both parts are present.
    pub fn license_key(&self) -> Option<(&str, &str)> {
        match (&self.license_state, &self.license_number) {
            (Some(state), Some(number)) => Some((state.as_str(), number.as_str())),
            _ => None,
        }
    }

    /// Count of populated mandatory fields (npi, license number, name, phone).
    pub fn completeness(&self) -> usize {
        [
            self.npi.is_some(),
            self.license_number.is_some(),
            !self.name_tokens.is_empty(),
            self.phone_suffix.is_some(),
        ]
        .into_iter()
        .filter(|present| *present)
        .count()
    }
}

/// Unordered pair of records stored canonically (`a < b`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CandidatePair {
    pub a: RecordId,
    pub b: RecordId,
}

impl CandidatePair {
    /// Build the canonical pair. Returns `None` for a self-pair.
    pub fn new(x: RecordId, y: RecordId) -> Option<Self> {
        match x.cmp(&y) {
            std::cmp::Ordering::Less => Some(Self { a: x, b: y }),
            std::cmp::Ordering::Greater => Some(Self { a: y, b: x }),
            std::cmp::Ordering::Equal => None,
        }
    }

    pub fn contains(&self, record_id: RecordId) -> bool {
        self.a == record_id || self.b == record_id
    }
}

impl fmt::Display for CandidatePair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}~{}", self.a, self.b)
    }
}

/// Decision tier produced by thresholding a pair's total score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatchDecision {
    Definite,
    Possible,
    NonMatch,
}

impl MatchDecision {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchDecision::Definite => "definite",
            MatchDecision::Possible => "possible",
            MatchDecision::NonMatch => "nonmatch",
        }
    }
}

impl fmt::Display for MatchDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-record confidence tag on the output roster
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatchConfidence {
    /// Member of an accepted multi-record cluster
    Definite,
    /// Unmatched record with nothing awaiting review
    Singleton,
    /// Member of a conflict-flagged cluster, or party to a possible match
    FlaggedPossible,
}

impl MatchConfidence {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchConfidence::Definite => "definite",
            MatchConfidence::Singleton => "singleton",
            MatchConfidence::FlaggedPossible => "flagged-possible",
        }
    }
}

impl fmt::Display for MatchConfidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn candidate_pair_is_canonical() {
        let forward = CandidatePair::new(RecordId(3), RecordId(1)).unwrap();
        let backward = CandidatePair::new(RecordId(1), RecordId(3)).unwrap();
        assert_eq!(forward, backward);
        assert_eq!(forward.a, RecordId(1));
        assert_eq!(forward.b, RecordId(3));
    }

    #[test]
    fn record_id_from_index_stops_at_u32_space() {
        assert_eq!(RecordId::from_index(0), Some(RecordId(0)));
        assert_eq!(RecordId::from_index(u32::MAX as usize), Some(RecordId(u32::MAX)));
        #[cfg(target_pointer_width = "64")]
        assert_eq!(RecordId::from_index(u32::MAX as usize + 1), None);
    }

    #[test]
    fn candidate_pair_rejects_self_pair() {
        assert!(CandidatePair::new(RecordId(7), RecordId(7)).is_none());
    }

    #[test]
    fn confidence_serializes_kebab_case() {
        let json = serde_json::to_string(&MatchConfidence::FlaggedPossible).unwrap();
        assert_eq!(json, "\"flagged-possible\"");
    }

    #[test]
    fn cluster_id_round_trips_representative() {
        let cluster = ClusterId::from_representative(RecordId(42));
        assert_eq!(cluster.representative(), RecordId(42));
        assert_eq!(cluster.to_string(), "C42");
    }
}
