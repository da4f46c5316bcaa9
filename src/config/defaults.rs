//! Default constants for rosterlink configuration.
//!
//! All scoring weights and thresholds are centralized here.

// =============================================================================
// Scoring Weights
// =============================================================================

/// Both NPIs present and equal
pub const DEFAULT_NPI_MATCH_WEIGHT: f64 = 6.0;

/// Both NPIs present and different. Must stay negative so strong identity
/// evidence can veto a merge supported by shared practice details.
pub const DEFAULT_NPI_CONFLICT_PENALTY: f64 = -4.0;

/// License state and number both equal
pub const DEFAULT_LICENSE_MATCH_WEIGHT: f64 = 5.0;

/// Ceiling for the full-name sequence similarity component
pub const DEFAULT_NAME_SIMILARITY_WEIGHT: f64 = 3.0;

/// Ceiling for the name token overlap component
pub const DEFAULT_TOKEN_OVERLAP_WEIGHT: f64 = 1.0;

/// Last four phone digits equal
pub const DEFAULT_PHONE_MATCH_WEIGHT: f64 = 1.5;

/// Ceiling for the address token overlap component
pub const DEFAULT_ADDRESS_OVERLAP_WEIGHT: f64 = 0.8;

/// Taxonomy code equal
pub const DEFAULT_TAXONOMY_MATCH_WEIGHT: f64 = 0.6;

// =============================================================================
// Decision Thresholds
// =============================================================================

/// Totals at or above this are merged automatically
pub const DEFAULT_DEFINITE_THRESHOLD: f64 = 5.0;

/// Totals at or above this (and below definite) go to manual review
pub const DEFAULT_POSSIBLE_THRESHOLD: f64 = 3.0;

// =============================================================================
// Pipeline
// =============================================================================

/// Capacity of the channel feeding definite matches to the merge stage
pub const DEFAULT_MERGE_QUEUE_CAPACITY: usize = 1024;

/// Environment variable prefix for configuration overrides
pub const ENV_PREFIX: &str = "ROSTERLINK_";
