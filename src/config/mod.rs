//! Configuration for the resolution engine.
//!
//! Configuration is loaded with precedence: overrides > Env vars > Config file > Defaults,
//! then validated before any scoring begins.
//!
//! # Example config file (rosterlink.toml)
//! ```toml
//! name_metric = "gestalt"
//!
//! [weights]
//! npi_match = 6.0
//! npi_conflict = -4.0
//!
//! [thresholds]
//! definite = 5.0
//! possible = 3.0
//!
//! [blocking]
//! max_block_size = 5000
//! ```

mod defaults;

pub use defaults::*;

use crate::model::MatchDecision;
use crate::scoring::Component;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration for a resolution run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Weight per scoring component
    pub weights: WeightTable,
    /// Decision thresholds applied to pair totals
    pub thresholds: Thresholds,
    /// Candidate generation limits
    pub blocking: BlockingConfig,
    /// Algorithm for the name similarity component
    pub name_metric: NameMetric,
    /// Capacity of the definite-match channel into the merge stage
    pub merge_queue_capacity: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            weights: WeightTable::default(),
            thresholds: Thresholds::default(),
            blocking: BlockingConfig::default(),
            name_metric: NameMetric::default(),
            merge_queue_capacity: DEFAULT_MERGE_QUEUE_CAPACITY,
        }
    }
}

impl ResolverConfig {
    /// Load configuration with precedence: overrides > Env > File > Defaults,
    /// and validate the result.
    ///
    /// # Arguments
    /// * `config_path` - Optional path to TOML config file
    /// * `overrides` - explicit overrides to apply on top
    pub fn load(
        config_path: Option<&Path>,
        overrides: ConfigOverrides,
    ) -> Result<Self, ConfigError> {
        let mut figment = Figment::new().merge(Serialized::defaults(ResolverConfig::default()));

        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // ROSTERLINK_THRESHOLDS__DEFINITE=5.5
        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));

        figment = figment.merge(Serialized::defaults(overrides));

        let config: ResolverConfig = figment.extract().map_err(Box::new)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from environment and optional config file only
    pub fn from_env(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load(config_path, ConfigOverrides::default())
    }

    /// Check weights and thresholds; a misconfigured run must never start.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.weights.validate()?;
        self.thresholds.validate()?;
        if let Some(cap) = self.blocking.max_block_size {
            if cap < 2 {
                return Err(ConfigError::BlockCapTooSmall { cap });
            }
        }
        Ok(())
    }
}

/// Weight per scoring component.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeightTable {
    pub npi_match: f64,
    /// Penalty applied when both NPIs are present and differ; must be negative
    pub npi_conflict: f64,
    pub license_match: f64,
    pub name_similarity: f64,
    pub token_overlap: f64,
    pub phone_match: f64,
    pub address_overlap: f64,
    pub taxonomy_match: f64,
}

impl Default for WeightTable {
    fn default() -> Self {
        Self {
            npi_match: DEFAULT_NPI_MATCH_WEIGHT,
            npi_conflict: DEFAULT_NPI_CONFLICT_PENALTY,
            license_match: DEFAULT_LICENSE_MATCH_WEIGHT,
            name_similarity: DEFAULT_NAME_SIMILARITY_WEIGHT,
            token_overlap: DEFAULT_TOKEN_OVERLAP_WEIGHT,
            phone_match: DEFAULT_PHONE_MATCH_WEIGHT,
            address_overlap: DEFAULT_ADDRESS_OVERLAP_WEIGHT,
            taxonomy_match: DEFAULT_TAXONOMY_MATCH_WEIGHT,
        }
    }
}

impl WeightTable {
    pub fn weight(&self, component: Component) -> f64 {
        match component {
            Component::NpiMatch => self.npi_match,
            Component::NpiConflict => self.npi_conflict,
            Component::LicenseMatch => self.license_match,
            Component::NameSimilarity => self.name_similarity,
            Component::TokenOverlap => self.token_overlap,
            Component::PhoneMatch => self.phone_match,
            Component::AddressOverlap => self.address_overlap,
            Component::TaxonomyMatch => self.taxonomy_match,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for component in Component::ALL {
            let value = self.weight(component);
            if !value.is_finite() {
                return Err(ConfigError::NonFiniteWeight {
                    component: component.name(),
                    value,
                });
            }
            if component.is_penalty() {
                if value >= 0.0 {
                    return Err(ConfigError::NonNegativePenalty {
                        component: component.name(),
                        value,
                    });
                }
            } else if value < 0.0 {
                return Err(ConfigError::NegativeWeight {
                    component: component.name(),
                    value,
                });
            }
        }
        Ok(())
    }
}

/// Decision thresholds. Both bounds are inclusive from below.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    pub definite: f64,
    pub possible: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            definite: DEFAULT_DEFINITE_THRESHOLD,
            possible: DEFAULT_POSSIBLE_THRESHOLD,
        }
    }
}

impl Thresholds {
    /// `total >= definite` is definite, `possible <= total < definite` is
    /// possible, anything lower is a non-match.
    pub fn decide(&self, total: f64) -> MatchDecision {
        if total >= self.definite {
            MatchDecision::Definite
        } else if total >= self.possible {
            MatchDecision::Possible
        } else {
            MatchDecision::NonMatch
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [("definite", self.definite), ("possible", self.possible)] {
            if !value.is_finite() {
                return Err(ConfigError::NonFiniteThreshold { name, value });
            }
        }
        if self.possible >= self.definite {
            return Err(ConfigError::UnorderedThresholds {
                possible: self.possible,
                definite: self.definite,
            });
        }
        Ok(())
    }
}

/// Candidate generation limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BlockingConfig {
    /// Skip blocks with more members than this (unset = no cap)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_block_size: Option<usize>,
}

/// Name similarity algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum NameMetric {
    /// Ratcliff/Obershelp sequence ratio
    #[default]
    Gestalt,
    /// Jaro-Winkler similarity
    JaroWinkler,
}

/// Overrides that take precedence over file and env config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thresholds: Option<ThresholdOverrides>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blocking: Option<BlockingConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name_metric: Option<NameMetric>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub definite: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub possible: Option<f64>,
}

/// Configuration error. Always fatal: the run aborts before scoring.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("configuration error: {0}")]
    Load(#[from] Box<figment::Error>),
    #[error("configuration error: weight `{component}` is not finite ({value})")]
    NonFiniteWeight { component: &'static str, value: f64 },
    #[error("configuration error: weight `{component}` must be non-negative, got {value}")]
    NegativeWeight { component: &'static str, value: f64 },
    #[error("configuration error: penalty `{component}` must be negative, got {value}")]
    NonNegativePenalty { component: &'static str, value: f64 },
    #[error("configuration error: threshold `{name}` is not finite ({value})")]
    NonFiniteThreshold { name: &'static str, value: f64 },
    #[error(
        "configuration error: possible threshold {possible} must be below definite threshold {definite}"
    )]
    UnorderedThresholds { possible: f64, definite: f64 },
    #[error("configuration error: max_block_size must be at least 2, got {cap}")]
    BlockCapTooSmall { cap: usize },
}
