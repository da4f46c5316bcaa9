//! # Pairwise Scoring Module
//!
//! Computes a symmetric, explainable similarity score for two normalized
//! records. Each component is a row in a fixed table of
//! (component, feature extractor); the configured weight turns the extracted
//! feature into a contribution. Absent fields never score, only an explicit
//! NPI conflict subtracts.

use crate::config::{ConfigError, NameMetric, ResolverConfig, Thresholds, WeightTable};
use crate::model::{CandidatePair, MatchDecision, Record};
use crate::similarity;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Scoring components, in evaluation order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Component {
    NpiMatch,
    NpiConflict,
    LicenseMatch,
    NameSimilarity,
    TokenOverlap,
    PhoneMatch,
    AddressOverlap,
    TaxonomyMatch,
}

impl Component {
    pub const ALL: [Component; 8] = [
        Component::NpiMatch,
        Component::NpiConflict,
        Component::LicenseMatch,
        Component::NameSimilarity,
        Component::TokenOverlap,
        Component::PhoneMatch,
        Component::AddressOverlap,
        Component::TaxonomyMatch,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Component::NpiMatch => "npi_match",
            Component::NpiConflict => "npi_conflict",
            Component::LicenseMatch => "license_match",
            Component::NameSimilarity => "name_similarity",
            Component::TokenOverlap => "token_overlap",
            Component::PhoneMatch => "phone_match",
            Component::AddressOverlap => "address_overlap",
            Component::TaxonomyMatch => "taxonomy_match",
        }
    }

    /// Penalty components carry a negative weight
    pub fn is_penalty(&self) -> bool {
        matches!(self, Component::NpiConflict)
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Extracts a feature in `[0, 1]` from an unordered record pair, or `None`
/// when the component does not apply.
type FeatureExtractor = fn(&Record, &Record, NameMetric) -> Option<f64>;

struct ComponentRule {
    component: Component,
    extract: FeatureExtractor,
}

const COMPONENT_TABLE: [ComponentRule; 8] = [
    ComponentRule {
        component: Component::NpiMatch,
        extract: npi_match,
    },
    ComponentRule {
        component: Component::NpiConflict,
        extract: npi_conflict,
    },
    ComponentRule {
        component: Component::LicenseMatch,
        extract: license_match,
    },
    ComponentRule {
        component: Component::NameSimilarity,
        extract: name_similarity,
    },
    ComponentRule {
        component: Component::TokenOverlap,
        extract: token_overlap,
    },
    ComponentRule {
        component: Component::PhoneMatch,
        extract: phone_match,
    },
    ComponentRule {
        component: Component::AddressOverlap,
        extract: address_overlap,
    },
    ComponentRule {
        component: Component::TaxonomyMatch,
        extract: taxonomy_match,
    },
];

fn equal_when_present(a: Option<&str>, b: Option<&str>) -> Option<f64> {
    match (a, b) {
        (Some(a), Some(b)) if a == b => Some(1.0),
        _ => None,
    }
}

fn npi_match(a: &Record, b: &Record, _: NameMetric) -> Option<f64> {
    equal_when_present(a.npi.as_deref(), b.npi.as_deref())
}

fn npi_conflict(a: &Record, b: &Record, _: NameMetric) -> Option<f64> {
    match (&a.npi, &b.npi) {
        (Some(a), Some(b)) if a != b => Some(1.0),
        _ => None,
    }
}

fn license_match(a: &Record, b: &Record, _: NameMetric) -> Option<f64> {
    match (a.license_key(), b.license_key()) {
        (Some(a), Some(b)) if a == b => Some(1.0),
        _ => None,
    }
}

fn name_similarity(a: &Record, b: &Record, metric: NameMetric) -> Option<f64> {
    if a.name_tokens.is_empty() || b.name_tokens.is_empty() {
        return None;
    }
    let (left, right) = (a.full_name(), b.full_name());
    Some(match metric {
        NameMetric::Gestalt => similarity::sequence_ratio(&left, &right),
        NameMetric::JaroWinkler => similarity::jaro_winkler(&left, &right),
    })
}

fn token_overlap(a: &Record, b: &Record, _: NameMetric) -> Option<f64> {
    if a.name_tokens.is_empty() || b.name_tokens.is_empty() {
        return None;
    }
    Some(similarity::token_jaccard(&a.name_tokens, &b.name_tokens))
}

fn phone_match(a: &Record, b: &Record, _: NameMetric) -> Option<f64> {
    equal_when_present(a.phone_suffix.as_deref(), b.phone_suffix.as_deref())
}

fn address_overlap(a: &Record, b: &Record, _: NameMetric) -> Option<f64> {
    if a.address_tokens.is_empty() || b.address_tokens.is_empty() {
        return None;
    }
    Some(similarity::jaccard(&a.address_tokens, &b.address_tokens))
}

fn taxonomy_match(a: &Record, b: &Record, _: NameMetric) -> Option<f64> {
    equal_when_present(a.taxonomy_code.as_deref(), b.taxonomy_code.as_deref())
}

/// One line of a match explanation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Contribution {
    pub component: Component,
    /// Raw feature value in `[0, 1]`
    pub feature: f64,
    /// `feature * weight`
    pub contribution: f64,
}

/// Ordered component breakdown that produced a pair's total.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchExplanation {
    pub contributions: Vec<Contribution>,
}

impl MatchExplanation {
    pub fn total(&self) -> f64 {
        self.contributions.iter().map(|c| c.contribution).sum()
    }

    pub fn get(&self, component: Component) -> Option<&Contribution> {
        self.contributions.iter().find(|c| c.component == component)
    }

    /// Raw feature for a component; `0.0` when it did not apply.
    pub fn feature(&self, component: Component) -> f64 {
        self.get(component).map(|c| c.feature).unwrap_or(0.0)
    }

    pub fn has(&self, component: Component) -> bool {
        self.get(component).is_some()
    }

    /// Names of the exact-match and conflict components that fired, e.g. `npi_match;phone_match`
    pub fn reasons(&self) -> String {
        self.contributions
            .iter()
            .filter(|c| {
                !matches!(
                    c.component,
                    Component::NameSimilarity | Component::TokenOverlap | Component::AddressOverlap
                )
            })
            .map(|c| c.component.name())
            .collect::<Vec<_>>()
            .join(";")
    }
}

/// A candidate pair with its score, decision and explanation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredPair {
    pub pair: CandidatePair,
    pub total: f64,
    pub decision: MatchDecision,
    pub explanation: MatchExplanation,
}

impl ScoredPair {
    /// The pair carries explicit negative identity evidence
    pub fn has_conflict(&self) -> bool {
        self.explanation.has(Component::NpiConflict)
    }
}

/// Pairwise scorer built from a validated configuration.
#[derive(Debug, Clone)]
pub struct Scorer {
    weights: WeightTable,
    thresholds: Thresholds,
    name_metric: NameMetric,
}

impl Scorer {
    /// Validate the configuration and build a scorer.
    pub fn new(config: &ResolverConfig) -> Result<Self, ConfigError> {
        config.weights.validate()?;
        config.thresholds.validate()?;
        Ok(Self {
            weights: config.weights,
            thresholds: config.thresholds,
            name_metric: config.name_metric,
        })
    }

    /// Score two records. Argument order never changes the result: the pair
    /// is canonicalized by record id before any component is evaluated.
    pub fn score(&self, first: &Record, second: &Record) -> ScoredPair {
        let (a, b) = if first.record_id <= second.record_id {
            (first, second)
        } else {
            (second, first)
        };

        let contributions: Vec<Contribution> = COMPONENT_TABLE
            .iter()
            .filter_map(|rule| {
                (rule.extract)(a, b, self.name_metric).map(|feature| Contribution {
                    component: rule.component,
                    feature,
                    contribution: feature * self.weights.weight(rule.component),
                })
            })
            .collect();

        let explanation = MatchExplanation { contributions };
        let total = explanation.total();

        ScoredPair {
            pair: CandidatePair {
                a: a.record_id,
                b: b.record_id,
            },
            total,
            decision: self.thresholds.decide(total),
            explanation,
        }
    }
}
