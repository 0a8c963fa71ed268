//! Weighted scoring aggregator and the `ScoringProfiles` document kind.
//!
//! A composite score is the weight-normalized mean of group totals over the
//! groups that actually contributed to a breakdown. Profiles are plain
//! parameters; nothing here is global.

use std::collections::BTreeMap;
use std::path::Path;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::breakdown::Breakdown;
use crate::error::{DocumentError, ScoringError};
use crate::schema::{CommonMetadata, DocumentKind};

/// Group name → weight. Groups not listed weigh zero.
pub type GroupWeights = BTreeMap<String, Decimal>;

// ── YAML-level types ────────────────────────────────────────────────

/// Top-level `kind: ScoringProfiles` document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ScoringProfilesDocument {
    #[serde(rename = "apiVersion")]
    pub api_version: String,
    pub kind: String,
    pub metadata: CommonMetadata,
    pub spec: ScoringProfilesSpec,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ScoringProfilesSpec {
    #[serde(default)]
    pub profiles: Vec<WeightingProfile>,
}

/// A named set of group weights, e.g. "retail" vs "wholesale".
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct WeightingProfile {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub weights: GroupWeights,
}

impl WeightingProfile {
    pub fn new(name: impl Into<String>, weights: GroupWeights) -> Self {
        Self {
            name: name.into(),
            description: None,
            weights,
        }
    }
}

impl ScoringProfilesDocument {
    pub fn from_yaml_str(yaml: &str) -> Result<Self, DocumentError> {
        let doc: ScoringProfilesDocument = serde_yaml::from_str(yaml)?;
        if doc.kind != DocumentKind::ScoringProfiles.to_string() {
            return Err(DocumentError::WrongKind {
                expected: DocumentKind::ScoringProfiles.to_string(),
                found: doc.kind,
            });
        }
        Ok(doc)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, DocumentError> {
        let yaml = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&yaml)
    }

    pub fn profiles(&self) -> &[WeightingProfile] {
        &self.spec.profiles
    }
}

// ── Aggregation ─────────────────────────────────────────────────────

/// Composite score of one breakdown under one set of weights.
///
/// `Σ(total × weight) / Σ weight` over contributing groups. Zero when the
/// normalizer is zero.
pub fn score(breakdown: &Breakdown, weights: &GroupWeights) -> Result<Decimal, ScoringError> {
    let negative = weights
        .iter()
        .find(|(_, w)| w.is_sign_negative() && !w.is_zero());
    if let Some((group, weight)) = negative {
        return Err(ScoringError::NegativeWeight {
            group: group.clone(),
            weight: *weight,
        });
    }

    let mut weighted = Decimal::ZERO;
    let mut normalizer = Decimal::ZERO;
    for group in breakdown.groups.iter().filter(|g| g.is_contributing()) {
        let weight = weights.get(&group.name).copied().unwrap_or(Decimal::ZERO);
        weighted = group
            .total
            .checked_mul(weight)
            .and_then(|w| weighted.checked_add(w))
            .ok_or(ScoringError::Overflow)?;
        normalizer = normalizer
            .checked_add(weight)
            .ok_or(ScoringError::Overflow)?;
    }

    if normalizer.is_zero() {
        return Ok(Decimal::ZERO);
    }
    weighted.checked_div(normalizer).ok_or(ScoringError::Overflow)
}

/// Weights taken from the ruleset's own groups, as recorded in the breakdown.
pub fn default_weights(breakdown: &Breakdown) -> GroupWeights {
    breakdown
        .groups
        .iter()
        .map(|g| (g.name.clone(), g.weight))
        .collect()
}

/// Score under every profile. Errors name the offending profile.
pub fn score_profiles(
    breakdown: &Breakdown,
    profiles: &[WeightingProfile],
) -> Result<BTreeMap<String, Decimal>, ScoringError> {
    profiles
        .iter()
        .map(|p| {
            score(breakdown, &p.weights)
                .map(|s| (p.name.clone(), s))
                .map_err(|e| ScoringError::Profile {
                    profile: p.name.clone(),
                    source: Box::new(e),
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;
    use crate::breakdown::GroupSummary;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn group(name: &str, weight: &str, total: &str, contributing_rules: usize) -> GroupSummary {
        GroupSummary {
            name: name.into(),
            category: None,
            weight: dec(weight),
            total: dec(total),
            contributing_rules,
        }
    }

    fn breakdown(groups: Vec<GroupSummary>) -> Breakdown {
        let total: Decimal = groups.iter().map(|g| g.total).sum();
        Breakdown {
            ruleset_id: "laptops".into(),
            ruleset_version: 1,
            base_value: dec("450"),
            total_adjustment: total,
            adjusted_value: dec("450") + total,
            entries: Vec::new(),
            groups,
        }
    }

    fn weights(pairs: &[(&str, &str)]) -> GroupWeights {
        pairs.iter().map(|(k, v)| (k.to_string(), dec(v))).collect()
    }

    #[test]
    fn non_contributing_groups_do_not_dilute() {
        let b = breakdown(vec![
            group("Hardware", "0.7", "-50", 1),
            group("Cosmetic", "0.3", "0", 0),
        ]);
        let w = weights(&[("Hardware", "0.7"), ("Cosmetic", "0.3")]);
        assert_eq!(score(&b, &w).unwrap(), dec("-50"));
    }

    #[test]
    fn weighted_mean_over_contributors() {
        let b = breakdown(vec![
            group("Hardware", "1", "-50", 2),
            group("Cosmetic", "1", "20", 1),
        ]);
        let w = weights(&[("Hardware", "3"), ("Cosmetic", "1")]);
        // (-150 + 20) / 4
        assert_eq!(score(&b, &w).unwrap(), dec("-32.5"));
    }

    #[test]
    fn missing_weights_and_zero_normalizer() {
        let b = breakdown(vec![group("Hardware", "1", "-50", 1)]);
        assert_eq!(score(&b, &GroupWeights::new()).unwrap(), Decimal::ZERO);
        assert_eq!(
            score(&b, &weights(&[("Hardware", "0")])).unwrap(),
            Decimal::ZERO
        );
    }

    #[test]
    fn negative_weight_is_rejected() {
        let b = breakdown(vec![group("Hardware", "1", "-50", 1)]);
        let err = score(&b, &weights(&[("Hardware", "-0.5")])).unwrap_err();
        assert_eq!(
            err,
            ScoringError::NegativeWeight {
                group: "Hardware".into(),
                weight: dec("-0.5")
            }
        );

        let profiles = vec![WeightingProfile::new("broken", weights(&[("Hardware", "-1")]))];
        let err = score_profiles(&b, &profiles).unwrap_err();
        assert!(err.to_string().starts_with("profile `broken`"));
    }

    #[test]
    fn profiles_and_default_weights() {
        let b = breakdown(vec![
            group("Hardware", "0.7", "-50", 1),
            group("Cosmetic", "0.3", "10", 1),
        ]);
        assert_eq!(
            default_weights(&b),
            weights(&[("Hardware", "0.7"), ("Cosmetic", "0.3")])
        );

        let profiles = vec![
            WeightingProfile::new("hardware-only", weights(&[("Hardware", "1")])),
            WeightingProfile::new("even", weights(&[("Hardware", "1"), ("Cosmetic", "1")])),
        ];
        let scores = score_profiles(&b, &profiles).unwrap();
        assert_eq!(scores["hardware-only"], dec("-50"));
        assert_eq!(scores["even"], dec("-20"));
    }

    #[test]
    fn parse_profiles_document() {
        let yaml = include_str!("../../../data/rulesets/scoring-profiles.yml");
        let doc = ScoringProfilesDocument::from_yaml_str(yaml).unwrap();
        assert_eq!(doc.kind, "ScoringProfiles");
        assert!(!doc.profiles().is_empty());
        for profile in doc.profiles() {
            assert!(profile.weights.values().all(|w| !w.is_sign_negative()));
        }
    }
}
