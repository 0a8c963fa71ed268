//! Value-transforming actions attached to rules.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One adjustment computation, plus an optional modifier applied afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Action {
    #[serde(flatten)]
    pub kind: ActionKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modifier: Option<Modifier>,
}

impl Action {
    pub fn new(kind: ActionKind) -> Self {
        Self {
            kind,
            modifier: None,
        }
    }

    pub fn with_modifier(mut self, modifier: Modifier) -> Self {
        self.modifier = Some(modifier);
        self
    }
}

impl From<ActionKind> for Action {
    fn from(kind: ActionKind) -> Self {
        Action::new(kind)
    }
}

/// The action kinds. Exactly one per [`Action`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActionKind {
    /// Returns `value` unchanged.
    FixedValue { value: Decimal },
    /// `field × rate`.
    PerUnit { field: String, rate: Decimal },
    /// `(field / unit_size) × rate + base`.
    BenchmarkBased {
        field: String,
        unit_size: Decimal,
        rate: Decimal,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        base: Option<Decimal>,
    },
    /// `basis × rate`, where the basis is the base value or the running total.
    Multiplier {
        rate: Decimal,
        #[serde(default)]
        basis: MultiplierBasis,
    },
    /// Signed constant added directly.
    Additive { value: Decimal },
    /// Restricted arithmetic expression over item fields.
    Formula { expression: String },
}

impl ActionKind {
    pub fn name(&self) -> &'static str {
        match self {
            ActionKind::FixedValue { .. } => "fixed_value",
            ActionKind::PerUnit { .. } => "per_unit",
            ActionKind::BenchmarkBased { .. } => "benchmark_based",
            ActionKind::Multiplier { .. } => "multiplier",
            ActionKind::Additive { .. } => "additive",
            ActionKind::Formula { .. } => "formula",
        }
    }
}

/// What a `multiplier` action scales.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MultiplierBasis {
    /// The item's base value.
    #[default]
    BaseValue,
    /// Sum of all adjustments applied so far in this evaluation.
    RunningTotal,
}

/// Factor table keyed by a discrete attribute (e.g. condition grade).
///
/// The resolved value's string form selects the factor; no match means 1.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Modifier {
    pub field: String,
    pub factors: BTreeMap<String, Decimal>,
}
