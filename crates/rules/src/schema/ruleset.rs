//! Ruleset snapshot: groups of prioritized rules.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::metadata::{default_true, default_version};
use super::{Action, Condition};

/// An immutable, versioned snapshot of rule groups, as supplied by storage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Ruleset {
    pub id: String,
    pub name: String,
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub groups: Vec<RuleGroup>,
}

/// A named, weighted subdivision of a ruleset.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RuleGroup {
    /// Unique within the ruleset.
    pub name: String,
    /// Category tag, e.g. a hardware class.
    #[serde(default)]
    pub category: Option<String>,
    /// Evaluation and display order, ascending.
    #[serde(default)]
    pub order: i32,
    /// Relative share used by the scoring aggregator.
    #[serde(default = "default_weight")]
    pub weight: Decimal,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default)]
    pub rules: Vec<Rule>,
}

/// A prioritized condition → actions pair.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Rule {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Evaluation order within the group, ascending. Ties break by `id`.
    #[serde(default)]
    pub priority: i32,
    #[serde(default = "default_true")]
    pub active: bool,
    /// Defaults to an empty AND group, which always matches.
    #[serde(default)]
    pub condition: Condition,
    #[serde(default)]
    pub actions: Vec<Action>,
}

fn default_weight() -> Decimal {
    Decimal::ONE
}

impl Ruleset {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            version: default_version(),
            groups: Vec::new(),
        }
    }

    pub fn with_version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    pub fn with_group(mut self, group: RuleGroup) -> Self {
        self.groups.push(group);
        self
    }

    /// Total number of rules across all groups, active or not.
    pub fn rule_count(&self) -> usize {
        self.groups.iter().map(|g| g.rules.len()).sum()
    }
}

impl RuleGroup {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            category: None,
            order: 0,
            weight: default_weight(),
            active: true,
            rules: Vec::new(),
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }

    pub fn with_weight(mut self, weight: Decimal) -> Self {
        self.weight = weight;
        self
    }

    pub fn with_rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }
}

impl Rule {
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            description: None,
            priority: 0,
            active: true,
            condition: Condition::always(),
            actions: Vec::new(),
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.condition = condition;
        self
    }

    pub fn with_action(mut self, action: impl Into<Action>) -> Self {
        self.actions.push(action.into());
        self
    }

    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }
}
