//! Condition trees gating rules.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::Operator;

/// A rule condition: a predicate leaf, a logical group, or a formula.
///
/// Discriminated by `type` so definitions stay plain data.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Condition {
    Predicate(Predicate),
    Group(ConditionGroup),
    /// Truthy when the formula evaluates to a non-zero number.
    Formula { expression: String },
}

impl Condition {
    /// An empty AND group, which always holds.
    pub fn always() -> Self {
        Condition::Group(ConditionGroup {
            operator: LogicalOperator::And,
            conditions: Vec::new(),
        })
    }

    pub fn predicate(
        field: impl Into<String>,
        operator: impl Into<Operator>,
        value: Value,
    ) -> Self {
        Condition::Predicate(Predicate {
            field: field.into(),
            operator: operator.into(),
            value,
        })
    }

    pub fn and(conditions: Vec<Condition>) -> Self {
        Condition::Group(ConditionGroup {
            operator: LogicalOperator::And,
            conditions,
        })
    }

    pub fn or(conditions: Vec<Condition>) -> Self {
        Condition::Group(ConditionGroup {
            operator: LogicalOperator::Or,
            conditions,
        })
    }

    pub fn not(condition: Condition) -> Self {
        Condition::Group(ConditionGroup {
            operator: LogicalOperator::Not,
            conditions: vec![condition],
        })
    }

    pub fn formula(expression: impl Into<String>) -> Self {
        Condition::Formula {
            expression: expression.into(),
        }
    }
}

impl Default for Condition {
    fn default() -> Self {
        Condition::always()
    }
}

/// A single field comparison.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Predicate {
    pub field: String,
    pub operator: Operator,
    /// Operand; shape depends on the operator (scalar, `[low, high]`, list).
    #[serde(default)]
    pub value: Value,
}

/// Logical combination of child conditions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConditionGroup {
    pub operator: LogicalOperator,
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

/// Logical operators for condition groups.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LogicalOperator {
    And,
    Or,
    Not,
}

impl LogicalOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogicalOperator::And => "AND",
            LogicalOperator::Or => "OR",
            LogicalOperator::Not => "NOT",
        }
    }
}
