//! Predicate operators.
//!
//! Operators arrive from storage as plain strings. Names the engine does not
//! recognise are kept as [`Operator::Unknown`] so the ruleset still loads and
//! compilation can report the offending rule.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Comparison operator of a predicate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Operator {
    Eq,
    Ne,
    Gt,
    Lt,
    Gte,
    Lte,
    Between,
    Contains,
    StartsWith,
    EndsWith,
    Matches,
    In,
    NotIn,
    IsAbsent,
    IsPresent,
    Unknown(String),
}

/// Canonical operator names, used for "did you mean" suggestions.
pub const KNOWN_OPERATORS: &[&str] = &[
    "eq",
    "ne",
    "gt",
    "lt",
    "gte",
    "lte",
    "between",
    "contains",
    "starts_with",
    "ends_with",
    "matches",
    "in",
    "not_in",
    "is_absent",
    "is_present",
];

impl Operator {
    pub fn parse(name: &str) -> Self {
        match name.trim() {
            "eq" | "==" | "equals" => Operator::Eq,
            "ne" | "!=" | "not_equals" => Operator::Ne,
            "gt" | ">" => Operator::Gt,
            "lt" | "<" => Operator::Lt,
            "gte" | ">=" => Operator::Gte,
            "lte" | "<=" => Operator::Lte,
            "between" => Operator::Between,
            "contains" => Operator::Contains,
            "starts_with" => Operator::StartsWith,
            "ends_with" => Operator::EndsWith,
            "matches" => Operator::Matches,
            "in" => Operator::In,
            "not_in" => Operator::NotIn,
            "is_absent" => Operator::IsAbsent,
            "is_present" => Operator::IsPresent,
            other => Operator::Unknown(other.to_string()),
        }
    }

    /// Canonical name, or the raw name for unknown operators.
    pub fn as_str(&self) -> &str {
        match self {
            Operator::Eq => "eq",
            Operator::Ne => "ne",
            Operator::Gt => "gt",
            Operator::Lt => "lt",
            Operator::Gte => "gte",
            Operator::Lte => "lte",
            Operator::Between => "between",
            Operator::Contains => "contains",
            Operator::StartsWith => "starts_with",
            Operator::EndsWith => "ends_with",
            Operator::Matches => "matches",
            Operator::In => "in",
            Operator::NotIn => "not_in",
            Operator::IsAbsent => "is_absent",
            Operator::IsPresent => "is_present",
            Operator::Unknown(name) => name,
        }
    }

    /// Symbol used in human-readable reasons.
    pub fn symbol(&self) -> &str {
        match self {
            Operator::Eq => "==",
            Operator::Ne => "!=",
            Operator::Gt => ">",
            Operator::Lt => "<",
            Operator::Gte => ">=",
            Operator::Lte => "<=",
            other => other.as_str(),
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Operator::Unknown(_))
    }
}

impl From<String> for Operator {
    fn from(value: String) -> Self {
        Operator::parse(&value)
    }
}

impl From<&str> for Operator {
    fn from(value: &str) -> Self {
        Operator::parse(value)
    }
}

impl From<Operator> for String {
    fn from(value: Operator) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
