//! Typed values produced by the field resolver.

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A field value as seen by conditions, actions, and formulas.
///
/// `Absent` means the path did not resolve at all; `Null` means it resolved
/// to an explicit JSON `null`. Conditions treat the two differently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ResolvedValue {
    Number(Decimal),
    String(String),
    Boolean(bool),
    /// Discrete attribute declared as an enum on the context (e.g. condition grade).
    Enum(String),
    List(Vec<ResolvedValue>),
    Null,
    Absent,
}

impl ResolvedValue {
    /// Convert a JSON value. Objects have no scalar meaning and resolve as `Null`.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null | Value::Object(_) => ResolvedValue::Null,
            Value::Bool(b) => ResolvedValue::Boolean(*b),
            Value::Number(n) => decimal_from_json_number(n)
                .map(ResolvedValue::Number)
                .unwrap_or(ResolvedValue::Null),
            Value::String(s) => ResolvedValue::String(s.clone()),
            Value::Array(items) => {
                ResolvedValue::List(items.iter().map(ResolvedValue::from_json).collect())
            }
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, ResolvedValue::Absent)
    }

    pub fn as_number(&self) -> Option<Decimal> {
        match self {
            ResolvedValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// String payload of `String` and `Enum` values.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ResolvedValue::String(s) | ResolvedValue::Enum(s) => Some(s),
            _ => None,
        }
    }

    /// Discrete key used by modifier maps: scalars only.
    pub fn discrete_key(&self) -> Option<String> {
        match self {
            ResolvedValue::String(s) | ResolvedValue::Enum(s) => Some(s.clone()),
            ResolvedValue::Number(n) => Some(n.normalize().to_string()),
            ResolvedValue::Boolean(b) => Some(b.to_string()),
            ResolvedValue::List(_) | ResolvedValue::Null | ResolvedValue::Absent => None,
        }
    }

    /// Short type tag used in breakdown reasons and validation messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            ResolvedValue::Number(_) => "number",
            ResolvedValue::String(_) => "string",
            ResolvedValue::Boolean(_) => "boolean",
            ResolvedValue::Enum(_) => "enum",
            ResolvedValue::List(_) => "list",
            ResolvedValue::Null => "null",
            ResolvedValue::Absent => "absent",
        }
    }
}

impl fmt::Display for ResolvedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolvedValue::Number(n) => write!(f, "{}", n.normalize()),
            ResolvedValue::String(s) => write!(f, "\"{}\"", s),
            ResolvedValue::Enum(s) => write!(f, "{}", s),
            ResolvedValue::Boolean(b) => write!(f, "{}", b),
            ResolvedValue::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            ResolvedValue::Null => write!(f, "null"),
            ResolvedValue::Absent => write!(f, "<absent>"),
        }
    }
}

/// Exact JSON number → Decimal conversion.
///
/// Goes through the number's textual form so `2.5` stays `2.5` instead of
/// picking up binary float noise. Scientific notation is accepted.
pub fn decimal_from_json_number(n: &serde_json::Number) -> Option<Decimal> {
    if let Some(i) = n.as_i64() {
        return Some(Decimal::from(i));
    }
    if let Some(u) = n.as_u64() {
        return Some(Decimal::from(u));
    }
    let text = n.to_string();
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .ok()
}

/// Decimal from an arbitrary JSON operand (numbers and numeric strings).
pub fn decimal_from_json(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => decimal_from_json_number(n),
        Value::String(s) => Decimal::from_str(s.trim()).ok(),
        _ => None,
    }
}
