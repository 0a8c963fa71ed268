//! Evaluation context and field resolver.
//!
//! An [`EvaluationContext`] is a read-only view over one item's attributes.
//! Field paths are dotted (`component.benchmark_score`); each segment walks
//! one level of nested objects, and a numeric segment indexes into an array.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::CoreError;
use crate::value::ResolvedValue;

/// Read-only attribute view for a single item.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvaluationContext {
    /// Item fields, including nested linked-entity objects.
    #[serde(default)]
    fields: Map<String, Value>,
    /// Free-form extension attributes, consulted when a path is missing from `fields`.
    #[serde(default)]
    attributes: Map<String, Value>,
    /// Paths whose string values resolve as [`ResolvedValue::Enum`].
    #[serde(default)]
    enum_fields: BTreeSet<String>,
}

impl EvaluationContext {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self {
            fields,
            ..Self::default()
        }
    }

    /// Build a context from a JSON value, which must be an object.
    pub fn from_json(value: Value) -> Result<Self, CoreError> {
        match value {
            Value::Object(fields) => Ok(Self::new(fields)),
            other => Err(CoreError::InvalidContext(format!(
                "expected a JSON object of item fields, got {}",
                json_type_name(&other)
            ))),
        }
    }

    /// Parse item fields from JSON text.
    pub fn from_json_str(text: &str) -> Result<Self, CoreError> {
        Self::from_json(serde_json::from_str(text)?)
    }

    /// Attach the free-form attribute bag. Must be a JSON object.
    pub fn with_attributes(mut self, attributes: Value) -> Result<Self, CoreError> {
        match attributes {
            Value::Object(map) => {
                self.attributes = map;
                Ok(self)
            }
            Value::Null => Ok(self),
            other => Err(CoreError::InvalidContext(format!(
                "attribute bag must be a JSON object, got {}",
                json_type_name(&other)
            ))),
        }
    }

    /// Declare a field path as a discrete enum attribute.
    pub fn with_enum_field(mut self, path: impl Into<String>) -> Self {
        self.enum_fields.insert(path.into());
        self
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn attributes(&self) -> &Map<String, Value> {
        &self.attributes
    }

    /// Resolve a dotted field path. Never fails: unknown paths are `Absent`.
    pub fn resolve(&self, field_path: &str) -> ResolvedValue {
        let found =
            locate(&self.fields, field_path).or_else(|| locate(&self.attributes, field_path));
        match found {
            None => ResolvedValue::Absent,
            Some(Value::String(s)) if self.enum_fields.contains(field_path) => {
                ResolvedValue::Enum(s.clone())
            }
            Some(value) => ResolvedValue::from_json(value),
        }
    }
}

/// Free-function form of [`EvaluationContext::resolve`].
pub fn resolve(context: &EvaluationContext, field_path: &str) -> ResolvedValue {
    context.resolve(field_path)
}

fn locate<'a>(root: &'a Map<String, Value>, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let first = segments.next().filter(|s| !s.is_empty())?;
    let mut current = root.get(first)?;
    for segment in segments {
        if segment.is_empty() {
            return None;
        }
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use serde_json::json;

    fn laptop() -> EvaluationContext {
        EvaluationContext::from_json(json!({
            "ram_gb": 16,
            "brand": "Lenovo",
            "condition": "good",
            "warranty": null,
            "cpu": { "benchmark_score": 12500, "cores": 8 },
            "ports": ["usb-c", "hdmi"],
        }))
        .unwrap()
        .with_attributes(json!({ "seller_rating": 4.5, "cpu": { "generation": 12 } }))
        .unwrap()
        .with_enum_field("condition")
    }

    #[test]
    fn resolves_top_level_and_nested() {
        let ctx = laptop();
        assert_eq!(ctx.resolve("ram_gb"), ResolvedValue::Number(Decimal::from(16)));
        assert_eq!(
            ctx.resolve("cpu.benchmark_score"),
            ResolvedValue::Number(Decimal::from(12500))
        );
        assert_eq!(ctx.resolve("brand"), ResolvedValue::String("Lenovo".into()));
    }

    #[test]
    fn enum_fields_are_tagged() {
        assert_eq!(laptop().resolve("condition"), ResolvedValue::Enum("good".into()));
    }

    #[test]
    fn array_segments_index() {
        assert_eq!(laptop().resolve("ports.1"), ResolvedValue::String("hdmi".into()));
        assert!(laptop().resolve("ports.9").is_absent());
    }

    #[test]
    fn absent_versus_null() {
        let ctx = laptop();
        assert_eq!(ctx.resolve("warranty"), ResolvedValue::Null);
        assert!(ctx.resolve("gpu").is_absent());
        assert!(ctx.resolve("cpu.cache_mb").is_absent());
        assert!(ctx.resolve("ram_gb.value").is_absent());
        assert!(ctx.resolve("").is_absent());
        assert!(ctx.resolve("cpu..cores").is_absent());
    }

    #[test]
    fn attribute_bag_is_fallback() {
        let ctx = laptop();
        assert_eq!(
            ctx.resolve("seller_rating"),
            ResolvedValue::Number(Decimal::new(45, 1))
        );
        // Present in both: fields only has cpu.benchmark_score/cores, so
        // cpu.generation falls through to the bag.
        assert_eq!(ctx.resolve("cpu.generation"), ResolvedValue::Number(Decimal::from(12)));
    }

    #[test]
    fn rejects_non_object_json() {
        let err = EvaluationContext::from_json(json!([1, 2])).unwrap_err();
        assert!(err.to_string().contains("array"));

        assert!(matches!(
            EvaluationContext::from_json_str("{ram_gb: 16"),
            Err(CoreError::Json(_))
        ));
        let ctx = EvaluationContext::from_json_str(r#"{"ram_gb": 16}"#).unwrap();
        assert_eq!(ctx.resolve("ram_gb"), ResolvedValue::Number(Decimal::from(16)));
    }
}
