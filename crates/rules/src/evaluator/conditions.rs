//! Condition evaluator.
//!
//! Condition trees are compiled once: operators are parsed, operands are
//! checked against the operator's expected shape, regexes are built, and
//! formulas are parsed. Evaluation of the compiled tree never fails on type
//! mismatches. Comparisons only happen within a compatible family
//! (number/number, string or enum/string, boolean/boolean); anything else
//! is `false`. An absent field is `false` for every operator but
//! `is_absent`.

use regex::Regex;
use rust_decimal::Decimal;
use serde_json::Value;

use valuator_core::{decimal_from_json, EngineConfig, EvaluationContext, ResolvedValue};

use crate::error::RuleDefinitionError;
use crate::formula::{Formula, FormulaEvaluationError};
use crate::schema::{Condition, ConditionGroup, LogicalOperator, Operator, Predicate};

// ── Compiled form ───────────────────────────────────────────────────

/// A validated, ready-to-evaluate condition tree.
#[derive(Debug, Clone)]
pub enum CompiledCondition {
    Predicate(CompiledPredicate),
    And(Vec<CompiledCondition>),
    Or(Vec<CompiledCondition>),
    Not(Box<CompiledCondition>),
    Formula(Formula),
}

/// A predicate whose operand already has the operator's shape.
#[derive(Debug, Clone)]
pub struct CompiledPredicate {
    field: String,
    operator: Operator,
    operand: Operand,
}

#[derive(Debug, Clone)]
enum Operand {
    None,
    Scalar(Scalar),
    Number(Decimal),
    Text(String),
    Range(Decimal, Decimal),
    List(Vec<Scalar>),
    Pattern(Regex),
}

/// A literal operand value, tagged by comparison family.
#[derive(Debug, Clone, PartialEq)]
enum Scalar {
    Number(Decimal),
    Text(String),
    Bool(bool),
    Null,
}

impl Scalar {
    fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Null => Some(Scalar::Null),
            Value::Bool(b) => Some(Scalar::Bool(*b)),
            Value::Number(_) => decimal_from_json(value).map(Scalar::Number),
            Value::String(s) => Some(Scalar::Text(s.clone())),
            Value::Array(_) | Value::Object(_) => None,
        }
    }
}

impl std::fmt::Display for Scalar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Scalar::Number(n) => write!(f, "{}", n.normalize()),
            Scalar::Text(s) => write!(f, "\"{}\"", s),
            Scalar::Bool(b) => write!(f, "{}", b),
            Scalar::Null => write!(f, "null"),
        }
    }
}

// ── Compilation ─────────────────────────────────────────────────────

impl CompiledCondition {
    /// Compile a condition tree for `rule_id`, enforcing the depth bound.
    pub fn compile(
        condition: &Condition,
        rule_id: u64,
        config: &EngineConfig,
    ) -> Result<Self, RuleDefinitionError> {
        compile_node(condition, rule_id, config, 1)
    }

    /// Evaluate against one item. Only formula conditions can fail.
    pub fn evaluate(&self, ctx: &EvaluationContext) -> Result<bool, FormulaEvaluationError> {
        match self {
            CompiledCondition::Predicate(p) => Ok(p.evaluate(ctx)),
            CompiledCondition::And(children) => {
                for child in children {
                    if !child.evaluate(ctx)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            CompiledCondition::Or(children) => {
                for child in children {
                    if child.evaluate(ctx)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            CompiledCondition::Not(child) => Ok(!child.evaluate(ctx)?),
            CompiledCondition::Formula(formula) => {
                Ok(!formula.evaluate(ctx)?.is_zero())
            }
        }
    }

    /// Like [`evaluate`](Self::evaluate), with formula failures counted as `false`.
    pub fn matches(&self, ctx: &EvaluationContext) -> bool {
        self.evaluate(ctx).unwrap_or(false)
    }

    /// Human-readable account of the tree against one item.
    pub fn describe(&self, ctx: &EvaluationContext) -> String {
        self.evaluate_described(ctx).1
    }

    /// Evaluate and describe in a single walk of the tree.
    ///
    /// Every child is visited so the account is complete; the verdict is
    /// folded in child order, so it matches [`evaluate`](Self::evaluate)
    /// including which formula error surfaces.
    pub fn evaluate_described(
        &self,
        ctx: &EvaluationContext,
    ) -> (Result<bool, FormulaEvaluationError>, String) {
        match self {
            CompiledCondition::Predicate(p) => {
                let (verdict, text) = p.evaluate_described(ctx);
                (Ok(verdict), text)
            }
            CompiledCondition::And(children) if children.is_empty() => {
                (Ok(true), "always".to_string())
            }
            CompiledCondition::Or(children) if children.is_empty() => {
                (Ok(false), "never".to_string())
            }
            CompiledCondition::And(children) => describe_group("AND", false, children, ctx),
            CompiledCondition::Or(children) => describe_group("OR", true, children, ctx),
            CompiledCondition::Not(child) => {
                let (verdict, text) = child.evaluate_described(ctx);
                (verdict.map(|v| !v), format!("NOT ({text})"))
            }
            CompiledCondition::Formula(formula) => match formula.evaluate(ctx) {
                Ok(value) => (
                    Ok(!value.is_zero()),
                    format!("formula `{}` = {}", formula, value.normalize()),
                ),
                Err(e) => {
                    let text = format!("formula `{}` failed: {}", formula, e);
                    (Err(e), text)
                }
            },
        }
    }
}

/// Describe every child of an AND/OR group. `decisive` is the child verdict
/// that settles the group: `false` for AND, `true` for OR.
fn describe_group(
    op: &str,
    decisive: bool,
    children: &[CompiledCondition],
    ctx: &EvaluationContext,
) -> (Result<bool, FormulaEvaluationError>, String) {
    let mut verdict = None;
    let mut parts = Vec::with_capacity(children.len());
    for child in children {
        let (result, text) = child.evaluate_described(ctx);
        if verdict.is_none() {
            match result {
                Ok(v) if v == decisive => verdict = Some(Ok(decisive)),
                Ok(_) => {}
                Err(e) => verdict = Some(Err(e)),
            }
        }
        parts.push(match child {
            CompiledCondition::And(_) | CompiledCondition::Or(_) => format!("({text})"),
            _ => text,
        });
    }
    (
        verdict.unwrap_or(Ok(!decisive)),
        format!("{} {}", op, parts.join(", ")),
    )
}

fn compile_node(
    condition: &Condition,
    rule_id: u64,
    config: &EngineConfig,
    depth: usize,
) -> Result<CompiledCondition, RuleDefinitionError> {
    if depth > config.max_condition_depth {
        return Err(RuleDefinitionError::DepthExceeded {
            rule_id,
            max_depth: config.max_condition_depth,
        });
    }

    match condition {
        Condition::Predicate(p) => compile_predicate(p, rule_id).map(CompiledCondition::Predicate),
        Condition::Group(group) => compile_group(group, rule_id, config, depth),
        Condition::Formula { expression } => Formula::parse(expression, config)
            .map(CompiledCondition::Formula)
            .map_err(|source| RuleDefinitionError::InvalidFormula {
                rule_id,
                expression: expression.clone(),
                source,
            }),
    }
}

fn compile_group(
    group: &ConditionGroup,
    rule_id: u64,
    config: &EngineConfig,
    depth: usize,
) -> Result<CompiledCondition, RuleDefinitionError> {
    let children = group
        .conditions
        .iter()
        .map(|c| compile_node(c, rule_id, config, depth + 1))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(match group.operator {
        LogicalOperator::And => CompiledCondition::And(children),
        LogicalOperator::Or => CompiledCondition::Or(children),
        LogicalOperator::Not => {
            let found = children.len();
            let mut children = children.into_iter();
            match (children.next(), children.next()) {
                (Some(only), None) => CompiledCondition::Not(Box::new(only)),
                _ => return Err(RuleDefinitionError::NotArity { rule_id, found }),
            }
        }
    })
}

/// Check one predicate's operator and operand shape.
pub(crate) fn compile_predicate(
    predicate: &Predicate,
    rule_id: u64,
) -> Result<CompiledPredicate, RuleDefinitionError> {
    let field = predicate.field.trim();
    if field.is_empty() {
        return Err(RuleDefinitionError::EmptyField { rule_id });
    }

    let invalid = |reason: String| RuleDefinitionError::InvalidOperand {
        rule_id,
        field: field.to_string(),
        operator: predicate.operator.to_string(),
        reason,
    };
    let value = &predicate.value;

    let operand = match &predicate.operator {
        Operator::Unknown(name) => {
            return Err(RuleDefinitionError::UnknownOperator {
                rule_id,
                field: field.to_string(),
                operator: name.clone(),
            })
        }
        Operator::Eq | Operator::Ne => Operand::Scalar(
            Scalar::from_json(value)
                .ok_or_else(|| invalid(format!("expected a scalar, got {value}")))?,
        ),
        Operator::Gt | Operator::Lt | Operator::Gte | Operator::Lte => Operand::Number(
            decimal_from_json(value)
                .ok_or_else(|| invalid(format!("expected a number, got {value}")))?,
        ),
        Operator::Between => {
            let bounds = value
                .as_array()
                .filter(|items| items.len() == 2)
                .and_then(|items| {
                    Some((decimal_from_json(&items[0])?, decimal_from_json(&items[1])?))
                })
                .ok_or_else(|| invalid(format!("expected [low, high] numbers, got {value}")))?;
            if bounds.0 > bounds.1 {
                return Err(invalid(format!(
                    "low bound {} is greater than high bound {}",
                    bounds.0, bounds.1
                )));
            }
            Operand::Range(bounds.0, bounds.1)
        }
        Operator::Contains => Operand::Scalar(
            Scalar::from_json(value)
                .filter(|s| *s != Scalar::Null)
                .ok_or_else(|| invalid(format!("expected a string or scalar, got {value}")))?,
        ),
        Operator::StartsWith | Operator::EndsWith => Operand::Text(
            value
                .as_str()
                .map(str::to_string)
                .ok_or_else(|| invalid(format!("expected a string, got {value}")))?,
        ),
        Operator::Matches => {
            let pattern = value
                .as_str()
                .ok_or_else(|| invalid(format!("expected a regex string, got {value}")))?;
            Operand::Pattern(
                Regex::new(pattern).map_err(|e| invalid(format!("invalid regex: {e}")))?,
            )
        }
        Operator::In | Operator::NotIn => {
            let items = value
                .as_array()
                .ok_or_else(|| invalid(format!("expected a list, got {value}")))?;
            Operand::List(
                items
                    .iter()
                    .map(|item| {
                        Scalar::from_json(item)
                            .ok_or_else(|| invalid(format!("list element {item} is not a scalar")))
                    })
                    .collect::<Result<Vec<_>, _>>()?,
            )
        }
        Operator::IsAbsent | Operator::IsPresent => Operand::None,
    };

    Ok(CompiledPredicate {
        field: field.to_string(),
        operator: predicate.operator.clone(),
        operand,
    })
}

// ── Evaluation ──────────────────────────────────────────────────────

impl CompiledPredicate {
    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn operator(&self) -> &Operator {
        &self.operator
    }

    pub fn evaluate(&self, ctx: &EvaluationContext) -> bool {
        self.test(&ctx.resolve(&self.field))
    }

    fn test(&self, value: &ResolvedValue) -> bool {
        match (&self.operator, &self.operand) {
            (Operator::IsAbsent, _) => value.is_absent(),
            (Operator::IsPresent, _) => !value.is_absent(),
            _ if value.is_absent() => false,
            (Operator::Eq, Operand::Scalar(s)) => compare_eq(value, s) == Some(true),
            (Operator::Ne, Operand::Scalar(s)) => compare_eq(value, s) == Some(false),
            (Operator::Gt, Operand::Number(n)) => value.as_number().is_some_and(|v| v > *n),
            (Operator::Lt, Operand::Number(n)) => value.as_number().is_some_and(|v| v < *n),
            (Operator::Gte, Operand::Number(n)) => value.as_number().is_some_and(|v| v >= *n),
            (Operator::Lte, Operand::Number(n)) => value.as_number().is_some_and(|v| v <= *n),
            (Operator::Between, Operand::Range(low, high)) => value
                .as_number()
                .is_some_and(|v| v >= *low && v <= *high),
            (Operator::Contains, Operand::Scalar(s)) => contains(value, s),
            (Operator::StartsWith, Operand::Text(t)) => {
                text_test(value, t, |v, t| v.starts_with(t))
            }
            (Operator::EndsWith, Operand::Text(t)) => text_test(value, t, |v, t| v.ends_with(t)),
            (Operator::Matches, Operand::Pattern(re)) => {
                value.as_text().is_some_and(|v| re.is_match(v))
            }
            (Operator::In, Operand::List(items)) => {
                items.iter().any(|s| compare_eq(value, s) == Some(true))
            }
            (Operator::NotIn, Operand::List(items)) => {
                let mut compatible = false;
                for s in items {
                    match compare_eq(value, s) {
                        Some(true) => return false,
                        Some(false) => compatible = true,
                        None => {}
                    }
                }
                compatible
            }
            _ => false,
        }
    }

    fn evaluate_described(&self, ctx: &EvaluationContext) -> (bool, String) {
        let value = ctx.resolve(&self.field);
        let verdict = self.test(&value);
        let operand = match &self.operand {
            Operand::None => String::new(),
            Operand::Scalar(s) => format!(" {s}"),
            Operand::Number(n) => format!(" {}", n.normalize()),
            Operand::Text(t) => format!(" \"{t}\""),
            Operand::Range(low, high) => format!(" [{}, {}]", low.normalize(), high.normalize()),
            Operand::List(items) => {
                let items: Vec<String> = items.iter().map(|s| s.to_string()).collect();
                format!(" [{}]", items.join(", "))
            }
            Operand::Pattern(re) => format!(" /{}/", re.as_str()),
        };
        let text = format!(
            "{}={} ({}{}) {}",
            self.field,
            value,
            self.operator.symbol(),
            operand,
            verdict
        );
        (verdict, text)
    }
}

/// `Some(equal)` within a compatible family, `None` across families.
fn compare_eq(value: &ResolvedValue, scalar: &Scalar) -> Option<bool> {
    match (value, scalar) {
        (ResolvedValue::Number(v), Scalar::Number(n)) => Some(v == n),
        (ResolvedValue::String(v), Scalar::Text(t)) => Some(v == t),
        (ResolvedValue::Enum(v), Scalar::Text(t)) => Some(v.eq_ignore_ascii_case(t)),
        (ResolvedValue::Boolean(v), Scalar::Bool(b)) => Some(v == b),
        (ResolvedValue::Null, Scalar::Null) => Some(true),
        _ => None,
    }
}

fn contains(value: &ResolvedValue, scalar: &Scalar) -> bool {
    match (value, scalar) {
        (ResolvedValue::List(items), s) => {
            items.iter().any(|item| compare_eq(item, s) == Some(true))
        }
        (ResolvedValue::String(_) | ResolvedValue::Enum(_), Scalar::Text(t)) => {
            text_test(value, t, |v, t| v.contains(t))
        }
        _ => false,
    }
}

/// String test on string or enum values; enums compare case-insensitively.
fn text_test(value: &ResolvedValue, operand: &str, test: impl Fn(&str, &str) -> bool) -> bool {
    match value {
        ResolvedValue::String(v) => test(v, operand),
        ResolvedValue::Enum(v) => test(&v.to_lowercase(), &operand.to_lowercase()),
        _ => false,
    }
}

/// Compile and evaluate a condition in one step, with default limits.
///
/// Rule id 0 is reported in definition errors. Formula failures count as
/// `false`.
pub fn evaluate_condition(
    ctx: &EvaluationContext,
    condition: &Condition,
) -> Result<bool, RuleDefinitionError> {
    let compiled = CompiledCondition::compile(condition, 0, &EngineConfig::default())?;
    Ok(compiled.matches(ctx))
}

// ── Tests ───────────────────────────────────────────────────────────
