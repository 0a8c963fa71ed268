//! Action engine: turns a matched rule's actions into amounts.

use rust_decimal::Decimal;

use valuator_core::{EngineConfig, EvaluationContext, ResolvedValue};

use crate::breakdown::ActionAmount;
use crate::error::{ActionError, RuleDefinitionError};
use crate::formula::Formula;
use crate::schema::{Action, ActionKind, Modifier, MultiplierBasis};

/// Amounts an action may scale, fixed at the moment it runs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActionBasis {
    pub base_value: Decimal,
    /// Every adjustment so far in this evaluation, including earlier actions
    /// of the current rule.
    pub running_total: Decimal,
}

/// A validated action with its formula pre-parsed.
#[derive(Debug, Clone)]
pub struct CompiledAction {
    index: usize,
    kind: CompiledKind,
    modifier: Option<Modifier>,
}

#[derive(Debug, Clone)]
enum CompiledKind {
    FixedValue(Decimal),
    PerUnit {
        field: String,
        rate: Decimal,
    },
    BenchmarkBased {
        field: String,
        unit_size: Decimal,
        rate: Decimal,
        base: Decimal,
    },
    Multiplier {
        rate: Decimal,
        basis: MultiplierBasis,
    },
    Additive(Decimal),
    Formula(Formula),
}

impl CompiledKind {
    fn name(&self) -> &'static str {
        match self {
            CompiledKind::FixedValue(_) => "fixed_value",
            CompiledKind::PerUnit { .. } => "per_unit",
            CompiledKind::BenchmarkBased { .. } => "benchmark_based",
            CompiledKind::Multiplier { .. } => "multiplier",
            CompiledKind::Additive(_) => "additive",
            CompiledKind::Formula(_) => "formula",
        }
    }
}

impl CompiledAction {
    /// Validate action `index` of rule `rule_id`.
    pub fn compile(
        action: &Action,
        rule_id: u64,
        index: usize,
        config: &EngineConfig,
    ) -> Result<Self, RuleDefinitionError> {
        let invalid = |reason: &str| RuleDefinitionError::InvalidAction {
            rule_id,
            index,
            kind: action.kind.name().to_string(),
            reason: reason.to_string(),
        };
        let field_path = |field: &str| {
            let field = field.trim();
            if field.is_empty() {
                Err(invalid("field path is empty"))
            } else {
                Ok(field.to_string())
            }
        };

        let kind = match &action.kind {
            ActionKind::FixedValue { value } => CompiledKind::FixedValue(*value),
            ActionKind::PerUnit { field, rate } => CompiledKind::PerUnit {
                field: field_path(field)?,
                rate: *rate,
            },
            ActionKind::BenchmarkBased {
                field,
                unit_size,
                rate,
                base,
            } => {
                if *unit_size <= Decimal::ZERO {
                    return Err(invalid(&format!("unit_size must be positive, got {unit_size}")));
                }
                CompiledKind::BenchmarkBased {
                    field: field_path(field)?,
                    unit_size: *unit_size,
                    rate: *rate,
                    base: base.unwrap_or(Decimal::ZERO),
                }
            }
            ActionKind::Multiplier { rate, basis } => CompiledKind::Multiplier {
                rate: *rate,
                basis: *basis,
            },
            ActionKind::Additive { value } => CompiledKind::Additive(*value),
            ActionKind::Formula { expression } => CompiledKind::Formula(
                Formula::parse(expression, config).map_err(|source| {
                    RuleDefinitionError::InvalidFormula {
                        rule_id,
                        expression: expression.clone(),
                        source,
                    }
                })?,
            ),
        };

        if let Some(modifier) = &action.modifier {
            if modifier.field.trim().is_empty() {
                return Err(invalid("modifier field path is empty"));
            }
        }

        Ok(Self {
            index,
            kind,
            modifier: action.modifier.clone(),
        })
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn kind_name(&self) -> &'static str {
        self.kind.name()
    }

    /// Compute the raw amount, then apply the modifier factor.
    pub fn apply(
        &self,
        ctx: &EvaluationContext,
        basis: ActionBasis,
    ) -> Result<ActionAmount, ActionError> {
        let raw = match &self.kind {
            CompiledKind::FixedValue(value) | CompiledKind::Additive(value) => *value,
            CompiledKind::PerUnit { field, rate } => numeric_field(ctx, field)?
                .checked_mul(*rate)
                .ok_or(ActionError::Overflow)?,
            CompiledKind::BenchmarkBased {
                field,
                unit_size,
                rate,
                base,
            } => numeric_field(ctx, field)?
                .checked_div(*unit_size)
                .and_then(|units| units.checked_mul(*rate))
                .and_then(|scaled| scaled.checked_add(*base))
                .ok_or(ActionError::Overflow)?,
            CompiledKind::Multiplier { rate, basis: which } => {
                let amount = match which {
                    MultiplierBasis::BaseValue => basis.base_value,
                    MultiplierBasis::RunningTotal => basis.running_total,
                };
                amount.checked_mul(*rate).ok_or(ActionError::Overflow)?
            }
            CompiledKind::Formula(formula) => formula.evaluate(ctx)?,
        };

        let factor = self
            .modifier
            .as_ref()
            .map(|m| modifier_factor(ctx, m))
            .unwrap_or(Decimal::ONE);
        let amount = raw.checked_mul(factor).ok_or(ActionError::Overflow)?;

        Ok(ActionAmount {
            index: self.index,
            kind: self.kind.name().to_string(),
            raw,
            factor,
            amount,
        })
    }
}

fn numeric_field(ctx: &EvaluationContext, field: &str) -> Result<Decimal, ActionError> {
    match ctx.resolve(field) {
        ResolvedValue::Number(n) => Ok(n),
        ResolvedValue::Absent => Err(ActionError::MissingField {
            field: field.to_string(),
        }),
        other => Err(ActionError::NonNumericField {
            field: field.to_string(),
            found: other.type_name(),
        }),
    }
}

/// Factor selected by the modifier field's string form; 1 when nothing matches.
fn modifier_factor(ctx: &EvaluationContext, modifier: &Modifier) -> Decimal {
    let value = ctx.resolve(&modifier.field);
    let Some(key) = value.discrete_key() else {
        return Decimal::ONE;
    };
    if let Some(factor) = modifier.factors.get(&key) {
        return *factor;
    }
    if matches!(value, ResolvedValue::Enum(_)) {
        if let Some((_, factor)) = modifier
            .factors
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(&key))
        {
            return *factor;
        }
    }
    Decimal::ONE
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::str::FromStr;

    use serde_json::json;

    use super::*;
    use crate::formula::FormulaEvaluationError;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn ctx() -> EvaluationContext {
        EvaluationContext::from_json(json!({
            "ram_gb": 16,
            "grade": "B",
            "brand": "Dell",
            "cpu": { "benchmark_score": 12500 },
        }))
        .unwrap()
        .with_enum_field("grade")
    }

    fn basis() -> ActionBasis {
        ActionBasis {
            base_value: dec("450"),
            running_total: dec("-50"),
        }
    }

    fn apply(kind: ActionKind) -> Result<ActionAmount, ActionError> {
        CompiledAction::compile(&Action::new(kind), 1, 0, &EngineConfig::default())
            .unwrap()
            .apply(&ctx(), basis())
    }

    #[test]
    fn per_unit_scales_quantity() {
        let out = apply(ActionKind::PerUnit {
            field: "ram_gb".into(),
            rate: dec("-3.125"),
        })
        .unwrap();
        assert_eq!(out.amount, dec("-50"));
        assert_eq!(out.kind, "per_unit");
        assert_eq!(out.factor, Decimal::ONE);
    }

    #[test]
    fn benchmark_based_adds_base() {
        let out = apply(ActionKind::BenchmarkBased {
            field: "cpu.benchmark_score".into(),
            unit_size: dec("1000"),
            rate: dec("2"),
            base: Some(dec("-10")),
        })
        .unwrap();
        assert_eq!(out.amount, dec("15"));
    }

    #[test]
    fn multiplier_bases() {
        let on_base = apply(ActionKind::Multiplier {
            rate: dec("0.1"),
            basis: MultiplierBasis::BaseValue,
        })
        .unwrap();
        assert_eq!(on_base.amount, dec("45"));

        let on_total = apply(ActionKind::Multiplier {
            rate: dec("0.5"),
            basis: MultiplierBasis::RunningTotal,
        })
        .unwrap();
        assert_eq!(on_total.amount, dec("-25"));
    }

    #[test]
    fn constants_and_formula() {
        let fixed = apply(ActionKind::FixedValue { value: dec("12.5") }).unwrap();
        assert_eq!(fixed.amount, dec("12.5"));
        let additive = apply(ActionKind::Additive { value: dec("-7") }).unwrap();
        assert_eq!(additive.amount, dec("-7"));
        assert_eq!(
            apply(ActionKind::Formula {
                expression: "min(ram_gb * 2.5, 100)".into()
            })
            .unwrap()
            .amount,
            dec("40")
        );
    }

    #[test]
    fn modifier_selects_factor() {
        let factors: BTreeMap<String, Decimal> =
            [("A".to_string(), dec("1")), ("b".to_string(), dec("0.8"))]
                .into_iter()
                .collect();
        let flat = || Action::new(ActionKind::FixedValue { value: dec("100") });
        let action = flat().with_modifier(Modifier {
            field: "grade".into(),
            factors: factors.clone(),
        });
        let out = CompiledAction::compile(&action, 1, 0, &EngineConfig::default())
            .unwrap()
            .apply(&ctx(), basis())
            .unwrap();
        assert_eq!(out.raw, dec("100"));
        assert_eq!(out.factor, dec("0.8"));
        assert_eq!(out.amount, dec("80"));

        let unmatched = flat().with_modifier(Modifier {
            field: "brand".into(),
            factors,
        });
        let out = CompiledAction::compile(&unmatched, 1, 0, &EngineConfig::default())
            .unwrap()
            .apply(&ctx(), basis())
            .unwrap();
        assert_eq!(out.factor, Decimal::ONE);
    }

    #[test]
    fn runtime_errors_are_typed() {
        assert_eq!(
            apply(ActionKind::PerUnit {
                field: "gpu_vram".into(),
                rate: dec("1"),
            })
            .unwrap_err(),
            ActionError::MissingField {
                field: "gpu_vram".into()
            }
        );
        assert_eq!(
            apply(ActionKind::PerUnit {
                field: "brand".into(),
                rate: dec("1"),
            })
            .unwrap_err(),
            ActionError::NonNumericField {
                field: "brand".into(),
                found: "string"
            }
        );
        assert_eq!(
            apply(ActionKind::Formula {
                expression: "ram_gb / 0".into()
            })
            .unwrap_err(),
            ActionError::Formula(FormulaEvaluationError::DivisionByZero)
        );
    }

    #[test]
    fn definition_errors_name_rule_and_index() {
        let err = CompiledAction::compile(
            &Action::new(ActionKind::BenchmarkBased {
                field: "cpu.benchmark_score".into(),
                unit_size: Decimal::ZERO,
                rate: dec("1"),
                base: None,
            }),
            12,
            3,
            &EngineConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            RuleDefinitionError::InvalidAction { rule_id: 12, index: 3, .. }
        ));

        let err = CompiledAction::compile(
            &Action::new(ActionKind::Formula {
                expression: "system(1)".into(),
            }),
            12,
            0,
            &EngineConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, RuleDefinitionError::InvalidFormula { rule_id: 12, .. }));
    }
}
