//! Ruleset compilation.
//!
//! Turns a [`Ruleset`] snapshot into the sorted, pre-validated form the
//! orchestrator walks. Inactive groups and rules are dropped here, so the
//! hot path never checks flags.

use std::collections::HashSet;

use rust_decimal::Decimal;
use tracing::info;

use valuator_core::EngineConfig;

use crate::error::EvaluationError;
use crate::schema::{Rule, RuleGroup, Ruleset};

use super::actions::CompiledAction;
use super::conditions::CompiledCondition;

/// Immutable, evaluation-ready ruleset. Shareable across threads.
#[derive(Debug, Clone)]
pub struct CompiledRuleset {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) version: u32,
    pub(crate) amount_scale: u32,
    pub(crate) groups: Vec<CompiledGroup>,
}

#[derive(Debug, Clone)]
pub(crate) struct CompiledGroup {
    pub(crate) name: String,
    pub(crate) category: Option<String>,
    pub(crate) weight: Decimal,
    pub(crate) rules: Vec<CompiledRule>,
}

#[derive(Debug, Clone)]
pub(crate) struct CompiledRule {
    pub(crate) id: u64,
    pub(crate) name: String,
    pub(crate) condition: CompiledCondition,
    pub(crate) actions: Vec<CompiledAction>,
}

impl CompiledRuleset {
    /// Validate and pre-parse every active group and rule.
    ///
    /// Groups are ordered by `(order, name)`, rules by `(priority, id)`.
    pub fn compile(ruleset: &Ruleset, config: &EngineConfig) -> Result<Self, EvaluationError> {
        let mut seen = HashSet::new();
        for group in &ruleset.groups {
            if !seen.insert(group.name.as_str()) {
                return Err(EvaluationError::DuplicateGroup {
                    ruleset_id: ruleset.id.clone(),
                    group: group.name.clone(),
                });
            }
        }

        let mut active: Vec<&RuleGroup> = ruleset.groups.iter().filter(|g| g.active).collect();
        active.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.name.cmp(&b.name)));

        let groups = active
            .into_iter()
            .map(|g| compile_group(g, config))
            .collect::<Result<Vec<_>, _>>()?;

        let compiled = Self {
            id: ruleset.id.clone(),
            name: ruleset.name.clone(),
            version: ruleset.version,
            amount_scale: config.amount_scale,
            groups,
        };

        info!(
            ruleset_id = %compiled.id,
            version = compiled.version,
            groups = compiled.groups.len(),
            rules = compiled.rule_count(),
            "Compiled ruleset"
        );
        Ok(compiled)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    /// Number of active rules that will be evaluated per item.
    pub fn rule_count(&self) -> usize {
        self.groups.iter().map(|g| g.rules.len()).sum()
    }

    /// Active group names in evaluation order.
    pub fn group_names(&self) -> impl Iterator<Item = &str> {
        self.groups.iter().map(|g| g.name.as_str())
    }
}

fn compile_group(
    group: &RuleGroup,
    config: &EngineConfig,
) -> Result<CompiledGroup, EvaluationError> {
    let mut active: Vec<&Rule> = group.rules.iter().filter(|r| r.active).collect();
    active.sort_by(|a, b| a.priority.cmp(&b.priority).then_with(|| a.id.cmp(&b.id)));

    let rules = active
        .into_iter()
        .map(|r| compile_rule(r, config))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(CompiledGroup {
        name: group.name.clone(),
        category: group.category.clone(),
        weight: group.weight,
        rules,
    })
}

fn compile_rule(rule: &Rule, config: &EngineConfig) -> Result<CompiledRule, EvaluationError> {
    let condition = CompiledCondition::compile(&rule.condition, rule.id, config)?;
    let actions = rule
        .actions
        .iter()
        .enumerate()
        .map(|(index, action)| CompiledAction::compile(action, rule.id, index, config))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(CompiledRule {
        id: rule.id,
        name: rule.name.clone(),
        condition,
        actions,
    })
}
