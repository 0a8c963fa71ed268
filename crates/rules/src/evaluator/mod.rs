//! Rule evaluator: the per-item orchestrator.
//!
//! Walks a [`CompiledRuleset`] in deterministic order (groups by `order`
//! then name, rules by `priority` then id), evaluates each rule's condition,
//! runs its actions, and records one [`BreakdownEntry`] per active rule.
//!
//! Runtime failures stay inside the rule that raised them: the rule gets an
//! errored zero entry and the walk continues. Definition defects surface at
//! compile time and abort the call before any item is touched.

mod actions;
mod compile;
mod conditions;

use rust_decimal::{Decimal, RoundingStrategy};
use tracing::{debug, warn};

use valuator_core::{EngineConfig, EvaluationContext};

use crate::breakdown::{ActionAmount, Breakdown, BreakdownEntry, GroupSummary};
use crate::error::{ActionError, EvaluationError};
use crate::schema::Ruleset;

pub use actions::{ActionBasis, CompiledAction};
pub use compile::CompiledRuleset;
pub use conditions::{evaluate_condition, CompiledCondition, CompiledPredicate};
pub(crate) use conditions::compile_predicate;

use compile::{CompiledGroup, CompiledRule};

// ── Rule evaluator ──────────────────────────────────────────────────

/// One-shot entry points that compile and evaluate in a single call.
///
/// For many items against one ruleset, compile once with
/// [`CompiledRuleset::compile`] and call [`CompiledRuleset::evaluate_item`].
pub struct RuleEvaluator;

impl RuleEvaluator {
    /// Evaluate one item with default limits.
    pub fn evaluate_item(
        ctx: &EvaluationContext,
        ruleset: &Ruleset,
        base_value: Decimal,
    ) -> Result<Breakdown, EvaluationError> {
        Self::evaluate_item_with(ctx, ruleset, base_value, &EngineConfig::default())
    }

    pub fn evaluate_item_with(
        ctx: &EvaluationContext,
        ruleset: &Ruleset,
        base_value: Decimal,
        config: &EngineConfig,
    ) -> Result<Breakdown, EvaluationError> {
        let compiled = CompiledRuleset::compile(ruleset, config)?;
        Ok(compiled.evaluate_item(ctx, base_value))
    }
}

/// Free-function form of [`RuleEvaluator::evaluate_item`].
pub fn evaluate_item(
    ctx: &EvaluationContext,
    ruleset: &Ruleset,
    base_value: Decimal,
) -> Result<Breakdown, EvaluationError> {
    RuleEvaluator::evaluate_item(ctx, ruleset, base_value)
}

// ── Orchestration ───────────────────────────────────────────────────

impl CompiledRuleset {
    /// Evaluate one item. Never fails; rule-level errors land in the entries.
    pub fn evaluate_item(&self, ctx: &EvaluationContext, base_value: Decimal) -> Breakdown {
        let mut running_total = Decimal::ZERO;
        let mut entries = Vec::with_capacity(self.rule_count());
        let mut groups = Vec::with_capacity(self.groups.len());

        for group in &self.groups {
            let mut summary = GroupSummary {
                name: group.name.clone(),
                category: group.category.clone(),
                weight: group.weight,
                total: Decimal::ZERO,
                contributing_rules: 0,
            };

            for rule in &group.rules {
                let entry = self.evaluate_rule(rule, group, ctx, base_value, running_total);
                if entry.contributing {
                    // Amounts were checked against the running total in evaluate_rule.
                    running_total += entry.amount;
                    summary.total = summary.total.saturating_add(entry.amount);
                    summary.contributing_rules += 1;
                }
                entries.push(entry);
            }
            groups.push(summary);
        }

        Breakdown {
            ruleset_id: self.id.clone(),
            ruleset_version: self.version,
            base_value,
            total_adjustment: running_total,
            adjusted_value: base_value.saturating_add(running_total),
            entries,
            groups,
        }
    }

    fn evaluate_rule(
        &self,
        rule: &CompiledRule,
        group: &CompiledGroup,
        ctx: &EvaluationContext,
        base_value: Decimal,
        running_total: Decimal,
    ) -> BreakdownEntry {
        let (verdict, reason) = rule.condition.evaluate_described(ctx);

        let matched = match verdict {
            Ok(matched) => matched,
            Err(e) => {
                warn!(
                    rule_id = rule.id,
                    group = %group.name,
                    error = %e,
                    "Condition formula failed"
                );
                return BreakdownEntry::errored(
                    rule.id,
                    &rule.name,
                    &group.name,
                    false,
                    reason,
                    format!("condition: {e}"),
                );
            }
        };

        if !matched {
            return BreakdownEntry::not_matched(rule.id, &rule.name, &group.name, reason);
        }

        match self.run_actions(rule, ctx, base_value, running_total) {
            Ok((amount, actions)) => {
                debug!(rule_id = rule.id, group = %group.name, amount = %amount, "Rule matched");
                BreakdownEntry::applied(rule.id, &rule.name, &group.name, reason, amount, actions)
            }
            Err((index, e)) => {
                warn!(
                    rule_id = rule.id,
                    group = %group.name,
                    action = index,
                    error = %e,
                    "Action failed"
                );
                BreakdownEntry::errored(
                    rule.id,
                    &rule.name,
                    &group.name,
                    true,
                    reason,
                    format!("action #{index}: {e}"),
                )
            }
        }
    }

    /// Run every action in order and return the rounded rule total.
    ///
    /// Any failure discards the partial amounts of this rule.
    fn run_actions(
        &self,
        rule: &CompiledRule,
        ctx: &EvaluationContext,
        base_value: Decimal,
        running_total: Decimal,
    ) -> Result<(Decimal, Vec<ActionAmount>), (usize, ActionError)> {
        let mut rule_total = Decimal::ZERO;
        let mut amounts = Vec::with_capacity(rule.actions.len());

        for action in &rule.actions {
            let fail = |e| (action.index(), e);
            let current = running_total
                .checked_add(rule_total)
                .ok_or_else(|| fail(ActionError::Overflow))?;
            let out = action
                .apply(
                    ctx,
                    ActionBasis {
                        base_value,
                        running_total: current,
                    },
                )
                .map_err(fail)?;
            rule_total = rule_total
                .checked_add(out.amount)
                .ok_or_else(|| fail(ActionError::Overflow))?;
            amounts.push(out);
        }

        let rounded = rule_total
            .round_dp_with_strategy(self.amount_scale, RoundingStrategy::MidpointAwayFromZero);
        // Keep the running total representable for later rules.
        let last = rule.actions.last().map(|a| a.index()).unwrap_or(0);
        running_total
            .checked_add(rounded)
            .ok_or((last, ActionError::Overflow))?;

        Ok((rounded, amounts))
    }
}
