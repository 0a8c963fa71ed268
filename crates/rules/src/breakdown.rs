//! Per-item evaluation result: amounts, entries, and group summaries.
//!
//! A [`Breakdown`] is plain serializable data. It is what API and audit
//! consumers store, and what the scoring aggregator reads.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// ── Breakdown ───────────────────────────────────────────────────────

/// Outcome of evaluating one item against one ruleset snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Breakdown {
    pub ruleset_id: String,
    pub ruleset_version: u32,
    pub base_value: Decimal,
    /// Sum of every entry amount, in evaluation order.
    pub total_adjustment: Decimal,
    /// `base_value + total_adjustment`. Not floored.
    pub adjusted_value: Decimal,
    /// One entry per active rule, in evaluation order.
    pub entries: Vec<BreakdownEntry>,
    /// One summary per active group, in evaluation order.
    pub groups: Vec<GroupSummary>,
}

impl Breakdown {
    /// Entries that changed the value.
    pub fn contributing(&self) -> impl Iterator<Item = &BreakdownEntry> {
        self.entries.iter().filter(|e| e.contributing)
    }

    /// Entries whose evaluation failed at runtime.
    pub fn errored(&self) -> impl Iterator<Item = &BreakdownEntry> {
        self.entries
            .iter()
            .filter(|e| e.status == EntryStatus::Errored)
    }

    pub fn entry(&self, rule_id: u64) -> Option<&BreakdownEntry> {
        self.entries.iter().find(|e| e.rule_id == rule_id)
    }

    pub fn group(&self, name: &str) -> Option<&GroupSummary> {
        self.groups.iter().find(|g| g.name == name)
    }

    pub fn has_errors(&self) -> bool {
        self.errored().next().is_some()
    }
}

// ── Entries ─────────────────────────────────────────────────────────

/// How a rule's evaluation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryStatus {
    /// Condition held and every action ran.
    Applied,
    /// Condition did not hold.
    NotMatched,
    /// A formula or action failed; the rule contributes zero.
    Errored,
}

/// The record of one rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakdownEntry {
    pub rule_id: u64,
    pub rule_name: String,
    pub group: String,
    pub status: EntryStatus,
    pub matched: bool,
    /// Matched, has at least one action, and a non-zero amount.
    pub contributing: bool,
    /// Rounded rule adjustment; zero unless contributing.
    pub amount: Decimal,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<ActionAmount>,
    /// Human-readable account of the condition.
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BreakdownEntry {
    pub(crate) fn not_matched(
        rule_id: u64,
        rule_name: &str,
        group: &str,
        reason: String,
    ) -> Self {
        Self {
            rule_id,
            rule_name: rule_name.to_string(),
            group: group.to_string(),
            status: EntryStatus::NotMatched,
            matched: false,
            contributing: false,
            amount: Decimal::ZERO,
            actions: Vec::new(),
            reason,
            error: None,
        }
    }

    pub(crate) fn errored(
        rule_id: u64,
        rule_name: &str,
        group: &str,
        matched: bool,
        reason: String,
        error: String,
    ) -> Self {
        Self {
            status: EntryStatus::Errored,
            matched,
            error: Some(error),
            ..Self::not_matched(rule_id, rule_name, group, reason)
        }
    }

    pub(crate) fn applied(
        rule_id: u64,
        rule_name: &str,
        group: &str,
        reason: String,
        amount: Decimal,
        actions: Vec<ActionAmount>,
    ) -> Self {
        let contributing = !actions.is_empty() && !amount.is_zero();
        Self {
            status: EntryStatus::Applied,
            matched: true,
            contributing,
            amount: if contributing { amount } else { Decimal::ZERO },
            actions,
            ..Self::not_matched(rule_id, rule_name, group, reason)
        }
    }
}

/// What one action produced, before rule-level rounding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionAmount {
    /// Position in the rule's action list.
    pub index: usize,
    /// Action type name, e.g. `per_unit`.
    pub kind: String,
    /// Amount before the modifier.
    pub raw: Decimal,
    /// Modifier factor applied to `raw`; 1 when there is no modifier or no match.
    pub factor: Decimal,
    /// `raw × factor`.
    pub amount: Decimal,
}

// ── Group summaries ─────────────────────────────────────────────────

/// Per-group totals consumed by the scoring aggregator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupSummary {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// The group's own weight from the ruleset.
    pub weight: Decimal,
    /// Sum of contributing entry amounts.
    pub total: Decimal,
    pub contributing_rules: usize,
}

impl GroupSummary {
    pub fn is_contributing(&self) -> bool {
        self.contributing_rules > 0
    }
}
