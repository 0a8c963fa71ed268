//! Bulk recalculation on a rayon worker pool.
//!
//! One compiled ruleset is shared by reference across workers; each item
//! gets its own context and breakdown. Results come back in input order.
//! Cancellation is checked before an item starts, so an item in flight
//! always completes and items not yet started are reported as skipped.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rayon::prelude::*;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;

use valuator_core::{EngineConfig, EvaluationContext};

use crate::breakdown::Breakdown;
use crate::error::BulkError;
use crate::evaluator::CompiledRuleset;

/// One item to value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkItem {
    pub id: String,
    pub base_value: Decimal,
    /// `fields`, `attributes`, and `enum_fields` at the top level of the item.
    #[serde(flatten)]
    pub context: EvaluationContext,
}

/// Per-item outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BulkOutcome {
    Evaluated { breakdown: Breakdown },
    /// Cancelled before the item started.
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkResult {
    pub id: String,
    #[serde(flatten)]
    pub outcome: BulkOutcome,
}

impl BulkResult {
    pub fn breakdown(&self) -> Option<&Breakdown> {
        match &self.outcome {
            BulkOutcome::Evaluated { breakdown } => Some(breakdown),
            BulkOutcome::Skipped => None,
        }
    }
}

/// Results in input order plus counts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkReport {
    pub results: Vec<BulkResult>,
    pub evaluated: usize,
    pub skipped: usize,
}

/// Evaluates many items against one compiled ruleset.
pub struct BulkEvaluator {
    ruleset: CompiledRuleset,
    pool: rayon::ThreadPool,
    cancel: Arc<AtomicBool>,
}

impl BulkEvaluator {
    /// Build the worker pool. `worker_threads = 0` uses rayon's default size.
    pub fn new(ruleset: CompiledRuleset, config: &EngineConfig) -> Result<Self, BulkError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.worker_threads)
            .thread_name(|i| format!("valuator-bulk-{i}"))
            .build()?;
        Ok(Self {
            ruleset,
            pool,
            cancel: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn ruleset(&self) -> &CompiledRuleset {
        &self.ruleset
    }

    pub fn worker_threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Request cancellation of the current and future runs.
    pub fn cancel(&self) {
        info!("Bulk evaluation cancellation requested");
        self.cancel.store(true, Ordering::Relaxed);
    }

    /// Clear a previous cancellation.
    pub fn reset(&self) {
        self.cancel.store(false, Ordering::Relaxed);
    }

    /// Shared cancellation flag, for signalling from another thread.
    pub fn cancel_signal(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    pub fn run(&self, items: &[BulkItem]) -> BulkReport {
        info!(
            ruleset_id = %self.ruleset.id(),
            items = items.len(),
            workers = self.worker_threads(),
            "Bulk evaluation starting"
        );

        let results: Vec<BulkResult> = self.pool.install(|| {
            items
                .par_iter()
                .map(|item| self.evaluate_one(&item.id, &item.context, item.base_value))
                .collect()
        });

        let evaluated = results
            .iter()
            .filter(|r| r.breakdown().is_some())
            .count();
        let skipped = results.len() - evaluated;

        info!(
            ruleset_id = %self.ruleset.id(),
            evaluated,
            skipped,
            "Bulk evaluation finished"
        );
        BulkReport {
            results,
            evaluated,
            skipped,
        }
    }

    fn evaluate_one(&self, id: &str, ctx: &EvaluationContext, base_value: Decimal) -> BulkResult {
        let outcome = if self.cancel.load(Ordering::Relaxed) {
            BulkOutcome::Skipped
        } else {
            BulkOutcome::Evaluated {
                breakdown: self.ruleset.evaluate_item(ctx, base_value),
            }
        };
        BulkResult {
            id: id.to_string(),
            outcome,
        }
    }
}
