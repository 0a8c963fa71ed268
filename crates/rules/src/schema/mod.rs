//! Ruleset data model with serde deserialization.
//!
//! Defines the plain-data type hierarchy the engine consumes:
//! - `Ruleset` → `RuleGroup` → `Rule` → `Condition` / `Action`
//! - `RulesetDocument`: YAML document form (`apiVersion`, `kind`, `metadata`, `spec`)
//! - `DocumentEnvelope`: lightweight first-pass header for kind dispatch

mod action;
mod condition;
mod document;
mod envelope;
mod kind;
mod metadata;
mod operator;
mod ruleset;

pub use action::*;
pub use condition::*;
pub use document::*;
pub use envelope::*;
pub use kind::*;
pub use metadata::CommonMetadata;
pub use operator::*;
pub use ruleset::*;

#[cfg(test)]
mod tests;
