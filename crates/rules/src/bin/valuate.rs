//! valuate — evaluate a batch of items against a ruleset file.
//!
//! Reads a `kind: Ruleset` YAML document and a JSON array of items, runs
//! the bulk evaluator, and prints breakdowns plus per-profile scores as
//! JSON on stdout. Logs go to stderr.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::Parser;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::info;

use valuator_core::config::load_dotenv;
use valuator_core::EngineConfig;
use valuator_rules::{
    default_weights, score_profiles, validate_ruleset, BulkEvaluator, BulkItem, BulkOutcome,
    CompiledRuleset, RulesetDocument, ScoringProfilesDocument, WeightingProfile,
};

// ── CLI ─────────────────────────────────────────────────────────────

/// Valuation rule engine: evaluate items against a ruleset.
#[derive(Parser, Debug)]
#[command(name = "valuate", version, about)]
struct Cli {
    /// Ruleset YAML document.
    #[arg(long, env = "VALUATOR_RULESET")]
    ruleset: PathBuf,

    /// JSON array of items: `{ id, base_value, fields, attributes?, enum_fields? }`.
    #[arg(long, env = "VALUATOR_ITEMS", required_unless_present = "validate_only")]
    items: Option<PathBuf>,

    /// ScoringProfiles YAML document. Without it, the ruleset's group weights are used.
    #[arg(long, env = "VALUATOR_PROFILES")]
    profiles: Option<PathBuf>,

    /// Print the validation report and exit; non-zero exit on errors.
    #[arg(long)]
    validate_only: bool,

    /// Pretty-print the JSON output.
    #[arg(long)]
    pretty: bool,
}

// ── Output ──────────────────────────────────────────────────────────

#[derive(Serialize)]
struct Output<'a> {
    ruleset_id: &'a str,
    ruleset_version: u32,
    evaluated: usize,
    skipped: usize,
    items: Vec<ItemOutput<'a>>,
}

#[derive(Serialize)]
struct ItemOutput<'a> {
    id: &'a str,
    #[serde(flatten)]
    outcome: &'a BulkOutcome,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    scores: BTreeMap<String, Decimal>,
}

fn print_json(value: &impl Serialize, pretty: bool) -> anyhow::Result<()> {
    let text = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{text}");
    Ok(())
}

fn load_items(path: &Path) -> anyhow::Result<Vec<BulkItem>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading items from {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing items in {}", path.display()))
}

fn load_profiles(path: Option<&Path>) -> anyhow::Result<Option<Vec<WeightingProfile>>> {
    let Some(path) = path else {
        return Ok(None);
    };
    let doc = ScoringProfilesDocument::from_yaml_file(path)
        .with_context(|| format!("loading scoring profiles from {}", path.display()))?;
    Ok(Some(doc.spec.profiles))
}

// ── Main ────────────────────────────────────────────────────────────

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    load_dotenv();
    let cli = Cli::parse();
    let config = EngineConfig::from_env();
    config.log_summary();

    let ruleset = RulesetDocument::from_yaml_file(&cli.ruleset)
        .with_context(|| format!("loading ruleset from {}", cli.ruleset.display()))?
        .into_ruleset();

    if cli.validate_only {
        let report = validate_ruleset(&ruleset, &config);
        print_json(&report, cli.pretty)?;
        if !report.valid {
            bail!(
                "ruleset `{}` has {} validation error(s)",
                ruleset.id,
                report.errors.len()
            );
        }
        return Ok(());
    }

    let items_path = cli
        .items
        .as_deref()
        .context("--items is required unless --validate-only is set")?;
    let items = load_items(items_path)?;
    let profiles = load_profiles(cli.profiles.as_deref())?;

    let compiled = CompiledRuleset::compile(&ruleset, &config)
        .with_context(|| format!("compiling ruleset `{}`", ruleset.id))?;
    let bulk = BulkEvaluator::new(compiled, &config)?;
    let report = bulk.run(&items);

    let mut outputs = Vec::with_capacity(report.results.len());
    for result in &report.results {
        let scores = match (result.breakdown(), &profiles) {
            (None, _) => BTreeMap::new(),
            (Some(breakdown), Some(profiles)) => score_profiles(breakdown, profiles)
                .with_context(|| format!("scoring item `{}`", result.id))?,
            (Some(breakdown), None) => {
                let own = WeightingProfile::new("default", default_weights(breakdown));
                score_profiles(breakdown, std::slice::from_ref(&own))
                    .with_context(|| format!("scoring item `{}`", result.id))?
            }
        };
        outputs.push(ItemOutput {
            id: &result.id,
            outcome: &result.outcome,
            scores,
        });
    }

    info!(
        ruleset_id = %ruleset.id,
        evaluated = report.evaluated,
        skipped = report.skipped,
        "Valuation complete"
    );

    print_json(
        &Output {
            ruleset_id: bulk.ruleset().id(),
            ruleset_version: bulk.ruleset().version(),
            evaluated: report.evaluated,
            skipped: report.skipped,
            items: outputs,
        },
        cli.pretty,
    )
}
