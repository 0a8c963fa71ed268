//! End-to-end tests over the laptop fixtures in `data/rulesets/` and
//! `data/items/`.

use std::path::PathBuf;
use std::str::FromStr;

use rust_decimal::Decimal;

use valuator_core::EngineConfig;
use valuator_rules::{
    default_weights, score, score_profiles, BulkItem, CompiledRuleset, EntryStatus,
    EvaluationError, RuleDefinitionError, RulesetDocument, ScoringProfilesDocument,
};

/// Integration tests run from the crate directory, so go up two levels.
fn data_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../data")
}

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn compiled() -> CompiledRuleset {
    let ruleset = RulesetDocument::from_yaml_file(data_dir().join("rulesets/laptops.yml"))
        .unwrap()
        .into_ruleset();
    CompiledRuleset::compile(&ruleset, &EngineConfig::default()).unwrap()
}

fn items() -> Vec<BulkItem> {
    let raw = std::fs::read_to_string(data_dir().join("items/laptops.json")).unwrap();
    serde_json::from_str(&raw).unwrap()
}

fn profiles() -> ScoringProfilesDocument {
    ScoringProfilesDocument::from_yaml_file(data_dir().join("rulesets/scoring-profiles.yml"))
        .unwrap()
}

#[test]
fn compiles_active_rules_in_order() {
    let ruleset = compiled();
    assert_eq!(ruleset.id(), "laptops");
    assert_eq!(ruleset.version(), 3);
    assert_eq!(ruleset.rule_count(), 6);
    assert_eq!(
        ruleset.group_names().collect::<Vec<_>>(),
        vec!["Hardware", "Cosmetic", "Market"]
    );
}

#[test]
fn dell_with_sixteen_gigabytes() {
    let items = items();
    let item = &items[0];
    let breakdown = compiled().evaluate_item(&item.context, item.base_value);

    let order: Vec<u64> = breakdown.entries.iter().map(|e| e.rule_id).collect();
    assert_eq!(order, vec![101, 102, 103, 201, 202, 301]);

    let amounts: Vec<Decimal> = breakdown.entries.iter().map(|e| e.amount).collect();
    assert_eq!(
        amounts,
        vec![dec("-50"), dec("0"), dec("15"), dec("-10"), dec("0"), dec("0")]
    );
    assert_eq!(breakdown.total_adjustment, dec("-45"));
    assert_eq!(breakdown.adjusted_value, dec("405.00"));

    let grade = breakdown.entry(201).unwrap();
    assert_eq!(grade.actions[0].factor, dec("0.5"));

    let hardware = breakdown.group("Hardware").unwrap();
    assert_eq!(hardware.total, dec("-35"));
    assert_eq!(hardware.contributing_rules, 2);
    assert!(!breakdown.group("Market").unwrap().is_contributing());

    let scores = score_profiles(&breakdown, profiles().profiles()).unwrap();
    assert_eq!(scores["retail"], dec("-27.5"));
    assert_eq!(scores["wholesale"], dec("-22.5"));
    assert_eq!(score(&breakdown, &default_weights(&breakdown)).unwrap(), dec("-27.5"));
}

#[test]
fn framework_celeron_with_market_uplift() {
    let items = items();
    let item = &items[1];
    let breakdown = compiled().evaluate_item(&item.context, item.base_value);

    assert_eq!(breakdown.entry(102).unwrap().amount, dec("25"));
    assert_eq!(breakdown.entry(103).unwrap().status, EntryStatus::NotMatched);

    // Grade A has a zero factor: matched, but not contributing.
    let grade = breakdown.entry(201).unwrap();
    assert!(grade.matched);
    assert!(!grade.contributing);

    assert_eq!(breakdown.entry(202).unwrap().amount, dec("32"));
    assert_eq!(breakdown.entry(301).unwrap().amount, dec("15"));
    assert_eq!(breakdown.total_adjustment, dec("72"));
    assert_eq!(breakdown.adjusted_value, dec("372"));

    let scores = score_profiles(&breakdown, profiles().profiles()).unwrap();
    assert_eq!(scores["retail"], dec("27.1"));
    assert_eq!(scores["wholesale"], dec("21.75"));
}

#[test]
fn unknown_operator_fixture_fails_compilation() {
    let ruleset = RulesetDocument::from_yaml_file(data_dir().join("rulesets/unknown-operator.yml"))
        .unwrap()
        .into_ruleset();
    let err = CompiledRuleset::compile(&ruleset, &EngineConfig::default()).unwrap_err();
    assert_eq!(
        err,
        EvaluationError::Definition(RuleDefinitionError::UnknownOperator {
            rule_id: 7,
            field: "ram_gb".into(),
            operator: "greater_than_or_equal".into(),
        })
    );
}

#[test]
fn breakdown_serializes_for_audit() {
    let items = items();
    let breakdown = compiled().evaluate_item(&items[0].context, items[0].base_value);
    let json = serde_json::to_value(&breakdown).unwrap();

    assert_eq!(json["ruleset_id"], "laptops");
    assert_eq!(json["entries"][0]["status"], "applied");
    assert_eq!(json["entries"][1]["status"], "not_matched");
    assert!(json["entries"][0]["reason"]
        .as_str()
        .unwrap()
        .starts_with("ram_gb=16"));

    let back: valuator_rules::Breakdown = serde_json::from_value(json).unwrap();
    assert_eq!(back, breakdown);
}
