//! Tests for schema types.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde_json::json;

use super::*;
use crate::error::DocumentError;

const LAPTOPS_YAML: &str = include_str!("../../../../data/rulesets/laptops.yml");
const PROFILES_YAML: &str = include_str!("../../../../data/rulesets/scoring-profiles.yml");

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

#[test]
fn parse_ruleset_document() {
    let doc = RulesetDocument::from_yaml_str(LAPTOPS_YAML).unwrap();
    assert_eq!(doc.api_version, "v1");
    assert_eq!(doc.metadata.id, "laptops");
    assert_eq!(doc.metadata.version, 3);

    let ruleset = doc.into_ruleset();
    assert_eq!(ruleset.id, "laptops");
    assert_eq!(ruleset.version, 3);
    assert_eq!(ruleset.groups.len(), 3);

    let hardware = &ruleset.groups[0];
    assert_eq!(hardware.name, "Hardware");
    assert_eq!(hardware.category.as_deref(), Some("hardware"));
    assert_eq!(hardware.weight, dec("0.7"));

    let ram = &hardware.rules[0];
    assert_eq!(ram.id, 101);
    assert_eq!(
        ram.condition,
        Condition::predicate("ram_gb", Operator::Gte, json!(16))
    );
    assert_eq!(
        ram.actions[0].kind,
        ActionKind::PerUnit {
            field: "ram_gb".into(),
            rate: dec("-3.125"),
        }
    );

    let retired = &hardware.rules[3];
    assert!(!retired.active);
    assert_eq!(retired.condition, Condition::always());
}

#[test]
fn action_modifier_flattens_next_to_type() {
    let action: Action = serde_yaml::from_str(
        r#"
type: fixed_value
value: -20
modifier:
  field: grade
  factors:
    A: 0
    B: 0.5
"#,
    )
    .unwrap();
    assert_eq!(action.kind, ActionKind::FixedValue { value: dec("-20") });
    let modifier = action.modifier.unwrap();
    assert_eq!(modifier.field, "grade");
    assert_eq!(modifier.factors["B"], dec("0.5"));
}

#[test]
fn multiplier_basis_defaults_to_base_value() {
    let action: Action = serde_yaml::from_str("type: multiplier\nrate: 0.05\n").unwrap();
    assert_eq!(
        action.kind,
        ActionKind::Multiplier {
            rate: dec("0.05"),
            basis: MultiplierBasis::BaseValue,
        }
    );
}

#[test]
fn unknown_operator_survives_deserialization() {
    let condition: Condition = serde_yaml::from_str(
        r#"
type: predicate
field: ram_gb
operator: approximately
value: 16
"#,
    )
    .unwrap();
    match condition {
        Condition::Predicate(p) => {
            assert_eq!(p.operator, Operator::Unknown("approximately".into()));
            assert!(!p.operator.is_known());
        }
        other => panic!("expected predicate, got {other:?}"),
    }
}

#[test]
fn operator_aliases_serialize_canonically() {
    let condition: Condition = serde_json::from_value(json!({
        "type": "predicate",
        "field": "ram_gb",
        "operator": ">=",
        "value": 16,
    }))
    .unwrap();
    let back = serde_json::to_value(&condition).unwrap();
    assert_eq!(back["operator"], "gte");
}

#[test]
fn nested_group_yaml() {
    let condition: Condition = serde_yaml::from_str(
        r#"
type: group
operator: or
conditions:
  - type: formula
    expression: "ram_gb * 2 > 30"
  - type: group
    operator: not
    conditions:
      - type: predicate
        field: brand
        operator: in
        value: [HP, Lenovo]
"#,
    )
    .unwrap();
    assert_eq!(
        condition,
        Condition::or(vec![
            Condition::formula("ram_gb * 2 > 30"),
            Condition::not(Condition::predicate("brand", "in", json!(["HP", "Lenovo"]))),
        ])
    );
}

#[test]
fn rule_rejects_unknown_fields() {
    let result: Result<Rule, _> = serde_yaml::from_str("id: 1\nname: x\nenabled: true\n");
    assert!(result.is_err());
}

#[test]
fn envelope_dispatches_on_kind() {
    let doc = Document::from_yaml_str(LAPTOPS_YAML).unwrap();
    assert_eq!(doc.kind(), DocumentKind::Ruleset);
    assert_eq!(doc.metadata().id, "laptops");

    let doc = Document::from_yaml_str(PROFILES_YAML).unwrap();
    assert_eq!(doc.kind(), DocumentKind::ScoringProfiles);
    match doc {
        Document::ScoringProfiles(profiles) => assert_eq!(profiles.spec.profiles.len(), 2),
        other => panic!("expected scoring profiles, got {:?}", other.kind()),
    }
}

#[test]
fn wrong_kind_is_rejected() {
    let yaml = LAPTOPS_YAML.replacen("kind: Ruleset", "kind: ScoringProfiles", 1);
    let err = RulesetDocument::from_yaml_str(&yaml).unwrap_err();
    assert!(matches!(err, DocumentError::WrongKind { .. }));

    let err = Document::from_yaml_str(&LAPTOPS_YAML.replacen("kind: Ruleset", "kind: Pricelist", 1))
        .unwrap_err();
    assert!(err.to_string().contains("unknown document kind"));
}

#[test]
fn builders_match_yaml_shape() {
    let ruleset = Ruleset::new("laptops", "Laptops")
        .with_version(2)
        .with_group(
            RuleGroup::new("Hardware").with_rule(
                Rule::new(1, "RAM")
                    .with_priority(5)
                    .with_action(ActionKind::Additive { value: dec("-1") }),
            ),
        );
    let yaml = serde_yaml::to_string(&ruleset).unwrap();
    let back: Ruleset = serde_yaml::from_str(&yaml).unwrap();
    assert_eq!(back, ruleset);
    assert_eq!(back.rule_count(), 1);
}
