//! Tests for the formula engine.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde_json::json;
use valuator_core::{EngineConfig, EvaluationContext};

use super::*;

fn ctx() -> EvaluationContext {
    EvaluationContext::from_json(json!({
        "ram_gb": 50,
        "storage_gb": 512,
        "refurbished": true,
        "brand": "Dell",
        "cpu": { "benchmark_score": 12500 },
        "grades": [3, 7],
    }))
    .unwrap()
}

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn eval_ok(expression: &str) -> Decimal {
    evaluate(&ctx(), expression).unwrap_or_else(|e| panic!("{expression}: {e}"))
}

fn parse_err(expression: &str) -> FormulaParseError {
    match Formula::parse(expression, &EngineConfig::default()) {
        Err(e) => e,
        Ok(f) => panic!("{expression} should not parse, got {:?}", f.ast()),
    }
}

#[test]
fn min_clamps_scaled_ram() {
    assert_eq!(eval_ok("min(ram_gb * 2.5, 100)"), dec("100"));
    assert_eq!(eval_ok("min(ram_gb * 1.5, 100)"), dec("75"));
}

#[test]
fn precedence_and_associativity() {
    assert_eq!(eval_ok("2 + 3 * 4"), dec("14"));
    assert_eq!(eval_ok("(2 + 3) * 4"), dec("20"));
    assert_eq!(eval_ok("2 ** 3 ** 2"), dec("512"));
    assert_eq!(eval_ok("-2 ** 2"), dec("-4"));
    assert_eq!(eval_ok("10 - 4 - 3"), dec("3"));
    assert_eq!(eval_ok("17 % 5"), dec("2"));
}

#[test]
fn nested_and_indexed_fields() {
    assert_eq!(eval_ok("cpu.benchmark_score / 1000"), dec("12.5"));
    assert_eq!(eval_ok("grades.1 - grades.0"), dec("4"));
}

#[test]
fn booleans_and_comparisons() {
    assert_eq!(eval_ok("ram_gb >= 16 and storage_gb > 256"), Decimal::ONE);
    assert_eq!(eval_ok("ram_gb < 16 || not refurbished"), Decimal::ZERO);
    assert_eq!(eval_ok("refurbished * -20"), dec("-20"));
    assert_eq!(eval_ok("!(1 == 2)"), Decimal::ONE);
    assert_eq!(eval_ok("true && false"), Decimal::ZERO);
}

#[test]
fn allow_listed_functions() {
    assert_eq!(eval_ok("max(1, 7, 3)"), dec("7"));
    assert_eq!(eval_ok("abs(-4.5)"), dec("4.5"));
    assert_eq!(eval_ok("round(sqrt(16), 10)"), dec("4"));
    assert_eq!(eval_ok("pow(2, 10)"), dec("1024"));
    assert_eq!(eval_ok("round(2.345, 2)"), dec("2.35"));
    assert_eq!(eval_ok("round(2.5)"), dec("3"));
}

#[test]
fn short_circuit_skips_failing_branch() {
    // The right side would divide by zero and reference a missing field.
    assert_eq!(eval_ok("0 and (1 / 0)"), Decimal::ZERO);
    assert_eq!(eval_ok("1 or missing_field"), Decimal::ONE);
}

#[test]
fn division_by_zero_is_typed() {
    let err = evaluate(&ctx(), "ram_gb / (storage_gb - 512)").unwrap_err();
    assert_eq!(
        err,
        FormulaError::Evaluation(FormulaEvaluationError::DivisionByZero)
    );
    let err = evaluate(&ctx(), "ram_gb % 0").unwrap_err();
    assert_eq!(
        err,
        FormulaError::Evaluation(FormulaEvaluationError::DivisionByZero)
    );
}

#[test]
fn negative_powers() {
    assert_eq!(eval_ok("pow(2, -2)"), dec("0.25"));
    assert_eq!(eval_ok("2 ** -1"), dec("0.5"));
    // Too small to represent rounds to zero rather than overflowing.
    assert_eq!(eval_ok("pow(2, -100)"), Decimal::ZERO);

    for expression in ["pow(0, -1)", "0 ** -2", "pow(ram_gb - 50, -0.5)"] {
        assert_eq!(
            evaluate(&ctx(), expression).unwrap_err(),
            FormulaError::Evaluation(FormulaEvaluationError::DivisionByZero),
            "{expression}"
        );
    }
    assert!(matches!(
        evaluate(&ctx(), "pow(10, 100)").unwrap_err(),
        FormulaError::Evaluation(FormulaEvaluationError::Overflow { operation: "pow" })
    ));
}

#[test]
fn field_errors_are_typed() {
    assert_eq!(
        evaluate(&ctx(), "gpu_vram * 2").unwrap_err(),
        FormulaError::Evaluation(FormulaEvaluationError::UnresolvedField {
            field: "gpu_vram".into()
        })
    );
    assert_eq!(
        evaluate(&ctx(), "brand + 1").unwrap_err(),
        FormulaError::Evaluation(FormulaEvaluationError::NonNumericField {
            field: "brand".into(),
            found: "string"
        })
    );
}

#[test]
fn numeric_domain_errors() {
    assert!(matches!(
        evaluate(&ctx(), "sqrt(-1)").unwrap_err(),
        FormulaError::Evaluation(FormulaEvaluationError::InvalidArgument { function: "sqrt", .. })
    ));
    assert!(matches!(
        evaluate(&ctx(), "round(1.5, 0.5)").unwrap_err(),
        FormulaError::Evaluation(FormulaEvaluationError::InvalidArgument { function: "round", .. })
    ));
    assert!(matches!(
        evaluate(&ctx(), "79228162514264337593543950335 * 10").unwrap_err(),
        FormulaError::Evaluation(FormulaEvaluationError::Overflow { .. })
    ));
}

#[test]
fn unknown_functions_fail_at_parse_time() {
    let err = parse_err("exec(ram_gb)");
    assert!(err.message.contains("unknown function `exec`"));
    assert_eq!(err.offset, 0);

    assert!(parse_err("cpu.score(1)").message.contains("not a callable"));
}

#[test]
fn arity_is_checked_at_parse_time() {
    assert!(parse_err("pow(2)").message.contains("takes 2 argument"));
    assert!(parse_err("abs(1, 2)").message.contains("takes 1 argument"));
    assert!(parse_err("min()").message.contains("at least 1"));
}

#[test]
fn malformed_syntax_is_rejected() {
    assert!(parse_err("").message.contains("empty"));
    assert!(parse_err("1 +").message.contains("unexpected end"));
    assert!(parse_err("(1 + 2").message.contains("expected `)`"));
    assert!(parse_err("1 2").message.contains("trailing"));
    assert!(parse_err("ram_gb = 1").message.contains("unexpected character"));
    assert!(parse_err("and + 1").message.contains("keyword"));
    assert!(parse_err("cpu.").message.contains("field name"));
}

#[test]
fn limits_are_enforced() {
    let config = EngineConfig {
        max_formula_length: 10,
        ..EngineConfig::default()
    };
    let err = Formula::parse("ram_gb * 2.5 + 1", &config).unwrap_err();
    assert!(err.message.contains("longer than the limit"));

    let config = EngineConfig {
        max_condition_depth: 4,
        ..EngineConfig::default()
    };
    let deep = format!("{}1{}", "(".repeat(10), ")".repeat(10));
    let err = Formula::parse(&deep, &config).unwrap_err();
    assert!(err.message.contains("maximum depth"));
    assert!(Formula::parse("((1))", &config).is_ok());
}

#[test]
fn long_operator_chains_are_bounded() {
    let config = EngineConfig {
        max_formula_length: 400_000,
        ..EngineConfig::default()
    };
    let sum = vec!["1"; 100_000].join("+");
    let err = Formula::parse(&sum, &config).unwrap_err();
    assert!(err.message.contains("maximum depth"));

    let conjunction = vec!["ram_gb > 1"; 50].join(" and ");
    assert!(Formula::parse(&conjunction, &config).is_err());

    // A chain that fits under the default depth still parses and evaluates.
    let short = vec!["1"; 10].join(" + ");
    let formula = Formula::parse(&short, &EngineConfig::default()).unwrap();
    assert_eq!(formula.evaluate(&ctx()).unwrap(), dec("10"));
}

#[test]
fn fields_lists_each_path_once() {
    let f = Formula::parse(
        "ram_gb * 2 + min(ram_gb, cpu.benchmark_score)",
        &EngineConfig::default(),
    )
    .unwrap();
    assert_eq!(f.fields(), vec!["ram_gb", "cpu.benchmark_score"]);
    assert_eq!(f.to_string(), "ram_gb * 2 + min(ram_gb, cpu.benchmark_score)");
}
