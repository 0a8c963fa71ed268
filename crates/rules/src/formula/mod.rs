//! Restricted formula language for user-authored adjustments.
//!
//! Formulas are parsed once into an AST by a recursive-descent parser and
//! interpreted directly. The grammar covers arithmetic (`+ - * / % **`),
//! comparisons, boolean `and`/`or`/`not`, dotted field paths, and the
//! allow-listed functions `min`, `max`, `round`, `abs`, `sqrt`, `pow`.
//! There is no general-purpose evaluation; unknown syntax fails to parse.

mod error;
mod interpreter;
mod lexer;
mod parser;

use std::fmt;

use rust_decimal::Decimal;
use valuator_core::{EngineConfig, EvaluationContext};

pub use error::{FormulaError, FormulaEvaluationError, FormulaParseError};
pub use parser::{BinaryOp, Expr, Function, UnaryOp, ALLOWED_FUNCTIONS};

/// A parsed, validated formula.
#[derive(Debug, Clone, PartialEq)]
pub struct Formula {
    source: String,
    ast: Expr,
}

impl Formula {
    /// Parse `source` under the length and depth limits of `config`.
    pub fn parse(source: &str, config: &EngineConfig) -> Result<Self, FormulaParseError> {
        if source.len() > config.max_formula_length {
            return Err(FormulaParseError::new(
                config.max_formula_length,
                format!(
                    "formula is {} bytes, longer than the limit of {}",
                    source.len(),
                    config.max_formula_length
                ),
            ));
        }
        if source.trim().is_empty() {
            return Err(FormulaParseError::new(0, "formula is empty"));
        }
        let ast = parser::parse(source, config.max_condition_depth)?;
        Ok(Self {
            source: source.to_string(),
            ast,
        })
    }

    pub fn evaluate(&self, ctx: &EvaluationContext) -> Result<Decimal, FormulaEvaluationError> {
        interpreter::eval(&self.ast, ctx)
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn ast(&self) -> &Expr {
        &self.ast
    }

    /// Every field path the formula reads, in first-use order.
    pub fn fields(&self) -> Vec<&str> {
        let mut out = Vec::new();
        collect_fields(&self.ast, &mut out);
        out
    }
}

impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

fn collect_fields<'a>(expr: &'a Expr, out: &mut Vec<&'a str>) {
    match expr {
        Expr::Number(_) => {}
        Expr::Field(path) => {
            if !out.contains(&path.as_str()) {
                out.push(path);
            }
        }
        Expr::Unary { operand, .. } => collect_fields(operand, out),
        Expr::Binary { left, right, .. } => {
            collect_fields(left, out);
            collect_fields(right, out);
        }
        Expr::Call { args, .. } => args.iter().for_each(|a| collect_fields(a, out)),
    }
}

/// One-shot parse and evaluate with default limits.
pub fn evaluate(ctx: &EvaluationContext, expression: &str) -> Result<Decimal, FormulaError> {
    let formula = Formula::parse(expression, &EngineConfig::default())?;
    Ok(formula.evaluate(ctx)?)
}

#[cfg(test)]
mod tests;
