//! Direct AST interpreter over `Decimal`.
//!
//! Booleans are 1 and 0; any non-zero value is truthy. Every arithmetic step
//! is checked so malformed inputs surface as [`FormulaEvaluationError`]
//! instead of panicking.

use rust_decimal::prelude::*;
use rust_decimal::MathematicalOps;

use valuator_core::{EvaluationContext, ResolvedValue};

use super::error::FormulaEvaluationError;
use super::parser::{BinaryOp, Expr, Function, UnaryOp};

/// Largest precision `round(x, dp)` accepts.
const MAX_ROUND_DP: u32 = 28;

pub(super) fn eval(
    expr: &Expr,
    ctx: &EvaluationContext,
) -> Result<Decimal, FormulaEvaluationError> {
    match expr {
        Expr::Number(n) => Ok(*n),
        Expr::Field(path) => field(ctx, path),
        Expr::Unary { op, operand } => {
            let value = eval(operand, ctx)?;
            Ok(match op {
                UnaryOp::Neg => -value,
                UnaryOp::Not => truth(value.is_zero()),
            })
        }
        Expr::Binary { op, left, right } => binary(*op, left, right, ctx),
        Expr::Call { function, args } => call(*function, args, ctx),
    }
}

fn field(ctx: &EvaluationContext, path: &str) -> Result<Decimal, FormulaEvaluationError> {
    match ctx.resolve(path) {
        ResolvedValue::Number(n) => Ok(n),
        ResolvedValue::Boolean(b) => Ok(truth(b)),
        ResolvedValue::Absent => Err(FormulaEvaluationError::UnresolvedField {
            field: path.to_string(),
        }),
        other => Err(FormulaEvaluationError::NonNumericField {
            field: path.to_string(),
            found: other.type_name(),
        }),
    }
}

fn binary(
    op: BinaryOp,
    left: &Expr,
    right: &Expr,
    ctx: &EvaluationContext,
) -> Result<Decimal, FormulaEvaluationError> {
    // And/Or short-circuit before touching the right-hand side.
    match op {
        BinaryOp::And => Ok(truth(
            !eval(left, ctx)?.is_zero() && !eval(right, ctx)?.is_zero(),
        )),
        BinaryOp::Or => Ok(truth(
            !eval(left, ctx)?.is_zero() || !eval(right, ctx)?.is_zero(),
        )),
        _ => arithmetic(op, eval(left, ctx)?, eval(right, ctx)?),
    }
}

fn arithmetic(op: BinaryOp, l: Decimal, r: Decimal) -> Result<Decimal, FormulaEvaluationError> {
    let overflow = || FormulaEvaluationError::Overflow {
        operation: op.symbol(),
    };

    match op {
        BinaryOp::Add => l.checked_add(r).ok_or_else(overflow),
        BinaryOp::Sub => l.checked_sub(r).ok_or_else(overflow),
        BinaryOp::Mul => l.checked_mul(r).ok_or_else(overflow),
        BinaryOp::Div | BinaryOp::Rem if r.is_zero() => {
            Err(FormulaEvaluationError::DivisionByZero)
        }
        BinaryOp::Div => l.checked_div(r).ok_or_else(overflow),
        BinaryOp::Rem => l.checked_rem(r).ok_or_else(overflow),
        BinaryOp::Pow => power(l, r, "**"),
        BinaryOp::Eq => Ok(truth(l == r)),
        BinaryOp::Ne => Ok(truth(l != r)),
        BinaryOp::Lt => Ok(truth(l < r)),
        BinaryOp::Le => Ok(truth(l <= r)),
        BinaryOp::Gt => Ok(truth(l > r)),
        BinaryOp::Ge => Ok(truth(l >= r)),
        BinaryOp::And => Ok(truth(!l.is_zero() && !r.is_zero())),
        BinaryOp::Or => Ok(truth(!l.is_zero() || !r.is_zero())),
    }
}

fn call(
    function: Function,
    args: &[Expr],
    ctx: &EvaluationContext,
) -> Result<Decimal, FormulaEvaluationError> {
    let values = args
        .iter()
        .map(|a| eval(a, ctx))
        .collect::<Result<Vec<_>, _>>()?;

    // Arity was checked by the parser.
    match function {
        Function::Min => Ok(values.into_iter().fold(Decimal::MAX, Decimal::min)),
        Function::Max => Ok(values.into_iter().fold(Decimal::MIN, Decimal::max)),
        Function::Abs => Ok(values[0].abs()),
        Function::Sqrt => {
            let x = values[0];
            if x.is_sign_negative() && !x.is_zero() {
                return Err(FormulaEvaluationError::InvalidArgument {
                    function: "sqrt",
                    reason: format!("negative input {x}"),
                });
            }
            x.sqrt().ok_or(FormulaEvaluationError::InvalidArgument {
                function: "sqrt",
                reason: format!("cannot take square root of {x}"),
            })
        }
        Function::Pow => power(values[0], values[1], "pow"),
        Function::Round => {
            let dp = match values.get(1) {
                None => 0,
                Some(dp) => decimal_places(*dp)?,
            };
            Ok(values[0].round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero))
        }
    }
}

fn power(
    base: Decimal,
    exponent: Decimal,
    operation: &'static str,
) -> Result<Decimal, FormulaEvaluationError> {
    let overflow = || FormulaEvaluationError::Overflow { operation };

    if base.is_zero() && exponent.is_sign_negative() && !exponent.is_zero() {
        return Err(FormulaEvaluationError::DivisionByZero);
    }
    if !exponent.fract().is_zero() {
        if base.is_sign_negative() {
            return Err(FormulaEvaluationError::InvalidArgument {
                function: "pow",
                reason: format!("negative base {base} with fractional exponent {exponent}"),
            });
        }
        return base.checked_powd(exponent).ok_or_else(overflow);
    }

    let e = exponent.to_i64().ok_or_else(overflow)?;
    if e >= 0 {
        return base.checked_powi(e).ok_or_else(overflow);
    }
    // Negative exponent: 1 / base^|e|. A denominator too large to represent
    // means the result is below the smallest representable step, so it
    // rounds to zero.
    match e.checked_neg().and_then(|n| base.checked_powi(n)) {
        Some(denominator) if !denominator.is_zero() => {
            Decimal::ONE.checked_div(denominator).ok_or_else(overflow)
        }
        None if base.abs() > Decimal::ONE => Ok(Decimal::ZERO),
        _ => Err(overflow()),
    }
}

fn decimal_places(dp: Decimal) -> Result<u32, FormulaEvaluationError> {
    dp.fract()
        .is_zero()
        .then(|| dp.to_u32())
        .flatten()
        .filter(|d| *d <= MAX_ROUND_DP)
        .ok_or(FormulaEvaluationError::InvalidArgument {
            function: "round",
            reason: format!(
                "decimal places must be an integer between 0 and {MAX_ROUND_DP}, got {dp}"
            ),
        })
}

fn truth(b: bool) -> Decimal {
    if b {
        Decimal::ONE
    } else {
        Decimal::ZERO
    }
}
