//! Formula parse and runtime errors.

/// Rejected formula source. `offset` is a byte offset into the expression.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message} at offset {offset}")]
pub struct FormulaParseError {
    pub offset: usize,
    pub message: String,
}

impl FormulaParseError {
    pub(crate) fn new(offset: usize, message: impl Into<String>) -> Self {
        Self {
            offset,
            message: message.into(),
        }
    }
}

/// Numeric or resolution failure while interpreting a parsed formula.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormulaEvaluationError {
    #[error("division by zero")]
    DivisionByZero,

    #[error("numeric overflow in `{operation}`")]
    Overflow { operation: &'static str },

    #[error("field `{field}` is absent")]
    UnresolvedField { field: String },

    #[error("field `{field}` is not numeric (found {found})")]
    NonNumericField { field: String, found: &'static str },

    #[error("invalid argument to `{function}`: {reason}")]
    InvalidArgument {
        function: &'static str,
        reason: String,
    },
}

/// Either failure, for the one-shot [`super::evaluate`] helper.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormulaError {
    #[error(transparent)]
    Parse(#[from] FormulaParseError),

    #[error(transparent)]
    Evaluation(#[from] FormulaEvaluationError),
}
