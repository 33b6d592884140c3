use thiserror::Error;

pub type Result<T> = std::result::Result<T, QueryError>;

/// Errors raised while building, rewriting or executing query IR.
///
/// Every error is reported at the call that violates the contract. Nothing is
/// retried and no partial result is returned.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum QueryError {
    /// Declared and inferred static types disagree.
    #[error("Type mismatch in {context}: expected {expected}, got {actual}")]
    TypeMismatch {
        context: String,
        expected: String,
        actual: String,
    },

    /// The searched node is not reachable through the construction spine.
    #[error(
        "The given expression '{full}' does not contain the searched expression '{searched}' \
         in a nested construction with member assignments or a member binding"
    )]
    AccessorNotFound { full: String, searched: String },

    /// A query source reference survived reverse resolution.
    #[error("Unresolved query source [{item_name}]: {reason}")]
    UnresolvedSource { item_name: String, reason: String },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Unsupported: {0}")]
    Unsupported(String),

    #[error("Evaluation error: {0}")]
    Evaluation(String),

    #[error("Arithmetic overflow: {0}")]
    Overflow(String),

    #[error("Division by zero")]
    DivisionByZero,

    #[error("Sequence contains no elements")]
    EmptySequence,
}

impl QueryError {
    pub fn type_mismatch(
        context: impl Into<String>,
        expected: impl std::fmt::Display,
        actual: impl std::fmt::Display,
    ) -> Self {
        QueryError::TypeMismatch {
            context: context.into(),
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }

    pub fn evaluation(msg: impl Into<String>) -> Self {
        QueryError::Evaluation(msg.into())
    }
}
