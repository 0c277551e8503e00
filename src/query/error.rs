use thiserror::Error;

/// Reasons an expression can not be compiled.
///
/// The `Display` output is meant to be shown inline next to the input that
/// produced it, so messages name the offending operand, operator or value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Both connectives appear in one expression
    #[error("Expression cannot mix AND and OR")]
    MixedConnectives,

    /// A connective with nothing on one side (`ns=foo AND`)
    #[error("Missing expression next to '{0}'")]
    MissingOperand(&'static str),

    /// Several words and no operator between them
    #[error("No valid operator found in expression [{0}]")]
    NoOperator(String),

    /// Left-hand side of a binary expression is not a known field
    #[error("Invalid operand [{0}]")]
    UnknownOperand(String),

    /// Single word that is not a known flag
    #[error("Invalid node or edge operand [{0}]")]
    UnknownFlag(String),

    /// Operator with no field in front of it
    #[error("Missing operand before operator [{0}]")]
    MissingField(String),

    /// Operator with no value after it
    #[error("Missing value for operand [{0}]")]
    MissingValue(String),

    /// Leading `!` on a comparison (`!label:region = east`)
    #[error("Invalid expression [{0}]. Leading negation is only valid for flags and label existence, negate the operator instead")]
    NegatedComparison(String),

    /// Value that contains operator symbols
    #[error("Invalid value [{0}]")]
    InvalidValue(String),

    #[error("Invalid node type [{0}]. Expected app | service | unknown | workload")]
    InvalidNodeKind(String),

    /// Operator not applicable to the field's value type
    #[error("Invalid operator [{op}] for {kind} condition")]
    OperatorMismatch { op: String, kind: &'static str },

    #[error("Invalid value [{0}]. Expected a numeric value (use '.' for decimals)")]
    NotNumeric(String),

    #[error("Invalid rank range [{0}]. Expected a number between 1..100")]
    InvalidRank(String),

    /// Node criteria combined with edge criteria
    #[error("Invalid expression. Cannot mix node and edge criteria")]
    TargetMismatch,

    #[error("Can not use 'AND' with 'name' operand")]
    NameWithAnd,

    #[error("Can not use 'OR' with negated 'name' operand")]
    NameWithNegatedOr,
}
