use thiserror::Error;

use super::node::Operator;

/// Errors raised while compiling rule specifications.
///
/// Compilation is all-or-nothing: any of these aborts the whole rule set.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    #[error("rule specification must be a sequence of mappings, found {0}")]
    NotASequence(&'static str),

    #[error("malformed rule {rule}: {reason}")]
    MalformedRule { rule: String, reason: String },

    #[error("rule {rule}: unknown operator {op:?}")]
    UnknownOperator { rule: String, op: String },

    #[error("duplicate rule name: {0}")]
    DuplicateRule(String),

    #[error("rule {rule}: condition nesting exceeds {limit} levels")]
    DepthExceeded { rule: String, limit: usize },
}

impl CompileError {
    pub(crate) fn malformed(rule: impl Into<String>, reason: impl Into<String>) -> Self {
        CompileError::MalformedRule {
            rule: rule.into(),
            reason: reason.into(),
        }
    }
}

/// A comparison whose operands cannot be compared.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("cannot apply {op} to field {field} ({found}) and operand ({operand})")]
pub struct TypeMismatch {
    pub field: String,
    pub op: Operator,
    pub found: &'static str,
    pub operand: &'static str,
}

/// Errors raised while evaluating a transaction.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EvalError {
    #[error("rule {rule}: {source}")]
    TypeMismatch {
        rule: String,
        #[source]
        source: TypeMismatch,
    },
}

impl EvalError {
    /// Name of the rule whose evaluation failed.
    pub fn rule(&self) -> &str {
        match self {
            EvalError::TypeMismatch { rule, .. } => rule,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_error_messages() {
        let err = CompileError::UnknownOperator {
            rule: "r1".to_string(),
            op: "gte".to_string(),
        };
        assert_eq!(err.to_string(), "rule r1: unknown operator \"gte\"");

        let err = CompileError::malformed("r2", "missing action");
        assert_eq!(err.to_string(), "malformed rule r2: missing action");
    }

    #[test]
    fn test_eval_error_message() {
        let err = EvalError::TypeMismatch {
            rule: "flag_high_value_eur".to_string(),
            source: TypeMismatch {
                field: "amount".to_string(),
                op: Operator::Gt,
                found: "string",
                operand: "number",
            },
        };

        assert_eq!(err.rule(), "flag_high_value_eur");
        assert_eq!(
            err.to_string(),
            "rule flag_high_value_eur: cannot apply gt to field amount (string) and operand (number)"
        );
    }
}
