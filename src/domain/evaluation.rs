use serde::{Deserialize, Serialize};

use super::Decision;

/// One rule's outcome within an evaluation.
///
/// Provides the audit trail of which rules matched and which did not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceEntry {
    /// The rule that was evaluated
    pub rule: String,

    /// Whether its condition tree matched
    pub result: bool,
}

impl TraceEntry {
    pub fn new(rule: impl Into<String>, result: bool) -> Self {
        TraceEntry {
            rule: rule.into(),
            result,
        }
    }
}

/// Result of evaluating a transaction against a rule set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evaluation {
    /// The resolved decision
    pub decision: Decision,

    /// Name of the winning rule, absent when nothing matched
    pub rule: Option<String>,

    /// Names of all matching rules, in evaluation order
    pub matched_rules: Vec<String>,

    /// Every rule's outcome, in evaluation order
    pub trace: Vec<TraceEntry>,
}

impl Evaluation {
    /// Create the default-open result for a transaction no rule matched.
    pub fn unmatched(trace: Vec<TraceEntry>) -> Self {
        Evaluation {
            decision: Decision::Allow,
            rule: None,
            matched_rules: Vec::new(),
            trace,
        }
    }

    /// Number of rules that matched.
    pub fn match_count(&self) -> usize {
        self.matched_rules.len()
    }
}
