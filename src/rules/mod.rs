pub mod compare;
pub mod compiler;
pub mod error;
pub mod node;

pub use compiler::{compile_ruleset, RuleCompiler, DEFAULT_MAX_DEPTH};
pub use error::{CompileError, EvalError, TypeMismatch};
pub use node::{Composite, Condition, Mode, Node, Operator};

use crate::domain::{Decision, Transaction};

/// A compiled policy rule.
#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    /// Unique name within its rule set
    pub name: String,

    /// Condition tree deciding whether the rule matches
    pub root: Node,

    /// Decision contributed when the rule matches
    pub action: Decision,

    /// Higher priorities are evaluated first and win ties in severity
    pub priority: i64,

    /// Human-readable explanation of the rule
    pub description: Option<String>,
}

impl Rule {
    pub fn new(name: impl Into<String>, root: Node, action: Decision, priority: i64) -> Self {
        Rule {
            name: name.into(),
            root,
            action,
            priority,
            description: None,
        }
    }

    /// Resolution key: severity rank first, then priority.
    #[inline]
    pub fn rank(&self) -> (u8, i64) {
        (self.action.severity(), self.priority)
    }

    /// Evaluate the rule's condition tree against a transaction.
    pub fn matches(&self, tx: &Transaction) -> Result<bool, EvalError> {
        self.root
            .evaluate(tx)
            .map_err(|source| EvalError::TypeMismatch {
                rule: self.name.clone(),
                source,
            })
    }
}

/// Immutable collection of compiled rules ready for evaluation.
///
/// Rules are kept in evaluation order: priority descending, then name
/// ascending.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleSet {
    rules: Vec<Rule>,
    pub policy_version: String,
}

impl RuleSet {
    /// Build a rule set, sorting rules into evaluation order.
    ///
    /// Names are expected to be unique; [`RuleCompiler`] enforces this.
    pub fn new(mut rules: Vec<Rule>) -> Self {
        rules.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then_with(|| a.name.cmp(&b.name))
        });

        RuleSet {
            rules,
            policy_version: "0.0.0".to_string(),
        }
    }

    /// Create an empty rule set.
    pub fn empty() -> Self {
        RuleSet::new(Vec::new())
    }

    /// Tag the rule set with the version of the policy it came from.
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.policy_version = version.into();
        self
    }

    /// Rules in evaluation order.
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Look up a rule by name.
    pub fn get(&self, name: &str) -> Option<&Rule> {
        self.rules.iter().find(|r| r.name == name)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
