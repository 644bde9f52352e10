use arc_swap::ArcSwap;
use std::sync::Arc;
use tracing::info;

use crate::domain::{Evaluation, Transaction};
use crate::rules::{EvalError, RuleSet};

/// Holds the active rule set and evaluates transactions against it.
///
/// Readers load an `Arc` snapshot without locking. Installing a new rule
/// set is a single atomic swap, so an in-flight evaluation sees either the
/// old set in full or the new one in full.
#[derive(Debug)]
pub struct PolicyEngine {
    active: ArcSwap<RuleSet>,
}

impl PolicyEngine {
    pub fn new(ruleset: RuleSet) -> Self {
        PolicyEngine {
            active: ArcSwap::from_pointee(ruleset),
        }
    }

    /// Current rule set.
    #[inline]
    pub fn snapshot(&self) -> Arc<RuleSet> {
        self.active.load_full()
    }

    /// Version of the active policy.
    pub fn policy_version(&self) -> String {
        self.active.load().policy_version.clone()
    }

    /// Replace the active rule set, returning the previous one.
    pub fn install(&self, ruleset: RuleSet) -> Arc<RuleSet> {
        let rule_count = ruleset.len();
        let version = ruleset.policy_version.clone();
        let previous = self.active.swap(Arc::new(ruleset));

        info!(
            policy_version = %version,
            previous_version = %previous.policy_version,
            rule_count,
            "Installed rule set"
        );

        previous
    }

    /// Evaluate a transaction against the active rule set.
    pub fn evaluate(&self, tx: &Transaction) -> Result<Evaluation, EvalError> {
        let ruleset = self.active.load();
        super::evaluate(&ruleset, tx)
    }
}

impl Default for PolicyEngine {
    fn default() -> Self {
        PolicyEngine::new(RuleSet::empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Decision;
    use crate::rules::{compile_ruleset, CompileError};
    use serde_json::json;
    use std::thread;

    fn block_all() -> RuleSet {
        compile_ruleset(&json!([{"name": "block_all", "action": "block"}]))
            .unwrap()
            .with_version("v-block")
    }

    fn allow_all() -> RuleSet {
        compile_ruleset(&json!([{"name": "allow_all", "action": "allow"}]))
            .unwrap()
            .with_version("v-allow")
    }

    #[test]
    fn test_install_swaps_and_returns_previous() {
        let engine = PolicyEngine::new(allow_all());
        let tx = Transaction::new(json!({}));

        assert_eq!(engine.evaluate(&tx).unwrap().decision, Decision::Allow);

        let previous = engine.install(block_all());
        assert_eq!(previous.policy_version, "v-allow");
        assert_eq!(engine.policy_version(), "v-block");
        assert_eq!(engine.evaluate(&tx).unwrap().decision, Decision::Block);
    }

    #[test]
    fn test_snapshot_survives_install() {
        let engine = PolicyEngine::new(allow_all());
        let snapshot = engine.snapshot();

        engine.install(block_all());

        assert_eq!(snapshot.policy_version, "v-allow");
        assert_eq!(snapshot.rules()[0].name, "allow_all");
    }

    #[test]
    fn test_failed_compile_leaves_active_set() {
        let engine = PolicyEngine::new(block_all());

        let result = compile_ruleset(&json!([
            {"name": "bad", "action": "block", "when": {"field": "a", "op": "near", "value": 1}}
        ]))
        .map(|ruleset| engine.install(ruleset));

        assert!(matches!(result, Err(CompileError::UnknownOperator { .. })));
        assert_eq!(engine.policy_version(), "v-block");
        assert_eq!(engine.snapshot().len(), 1);
    }

    #[test]
    fn test_concurrent_readers_see_whole_sets() {
        let engine = PolicyEngine::new(allow_all());
        let tx = Transaction::new(json!({"amount": 1}));

        thread::scope(|s| {
            for _ in 0..4 {
                s.spawn(|| {
                    for _ in 0..500 {
                        let eval = engine.evaluate(&tx).unwrap();
                        let rule = eval.rule.as_deref().unwrap();
                        match eval.decision {
                            Decision::Allow => assert_eq!(rule, "allow_all"),
                            Decision::Block => assert_eq!(rule, "block_all"),
                            Decision::Flag => panic!("no flag rules installed"),
                        }
                        assert_eq!(eval.trace.len(), 1);
                    }
                });
            }

            s.spawn(|| {
                for i in 0..200 {
                    if i % 2 == 0 {
                        engine.install(block_all());
                    } else {
                        engine.install(allow_all());
                    }
                }
            });
        });
    }

    #[test]
    fn test_default_is_empty() {
        let engine = PolicyEngine::default();
        assert!(engine.snapshot().is_empty());
        assert_eq!(engine.policy_version(), "0.0.0");
    }
}
