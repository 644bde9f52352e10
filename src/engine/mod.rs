//! Decision resolution.
//!
//! Every rule in the set is evaluated in order and recorded in the trace.
//! Among the matches, the winner is the rule with the highest
//! `(severity, priority)` pair; equal pairs keep the rule evaluated first.
//! When nothing matches the decision is `allow` with no winning rule.

mod store;

pub use store::PolicyEngine;

use tracing::debug;

use crate::domain::{Evaluation, TraceEntry, Transaction};
use crate::rules::{EvalError, Rule, RuleSet};

/// Evaluate a transaction against a rule set.
pub fn evaluate(ruleset: &RuleSet, tx: &Transaction) -> Result<Evaluation, EvalError> {
    let mut trace = Vec::with_capacity(ruleset.len());
    let mut matched: Vec<&Rule> = Vec::new();

    for rule in ruleset.rules() {
        let hit = rule.matches(tx)?;
        debug!(rule = %rule.name, hit, "Rule evaluated");

        trace.push(TraceEntry::new(rule.name.as_str(), hit));
        if hit {
            matched.push(rule);
        }
    }

    let winner = match select_winner(&matched) {
        Some(rule) => rule,
        None => return Ok(Evaluation::unmatched(trace)),
    };

    Ok(Evaluation {
        decision: winner.action,
        rule: Some(winner.name.clone()),
        matched_rules: matched.iter().map(|r| r.name.clone()).collect(),
        trace,
    })
}

/// Pick the matched rule with the highest rank, keeping the earliest on ties.
fn select_winner<'a>(matched: &[&'a Rule]) -> Option<&'a Rule> {
    matched.iter().copied().fold(None, |best, rule| match best {
        Some(current) if rule.rank() <= current.rank() => Some(current),
        _ => Some(rule),
    })
}
