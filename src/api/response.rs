use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::domain::{Decision, Evaluation, TraceEntry};
use crate::rules::RuleSet;

/// Response from the enforcement endpoint.
#[derive(Debug, Serialize)]
pub struct EnforceResponse {
    /// Uppercase decision code (ALLOW, FLAG, BLOCK)
    pub decision: &'static str,

    /// Winning rule, if any rule matched
    pub rule_applied: Option<String>,

    /// Description of the winning rule
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,

    /// Identifier correlating this decision with logs
    pub trace_id: String,

    /// When the decision was made
    pub timestamp: DateTime<Utc>,

    /// Policy version used for this decision
    pub policy_version: String,

    /// Per-rule outcomes
    pub trace: Vec<TraceEntry>,
}

impl EnforceResponse {
    /// Build the response for a transaction id from an evaluation.
    pub fn new(tx_id: &str, ruleset: &RuleSet, evaluation: Evaluation) -> Self {
        let explanation = evaluation
            .rule
            .as_deref()
            .and_then(|name| ruleset.get(name))
            .and_then(|rule| rule.description.clone());

        EnforceResponse {
            decision: evaluation.decision.code(),
            rule_applied: evaluation.rule,
            explanation,
            trace_id: format!("trace_{}_{}", tx_id, Uuid::new_v4().simple()),
            timestamp: Utc::now(),
            policy_version: ruleset.policy_version.clone(),
            trace: evaluation.trace,
        }
    }
}

/// Response from the generic evaluation endpoint.
#[derive(Debug, Serialize)]
pub struct EvaluateResponse {
    pub decision: Decision,
    pub rule: Option<String>,
    pub matched_rules: Vec<String>,
    pub trace: Vec<TraceEntry>,
    pub policy_version: String,
}

impl EvaluateResponse {
    pub fn new(evaluation: Evaluation, policy_version: String) -> Self {
        EvaluateResponse {
            decision: evaluation.decision,
            rule: evaluation.rule,
            matched_rules: evaluation.matched_rules,
            trace: evaluation.trace,
            policy_version,
        }
    }
}

/// Response after a policy update.
#[derive(Debug, Serialize)]
pub struct PolicyUpdateResponse {
    pub status: String,
    pub rule_count: usize,
    pub policy_version: String,
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub policy_version: String,
    pub uptime_secs: u64,
}

/// Readiness check response.
#[derive(Debug, Serialize)]
pub struct ReadyResponse {
    pub ready: bool,
    pub policy_version: String,
    pub rules: usize,
}

/// Error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, code: impl Into<String>) -> Self {
        ErrorResponse {
            error: error.into(),
            code: code.into(),
        }
    }

    pub fn invalid_policy(message: impl Into<String>) -> Self {
        ErrorResponse::new(message, "INVALID_POLICY")
    }

    pub fn evaluation_failed(message: impl Into<String>) -> Self {
        ErrorResponse::new(message, "EVALUATION_FAILED")
    }
}
