use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use crate::domain::{Decision, Evaluation};

/// Metrics registry for the application.
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    /// Total evaluations that produced a decision
    pub decisions_total: AtomicU64,

    /// Decisions by outcome
    pub decisions_allow: AtomicU64,
    pub decisions_flag: AtomicU64,
    pub decisions_block: AtomicU64,

    /// Evaluations that failed
    pub evaluation_errors: AtomicU64,

    /// Decision latency buckets (microseconds)
    pub latency_under_1ms: AtomicU64,
    pub latency_1_5ms: AtomicU64,
    pub latency_5_10ms: AtomicU64,
    pub latency_10_50ms: AtomicU64,
    pub latency_50_100ms: AtomicU64,
    pub latency_over_100ms: AtomicU64,

    /// Rule evaluation counts
    pub rules_evaluated_total: AtomicU64,
    pub rules_matched_total: AtomicU64,

    /// Policy installs (reloads and admin updates)
    pub policy_reloads_total: AtomicU64,
    pub policy_reload_errors: AtomicU64,
}

/// Decision counts keyed by uppercase outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecisionCounts {
    #[serde(rename = "BLOCK")]
    pub block: u64,
    #[serde(rename = "FLAG")]
    pub flag: u64,
    #[serde(rename = "ALLOW")]
    pub allow: u64,
}

/// Live processing statistics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Stats {
    pub total_processed: u64,
    pub decisions: DecisionCounts,
}

impl MetricsRegistry {
    /// Create a new metrics registry.
    pub fn new() -> Self {
        MetricsRegistry::default()
    }

    /// Record a decision outcome.
    pub fn record_decision(&self, decision: Decision) {
        self.decisions_total.fetch_add(1, Ordering::Relaxed);

        let counter = match decision {
            Decision::Allow => &self.decisions_allow,
            Decision::Flag => &self.decisions_flag,
            Decision::Block => &self.decisions_block,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a completed evaluation: its decision and per-rule counts.
    pub fn record_evaluation(&self, evaluation: &Evaluation) {
        self.record_decision(evaluation.decision);
        self.rules_evaluated_total
            .fetch_add(evaluation.trace.len() as u64, Ordering::Relaxed);
        self.rules_matched_total
            .fetch_add(evaluation.match_count() as u64, Ordering::Relaxed);
    }

    /// Record a failed evaluation.
    pub fn record_evaluation_error(&self) {
        self.evaluation_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Record decision latency.
    pub fn record_latency(&self, start: Instant) {
        let micros = start.elapsed().as_micros() as u64;

        let bucket = if micros < 1000 {
            &self.latency_under_1ms
        } else if micros < 5000 {
            &self.latency_1_5ms
        } else if micros < 10000 {
            &self.latency_5_10ms
        } else if micros < 50000 {
            &self.latency_10_50ms
        } else if micros < 100000 {
            &self.latency_50_100ms
        } else {
            &self.latency_over_100ms
        };
        bucket.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a policy install attempt.
    pub fn record_policy_reload(&self, success: bool) {
        self.policy_reloads_total.fetch_add(1, Ordering::Relaxed);
        if !success {
            self.policy_reload_errors.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Snapshot of decision counts.
    pub fn stats(&self) -> Stats {
        Stats {
            total_processed: self.decisions_total.load(Ordering::Relaxed),
            decisions: DecisionCounts {
                block: self.decisions_block.load(Ordering::Relaxed),
                flag: self.decisions_flag.load(Ordering::Relaxed),
                allow: self.decisions_allow.load(Ordering::Relaxed),
            },
        }
    }

    /// Export metrics in Prometheus format.
    pub fn to_prometheus(&self) -> String {
        // Buckets are cumulative in the exposition format
        let buckets = [
            &self.latency_under_1ms,
            &self.latency_1_5ms,
            &self.latency_5_10ms,
            &self.latency_10_50ms,
            &self.latency_50_100ms,
            &self.latency_over_100ms,
        ];
        let mut cumulative = [0u64; 6];
        let mut running = 0;
        for (slot, bucket) in cumulative.iter_mut().zip(buckets) {
            running += bucket.load(Ordering::Relaxed);
            *slot = running;
        }

        format!(
            r#"# HELP enforcr_decisions_total Total number of decisions
# TYPE enforcr_decisions_total counter
enforcr_decisions_total {}

# HELP enforcr_decisions Decisions by outcome
# TYPE enforcr_decisions counter
enforcr_decisions{{outcome="allow"}} {}
enforcr_decisions{{outcome="flag"}} {}
enforcr_decisions{{outcome="block"}} {}

# HELP enforcr_evaluation_errors_total Evaluations that failed
# TYPE enforcr_evaluation_errors_total counter
enforcr_evaluation_errors_total {}

# HELP enforcr_decision_latency_bucket Decision latency histogram
# TYPE enforcr_decision_latency_bucket counter
enforcr_decision_latency_bucket{{le="0.001"}} {}
enforcr_decision_latency_bucket{{le="0.005"}} {}
enforcr_decision_latency_bucket{{le="0.01"}} {}
enforcr_decision_latency_bucket{{le="0.05"}} {}
enforcr_decision_latency_bucket{{le="0.1"}} {}
enforcr_decision_latency_bucket{{le="+Inf"}} {}

# HELP enforcr_rules_evaluated_total Total rule evaluations
# TYPE enforcr_rules_evaluated_total counter
enforcr_rules_evaluated_total {}

# HELP enforcr_rules_matched_total Total rule matches
# TYPE enforcr_rules_matched_total counter
enforcr_rules_matched_total {}

# HELP enforcr_policy_reloads_total Policy install attempts
# TYPE enforcr_policy_reloads_total counter
enforcr_policy_reloads_total {}

# HELP enforcr_policy_reload_errors_total Policy install failures
# TYPE enforcr_policy_reload_errors_total counter
enforcr_policy_reload_errors_total {}
"#,
            self.decisions_total.load(Ordering::Relaxed),
            self.decisions_allow.load(Ordering::Relaxed),
            self.decisions_flag.load(Ordering::Relaxed),
            self.decisions_block.load(Ordering::Relaxed),
            self.evaluation_errors.load(Ordering::Relaxed),
            cumulative[0],
            cumulative[1],
            cumulative[2],
            cumulative[3],
            cumulative[4],
            cumulative[5],
            self.rules_evaluated_total.load(Ordering::Relaxed),
            self.rules_matched_total.load(Ordering::Relaxed),
            self.policy_reloads_total.load(Ordering::Relaxed),
            self.policy_reload_errors.load(Ordering::Relaxed),
        )
    }
}

/// Guard for timing operations.
pub struct TimingGuard<'a> {
    registry: &'a MetricsRegistry,
    start: Instant,
}

impl<'a> TimingGuard<'a> {
    pub fn new(registry: &'a MetricsRegistry) -> Self {
        TimingGuard {
            registry,
            start: Instant::now(),
        }
    }
}

impl<'a> Drop for TimingGuard<'a> {
    fn drop(&mut self) {
        self.registry.record_latency(self.start);
    }
}
