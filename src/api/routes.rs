use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::domain::{Evaluation, Transaction};
use crate::engine::{self, PolicyEngine};
use crate::observability::{MetricsRegistry, TimingGuard};
use crate::policy::PolicyLoader;
use crate::rules::{EvalError, RuleSet};

use super::request::EnforceRequest;
use super::response::{
    EnforceResponse, ErrorResponse, EvaluateResponse, HealthResponse, PolicyUpdateResponse,
    ReadyResponse,
};

/// Shared application state.
pub struct AppState {
    /// Holds the active rule set
    pub engine: Arc<PolicyEngine>,

    /// Counters served by /stats and /metrics
    pub metrics: Arc<MetricsRegistry>,

    /// Compiles policies submitted through the admin endpoint
    pub loader: PolicyLoader,

    /// Application start time
    pub start_time: Instant,

    /// Application version
    pub version: String,

    /// Decisions slower than this are logged
    pub latency_budget: Duration,
}

/// Create the application router.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/enforce", post(handle_enforce))
        .route("/v1/evaluate", post(handle_evaluate))
        .route("/admin/policy", post(handle_update_policy))
        .route("/admin/update_policy", post(handle_update_policy))
        .route("/health", get(handle_health))
        .route("/ready", get(handle_ready))
        .route("/stats", get(handle_stats))
        .route("/metrics", get(handle_metrics))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Evaluate against one snapshot of the active rule set, recording metrics.
fn run_evaluation(
    state: &AppState,
    tx: &Transaction,
) -> Result<(Arc<RuleSet>, Evaluation), EvalError> {
    let start = Instant::now();
    let _timer = TimingGuard::new(&state.metrics);

    let ruleset = state.engine.snapshot();
    let result = engine::evaluate(&ruleset, tx);

    match &result {
        Ok(evaluation) => state.metrics.record_evaluation(evaluation),
        Err(e) => {
            state.metrics.record_evaluation_error();
            warn!(rule = e.rule(), error = %e, "Evaluation failed");
        }
    }

    let elapsed = start.elapsed();
    if elapsed > state.latency_budget {
        warn!(
            latency_ms = elapsed.as_millis() as u64,
            budget_ms = state.latency_budget.as_millis() as u64,
            "Decision latency exceeded budget"
        );
    }

    result.map(|evaluation| (ruleset, evaluation))
}

fn evaluation_failed(e: EvalError) -> Response {
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(ErrorResponse::evaluation_failed(e.to_string())),
    )
        .into_response()
}

/// Handle enforcement requests for typed transfers.
async fn handle_enforce(
    State(state): State<Arc<AppState>>,
    Json(req): Json<EnforceRequest>,
) -> Response {
    let tx = req.to_transaction();

    match run_evaluation(&state, &tx) {
        Ok((ruleset, evaluation)) => {
            info!(
                tx_id = %req.id,
                decision = %evaluation.decision,
                rule = evaluation.rule.as_deref().unwrap_or("-"),
                policy_version = %ruleset.policy_version,
                "Decision completed"
            );

            (
                StatusCode::OK,
                Json(EnforceResponse::new(&req.id, &ruleset, evaluation)),
            )
                .into_response()
        }
        Err(e) => evaluation_failed(e),
    }
}

/// Handle evaluation of arbitrary transaction records.
async fn handle_evaluate(
    State(state): State<Arc<AppState>>,
    Json(body): Json<Value>,
) -> Response {
    let tx = Transaction::new(body);

    match run_evaluation(&state, &tx) {
        Ok((ruleset, evaluation)) => (
            StatusCode::OK,
            Json(EvaluateResponse::new(
                evaluation,
                ruleset.policy_version.clone(),
            )),
        )
            .into_response(),
        Err(e) => evaluation_failed(e),
    }
}

/// Replace the active policy.
///
/// The request body is the raw YAML (or JSON) policy document, either a bare
/// rule list or `{policy_version, rules}`; there is no query parameter.
/// `/admin/update_policy` accepts the same shape.
async fn handle_update_policy(State(state): State<Arc<AppState>>, body: String) -> Response {
    match state.loader.compile_text(&body) {
        Ok(ruleset) => {
            let rule_count = ruleset.len();
            let policy_version = ruleset.policy_version.clone();

            state.engine.install(ruleset);
            state.metrics.record_policy_reload(true);

            (
                StatusCode::OK,
                Json(PolicyUpdateResponse {
                    status: "Policy updated successfully".to_string(),
                    rule_count,
                    policy_version,
                }),
            )
                .into_response()
        }
        Err(e) => {
            state.metrics.record_policy_reload(false);
            warn!(error = %e, "Rejected policy update");

            (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse::invalid_policy(e.to_string())),
            )
                .into_response()
        }
    }
}

/// Health check endpoint.
async fn handle_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "active".to_string(),
        version: state.version.clone(),
        policy_version: state.engine.policy_version(),
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}

/// Readiness check endpoint.
async fn handle_ready(State(state): State<Arc<AppState>>) -> Response {
    let ruleset = state.engine.snapshot();

    if ruleset.is_empty() {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ErrorResponse::new("No rules loaded", "NOT_READY")),
        )
            .into_response();
    }

    (
        StatusCode::OK,
        Json(ReadyResponse {
            ready: true,
            policy_version: ruleset.policy_version.clone(),
            rules: ruleset.len(),
        }),
    )
        .into_response()
}

/// Live decision counts.
async fn handle_stats(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.metrics.stats())
}

/// Metrics endpoint (Prometheus format).
async fn handle_metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let ruleset = state.engine.snapshot();

    let metrics = format!(
        r#"{}
# HELP enforcr_uptime_seconds Application uptime in seconds
# TYPE enforcr_uptime_seconds counter
enforcr_uptime_seconds {}

# HELP enforcr_rules Number of rules in the active policy
# TYPE enforcr_rules gauge
enforcr_rules {}
"#,
        state.metrics.to_prometheus(),
        state.start_time.elapsed().as_secs(),
        ruleset.len(),
    );

    (
        StatusCode::OK,
        [(
            axum::http::header::CONTENT_TYPE,
            "text/plain; charset=utf-8",
        )],
        metrics,
    )
}
