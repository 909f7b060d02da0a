//! Cron endpoints triggering the batch jobs.
//!
//! Both endpoints accept GET and POST identically (the scheduler has
//! used both over time) and are gated by a shared bearer secret. The
//! gate is enforced only in production with a configured secret, so
//! local runs can trigger the jobs directly.

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde_json::json;

use vireo_worker::jobs::{challenge_prizes, monthly_credits};
use vireo_worker::store::PgStore;

use crate::config::Environment;
use crate::state::AppState;

/// Cron routes mounted at `/api/cron`.
///
/// ```text
/// GET|POST /activate-monthly-credits    -> activate_monthly_credits
/// GET|POST /distribute-challenge-prizes -> distribute_challenge_prizes
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/activate-monthly-credits",
            get(activate_monthly_credits).post(activate_monthly_credits),
        )
        .route(
            "/distribute-challenge-prizes",
            get(distribute_challenge_prizes).post(distribute_challenge_prizes),
        )
}

/// Check the shared-secret bearer gate.
///
/// Enforced only in production with a configured `CRON_SECRET`;
/// development and secretless deployments pass unconditionally.
fn authorized(state: &AppState, headers: &HeaderMap) -> bool {
    match (state.config.environment, state.config.cron_secret.as_deref()) {
        (Environment::Production, Some(secret)) => headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(|header| header == format!("Bearer {secret}"))
            .unwrap_or(false),
        _ => true,
    }
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "success": false, "error": "Unauthorized" })),
    )
        .into_response()
}

/// GET|POST /activate-monthly-credits -- activate banked subscription
/// months whose current credits are about to lapse.
async fn activate_monthly_credits(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Response {
    if !authorized(&state, &headers) {
        tracing::warn!("Cron secret mismatch on activate-monthly-credits");
        return unauthorized();
    }

    let store = PgStore::new(state.pool.clone());
    match monthly_credits::run(&store, &store, &state.credit_schedule, Utc::now()).await {
        Ok(summary) if summary.results.is_empty() => Json(json!({
            "success": true,
            "message": "没有需要激活的订阅",
            "activated": 0,
        }))
        .into_response(),
        Ok(summary) => Json(json!({
            "success": true,
            "message": format!(
                "激活完成：激活={}, 跳过={}, 错误={}",
                summary.activated, summary.skipped, summary.errors
            ),
            "activated": summary.activated,
            "skipped": summary.skipped,
            "errors": summary.errors,
            "results": summary.results,
        }))
        .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Subscription candidate fetch failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "success": false,
                    "error": "查询订阅失败",
                    "message": e.to_string(),
                })),
            )
                .into_response()
        }
    }
}

/// GET|POST /distribute-challenge-prizes -- rank submissions and grant
/// prizes for challenges whose voting has closed.
async fn distribute_challenge_prizes(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Response {
    if !authorized(&state, &headers) {
        tracing::warn!("Cron secret mismatch on distribute-challenge-prizes");
        return unauthorized();
    }

    let store = PgStore::new(state.pool.clone());
    match challenge_prizes::run(&store, &store, Utc::now()).await {
        Ok(summary) if summary.total == 0 => Json(json!({
            "success": true,
            "message": "No challenges to process",
            "processed": 0,
        }))
        .into_response(),
        Ok(summary) => Json(json!({
            "success": true,
            "message": format!("Processed {} challenges", summary.processed),
            "processed": summary.processed,
            "total": summary.total,
            "results": summary.results,
        }))
        .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Challenge fetch failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "success": false,
                    "error": e.to_string(),
                })),
            )
                .into_response()
        }
    }
}
