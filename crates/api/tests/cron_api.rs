//! HTTP-level integration tests for the cron endpoints' bearer gate.

mod common;

use axum::http::StatusCode;
use common::{body_json, build_test_app, get, get_with_bearer, production_config};

// ---------------------------------------------------------------------------
// Production gate
// ---------------------------------------------------------------------------

#[tokio::test]
async fn credits_cron_rejects_missing_bearer_in_production() {
    let app = build_test_app(production_config("cron-secret"), None);
    let response = get(app, "/api/cron/activate-monthly-credits").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let json = body_json(response).await;
    assert_eq!(json["success"], false);
    assert_eq!(json["error"], "Unauthorized");
}

#[tokio::test]
async fn credits_cron_rejects_wrong_bearer_in_production() {
    let app = build_test_app(production_config("cron-secret"), None);
    let response = get_with_bearer(app, "/api/cron/activate-monthly-credits", "wrong").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn prizes_cron_rejects_missing_bearer_in_production() {
    let app = build_test_app(production_config("cron-secret"), None);
    let response = get(app, "/api/cron/distribute-challenge-prizes").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let json = body_json(response).await;
    assert_eq!(json["error"], "Unauthorized");
}

// ---------------------------------------------------------------------------
// Gate pass-through
// ---------------------------------------------------------------------------

#[tokio::test]
async fn correct_bearer_passes_the_gate() {
    // With the gate passed the job runs and fails on the unreachable
    // test database -- anything but 401 proves the gate admitted us.
    let app = build_test_app(production_config("cron-secret"), None);
    let response =
        get_with_bearer(app, "/api/cron/activate-monthly-credits", "cron-secret").await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let json = body_json(response).await;
    assert_eq!(json["success"], false);
    assert_eq!(json["error"], "查询订阅失败");
}

#[tokio::test]
async fn development_mode_bypasses_the_gate() {
    let app = build_test_app(common::test_config(), None);
    let response = get(app, "/api/cron/distribute-challenge-prizes").await;
    // Admitted without any bearer; the job then fails on the
    // unreachable test database.
    assert_ne!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}
