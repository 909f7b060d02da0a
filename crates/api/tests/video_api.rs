//! HTTP-level integration tests for the `/api/v1/video` endpoints.
//!
//! Uses Axum's `tower::ServiceExt` to send requests directly to the
//! router. These tests cover the validation and policy paths, which
//! complete before any database access.

mod common;

use assert_matches::assert_matches;
use axum::http::StatusCode;
use common::{bearer_token, body_json, build_test_app, get, post_json, post_json_auth, test_config};
use serde_json::json;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// POST /api/v1/video/validate
// ---------------------------------------------------------------------------

#[tokio::test]
async fn validate_accepts_conforming_reference_images_request() {
    let app = build_test_app(test_config(), None);
    let response = post_json(
        app,
        "/api/v1/video/validate",
        json!({
            "generation_mode": "reference-images",
            "aspect_ratio": "16:9",
            "resolution": "720p",
            "duration": 8,
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["data"]["valid"], true);
    assert_matches!(json["data"]["errors"].as_array(), Some(errors) if errors.is_empty());
}

#[tokio::test]
async fn validate_accumulates_reference_images_violations_in_rule_order() {
    let app = build_test_app(test_config(), None);
    let response = post_json(
        app,
        "/api/v1/video/validate",
        json!({
            "generation_mode": "reference-images",
            "aspect_ratio": "9:16",
            "resolution": "720p",
            "duration": 6,
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["data"]["valid"], false);
    let errors = json["data"]["errors"].as_array().unwrap();
    assert_eq!(errors.len(), 2);
    assert_eq!(errors[0]["code"], "INVALID_ASPECT_RATIO_FOR_MODE");
    assert_eq!(errors[1]["code"], "INVALID_DURATION_FOR_MODE");
}

#[tokio::test]
async fn validate_reports_extension_over_limit_with_total() {
    let app = build_test_app(test_config(), None);
    let response = post_json(
        app,
        "/api/v1/video/validate",
        json!({
            "generation_mode": "extend-video",
            "aspect_ratio": "16:9",
            "resolution": "720p",
            "duration": 8,
            "source_video_duration": 142,
        }),
    )
    .await;

    let json = body_json(response).await;
    assert_eq!(json["data"]["valid"], false);
    let errors = json["data"]["errors"].as_array().unwrap();
    assert_eq!(errors[0]["code"], "EXTENSION_EXCEEDS_LIMIT");
    assert!(errors[0]["message"].as_str().unwrap().contains("149秒"));
}

#[tokio::test]
async fn validate_rejects_allow_all_in_restricted_region() {
    let app = build_test_app(test_config(), None);
    let response = post_json(
        app,
        "/api/v1/video/validate",
        json!({
            "generation_mode": "text-to-video",
            "aspect_ratio": "16:9",
            "resolution": "1080p",
            "duration": 4,
            "person_generation": "allow_all",
            "user_region": "EU",
        }),
    )
    .await;

    let json = body_json(response).await;
    let errors = json["data"]["errors"].as_array().unwrap();
    assert_eq!(errors[0]["code"], "PERSON_GENERATION_NOT_ALLOWED_IN_REGION");
    assert_eq!(errors[0]["field"], "personGeneration");
}

// ---------------------------------------------------------------------------
// GET /api/v1/video/options
// ---------------------------------------------------------------------------

#[tokio::test]
async fn options_for_reference_images_are_pinned() {
    let app = build_test_app(test_config(), None);
    let response = get(app, "/api/v1/video/options?mode=reference-images&region=US").await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["data"]["aspect_ratios"], json!(["16:9"]));
    assert_eq!(json["data"]["durations"], json!([8]));
    assert_eq!(json["data"]["resolutions"], json!(["720p", "1080p"]));
    // Image-seeded modes only ever offer allow_adult.
    assert_eq!(json["data"]["person_generation"], json!(["allow_adult"]));
}

#[tokio::test]
async fn options_drop_allow_all_in_restricted_region() {
    let app = build_test_app(test_config(), None);
    let response = get(app, "/api/v1/video/options?mode=text-to-video&region=EU").await;

    let json = body_json(response).await;
    assert_eq!(
        json["data"]["person_generation"],
        json!(["allow_adult", "dont_allow"])
    );
}

#[tokio::test]
async fn options_for_extend_video_are_720p_only() {
    let app = build_test_app(test_config(), None);
    let response = get(app, "/api/v1/video/options?mode=extend-video").await;

    let json = body_json(response).await;
    assert_eq!(json["data"]["resolutions"], json!(["720p"]));
    assert_eq!(json["data"]["durations"], json!([4, 6, 8]));
}

// ---------------------------------------------------------------------------
// POST /api/v1/video/extend
// ---------------------------------------------------------------------------

#[tokio::test]
async fn extend_requires_authentication() {
    let app = build_test_app(test_config(), None);
    let response = post_json(
        app,
        "/api/v1/video/extend",
        json!({ "source_video_id": "abc", "prompt": "keep going" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn extend_rejects_missing_source_video_id() {
    let app = build_test_app(test_config(), None);
    let token = bearer_token(Uuid::new_v4());
    let response = post_json_auth(
        app,
        "/api/v1/video/extend",
        &token,
        json!({ "prompt": "keep going" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = body_json(response).await;
    assert_eq!(json["success"], false);
    assert_eq!(json["error"]["code"], "MISSING_SOURCE_VIDEO_ID");
}

#[tokio::test]
async fn extend_rejects_blank_prompt() {
    let app = build_test_app(test_config(), None);
    let token = bearer_token(Uuid::new_v4());
    let response = post_json_auth(
        app,
        "/api/v1/video/extend",
        &token,
        json!({ "source_video_id": Uuid::new_v4().to_string(), "prompt": "   " }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = body_json(response).await;
    assert_eq!(json["error"]["code"], "MISSING_PROMPT");
}

#[tokio::test]
async fn extend_rejects_unknown_person_generation() {
    let app = build_test_app(test_config(), None);
    let token = bearer_token(Uuid::new_v4());
    let response = post_json_auth(
        app,
        "/api/v1/video/extend",
        &token,
        json!({
            "source_video_id": Uuid::new_v4().to_string(),
            "prompt": "keep going",
            "person_generation": "allow_teens",
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = body_json(response).await;
    assert_eq!(json["error"]["code"], "INVALID_PERSON_GENERATION");
}

#[tokio::test]
async fn extend_with_malformed_id_is_not_found() {
    let app = build_test_app(test_config(), None);
    let token = bearer_token(Uuid::new_v4());
    let response = post_json_auth(
        app,
        "/api/v1/video/extend",
        &token,
        json!({ "source_video_id": "not-a-uuid", "prompt": "keep going" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let json = body_json(response).await;
    assert_eq!(json["error"]["code"], "VIDEO_NOT_FOUND");
    assert!(json["error"]["message"].as_str().unwrap().contains("源视频不存在"));
}
