//! Video generation policy routes: parameter validation, allowed-option
//! discovery, and queueing of extension tasks.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use vireo_core::credits::VIDEO_EXTENSION_COST;
use vireo_core::video_params::{
    allowed_aspect_ratios, allowed_durations, allowed_person_generation_options,
    allowed_resolutions, validate_extend_request, validate_video_parameters, AspectRatio,
    GenerationMode, PersonGeneration, ValidationCode, ValidationResult, VideoDuration,
    VideoGenerationParams, VideoResolution, VideoStatus,
};
use vireo_db::models::credit::{CreditTransactionType, NewCreditTransaction, RelatedEntityType};
use vireo_db::models::video::NewExtensionTask;
use vireo_db::repositories::{CreditRepo, VideoRepo};

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// Video routes mounted at `/video`.
///
/// ```text
/// POST /validate -> validate_parameters
/// GET  /options  -> generation_options
/// POST /extend   -> extend_video
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/validate", post(validate_parameters))
        .route("/options", get(generation_options))
        .route("/extend", post(extend_video))
}

/* --------------------------------------------------------------------------
POST /validate
-------------------------------------------------------------------------- */

/// Run the parameter validator and return the full violation list.
async fn validate_parameters(
    Json(params): Json<VideoGenerationParams>,
) -> Json<DataResponse<ValidationResult>> {
    Json(DataResponse {
        data: validate_video_parameters(&params),
    })
}

/* --------------------------------------------------------------------------
GET /options
-------------------------------------------------------------------------- */

#[derive(Debug, Deserialize)]
struct OptionsQuery {
    mode: GenerationMode,
    region: Option<String>,
}

/// Allowed parameter options for a mode, for the frontend pickers.
#[derive(Debug, Serialize)]
struct GenerationOptions {
    aspect_ratios: Vec<AspectRatio>,
    resolutions: Vec<VideoResolution>,
    durations: Vec<u32>,
    person_generation: Vec<PersonGeneration>,
}

async fn generation_options(
    Query(query): Query<OptionsQuery>,
) -> Json<DataResponse<GenerationOptions>> {
    let options = GenerationOptions {
        aspect_ratios: allowed_aspect_ratios(query.mode).to_vec(),
        resolutions: allowed_resolutions(query.mode).to_vec(),
        durations: allowed_durations(query.mode)
            .iter()
            .map(|d| d.as_secs())
            .collect(),
        person_generation: allowed_person_generation_options(query.mode, query.region.as_deref()),
    };
    Json(DataResponse { data: options })
}

/* --------------------------------------------------------------------------
POST /extend
-------------------------------------------------------------------------- */

#[derive(Debug, Deserialize)]
struct ExtendVideoRequest {
    source_video_id: Option<String>,
    prompt: Option<String>,
    person_generation: Option<String>,
}

/// `{success: false, error: {code, message}}` error body used by the
/// extension endpoint.
fn extend_error(status: StatusCode, code: &str, message: &str) -> Response {
    (
        status,
        Json(json!({
            "success": false,
            "error": { "code": code, "message": message },
        })),
    )
        .into_response()
}

/// Queue an extension of a completed 720p clip.
///
/// Validates the request shape, then the source clip's eligibility,
/// then charges the flat extension cost and leaves a pending task row
/// for the generation pipeline.
async fn extend_video(
    State(state): State<AppState>,
    user: AuthUser,
    Json(body): Json<ExtendVideoRequest>,
) -> AppResult<Response> {
    // Request shape first; report the first violation.
    let shape_errors = validate_extend_request(
        body.source_video_id.as_deref(),
        body.prompt.as_deref(),
        body.person_generation.as_deref(),
    );
    if let Some(first) = shape_errors.first() {
        return Ok(extend_error(
            StatusCode::BAD_REQUEST,
            first.code.as_str(),
            &first.message,
        ));
    }

    let prompt = body.prompt.as_deref().unwrap_or_default().trim().to_string();
    let person_generation = body
        .person_generation
        .as_deref()
        .and_then(PersonGeneration::parse);

    // Source lookup. A malformed id cannot reference anything we own.
    let not_found = || {
        extend_error(
            StatusCode::NOT_FOUND,
            ValidationCode::VideoNotFound.as_str(),
            "源视频不存在或无权访问",
        )
    };
    let raw_id = body.source_video_id.as_deref().unwrap_or_default().trim();
    let Ok(video_id) = Uuid::parse_str(raw_id) else {
        return Ok(not_found());
    };
    let Some(video) = VideoRepo::find_for_user(&state.pool, video_id, user.user_id).await? else {
        return Ok(not_found());
    };

    // Eligibility: only completed clips with a provider media URI and a
    // recognized resolution can be extended.
    let ineligible = || {
        extend_error(
            StatusCode::BAD_REQUEST,
            ValidationCode::ExtensionNotSupported.as_str(),
            "该视频当前不支持延长",
        )
    };
    let Some(resolution) = video.video_resolution() else {
        return Ok(ineligible());
    };
    if video.video_status() != Some(VideoStatus::Completed) || video.media_uri.is_none() {
        return Ok(ineligible());
    }

    // Parameter policy (720p-only, total-duration cap).
    let params = VideoGenerationParams {
        generation_mode: GenerationMode::ExtendVideo,
        aspect_ratio: match video.aspect_ratio.as_str() {
            "9:16" => AspectRatio::Portrait,
            _ => AspectRatio::Landscape,
        },
        resolution,
        duration: VideoDuration::Secs8,
        person_generation,
        source_video_duration: Some(video.duration_seconds.max(0) as u32),
        user_region: None,
    };
    let validation = validate_video_parameters(&params);
    if let Some(first) = validation.errors.first() {
        return Ok(extend_error(
            StatusCode::BAD_REQUEST,
            first.code.as_str(),
            &first.message,
        ));
    }

    // Charge the flat extension cost up front.
    let cost = i64::from(VIDEO_EXTENSION_COST);
    let available = CreditRepo::available_credits(&state.pool, user.user_id).await?;
    if available < cost {
        return Ok(extend_error(
            StatusCode::PAYMENT_REQUIRED,
            "INSUFFICIENT_CREDITS",
            &format!("视频延长需要{cost}积分，当前可用{available}积分"),
        ));
    }

    CreditRepo::append(
        &state.pool,
        &NewCreditTransaction {
            user_id: user.user_id,
            transaction_type: CreditTransactionType::VideoExtension,
            amount: -cost,
            expires_at: None,
            related_entity_id: Some(video.id),
            related_entity_type: Some(RelatedEntityType::Generation),
            description: format!("视频延长消费 ({cost}积分) / Video extension ({cost} credits)"),
        },
    )
    .await?;

    let task = VideoRepo::insert_extension_task(
        &state.pool,
        &NewExtensionTask {
            user_id: user.user_id,
            source_video_id: video.id,
            prompt,
            aspect_ratio: video.aspect_ratio.clone(),
            duration_seconds: VideoDuration::Secs8.as_secs() as i32,
            credit_cost: VIDEO_EXTENSION_COST as i32,
        },
    )
    .await;

    let task = match task {
        Ok(task) => task,
        Err(e) => {
            // The debit already landed; put the credits back before
            // surfacing the failure.
            tracing::error!(error = %e, user_id = %user.user_id, "Extension task insert failed");
            let refund = CreditRepo::append(
                &state.pool,
                &NewCreditTransaction {
                    user_id: user.user_id,
                    transaction_type: CreditTransactionType::VideoRefund,
                    amount: cost,
                    expires_at: None,
                    related_entity_id: Some(video.id),
                    related_entity_type: Some(RelatedEntityType::Generation),
                    description: format!(
                        "视频延长失败退款 ({cost}积分) / Video extension refund ({cost} credits)"
                    ),
                },
            )
            .await;
            if let Err(refund_err) = refund {
                tracing::error!(error = %refund_err, user_id = %user.user_id, "Extension refund failed");
            }
            return Err(e.into());
        }
    };

    tracing::info!(task_id = %task.id, user_id = %user.user_id, "Extension task queued");
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "data": {
                "task_id": task.id,
                "status": task.status,
                "source_video_id": video.id,
                "credit_cost": VIDEO_EXTENSION_COST,
                "message": "视频延长任务已创建，将延长7秒",
            },
        })),
    )
        .into_response())
}
