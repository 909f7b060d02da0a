//! Subscription plan-change routes.
//!
//! Upgrade and downgrade share one pipeline: parameter validation ->
//! tier-ordering check -> pending-change guard -> proration -> Creem
//! checkout. Every rejection short-circuits with its specific error
//! body; checkout failures pass the provider's status through verbatim.
//! The response bodies are a public contract consumed by the web app --
//! field names and error strings must not drift.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use vireo_core::plan::{
    check_downgrade, check_no_pending, check_upgrade, remaining_seconds, AdjustmentMode,
    BillingCycle, PlanAction, PlanChangeError, PlanTier, SubscriptionSnapshot,
};
use vireo_creem::{CheckoutMetadata, CheckoutRequest, CreemError};
use vireo_db::repositories::SubscriptionRepo;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::state::AppState;

/// Subscription routes mounted at `/subscription`.
///
/// ```text
/// POST /upgrade   -> plan_change (upgrade direction)
/// POST /downgrade -> plan_change (downgrade direction)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/upgrade", post(upgrade))
        .route("/downgrade", post(downgrade))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlanChangeBody {
    target_plan: Option<String>,
    billing_period: Option<String>,
    adjustment_mode: Option<String>,
}

/// Which side of the tier-ordering rule this endpoint enforces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Upgrade,
    Downgrade,
}

impl Direction {
    /// Action recorded in checkout metadata. A first purchase through
    /// the upgrade endpoint still counts as an upgrade for fulfillment.
    fn action(self) -> PlanAction {
        match self {
            Self::Upgrade => PlanAction::Upgrade,
            Self::Downgrade => PlanAction::Downgrade,
        }
    }

    fn failure_label(self) -> &'static str {
        match self {
            Self::Upgrade => "升级失败",
            Self::Downgrade => "降级失败",
        }
    }
}

/// `{success: false, error, message}` rejection body.
fn reject(status: StatusCode, error: &str, message: &str) -> Response {
    (
        status,
        Json(json!({
            "success": false,
            "error": error,
            "message": message,
        })),
    )
        .into_response()
}

async fn upgrade(
    State(state): State<AppState>,
    user: AuthUser,
    Json(body): Json<PlanChangeBody>,
) -> AppResult<Response> {
    plan_change(state, user, body, Direction::Upgrade).await
}

async fn downgrade(
    State(state): State<AppState>,
    user: AuthUser,
    Json(body): Json<PlanChangeBody>,
) -> AppResult<Response> {
    plan_change(state, user, body, Direction::Downgrade).await
}

async fn plan_change(
    state: AppState,
    user: AuthUser,
    body: PlanChangeBody,
    direction: Direction,
) -> AppResult<Response> {
    // -- Parameter validation --------------------------------------------

    let (Some(raw_plan), Some(raw_period)) =
        (body.target_plan.as_deref(), body.billing_period.as_deref())
    else {
        return Ok(reject(
            StatusCode::BAD_REQUEST,
            "参数错误",
            "缺少必需参数: targetPlan 或 billingPeriod",
        ));
    };

    let Some(target) = PlanTier::parse(raw_plan) else {
        return Ok(reject(
            StatusCode::BAD_REQUEST,
            "参数错误",
            "无效的目标计划，必须是: basic, pro, max",
        ));
    };

    let Some(cycle) = BillingCycle::parse(raw_period) else {
        return Ok(reject(
            StatusCode::BAD_REQUEST,
            "参数错误",
            "无效的计费周期，必须是: monthly, yearly",
        ));
    };

    let adjustment_mode = match AdjustmentMode::parse_or_default(body.adjustment_mode.as_deref()) {
        Ok(mode) => mode,
        Err(_) => {
            return Ok(reject(
                StatusCode::BAD_REQUEST,
                "参数错误",
                "无效的调整模式，必须是: immediate, scheduled",
            ));
        }
    };

    let now = Utc::now();

    // -- Current subscription + double-queue guard -----------------------

    let current_row = SubscriptionRepo::find_active(&state.pool, user.user_id).await?;
    let mut snapshot: Option<SubscriptionSnapshot> = None;

    if let Some(row) = &current_row {
        // At most one queued plan change per user: with a pending row,
        // only renewal of the current plan is allowed until it resolves.
        let pending = SubscriptionRepo::find_pending(&state.pool, user.user_id).await?;
        if check_no_pending(pending.is_some()).is_err() {
            return Ok(reject(
                StatusCode::FORBIDDEN,
                "操作受限",
                "您已有待执行的套餐，在当前套餐结束前只能续费现有套餐，不能再次升降级",
            ));
        }

        match row.snapshot() {
            Some(snap) => snapshot = Some(snap),
            None => {
                tracing::error!(
                    subscription_id = %row.id,
                    plan_tier = %row.plan_tier,
                    "Subscription row has unrecognized tier/cycle"
                );
                return Ok(reject(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "服务器内部错误",
                    "订阅数据异常",
                ));
            }
        }
    }

    // Expired rows count as "no subscription" for upgrades but are
    // reported distinctly for downgrades.
    let active = snapshot.clone().filter(|s| s.is_active(now));

    // -- Tier-ordering legality ------------------------------------------

    let legality = match direction {
        Direction::Upgrade => check_upgrade(active.as_ref().map(|s| s.plan_tier), target),
        Direction::Downgrade => check_downgrade(snapshot.as_ref(), target, now),
    };
    if let Err(e) = legality {
        let message = match e {
            PlanChangeError::UpgradeNotHigher { current, target } => {
                format!("当前计划({current})不低于目标计划({target})，请使用降级或续订功能")
            }
            PlanChangeError::DowngradeNotLower { current, target } => {
                format!("当前计划({current})不高于目标计划({target})，无法降级")
            }
            PlanChangeError::NoActiveSubscription => "您没有活跃的订阅，无法降级".to_string(),
            PlanChangeError::SubscriptionExpired => {
                "当前订阅已过期，无法降级，请直接购买新套餐".to_string()
            }
            other => other.to_string(),
        };
        return Ok(reject(
            StatusCode::BAD_REQUEST,
            direction.failure_label(),
            &message,
        ));
    }

    // -- Proration + checkout --------------------------------------------

    let remaining = active
        .as_ref()
        .map(|s| remaining_seconds(s.expires_at, now))
        .unwrap_or(0);
    let action = direction.action();

    let Some(product_id) = state.catalog.lookup(target, cycle) else {
        return Ok(reject(
            StatusCode::INTERNAL_SERVER_ERROR,
            "配置错误",
            "目标计划的产品ID未配置",
        ));
    };
    let Some(checkout) = state.checkout.as_ref() else {
        return Ok(reject(
            StatusCode::INTERNAL_SERVER_ERROR,
            "配置错误",
            "支付服务未配置",
        ));
    };

    let request = CheckoutRequest {
        product_id: product_id.to_string(),
        request_id: CheckoutRequest::plan_change_request_id(action, user.user_id),
        success_url: format!("{}/payment/success", state.config.app_url),
        metadata: CheckoutMetadata::plan_change(
            user.user_id,
            target,
            cycle,
            active.as_ref(),
            action,
            adjustment_mode,
            remaining,
        ),
    };

    let session = match checkout.create_checkout(&request).await {
        Ok(session) => session,
        Err(CreemError::Api { status, body }) => {
            tracing::error!(status, %body, "Creem checkout rejected");
            let status =
                StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            return Ok(reject(status, "创建支付会话失败", "Creem API调用失败"));
        }
        Err(e) => {
            tracing::error!(error = %e, "Checkout request failed");
            return Ok(reject(
                StatusCode::INTERNAL_SERVER_ERROR,
                "服务器内部错误",
                "创建支付会话失败",
            ));
        }
    };

    tracing::info!(
        user_id = %user.user_id,
        action = action.as_str(),
        target = target.as_str(),
        session_id = %session.id,
        "Checkout session created"
    );

    Ok(Json(json!({
        "success": true,
        "checkoutUrl": session.url,
        "sessionId": session.id,
        "currentPlan": active.as_ref().map(|s| s.plan_tier.as_str()).unwrap_or("none"),
        "currentBillingCycle": active.as_ref().map(|s| s.billing_cycle.as_str()).unwrap_or("none"),
        "targetPlan": target.as_str(),
        "billingPeriod": cycle.as_str(),
        "adjustmentMode": adjustment_mode.as_str(),
        "remainingSeconds": remaining,
    }))
    .into_response())
}
