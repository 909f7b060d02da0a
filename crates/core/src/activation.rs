//! Monthly credit activation rules for yearly-paid subscriptions.
//!
//! A yearly subscription banks its remaining months as
//! `unactivated_months`; a scheduled job tops the user up one month at a
//! time, shortly before the current month's credits lapse. The decision
//! of whether a candidate row activates now lives here so the batch
//! loop in the worker stays a thin orchestration shell.

use serde::Serialize;

use crate::plan::PlanTier;
use crate::types::{DbId, Timestamp};

/* --------------------------------------------------------------------------
Constants
-------------------------------------------------------------------------- */

/// Activate the next month once the current grant has at most this many
/// days left.
pub const ACTIVATION_WINDOW_DAYS: i64 = 3;

/// Validity of a monthly refill, in days.
pub const REFILL_VALIDITY_DAYS: i64 = 30;

/// Skip reason recorded when no prior refill exists for a subscription
/// (typically a first purchase whose initial grant has not landed yet).
pub const SKIP_NO_CREDIT_RECORD: &str = "没有积分记录";

/* --------------------------------------------------------------------------
Decision
-------------------------------------------------------------------------- */

/// Whether a candidate subscription activates its next month now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationDecision {
    Activate,
    Skip { days_remaining: i64 },
}

/// Whole days (rounded up) until `expiry`. Negative once expired.
pub fn days_until_expiry(expiry: Timestamp, now: Timestamp) -> i64 {
    ((expiry - now).num_seconds() as f64 / 86_400.0).ceil() as i64
}

/// Decide from the latest refill's expiry whether to activate now.
///
/// Activation happens once the current grant has at most
/// [`ACTIVATION_WINDOW_DAYS`] days left (including already-lapsed
/// grants); otherwise the row is skipped with the remaining day count.
pub fn activation_decision(latest_expiry: Timestamp, now: Timestamp) -> ActivationDecision {
    let days_remaining = days_until_expiry(latest_expiry, now);
    if days_remaining <= ACTIVATION_WINDOW_DAYS {
        ActivationDecision::Activate
    } else {
        ActivationDecision::Skip { days_remaining }
    }
}

/// Expiry of the next refill: the current grant's expiry plus one
/// month of validity, so back-to-back months never overlap or gap.
pub fn next_refill_expiry(latest_expiry: Timestamp) -> Timestamp {
    latest_expiry + chrono::Duration::days(REFILL_VALIDITY_DAYS)
}

/// Skip reason for a grant that still has `days` days of validity.
pub fn skip_days_reason(days: i64) -> String {
    format!("还有{days}天")
}

/// Ledger description for an automatic monthly refill.
pub fn refill_description(tier: PlanTier, credits: i64) -> String {
    format!(
        "自动激活下一个月积分 - {tier}套餐 ({credits}积分，30天有效) / \
         Auto-activate next month credits - {tier} plan ({credits} credits, valid for 30 days)",
        tier = tier.as_str(),
    )
}

/* --------------------------------------------------------------------------
Per-row results
-------------------------------------------------------------------------- */

/// Outcome class of one processed candidate row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivationStatus {
    Activated,
    Skipped,
    Error,
}

/// Result entry for one candidate subscription.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivationOutcome {
    pub subscription_id: DbId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<DbId>,
    pub status: ActivationStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credits_added: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<Timestamp>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unactivated_months: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ActivationOutcome {
    pub fn activated(
        subscription_id: DbId,
        user_id: DbId,
        credits_added: i64,
        expires_at: Timestamp,
        unactivated_months: i32,
    ) -> Self {
        Self {
            subscription_id,
            user_id: Some(user_id),
            status: ActivationStatus::Activated,
            credits_added: Some(credits_added),
            expires_at: Some(expires_at),
            unactivated_months: Some(unactivated_months),
            reason: None,
            error: None,
        }
    }

    pub fn skipped(subscription_id: DbId, reason: impl Into<String>) -> Self {
        Self {
            subscription_id,
            user_id: None,
            status: ActivationStatus::Skipped,
            credits_added: None,
            expires_at: None,
            unactivated_months: None,
            reason: Some(reason.into()),
            error: None,
        }
    }

    pub fn error(subscription_id: DbId, error: impl Into<String>) -> Self {
        Self {
            subscription_id,
            user_id: None,
            status: ActivationStatus::Error,
            credits_added: None,
            expires_at: None,
            unactivated_months: None,
            reason: None,
            error: Some(error.into()),
        }
    }
}

/// Aggregated run summary. Result order matches candidate fetch order.
#[derive(Debug, Clone, Serialize)]
pub struct ActivationSummary {
    pub activated: usize,
    pub skipped: usize,
    pub errors: usize,
    pub results: Vec<ActivationOutcome>,
}

impl ActivationSummary {
    pub fn from_results(results: Vec<ActivationOutcome>) -> Self {
        let activated = results
            .iter()
            .filter(|r| r.status == ActivationStatus::Activated)
            .count();
        let skipped = results
            .iter()
            .filter(|r| r.status == ActivationStatus::Skipped)
            .count();
        let errors = results
            .iter()
            .filter(|r| r.status == ActivationStatus::Error)
            .count();
        Self {
            activated,
            skipped,
            errors,
            results,
        }
    }
}

/* --------------------------------------------------------------------------
Tests
-------------------------------------------------------------------------- */
