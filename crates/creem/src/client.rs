//! HTTP client for creating Creem checkout sessions.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use vireo_core::plan::{AdjustmentMode, BillingCycle, PlanAction, PlanTier, SubscriptionSnapshot};
use vireo_core::types::DbId;

/// Production API base URL.
const PROD_API_BASE: &str = "https://api.creem.io";

/// Sandbox API base URL, selected automatically for test-mode keys.
const TEST_API_BASE: &str = "https://test-api.creem.io";

/// Test-mode API keys carry this prefix.
const TEST_KEY_PREFIX: &str = "creem_test_";

/* --------------------------------------------------------------------------
Request / response types
-------------------------------------------------------------------------- */

/// Metadata attached to a checkout session.
///
/// The webhook side reconstructs the whole plan-change decision from
/// these fields, so absent values are encoded as the literal string
/// `"none"` and numbers as strings -- the provider round-trips metadata
/// as strings.
#[derive(Debug, Clone, Serialize)]
pub struct CheckoutMetadata {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub user_id: DbId,
    pub plan_tier: &'static str,
    pub billing_cycle: &'static str,
    pub previous_plan: String,
    pub previous_billing_cycle: String,
    pub previous_expires_at: String,
    pub action: &'static str,
    pub adjustment_mode: &'static str,
    pub remaining_seconds: String,
}

impl CheckoutMetadata {
    /// Metadata for a subscription plan change (upgrade or downgrade).
    pub fn plan_change(
        user_id: DbId,
        target: PlanTier,
        cycle: BillingCycle,
        previous: Option<&SubscriptionSnapshot>,
        action: PlanAction,
        adjustment_mode: AdjustmentMode,
        remaining_seconds: i64,
    ) -> Self {
        Self {
            kind: "subscription",
            user_id,
            plan_tier: target.as_str(),
            billing_cycle: cycle.as_str(),
            previous_plan: previous
                .map(|s| s.plan_tier.as_str().to_string())
                .unwrap_or_else(|| "none".to_string()),
            previous_billing_cycle: previous
                .map(|s| s.billing_cycle.as_str().to_string())
                .unwrap_or_else(|| "none".to_string()),
            previous_expires_at: previous
                .map(|s| s.expires_at.to_rfc3339())
                .unwrap_or_else(|| "none".to_string()),
            action: action.as_str(),
            adjustment_mode: adjustment_mode.as_str(),
            remaining_seconds: remaining_seconds.to_string(),
        }
    }
}

/// Input for creating a checkout session.
#[derive(Debug, Clone, Serialize)]
pub struct CheckoutRequest {
    pub product_id: String,
    /// Caller-supplied id used to correlate the eventual webhook.
    pub request_id: String,
    pub success_url: String,
    pub metadata: CheckoutMetadata,
}

impl CheckoutRequest {
    /// Correlation id for a plan-change checkout.
    pub fn plan_change_request_id(action: PlanAction, user_id: DbId) -> String {
        format!("{}_{}_{}", action.as_str(), user_id, uuid::Uuid::new_v4())
    }
}

/// A created checkout session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutSession {
    pub id: String,
    pub url: String,
}

/// Raw provider response; the payment URL has shipped under two
/// different keys across API revisions.
#[derive(Debug, Deserialize)]
struct RawCheckoutResponse {
    id: String,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    checkout_url: Option<String>,
}

impl TryFrom<RawCheckoutResponse> for CheckoutSession {
    type Error = CreemError;

    fn try_from(raw: RawCheckoutResponse) -> Result<Self, Self::Error> {
        let url = raw
            .url
            .or(raw.checkout_url)
            .ok_or_else(|| CreemError::Config("checkout response carried no URL".into()))?;
        Ok(Self { id: raw.id, url })
    }
}

/* --------------------------------------------------------------------------
Errors
-------------------------------------------------------------------------- */

/// Errors from the checkout provider.
#[derive(Debug, thiserror::Error)]
pub enum CreemError {
    /// Local misconfiguration (missing key, malformed response).
    #[error("Creem configuration error: {0}")]
    Config(String),

    /// Transport-level failure.
    #[error("Creem request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider answered with a non-success status. The status is
    /// preserved so callers can pass it through verbatim.
    #[error("Creem API error (status {status}): {body}")]
    Api { status: u16, body: String },
}

/* --------------------------------------------------------------------------
Provider trait + client
-------------------------------------------------------------------------- */

/// Seam for creating checkout sessions, so tests can substitute a fake.
#[async_trait]
pub trait CheckoutProvider: Send + Sync {
    async fn create_checkout(&self, request: &CheckoutRequest)
        -> Result<CheckoutSession, CreemError>;
}

/// reqwest-backed Creem client.
pub struct CreemClient {
    api_key: String,
    base_url: String,
    http: reqwest::Client,
}

impl CreemClient {
    /// Create a client for the given API key. Test-mode keys are routed
    /// to the sandbox API automatically.
    pub fn new(api_key: impl Into<String>) -> Self {
        let api_key = api_key.into();
        let base_url = if api_key.starts_with(TEST_KEY_PREFIX) {
            TEST_API_BASE
        } else {
            PROD_API_BASE
        };
        Self {
            api_key,
            base_url: base_url.to_string(),
            http: reqwest::Client::new(),
        }
    }

    /// Load the client from `CREEM_API_KEY`.
    pub fn from_env() -> Result<Self, CreemError> {
        let api_key = std::env::var("CREEM_API_KEY")
            .map_err(|_| CreemError::Config("CREEM_API_KEY is not set".into()))?;
        if api_key.is_empty() {
            return Err(CreemError::Config("CREEM_API_KEY is empty".into()));
        }
        Ok(Self::new(api_key))
    }

    /// API base URL in effect (differs for test-mode keys).
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl CheckoutProvider for CreemClient {
    async fn create_checkout(
        &self,
        request: &CheckoutRequest,
    ) -> Result<CheckoutSession, CreemError> {
        let url = format!("{}/v1/checkouts", self.base_url);
        let response = self
            .http
            .post(&url)
            .header("x-api-key", &self.api_key)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = status.as_u16(), %body, "Creem checkout failed");
            return Err(CreemError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let raw: RawCheckoutResponse = response.json().await?;
        raw.try_into()
    }
}

/* --------------------------------------------------------------------------
Tests
-------------------------------------------------------------------------- */

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use uuid::Uuid;

    // -- base URL selection --

    #[test]
    fn test_keys_use_sandbox() {
        let client = CreemClient::new("creem_test_abc");
        assert_eq!(client.base_url(), TEST_API_BASE);
    }

    #[test]
    fn live_keys_use_production() {
        let client = CreemClient::new("creem_live_abc");
        assert_eq!(client.base_url(), PROD_API_BASE);
    }

    // -- metadata --

    #[test]
    fn plan_change_metadata_with_active_subscription() {
        let user_id = Uuid::new_v4();
        let expires_at = Utc::now() + Duration::days(10);
        let snapshot = SubscriptionSnapshot {
            plan_tier: PlanTier::Basic,
            billing_cycle: BillingCycle::Monthly,
            expires_at,
        };
        let metadata = CheckoutMetadata::plan_change(
            user_id,
            PlanTier::Pro,
            BillingCycle::Yearly,
            Some(&snapshot),
            PlanAction::Upgrade,
            AdjustmentMode::Immediate,
            864_000,
        );

        let json = serde_json::to_value(&metadata).unwrap();
        assert_eq!(json["type"], "subscription");
        assert_eq!(json["plan_tier"], "pro");
        assert_eq!(json["billing_cycle"], "yearly");
        assert_eq!(json["previous_plan"], "basic");
        assert_eq!(json["previous_billing_cycle"], "monthly");
        assert_eq!(json["action"], "upgrade");
        assert_eq!(json["adjustment_mode"], "immediate");
        // Numbers travel as strings through provider metadata.
        assert_eq!(json["remaining_seconds"], "864000");
    }

    #[test]
    fn plan_change_metadata_without_subscription_uses_none() {
        let metadata = CheckoutMetadata::plan_change(
            Uuid::new_v4(),
            PlanTier::Basic,
            BillingCycle::Monthly,
            None,
            PlanAction::Purchase,
            AdjustmentMode::default(),
            0,
        );
        assert_eq!(metadata.previous_plan, "none");
        assert_eq!(metadata.previous_billing_cycle, "none");
        assert_eq!(metadata.previous_expires_at, "none");
        assert_eq!(metadata.remaining_seconds, "0");
    }

    // -- request id --

    #[test]
    fn request_id_carries_action_and_user() {
        let user_id = Uuid::new_v4();
        let id = CheckoutRequest::plan_change_request_id(PlanAction::Downgrade, user_id);
        assert!(id.starts_with("downgrade_"));
        assert!(id.contains(&user_id.to_string()));
    }

    // -- response normalization --

    #[test]
    fn session_accepts_either_url_key() {
        let with_url: RawCheckoutResponse = serde_json::from_value(serde_json::json!({
            "id": "ch_1", "url": "https://checkout.creem.io/a"
        }))
        .unwrap();
        let session: CheckoutSession = with_url.try_into().unwrap();
        assert_eq!(session.url, "https://checkout.creem.io/a");

        let with_checkout_url: RawCheckoutResponse = serde_json::from_value(serde_json::json!({
            "id": "ch_2", "checkout_url": "https://checkout.creem.io/b"
        }))
        .unwrap();
        let session: CheckoutSession = with_checkout_url.try_into().unwrap();
        assert_eq!(session.id, "ch_2");
        assert_eq!(session.url, "https://checkout.creem.io/b");
    }

    #[test]
    fn session_without_url_is_an_error() {
        let raw: RawCheckoutResponse =
            serde_json::from_value(serde_json::json!({ "id": "ch_3" })).unwrap();
        let result: Result<CheckoutSession, _> = raw.try_into();
        assert!(result.is_err());
    }
}
