//! Subscription models and DTOs.
//!
//! Tier and cycle columns are stored as TEXT; the typed accessors parse
//! them through the core enums so rule code never sees raw strings.
//! Rows with unrecognized values surface as `None` and are classified
//! by the caller instead of panicking mid-batch.

use serde::Serialize;
use sqlx::FromRow;
use vireo_core::plan::{BillingCycle, PlanTier, SubscriptionSnapshot};
use vireo_core::types::{DbId, Timestamp};

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Lifecycle state of a subscription row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionStatus {
    Active,
    /// Scheduled to take effect when the current subscription ends.
    /// At most one pending row may exist per user.
    Pending,
    Cancelled,
    Expired,
    Paused,
}

impl SubscriptionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Pending => "pending",
            Self::Cancelled => "cancelled",
            Self::Expired => "expired",
            Self::Paused => "paused",
        }
    }
}

// ---------------------------------------------------------------------------
// Entity
// ---------------------------------------------------------------------------

/// A row from `user_subscriptions`.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct UserSubscription {
    pub id: DbId,
    pub user_id: DbId,
    pub plan_tier: String,
    pub billing_cycle: String,
    pub status: String,
    pub expires_at: Timestamp,
    pub unactivated_months: i32,
    pub creem_subscription_id: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl UserSubscription {
    /// Typed plan tier, `None` for unrecognized stored values.
    pub fn tier(&self) -> Option<PlanTier> {
        PlanTier::parse(&self.plan_tier)
    }

    /// Typed billing cycle, `None` for unrecognized stored values.
    pub fn cycle(&self) -> Option<BillingCycle> {
        BillingCycle::parse(&self.billing_cycle)
    }

    /// View of this row as the core's read-only snapshot, if both the
    /// tier and cycle columns are well-formed.
    pub fn snapshot(&self) -> Option<SubscriptionSnapshot> {
        Some(SubscriptionSnapshot {
            plan_tier: self.tier()?,
            billing_cycle: self.cycle()?,
            expires_at: self.expires_at,
        })
    }
}
