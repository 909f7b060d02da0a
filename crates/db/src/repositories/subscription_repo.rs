//! Repository for the `user_subscriptions` table.

use sqlx::PgPool;
use vireo_core::types::DbId;

use crate::models::subscription::{SubscriptionStatus, UserSubscription};

/// Column list for `user_subscriptions` queries.
const COLUMNS: &str = "\
    id, user_id, plan_tier, billing_cycle, status, expires_at, \
    unactivated_months, creem_subscription_id, created_at, updated_at";

/// Provides read/update operations for subscription rows.
pub struct SubscriptionRepo;

impl SubscriptionRepo {
    /// The user's current active subscription, if any.
    ///
    /// When historical rows overlap, the one expiring last wins.
    pub async fn find_active(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<Option<UserSubscription>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM user_subscriptions \
             WHERE user_id = $1 AND status = $2 \
             ORDER BY expires_at DESC \
             LIMIT 1"
        );
        sqlx::query_as::<_, UserSubscription>(&query)
            .bind(user_id)
            .bind(SubscriptionStatus::Active.as_str())
            .fetch_optional(pool)
            .await
    }

    /// Probe for a queued plan change. Existence alone matters: at most
    /// one pending subscription may be queued per user, and any queued
    /// row blocks further upgrades/downgrades.
    pub async fn find_pending(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<Option<DbId>, sqlx::Error> {
        sqlx::query_scalar::<_, DbId>(
            "SELECT id FROM user_subscriptions \
             WHERE user_id = $1 AND status = $2 \
             LIMIT 1",
        )
        .bind(user_id)
        .bind(SubscriptionStatus::Pending.as_str())
        .fetch_optional(pool)
        .await
    }

    /// Active subscriptions with banked months awaiting activation,
    /// in creation order.
    pub async fn list_pending_activation(
        pool: &PgPool,
    ) -> Result<Vec<UserSubscription>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM user_subscriptions \
             WHERE status = $1 AND unactivated_months > 0 \
             ORDER BY created_at ASC"
        );
        sqlx::query_as::<_, UserSubscription>(&query)
            .bind(SubscriptionStatus::Active.as_str())
            .fetch_all(pool)
            .await
    }

    /// Store the decremented banked-month counter after an activation.
    pub async fn set_unactivated_months(
        pool: &PgPool,
        subscription_id: DbId,
        unactivated_months: i32,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE user_subscriptions \
             SET unactivated_months = $2, updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(subscription_id)
        .bind(unactivated_months)
        .execute(pool)
        .await?;
        Ok(())
    }
}
