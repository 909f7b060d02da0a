//! Repository for the credit ledger (`credit_transactions` +
//! `user_credits`).
//!
//! Every balance change appends a transaction row and updates the
//! running total inside one database transaction, so the snapshot in
//! `remaining_credits` and the `user_credits` total never diverge.

use sqlx::PgPool;
use vireo_core::types::{DbId, Timestamp};

use crate::models::credit::{CreditTransaction, CreditTransactionType, NewCreditTransaction};

/// Column list for `credit_transactions` queries.
const COLUMNS: &str = "\
    id, user_id, transaction_type, amount, remaining_credits, \
    expires_at, related_entity_id, related_entity_type, description, created_at";

/// Provides append/lookup operations for the credit ledger.
pub struct CreditRepo;

impl CreditRepo {
    /// Expiry of the most recent subscription refill for (user,
    /// subscription), ignoring consumption rows and grants without an
    /// expiry. `None` means no refill has ever landed.
    pub async fn latest_refill_expiry(
        pool: &PgPool,
        user_id: DbId,
        subscription_id: DbId,
    ) -> Result<Option<Timestamp>, sqlx::Error> {
        sqlx::query_scalar::<_, Timestamp>(
            "SELECT expires_at FROM credit_transactions \
             WHERE user_id = $1 \
               AND related_entity_id = $2 \
               AND transaction_type = $3 \
               AND amount > 0 \
               AND expires_at IS NOT NULL \
             ORDER BY expires_at DESC \
             LIMIT 1",
        )
        .bind(user_id)
        .bind(subscription_id)
        .bind(CreditTransactionType::SubscriptionRefill.as_str())
        .fetch_optional(pool)
        .await
    }

    /// The user's current credit balance (zero when no row exists yet).
    pub async fn available_credits(pool: &PgPool, user_id: DbId) -> Result<i64, sqlx::Error> {
        let total: Option<i64> = sqlx::query_scalar(
            "SELECT total_credits FROM user_credits WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(pool)
        .await?;
        Ok(total.unwrap_or(0))
    }

    /// Append a ledger entry and update the running total atomically.
    ///
    /// Works for grants (positive amount) and consumption (negative
    /// amount) alike; the caller is responsible for sufficiency checks.
    /// Returns the inserted row.
    pub async fn append(
        pool: &PgPool,
        input: &NewCreditTransaction,
    ) -> Result<CreditTransaction, sqlx::Error> {
        let mut tx = pool.begin().await?;

        // Lock the running total for this user (creating it on first use).
        sqlx::query(
            "INSERT INTO user_credits (user_id, total_credits) \
             VALUES ($1, 0) \
             ON CONFLICT ON CONSTRAINT uq_user_credits_user DO NOTHING",
        )
        .bind(input.user_id)
        .execute(&mut *tx)
        .await?;

        let current: i64 = sqlx::query_scalar(
            "SELECT total_credits FROM user_credits WHERE user_id = $1 FOR UPDATE",
        )
        .bind(input.user_id)
        .fetch_one(&mut *tx)
        .await?;

        let remaining = current + input.amount;

        let insert = format!(
            "INSERT INTO credit_transactions \
             (user_id, transaction_type, amount, remaining_credits, \
              expires_at, related_entity_id, related_entity_type, description) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {COLUMNS}"
        );
        let row = sqlx::query_as::<_, CreditTransaction>(&insert)
            .bind(input.user_id)
            .bind(input.transaction_type.as_str())
            .bind(input.amount)
            .bind(remaining)
            .bind(input.expires_at)
            .bind(input.related_entity_id)
            .bind(input.related_entity_type.map(|t| t.as_str()))
            .bind(&input.description)
            .fetch_one(&mut *tx)
            .await?;

        sqlx::query(
            "UPDATE user_credits \
             SET total_credits = $2, updated_at = NOW() \
             WHERE user_id = $1",
        )
        .bind(input.user_id)
        .bind(remaining)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(row)
    }
}
