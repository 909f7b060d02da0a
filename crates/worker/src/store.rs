//! Store and ledger seams for the batch jobs.
//!
//! The jobs only ever issue the handful of queries modeled here, so the
//! seams stay one-method-per-logical-query and an in-memory fake is a
//! few lines in tests. [`PgStore`] is the production implementation,
//! delegating to the repositories in `vireo-db`.

use async_trait::async_trait;
use vireo_core::types::{DbId, Timestamp};
use vireo_db::models::challenge::{Challenge, ChallengeSubmission, NewChallengeReward};
use vireo_db::models::credit::NewCreditTransaction;
use vireo_db::models::subscription::UserSubscription;
use vireo_db::repositories::{ChallengeRepo, CreditRepo, SubscriptionRepo};
use vireo_db::DbPool;

/// Errors surfaced by a store implementation.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Non-database failure (used by fakes and adapters).
    #[error("{0}")]
    Unavailable(String),
}

/// Subscription rows as the activation job sees them.
#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    /// Active subscriptions with banked months, in creation order.
    async fn list_pending_activation(&self) -> Result<Vec<UserSubscription>, StoreError>;

    /// Persist the decremented banked-month counter.
    async fn set_unactivated_months(
        &self,
        subscription_id: DbId,
        unactivated_months: i32,
    ) -> Result<(), StoreError>;
}

/// The credit ledger as the jobs see it.
#[async_trait]
pub trait CreditLedger: Send + Sync {
    /// Expiry of the latest refill for (user, subscription), if any.
    async fn latest_refill_expiry(
        &self,
        user_id: DbId,
        subscription_id: DbId,
    ) -> Result<Option<Timestamp>, StoreError>;

    /// Append a grant to the ledger.
    async fn add_credits(&self, entry: NewCreditTransaction) -> Result<(), StoreError>;
}

/// Challenge rows as the prize job sees them.
#[async_trait]
pub trait ChallengeStore: Send + Sync {
    /// Challenges past their voting deadline, oldest first.
    async fn list_due(&self, now: Timestamp) -> Result<Vec<Challenge>, StoreError>;

    /// Submissions in final-ranking order.
    async fn ranked_submissions(
        &self,
        challenge_id: DbId,
    ) -> Result<Vec<ChallengeSubmission>, StoreError>;

    /// Stamp a submission with its final rank.
    async fn set_rank(&self, submission_id: DbId, rank: i32) -> Result<(), StoreError>;

    /// Record one distributed reward.
    async fn insert_reward(&self, reward: NewChallengeReward) -> Result<(), StoreError>;

    /// Mark a challenge completed.
    async fn mark_completed(&self, challenge_id: DbId) -> Result<(), StoreError>;
}

/* --------------------------------------------------------------------------
PostgreSQL implementation
-------------------------------------------------------------------------- */

/// Production store backed by the shared connection pool.
#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SubscriptionStore for PgStore {
    async fn list_pending_activation(&self) -> Result<Vec<UserSubscription>, StoreError> {
        Ok(SubscriptionRepo::list_pending_activation(&self.pool).await?)
    }

    async fn set_unactivated_months(
        &self,
        subscription_id: DbId,
        unactivated_months: i32,
    ) -> Result<(), StoreError> {
        Ok(SubscriptionRepo::set_unactivated_months(&self.pool, subscription_id, unactivated_months)
            .await?)
    }
}

#[async_trait]
impl CreditLedger for PgStore {
    async fn latest_refill_expiry(
        &self,
        user_id: DbId,
        subscription_id: DbId,
    ) -> Result<Option<Timestamp>, StoreError> {
        Ok(CreditRepo::latest_refill_expiry(&self.pool, user_id, subscription_id).await?)
    }

    async fn add_credits(&self, entry: NewCreditTransaction) -> Result<(), StoreError> {
        CreditRepo::append(&self.pool, &entry).await?;
        Ok(())
    }
}

#[async_trait]
impl ChallengeStore for PgStore {
    async fn list_due(&self, now: Timestamp) -> Result<Vec<Challenge>, StoreError> {
        Ok(ChallengeRepo::list_due(&self.pool, now).await?)
    }

    async fn ranked_submissions(
        &self,
        challenge_id: DbId,
    ) -> Result<Vec<ChallengeSubmission>, StoreError> {
        Ok(ChallengeRepo::ranked_submissions(&self.pool, challenge_id).await?)
    }

    async fn set_rank(&self, submission_id: DbId, rank: i32) -> Result<(), StoreError> {
        Ok(ChallengeRepo::set_rank(&self.pool, submission_id, rank).await?)
    }

    async fn insert_reward(&self, reward: NewChallengeReward) -> Result<(), StoreError> {
        Ok(ChallengeRepo::insert_reward(&self.pool, &reward).await?)
    }

    async fn mark_completed(&self, challenge_id: DbId) -> Result<(), StoreError> {
        Ok(ChallengeRepo::mark_completed(&self.pool, challenge_id).await?)
    }
}
