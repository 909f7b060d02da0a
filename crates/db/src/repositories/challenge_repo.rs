//! Repository for `challenges`, `challenge_submissions`, and
//! `challenge_rewards`.

use sqlx::PgPool;
use vireo_core::types::{DbId, Timestamp};

use crate::models::challenge::{
    Challenge, ChallengeStatus, ChallengeSubmission, NewChallengeReward,
};

/// Column list for `challenges` queries.
const CHALLENGE_COLUMNS: &str =
    "id, title, status, voting_end_date, rewards, created_at, updated_at";

/// Column list for `challenge_submissions` queries.
const SUBMISSION_COLUMNS: &str =
    "id, challenge_id, user_id, vote_count, rank, created_at";

/// Provides operations for the challenge lifecycle.
pub struct ChallengeRepo;

impl ChallengeRepo {
    /// Challenges whose voting window has closed but which have not
    /// been completed yet, oldest deadline first.
    pub async fn list_due(pool: &PgPool, now: Timestamp) -> Result<Vec<Challenge>, sqlx::Error> {
        let query = format!(
            "SELECT {CHALLENGE_COLUMNS} FROM challenges \
             WHERE status = $1 AND voting_end_date < $2 \
             ORDER BY voting_end_date ASC"
        );
        sqlx::query_as::<_, Challenge>(&query)
            .bind(ChallengeStatus::Voting.as_str())
            .bind(now)
            .fetch_all(pool)
            .await
    }

    /// Submissions in final-ranking order: vote count descending,
    /// earlier submissions first on ties.
    pub async fn ranked_submissions(
        pool: &PgPool,
        challenge_id: DbId,
    ) -> Result<Vec<ChallengeSubmission>, sqlx::Error> {
        let query = format!(
            "SELECT {SUBMISSION_COLUMNS} FROM challenge_submissions \
             WHERE challenge_id = $1 \
             ORDER BY vote_count DESC, created_at ASC"
        );
        sqlx::query_as::<_, ChallengeSubmission>(&query)
            .bind(challenge_id)
            .fetch_all(pool)
            .await
    }

    /// Stamp a submission with its final rank.
    pub async fn set_rank(
        pool: &PgPool,
        submission_id: DbId,
        rank: i32,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE challenge_submissions SET rank = $2 WHERE id = $1")
            .bind(submission_id)
            .bind(rank)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Record one distributed reward.
    pub async fn insert_reward(
        pool: &PgPool,
        input: &NewChallengeReward,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO challenge_rewards \
             (challenge_id, user_id, submission_id, rank, prize_type, prize_value) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(input.challenge_id)
        .bind(input.user_id)
        .bind(input.submission_id)
        .bind(input.rank)
        .bind(&input.prize_type)
        .bind(&input.prize_value)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Mark a challenge completed once distribution has run.
    pub async fn mark_completed(pool: &PgPool, challenge_id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE challenges SET status = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(challenge_id)
        .bind(ChallengeStatus::Completed.as_str())
        .execute(pool)
        .await?;
        Ok(())
    }
}
