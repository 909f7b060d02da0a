//! Challenge models and DTOs.

use serde::Serialize;
use sqlx::FromRow;
use vireo_core::types::{DbId, Timestamp};

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Lifecycle state of a challenge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChallengeStatus {
    Draft,
    Open,
    Voting,
    Completed,
}

impl ChallengeStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Open => "open",
            Self::Voting => "voting",
            Self::Completed => "completed",
        }
    }
}

// ---------------------------------------------------------------------------
// Entities
// ---------------------------------------------------------------------------

/// A row from `challenges`.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Challenge {
    pub id: DbId,
    pub title: String,
    pub status: String,
    pub voting_end_date: Option<Timestamp>,
    /// Array of `{rank, prize_type, prize_value}` objects.
    pub rewards: serde_json::Value,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A row from `challenge_submissions`.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ChallengeSubmission {
    pub id: DbId,
    pub challenge_id: DbId,
    pub user_id: DbId,
    pub vote_count: i64,
    /// Final rank, stamped at prize distribution.
    pub rank: Option<i32>,
    pub created_at: Timestamp,
}

// ---------------------------------------------------------------------------
// Create DTO
// ---------------------------------------------------------------------------

/// Input for recording one distributed reward.
#[derive(Debug, Clone)]
pub struct NewChallengeReward {
    pub challenge_id: DbId,
    pub user_id: DbId,
    pub submission_id: DbId,
    pub rank: i32,
    pub prize_type: String,
    pub prize_value: serde_json::Value,
}
