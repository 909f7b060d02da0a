//! Prize distribution for challenges whose voting window has closed.
//!
//! Each due challenge is processed independently: submissions are
//! ranked, every submission gets its final rank stamped, credit prizes
//! go to the ranks with a configured reward tier, and the challenge is
//! marked completed. A failed grant for one winner never blocks the
//! remaining winners -- the first error is surfaced in that challenge's
//! result entry instead.

use vireo_core::prizes::{
    parse_rewards, plan_prize_grants, prize_description, prize_expiry, ChallengeOutcome,
    DistributionSummary, RankedSubmission,
};
use vireo_core::types::Timestamp;
use vireo_db::models::challenge::{Challenge, NewChallengeReward};
use vireo_db::models::credit::{CreditTransactionType, NewCreditTransaction, RelatedEntityType};

use crate::store::{ChallengeStore, CreditLedger, StoreError};

/// Run one distribution pass over all due challenges.
///
/// Fails only when the due-challenge list itself cannot be fetched.
pub async fn run(
    store: &dyn ChallengeStore,
    ledger: &dyn CreditLedger,
    now: Timestamp,
) -> Result<DistributionSummary, StoreError> {
    let challenges = store.list_due(now).await?;
    tracing::info!(due = challenges.len(), "Challenge prize distribution started");

    let total = challenges.len();
    let mut results = Vec::with_capacity(total);
    for challenge in &challenges {
        results.push(process_challenge(store, ledger, challenge, now).await);
    }

    let summary = DistributionSummary::from_results(total, results);
    tracing::info!(
        processed = summary.processed,
        total = summary.total,
        "Challenge prize distribution finished"
    );
    Ok(summary)
}

async fn process_challenge(
    store: &dyn ChallengeStore,
    ledger: &dyn CreditLedger,
    challenge: &Challenge,
    now: Timestamp,
) -> ChallengeOutcome {
    let submissions = match store.ranked_submissions(challenge.id).await {
        Ok(submissions) => submissions,
        Err(e) => {
            tracing::error!(challenge_id = %challenge.id, error = %e, "Submission fetch failed");
            return ChallengeOutcome {
                challenge_id: challenge.id,
                success: false,
                error: Some(e.to_string()),
            };
        }
    };

    let rewards = parse_rewards(&challenge.rewards);

    // A challenge with nothing to distribute still completes, so it
    // leaves the due queue.
    if submissions.is_empty() || rewards.is_empty() {
        tracing::info!(
            challenge_id = %challenge.id,
            submissions = submissions.len(),
            rewards = rewards.len(),
            "Nothing to distribute, completing challenge"
        );
        return match store.mark_completed(challenge.id).await {
            Ok(()) => ChallengeOutcome {
                challenge_id: challenge.id,
                success: true,
                error: None,
            },
            Err(e) => ChallengeOutcome {
                challenge_id: challenge.id,
                success: false,
                error: Some(e.to_string()),
            },
        };
    }

    let mut first_error: Option<String> = None;
    let mut record_error = |e: String| {
        if first_error.is_none() {
            first_error = Some(e);
        }
    };

    // Stamp final ranks on every submission, winners or not.
    for (index, submission) in submissions.iter().enumerate() {
        let rank = index as i32 + 1;
        if let Err(e) = store.set_rank(submission.id, rank).await {
            tracing::error!(
                challenge_id = %challenge.id,
                submission_id = %submission.id,
                error = %e,
                "Rank stamp failed"
            );
            record_error(e.to_string());
        }
    }

    let ranked: Vec<RankedSubmission> = submissions
        .iter()
        .map(|s| RankedSubmission {
            id: s.id,
            user_id: s.user_id,
            vote_count: s.vote_count,
        })
        .collect();

    for grant in plan_prize_grants(&ranked, &rewards) {
        let entry = NewCreditTransaction {
            user_id: grant.user_id,
            transaction_type: CreditTransactionType::AdminAdjustment,
            amount: grant.credits,
            expires_at: Some(prize_expiry(now)),
            related_entity_id: Some(challenge.id),
            related_entity_type: Some(RelatedEntityType::Challenge),
            description: prize_description(&challenge.title, grant.rank, grant.credits),
        };
        if let Err(e) = ledger.add_credits(entry).await {
            tracing::error!(
                challenge_id = %challenge.id,
                rank = grant.rank,
                error = %e,
                "Prize grant failed, continuing with next winner"
            );
            record_error(e.to_string());
            continue;
        }

        // Persist the reward record with the tier's configured value.
        let tier = rewards.iter().find(|t| t.rank == grant.rank);
        let reward = NewChallengeReward {
            challenge_id: challenge.id,
            user_id: grant.user_id,
            submission_id: grant.submission_id,
            rank: grant.rank as i32,
            prize_type: "credits".to_string(),
            prize_value: tier
                .map(|t| t.prize_value.clone())
                .unwrap_or_else(|| serde_json::json!(grant.credits)),
        };
        if let Err(e) = store.insert_reward(reward).await {
            tracing::error!(
                challenge_id = %challenge.id,
                rank = grant.rank,
                error = %e,
                "Reward record insert failed"
            );
            record_error(e.to_string());
        } else {
            tracing::info!(
                challenge_id = %challenge.id,
                rank = grant.rank,
                user_id = %grant.user_id,
                credits = grant.credits,
                "Prize granted"
            );
        }
    }

    if let Err(e) = store.mark_completed(challenge.id).await {
        tracing::error!(challenge_id = %challenge.id, error = %e, "Completion stamp failed");
        return ChallengeOutcome {
            challenge_id: challenge.id,
            success: false,
            error: Some(e.to_string()),
        };
    }

    ChallengeOutcome {
        challenge_id: challenge.id,
        success: true,
        error: first_error,
    }
}

/* --------------------------------------------------------------------------
Tests
-------------------------------------------------------------------------- */
