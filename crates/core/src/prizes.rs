//! Challenge prize distribution rules.
//!
//! When a challenge's voting window closes, submissions are ranked by
//! vote count (ties broken by submission time) and the configured
//! reward tiers are paired with the top ranks. Only credit prizes are
//! granted automatically; other prize kinds are recorded elsewhere.
//! The pairing is planned here as pure data so the worker loop only
//! has to execute the plan against the ledger.

use serde::{Deserialize, Serialize};

use crate::types::{DbId, Timestamp};

/* --------------------------------------------------------------------------
Constants
-------------------------------------------------------------------------- */

/// Validity of prize credits, in days (aligned with purchased packages).
pub const PRIZE_VALIDITY_DAYS: i64 = 365;

/* --------------------------------------------------------------------------
Reward configuration
-------------------------------------------------------------------------- */

/// Prize kind of a configured reward tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrizeType {
    Credits,
    Badge,
    #[serde(other)]
    Other,
}

/// One configured reward tier, keyed by final rank.
///
/// `prize_value` stays loosely typed because the admin UI historically
/// stored both numbers and numeric strings; [`RewardTier::credit_amount`]
/// normalizes it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewardTier {
    pub rank: u32,
    pub prize_type: PrizeType,
    pub prize_value: serde_json::Value,
}

impl RewardTier {
    /// Credit amount of this tier, if it is a well-formed credit prize.
    ///
    /// Non-credit tiers, non-numeric values, and non-positive amounts
    /// all yield `None` and are skipped by the planner.
    pub fn credit_amount(&self) -> Option<i64> {
        if self.prize_type != PrizeType::Credits {
            return None;
        }
        let amount = match &self.prize_value {
            serde_json::Value::Number(n) => n.as_i64(),
            serde_json::Value::String(s) => s.trim().parse::<i64>().ok(),
            _ => None,
        }?;
        (amount > 0).then_some(amount)
    }
}

/// Parse the stored rewards JSON (an array of tier objects).
///
/// Malformed entries are dropped rather than failing the whole
/// challenge; a missing or non-array value yields an empty list.
pub fn parse_rewards(value: &serde_json::Value) -> Vec<RewardTier> {
    value
        .as_array()
        .map(|entries| {
            entries
                .iter()
                .filter_map(|entry| serde_json::from_value(entry.clone()).ok())
                .collect()
        })
        .unwrap_or_default()
}

/* --------------------------------------------------------------------------
Grant planning
-------------------------------------------------------------------------- */

/// A submission in its final ranked order (vote count descending,
/// earlier submissions first on ties).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankedSubmission {
    pub id: DbId,
    pub user_id: DbId,
    pub vote_count: i64,
}

/// A planned credit grant for one winner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrizeGrant {
    pub rank: u32,
    pub submission_id: DbId,
    pub user_id: DbId,
    pub credits: i64,
}

/// Pair ranked submissions with configured reward tiers.
///
/// Rank is the 1-based position in `submissions`. A grant is planned
/// only where a credit tier with a positive amount matches the rank;
/// submissions beyond the configured tiers (or matching non-credit
/// tiers) receive no grant. Every submission still gets its rank
/// stamped by the caller.
pub fn plan_prize_grants(
    submissions: &[RankedSubmission],
    rewards: &[RewardTier],
) -> Vec<PrizeGrant> {
    submissions
        .iter()
        .enumerate()
        .filter_map(|(index, submission)| {
            let rank = index as u32 + 1;
            let tier = rewards.iter().find(|tier| tier.rank == rank)?;
            let credits = tier.credit_amount()?;
            Some(PrizeGrant {
                rank,
                submission_id: submission.id,
                user_id: submission.user_id,
                credits,
            })
        })
        .collect()
}

/// Expiry of prize credits granted at `now`.
pub fn prize_expiry(now: Timestamp) -> Timestamp {
    now + chrono::Duration::days(PRIZE_VALIDITY_DAYS)
}

/// Ledger description for a prize grant.
pub fn prize_description(challenge_title: &str, rank: u32, credits: i64) -> String {
    format!(
        "Challenge prize - Rank {rank} in \"{challenge_title}\" ({credits} credits, valid for 1 year) / \
         挑战奖品 - \"{challenge_title}\"第{rank}名 ({credits}积分，1年有效)"
    )
}

/* --------------------------------------------------------------------------
Per-challenge results
-------------------------------------------------------------------------- */

/// Result entry for one processed challenge.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeOutcome {
    pub challenge_id: DbId,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Aggregated run summary. Result order matches fetch order.
#[derive(Debug, Clone, Serialize)]
pub struct DistributionSummary {
    pub processed: usize,
    pub total: usize,
    pub results: Vec<ChallengeOutcome>,
}

impl DistributionSummary {
    pub fn from_results(total: usize, results: Vec<ChallengeOutcome>) -> Self {
        let processed = results.iter().filter(|r| r.success).count();
        Self {
            processed,
            total,
            results,
        }
    }
}

/* --------------------------------------------------------------------------
Tests
-------------------------------------------------------------------------- */

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use uuid::Uuid;

    fn submission(votes: i64) -> RankedSubmission {
        RankedSubmission {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            vote_count: votes,
        }
    }

    fn credit_tier(rank: u32, credits: i64) -> RewardTier {
        RewardTier {
            rank,
            prize_type: PrizeType::Credits,
            prize_value: json!(credits),
        }
    }

    // -- plan_prize_grants --

    #[test]
    fn top_two_of_four_receive_grants() {
        let submissions = vec![submission(40), submission(30), submission(20), submission(10)];
        let rewards = vec![credit_tier(1, 500), credit_tier(2, 200)];

        let grants = plan_prize_grants(&submissions, &rewards);

        assert_eq!(grants.len(), 2);
        assert_eq!(grants[0].rank, 1);
        assert_eq!(grants[0].submission_id, submissions[0].id);
        assert_eq!(grants[0].credits, 500);
        assert_eq!(grants[1].rank, 2);
        assert_eq!(grants[1].submission_id, submissions[1].id);
        assert_eq!(grants[1].credits, 200);
    }

    #[test]
    fn no_rewards_means_no_grants() {
        let submissions = vec![submission(5)];
        assert!(plan_prize_grants(&submissions, &[]).is_empty());
    }

    #[test]
    fn no_submissions_means_no_grants() {
        let rewards = vec![credit_tier(1, 500)];
        assert!(plan_prize_grants(&[], &rewards).is_empty());
    }

    #[test]
    fn reward_ranks_may_have_gaps() {
        let submissions = vec![submission(30), submission(20), submission(10)];
        let rewards = vec![credit_tier(1, 500), credit_tier(3, 50)];

        let grants = plan_prize_grants(&submissions, &rewards);

        assert_eq!(grants.len(), 2);
        assert_eq!(grants[0].rank, 1);
        assert_eq!(grants[1].rank, 3);
        assert_eq!(grants[1].submission_id, submissions[2].id);
    }

    #[test]
    fn badge_tiers_are_not_granted() {
        let submissions = vec![submission(30)];
        let rewards = vec![RewardTier {
            rank: 1,
            prize_type: PrizeType::Badge,
            prize_value: json!("gold"),
        }];
        assert!(plan_prize_grants(&submissions, &rewards).is_empty());
    }

    // -- RewardTier::credit_amount --

    #[test]
    fn numeric_string_values_accepted() {
        let tier = RewardTier {
            rank: 1,
            prize_type: PrizeType::Credits,
            prize_value: json!("250"),
        };
        assert_eq!(tier.credit_amount(), Some(250));
    }

    #[test]
    fn non_positive_and_garbage_values_rejected() {
        for value in [json!(0), json!(-10), json!("lots"), json!(null)] {
            let tier = RewardTier {
                rank: 1,
                prize_type: PrizeType::Credits,
                prize_value: value,
            };
            assert_eq!(tier.credit_amount(), None);
        }
    }

    // -- parse_rewards --

    #[test]
    fn rewards_parse_from_stored_json() {
        let rewards = parse_rewards(&json!([
            {"rank": 1, "prize_type": "credits", "prize_value": 500},
            {"rank": 2, "prize_type": "badge", "prize_value": "silver"},
        ]));
        assert_eq!(rewards.len(), 2);
        assert_eq!(rewards[0].credit_amount(), Some(500));
        assert_eq!(rewards[1].prize_type, PrizeType::Badge);
    }

    #[test]
    fn unknown_prize_types_parse_as_other() {
        let rewards = parse_rewards(&json!([
            {"rank": 1, "prize_type": "merch", "prize_value": 1},
        ]));
        assert_eq!(rewards[0].prize_type, PrizeType::Other);
        assert_eq!(rewards[0].credit_amount(), None);
    }

    #[test]
    fn malformed_entries_are_dropped() {
        let rewards = parse_rewards(&json!([
            {"rank": 1, "prize_type": "credits", "prize_value": 500},
            {"prize_type": "credits"},
            42,
        ]));
        assert_eq!(rewards.len(), 1);
    }

    #[test]
    fn non_array_rewards_yield_empty() {
        assert!(parse_rewards(&json!(null)).is_empty());
        assert!(parse_rewards(&json!({"rank": 1})).is_empty());
    }

    // -- summary --

    #[test]
    fn summary_counts_successes() {
        let results = vec![
            ChallengeOutcome {
                challenge_id: Uuid::new_v4(),
                success: true,
                error: None,
            },
            ChallengeOutcome {
                challenge_id: Uuid::new_v4(),
                success: false,
                error: Some("fetch failed".into()),
            },
        ];
        let summary = DistributionSummary::from_results(2, results);
        assert_eq!(summary.processed, 1);
        assert_eq!(summary.total, 2);
    }

    #[test]
    fn prize_description_is_bilingual() {
        let desc = prize_description("Neon Nights", 2, 200);
        assert!(desc.contains("Rank 2"));
        assert!(desc.contains("第2名"));
        assert!(desc.contains("200积分"));
    }
}
