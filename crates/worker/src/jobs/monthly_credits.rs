//! Monthly credit activation for yearly-paid subscriptions.
//!
//! Candidates are processed strictly in fetch order and each row's
//! outcome is independent: one bad row never aborts the batch. The
//! grant and the banked-month decrement are two separate writes; if the
//! decrement fails after the grant landed, the row is reported as an
//! error and the credits stay granted. Re-running the job before the
//! row is repaired can therefore double-grant -- the single daily
//! schedule is what bounds that risk.

use vireo_core::activation::{
    activation_decision, next_refill_expiry, refill_description, skip_days_reason,
    ActivationDecision, ActivationOutcome, ActivationSummary, SKIP_NO_CREDIT_RECORD,
};
use vireo_core::credits::MonthlyCreditSchedule;
use vireo_core::types::Timestamp;
use vireo_db::models::credit::{CreditTransactionType, NewCreditTransaction, RelatedEntityType};

use crate::store::{CreditLedger, StoreError, SubscriptionStore};

/// Run one activation pass over all candidate subscriptions.
///
/// Fails only when the candidate list itself cannot be fetched;
/// everything after that is captured per-row in the summary.
pub async fn run(
    store: &dyn SubscriptionStore,
    ledger: &dyn CreditLedger,
    schedule: &MonthlyCreditSchedule,
    now: Timestamp,
) -> Result<ActivationSummary, StoreError> {
    let candidates = store.list_pending_activation().await?;
    tracing::info!(candidates = candidates.len(), "Monthly credit activation started");

    let mut results = Vec::with_capacity(candidates.len());
    for subscription in &candidates {
        let outcome = process_candidate(store, ledger, schedule, subscription, now).await;
        results.push(outcome);
    }

    let summary = ActivationSummary::from_results(results);
    tracing::info!(
        activated = summary.activated,
        skipped = summary.skipped,
        errors = summary.errors,
        "Monthly credit activation finished"
    );
    Ok(summary)
}

async fn process_candidate(
    store: &dyn SubscriptionStore,
    ledger: &dyn CreditLedger,
    schedule: &MonthlyCreditSchedule,
    subscription: &vireo_db::models::subscription::UserSubscription,
    now: Timestamp,
) -> ActivationOutcome {
    let Some(tier) = subscription.tier() else {
        tracing::error!(
            subscription_id = %subscription.id,
            plan_tier = %subscription.plan_tier,
            "Unknown plan tier on activation candidate"
        );
        return ActivationOutcome::error(
            subscription.id,
            format!("unknown plan tier: {}", subscription.plan_tier),
        );
    };

    let latest_expiry = match ledger
        .latest_refill_expiry(subscription.user_id, subscription.id)
        .await
    {
        Ok(expiry) => expiry,
        Err(e) => {
            tracing::error!(subscription_id = %subscription.id, error = %e, "Refill lookup failed");
            return ActivationOutcome::error(subscription.id, e.to_string());
        }
    };

    // No refill yet: the initial purchase grant has not landed, leave
    // the row for a later run.
    let Some(latest_expiry) = latest_expiry else {
        tracing::debug!(subscription_id = %subscription.id, "Skipped: no credit record");
        return ActivationOutcome::skipped(subscription.id, SKIP_NO_CREDIT_RECORD);
    };

    match activation_decision(latest_expiry, now) {
        ActivationDecision::Skip { days_remaining } => {
            tracing::debug!(
                subscription_id = %subscription.id,
                days_remaining,
                "Skipped: current grant still valid"
            );
            ActivationOutcome::skipped(subscription.id, skip_days_reason(days_remaining))
        }
        ActivationDecision::Activate => {
            let credits = schedule.for_tier(tier);
            let expires_at = next_refill_expiry(latest_expiry);

            let entry = NewCreditTransaction {
                user_id: subscription.user_id,
                transaction_type: CreditTransactionType::SubscriptionRefill,
                amount: credits,
                expires_at: Some(expires_at),
                related_entity_id: Some(subscription.id),
                related_entity_type: Some(RelatedEntityType::Subscription),
                description: refill_description(tier, credits),
            };
            if let Err(e) = ledger.add_credits(entry).await {
                tracing::error!(subscription_id = %subscription.id, error = %e, "Credit grant failed");
                return ActivationOutcome::error(subscription.id, e.to_string());
            }

            let remaining_months = subscription.unactivated_months - 1;
            if let Err(e) = store
                .set_unactivated_months(subscription.id, remaining_months)
                .await
            {
                // The grant already landed; report the row as an error
                // and leave the counter for manual repair.
                tracing::error!(
                    subscription_id = %subscription.id,
                    error = %e,
                    "Banked-month decrement failed after grant"
                );
                return ActivationOutcome::error(subscription.id, e.to_string());
            }

            tracing::info!(
                subscription_id = %subscription.id,
                user_id = %subscription.user_id,
                credits,
                remaining_months,
                "Activated next month's credits"
            );
            ActivationOutcome::activated(
                subscription.id,
                subscription.user_id,
                credits,
                expires_at,
                remaining_months,
            )
        }
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
    use vireo_core::activation::ActivationStatus;
    use vireo_db::models::subscription::UserSubscription;

    use crate::jobs::test_support::FakeLedger;

    struct FakeSubscriptions {
        rows: Vec<UserSubscription>,
        fail_update_for: Option<Uuid>,
        updates: std::sync::Mutex<Vec<(Uuid, i32)>>,
    }

    impl FakeSubscriptions {
        fn new(rows: Vec<UserSubscription>) -> Self {
            Self {
                rows,
                fail_update_for: None,
                updates: std::sync::Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait::async_trait]
    impl SubscriptionStore for FakeSubscriptions {
        async fn list_pending_activation(&self) -> Result<Vec<UserSubscription>, StoreError> {
            Ok(self.rows.clone())
        }

        async fn set_unactivated_months(
            &self,
            subscription_id: Uuid,
            unactivated_months: i32,
        ) -> Result<(), StoreError> {
            if self.fail_update_for == Some(subscription_id) {
                return Err(StoreError::Unavailable("update failed".into()));
            }
            self.updates
                .lock()
                .unwrap()
                .push((subscription_id, unactivated_months));
            Ok(())
        }
    }

    fn subscription(tier: &str, unactivated_months: i32) -> UserSubscription {
        let now = Utc::now();
        UserSubscription {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            plan_tier: tier.to_string(),
            billing_cycle: "yearly".to_string(),
            status: "active".to_string(),
            expires_at: now + Duration::days(300),
            unactivated_months,
            creem_subscription_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn grant_expiring_far_out_is_skipped_with_day_count() {
        let sub = subscription("pro", 5);
        let ledger = FakeLedger::new().with_expiry(sub.id, Utc::now() + Duration::days(10));
        let store = FakeSubscriptions::new(vec![sub]);

        let summary = run(&store, &ledger, &MonthlyCreditSchedule::default(), Utc::now())
            .await
            .unwrap();

        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.results[0].status, ActivationStatus::Skipped);
        assert_eq!(summary.results[0].reason.as_deref(), Some("还有10天"));
        assert!(ledger.grants().is_empty());
    }

    #[tokio::test]
    async fn grant_expiring_soon_activates_and_decrements() {
        let sub = subscription("pro", 5);
        let sub_id = sub.id;
        let expiry = Utc::now() + Duration::days(2);
        let ledger = FakeLedger::new().with_expiry(sub_id, expiry);
        let store = FakeSubscriptions::new(vec![sub]);

        let summary = run(&store, &ledger, &MonthlyCreditSchedule::default(), Utc::now())
            .await
            .unwrap();

        assert_eq!(summary.activated, 1);
        let row = &summary.results[0];
        assert_eq!(row.status, ActivationStatus::Activated);
        assert_eq!(row.credits_added, Some(800));
        assert_eq!(row.unactivated_months, Some(4));
        assert_eq!(row.expires_at, Some(expiry + Duration::days(30)));

        let grants = ledger.grants();
        assert_eq!(grants.len(), 1);
        assert_eq!(grants[0].amount, 800);
        assert!(grants[0].description.contains("pro套餐"));
        assert_eq!(store.updates.lock().unwrap().as_slice(), &[(sub_id, 4)]);
    }

    #[tokio::test]
    async fn candidate_without_refill_history_is_skipped() {
        let sub = subscription("basic", 11);
        let ledger = FakeLedger::new();
        let store = FakeSubscriptions::new(vec![sub]);

        let summary = run(&store, &ledger, &MonthlyCreditSchedule::default(), Utc::now())
            .await
            .unwrap();

        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.results[0].reason.as_deref(), Some(SKIP_NO_CREDIT_RECORD));
    }

    #[tokio::test]
    async fn refill_lookup_failure_becomes_error_row() {
        let sub = subscription("basic", 2);
        let ledger = FakeLedger::new().failing_expiry_for(sub.id);
        let store = FakeSubscriptions::new(vec![sub]);

        let summary = run(&store, &ledger, &MonthlyCreditSchedule::default(), Utc::now())
            .await
            .unwrap();

        assert_eq!(summary.errors, 1);
        assert!(summary.results[0].error.is_some());
    }

    #[tokio::test]
    async fn mixed_batch_counts_one_of_each_in_fetch_order() {
        let activates = subscription("basic", 3);
        let skips = subscription("pro", 3);
        let errors = subscription("max", 3);

        let ledger = FakeLedger::new()
            .with_expiry(activates.id, Utc::now() + Duration::days(1))
            .with_expiry(skips.id, Utc::now() + Duration::days(20))
            .failing_expiry_for(errors.id);
        let store = FakeSubscriptions::new(vec![activates, skips, errors]);

        let summary = run(&store, &ledger, &MonthlyCreditSchedule::default(), Utc::now())
            .await
            .unwrap();

        assert_eq!(summary.activated, 1);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.errors, 1);
        assert_eq!(summary.results[0].status, ActivationStatus::Activated);
        assert_eq!(summary.results[1].status, ActivationStatus::Skipped);
        assert_eq!(summary.results[2].status, ActivationStatus::Error);
    }

    #[tokio::test]
    async fn decrement_failure_reports_error_but_grant_stands() {
        let sub = subscription("basic", 2);
        let sub_id = sub.id;
        let ledger = FakeLedger::new().with_expiry(sub_id, Utc::now() + Duration::days(1));
        let mut store = FakeSubscriptions::new(vec![sub]);
        store.fail_update_for = Some(sub_id);

        let summary = run(&store, &ledger, &MonthlyCreditSchedule::default(), Utc::now())
            .await
            .unwrap();

        assert_eq!(summary.errors, 1);
        // The grant landed before the decrement failed.
        assert_eq!(ledger.grants().len(), 1);
    }

    #[tokio::test]
    async fn grant_failure_reports_error_and_skips_decrement() {
        let sub = subscription("basic", 2);
        let ledger = FakeLedger::new()
            .with_expiry(sub.id, Utc::now() + Duration::days(1))
            .failing_grants();
        let store = FakeSubscriptions::new(vec![sub]);

        let summary = run(&store, &ledger, &MonthlyCreditSchedule::default(), Utc::now())
            .await
            .unwrap();

        assert_eq!(summary.errors, 1);
        assert!(store.updates.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_tier_becomes_error_row() {
        let sub = subscription("platinum", 2);
        let ledger = FakeLedger::new().with_expiry(sub.id, Utc::now() + Duration::days(1));
        let store = FakeSubscriptions::new(vec![sub]);

        let summary = run(&store, &ledger, &MonthlyCreditSchedule::default(), Utc::now())
            .await
            .unwrap();

        assert_eq!(summary.errors, 1);
        assert!(summary.results[0]
            .error
            .as_deref()
            .unwrap()
            .contains("platinum"));
    }
}
