//! Subscription plan tiers and plan-change rules.
//!
//! Tiers are strictly ordered (basic < pro < max); an expired or absent
//! subscription has no tier at all and is modeled as `None`. The
//! legality checks here gate the upgrade and downgrade checkout flows;
//! the caller is responsible for the pending-change existence lookup
//! (at most one scheduled change may be queued per user) and feeds the
//! result into [`PlanChangeError::PendingChangeExists`].

use serde::{Deserialize, Serialize};

use crate::types::Timestamp;

/* --------------------------------------------------------------------------
Tier / cycle / mode enums
-------------------------------------------------------------------------- */

/// Subscription plan tier, ordered lowest to highest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanTier {
    Basic,
    Pro,
    Max,
}

impl PlanTier {
    /// Ordering rank. "No subscription" ranks below every tier (0).
    pub fn rank(self) -> u8 {
        match self {
            Self::Basic => 1,
            Self::Pro => 2,
            Self::Max => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::Pro => "pro",
            Self::Max => "max",
        }
    }

    /// Parse a wire string. Returns `None` for unknown values.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "basic" => Some(Self::Basic),
            "pro" => Some(Self::Pro),
            "max" => Some(Self::Max),
            _ => None,
        }
    }
}

/// Billing cycle of a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BillingCycle {
    Monthly,
    Yearly,
}

impl BillingCycle {
    /// Length of one billing cycle in days.
    pub fn cycle_days(self) -> i64 {
        match self {
            Self::Monthly => 30,
            Self::Yearly => 365,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Monthly => "monthly",
            Self::Yearly => "yearly",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "monthly" => Some(Self::Monthly),
            "yearly" => Some(Self::Yearly),
            _ => None,
        }
    }
}

/// When a plan change takes effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdjustmentMode {
    /// Switch to the new plan now; remaining time on the old plan is
    /// appended after the new plan ends.
    #[default]
    Immediate,
    /// Switch once the current plan runs out.
    Scheduled,
}

impl AdjustmentMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Immediate => "immediate",
            Self::Scheduled => "scheduled",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "immediate" => Some(Self::Immediate),
            "scheduled" => Some(Self::Scheduled),
            _ => None,
        }
    }

    /// Parse an optional wire value; absent means `immediate`, unknown
    /// values are rejected rather than silently defaulted.
    pub fn parse_or_default(value: Option<&str>) -> Result<Self, PlanChangeError> {
        match value {
            None => Ok(Self::default()),
            Some(raw) => {
                Self::parse(raw).ok_or_else(|| PlanChangeError::InvalidAdjustmentMode(raw.to_string()))
            }
        }
    }
}

/// What a requested plan change amounts to, relative to the current
/// subscription. Recorded in checkout metadata for fulfillment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanAction {
    /// No prior active subscription.
    Purchase,
    Upgrade,
    Downgrade,
    /// Same tier, same billing cycle.
    Renew,
    /// Same tier, different billing cycle.
    Change,
}

impl PlanAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Purchase => "purchase",
            Self::Upgrade => "upgrade",
            Self::Downgrade => "downgrade",
            Self::Renew => "renew",
            Self::Change => "change",
        }
    }
}

/* --------------------------------------------------------------------------
Snapshot
-------------------------------------------------------------------------- */

/// Read-only view of a user's current subscription, supplied by the
/// caller from the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionSnapshot {
    pub plan_tier: PlanTier,
    pub billing_cycle: BillingCycle,
    pub expires_at: Timestamp,
}

impl SubscriptionSnapshot {
    /// A subscription is active while its expiry is in the future.
    pub fn is_active(&self, now: Timestamp) -> bool {
        self.expires_at > now
    }
}

/// Effective tier of a possibly-absent, possibly-expired subscription.
pub fn effective_tier(snapshot: Option<&SubscriptionSnapshot>, now: Timestamp) -> Option<PlanTier> {
    snapshot.filter(|s| s.is_active(now)).map(|s| s.plan_tier)
}

/* --------------------------------------------------------------------------
Errors
-------------------------------------------------------------------------- */

/// Rejection reasons for a plan-change request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlanChangeError {
    #[error("target plan {target} is not higher than current plan {current}")]
    UpgradeNotHigher {
        current: PlanTier,
        target: PlanTier,
    },

    #[error("current plan {current} is not higher than target plan {target}")]
    DowngradeNotLower {
        current: PlanTier,
        target: PlanTier,
    },

    #[error("no active subscription")]
    NoActiveSubscription,

    #[error("current subscription has expired")]
    SubscriptionExpired,

    #[error("a pending plan change already exists")]
    PendingChangeExists,

    #[error("invalid adjustment mode: {0}")]
    InvalidAdjustmentMode(String),
}

impl PlanChangeError {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::UpgradeNotHigher { .. } => "UPGRADE_NOT_HIGHER",
            Self::DowngradeNotLower { .. } => "DOWNGRADE_NOT_LOWER",
            Self::NoActiveSubscription => "NO_ACTIVE_SUBSCRIPTION",
            Self::SubscriptionExpired => "SUBSCRIPTION_EXPIRED",
            Self::PendingChangeExists => "PENDING_CHANGE_EXISTS",
            Self::InvalidAdjustmentMode(_) => "INVALID_ADJUSTMENT_MODE",
        }
    }
}

impl std::fmt::Display for PlanTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/* --------------------------------------------------------------------------
Legality checks
-------------------------------------------------------------------------- */

/// Check whether upgrading to `target` is legal.
///
/// With no active subscription any target is allowed (the change is a
/// new purchase, not an upgrade). Otherwise the target must strictly
/// outrank the current tier.
pub fn check_upgrade(
    current: Option<PlanTier>,
    target: PlanTier,
) -> Result<(), PlanChangeError> {
    match current {
        None => Ok(()),
        Some(current) if target.rank() > current.rank() => Ok(()),
        Some(current) => Err(PlanChangeError::UpgradeNotHigher { current, target }),
    }
}

/// Check whether downgrading to `target` is legal.
///
/// Requires a live subscription: absent means `NoActiveSubscription`,
/// expired means `SubscriptionExpired`. The target must rank strictly below
/// the current tier -- an equal or higher target is rejected (the latter
/// belongs to the upgrade flow).
pub fn check_downgrade(
    snapshot: Option<&SubscriptionSnapshot>,
    target: PlanTier,
    now: Timestamp,
) -> Result<(), PlanChangeError> {
    let snapshot = snapshot.ok_or(PlanChangeError::NoActiveSubscription)?;
    if !snapshot.is_active(now) {
        return Err(PlanChangeError::SubscriptionExpired);
    }
    if target.rank() < snapshot.plan_tier.rank() {
        Ok(())
    } else {
        Err(PlanChangeError::DowngradeNotLower {
            current: snapshot.plan_tier,
            target,
        })
    }
}

/// Enforce the at-most-one-pending-change rule.
///
/// The existence probe is the store's job (`find_pending`); the rule
/// that any queued change blocks further upgrades and downgrades is
/// owned here.
pub fn check_no_pending(pending_exists: bool) -> Result<(), PlanChangeError> {
    if pending_exists {
        Err(PlanChangeError::PendingChangeExists)
    } else {
        Ok(())
    }
}

/* --------------------------------------------------------------------------
Action classification & proration
-------------------------------------------------------------------------- */

/// Classify a plan change relative to the current (active) subscription.
pub fn determine_plan_action(
    current: Option<(PlanTier, BillingCycle)>,
    target: PlanTier,
    target_cycle: BillingCycle,
) -> PlanAction {
    let Some((current_tier, current_cycle)) = current else {
        return PlanAction::Purchase;
    };

    if current_tier == target && current_cycle == target_cycle {
        return PlanAction::Renew;
    }
    if target.rank() > current_tier.rank() {
        return PlanAction::Upgrade;
    }
    if target.rank() < current_tier.rank() {
        return PlanAction::Downgrade;
    }
    // Same tier, different cycle.
    PlanAction::Change
}

/// Whole seconds remaining until `expires_at`, floored at zero.
pub fn remaining_seconds(expires_at: Timestamp, now: Timestamp) -> i64 {
    (expires_at - now).num_seconds().max(0)
}

/// Combined action classification and proration inputs for checkout
/// metadata construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanChange {
    pub action: PlanAction,
    pub remaining_seconds: i64,
}

pub fn classify_plan_change(
    current: Option<&SubscriptionSnapshot>,
    target: PlanTier,
    target_cycle: BillingCycle,
    now: Timestamp,
) -> PlanChange {
    let active = current.filter(|s| s.is_active(now));
    let action = determine_plan_action(
        active.map(|s| (s.plan_tier, s.billing_cycle)),
        target,
        target_cycle,
    );
    let remaining_seconds = active
        .map(|s| remaining_seconds(s.expires_at, now))
        .unwrap_or(0);
    PlanChange {
        action,
        remaining_seconds,
    }
}

/* --------------------------------------------------------------------------
Tests
-------------------------------------------------------------------------- */

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn snapshot(tier: PlanTier, cycle: BillingCycle, expires_in_days: i64) -> SubscriptionSnapshot {
        SubscriptionSnapshot {
            plan_tier: tier,
            billing_cycle: cycle,
            expires_at: Utc::now() + Duration::days(expires_in_days),
        }
    }

    // -- tier ordering --

    #[test]
    fn tier_ranks_are_strictly_ordered() {
        assert!(PlanTier::Basic.rank() < PlanTier::Pro.rank());
        assert!(PlanTier::Pro.rank() < PlanTier::Max.rank());
    }

    #[test]
    fn tier_parse_round_trips() {
        for tier in [PlanTier::Basic, PlanTier::Pro, PlanTier::Max] {
            assert_eq!(PlanTier::parse(tier.as_str()), Some(tier));
        }
        assert_eq!(PlanTier::parse("platinum"), None);
    }

    // -- check_upgrade --

    #[test]
    fn upgrade_basic_to_pro_allowed() {
        assert!(check_upgrade(Some(PlanTier::Basic), PlanTier::Pro).is_ok());
    }

    #[test]
    fn upgrade_to_same_tier_rejected() {
        let err = check_upgrade(Some(PlanTier::Pro), PlanTier::Pro).unwrap_err();
        assert_eq!(err.code(), "UPGRADE_NOT_HIGHER");
    }

    #[test]
    fn upgrade_pro_to_basic_rejected() {
        let err = check_upgrade(Some(PlanTier::Pro), PlanTier::Basic).unwrap_err();
        assert_eq!(err.code(), "UPGRADE_NOT_HIGHER");
    }

    #[test]
    fn upgrade_without_subscription_is_new_purchase() {
        assert!(check_upgrade(None, PlanTier::Basic).is_ok());
        assert!(check_upgrade(None, PlanTier::Max).is_ok());
    }

    // -- check_downgrade --

    #[test]
    fn downgrade_max_to_pro_allowed() {
        let snap = snapshot(PlanTier::Max, BillingCycle::Monthly, 15);
        assert!(check_downgrade(Some(&snap), PlanTier::Pro, Utc::now()).is_ok());
    }

    #[test]
    fn downgrade_to_same_tier_rejected() {
        let snap = snapshot(PlanTier::Pro, BillingCycle::Monthly, 15);
        let err = check_downgrade(Some(&snap), PlanTier::Pro, Utc::now()).unwrap_err();
        assert_eq!(err.code(), "DOWNGRADE_NOT_LOWER");
    }

    #[test]
    fn downgrade_to_higher_tier_rejected() {
        let snap = snapshot(PlanTier::Basic, BillingCycle::Monthly, 15);
        let err = check_downgrade(Some(&snap), PlanTier::Pro, Utc::now()).unwrap_err();
        assert_eq!(err.code(), "DOWNGRADE_NOT_LOWER");
    }

    #[test]
    fn downgrade_without_subscription_rejected() {
        let err = check_downgrade(None, PlanTier::Basic, Utc::now()).unwrap_err();
        assert_eq!(err, PlanChangeError::NoActiveSubscription);
    }

    #[test]
    fn downgrade_with_expired_subscription_rejected() {
        let snap = snapshot(PlanTier::Pro, BillingCycle::Monthly, -5);
        let err = check_downgrade(Some(&snap), PlanTier::Basic, Utc::now()).unwrap_err();
        assert_eq!(err, PlanChangeError::SubscriptionExpired);
    }

    // -- effective_tier --

    #[test]
    fn expired_subscription_has_no_effective_tier() {
        let snap = snapshot(PlanTier::Max, BillingCycle::Yearly, -1);
        assert_eq!(effective_tier(Some(&snap), Utc::now()), None);
    }

    #[test]
    fn active_subscription_keeps_its_tier() {
        let snap = snapshot(PlanTier::Max, BillingCycle::Yearly, 30);
        assert_eq!(effective_tier(Some(&snap), Utc::now()), Some(PlanTier::Max));
    }

    // -- determine_plan_action --

    #[test]
    fn action_classification() {
        use BillingCycle::{Monthly, Yearly};
        assert_eq!(
            determine_plan_action(Some((PlanTier::Pro, Monthly)), PlanTier::Max, Monthly),
            PlanAction::Upgrade
        );
        assert_eq!(
            determine_plan_action(Some((PlanTier::Pro, Yearly)), PlanTier::Basic, Monthly),
            PlanAction::Downgrade
        );
        assert_eq!(
            determine_plan_action(Some((PlanTier::Pro, Monthly)), PlanTier::Pro, Monthly),
            PlanAction::Renew
        );
        assert_eq!(
            determine_plan_action(Some((PlanTier::Pro, Monthly)), PlanTier::Pro, Yearly),
            PlanAction::Change
        );
        assert_eq!(
            determine_plan_action(None, PlanTier::Basic, Monthly),
            PlanAction::Purchase
        );
    }

    // -- remaining_seconds --

    #[test]
    fn remaining_seconds_ten_days_out() {
        let now = Utc::now();
        let secs = remaining_seconds(now + Duration::days(10), now);
        assert!(secs > 860_000 && secs < 870_000, "got {secs}");
    }

    #[test]
    fn remaining_seconds_expired_is_zero() {
        let now = Utc::now();
        assert_eq!(remaining_seconds(now - Duration::days(3), now), 0);
    }

    // -- classify_plan_change --

    #[test]
    fn classify_active_upgrade_carries_remaining_time() {
        let now = Utc::now();
        let snap = snapshot(PlanTier::Basic, BillingCycle::Monthly, 10);
        let change = classify_plan_change(Some(&snap), PlanTier::Pro, BillingCycle::Monthly, now);
        assert_eq!(change.action, PlanAction::Upgrade);
        assert!(change.remaining_seconds > 0);
    }

    #[test]
    fn classify_expired_subscription_as_purchase() {
        let now = Utc::now();
        let snap = snapshot(PlanTier::Pro, BillingCycle::Monthly, -2);
        let change = classify_plan_change(Some(&snap), PlanTier::Basic, BillingCycle::Monthly, now);
        assert_eq!(change.action, PlanAction::Purchase);
        assert_eq!(change.remaining_seconds, 0);
    }

    // -- adjustment mode --

    #[test]
    fn adjustment_mode_defaults_to_immediate() {
        assert_eq!(AdjustmentMode::default(), AdjustmentMode::Immediate);
    }

    #[test]
    fn adjustment_mode_parse() {
        assert_eq!(AdjustmentMode::parse("immediate"), Some(AdjustmentMode::Immediate));
        assert_eq!(AdjustmentMode::parse("scheduled"), Some(AdjustmentMode::Scheduled));
        assert_eq!(AdjustmentMode::parse("deferred"), None);
    }

    #[test]
    fn adjustment_mode_absent_defaults_unknown_rejected() {
        assert_eq!(
            AdjustmentMode::parse_or_default(None),
            Ok(AdjustmentMode::Immediate)
        );
        assert_eq!(
            AdjustmentMode::parse_or_default(Some("scheduled")),
            Ok(AdjustmentMode::Scheduled)
        );
        let err = AdjustmentMode::parse_or_default(Some("deferred")).unwrap_err();
        assert_eq!(err.code(), "INVALID_ADJUSTMENT_MODE");
    }

    // -- pending-change guard --

    #[test]
    fn pending_change_blocks_further_changes() {
        assert!(check_no_pending(false).is_ok());
        assert_eq!(
            check_no_pending(true).unwrap_err(),
            PlanChangeError::PendingChangeExists
        );
    }

    // -- billing cycle --

    #[test]
    fn cycle_days() {
        assert_eq!(BillingCycle::Monthly.cycle_days(), 30);
        assert_eq!(BillingCycle::Yearly.cycle_days(), 365);
    }
}
