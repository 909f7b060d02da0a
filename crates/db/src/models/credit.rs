//! Credit ledger models and DTOs.

use serde::Serialize;
use sqlx::FromRow;
use vireo_core::types::{DbId, Timestamp};

// ---------------------------------------------------------------------------
// Transaction type
// ---------------------------------------------------------------------------

/// Ledger entry kinds. The wire strings match the historical
/// `credit_transactions.transaction_type` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreditTransactionType {
    RegisterBonus,
    /// One-shot yearly subscription charge.
    Subscription,
    /// Monthly subscription top-up.
    SubscriptionRefill,
    SubscriptionUpgrade,
    /// Yearly-plan bonus credits.
    SubscriptionBonus,
    PackagePurchase,
    TextToImage,
    ImageToImage,
    VideoGeneration,
    VideoExtension,
    VideoRefund,
    MilestoneReward,
    AdminAdjustment,
    Refund,
}

impl CreditTransactionType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RegisterBonus => "register_bonus",
            Self::Subscription => "subscription",
            Self::SubscriptionRefill => "subscription_refill",
            Self::SubscriptionUpgrade => "subscription_upgrade",
            Self::SubscriptionBonus => "subscription_bonus",
            Self::PackagePurchase => "package_purchase",
            Self::TextToImage => "text_to_image",
            Self::ImageToImage => "image_to_image",
            Self::VideoGeneration => "video_generation",
            Self::VideoExtension => "video_extension",
            Self::VideoRefund => "video_refund",
            Self::MilestoneReward => "milestone_reward",
            Self::AdminAdjustment => "admin_adjustment",
            Self::Refund => "refund",
        }
    }
}

/// Kind of entity a transaction is linked to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelatedEntityType {
    Subscription,
    Order,
    Generation,
    Challenge,
    Admin,
}

impl RelatedEntityType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Subscription => "subscription",
            Self::Order => "order",
            Self::Generation => "generation",
            Self::Challenge => "challenge",
            Self::Admin => "admin",
        }
    }
}

// ---------------------------------------------------------------------------
// Entity
// ---------------------------------------------------------------------------

/// A row from `credit_transactions`.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CreditTransaction {
    pub id: DbId,
    pub user_id: DbId,
    pub transaction_type: String,
    /// Positive = grant, negative = consumption.
    pub amount: i64,
    /// Running total snapshot after this entry.
    pub remaining_credits: i64,
    /// `None` = never expires.
    pub expires_at: Option<Timestamp>,
    pub related_entity_id: Option<DbId>,
    pub related_entity_type: Option<String>,
    pub description: Option<String>,
    pub created_at: Timestamp,
}

// ---------------------------------------------------------------------------
// Create DTO
// ---------------------------------------------------------------------------

/// Input for appending one ledger entry.
#[derive(Debug, Clone)]
pub struct NewCreditTransaction {
    pub user_id: DbId,
    pub transaction_type: CreditTransactionType,
    pub amount: i64,
    pub expires_at: Option<Timestamp>,
    pub related_entity_id: Option<DbId>,
    pub related_entity_type: Option<RelatedEntityType>,
    pub description: String,
}
