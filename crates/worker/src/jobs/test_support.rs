//! Shared in-memory ledger fake for job tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use vireo_core::types::{DbId, Timestamp};
use vireo_db::models::credit::NewCreditTransaction;

use crate::store::{CreditLedger, StoreError};

/// In-memory [`CreditLedger`] recording every grant it receives.
pub struct FakeLedger {
    expiries: HashMap<DbId, Timestamp>,
    failing_expiries: HashSet<DbId>,
    fail_grants: bool,
    grants: Mutex<Vec<NewCreditTransaction>>,
}

impl FakeLedger {
    pub fn new() -> Self {
        Self {
            expiries: HashMap::new(),
            failing_expiries: HashSet::new(),
            fail_grants: false,
            grants: Mutex::new(Vec::new()),
        }
    }

    /// Register the latest refill expiry for a subscription id.
    pub fn with_expiry(mut self, subscription_id: DbId, expiry: Timestamp) -> Self {
        self.expiries.insert(subscription_id, expiry);
        self
    }

    /// Make expiry lookups for a subscription id fail.
    pub fn failing_expiry_for(mut self, subscription_id: DbId) -> Self {
        self.failing_expiries.insert(subscription_id);
        self
    }

    /// Make every grant fail.
    pub fn failing_grants(mut self) -> Self {
        self.fail_grants = true;
        self
    }

    /// Grants recorded so far, in arrival order.
    pub fn grants(&self) -> Vec<NewCreditTransaction> {
        self.grants.lock().unwrap().clone()
    }
}

#[async_trait]
impl CreditLedger for FakeLedger {
    async fn latest_refill_expiry(
        &self,
        _user_id: DbId,
        subscription_id: DbId,
    ) -> Result<Option<Timestamp>, StoreError> {
        if self.failing_expiries.contains(&subscription_id) {
            return Err(StoreError::Unavailable("expiry lookup failed".into()));
        }
        Ok(self.expiries.get(&subscription_id).copied())
    }

    async fn add_credits(&self, entry: NewCreditTransaction) -> Result<(), StoreError> {
        if self.fail_grants {
            return Err(StoreError::Unavailable("grant failed".into()));
        }
        self.grants.lock().unwrap().push(entry);
        Ok(())
    }
}
