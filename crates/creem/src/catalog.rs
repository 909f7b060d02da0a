//! Product catalog: plan tier × billing cycle -> Creem product id.

use vireo_core::plan::{BillingCycle, PlanTier};

/// Per-environment mapping of plans to Creem product ids.
///
/// Unconfigured cells are `None`; callers treat a missing cell as a
/// server configuration error rather than falling back silently.
#[derive(Debug, Clone, Default)]
pub struct ProductCatalog {
    pub basic_monthly: Option<String>,
    pub basic_yearly: Option<String>,
    pub pro_monthly: Option<String>,
    pub pro_yearly: Option<String>,
    pub max_monthly: Option<String>,
    pub max_yearly: Option<String>,
}

impl ProductCatalog {
    /// Load the catalog from `CREEM_{TIER}_{CYCLE}_PRODUCT_ID` env vars.
    /// Empty values count as unset.
    pub fn from_env() -> Self {
        fn non_empty(var: &str) -> Option<String> {
            std::env::var(var).ok().filter(|v| !v.is_empty())
        }
        Self {
            basic_monthly: non_empty("CREEM_BASIC_MONTHLY_PRODUCT_ID"),
            basic_yearly: non_empty("CREEM_BASIC_YEARLY_PRODUCT_ID"),
            pro_monthly: non_empty("CREEM_PRO_MONTHLY_PRODUCT_ID"),
            pro_yearly: non_empty("CREEM_PRO_YEARLY_PRODUCT_ID"),
            max_monthly: non_empty("CREEM_MAX_MONTHLY_PRODUCT_ID"),
            max_yearly: non_empty("CREEM_MAX_YEARLY_PRODUCT_ID"),
        }
    }

    /// Product id for a plan, if configured.
    pub fn lookup(&self, tier: PlanTier, cycle: BillingCycle) -> Option<&str> {
        let cell = match (tier, cycle) {
            (PlanTier::Basic, BillingCycle::Monthly) => &self.basic_monthly,
            (PlanTier::Basic, BillingCycle::Yearly) => &self.basic_yearly,
            (PlanTier::Pro, BillingCycle::Monthly) => &self.pro_monthly,
            (PlanTier::Pro, BillingCycle::Yearly) => &self.pro_yearly,
            (PlanTier::Max, BillingCycle::Monthly) => &self.max_monthly,
            (PlanTier::Max, BillingCycle::Yearly) => &self.max_yearly,
        };
        cell.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_returns_configured_cells() {
        let catalog = ProductCatalog {
            pro_monthly: Some("prod_123".into()),
            ..Default::default()
        };
        assert_eq!(
            catalog.lookup(PlanTier::Pro, BillingCycle::Monthly),
            Some("prod_123")
        );
        assert_eq!(catalog.lookup(PlanTier::Pro, BillingCycle::Yearly), None);
        assert_eq!(catalog.lookup(PlanTier::Max, BillingCycle::Monthly), None);
    }
}
