//! Subscription plan catalog.
//!
//! Plans are static configuration: the free tier and the paid tiers, each with
//! a price, billing interval, and the feature/limitation lists shown to users.
//! Paid plans carry the Stripe price ID used when creating subscriptions and
//! when mapping a webhook's subscription items back to a plan.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::PlanId;

/// ID of the always-available free plan.
pub const FREE_PLAN_ID: &str = "free";

/// ID of the default paid plan.
pub const PREMIUM_PLAN_ID: &str = "premium";

/// Billing interval of a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanInterval {
    /// Never billed.
    Forever,
    /// Billed monthly.
    Month,
    /// Billed yearly.
    Year,
}

/// A subscription plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    pub id: PlanId,
    pub name: String,
    /// Price in the currency's minor unit (cents).
    pub price_cents: u64,
    /// ISO currency code, lowercase as Stripe uses it.
    pub currency: String,
    pub interval: PlanInterval,
    /// Stripe price ID; `None` for the free plan or when not configured.
    pub stripe_price_id: Option<String>,
    pub features: Vec<String>,
    pub limitations: Vec<String>,
}

impl Plan {
    /// Returns true if the plan costs nothing.
    pub fn is_free(&self) -> bool {
        self.price_cents == 0
    }

    /// Price in major units (e.g. `9.99`).
    pub fn price(&self) -> f64 {
        self.price_cents as f64 / 100.0
    }
}

/// Read-only catalog of the plans offered.
#[derive(Debug, Clone)]
pub struct PlanCatalog {
    free: Plan,
    paid: Vec<Plan>,
}

impl PlanCatalog {
    /// Creates a catalog from a free plan and the paid plans.
    ///
    /// The first paid plan is the default used when a subscription's price
    /// cannot be mapped to a plan.
    pub fn new(free: Plan, paid: Vec<Plan>) -> Self {
        Self { free, paid }
    }

    /// The standard Free/Premium catalog.
    pub fn standard(premium_price_id: Option<String>) -> Self {
        let free = Plan {
            id: PlanId::from(FREE_PLAN_ID),
            name: "Free".to_string(),
            price_cents: 0,
            currency: "usd".to_string(),
            interval: PlanInterval::Forever,
            stripe_price_id: None,
            features: strings(&[
                "Block up to 5 keywords",
                "Basic analytics dashboard",
                "Community support",
                "YouTube & X filtering",
                "Basic keyword management",
            ]),
            limitations: strings(&[
                "Limited to 5 keywords",
                "Basic analytics only",
                "No priority support",
            ]),
        };

        let premium = Plan {
            id: PlanId::from(PREMIUM_PLAN_ID),
            name: "Premium".to_string(),
            price_cents: 999,
            currency: "usd".to_string(),
            interval: PlanInterval::Month,
            stripe_price_id: premium_price_id.filter(|id| !id.is_empty()),
            features: strings(&[
                "Unlimited keywords",
                "Advanced analytics & reports",
                "Priority support",
                "All platforms (YouTube, X, LinkedIn, Reddit)",
                "Advanced keyword management",
                "Real-time notifications",
                "Export data",
                "Custom filtering rules",
            ]),
            limitations: Vec::new(),
        };

        Self::new(free, vec![premium])
    }

    /// Looks up a plan by ID.
    pub fn get_plan(&self, plan_id: &str) -> Option<&Plan> {
        self.list_plans().find(|plan| plan.id.as_str() == plan_id)
    }

    /// All plans, free plan first.
    pub fn list_plans(&self) -> impl Iterator<Item = &Plan> {
        std::iter::once(&self.free).chain(self.paid.iter())
    }

    /// Maps a Stripe price ID back to the plan that uses it.
    pub fn plan_for_price(&self, price_id: &str) -> Option<&Plan> {
        self.paid
            .iter()
            .find(|plan| plan.stripe_price_id.as_deref() == Some(price_id))
    }

    /// The plan every user has without a subscription.
    pub fn free_plan(&self) -> &Plan {
        &self.free
    }

    /// The paid plan assumed when a price cannot be mapped.
    pub fn default_paid_plan(&self) -> Option<&Plan> {
        self.paid.first()
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> PlanCatalog {
        PlanCatalog::standard(Some("price_premium_monthly".to_string()))
    }

    #[test]
    fn list_plans_returns_free_first() {
        let ids: Vec<_> = catalog().list_plans().map(|p| p.id.to_string()).collect();
        assert_eq!(ids, vec!["free", "premium"]);
    }

    #[test]
    fn get_plan_finds_known_plans() {
        let catalog = catalog();
        assert_eq!(catalog.get_plan("free").unwrap().name, "Free");
        assert_eq!(catalog.get_plan("premium").unwrap().price_cents, 999);
    }

    #[test]
    fn get_plan_returns_none_for_unknown_id() {
        assert!(catalog().get_plan("enterprise").is_none());
    }

    #[test]
    fn plan_for_price_maps_configured_price() {
        let catalog = catalog();
        let plan = catalog.plan_for_price("price_premium_monthly").unwrap();
        assert_eq!(plan.id.as_str(), PREMIUM_PLAN_ID);
    }

    #[test]
    fn plan_for_price_ignores_unknown_price() {
        assert!(catalog().plan_for_price("price_other").is_none());
    }

    #[test]
    fn empty_price_id_is_treated_as_unconfigured() {
        let catalog = PlanCatalog::standard(Some(String::new()));
        assert!(catalog.get_plan("premium").unwrap().stripe_price_id.is_none());
        assert!(catalog.plan_for_price("").is_none());
    }

    #[test]
    fn free_plan_is_free() {
        let catalog = catalog();
        assert!(catalog.free_plan().is_free());
        assert_eq!(catalog.free_plan().interval, PlanInterval::Forever);
        assert_eq!(catalog.free_plan().limitations.len(), 3);
    }

    #[test]
    fn premium_price_in_major_units() {
        let catalog = catalog();
        let premium = catalog.default_paid_plan().unwrap();
        assert!(!premium.is_free());
        assert!((premium.price() - 9.99).abs() < f64::EPSILON);
        assert!(premium.limitations.is_empty());
    }
}
