//! Read models shared by the subscription query handlers.

use crate::domain::billing::{Plan, PlanCatalog, SubscriptionStatus, PREMIUM_PLAN_ID};
use crate::domain::foundation::{PlanId, Timestamp};
use crate::ports::Subscription;

/// A provider subscription joined with its catalog plan.
#[derive(Debug, Clone, PartialEq)]
pub struct SubscriptionView {
    pub id: String,
    pub status: SubscriptionStatus,
    pub plan_id: PlanId,
    /// Catalog name of the plan, `"Unknown"` when the plan is not in the catalog.
    pub plan_name: String,
    pub current_period_start: Option<Timestamp>,
    pub current_period_end: Option<Timestamp>,
    pub cancel_at_period_end: bool,
    pub created_at: Option<Timestamp>,
    pub updated_at: Timestamp,
}

impl SubscriptionView {
    /// Builds the view for `plan_id`, or for the plan in the subscription's
    /// metadata when `None`, defaulting to premium.
    pub fn build(
        subscription: &Subscription,
        plan_id: Option<PlanId>,
        catalog: &PlanCatalog,
        now: Timestamp,
    ) -> Self {
        let plan_id = plan_id
            .or_else(|| subscription.plan_id())
            .unwrap_or_else(|| PlanId::from(PREMIUM_PLAN_ID));
        let plan_name = catalog
            .get_plan(plan_id.as_str())
            .map(|plan| plan.name.clone())
            .unwrap_or_else(|| "Unknown".to_string());

        Self {
            id: subscription.id.clone(),
            status: subscription.status.clone(),
            plan_id,
            plan_name,
            current_period_start: subscription
                .current_period_start
                .and_then(Timestamp::from_unix_secs),
            current_period_end: subscription
                .current_period_end
                .and_then(Timestamp::from_unix_secs),
            cancel_at_period_end: subscription.cancel_at_period_end,
            created_at: Timestamp::from_unix_secs(subscription.created),
            updated_at: now,
        }
    }
}

/// What a user is entitled to right now.
#[derive(Debug, Clone, PartialEq)]
pub struct UserStatus {
    pub user_id: String,
    pub has_subscription: bool,
    pub subscription: Option<SubscriptionView>,
    pub plan: Plan,
}

impl UserStatus {
    /// The status of a user without an active subscription.
    pub fn free(user_id: impl Into<String>, catalog: &PlanCatalog) -> Self {
        Self {
            user_id: user_id.into(),
            has_subscription: false,
            subscription: None,
            plan: catalog.free_plan().clone(),
        }
    }

    pub fn features(&self) -> &[String] {
        &self.plan.features
    }

    pub fn limitations(&self) -> &[String] {
        &self.plan.limitations
    }
}

/// Upcoming charge for a subscription.
#[derive(Debug, Clone, PartialEq)]
pub struct BillingInfo {
    pub subscription_id: String,
    pub next_billing_date: Option<Timestamp>,
    /// Plan price in major units; zero when the plan is unknown.
    pub amount: f64,
    pub currency: String,
    pub status: SubscriptionStatus,
    /// Not exposed yet; always `None`.
    pub payment_method: Option<String>,
}
