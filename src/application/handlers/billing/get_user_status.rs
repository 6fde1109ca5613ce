//! GetUserStatusHandler - What plan a user is on right now.
//!
//! The store says which subscription a user has; Stripe says whether it is
//! active. Any failure along the way degrades to the free plan instead of
//! failing the request, since this endpoint gates features in the client.

use std::sync::Arc;

use crate::domain::billing::{BillingError, PlanCatalog, SubscriptionStatus, PREMIUM_PLAN_ID};
use crate::domain::foundation::{DomainError, PlanId, Timestamp, UserId};
use crate::ports::{BillingProvider, SubscriptionStore};

use super::{SubscriptionView, UserStatus};

/// Query for a user's subscription status.
#[derive(Debug, Clone)]
pub struct GetUserStatusQuery {
    pub user_id: String,
}

/// Handler for user subscription status.
pub struct GetUserStatusHandler {
    provider: Arc<dyn BillingProvider>,
    store: Arc<dyn SubscriptionStore>,
    catalog: Arc<PlanCatalog>,
}

impl GetUserStatusHandler {
    pub fn new(
        provider: Arc<dyn BillingProvider>,
        store: Arc<dyn SubscriptionStore>,
        catalog: Arc<PlanCatalog>,
    ) -> Self {
        Self {
            provider,
            store,
            catalog,
        }
    }

    pub async fn handle(&self, query: GetUserStatusQuery) -> Result<UserStatus, BillingError> {
        let user_id = UserId::new(query.user_id)
            .map_err(|e| BillingError::validation("user_id", e.to_string()))?;

        let free = UserStatus::free(user_id.as_str(), &self.catalog);

        match self.active_status(&user_id).await {
            Ok(Some(status)) => Ok(status),
            Ok(None) => Ok(free),
            Err(e) => {
                tracing::warn!(user_id = %user_id, error = %e, "Failed to check subscription");
                Ok(free)
            }
        }
    }

    async fn active_status(&self, user_id: &UserId) -> Result<Option<UserStatus>, DomainError> {
        let record = match self.store.get_by_user(user_id).await? {
            Some(record) => record,
            None => return Ok(None),
        };
        let subscription_id = match &record.stripe_subscription_id {
            Some(id) => id,
            None => return Ok(None),
        };

        let subscription = match self.provider.get_subscription(subscription_id).await? {
            Some(subscription) => subscription,
            None => {
                tracing::warn!(
                    user_id = %user_id,
                    subscription_id = %subscription_id,
                    "Stored subscription not found at Stripe"
                );
                return Ok(None);
            }
        };

        if subscription.status != SubscriptionStatus::Active {
            return Ok(None);
        }

        let plan_id = record
            .plan_id
            .clone()
            .unwrap_or_else(|| PlanId::from(PREMIUM_PLAN_ID));
        let plan = match self.catalog.get_plan(plan_id.as_str()) {
            Some(plan) => plan.clone(),
            None => {
                tracing::warn!(user_id = %user_id, plan_id = %plan_id, "Stored plan not in catalog");
                return Ok(None);
            }
        };

        let view = SubscriptionView::build(
            &subscription,
            Some(plan_id),
            &self.catalog,
            Timestamp::now(),
        );

        Ok(Some(UserStatus {
            user_id: user_id.to_string(),
            has_subscription: true,
            subscription: Some(view),
            plan,
        }))
    }
}
