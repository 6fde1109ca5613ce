//! GetSubscriptionHandler - Query handler for a provider subscription.

use std::sync::Arc;

use crate::domain::billing::{BillingError, PlanCatalog};
use crate::domain::foundation::Timestamp;
use crate::ports::BillingProvider;

use super::{ensure_configured, SubscriptionView};

/// Query for one subscription by Stripe ID.
#[derive(Debug, Clone)]
pub struct GetSubscriptionQuery {
    pub subscription_id: String,
}

/// Handler for reading a subscription straight from Stripe.
pub struct GetSubscriptionHandler {
    provider: Arc<dyn BillingProvider>,
    catalog: Arc<PlanCatalog>,
    stripe_configured: bool,
}

impl GetSubscriptionHandler {
    pub fn new(
        provider: Arc<dyn BillingProvider>,
        catalog: Arc<PlanCatalog>,
        stripe_configured: bool,
    ) -> Self {
        Self {
            provider,
            catalog,
            stripe_configured,
        }
    }

    pub async fn handle(&self, query: GetSubscriptionQuery) -> Result<SubscriptionView, BillingError> {
        ensure_configured(self.stripe_configured)?;

        let subscription = self
            .provider
            .get_subscription(&query.subscription_id)
            .await
            .map_err(|e| {
                tracing::error!(
                    subscription_id = %query.subscription_id,
                    error = %e,
                    "Stripe error fetching subscription"
                );
                BillingError::from(e)
            })?
            .ok_or_else(|| BillingError::subscription_not_found(&query.subscription_id))?;

        Ok(SubscriptionView::build(
            &subscription,
            None,
            &self.catalog,
            Timestamp::now(),
        ))
    }
}
