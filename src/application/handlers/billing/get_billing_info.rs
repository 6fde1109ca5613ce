//! GetBillingInfoHandler - Next charge for a subscription.

use std::sync::Arc;

use crate::domain::billing::{BillingError, PlanCatalog, PREMIUM_PLAN_ID};
use crate::domain::foundation::{PlanId, Timestamp};
use crate::ports::BillingProvider;

use super::{ensure_configured, BillingInfo};

/// Query for billing information of a subscription.
#[derive(Debug, Clone)]
pub struct GetBillingInfoQuery {
    pub subscription_id: String,
}

/// Handler for billing information.
pub struct GetBillingInfoHandler {
    provider: Arc<dyn BillingProvider>,
    catalog: Arc<PlanCatalog>,
    stripe_configured: bool,
}

impl GetBillingInfoHandler {
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

    pub async fn handle(&self, query: GetBillingInfoQuery) -> Result<BillingInfo, BillingError> {
        ensure_configured(self.stripe_configured)?;

        let subscription = self
            .provider
            .get_subscription(&query.subscription_id)
            .await
            .map_err(|e| {
                tracing::error!(
                    subscription_id = %query.subscription_id,
                    error = %e,
                    "Stripe error fetching billing info"
                );
                BillingError::from(e)
            })?
            .ok_or_else(|| BillingError::subscription_not_found(&query.subscription_id))?;

        let plan_id = subscription
            .plan_id()
            .unwrap_or_else(|| PlanId::from(PREMIUM_PLAN_ID));
        let plan = self.catalog.get_plan(plan_id.as_str());

        Ok(BillingInfo {
            subscription_id: subscription.id.clone(),
            next_billing_date: subscription
                .current_period_end
                .and_then(Timestamp::from_unix_secs),
            amount: plan.map(|p| p.price()).unwrap_or(0.0),
            currency: plan
                .map(|p| p.currency.clone())
                .unwrap_or_else(|| "usd".to_string()),
            status: subscription.status,
            payment_method: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::stripe::MockBillingProvider;

    fn handler(provider: MockBillingProvider, configured: bool) -> GetBillingInfoHandler {
        GetBillingInfoHandler::new(
            Arc::new(provider),
            Arc::new(PlanCatalog::standard(None)),
            configured,
        )
    }

    fn query(id: &str) -> GetBillingInfoQuery {
        GetBillingInfoQuery {
            subscription_id: id.to_string(),
        }
    }

    #[tokio::test]
    async fn reports_plan_price_and_next_billing_date() {
        let handler = handler(
            MockBillingProvider::with_active_subscription("cus_1", "sub_1"),
            true,
        );

        let info = handler.handle(query("sub_1")).await.unwrap();

        assert_eq!(info.subscription_id, "sub_1");
        assert!((info.amount - 9.99).abs() < f64::EPSILON);
        assert_eq!(info.currency, "usd");
        assert!(info.next_billing_date.is_some());
        assert!(info.payment_method.is_none());
    }

    #[tokio::test]
    async fn missing_subscription_is_not_found() {
        let result = handler(MockBillingProvider::new(), true)
            .handle(query("sub_missing"))
            .await;

        assert!(matches!(result, Err(BillingError::SubscriptionNotFound(_))));
    }

    #[tokio::test]
    async fn unconfigured_stripe_is_rejected() {
        let result = handler(MockBillingProvider::new(), false)
            .handle(query("sub_1"))
            .await;

        assert_eq!(result.unwrap_err(), BillingError::NotConfigured);
    }
}
