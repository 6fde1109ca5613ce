//! CreateSubscriptionHandler - Command handler for starting a paid subscription.

use std::sync::Arc;

use crate::domain::billing::{BillingError, PlanCatalog, SubscriptionChanges, SubscriptionStatus};
use crate::domain::foundation::{Timestamp, UserId};
use crate::ports::{BillingProvider, CreateSubscriptionRequest, SubscriptionStore};

use super::ensure_configured;

/// Command to subscribe a customer to a paid plan.
#[derive(Debug, Clone)]
pub struct CreateSubscriptionCommand {
    pub customer_id: String,
    pub plan_id: String,
    pub payment_method_id: String,
}

/// Result of subscription creation.
#[derive(Debug, Clone)]
pub struct CreateSubscriptionResult {
    pub subscription_id: String,
    /// Payment intent secret the front-end confirms the first payment with.
    pub client_secret: Option<String>,
    pub status: SubscriptionStatus,
}

/// Handler for creating subscriptions.
///
/// The subscription is created incomplete; it becomes active when the first
/// payment is confirmed and the webhooks for it arrive.
pub struct CreateSubscriptionHandler {
    provider: Arc<dyn BillingProvider>,
    store: Arc<dyn SubscriptionStore>,
    catalog: Arc<PlanCatalog>,
    stripe_configured: bool,
}

impl CreateSubscriptionHandler {
    pub fn new(
        provider: Arc<dyn BillingProvider>,
        store: Arc<dyn SubscriptionStore>,
        catalog: Arc<PlanCatalog>,
        stripe_configured: bool,
    ) -> Self {
        Self {
            provider,
            store,
            catalog,
            stripe_configured,
        }
    }

    pub async fn handle(
        &self,
        cmd: CreateSubscriptionCommand,
    ) -> Result<CreateSubscriptionResult, BillingError> {
        ensure_configured(self.stripe_configured)?;

        let plan = self
            .catalog
            .get_plan(&cmd.plan_id)
            .ok_or_else(|| BillingError::invalid_plan(&cmd.plan_id))?;
        if plan.is_free() {
            return Err(BillingError::FreePlan);
        }
        let price_id = plan.stripe_price_id.clone().ok_or_else(|| {
            tracing::error!(plan_id = %plan.id, "Plan has no Stripe price configured");
            BillingError::NotConfigured
        })?;

        self.provider
            .attach_payment_method(&cmd.payment_method_id, &cmd.customer_id)
            .await?;
        self.provider
            .set_default_payment_method(&cmd.customer_id, &cmd.payment_method_id)
            .await?;

        let user_id = self.resolve_user(&cmd.customer_id).await;

        let created = self
            .provider
            .create_subscription(CreateSubscriptionRequest {
                customer_id: cmd.customer_id.clone(),
                price_id,
                plan_id: plan.id.clone(),
                user_id: user_id.clone(),
            })
            .await
            .map_err(|e| {
                tracing::error!(
                    customer_id = %cmd.customer_id,
                    error = %e,
                    "Stripe error creating subscription"
                );
                BillingError::from(e)
            })?;
        let subscription = created.subscription;

        match user_id {
            Some(user_id) => {
                let changes = SubscriptionChanges::new()
                    .customer_id(cmd.customer_id.clone())
                    .subscription_id(subscription.id.clone())
                    .plan(plan.id.clone())
                    .status(subscription.status.clone())
                    .period(
                        subscription
                            .current_period_start
                            .and_then(Timestamp::from_unix_secs),
                        subscription
                            .current_period_end
                            .and_then(Timestamp::from_unix_secs),
                    )
                    .cancel_at_period_end(subscription.cancel_at_period_end);

                if let Err(e) = self.store.upsert_by_user(&user_id, &changes).await {
                    tracing::warn!(user_id = %user_id, error = %e, "Failed to store subscription");
                }
            }
            None => tracing::warn!(
                customer_id = %cmd.customer_id,
                subscription_id = %subscription.id,
                "Customer has no user_id metadata, subscription not stored"
            ),
        }

        tracing::info!(
            subscription_id = %subscription.id,
            plan_id = %plan.id,
            status = %subscription.status,
            "Created subscription"
        );

        Ok(CreateSubscriptionResult {
            subscription_id: subscription.id,
            client_secret: created.client_secret,
            status: subscription.status,
        })
    }

    async fn resolve_user(&self, customer_id: &str) -> Option<UserId> {
        match self.provider.get_customer(customer_id).await {
            Ok(customer) => customer.and_then(|c| c.user_id()),
            Err(e) => {
                tracing::warn!(customer_id = %customer_id, error = %e, "Customer lookup failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemorySubscriptionStore;
    use crate::adapters::stripe::MockBillingProvider;
    use crate::domain::foundation::PlanId;
    use crate::ports::{CreateCustomerRequest, PaymentError};

    struct Fixture {
        provider: Arc<MockBillingProvider>,
        store: Arc<InMemorySubscriptionStore>,
        handler: CreateSubscriptionHandler,
    }

    fn fixture(price_id: Option<&str>) -> Fixture {
        let provider = Arc::new(MockBillingProvider::new());
        let store = Arc::new(InMemorySubscriptionStore::new());
        let catalog = Arc::new(PlanCatalog::standard(price_id.map(String::from)));
        let handler =
            CreateSubscriptionHandler::new(provider.clone(), store.clone(), catalog, true);
        Fixture {
            provider,
            store,
            handler,
        }
    }

    fn command(customer_id: &str, plan_id: &str) -> CreateSubscriptionCommand {
        CreateSubscriptionCommand {
            customer_id: customer_id.to_string(),
            plan_id: plan_id.to_string(),
            payment_method_id: "pm_card_visa".to_string(),
        }
    }

    async fn customer_for(provider: &MockBillingProvider, user_id: &str) -> String {
        provider
            .create_customer(CreateCustomerRequest {
                user_id: UserId::new(user_id).unwrap(),
                email: "user@example.com".to_string(),
                name: None,
            })
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn creates_subscription_and_stores_it_for_customer_user() {
        let f = fixture(Some("price_premium"));
        let customer_id = customer_for(&f.provider, "user-1").await;

        let result = f.handler.handle(command(&customer_id, "premium")).await.unwrap();

        assert_eq!(result.status, SubscriptionStatus::Incomplete);
        assert!(result.client_secret.is_some());
        assert_eq!(f.provider.call_count("attach_payment_method"), 1);
        assert_eq!(f.provider.call_count("set_default_payment_method"), 1);

        let record = f
            .store
            .get_by_user(&UserId::new("user-1").unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.stripe_subscription_id, Some(result.subscription_id));
        assert_eq!(record.plan_id, Some(PlanId::from("premium")));
    }

    #[tokio::test]
    async fn subscription_metadata_carries_plan_and_user() {
        let f = fixture(Some("price_premium"));
        let customer_id = customer_for(&f.provider, "user-1").await;

        let result = f.handler.handle(command(&customer_id, "premium")).await.unwrap();

        let subscription = f
            .provider
            .get_subscription(&result.subscription_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(subscription.plan_id(), Some(PlanId::from("premium")));
        assert_eq!(
            subscription.metadata.get("user_id").map(String::as_str),
            Some("user-1")
        );
        assert_eq!(subscription.price_id.as_deref(), Some("price_premium"));
    }

    #[tokio::test]
    async fn unknown_plan_is_rejected() {
        let f = fixture(Some("price_premium"));

        let result = f.handler.handle(command("cus_1", "enterprise")).await;

        assert_eq!(result.unwrap_err().message(), "Invalid plan ID");
        assert!(f.provider.calls().is_empty());
    }

    #[tokio::test]
    async fn free_plan_is_rejected() {
        let f = fixture(Some("price_premium"));

        let result = f.handler.handle(command("cus_1", "free")).await;

        assert_eq!(result.unwrap_err(), BillingError::FreePlan);
    }

    #[tokio::test]
    async fn missing_price_configuration_is_not_configured() {
        let f = fixture(None);

        let result = f.handler.handle(command("cus_1", "premium")).await;

        assert_eq!(result.unwrap_err(), BillingError::NotConfigured);
    }

    #[tokio::test]
    async fn declined_payment_method_is_provider_error() {
        let f = fixture(Some("price_premium"));
        f.provider.set_method_error(
            "attach_payment_method",
            PaymentError::card_declined("Your card was declined."),
        );

        let result = f.handler.handle(command("cus_1", "premium")).await;

        assert_eq!(
            result.unwrap_err(),
            BillingError::Provider("Your card was declined.".to_string())
        );
        assert!(!f.provider.was_called("create_subscription"));
    }

    #[tokio::test]
    async fn customer_without_user_still_gets_subscription() {
        let f = fixture(Some("price_premium"));

        let result = f.handler.handle(command("cus_unknown", "premium")).await;

        assert!(result.is_ok());
        assert!(f.store.is_empty().await);
    }
}
