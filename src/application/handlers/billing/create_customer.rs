//! CreateCustomerHandler - Command handler for creating Stripe customers.

use std::sync::Arc;

use crate::domain::billing::{BillingError, SubscriptionChanges};
use crate::domain::foundation::UserId;
use crate::ports::{BillingProvider, CreateCustomerRequest, Customer, SubscriptionStore};

use super::ensure_configured;

/// Command to create a customer for a user.
#[derive(Debug, Clone)]
pub struct CreateCustomerCommand {
    pub user_id: String,
    pub email: String,
    pub name: Option<String>,
}

/// Result of customer creation.
#[derive(Debug, Clone)]
pub struct CreateCustomerResult {
    pub customer: Customer,
}

/// Handler for creating Stripe customers.
///
/// The customer carries the internal user ID as metadata, which is how the
/// webhook reconciler later finds the user for a new subscription.
pub struct CreateCustomerHandler {
    provider: Arc<dyn BillingProvider>,
    store: Arc<dyn SubscriptionStore>,
    stripe_configured: bool,
}

impl CreateCustomerHandler {
    pub fn new(
        provider: Arc<dyn BillingProvider>,
        store: Arc<dyn SubscriptionStore>,
        stripe_configured: bool,
    ) -> Self {
        Self {
            provider,
            store,
            stripe_configured,
        }
    }

    pub async fn handle(
        &self,
        cmd: CreateCustomerCommand,
    ) -> Result<CreateCustomerResult, BillingError> {
        ensure_configured(self.stripe_configured)?;

        let user_id = UserId::new(cmd.user_id)
            .map_err(|e| BillingError::validation("user_id", e.to_string()))?;
        if cmd.email.trim().is_empty() {
            return Err(BillingError::validation("email", "cannot be empty"));
        }

        let customer = self
            .provider
            .create_customer(CreateCustomerRequest {
                user_id: user_id.clone(),
                email: cmd.email.clone(),
                name: cmd.name,
            })
            .await
            .map_err(|e| {
                tracing::error!(user_id = %user_id, error = %e, "Stripe error creating customer");
                BillingError::from(e)
            })?;

        let changes = SubscriptionChanges::new()
            .customer_id(customer.id.clone())
            .email(cmd.email);
        if let Err(e) = self.store.upsert_by_user(&user_id, &changes).await {
            tracing::warn!(user_id = %user_id, error = %e, "Failed to store customer");
        }

        tracing::info!(user_id = %user_id, customer_id = %customer.id, "Created customer");
        Ok(CreateCustomerResult { customer })
    }
}
