//! UpdateCancellationHandler - Cancel at period end, or undo it.

use std::sync::Arc;

use crate::domain::billing::{BillingError, SubscriptionChanges};
use crate::ports::{BillingProvider, SubscriptionStore};

use super::ensure_configured;

/// Which way the cancellation flag is being moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancellationAction {
    Cancel,
    Reactivate,
}

impl CancellationAction {
    /// The action verb callers must send.
    pub fn as_str(&self) -> &'static str {
        match self {
            CancellationAction::Cancel => "cancel",
            CancellationAction::Reactivate => "reactivate",
        }
    }

    fn cancel_at_period_end(&self) -> bool {
        matches!(self, CancellationAction::Cancel)
    }

    fn confirmation(&self) -> &'static str {
        match self {
            CancellationAction::Cancel => {
                "Subscription will be canceled at the end of the current period"
            }
            CancellationAction::Reactivate => "Subscription has been reactivated",
        }
    }
}

/// Command to set or clear cancel-at-period-end.
#[derive(Debug, Clone)]
pub struct UpdateCancellationCommand {
    pub subscription_id: String,
    /// Action verb from the request body; must match the endpoint's action.
    pub action: String,
}

/// Result of a cancellation update.
#[derive(Debug, Clone)]
pub struct UpdateCancellationResult {
    pub cancel_at_period_end: bool,
    pub message: &'static str,
}

/// Handler for one direction of the cancellation flag.
pub struct UpdateCancellationHandler {
    provider: Arc<dyn BillingProvider>,
    store: Arc<dyn SubscriptionStore>,
    action: CancellationAction,
    stripe_configured: bool,
}

impl UpdateCancellationHandler {
    pub fn new(
        provider: Arc<dyn BillingProvider>,
        store: Arc<dyn SubscriptionStore>,
        action: CancellationAction,
        stripe_configured: bool,
    ) -> Self {
        Self {
            provider,
            store,
            action,
            stripe_configured,
        }
    }

    pub async fn handle(
        &self,
        cmd: UpdateCancellationCommand,
    ) -> Result<UpdateCancellationResult, BillingError> {
        ensure_configured(self.stripe_configured)?;

        if cmd.action != self.action.as_str() {
            return Err(BillingError::invalid_action(self.action.as_str(), cmd.action));
        }

        let cancel = self.action.cancel_at_period_end();
        let subscription = self
            .provider
            .set_cancel_at_period_end(&cmd.subscription_id, cancel)
            .await
            .map_err(|e| {
                tracing::error!(
                    subscription_id = %cmd.subscription_id,
                    action = self.action.as_str(),
                    error = %e,
                    "Stripe error updating cancellation"
                );
                BillingError::from(e)
            })?;

        let changes = SubscriptionChanges::new().cancel_at_period_end(cancel);
        if let Err(e) = self
            .store
            .update_by_subscription_id(&cmd.subscription_id, &changes)
            .await
        {
            tracing::warn!(
                subscription_id = %cmd.subscription_id,
                error = %e,
                "Failed to update subscription"
            );
        }

        tracing::info!(
            subscription_id = %cmd.subscription_id,
            cancel_at_period_end = subscription.cancel_at_period_end,
            "Updated cancellation"
        );

        Ok(UpdateCancellationResult {
            cancel_at_period_end: subscription.cancel_at_period_end,
            message: self.action.confirmation(),
        })
    }
}
