//! Billing handlers.
//!
//! ## Commands
//! - Reconciling Stripe webhook deliveries into the subscription store
//! - Creating customers and subscriptions
//! - Cancelling at period end and reactivating
//!
//! ## Queries
//! - Get a subscription from Stripe
//! - Get a user's current plan
//! - Get billing information

mod create_customer;
mod create_subscription;
mod get_billing_info;
mod get_subscription;
mod get_user_status;
mod reconcile_webhook;
mod update_cancellation;
mod views;

use crate::domain::billing::BillingError;

// Commands
pub use create_customer::{CreateCustomerCommand, CreateCustomerHandler, CreateCustomerResult};
pub use create_subscription::{
    CreateSubscriptionCommand, CreateSubscriptionHandler, CreateSubscriptionResult,
};
pub use reconcile_webhook::{
    ReconcileOutcome, ReconcileWebhookCommand, WebhookAck, WebhookReconciler,
};
pub use update_cancellation::{
    CancellationAction, UpdateCancellationCommand, UpdateCancellationHandler,
    UpdateCancellationResult,
};

// Queries
pub use get_billing_info::{GetBillingInfoHandler, GetBillingInfoQuery};
pub use get_subscription::{GetSubscriptionHandler, GetSubscriptionQuery};
pub use get_user_status::{GetUserStatusHandler, GetUserStatusQuery};
pub use views::{BillingInfo, SubscriptionView, UserStatus};

/// Provider-backed operations refuse to run on incomplete Stripe credentials.
fn ensure_configured(stripe_configured: bool) -> Result<(), BillingError> {
    if stripe_configured {
        Ok(())
    } else {
        Err(BillingError::not_configured())
    }
}
