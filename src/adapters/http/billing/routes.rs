//! Axum router configuration for billing endpoints.
//!
//! This module defines the route structure for the subscription API and the
//! Stripe webhook, and wires them to their corresponding handlers.

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{
    cancel_subscription, create_customer, create_subscription, get_billing_info, get_plans,
    get_stripe_config, get_subscription, get_user_status, handle_stripe_webhook, health,
    reactivate_subscription, BillingAppState,
};

/// Create the subscription API router.
///
/// # Routes
/// - `GET /plans` - Plan catalog
/// - `POST /create-customer` - Create a Stripe customer for a user
/// - `POST /create-subscription` - Subscribe a customer to a paid plan
/// - `GET /subscription/:subscription_id` - Subscription details from Stripe
/// - `POST /cancel-subscription` - Cancel at period end
/// - `POST /reactivate-subscription` - Undo a pending cancellation
/// - `GET /user-status/:user_id` - A user's current plan
/// - `GET /billing/:subscription_id` - Next charge and amount
/// - `GET /config` - Publishable key and plans
pub fn subscription_routes() -> Router<BillingAppState> {
    Router::new()
        .route("/plans", get(get_plans))
        .route("/create-customer", post(create_customer))
        .route("/create-subscription", post(create_subscription))
        .route("/subscription/:subscription_id", get(get_subscription))
        .route("/cancel-subscription", post(cancel_subscription))
        .route("/reactivate-subscription", post(reactivate_subscription))
        .route("/user-status/:user_id", get(get_user_status))
        .route("/billing/:subscription_id", get(get_billing_info))
        .route("/config", get(get_stripe_config))
}

/// Create the Stripe webhook router.
///
/// Separate from the subscription routes because deliveries are
/// authenticated by signature, not by caller.
///
/// # Routes
/// - `POST /stripe` - Handle Stripe webhooks
pub fn webhook_routes() -> Router<BillingAppState> {
    Router::new().route("/stripe", post(handle_stripe_webhook))
}

/// Create the complete billing router.
///
/// Mounts the subscription API at `/api/subscriptions`, the webhook at
/// `/api/webhooks` and a liveness probe at `/health`.
pub fn billing_router() -> Router<BillingAppState> {
    Router::new()
        .route("/health", get(health))
        .nest("/api/subscriptions", subscription_routes())
        .nest("/api/webhooks", webhook_routes())
}
