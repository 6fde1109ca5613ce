//! HTTP adapter for billing endpoints.
//!
//! Exposes the billing application layer via REST API:
//! - `/api/subscriptions/*` - Plans, customers, subscriptions and user status
//! - `POST /api/webhooks/stripe` - Stripe webhook reconciliation
//! - `GET /health` - Liveness probe

pub mod dto;
pub mod handlers;
pub mod routes;

pub use dto::*;
pub use handlers::{BillingApiError, BillingAppState, StripeSettings, WebhookApiError};
pub use routes::{billing_router, subscription_routes, webhook_routes};
