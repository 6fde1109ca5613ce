//! Stripe billing provider adapter.
//!
//! Implements the `BillingProvider` port for Stripe integration:
//! - Customer management and payment method attachment
//! - Subscription creation, lookup and cancel-at-period-end
//!
//! Webhook signature verification lives in the domain
//! (`StripeWebhookVerifier`) and is shared by every provider through the
//! port's default method.
//!
//! # Security
//!
//! - The API key is held as `secrecy::SecretString` and redacted from `Debug`
//! - Requests go over HTTPS with the key as basic-auth username

mod api_types;
mod mock_billing_provider;
mod stripe_adapter;

pub use api_types::{StripeCustomer, StripeSubscription};
pub use mock_billing_provider::{MethodCall, MockBillingProvider};
pub use stripe_adapter::{StripeBillingAdapter, StripeConfig};
