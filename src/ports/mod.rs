//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! - `BillingProvider` - Stripe customers, subscriptions and webhook verification
//! - `SubscriptionStore` - Per-user subscription records

mod billing_provider;
mod subscription_store;

pub use billing_provider::{
    BillingProvider, CreateCustomerRequest, CreateSubscriptionRequest, CreatedSubscription,
    Customer, PaymentError, PaymentErrorCode, Subscription,
};
pub use subscription_store::SubscriptionStore;
