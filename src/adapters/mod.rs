//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `http` - Axum routes for the subscription API and the Stripe webhook
//! - `memory` - In-memory subscription store
//! - `postgres` - PostgreSQL subscription store
//! - `stripe` - Stripe REST client and a mock provider

pub mod http;
pub mod memory;
pub mod postgres;
pub mod stripe;

pub use memory::InMemorySubscriptionStore;
pub use postgres::PostgresSubscriptionStore;
pub use stripe::{MockBillingProvider, StripeBillingAdapter, StripeConfig};
