//! In-memory adapters.
//!
//! Used when no database URL is configured, and by tests.

mod in_memory_subscription_store;

pub use in_memory_subscription_store::InMemorySubscriptionStore;
