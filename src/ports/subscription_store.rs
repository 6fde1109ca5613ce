//! Subscription store port.
//!
//! Persists one [`SubscriptionRecord`] per user. Implementations must merge
//! changes with [`SubscriptionChanges::apply`] semantics so every backend
//! agrees on the period window and re-creation rules.
//!
//! # Design
//!
//! - **Upsert by user**: `user_id` is the unique key
//! - **Conditional update by subscription**: webhook events only know the
//!   Stripe subscription ID, so updates match on it and report the row count
//! - **Never deletes**: canceled subscriptions stay as records

use async_trait::async_trait;

use crate::domain::billing::{SubscriptionChanges, SubscriptionRecord};
use crate::domain::foundation::{DomainError, UserId};

/// Repository port for per-user subscription records.
#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    /// Insert or update the record keyed by `user_id`.
    ///
    /// Returns the record as stored after the merge.
    ///
    /// # Errors
    ///
    /// - `DatabaseError` on persistence failure
    async fn upsert_by_user(
        &self,
        user_id: &UserId,
        changes: &SubscriptionChanges,
    ) -> Result<SubscriptionRecord, DomainError>;

    /// Apply `changes` to every record with this Stripe subscription ID.
    ///
    /// Returns the number of records updated; zero when none matches.
    ///
    /// # Errors
    ///
    /// - `DatabaseError` on persistence failure
    async fn update_by_subscription_id(
        &self,
        subscription_id: &str,
        changes: &SubscriptionChanges,
    ) -> Result<u64, DomainError>;

    /// Find the record of a user.
    async fn get_by_user(&self, user_id: &UserId)
        -> Result<Option<SubscriptionRecord>, DomainError>;
}
