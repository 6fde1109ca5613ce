//! In-Memory Subscription Store Adapter
//!
//! Keeps subscription records in a map keyed by user. Useful for tests and
//! for running the service without a database.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::RwLock;

use crate::domain::billing::{SubscriptionChanges, SubscriptionRecord};
use crate::domain::foundation::{DomainError, Timestamp, UserId};
use crate::ports::SubscriptionStore;

/// In-memory storage for subscription records
#[derive(Debug, Clone, Default)]
pub struct InMemorySubscriptionStore {
    records: Arc<RwLock<HashMap<UserId, SubscriptionRecord>>>,
    failures: Arc<Mutex<Failures>>,
}

#[derive(Debug, Default)]
struct Failures {
    reads: Option<String>,
    writes: Option<String>,
}

impl InMemorySubscriptionStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// True if no record has been written
    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    /// Make every subsequent write fail with a database error (for tests)
    pub fn fail_writes(&self, message: impl Into<String>) {
        self.failures().writes = Some(message.into());
    }

    /// Make every subsequent read fail with a database error (for tests)
    pub fn fail_reads(&self, message: impl Into<String>) {
        self.failures().reads = Some(message.into());
    }

    fn failures(&self) -> std::sync::MutexGuard<'_, Failures> {
        self.failures
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn check_writes(&self) -> Result<(), DomainError> {
        match &self.failures().writes {
            Some(message) => Err(DomainError::database(message.clone())),
            None => Ok(()),
        }
    }

    fn check_reads(&self) -> Result<(), DomainError> {
        match &self.failures().reads {
            Some(message) => Err(DomainError::database(message.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl SubscriptionStore for InMemorySubscriptionStore {
    async fn upsert_by_user(
        &self,
        user_id: &UserId,
        changes: &SubscriptionChanges,
    ) -> Result<SubscriptionRecord, DomainError> {
        self.check_writes()?;

        let now = Timestamp::now();
        let mut records = self.records.write().await;
        let record = records
            .entry(user_id.clone())
            .or_insert_with(|| SubscriptionRecord::new(user_id.clone(), now));
        changes.apply(record, now);

        Ok(record.clone())
    }

    async fn update_by_subscription_id(
        &self,
        subscription_id: &str,
        changes: &SubscriptionChanges,
    ) -> Result<u64, DomainError> {
        self.check_writes()?;

        let now = Timestamp::now();
        let mut records = self.records.write().await;
        let mut updated = 0;
        for record in records
            .values_mut()
            .filter(|r| r.stripe_subscription_id.as_deref() == Some(subscription_id))
        {
            changes.apply(record, now);
            updated += 1;
        }

        Ok(updated)
    }

    async fn get_by_user(
        &self,
        user_id: &UserId,
    ) -> Result<Option<SubscriptionRecord>, DomainError> {
        self.check_reads()?;

        Ok(self.records.read().await.get(user_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::billing::SubscriptionStatus;
    use crate::domain::foundation::ErrorCode;

    fn user(id: &str) -> UserId {
        UserId::new(id).unwrap()
    }

    #[tokio::test]
    async fn upsert_creates_then_merges() {
        let store = InMemorySubscriptionStore::new();

        store
            .upsert_by_user(&user("u1"), &SubscriptionChanges::new().customer_id("cus_1"))
            .await
            .unwrap();
        let record = store
            .upsert_by_user(
                &user("u1"),
                &SubscriptionChanges::new()
                    .subscription_id("sub_1")
                    .status(SubscriptionStatus::Active),
            )
            .await
            .unwrap();

        assert_eq!(store.len().await, 1);
        assert_eq!(record.stripe_customer_id.as_deref(), Some("cus_1"));
        assert_eq!(record.stripe_subscription_id.as_deref(), Some("sub_1"));
        assert_eq!(record.status, Some(SubscriptionStatus::Active));
    }

    #[tokio::test]
    async fn update_by_subscription_id_reports_matches() {
        let store = InMemorySubscriptionStore::new();
        store
            .upsert_by_user(&user("u1"), &SubscriptionChanges::new().subscription_id("sub_1"))
            .await
            .unwrap();

        let cancel = SubscriptionChanges::new().cancel_at_period_end(true);
        let hit = store.update_by_subscription_id("sub_1", &cancel).await.unwrap();
        let miss = store.update_by_subscription_id("sub_2", &cancel).await.unwrap();

        assert_eq!(hit, 1);
        assert_eq!(miss, 0);
        let record = store.get_by_user(&user("u1")).await.unwrap().unwrap();
        assert!(record.cancel_at_period_end);
    }

    #[tokio::test]
    async fn missing_user_is_none() {
        let store = InMemorySubscriptionStore::new();

        assert!(store.get_by_user(&user("nobody")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn injected_write_failure_is_database_error() {
        let store = InMemorySubscriptionStore::new();
        store.fail_writes("disk full");

        let err = store
            .upsert_by_user(&user("u1"), &SubscriptionChanges::new().customer_id("cus_1"))
            .await
            .unwrap_err();

        assert_eq!(err.code, ErrorCode::DatabaseError);
        assert!(store.is_empty().await);
        assert!(store.get_by_user(&user("u1")).await.is_ok());
    }

    #[tokio::test]
    async fn injected_read_failure_leaves_writes_working() {
        let store = InMemorySubscriptionStore::new();
        store.fail_reads("timeout");

        assert!(store.get_by_user(&user("u1")).await.is_err());
        assert!(store
            .upsert_by_user(&user("u1"), &SubscriptionChanges::new().customer_id("cus_1"))
            .await
            .is_ok());
    }
}
