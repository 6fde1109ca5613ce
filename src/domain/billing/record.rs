//! Per-user subscription record and the partial updates applied to it.
//!
//! The record is a cache of the provider's last reported state. Every write
//! goes through [`SubscriptionChanges::apply`], which is where the merge rules
//! live so that every store implementation agrees on them:
//!
//! - absent fields are left untouched, present fields overwrite
//! - `updated_at` is always bumped, `created_at` is only set on insert
//! - the billing period window only moves forward for the same subscription
//! - a new `stripe_subscription_id` is a re-creation and resets the window

use serde::{Deserialize, Serialize};

use super::SubscriptionStatus;
use crate::domain::foundation::{PlanId, Timestamp, UserId};

/// One row of the subscription store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionRecord {
    pub user_id: UserId,
    pub stripe_customer_id: Option<String>,
    pub stripe_subscription_id: Option<String>,
    pub plan_id: Option<PlanId>,
    pub email: Option<String>,
    pub status: Option<SubscriptionStatus>,
    pub current_period_start: Option<Timestamp>,
    pub current_period_end: Option<Timestamp>,
    pub cancel_at_period_end: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl SubscriptionRecord {
    /// An empty record for a user seen for the first time.
    pub fn new(user_id: UserId, now: Timestamp) -> Self {
        Self {
            user_id,
            stripe_customer_id: None,
            stripe_subscription_id: None,
            plan_id: None,
            email: None,
            status: None,
            current_period_start: None,
            current_period_end: None,
            cancel_at_period_end: false,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update of a [`SubscriptionRecord`].
///
/// An empty patch is meaningful: applying it only touches `updated_at`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubscriptionChanges {
    pub stripe_customer_id: Option<String>,
    pub stripe_subscription_id: Option<String>,
    pub plan_id: Option<PlanId>,
    pub email: Option<String>,
    pub status: Option<SubscriptionStatus>,
    pub current_period_start: Option<Timestamp>,
    pub current_period_end: Option<Timestamp>,
    pub cancel_at_period_end: Option<bool>,
}

impl SubscriptionChanges {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn customer_id(mut self, id: impl Into<String>) -> Self {
        self.stripe_customer_id = Some(id.into());
        self
    }

    pub fn subscription_id(mut self, id: impl Into<String>) -> Self {
        self.stripe_subscription_id = Some(id.into());
        self
    }

    pub fn plan(mut self, plan_id: PlanId) -> Self {
        self.plan_id = Some(plan_id);
        self
    }

    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn status(mut self, status: SubscriptionStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Sets the billing period; either bound may be unknown.
    pub fn period(mut self, start: Option<Timestamp>, end: Option<Timestamp>) -> Self {
        self.current_period_start = start;
        self.current_period_end = end;
        self
    }

    pub fn cancel_at_period_end(mut self, cancel: bool) -> Self {
        self.cancel_at_period_end = Some(cancel);
        self
    }

    /// Returns true if the patch carries no field values.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Returns true if applying the patch to `record` re-creates the subscription.
    pub fn is_recreation_of(&self, record: &SubscriptionRecord) -> bool {
        match (&self.stripe_subscription_id, &record.stripe_subscription_id) {
            (Some(new), Some(old)) => new != old,
            _ => false,
        }
    }

    /// Merges the patch into `record`.
    pub fn apply(&self, record: &mut SubscriptionRecord, now: Timestamp) {
        let recreated = self.is_recreation_of(record);

        if let Some(id) = &self.stripe_customer_id {
            record.stripe_customer_id = Some(id.clone());
        }
        if let Some(id) = &self.stripe_subscription_id {
            record.stripe_subscription_id = Some(id.clone());
        }
        if let Some(plan_id) = &self.plan_id {
            record.plan_id = Some(plan_id.clone());
        }
        if let Some(email) = &self.email {
            record.email = Some(email.clone());
        }
        if let Some(status) = &self.status {
            record.status = Some(status.clone());
        }
        if let Some(cancel) = self.cancel_at_period_end {
            record.cancel_at_period_end = cancel;
        }

        if recreated {
            record.current_period_start = self.current_period_start;
            record.current_period_end = self.current_period_end;
        } else if self.moves_period_forward(record) {
            if let Some(start) = self.current_period_start {
                record.current_period_start = Some(start);
            }
            if let Some(end) = self.current_period_end {
                record.current_period_end = Some(end);
            }
        }

        record.updated_at = now;
    }

    /// A window ending before the stored one belongs to an older delivery.
    /// Without an end the window cannot be ordered, so it only fills an
    /// empty record.
    fn moves_period_forward(&self, record: &SubscriptionRecord) -> bool {
        match (self.current_period_end, record.current_period_end) {
            (Some(new_end), Some(stored_end)) => !new_end.is_before(&stored_end),
            (None, Some(_)) => false,
            (_, None) => true,
        }
    }
}
