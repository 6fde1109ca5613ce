//! WebhookReconciler - Command handler for Stripe webhook deliveries.
//!
//! Verifies the signature over the raw body, parses the event envelope and
//! applies the event to the subscription store. Only configuration,
//! authenticity and envelope failures are returned to the caller; anything
//! that goes wrong while applying an event is logged and acknowledged so
//! Stripe does not redeliver it.

use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};

use crate::domain::billing::{
    InvoiceObject, PlanCatalog, SignatureTolerance, StripeEvent, StripeEventType,
    SubscriptionChanges, SubscriptionObject, SubscriptionStatus, WebhookError,
};
use crate::domain::foundation::PlanId;
use crate::ports::{BillingProvider, SubscriptionStore};

/// Command to reconcile one webhook delivery.
#[derive(Debug, Clone)]
pub struct ReconcileWebhookCommand {
    /// Raw request body, exactly as received.
    pub payload: Vec<u8>,
    /// Value of the `stripe-signature` header, if present.
    pub signature: Option<String>,
}

/// What applying an event did to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The store was written.
    Applied,
    /// The event was understood but there was nothing to write.
    Skipped { reason: String },
    /// Applying the event failed; the failure was logged and swallowed.
    Failed { reason: String },
    /// Event type not handled by this service.
    Unhandled,
}

impl ReconcileOutcome {
    fn skipped(reason: impl Into<String>) -> Self {
        ReconcileOutcome::Skipped {
            reason: reason.into(),
        }
    }
}

/// Acknowledgement for a verified delivery.
#[derive(Debug, Clone)]
pub struct WebhookAck {
    pub event_id: String,
    /// Event type string as Stripe sent it.
    pub event_type: String,
    pub outcome: ReconcileOutcome,
}

/// Handler for Stripe webhook deliveries.
pub struct WebhookReconciler {
    provider: Arc<dyn BillingProvider>,
    store: Arc<dyn SubscriptionStore>,
    catalog: Arc<PlanCatalog>,
    webhook_secret: Option<SecretString>,
    tolerance: SignatureTolerance,
}

impl WebhookReconciler {
    pub fn new(
        provider: Arc<dyn BillingProvider>,
        store: Arc<dyn SubscriptionStore>,
        catalog: Arc<PlanCatalog>,
        webhook_secret: Option<SecretString>,
    ) -> Self {
        Self {
            provider,
            store,
            catalog,
            webhook_secret,
            tolerance: SignatureTolerance::default(),
        }
    }

    /// Overrides the signature timestamp tolerance.
    pub fn with_tolerance(mut self, tolerance: SignatureTolerance) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub async fn handle(&self, cmd: ReconcileWebhookCommand) -> Result<WebhookAck, WebhookError> {
        // 1. Configuration
        let secret = match &self.webhook_secret {
            Some(secret) if !secret.expose_secret().is_empty() => secret,
            _ => {
                tracing::warn!("Stripe webhook secret not configured");
                return Err(WebhookError::SecretNotConfigured);
            }
        };

        // 2. Authenticity, before the body is parsed
        let signature = cmd.signature.ok_or(WebhookError::MissingSignature)?;

        // 3. Parse
        let event = self
            .provider
            .verify_and_parse(
                &cmd.payload,
                &signature,
                secret.expose_secret(),
                self.tolerance,
            )
            .map_err(|e| {
                tracing::error!(error = %e, "Rejected Stripe webhook");
                e
            })?;

        tracing::info!(
            event_id = %event.id,
            event_type = %event.event_type,
            "Processing Stripe webhook event"
        );

        // 4. Dispatch and apply
        let outcome = self.reconcile(&event).await;

        Ok(WebhookAck {
            event_id: event.id,
            event_type: event.event_type,
            outcome,
        })
    }

    /// Applies an already verified event to the store.
    ///
    /// Never fails: downstream errors become [`ReconcileOutcome::Failed`].
    pub async fn reconcile(&self, event: &StripeEvent) -> ReconcileOutcome {
        let result = match event.parsed_type() {
            StripeEventType::CustomerSubscriptionCreated => {
                self.handle_subscription_created(event).await
            }
            StripeEventType::CustomerSubscriptionUpdated => {
                self.handle_subscription_updated(event).await
            }
            StripeEventType::CustomerSubscriptionDeleted => {
                self.handle_subscription_deleted(event).await
            }
            StripeEventType::InvoicePaymentSucceeded => {
                self.handle_invoice(event, SubscriptionStatus::Active).await
            }
            StripeEventType::InvoicePaymentFailed => {
                self.handle_invoice(event, SubscriptionStatus::PastDue).await
            }
            StripeEventType::CustomerSubscriptionTrialWillEnd => {
                self.handle_trial_will_end(event).await
            }
            StripeEventType::Unknown => {
                tracing::info!(event_type = %event.event_type, "Unhandled event type");
                Ok(ReconcileOutcome::Unhandled)
            }
        };

        match result {
            Ok(outcome) => {
                if let ReconcileOutcome::Skipped { reason } = &outcome {
                    tracing::warn!(
                        event_id = %event.id,
                        event_type = %event.event_type,
                        reason = %reason,
                        "Webhook event skipped"
                    );
                }
                outcome
            }
            Err(e) => {
                tracing::error!(
                    event_id = %event.id,
                    event_type = %event.event_type,
                    error = %e,
                    "Error handling webhook event"
                );
                ReconcileOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }

    async fn handle_subscription_created(
        &self,
        event: &StripeEvent,
    ) -> Result<ReconcileOutcome, WebhookError> {
        let subscription = decode_subscription(event)?;
        let customer_id = subscription.customer.id();

        let customer = self
            .provider
            .get_customer(customer_id)
            .await
            .map_err(|e| WebhookError::Provider(e.to_string()))?;

        let user_id = match customer.and_then(|c| c.user_id()) {
            Some(user_id) => user_id,
            None => {
                return Ok(ReconcileOutcome::skipped(format!(
                    "no user_id in metadata of customer {}",
                    customer_id
                )))
            }
        };

        let plan_id = self.resolve_plan(&subscription);

        let changes = SubscriptionChanges::new()
            .customer_id(customer_id)
            .subscription_id(subscription.id.clone())
            .plan(plan_id)
            .status(subscription.status.clone())
            .period(subscription.period_start(), subscription.period_end())
            .cancel_at_period_end(subscription.cancel_at_period_end);

        self.store
            .upsert_by_user(&user_id, &changes)
            .await
            .map_err(|e| WebhookError::Store(e.to_string()))?;

        tracing::info!(
            user_id = %user_id,
            subscription_id = %subscription.id,
            "Created subscription record"
        );
        Ok(ReconcileOutcome::Applied)
    }

    async fn handle_subscription_updated(
        &self,
        event: &StripeEvent,
    ) -> Result<ReconcileOutcome, WebhookError> {
        let subscription = decode_subscription(event)?;

        let changes = SubscriptionChanges::new()
            .status(subscription.status.clone())
            .period(subscription.period_start(), subscription.period_end())
            .cancel_at_period_end(subscription.cancel_at_period_end);

        self.update_subscription(&subscription.id, changes, "Updated subscription")
            .await
    }

    async fn handle_subscription_deleted(
        &self,
        event: &StripeEvent,
    ) -> Result<ReconcileOutcome, WebhookError> {
        let subscription = decode_subscription(event)?;
        let changes = SubscriptionChanges::new().status(SubscriptionStatus::Canceled);

        self.update_subscription(&subscription.id, changes, "Canceled subscription")
            .await
    }

    async fn handle_invoice(
        &self,
        event: &StripeEvent,
        status: SubscriptionStatus,
    ) -> Result<ReconcileOutcome, WebhookError> {
        let invoice: InvoiceObject = event
            .deserialize_object()
            .map_err(|e| WebhookError::InvalidObject(e.to_string()))?;

        let subscription_id = match invoice.subscription_id() {
            Some(id) => id,
            None => {
                return Ok(ReconcileOutcome::skipped(format!(
                    "invoice {} has no subscription",
                    invoice.id
                )))
            }
        };

        let changes = SubscriptionChanges::new().status(status);
        self.update_subscription(subscription_id, changes, "Updated status from invoice")
            .await
    }

    async fn handle_trial_will_end(
        &self,
        event: &StripeEvent,
    ) -> Result<ReconcileOutcome, WebhookError> {
        let subscription = decode_subscription(event)?;

        // Nothing to change; bumping updated_at records that the notice arrived.
        self.update_subscription(
            &subscription.id,
            SubscriptionChanges::new(),
            "Trial ending soon",
        )
        .await
    }

    async fn update_subscription(
        &self,
        subscription_id: &str,
        changes: SubscriptionChanges,
        message: &'static str,
    ) -> Result<ReconcileOutcome, WebhookError> {
        let rows = self
            .store
            .update_by_subscription_id(subscription_id, &changes)
            .await
            .map_err(|e| WebhookError::Store(e.to_string()))?;

        if rows == 0 {
            return Ok(ReconcileOutcome::skipped(format!(
                "no record for subscription {}",
                subscription_id
            )));
        }

        tracing::info!(
            subscription_id = %subscription_id,
            status = ?changes.status,
            rows,
            "{}",
            message
        );
        Ok(ReconcileOutcome::Applied)
    }

    /// Maps the first item's price to a catalog plan, falling back to the
    /// default paid plan.
    fn resolve_plan(&self, subscription: &SubscriptionObject) -> PlanId {
        if let Some(plan) = subscription
            .first_price_id()
            .and_then(|price_id| self.catalog.plan_for_price(price_id))
        {
            return plan.id.clone();
        }

        let fallback = self
            .catalog
            .default_paid_plan()
            .map(|plan| plan.id.clone())
            .unwrap_or_else(|| PlanId::from(crate::domain::billing::PREMIUM_PLAN_ID));

        tracing::warn!(
            subscription_id = %subscription.id,
            price_id = ?subscription.first_price_id(),
            plan_id = %fallback,
            "Subscription price not in catalog, using default plan"
        );
        fallback
    }
}

fn decode_subscription(event: &StripeEvent) -> Result<SubscriptionObject, WebhookError> {
    event
        .deserialize_object()
        .map_err(|e| WebhookError::InvalidObject(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemorySubscriptionStore;
    use crate::adapters::stripe::MockBillingProvider;
    use crate::domain::billing::{generate_signature_header, StripeEventBuilder};
    use crate::domain::foundation::{Timestamp, UserId};
    use crate::ports::Customer;
    use serde_json::json;
    use std::collections::HashMap;

    const SECRET: &str = "whsec_reconciler_test";

    struct Fixture {
        provider: Arc<MockBillingProvider>,
        store: Arc<InMemorySubscriptionStore>,
        reconciler: WebhookReconciler,
    }

    fn fixture() -> Fixture {
        fixture_with_secret(Some(SECRET))
    }

    fn fixture_with_secret(secret: Option<&str>) -> Fixture {
        let provider = Arc::new(MockBillingProvider::new());
        let store = Arc::new(InMemorySubscriptionStore::new());
        let catalog = Arc::new(PlanCatalog::standard(Some("price_premium".to_string())));
        let reconciler = WebhookReconciler::new(
            provider.clone(),
            store.clone(),
            catalog,
            secret.map(|s| SecretString::new(s.to_string())),
        );
        Fixture {
            provider,
            store,
            reconciler,
        }
    }

    fn user() -> UserId {
        UserId::new("user-1").unwrap()
    }

    fn customer_with_user(id: &str, user_id: Option<&str>) -> Customer {
        let mut metadata = HashMap::new();
        if let Some(user_id) = user_id {
            metadata.insert("user_id".to_string(), user_id.to_string());
        }
        Customer {
            id: id.to_string(),
            email: Some("user@example.com".to_string()),
            name: None,
            created_at: 1_700_000_000,
            metadata,
        }
    }

    fn subscription_object(status: &str, start: i64, end: i64) -> serde_json::Value {
        json!({
            "id": "sub_1",
            "customer": "cus_1",
            "status": status,
            "current_period_start": start,
            "current_period_end": end,
            "cancel_at_period_end": false,
            "items": {"data": [{"price": {"id": "price_premium"}}]}
        })
    }

    fn event(event_type: &str, object: serde_json::Value) -> StripeEvent {
        StripeEventBuilder::new()
            .event_type(event_type)
            .object(object)
            .build()
    }

    async fn seed_subscription(store: &InMemorySubscriptionStore) {
        store
            .upsert_by_user(
                &user(),
                &SubscriptionChanges::new()
                    .customer_id("cus_1")
                    .subscription_id("sub_1")
                    .status(SubscriptionStatus::Active)
                    .period(
                        Timestamp::from_unix_secs(1_000),
                        Timestamp::from_unix_secs(2_000),
                    ),
            )
            .await
            .unwrap();
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Verification Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn missing_secret_is_reported_before_signature() {
        let f = fixture_with_secret(None);

        let result = f
            .reconciler
            .handle(ReconcileWebhookCommand {
                payload: b"{}".to_vec(),
                signature: None,
            })
            .await;

        assert!(matches!(result, Err(WebhookError::SecretNotConfigured)));
    }

    #[tokio::test]
    async fn empty_secret_counts_as_unconfigured() {
        let f = fixture_with_secret(Some(""));

        let result = f
            .reconciler
            .handle(ReconcileWebhookCommand {
                payload: b"{}".to_vec(),
                signature: Some("t=1,v1=00".to_string()),
            })
            .await;

        assert!(matches!(result, Err(WebhookError::SecretNotConfigured)));
    }

    #[tokio::test]
    async fn missing_signature_is_rejected_before_parsing() {
        let f = fixture();

        let result = f
            .reconciler
            .handle(ReconcileWebhookCommand {
                payload: b"definitely not json".to_vec(),
                signature: None,
            })
            .await;

        assert!(matches!(result, Err(WebhookError::MissingSignature)));
    }

    #[tokio::test]
    async fn signed_delivery_is_acknowledged_with_event_type() {
        let f = fixture();
        let payload = serde_json::to_vec(&json!({
            "id": "evt_1",
            "type": "some.future.event",
            "created": 1,
            "data": {"object": {}}
        }))
        .unwrap();
        let now = chrono::Utc::now().timestamp();
        let signature = generate_signature_header(SECRET, now, &payload).unwrap();

        let ack = f
            .reconciler
            .handle(ReconcileWebhookCommand {
                payload,
                signature: Some(signature),
            })
            .await
            .unwrap();

        assert_eq!(ack.event_id, "evt_1");
        assert_eq!(ack.event_type, "some.future.event");
        assert_eq!(ack.outcome, ReconcileOutcome::Unhandled);
    }

    // ════════════════════════════════════════════════════════════════════════════
    // subscription.created
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn created_upserts_full_record_for_customer_user() {
        let f = fixture();
        f.provider
            .add_customer(customer_with_user("cus_1", Some("user-1")));

        let outcome = f
            .reconciler
            .reconcile(&event(
                "customer.subscription.created",
                subscription_object("active", 1_000, 2_000),
            ))
            .await;

        assert_eq!(outcome, ReconcileOutcome::Applied);
        let record = f.store.get_by_user(&user()).await.unwrap().unwrap();
        assert_eq!(record.stripe_customer_id.as_deref(), Some("cus_1"));
        assert_eq!(record.stripe_subscription_id.as_deref(), Some("sub_1"));
        assert_eq!(record.plan_id, Some(PlanId::from("premium")));
        assert_eq!(record.status, Some(SubscriptionStatus::Active));
        assert_eq!(
            record.current_period_end,
            Timestamp::from_unix_secs(2_000)
        );
    }

    #[tokio::test]
    async fn created_without_user_metadata_is_skipped() {
        let f = fixture();
        f.provider.add_customer(customer_with_user("cus_1", None));

        let outcome = f
            .reconciler
            .reconcile(&event(
                "customer.subscription.created",
                subscription_object("active", 1_000, 2_000),
            ))
            .await;

        assert!(matches!(outcome, ReconcileOutcome::Skipped { .. }));
        assert!(f.store.is_empty().await);
    }

    #[tokio::test]
    async fn created_with_unknown_price_falls_back_to_premium() {
        let f = fixture();
        f.provider
            .add_customer(customer_with_user("cus_1", Some("user-1")));
        let mut object = subscription_object("trialing", 1_000, 2_000);
        object["items"] = json!({"data": [{"price": {"id": "price_legacy"}}]});

        f.reconciler
            .reconcile(&event("customer.subscription.created", object))
            .await;

        let record = f.store.get_by_user(&user()).await.unwrap().unwrap();
        assert_eq!(record.plan_id, Some(PlanId::from("premium")));
        assert_eq!(record.status, Some(SubscriptionStatus::Trialing));
    }

    #[tokio::test]
    async fn created_provider_failure_is_swallowed() {
        let f = fixture();
        f.provider.set_method_error(
            "get_customer",
            crate::ports::PaymentError::network("connection reset"),
        );

        let outcome = f
            .reconciler
            .reconcile(&event(
                "customer.subscription.created",
                subscription_object("active", 1_000, 2_000),
            ))
            .await;

        assert!(matches!(outcome, ReconcileOutcome::Failed { .. }));
        assert!(f.store.is_empty().await);
    }

    // ════════════════════════════════════════════════════════════════════════════
    // subscription.updated / deleted / trial_will_end
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn updated_applies_status_period_and_flag() {
        let f = fixture();
        seed_subscription(&f.store).await;
        let mut object = subscription_object("past_due", 2_000, 3_000);
        object["cancel_at_period_end"] = json!(true);

        let outcome = f
            .reconciler
            .reconcile(&event("customer.subscription.updated", object))
            .await;

        assert_eq!(outcome, ReconcileOutcome::Applied);
        let record = f.store.get_by_user(&user()).await.unwrap().unwrap();
        assert_eq!(record.status, Some(SubscriptionStatus::PastDue));
        assert_eq!(record.current_period_end, Timestamp::from_unix_secs(3_000));
        assert!(record.cancel_at_period_end);
    }

    #[tokio::test]
    async fn replayed_update_yields_same_state() {
        let f = fixture();
        seed_subscription(&f.store).await;
        let update = event(
            "customer.subscription.updated",
            subscription_object("active", 2_000, 3_000),
        );

        f.reconciler.reconcile(&update).await;
        let mut once = f.store.get_by_user(&user()).await.unwrap().unwrap();
        f.reconciler.reconcile(&update).await;
        let twice = f.store.get_by_user(&user()).await.unwrap().unwrap();

        // updated_at is the only field allowed to differ
        once.updated_at = twice.updated_at;
        assert_eq!(once, twice);
    }

    #[tokio::test]
    async fn stale_update_does_not_move_period_backwards() {
        let f = fixture();
        seed_subscription(&f.store).await;

        f.reconciler
            .reconcile(&event(
                "customer.subscription.updated",
                subscription_object("active", 2_000, 3_000),
            ))
            .await;
        f.reconciler
            .reconcile(&event(
                "customer.subscription.updated",
                subscription_object("active", 1_000, 2_000),
            ))
            .await;

        let record = f.store.get_by_user(&user()).await.unwrap().unwrap();
        assert_eq!(record.current_period_end, Timestamp::from_unix_secs(3_000));
    }

    #[tokio::test]
    async fn update_for_unknown_subscription_is_skipped() {
        let f = fixture();

        let outcome = f
            .reconciler
            .reconcile(&event(
                "customer.subscription.updated",
                subscription_object("active", 1_000, 2_000),
            ))
            .await;

        assert!(matches!(outcome, ReconcileOutcome::Skipped { .. }));
    }

    #[tokio::test]
    async fn malformed_object_is_swallowed() {
        let f = fixture();

        let outcome = f
            .reconciler
            .reconcile(&event("customer.subscription.updated", json!({"status": 42})))
            .await;

        assert!(matches!(outcome, ReconcileOutcome::Failed { .. }));
    }

    #[tokio::test]
    async fn deleted_sets_canceled() {
        let f = fixture();
        seed_subscription(&f.store).await;

        f.reconciler
            .reconcile(&event(
                "customer.subscription.deleted",
                subscription_object("canceled", 1_000, 2_000),
            ))
            .await;

        let record = f.store.get_by_user(&user()).await.unwrap().unwrap();
        assert_eq!(record.status, Some(SubscriptionStatus::Canceled));
    }

    #[tokio::test]
    async fn trial_will_end_only_touches_updated_at() {
        let f = fixture();
        seed_subscription(&f.store).await;
        let before = f.store.get_by_user(&user()).await.unwrap().unwrap();

        let outcome = f
            .reconciler
            .reconcile(&event(
                "customer.subscription.trial_will_end",
                subscription_object("trialing", 5_000, 6_000),
            ))
            .await;

        assert_eq!(outcome, ReconcileOutcome::Applied);
        let after = f.store.get_by_user(&user()).await.unwrap().unwrap();
        assert_eq!(after.status, before.status);
        assert_eq!(after.current_period_end, before.current_period_end);
        assert!(after.updated_at >= before.updated_at);
    }

    // ════════════════════════════════════════════════════════════════════════════
    // invoice.*
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn payment_failed_sets_past_due() {
        let f = fixture();
        seed_subscription(&f.store).await;

        f.reconciler
            .reconcile(&event(
                "invoice.payment_failed",
                json!({"id": "in_1", "subscription": "sub_1"}),
            ))
            .await;

        let record = f.store.get_by_user(&user()).await.unwrap().unwrap();
        assert_eq!(record.status, Some(SubscriptionStatus::PastDue));
    }

    #[tokio::test]
    async fn payment_succeeded_sets_active_from_expanded_reference() {
        let f = fixture();
        seed_subscription(&f.store).await;
        f.store
            .update_by_subscription_id(
                "sub_1",
                &SubscriptionChanges::new().status(SubscriptionStatus::PastDue),
            )
            .await
            .unwrap();

        f.reconciler
            .reconcile(&event(
                "invoice.payment_succeeded",
                json!({"id": "in_1", "subscription": {"id": "sub_1"}}),
            ))
            .await;

        let record = f.store.get_by_user(&user()).await.unwrap().unwrap();
        assert_eq!(record.status, Some(SubscriptionStatus::Active));
    }

    #[tokio::test]
    async fn invoice_without_subscription_is_noop() {
        let f = fixture();
        seed_subscription(&f.store).await;

        let outcome = f
            .reconciler
            .reconcile(&event("invoice.payment_failed", json!({"id": "in_1"})))
            .await;

        assert!(matches!(outcome, ReconcileOutcome::Skipped { .. }));
        let record = f.store.get_by_user(&user()).await.unwrap().unwrap();
        assert_eq!(record.status, Some(SubscriptionStatus::Active));
    }

    #[tokio::test]
    async fn store_failure_is_swallowed() {
        let f = fixture();
        seed_subscription(&f.store).await;
        f.store.fail_writes("database is down");

        let outcome = f
            .reconciler
            .reconcile(&event(
                "invoice.payment_failed",
                json!({"id": "in_1", "subscription": "sub_1"}),
            ))
            .await;

        assert!(matches!(outcome, ReconcileOutcome::Failed { .. }));
    }

    #[tokio::test]
    async fn unknown_event_does_not_touch_store() {
        let f = fixture();
        seed_subscription(&f.store).await;
        let before = f.store.get_by_user(&user()).await.unwrap().unwrap();

        let outcome = f
            .reconciler
            .reconcile(&event("some.future.event", json!({"id": "sub_1"})))
            .await;

        assert_eq!(outcome, ReconcileOutcome::Unhandled);
        assert_eq!(f.store.get_by_user(&user()).await.unwrap().unwrap(), before);
    }
}
