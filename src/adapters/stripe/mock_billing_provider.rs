//! Mock billing provider for testing.
//!
//! Provides a configurable mock implementation of `BillingProvider` for unit
//! and integration tests. Supports:
//! - Pre-seeded customers and subscriptions
//! - Error injection, globally or per method
//! - Call tracking
//!
//! Webhook verification is not mocked: the trait's default implementation
//! runs the real HMAC check, so tests sign payloads with
//! `generate_signature_header`.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use crate::domain::billing::{SubscriptionStatus, PREMIUM_PLAN_ID};
use crate::ports::{
    BillingProvider, CreateCustomerRequest, CreateSubscriptionRequest, CreatedSubscription,
    Customer, PaymentError, Subscription,
};

const THIRTY_DAYS_SECS: i64 = 30 * 24 * 60 * 60;

/// Mock billing provider for testing.
///
/// # Example
///
/// ```ignore
/// let mock = MockBillingProvider::with_active_subscription("cus_1", "sub_1");
///
/// // Inject errors
/// mock.set_method_error("get_subscription", PaymentError::network("timeout"));
///
/// // Assert on calls
/// assert!(mock.was_called("get_subscription"));
/// ```
#[derive(Default)]
pub struct MockBillingProvider {
    /// Inner state (thread-safe for async tests).
    inner: Arc<Mutex<MockState>>,
}

#[derive(Default)]
struct MockState {
    customers: HashMap<String, Customer>,
    subscriptions: HashMap<String, Subscription>,

    /// Counter for generated IDs.
    next_id: u64,

    /// Error to return on next call (consumed).
    next_error: Option<PaymentError>,

    /// Specific errors by method name (sticky).
    method_errors: HashMap<String, PaymentError>,

    call_log: Vec<MethodCall>,
}

/// Recorded method call for assertions.
#[derive(Debug, Clone)]
pub struct MethodCall {
    pub method: String,
    pub args: Vec<String>,
}

impl MockBillingProvider {
    /// Create a new mock provider with no customers or subscriptions.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock holding one active premium subscription.
    pub fn with_active_subscription(customer_id: &str, subscription_id: &str) -> Self {
        Self::with_subscription_status(customer_id, subscription_id, SubscriptionStatus::Active)
    }

    /// Create a mock holding one premium subscription in the given status.
    pub fn with_subscription_status(
        customer_id: &str,
        subscription_id: &str,
        status: SubscriptionStatus,
    ) -> Self {
        let mock = Self::new();
        let now = chrono::Utc::now().timestamp();
        mock.add_subscription(Subscription {
            id: subscription_id.to_string(),
            customer_id: customer_id.to_string(),
            status,
            current_period_start: Some(now),
            current_period_end: Some(now + THIRTY_DAYS_SECS),
            cancel_at_period_end: false,
            created: now,
            price_id: Some("price_premium".to_string()),
            metadata: HashMap::from([("plan_id".to_string(), PREMIUM_PLAN_ID.to_string())]),
        });
        mock
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Configuration Methods
    // ════════════════════════════════════════════════════════════════════════════

    /// Add a customer to the "database".
    pub fn add_customer(&self, customer: Customer) {
        let id = customer.id.clone();
        self.state().customers.insert(id, customer);
    }

    /// Add a subscription to the "database".
    pub fn add_subscription(&self, subscription: Subscription) {
        let id = subscription.id.clone();
        self.state().subscriptions.insert(id, subscription);
    }

    /// Set an error to return on the next call to any method.
    pub fn set_error(&self, error: PaymentError) {
        self.state().next_error = Some(error);
    }

    /// Set an error for a specific method.
    pub fn set_method_error(&self, method: &str, error: PaymentError) {
        self.state().method_errors.insert(method.to_string(), error);
    }

    /// Clear all configured errors.
    pub fn clear_errors(&self) {
        let mut state = self.state();
        state.next_error = None;
        state.method_errors.clear();
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Call Tracking
    // ════════════════════════════════════════════════════════════════════════════

    /// Get all recorded method calls.
    pub fn calls(&self) -> Vec<MethodCall> {
        self.state().call_log.clone()
    }

    /// Check if a method was called.
    pub fn was_called(&self, method: &str) -> bool {
        self.state().call_log.iter().any(|c| c.method == method)
    }

    /// Get count of calls to a method.
    pub fn call_count(&self, method: &str) -> usize {
        self.state()
            .call_log
            .iter()
            .filter(|c| c.method == method)
            .count()
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Internal Helpers
    // ════════════════════════════════════════════════════════════════════════════

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn record_call(&self, method: &str, args: Vec<String>) {
        self.state().call_log.push(MethodCall {
            method: method.to_string(),
            args,
        });
    }

    fn check_error(&self, method: &str) -> Result<(), PaymentError> {
        let mut state = self.state();

        if let Some(error) = state.method_errors.get(method) {
            return Err(error.clone());
        }

        if let Some(error) = state.next_error.take() {
            return Err(error);
        }

        Ok(())
    }
}

impl MockState {
    fn generate_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{}_mock_{}", prefix, self.next_id)
    }
}

impl Clone for MockBillingProvider {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

#[async_trait]
impl BillingProvider for MockBillingProvider {
    async fn get_customer(&self, customer_id: &str) -> Result<Option<Customer>, PaymentError> {
        self.record_call("get_customer", vec![customer_id.to_string()]);
        self.check_error("get_customer")?;

        Ok(self.state().customers.get(customer_id).cloned())
    }

    async fn create_customer(
        &self,
        request: CreateCustomerRequest,
    ) -> Result<Customer, PaymentError> {
        self.record_call(
            "create_customer",
            vec![request.user_id.to_string(), request.email.clone()],
        );
        self.check_error("create_customer")?;

        let mut state = self.state();
        let customer = Customer {
            id: state.generate_id("cus"),
            email: Some(request.email),
            name: request.name,
            created_at: chrono::Utc::now().timestamp(),
            metadata: HashMap::from([("user_id".to_string(), request.user_id.to_string())]),
        };
        state.customers.insert(customer.id.clone(), customer.clone());

        Ok(customer)
    }

    async fn attach_payment_method(
        &self,
        payment_method_id: &str,
        customer_id: &str,
    ) -> Result<(), PaymentError> {
        self.record_call(
            "attach_payment_method",
            vec![payment_method_id.to_string(), customer_id.to_string()],
        );
        self.check_error("attach_payment_method")
    }

    async fn set_default_payment_method(
        &self,
        customer_id: &str,
        payment_method_id: &str,
    ) -> Result<(), PaymentError> {
        self.record_call(
            "set_default_payment_method",
            vec![customer_id.to_string(), payment_method_id.to_string()],
        );
        self.check_error("set_default_payment_method")
    }

    async fn create_subscription(
        &self,
        request: CreateSubscriptionRequest,
    ) -> Result<CreatedSubscription, PaymentError> {
        self.record_call(
            "create_subscription",
            vec![request.customer_id.clone(), request.price_id.clone()],
        );
        self.check_error("create_subscription")?;

        let mut metadata = HashMap::from([("plan_id".to_string(), request.plan_id.to_string())]);
        if let Some(user_id) = &request.user_id {
            metadata.insert("user_id".to_string(), user_id.to_string());
        }

        let mut state = self.state();
        let now = chrono::Utc::now().timestamp();
        let subscription = Subscription {
            id: state.generate_id("sub"),
            customer_id: request.customer_id,
            status: SubscriptionStatus::Incomplete,
            current_period_start: Some(now),
            current_period_end: Some(now + THIRTY_DAYS_SECS),
            cancel_at_period_end: false,
            created: now,
            price_id: Some(request.price_id),
            metadata,
        };
        let client_secret = format!("pi_mock_{}_secret", state.next_id);
        state
            .subscriptions
            .insert(subscription.id.clone(), subscription.clone());

        Ok(CreatedSubscription {
            subscription,
            client_secret: Some(client_secret),
        })
    }

    async fn get_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<Option<Subscription>, PaymentError> {
        self.record_call("get_subscription", vec![subscription_id.to_string()]);
        self.check_error("get_subscription")?;

        Ok(self.state().subscriptions.get(subscription_id).cloned())
    }

    async fn set_cancel_at_period_end(
        &self,
        subscription_id: &str,
        cancel: bool,
    ) -> Result<Subscription, PaymentError> {
        self.record_call(
            "set_cancel_at_period_end",
            vec![subscription_id.to_string(), cancel.to_string()],
        );
        self.check_error("set_cancel_at_period_end")?;

        let mut state = self.state();
        let subscription = state
            .subscriptions
            .get_mut(subscription_id)
            .ok_or_else(|| PaymentError::not_found("Subscription"))?;
        subscription.cancel_at_period_end = cancel;

        Ok(subscription.clone())
    }
}
