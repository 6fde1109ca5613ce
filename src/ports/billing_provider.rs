//! Billing provider port for external payment processing.
//!
//! Defines the contract for the Stripe integration: customer and subscription
//! management for the subscription API, plus webhook verification and the
//! customer lookup the reconciler needs.
//!
//! # Design
//!
//! - **Thin**: every method is one provider API call
//! - **Missing is not an error**: lookups return `Ok(None)` for unknown IDs
//! - **Verification is local**: webhook signatures are checked without I/O

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::billing::{
    BillingError, SignatureTolerance, StripeEvent, StripeWebhookVerifier, SubscriptionStatus,
    WebhookError,
};
use crate::domain::foundation::{DomainError, ErrorCode, PlanId, UserId};

/// Port for billing provider integrations.
#[async_trait]
pub trait BillingProvider: Send + Sync {
    /// Verify a webhook signature over the raw body and parse the event.
    ///
    /// Stripe's scheme needs no network access, so every implementation
    /// shares this one.
    fn verify_and_parse(
        &self,
        payload: &[u8],
        signature: &str,
        secret: &str,
        tolerance: SignatureTolerance,
    ) -> Result<StripeEvent, WebhookError> {
        StripeWebhookVerifier::new(secret)
            .with_tolerance(tolerance)
            .verify_and_parse(payload, signature)
    }

    /// Get customer by provider ID.
    async fn get_customer(&self, customer_id: &str) -> Result<Option<Customer>, PaymentError>;

    /// Create a customer tagged with the internal user ID.
    async fn create_customer(&self, request: CreateCustomerRequest)
        -> Result<Customer, PaymentError>;

    /// Attach a payment method to a customer.
    async fn attach_payment_method(
        &self,
        payment_method_id: &str,
        customer_id: &str,
    ) -> Result<(), PaymentError>;

    /// Make a payment method the customer's default for invoices.
    async fn set_default_payment_method(
        &self,
        customer_id: &str,
        payment_method_id: &str,
    ) -> Result<(), PaymentError>;

    /// Create a subscription that waits for the first payment to be confirmed.
    async fn create_subscription(
        &self,
        request: CreateSubscriptionRequest,
    ) -> Result<CreatedSubscription, PaymentError>;

    /// Get subscription by provider ID.
    async fn get_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<Option<Subscription>, PaymentError>;

    /// Set or clear cancellation at the end of the current period.
    async fn set_cancel_at_period_end(
        &self,
        subscription_id: &str,
        cancel: bool,
    ) -> Result<Subscription, PaymentError>;
}

/// Request to create a customer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCustomerRequest {
    /// Internal user ID (stored as metadata).
    pub user_id: UserId,

    /// Customer email address.
    pub email: String,

    /// Customer name (optional).
    pub name: Option<String>,
}

/// Customer in the payment system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    /// Provider's customer ID.
    pub id: String,

    /// Customer email.
    pub email: Option<String>,

    /// Customer name.
    pub name: Option<String>,

    /// When the customer was created (provider timestamp).
    pub created_at: i64,

    /// Provider metadata; `user_id` links back to the internal user.
    pub metadata: HashMap<String, String>,
}

impl Customer {
    /// Internal user ID from metadata, if present and non-empty.
    pub fn user_id(&self) -> Option<UserId> {
        self.metadata
            .get("user_id")
            .and_then(|id| UserId::new(id.clone()).ok())
    }
}

/// Request to create a subscription.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSubscriptionRequest {
    /// Provider's customer ID.
    pub customer_id: String,

    /// Provider price to subscribe to.
    pub price_id: String,

    /// Catalog plan, stored as metadata.
    pub plan_id: PlanId,

    /// Internal user, stored as metadata when known.
    pub user_id: Option<UserId>,
}

/// Subscription in the payment system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    /// Provider's subscription ID.
    pub id: String,

    /// Provider's customer ID.
    pub customer_id: String,

    /// Current subscription status.
    pub status: SubscriptionStatus,

    /// Current billing period start (Unix timestamp).
    pub current_period_start: Option<i64>,

    /// Current billing period end (Unix timestamp).
    pub current_period_end: Option<i64>,

    /// Whether subscription cancels at period end.
    pub cancel_at_period_end: bool,

    /// When the subscription was created (Unix timestamp).
    pub created: i64,

    /// Price of the first subscription item.
    pub price_id: Option<String>,

    /// Provider metadata (`plan_id`, `user_id`).
    pub metadata: HashMap<String, String>,
}

impl Subscription {
    /// Plan recorded in metadata when the subscription was created.
    pub fn plan_id(&self) -> Option<PlanId> {
        self.metadata
            .get("plan_id")
            .filter(|id| !id.is_empty())
            .map(|id| PlanId::new(id.clone()))
    }
}

/// Result of creating a subscription.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatedSubscription {
    pub subscription: Subscription,

    /// Client secret of the first invoice's payment intent, used by the
    /// front-end to confirm the payment.
    pub client_secret: Option<String>,
}

/// Errors from billing provider operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentError {
    /// Error code for categorization.
    pub code: PaymentErrorCode,

    /// Human-readable message.
    pub message: String,

    /// Provider's error code (if available).
    pub provider_code: Option<String>,

    /// Whether the operation can be retried.
    pub retryable: bool,
}

impl PaymentError {
    /// Create a new payment error.
    pub fn new(code: PaymentErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            provider_code: None,
            retryable: code.is_retryable(),
        }
    }

    /// Create with provider code.
    pub fn with_provider_code(mut self, code: impl Into<String>) -> Self {
        self.provider_code = Some(code.into());
        self
    }

    /// Create a network error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::NetworkError, message)
    }

    /// Create an authentication error.
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::AuthenticationError, message)
    }

    /// Create an invalid request error.
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::InvalidRequest, message)
    }

    /// Create a card declined error.
    pub fn card_declined(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::CardDeclined, message)
    }

    /// Create a not found error.
    pub fn not_found(resource: &str) -> Self {
        Self::new(PaymentErrorCode::NotFound, format!("{} not found", resource))
    }

    /// Create a generic provider error.
    pub fn provider(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::ProviderError, message)
    }
}

impl std::fmt::Display for PaymentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for PaymentError {}

impl From<PaymentError> for DomainError {
    fn from(err: PaymentError) -> Self {
        let code = match err.code {
            PaymentErrorCode::NotFound => ErrorCode::NotFound,
            _ => ErrorCode::PaymentProviderError,
        };

        DomainError::new(code, err.message)
    }
}

impl From<PaymentError> for BillingError {
    /// Every provider failure reaches the caller as a 400 carrying Stripe's message.
    fn from(err: PaymentError) -> Self {
        BillingError::provider(err.message)
    }
}

/// Payment error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentErrorCode {
    /// Network connectivity issue.
    NetworkError,

    /// API authentication failed.
    AuthenticationError,

    /// Request rejected as invalid (unknown IDs, bad parameters).
    InvalidRequest,

    /// Card was declined.
    CardDeclined,

    /// Resource not found.
    NotFound,

    /// Rate limit exceeded.
    RateLimitExceeded,

    /// Provider API error.
    ProviderError,

    /// Unknown error.
    Unknown,
}

impl PaymentErrorCode {
    /// Check if this error type is typically retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PaymentErrorCode::NetworkError | PaymentErrorCode::RateLimitExceeded
        )
    }
}

impl std::fmt::Display for PaymentErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PaymentErrorCode::NetworkError => "network_error",
            PaymentErrorCode::AuthenticationError => "authentication_error",
            PaymentErrorCode::InvalidRequest => "invalid_request",
            PaymentErrorCode::CardDeclined => "card_declined",
            PaymentErrorCode::NotFound => "not_found",
            PaymentErrorCode::RateLimitExceeded => "rate_limit_exceeded",
            PaymentErrorCode::ProviderError => "provider_error",
            PaymentErrorCode::Unknown => "unknown",
        };
        write!(f, "{}", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Trait object safety test
    #[test]
    fn billing_provider_is_object_safe() {
        fn _accepts_dyn(_provider: &dyn BillingProvider) {}
    }

    #[test]
    fn network_errors_are_retryable() {
        assert!(PaymentError::network("timeout").retryable);
        assert!(!PaymentError::card_declined("declined").retryable);
        assert!(!PaymentError::invalid_request("bad").retryable);
    }

    #[test]
    fn payment_error_displays_code_and_message() {
        let err = PaymentError::not_found("Customer");
        assert_eq!(err.to_string(), "not_found: Customer not found");
    }

    #[test]
    fn payment_error_converts_to_billing_error_with_provider_message() {
        let err: BillingError = PaymentError::card_declined("Your card was declined.").into();
        assert_eq!(err, BillingError::Provider("Your card was declined.".to_string()));
    }

    #[test]
    fn payment_error_converts_to_domain_error() {
        let err: DomainError = PaymentError::not_found("Subscription").into();
        assert_eq!(err.code, ErrorCode::NotFound);

        let err: DomainError = PaymentError::network("reset").into();
        assert_eq!(err.code, ErrorCode::PaymentProviderError);
    }

    #[test]
    fn customer_user_id_from_metadata() {
        let mut customer = Customer {
            id: "cus_1".to_string(),
            email: None,
            name: None,
            created_at: 0,
            metadata: HashMap::new(),
        };
        assert!(customer.user_id().is_none());

        customer.metadata.insert("user_id".to_string(), " ".to_string());
        assert!(customer.user_id().is_none());

        customer.metadata.insert("user_id".to_string(), "user-1".to_string());
        assert_eq!(customer.user_id().unwrap().as_str(), "user-1");
    }

    #[test]
    fn subscription_plan_id_from_metadata() {
        let mut metadata = HashMap::new();
        metadata.insert("plan_id".to_string(), "premium".to_string());
        let subscription = Subscription {
            id: "sub_1".to_string(),
            customer_id: "cus_1".to_string(),
            status: SubscriptionStatus::Active,
            current_period_start: None,
            current_period_end: None,
            cancel_at_period_end: false,
            created: 0,
            price_id: None,
            metadata,
        };

        assert_eq!(subscription.plan_id(), Some(PlanId::from("premium")));
    }
}
