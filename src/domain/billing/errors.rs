//! Billing-specific error types for the subscription API.
//!
//! # HTTP Status Mapping
//!
//! | Error | HTTP Status |
//! |-------|-------------|
//! | NotConfigured | 503 |
//! | InvalidPlan | 400 |
//! | FreePlan | 400 |
//! | InvalidAction | 400 |
//! | ValidationFailed | 400 |
//! | Provider | 400 |
//! | SubscriptionNotFound | 404 |
//! | Infrastructure | 500 |

use crate::domain::foundation::{DomainError, ErrorCode};

/// Errors returned by the subscription API handlers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BillingError {
    /// Stripe credentials are incomplete.
    NotConfigured,

    /// Plan ID is not in the catalog.
    InvalidPlan(String),

    /// The free plan cannot be subscribed to.
    FreePlan,

    /// Cancel/reactivate request with the wrong action verb.
    InvalidAction {
        expected: &'static str,
        actual: String,
    },

    /// Validation failed.
    ValidationFailed {
        field: String,
        message: String,
    },

    /// Stripe rejected the request; the message is Stripe's.
    Provider(String),

    /// Stripe has no subscription with this ID.
    SubscriptionNotFound(String),

    /// Infrastructure error.
    Infrastructure(String),
}

impl BillingError {
    pub fn not_configured() -> Self {
        BillingError::NotConfigured
    }

    pub fn invalid_plan(plan_id: impl Into<String>) -> Self {
        BillingError::InvalidPlan(plan_id.into())
    }

    pub fn invalid_action(expected: &'static str, actual: impl Into<String>) -> Self {
        BillingError::InvalidAction {
            expected,
            actual: actual.into(),
        }
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        BillingError::ValidationFailed {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn provider(message: impl Into<String>) -> Self {
        BillingError::Provider(message.into())
    }

    pub fn subscription_not_found(subscription_id: impl Into<String>) -> Self {
        BillingError::SubscriptionNotFound(subscription_id.into())
    }

    pub fn infrastructure(message: impl Into<String>) -> Self {
        BillingError::Infrastructure(message.into())
    }

    /// Returns the error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            BillingError::NotConfigured => ErrorCode::ServiceNotConfigured,
            BillingError::InvalidPlan(_) | BillingError::FreePlan => ErrorCode::InvalidPlan,
            BillingError::InvalidAction { .. } => ErrorCode::InvalidAction,
            BillingError::ValidationFailed { .. } => ErrorCode::ValidationFailed,
            BillingError::Provider(_) => ErrorCode::PaymentProviderError,
            BillingError::SubscriptionNotFound(_) => ErrorCode::SubscriptionNotFound,
            BillingError::Infrastructure(_) => ErrorCode::InternalError,
        }
    }

    /// Returns the message shown to API callers.
    pub fn message(&self) -> String {
        match self {
            BillingError::NotConfigured => "Stripe not configured".to_string(),
            BillingError::InvalidPlan(_) => "Invalid plan ID".to_string(),
            BillingError::FreePlan => "Cannot create subscription for free plan".to_string(),
            BillingError::InvalidAction { .. } => "Invalid action".to_string(),
            BillingError::ValidationFailed { field, message } => {
                format!("Validation failed for '{}': {}", field, message)
            }
            BillingError::Provider(message) => message.clone(),
            BillingError::SubscriptionNotFound(id) => format!("Subscription not found: {}", id),
            BillingError::Infrastructure(msg) => format!("Error: {}", msg),
        }
    }
}

impl std::fmt::Display for BillingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for BillingError {}

impl From<DomainError> for BillingError {
    fn from(err: DomainError) -> Self {
        match err.code {
            ErrorCode::ValidationFailed => BillingError::ValidationFailed {
                field: err
                    .details
                    .get("field")
                    .cloned()
                    .unwrap_or_else(|| "unknown".to_string()),
                message: err.message,
            },
            ErrorCode::SubscriptionNotFound => BillingError::SubscriptionNotFound(err.message),
            ErrorCode::PaymentProviderError => BillingError::Provider(err.message),
            _ => BillingError::Infrastructure(err.to_string()),
        }
    }
}

impl From<BillingError> for DomainError {
    fn from(err: BillingError) -> Self {
        DomainError::new(err.code(), err.message())
    }
}
