//! Webhook error types for Stripe webhook handling.
//!
//! Only configuration, authenticity and envelope errors reach the HTTP
//! response. Errors raised while applying an event are logged by the
//! reconciler and acknowledged, since Stripe redelivers on non-2xx and a
//! failing store would otherwise turn into a retry storm.

use http::StatusCode;
use thiserror::Error;

/// Errors that occur during webhook processing.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// No webhook signing secret is configured.
    #[error("Webhook secret not configured")]
    SecretNotConfigured,

    /// The request carried no `stripe-signature` header.
    #[error("Missing stripe-signature header")]
    MissingSignature,

    /// The signature header could not be parsed.
    #[error("Invalid signature header: {0}")]
    InvalidSignatureHeader(String),

    /// No signature in the header matches the payload.
    #[error("Invalid signature")]
    InvalidSignature,

    /// Signature timestamp is outside the tolerance window.
    #[error("Timestamp out of range")]
    TimestampOutOfRange,

    /// Verified body is not a valid event envelope.
    #[error("Invalid payload: {0}")]
    MalformedPayload(String),

    /// `data.object` does not have the shape the event type implies.
    #[error("Invalid event object: {0}")]
    InvalidObject(String),

    /// A call to the billing provider failed while applying an event.
    #[error("Provider error: {0}")]
    Provider(String),

    /// The subscription store failed while applying an event.
    #[error("Store error: {0}")]
    Store(String),

    /// Anything else.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl WebhookError {
    /// Returns true if the failure happened while applying an event.
    ///
    /// These are logged and acknowledged instead of failing the delivery.
    pub fn is_swallowed(&self) -> bool {
        matches!(
            self,
            WebhookError::InvalidObject(_) | WebhookError::Provider(_) | WebhookError::Store(_)
        )
    }

    /// Maps the error to an appropriate HTTP status code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            WebhookError::SecretNotConfigured => StatusCode::SERVICE_UNAVAILABLE,

            WebhookError::MissingSignature
            | WebhookError::InvalidSignatureHeader(_)
            | WebhookError::InvalidSignature
            | WebhookError::TimestampOutOfRange
            | WebhookError::MalformedPayload(_) => StatusCode::BAD_REQUEST,

            WebhookError::InvalidObject(_) | WebhookError::Provider(_) | WebhookError::Store(_) => {
                StatusCode::OK
            }

            WebhookError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The `detail` string returned to the caller.
    ///
    /// Signature failures share one message so the response does not reveal
    /// which check failed.
    pub fn detail(&self) -> &'static str {
        match self {
            WebhookError::SecretNotConfigured => "Webhook secret not configured",
            WebhookError::MissingSignature => "Missing stripe-signature header",
            WebhookError::InvalidSignatureHeader(_)
            | WebhookError::InvalidSignature
            | WebhookError::TimestampOutOfRange => "Invalid signature",
            WebhookError::MalformedPayload(_) => "Invalid payload",
            WebhookError::InvalidObject(_) | WebhookError::Provider(_) | WebhookError::Store(_) => {
                "Event acknowledged"
            }
            WebhookError::Internal(_) => "Internal server error",
        }
    }
}
