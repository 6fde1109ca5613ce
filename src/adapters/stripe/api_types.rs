//! Stripe REST API response types.
//!
//! Only the fields the adapter reads are modelled; everything else in
//! Stripe's responses is ignored.

use std::collections::HashMap;

use serde::Deserialize;

use crate::domain::billing::SubscriptionObject;
use crate::ports::{Customer, PaymentError, PaymentErrorCode, Subscription};

/// Stripe Customer object.
#[derive(Debug, Clone, Deserialize)]
pub struct StripeCustomer {
    /// Unique customer identifier (cus_...).
    pub id: String,

    pub email: Option<String>,

    pub name: Option<String>,

    /// Unix timestamp of creation.
    #[serde(default)]
    pub created: i64,

    #[serde(default)]
    pub metadata: HashMap<String, String>,

    /// Set on the stub Stripe returns for deleted customers.
    #[serde(default)]
    pub deleted: bool,
}

impl From<StripeCustomer> for Customer {
    fn from(c: StripeCustomer) -> Self {
        Customer {
            id: c.id,
            email: c.email,
            name: c.name,
            created_at: c.created,
            metadata: c.metadata,
        }
    }
}

/// Stripe Subscription object as returned by the REST API.
///
/// Shares its shape with the webhook payload object, plus the fields only
/// API responses carry.
#[derive(Debug, Clone, Deserialize)]
pub struct StripeSubscription {
    #[serde(flatten)]
    pub object: SubscriptionObject,

    #[serde(default)]
    pub created: i64,

    /// Present when the request asked for `latest_invoice.payment_intent`.
    #[serde(default)]
    pub latest_invoice: Option<StripeInvoiceRef>,
}

impl StripeSubscription {
    /// Client secret of the first invoice's payment intent, if expanded.
    pub fn client_secret(&self) -> Option<String> {
        match &self.latest_invoice {
            Some(StripeInvoiceRef::Expanded { payment_intent }) => payment_intent
                .as_ref()
                .and_then(|pi| pi.get("client_secret"))
                .and_then(|secret| secret.as_str())
                .map(String::from),
            _ => None,
        }
    }
}

impl From<StripeSubscription> for Subscription {
    fn from(s: StripeSubscription) -> Self {
        let obj = s.object;
        Subscription {
            current_period_start: obj.period_start().map(|t| t.as_unix_secs()),
            current_period_end: obj.period_end().map(|t| t.as_unix_secs()),
            price_id: obj.first_price_id().map(String::from),
            customer_id: obj.customer.id().to_string(),
            id: obj.id,
            status: obj.status,
            cancel_at_period_end: obj.cancel_at_period_end,
            created: s.created,
            metadata: obj.metadata,
        }
    }
}

/// `latest_invoice`: an ID unless expanded.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum StripeInvoiceRef {
    Id(String),
    Expanded {
        /// An ID string, or the payment intent object when expanded.
        #[serde(default)]
        payment_intent: Option<serde_json::Value>,
    },
}

/// Error envelope of every non-2xx Stripe response.
#[derive(Debug, Clone, Deserialize)]
pub struct StripeErrorBody {
    pub error: StripeApiError,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeApiError {
    #[serde(rename = "type", default)]
    pub error_type: Option<String>,

    #[serde(default)]
    pub code: Option<String>,

    #[serde(default)]
    pub message: Option<String>,
}

/// Convert a failed Stripe response into a `PaymentError` carrying Stripe's message.
pub fn payment_error_from_response(status: u16, body: &str) -> PaymentError {
    let parsed = serde_json::from_str::<StripeErrorBody>(body).ok();

    let error_type = parsed.as_ref().and_then(|b| b.error.error_type.clone());
    let code = match (status, error_type.as_deref()) {
        (_, Some("card_error")) | (402, _) => PaymentErrorCode::CardDeclined,
        (401, _) => PaymentErrorCode::AuthenticationError,
        (404, _) => PaymentErrorCode::NotFound,
        (429, _) => PaymentErrorCode::RateLimitExceeded,
        (400, _) | (_, Some("invalid_request_error")) => PaymentErrorCode::InvalidRequest,
        _ => PaymentErrorCode::ProviderError,
    };

    let message = parsed
        .as_ref()
        .and_then(|b| b.error.message.clone())
        .unwrap_or_else(|| format!("Stripe API error (HTTP {})", status));

    let error = PaymentError::new(code, message);
    match parsed.and_then(|b| b.error.code) {
        Some(provider_code) => error.with_provider_code(provider_code),
        None => error,
    }
}
