//! Billing domain - plans, subscription records and Stripe webhook events.
//!
//! Everything here is pure: no I/O, no clocks except where a caller passes
//! `now` in. Ports and handlers build on these types.

mod errors;
mod plan;
mod record;
mod status;
mod stripe_event;
mod webhook_errors;
mod webhook_verifier;

pub use errors::BillingError;
pub use plan::{Plan, PlanCatalog, PlanInterval, FREE_PLAN_ID, PREMIUM_PLAN_ID};
pub use record::{SubscriptionChanges, SubscriptionRecord};
pub use status::SubscriptionStatus;
pub use stripe_event::{
    ExpandableId, InvoiceObject, StripeEvent, StripeEventData, StripeEventType,
    SubscriptionObject,
};
pub use webhook_errors::WebhookError;
pub use webhook_verifier::{
    generate_signature_header, SignatureHeader, SignatureTolerance, StripeWebhookVerifier,
    DEFAULT_TOLERANCE_SECS, MAX_CLOCK_SKEW_SECS,
};

#[cfg(test)]
pub use stripe_event::StripeEventBuilder;
