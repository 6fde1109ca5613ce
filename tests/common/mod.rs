//! Shared fixtures for the HTTP integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use secrecy::SecretString;
use serde_json::Value;
use tower::ServiceExt;

use topaz_billing::adapters::http::{billing_router, BillingAppState, StripeSettings};
use topaz_billing::adapters::memory::InMemorySubscriptionStore;
use topaz_billing::adapters::stripe::MockBillingProvider;
use topaz_billing::domain::billing::{
    generate_signature_header, PlanCatalog, SignatureTolerance,
};

pub const WEBHOOK_SECRET: &str = "whsec_integration_test";

/// A router wired to a mock provider and an in-memory store.
pub struct TestApp {
    pub provider: MockBillingProvider,
    pub store: InMemorySubscriptionStore,
    pub router: Router,
}

impl TestApp {
    /// Fully configured Stripe.
    pub fn new() -> Self {
        Self::with_provider(MockBillingProvider::new(), configured_settings())
    }

    /// No Stripe credentials at all.
    pub fn unconfigured() -> Self {
        Self::with_provider(MockBillingProvider::new(), StripeSettings::default())
    }

    pub fn with_provider(provider: MockBillingProvider, stripe: StripeSettings) -> Self {
        let store = InMemorySubscriptionStore::new();
        let state = BillingAppState {
            billing_provider: Arc::new(provider.clone()),
            subscription_store: Arc::new(store.clone()),
            plan_catalog: Arc::new(PlanCatalog::standard(Some("price_premium".to_string()))),
            stripe,
        };

        Self {
            provider,
            store,
            router: billing_router().with_state(state),
        }
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("GET")
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        self.send(request).await
    }

    pub async fn post_json(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }

    /// Posts a webhook with an optional `stripe-signature` header.
    pub async fn post_webhook(&self, payload: &[u8], signature: Option<&str>) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/api/webhooks/stripe")
            .header("content-type", "application/json");
        if let Some(signature) = signature {
            builder = builder.header("stripe-signature", signature);
        }
        let request = builder.body(Body::from(payload.to_vec())).unwrap();
        self.send(request).await
    }

    /// Posts a webhook signed now with the test secret.
    pub async fn post_signed_webhook(&self, event: &Value) -> (StatusCode, Value) {
        let payload = event.to_string();
        let header = sign(payload.as_bytes(), chrono::Utc::now().timestamp());
        self.post_webhook(payload.as_bytes(), Some(&header)).await
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }
}

pub fn configured_settings() -> StripeSettings {
    StripeSettings {
        publishable_key: Some("pk_test_integration".to_string()),
        webhook_secret: Some(SecretString::new(WEBHOOK_SECRET.to_string())),
        configured: true,
        signature_tolerance: SignatureTolerance::default(),
    }
}

pub fn sign(payload: &[u8], timestamp: i64) -> String {
    generate_signature_header(WEBHOOK_SECRET, timestamp, payload).unwrap()
}

/// A Stripe event envelope around `object`.
pub fn event(id: &str, event_type: &str, object: Value) -> Value {
    serde_json::json!({
        "id": id,
        "object": "event",
        "type": event_type,
        "created": chrono::Utc::now().timestamp(),
        "livemode": false,
        "data": { "object": object }
    })
}

/// A subscription object as Stripe sends it in webhooks.
pub fn subscription_object(
    id: &str,
    customer: &str,
    status: &str,
    period: (i64, i64),
) -> Value {
    serde_json::json!({
        "id": id,
        "object": "subscription",
        "customer": customer,
        "status": status,
        "cancel_at_period_end": false,
        "current_period_start": period.0,
        "current_period_end": period.1,
        "items": {
            "object": "list",
            "data": [{ "id": "si_1", "price": { "id": "price_premium" } }]
        },
        "metadata": {}
    })
}
