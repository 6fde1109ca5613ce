//! Stripe billing provider adapter.
//!
//! Implements the `BillingProvider` trait against the Stripe REST API:
//! form-encoded requests with the secret key as basic-auth username.
//! Webhook verification is local and comes from the trait's default method.
//!
//! # Configuration
//!
//! ```ignore
//! let config = StripeConfig::new(api_key);
//! let adapter = StripeBillingAdapter::new(config);
//! ```

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;

use crate::ports::{
    BillingProvider, CreateCustomerRequest, CreateSubscriptionRequest, CreatedSubscription,
    Customer, PaymentError, PaymentErrorCode, Subscription,
};

use super::api_types::{payment_error_from_response, StripeCustomer, StripeSubscription};

const DEFAULT_API_BASE_URL: &str = "https://api.stripe.com";

/// Stripe API configuration.
#[derive(Clone)]
pub struct StripeConfig {
    /// Stripe secret API key (sk_live_... or sk_test_...).
    api_key: SecretString,

    /// Base URL for Stripe API (default: https://api.stripe.com).
    api_base_url: String,
}

impl StripeConfig {
    /// Create a new Stripe configuration.
    pub fn new(api_key: SecretString) -> Self {
        Self {
            api_key,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
        }
    }

    /// Set a custom API base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn api_base_url(&self) -> &str {
        &self.api_base_url
    }
}

impl std::fmt::Debug for StripeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeConfig")
            .field("api_key", &"[REDACTED]")
            .field("api_base_url", &self.api_base_url)
            .finish()
    }
}

/// Stripe billing provider adapter.
pub struct StripeBillingAdapter {
    config: StripeConfig,
    http_client: reqwest::Client,
}

impl StripeBillingAdapter {
    /// Create a new Stripe adapter with the given configuration.
    pub fn new(config: StripeConfig) -> Self {
        Self {
            config,
            http_client: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v1/{}", self.config.api_base_url, path)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>, PaymentError> {
        let response = self
            .http_client
            .get(self.url(path))
            .basic_auth(self.config.api_key.expose_secret(), Option::<&str>::None)
            .send()
            .await
            .map_err(|e| PaymentError::network(e.to_string()))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }

        Self::parse(path, response).await.map(Some)
    }

    async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T, PaymentError> {
        let response = self
            .http_client
            .post(self.url(path))
            .basic_auth(self.config.api_key.expose_secret(), Option::<&str>::None)
            .form(params)
            .send()
            .await
            .map_err(|e| PaymentError::network(e.to_string()))?;

        Self::parse(path, response).await
    }

    async fn parse<T: DeserializeOwned>(
        path: &str,
        response: reqwest::Response,
    ) -> Result<T, PaymentError> {
        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            let error = payment_error_from_response(status.as_u16(), &error_text);
            tracing::error!(
                path = %path,
                status = status.as_u16(),
                error = %error,
                "Stripe API call failed"
            );
            return Err(error);
        }

        response.json().await.map_err(|e| {
            PaymentError::new(
                PaymentErrorCode::ProviderError,
                format!("Failed to parse Stripe response: {}", e),
            )
        })
    }
}

#[async_trait]
impl BillingProvider for StripeBillingAdapter {
    async fn get_customer(&self, customer_id: &str) -> Result<Option<Customer>, PaymentError> {
        let customer: Option<StripeCustomer> =
            self.get(&format!("customers/{}", customer_id)).await?;

        Ok(customer.filter(|c| !c.deleted).map(Customer::from))
    }

    async fn create_customer(
        &self,
        request: CreateCustomerRequest,
    ) -> Result<Customer, PaymentError> {
        let mut params = vec![
            ("email", request.email.clone()),
            ("metadata[user_id]", request.user_id.to_string()),
        ];
        if let Some(name) = &request.name {
            params.push(("name", name.clone()));
        }

        let customer: StripeCustomer = self.post("customers", &params).await?;
        Ok(customer.into())
    }

    async fn attach_payment_method(
        &self,
        payment_method_id: &str,
        customer_id: &str,
    ) -> Result<(), PaymentError> {
        let _: serde_json::Value = self
            .post(
                &format!("payment_methods/{}/attach", payment_method_id),
                &[("customer", customer_id.to_string())],
            )
            .await?;
        Ok(())
    }

    async fn set_default_payment_method(
        &self,
        customer_id: &str,
        payment_method_id: &str,
    ) -> Result<(), PaymentError> {
        let _: serde_json::Value = self
            .post(
                &format!("customers/{}", customer_id),
                &[(
                    "invoice_settings[default_payment_method]",
                    payment_method_id.to_string(),
                )],
            )
            .await?;
        Ok(())
    }

    async fn create_subscription(
        &self,
        request: CreateSubscriptionRequest,
    ) -> Result<CreatedSubscription, PaymentError> {
        let mut params = vec![
            ("customer", request.customer_id.clone()),
            ("items[0][price]", request.price_id.clone()),
            ("payment_behavior", "default_incomplete".to_string()),
            (
                "payment_settings[save_default_payment_method]",
                "on_subscription".to_string(),
            ),
            ("expand[]", "latest_invoice.payment_intent".to_string()),
            ("metadata[plan_id]", request.plan_id.to_string()),
        ];
        if let Some(user_id) = &request.user_id {
            params.push(("metadata[user_id]", user_id.to_string()));
        }

        let subscription: StripeSubscription = self.post("subscriptions", &params).await?;
        let client_secret = subscription.client_secret();

        Ok(CreatedSubscription {
            subscription: subscription.into(),
            client_secret,
        })
    }

    async fn get_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<Option<Subscription>, PaymentError> {
        let subscription: Option<StripeSubscription> =
            self.get(&format!("subscriptions/{}", subscription_id)).await?;

        Ok(subscription.map(Subscription::from))
    }

    async fn set_cancel_at_period_end(
        &self,
        subscription_id: &str,
        cancel: bool,
    ) -> Result<Subscription, PaymentError> {
        let subscription: StripeSubscription = self
            .post(
                &format!("subscriptions/{}", subscription_id),
                &[("cancel_at_period_end", cancel.to_string())],
            )
            .await?;

        Ok(subscription.into())
    }
}
