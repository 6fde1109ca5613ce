//! Data Transfer Objects for the billing HTTP endpoints.
//!
//! Request bodies and JSON responses; every successful subscription API
//! response carries `success: true` so front-ends can branch on one field.

use serde::{Deserialize, Serialize};

use crate::application::handlers::billing::{
    BillingInfo, CreateSubscriptionResult, SubscriptionView, UserStatus,
};
use crate::domain::billing::{Plan, PlanInterval, SubscriptionStatus};
use crate::domain::foundation::Timestamp;
use crate::ports::Customer;

// ════════════════════════════════════════════════════════════════════════════════
// Request DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Request to create a Stripe customer.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateCustomerRequest {
    pub user_id: String,
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// Request to create a subscription.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateSubscriptionRequest {
    pub customer_id: String,
    pub plan_id: String,
    pub payment_method_id: String,
}

/// Request to cancel or reactivate a subscription.
#[derive(Debug, Clone, Deserialize)]
pub struct SubscriptionUpdateRequest {
    pub subscription_id: String,
    /// `cancel` or `reactivate`; must match the endpoint.
    pub action: String,
}

// ════════════════════════════════════════════════════════════════════════════════
// Response DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// A catalog plan as the front-end displays it.
#[derive(Debug, Clone, Serialize)]
pub struct PlanResponse {
    pub id: String,
    pub name: String,
    /// Price in major units.
    pub price: f64,
    pub currency: String,
    pub interval: PlanInterval,
    pub stripe_price_id: Option<String>,
    pub features: Vec<String>,
    pub limitations: Vec<String>,
}

impl From<&Plan> for PlanResponse {
    fn from(plan: &Plan) -> Self {
        Self {
            id: plan.id.to_string(),
            name: plan.name.clone(),
            price: plan.price(),
            currency: plan.currency.clone(),
            interval: plan.interval,
            stripe_price_id: plan.stripe_price_id.clone(),
            features: plan.features.clone(),
            limitations: plan.limitations.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PlansResponse {
    pub success: bool,
    pub plans: Vec<PlanResponse>,
}

#[derive(Debug, Serialize)]
pub struct CustomerResponse {
    pub id: String,
    pub email: Option<String>,
    pub name: Option<String>,
    pub created_at: Option<Timestamp>,
}

impl From<Customer> for CustomerResponse {
    fn from(customer: Customer) -> Self {
        Self {
            created_at: Timestamp::from_unix_secs(customer.created_at),
            id: customer.id,
            email: customer.email,
            name: customer.name,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CreateCustomerResponse {
    pub success: bool,
    pub customer_id: String,
    pub customer: CustomerResponse,
}

#[derive(Debug, Serialize)]
pub struct CreateSubscriptionResponse {
    pub success: bool,
    pub subscription_id: String,
    pub client_secret: Option<String>,
    pub status: SubscriptionStatus,
}

impl From<CreateSubscriptionResult> for CreateSubscriptionResponse {
    fn from(result: CreateSubscriptionResult) -> Self {
        Self {
            success: true,
            subscription_id: result.subscription_id,
            client_secret: result.client_secret,
            status: result.status,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SubscriptionResponse {
    pub id: String,
    pub status: SubscriptionStatus,
    pub plan_id: String,
    pub plan_name: String,
    pub current_period_start: Option<Timestamp>,
    pub current_period_end: Option<Timestamp>,
    pub cancel_at_period_end: bool,
    pub created_at: Option<Timestamp>,
    pub updated_at: Timestamp,
}

impl From<SubscriptionView> for SubscriptionResponse {
    fn from(view: SubscriptionView) -> Self {
        Self {
            id: view.id,
            status: view.status,
            plan_id: view.plan_id.to_string(),
            plan_name: view.plan_name,
            current_period_start: view.current_period_start,
            current_period_end: view.current_period_end,
            cancel_at_period_end: view.cancel_at_period_end,
            created_at: view.created_at,
            updated_at: view.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct GetSubscriptionResponse {
    pub success: bool,
    pub subscription: SubscriptionResponse,
}

#[derive(Debug, Serialize)]
pub struct SubscriptionUpdateResponse {
    pub success: bool,
    pub cancel_at_period_end: bool,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct UserStatusResponse {
    pub user_id: String,
    pub has_subscription: bool,
    pub subscription: Option<SubscriptionResponse>,
    pub plan: PlanResponse,
    pub features: Vec<String>,
    pub limitations: Vec<String>,
}

impl From<UserStatus> for UserStatusResponse {
    fn from(status: UserStatus) -> Self {
        Self {
            features: status.features().to_vec(),
            limitations: status.limitations().to_vec(),
            plan: PlanResponse::from(&status.plan),
            user_id: status.user_id,
            has_subscription: status.has_subscription,
            subscription: status.subscription.map(SubscriptionResponse::from),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct GetUserStatusResponse {
    pub success: bool,
    pub user_status: UserStatusResponse,
}

#[derive(Debug, Serialize)]
pub struct BillingInfoResponse {
    pub subscription_id: String,
    pub next_billing_date: Option<Timestamp>,
    pub amount: f64,
    pub currency: String,
    pub status: SubscriptionStatus,
    pub payment_method: Option<String>,
}

impl From<BillingInfo> for BillingInfoResponse {
    fn from(info: BillingInfo) -> Self {
        Self {
            subscription_id: info.subscription_id,
            next_billing_date: info.next_billing_date,
            amount: info.amount,
            currency: info.currency,
            status: info.status,
            payment_method: info.payment_method,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct GetBillingInfoResponse {
    pub success: bool,
    pub billing: BillingInfoResponse,
}

/// Public Stripe configuration for front-ends.
#[derive(Debug, Serialize)]
pub struct StripeConfigResponse {
    pub publishable_key: Option<String>,
    pub plans: Vec<PlanResponse>,
}

/// Acknowledgement of a webhook delivery.
#[derive(Debug, Serialize)]
pub struct WebhookAckResponse {
    pub status: &'static str,
    pub event_type: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Error body; `detail` carries the human-readable message.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub detail: String,
    /// Error code for programmatic handling.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
}

impl ErrorResponse {
    pub fn new(error_code: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
            error_code: Some(error_code.into()),
        }
    }

    /// An error body with only a message, as the webhook endpoint returns.
    pub fn detail(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
            error_code: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::billing::PlanCatalog;
    use std::collections::HashMap;

    #[test]
    fn plan_response_reports_major_unit_price() {
        let catalog = PlanCatalog::standard(Some("price_premium".to_string()));
        let plan = catalog.get_plan("premium").unwrap();

        let json = serde_json::to_value(PlanResponse::from(plan)).unwrap();

        assert_eq!(json["price"], 9.99);
        assert_eq!(json["interval"], "month");
        assert_eq!(json["stripe_price_id"], "price_premium");
    }

    #[test]
    fn create_subscription_request_requires_payment_method() {
        let result: Result<CreateSubscriptionRequest, _> =
            serde_json::from_str(r#"{"customer_id": "cus_1", "plan_id": "premium"}"#);

        assert!(result.is_err());
    }

    #[test]
    fn create_customer_request_name_is_optional() {
        let request: CreateCustomerRequest =
            serde_json::from_str(r#"{"user_id": "u1", "email": "a@example.com"}"#).unwrap();

        assert!(request.name.is_none());
    }

    #[test]
    fn customer_response_formats_created_at() {
        let response = CustomerResponse::from(Customer {
            id: "cus_1".to_string(),
            email: Some("a@example.com".to_string()),
            name: None,
            created_at: 1_704_067_200,
            metadata: HashMap::new(),
        });

        let json = serde_json::to_value(response).unwrap();
        assert_eq!(json["created_at"], "2024-01-01T00:00:00Z");
    }

    #[test]
    fn free_user_status_lists_plan_features() {
        let catalog = PlanCatalog::standard(None);
        let response = UserStatusResponse::from(UserStatus::free("u1", &catalog));

        let json = serde_json::to_value(response).unwrap();
        assert_eq!(json["has_subscription"], false);
        assert_eq!(json["plan"]["id"], "free");
        assert!(json["subscription"].is_null());
        assert_eq!(json["features"], json["plan"]["features"]);
    }

    #[test]
    fn webhook_error_body_has_only_detail() {
        let json = serde_json::to_value(ErrorResponse::detail("Invalid signature")).unwrap();

        assert_eq!(json, serde_json::json!({"detail": "Invalid signature"}));
    }
}
