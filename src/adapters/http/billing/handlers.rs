//! HTTP handlers for the billing endpoints.
//!
//! These handlers connect Axum routes to application layer command/query handlers.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Json, Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use secrecy::SecretString;

use crate::application::handlers::billing::{
    CancellationAction, CreateCustomerCommand, CreateCustomerHandler, CreateSubscriptionCommand,
    CreateSubscriptionHandler, GetBillingInfoHandler, GetBillingInfoQuery,
    GetSubscriptionHandler, GetSubscriptionQuery, GetUserStatusHandler, GetUserStatusQuery,
    ReconcileWebhookCommand, UpdateCancellationCommand, UpdateCancellationHandler,
    WebhookReconciler,
};
use crate::domain::billing::{BillingError, PlanCatalog, SignatureTolerance, WebhookError};
use crate::ports::{BillingProvider, SubscriptionStore};

use super::dto::{
    BillingInfoResponse, CreateCustomerRequest, CreateCustomerResponse,
    CreateSubscriptionRequest, CreateSubscriptionResponse, CustomerResponse, ErrorResponse,
    GetBillingInfoResponse, GetSubscriptionResponse, GetUserStatusResponse, HealthResponse,
    PlanResponse, PlansResponse, StripeConfigResponse, SubscriptionResponse,
    SubscriptionUpdateRequest, SubscriptionUpdateResponse, UserStatusResponse,
    WebhookAckResponse,
};

/// Header carrying Stripe's webhook signature.
pub const STRIPE_SIGNATURE_HEADER: &str = "stripe-signature";

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

/// Stripe settings the endpoints need at request time.
#[derive(Clone, Default)]
pub struct StripeSettings {
    pub publishable_key: Option<String>,
    pub webhook_secret: Option<SecretString>,
    /// True when the API key, publishable key and webhook secret are all set.
    pub configured: bool,
    pub signature_tolerance: SignatureTolerance,
}

/// Shared application state containing all dependencies.
///
/// Cloned for each request; dependencies are Arc-wrapped.
#[derive(Clone)]
pub struct BillingAppState {
    pub billing_provider: Arc<dyn BillingProvider>,
    pub subscription_store: Arc<dyn SubscriptionStore>,
    pub plan_catalog: Arc<PlanCatalog>,
    pub stripe: StripeSettings,
}

impl BillingAppState {
    /// Create handlers on demand from the shared state.
    pub fn webhook_reconciler(&self) -> WebhookReconciler {
        WebhookReconciler::new(
            self.billing_provider.clone(),
            self.subscription_store.clone(),
            self.plan_catalog.clone(),
            self.stripe.webhook_secret.clone(),
        )
        .with_tolerance(self.stripe.signature_tolerance)
    }

    pub fn create_customer_handler(&self) -> CreateCustomerHandler {
        CreateCustomerHandler::new(
            self.billing_provider.clone(),
            self.subscription_store.clone(),
            self.stripe.configured,
        )
    }

    pub fn create_subscription_handler(&self) -> CreateSubscriptionHandler {
        CreateSubscriptionHandler::new(
            self.billing_provider.clone(),
            self.subscription_store.clone(),
            self.plan_catalog.clone(),
            self.stripe.configured,
        )
    }

    pub fn get_subscription_handler(&self) -> GetSubscriptionHandler {
        GetSubscriptionHandler::new(
            self.billing_provider.clone(),
            self.plan_catalog.clone(),
            self.stripe.configured,
        )
    }

    pub fn update_cancellation_handler(
        &self,
        action: CancellationAction,
    ) -> UpdateCancellationHandler {
        UpdateCancellationHandler::new(
            self.billing_provider.clone(),
            self.subscription_store.clone(),
            action,
            self.stripe.configured,
        )
    }

    pub fn user_status_handler(&self) -> GetUserStatusHandler {
        GetUserStatusHandler::new(
            self.billing_provider.clone(),
            self.subscription_store.clone(),
            self.plan_catalog.clone(),
        )
    }

    pub fn billing_info_handler(&self) -> GetBillingInfoHandler {
        GetBillingInfoHandler::new(
            self.billing_provider.clone(),
            self.plan_catalog.clone(),
            self.stripe.configured,
        )
    }

    fn plan_responses(&self) -> Vec<PlanResponse> {
        self.plan_catalog.list_plans().map(PlanResponse::from).collect()
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Webhook
// ════════════════════════════════════════════════════════════════════════════════

/// POST /api/webhooks/stripe - Reconcile a Stripe webhook delivery
///
/// The body is taken as raw bytes; the signature covers them exactly.
pub async fn handle_stripe_webhook(
    State(state): State<BillingAppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAckResponse>, WebhookApiError> {
    let signature = headers
        .get(STRIPE_SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(String::from);

    let cmd = ReconcileWebhookCommand {
        payload: body.to_vec(),
        signature,
    };

    let ack = state.webhook_reconciler().handle(cmd).await?;

    Ok(Json(WebhookAckResponse {
        status: "success",
        event_type: ack.event_type,
    }))
}

// ════════════════════════════════════════════════════════════════════════════════
// Query Handlers (GET endpoints)
// ════════════════════════════════════════════════════════════════════════════════

/// GET /health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

/// GET /api/subscriptions/plans - List the plan catalog
pub async fn get_plans(State(state): State<BillingAppState>) -> Json<PlansResponse> {
    Json(PlansResponse {
        success: true,
        plans: state.plan_responses(),
    })
}

/// GET /api/subscriptions/config - Publishable key and plans for front-ends
pub async fn get_stripe_config(State(state): State<BillingAppState>) -> Json<StripeConfigResponse> {
    Json(StripeConfigResponse {
        publishable_key: state.stripe.publishable_key.clone(),
        plans: state.plan_responses(),
    })
}

/// GET /api/subscriptions/subscription/:subscription_id
pub async fn get_subscription(
    State(state): State<BillingAppState>,
    Path(subscription_id): Path<String>,
) -> Result<impl IntoResponse, BillingApiError> {
    let view = state
        .get_subscription_handler()
        .handle(GetSubscriptionQuery { subscription_id })
        .await?;

    Ok(Json(GetSubscriptionResponse {
        success: true,
        subscription: SubscriptionResponse::from(view),
    }))
}

/// GET /api/subscriptions/user-status/:user_id
pub async fn get_user_status(
    State(state): State<BillingAppState>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, BillingApiError> {
    let status = state
        .user_status_handler()
        .handle(GetUserStatusQuery { user_id })
        .await?;

    Ok(Json(GetUserStatusResponse {
        success: true,
        user_status: UserStatusResponse::from(status),
    }))
}

/// GET /api/subscriptions/billing/:subscription_id
pub async fn get_billing_info(
    State(state): State<BillingAppState>,
    Path(subscription_id): Path<String>,
) -> Result<impl IntoResponse, BillingApiError> {
    let info = state
        .billing_info_handler()
        .handle(GetBillingInfoQuery { subscription_id })
        .await?;

    Ok(Json(GetBillingInfoResponse {
        success: true,
        billing: BillingInfoResponse::from(info),
    }))
}

// ════════════════════════════════════════════════════════════════════════════════
// Command Handlers (POST endpoints)
// ════════════════════════════════════════════════════════════════════════════════

/// POST /api/subscriptions/create-customer
pub async fn create_customer(
    State(state): State<BillingAppState>,
    Json(request): Json<CreateCustomerRequest>,
) -> Result<impl IntoResponse, BillingApiError> {
    let result = state
        .create_customer_handler()
        .handle(CreateCustomerCommand {
            user_id: request.user_id,
            email: request.email,
            name: request.name,
        })
        .await?;

    Ok(Json(CreateCustomerResponse {
        success: true,
        customer_id: result.customer.id.clone(),
        customer: CustomerResponse::from(result.customer),
    }))
}

/// POST /api/subscriptions/create-subscription
pub async fn create_subscription(
    State(state): State<BillingAppState>,
    Json(request): Json<CreateSubscriptionRequest>,
) -> Result<impl IntoResponse, BillingApiError> {
    let result = state
        .create_subscription_handler()
        .handle(CreateSubscriptionCommand {
            customer_id: request.customer_id,
            plan_id: request.plan_id,
            payment_method_id: request.payment_method_id,
        })
        .await?;

    Ok(Json(CreateSubscriptionResponse::from(result)))
}

/// POST /api/subscriptions/cancel-subscription
pub async fn cancel_subscription(
    State(state): State<BillingAppState>,
    Json(request): Json<SubscriptionUpdateRequest>,
) -> Result<impl IntoResponse, BillingApiError> {
    update_cancellation(state, CancellationAction::Cancel, request).await
}

/// POST /api/subscriptions/reactivate-subscription
pub async fn reactivate_subscription(
    State(state): State<BillingAppState>,
    Json(request): Json<SubscriptionUpdateRequest>,
) -> Result<impl IntoResponse, BillingApiError> {
    update_cancellation(state, CancellationAction::Reactivate, request).await
}

async fn update_cancellation(
    state: BillingAppState,
    action: CancellationAction,
    request: SubscriptionUpdateRequest,
) -> Result<Json<SubscriptionUpdateResponse>, BillingApiError> {
    let result = state
        .update_cancellation_handler(action)
        .handle(UpdateCancellationCommand {
            subscription_id: request.subscription_id,
            action: request.action,
        })
        .await?;

    Ok(Json(SubscriptionUpdateResponse {
        success: true,
        cancel_at_period_end: result.cancel_at_period_end,
        message: result.message.to_string(),
    }))
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Handling
// ════════════════════════════════════════════════════════════════════════════════

/// API error type that converts billing errors to HTTP responses.
#[derive(Debug)]
pub struct BillingApiError(BillingError);

impl From<BillingError> for BillingApiError {
    fn from(err: BillingError) -> Self {
        Self(err)
    }
}

impl IntoResponse for BillingApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            BillingError::NotConfigured => StatusCode::SERVICE_UNAVAILABLE,
            BillingError::InvalidPlan(_)
            | BillingError::FreePlan
            | BillingError::InvalidAction { .. }
            | BillingError::ValidationFailed { .. }
            | BillingError::Provider(_) => StatusCode::BAD_REQUEST,
            BillingError::SubscriptionNotFound(_) => StatusCode::NOT_FOUND,
            BillingError::Infrastructure(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let message = match &self.0 {
            BillingError::Infrastructure(detail) => {
                tracing::error!(error = %detail, "Billing request failed");
                "Internal server error".to_string()
            }
            other => other.message(),
        };

        let body = ErrorResponse::new(self.0.code().to_string(), message);
        (status, Json(body)).into_response()
    }
}

/// Webhook error rendered as `{detail}` with the status Stripe should see.
#[derive(Debug)]
pub struct WebhookApiError(WebhookError);

impl From<WebhookError> for WebhookApiError {
    fn from(err: WebhookError) -> Self {
        Self(err)
    }
}

impl IntoResponse for WebhookApiError {
    fn into_response(self) -> Response {
        let body = ErrorResponse::detail(self.0.detail());
        (self.0.status_code(), Json(body)).into_response()
    }
}
