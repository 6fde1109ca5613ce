//! Topaz Billing server entry point.

use std::sync::Arc;

use secrecy::SecretString;
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use topaz_billing::adapters::http::{billing_router, BillingAppState, StripeSettings};
use topaz_billing::adapters::memory::InMemorySubscriptionStore;
use topaz_billing::adapters::postgres::{run_migrations, PostgresSubscriptionStore};
use topaz_billing::adapters::stripe::{StripeBillingAdapter, StripeConfig};
use topaz_billing::config::{AppConfig, DatabaseConfig, PaymentConfig, ServerConfig};
use topaz_billing::domain::billing::PlanCatalog;
use topaz_billing::ports::{BillingProvider, SubscriptionStore};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let config = AppConfig::load()?;
    init_tracing(&config.server);
    config.validate()?;

    let payment = &config.payment;
    if !payment.is_configured() {
        tracing::warn!("Stripe credentials incomplete; billing endpoints will return 503");
    }

    let state = BillingAppState {
        billing_provider: billing_provider(payment),
        subscription_store: subscription_store(&config.database).await?,
        plan_catalog: Arc::new(PlanCatalog::standard(payment.premium_price_id.clone())),
        stripe: StripeSettings {
            publishable_key: payment.stripe_publishable_key.clone(),
            webhook_secret: payment.stripe_webhook_secret.clone(),
            configured: payment.is_configured(),
            signature_tolerance: payment.signature_tolerance(),
        },
    };

    let app = billing_router()
        .with_state(state)
        .layer(TimeoutLayer::new(config.server.request_timeout()))
        .layer(TraceLayer::new_for_http());

    let addr = config.server.socket_addr()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, environment = ?config.server.environment, "Billing service listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Billing service stopped");
    Ok(())
}

fn init_tracing(server: &ServerConfig) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&server.log_level));

    if server.log_json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

fn billing_provider(payment: &PaymentConfig) -> Arc<dyn BillingProvider> {
    let api_key = payment
        .stripe_secret_key
        .clone()
        .unwrap_or_else(|| SecretString::new(String::new()));
    let mut stripe = StripeConfig::new(api_key);
    if let Some(url) = &payment.stripe_api_base_url {
        stripe = stripe.with_base_url(url.clone());
    }
    Arc::new(StripeBillingAdapter::new(stripe))
}

async fn subscription_store(
    database: &DatabaseConfig,
) -> Result<Arc<dyn SubscriptionStore>, BoxError> {
    if !database.is_enabled() {
        tracing::warn!("No database URL configured; subscription records are kept in memory");
        return Ok(Arc::new(InMemorySubscriptionStore::new()));
    }

    let pool = PgPoolOptions::new()
        .min_connections(database.min_connections)
        .max_connections(database.max_connections)
        .acquire_timeout(database.acquire_timeout())
        .connect(&database.url)
        .await?;

    if database.run_migrations {
        run_migrations(&pool).await?;
        tracing::info!("Database migrations applied");
    }

    Ok(Arc::new(PostgresSubscriptionStore::new(pool)))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C, shutting down"),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down"),
    }
}
