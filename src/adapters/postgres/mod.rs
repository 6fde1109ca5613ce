//! PostgreSQL adapters - Database implementations for repository ports.
//!
//! - `PostgresSubscriptionStore` - Per-user subscription records
//!
//! Schema lives in `migrations/` and is applied at startup with
//! [`run_migrations`].

mod subscription_store;

pub use subscription_store::PostgresSubscriptionStore;

use sqlx::PgPool;

use crate::domain::foundation::{DomainError, ErrorCode};

/// Apply the embedded migrations.
pub async fn run_migrations(pool: &PgPool) -> Result<(), DomainError> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| DomainError::new(ErrorCode::DatabaseError, format!("Migration failed: {}", e)))
}
