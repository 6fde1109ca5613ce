//! PostgreSQL implementation of SubscriptionStore.
//!
//! Rows are locked, merged in Rust with `SubscriptionChanges::apply`, and
//! written back inside one transaction, so concurrent deliveries for the same
//! user serialise on the row lock. `upsert_by_user` inserts an empty row first
//! so there is always something to lock, even for a user's first write.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};

use crate::domain::billing::{SubscriptionChanges, SubscriptionRecord, SubscriptionStatus};
use crate::domain::foundation::{DomainError, ErrorCode, PlanId, Timestamp, UserId};
use crate::ports::SubscriptionStore;

const SELECT_COLUMNS: &str = r#"
    SELECT user_id, stripe_customer_id, stripe_subscription_id, plan_id, email, status,
           current_period_start, current_period_end, cancel_at_period_end,
           created_at, updated_at
    FROM user_subscriptions
"#;

/// PostgreSQL implementation of the SubscriptionStore port.
pub struct PostgresSubscriptionStore {
    pool: PgPool,
}

impl PostgresSubscriptionStore {
    /// Creates a new PostgresSubscriptionStore with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn begin(&self) -> Result<Transaction<'static, Postgres>, DomainError> {
        self.pool
            .begin()
            .await
            .map_err(|e| db_error("Failed to begin transaction", e))
    }

    /// Creates the user's row if missing. A concurrent inserter blocks on the
    /// primary key until the first transaction commits.
    async fn ensure_row(
        tx: &mut Transaction<'static, Postgres>,
        user_id: &UserId,
        now: Timestamp,
    ) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO user_subscriptions (user_id, created_at, updated_at)
            VALUES ($1, $2, $2)
            ON CONFLICT (user_id) DO NOTHING
            "#,
        )
        .bind(user_id.as_str())
        .bind(now.as_datetime())
        .execute(&mut **tx)
        .await
        .map_err(|e| db_error("Failed to create subscription row", e))?;

        Ok(())
    }

    async fn write(
        tx: &mut Transaction<'static, Postgres>,
        record: &SubscriptionRecord,
    ) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            UPDATE user_subscriptions SET
                stripe_customer_id = $2,
                stripe_subscription_id = $3,
                plan_id = $4,
                email = $5,
                status = $6,
                current_period_start = $7,
                current_period_end = $8,
                cancel_at_period_end = $9,
                updated_at = $10
            WHERE user_id = $1
            "#,
        )
        .bind(record.user_id.as_str())
        .bind(&record.stripe_customer_id)
        .bind(&record.stripe_subscription_id)
        .bind(record.plan_id.as_ref().map(PlanId::as_str))
        .bind(&record.email)
        .bind(record.status.as_ref().map(SubscriptionStatus::as_str))
        .bind(record.current_period_start.as_ref().map(|t| *t.as_datetime()))
        .bind(record.current_period_end.as_ref().map(|t| *t.as_datetime()))
        .bind(record.cancel_at_period_end)
        .bind(record.updated_at.as_datetime())
        .execute(&mut **tx)
        .await
        .map_err(|e| db_error("Failed to save subscription", e))?;

        Ok(())
    }
}

/// Database row representation of a subscription record.
#[derive(Debug, sqlx::FromRow)]
struct SubscriptionRow {
    user_id: String,
    stripe_customer_id: Option<String>,
    stripe_subscription_id: Option<String>,
    plan_id: Option<String>,
    email: Option<String>,
    status: Option<String>,
    current_period_start: Option<DateTime<Utc>>,
    current_period_end: Option<DateTime<Utc>>,
    cancel_at_period_end: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<SubscriptionRow> for SubscriptionRecord {
    type Error = DomainError;

    fn try_from(row: SubscriptionRow) -> Result<Self, Self::Error> {
        Ok(SubscriptionRecord {
            user_id: UserId::new(row.user_id).map_err(|e| {
                DomainError::new(ErrorCode::DatabaseError, format!("Invalid user_id: {}", e))
            })?,
            stripe_customer_id: row.stripe_customer_id,
            stripe_subscription_id: row.stripe_subscription_id,
            plan_id: row.plan_id.map(PlanId::new),
            email: row.email,
            status: row.status.as_deref().map(SubscriptionStatus::parse),
            current_period_start: row.current_period_start.map(Timestamp::from_datetime),
            current_period_end: row.current_period_end.map(Timestamp::from_datetime),
            cancel_at_period_end: row.cancel_at_period_end,
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

fn db_error(context: &str, e: sqlx::Error) -> DomainError {
    DomainError::new(ErrorCode::DatabaseError, format!("{}: {}", context, e))
}

#[async_trait]
impl SubscriptionStore for PostgresSubscriptionStore {
    async fn upsert_by_user(
        &self,
        user_id: &UserId,
        changes: &SubscriptionChanges,
    ) -> Result<SubscriptionRecord, DomainError> {
        let now = Timestamp::now();
        let mut tx = self.begin().await?;
        Self::ensure_row(&mut tx, user_id, now).await?;

        let row: SubscriptionRow =
            sqlx::query_as(&format!("{} WHERE user_id = $1 FOR UPDATE", SELECT_COLUMNS))
                .bind(user_id.as_str())
                .fetch_one(&mut *tx)
                .await
                .map_err(|e| db_error("Failed to lock subscription", e))?;

        let mut record = SubscriptionRecord::try_from(row)?;
        changes.apply(&mut record, now);

        Self::write(&mut tx, &record).await?;
        tx.commit()
            .await
            .map_err(|e| db_error("Failed to commit transaction", e))?;

        Ok(record)
    }

    async fn update_by_subscription_id(
        &self,
        subscription_id: &str,
        changes: &SubscriptionChanges,
    ) -> Result<u64, DomainError> {
        let now = Timestamp::now();
        let mut tx = self.begin().await?;

        let rows: Vec<SubscriptionRow> = sqlx::query_as(&format!(
            "{} WHERE stripe_subscription_id = $1 FOR UPDATE",
            SELECT_COLUMNS
        ))
        .bind(subscription_id)
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| db_error("Failed to find subscriptions", e))?;

        let mut updated = 0;
        for row in rows {
            let mut record = SubscriptionRecord::try_from(row)?;
            changes.apply(&mut record, now);
            Self::write(&mut tx, &record).await?;
            updated += 1;
        }

        tx.commit()
            .await
            .map_err(|e| db_error("Failed to commit transaction", e))?;

        Ok(updated)
    }

    async fn get_by_user(
        &self,
        user_id: &UserId,
    ) -> Result<Option<SubscriptionRecord>, DomainError> {
        let row: Option<SubscriptionRow> =
            sqlx::query_as(&format!("{} WHERE user_id = $1", SELECT_COLUMNS))
                .bind(user_id.as_str())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| db_error("Failed to find subscription", e))?;

        row.map(SubscriptionRecord::try_from).transpose()
    }
}
