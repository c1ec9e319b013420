//! Postgres-backed payment store. Schema lives in `migrations/`.

use crate::gateway::types::{Money, PaymentState};
use crate::store::{NewPaymentRecord, PaymentRecord, PaymentStore, StoreError, StoreResult};
use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{FromRow, PgPool};
use std::str::FromStr;
use std::time::Duration;
use tracing::{error, info};
use uuid::Uuid;

/// Initialize a connection pool for the store.
pub async fn init_pool(database_url: &str, max_connections: u32) -> StoreResult<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(30))
        .connect(database_url)
        .await
        .map_err(|e| {
            error!("failed to initialize database pool: {}", e);
            StoreError::from_sqlx(e)
        })?;
    info!(max_connections, "database pool initialized");
    Ok(pool)
}

pub struct PgPaymentStore {
    pool: PgPool,
}

impl PgPaymentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct PaymentRow {
    id: Uuid,
    order_id: String,
    remote_id: String,
    gateway_id: String,
    amount: BigDecimal,
    currency: String,
    state: String,
    remote_state: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl PaymentRow {
    fn into_record(self) -> StoreResult<PaymentRecord> {
        let state = PaymentState::from_str(&self.state).map_err(|_| StoreError::Inconsistent {
            message: format!("unknown payment state '{}' on record {}", self.state, self.id),
        })?;
        Ok(PaymentRecord {
            id: self.id,
            order_id: self.order_id,
            remote_id: self.remote_id,
            gateway_id: self.gateway_id,
            amount: Money::new(self.amount.to_string(), self.currency),
            state,
            remote_state: self.remote_state,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[async_trait]
impl PaymentStore for PgPaymentStore {
    async fn create(&self, new: NewPaymentRecord) -> StoreResult<PaymentRecord> {
        let amount =
            BigDecimal::from_str(&new.amount.amount).map_err(|_| StoreError::Inconsistent {
                message: format!("non-decimal amount '{}'", new.amount.amount),
            })?;

        let row = sqlx::query_as::<_, PaymentRow>(
            "INSERT INTO gateway_payments (order_id, remote_id, gateway_id, amount, currency, state)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING id, order_id, remote_id, gateway_id, amount, currency, state, remote_state, created_at, updated_at",
        )
        .bind(&new.order_id)
        .bind(&new.remote_id)
        .bind(&new.gateway_id)
        .bind(amount)
        .bind(&new.amount.currency)
        .bind(new.state.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(StoreError::from_sqlx)?;

        row.into_record()
    }

    async fn find_pending(
        &self,
        remote_id: &str,
        order_id: &str,
    ) -> StoreResult<Vec<PaymentRecord>> {
        let rows = sqlx::query_as::<_, PaymentRow>(
            "SELECT id, order_id, remote_id, gateway_id, amount, currency, state, remote_state, created_at, updated_at
             FROM gateway_payments
             WHERE remote_id = $1 AND order_id = $2 AND state = $3",
        )
        .bind(remote_id)
        .bind(order_id)
        .bind(PaymentState::Authorization.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::from_sqlx)?;

        rows.into_iter().map(PaymentRow::into_record).collect()
    }

    async fn save(&self, record: &PaymentRecord) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE gateway_payments
             SET state = $2, remote_state = $3, updated_at = NOW()
             WHERE id = $1",
        )
        .bind(record.id)
        .bind(record.state.as_str())
        .bind(&record.remote_state)
        .execute(&self.pool)
        .await
        .map_err(StoreError::from_sqlx)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                id: record.id.to_string(),
            });
        }
        Ok(())
    }
}
