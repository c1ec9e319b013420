//! Payment record store.
//!
//! The gateway core never talks to a database directly; it goes through the
//! [`PaymentStore`] trait so the checkout pipeline can wire in whatever
//! persistence it runs on. [`postgres::PgPaymentStore`] is the production
//! implementation, [`memory::InMemoryPaymentStore`] backs tests.

pub mod memory;
pub mod postgres;

use crate::gateway::types::{Money, PaymentState};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("payment record {id} not found")]
    NotFound { id: String },

    #[error("unique constraint {constraint} violated")]
    UniqueViolation { constraint: String },

    #[error("store query failed: {message}")]
    Query { message: String },

    #[error("store connection error: {message}")]
    Connection { message: String },

    #[error("inconsistent payment record: {message}")]
    Inconsistent { message: String },
}

impl StoreError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Connection { .. })
    }

    /// Map a sqlx error onto the store taxonomy.
    pub fn from_sqlx(error: sqlx::Error) -> Self {
        match error {
            sqlx::Error::RowNotFound => StoreError::NotFound {
                id: "unknown".to_string(),
            },
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => StoreError::Connection {
                message: "connection pool unavailable".to_string(),
            },
            sqlx::Error::Io(err) => StoreError::Connection {
                message: err.to_string(),
            },
            sqlx::Error::Database(err) => match err.code().as_deref() {
                // Postgres unique_violation
                Some("23505") => StoreError::UniqueViolation {
                    constraint: err.constraint().unwrap_or("unknown").to_string(),
                },
                _ => StoreError::Query {
                    message: err.message().to_string(),
                },
            },
            other => StoreError::Query {
                message: other.to_string(),
            },
        }
    }
}

/// The one persistent entity of the integration. Created in `authorization`
/// by initiation, moved to a terminal state exactly once by reconciliation,
/// never deleted here.
#[derive(Debug, Clone)]
pub struct PaymentRecord {
    pub id: Uuid,
    pub order_id: String,
    pub remote_id: String,
    pub gateway_id: String,
    pub amount: Money,
    pub state: PaymentState,
    pub remote_state: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields the gateway supplies when creating a record; the store owns the
/// id and timestamps.
#[derive(Debug, Clone)]
pub struct NewPaymentRecord {
    pub order_id: String,
    pub remote_id: String,
    pub gateway_id: String,
    pub amount: Money,
    pub state: PaymentState,
}

#[async_trait]
pub trait PaymentStore: Send + Sync {
    /// Persist a new record and return it with store-owned fields filled in.
    async fn create(&self, new: NewPaymentRecord) -> StoreResult<PaymentRecord>;

    /// All records matching (`remote_id`, `order_id`) still in
    /// `authorization`. The invariant says at most one; callers decide what
    /// more than one means.
    async fn find_pending(
        &self,
        remote_id: &str,
        order_id: &str,
    ) -> StoreResult<Vec<PaymentRecord>>;

    /// Write back `state` and `remote_state` for an existing record.
    async fn save(&self, record: &PaymentRecord) -> StoreResult<()>;
}
