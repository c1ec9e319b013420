//! In-memory payment store for tests and database-less embedding.

use crate::gateway::types::PaymentState;
use crate::store::{NewPaymentRecord, PaymentRecord, PaymentStore, StoreError, StoreResult};
use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use uuid::Uuid;

#[derive(Debug, Default)]
pub struct InMemoryPaymentStore {
    records: Mutex<Vec<PaymentRecord>>,
}

impl InMemoryPaymentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every stored record, in insertion order.
    pub async fn records(&self) -> Vec<PaymentRecord> {
        self.records.lock().await.clone()
    }

    /// Seed a record directly, bypassing the uniqueness check. Lets tests
    /// set up states the normal write path would refuse.
    pub async fn insert(&self, record: PaymentRecord) {
        self.records.lock().await.push(record);
    }
}

#[async_trait]
impl PaymentStore for InMemoryPaymentStore {
    async fn create(&self, new: NewPaymentRecord) -> StoreResult<PaymentRecord> {
        let mut records = self.records.lock().await;
        // Same guarantee the Postgres partial unique index gives.
        let duplicate = records.iter().any(|existing| {
            existing.remote_id == new.remote_id
                && existing.order_id == new.order_id
                && existing.state == PaymentState::Authorization
        });
        if duplicate && new.state == PaymentState::Authorization {
            return Err(StoreError::UniqueViolation {
                constraint: "uq_gateway_payments_pending".to_string(),
            });
        }

        let now = Utc::now();
        let record = PaymentRecord {
            id: Uuid::new_v4(),
            order_id: new.order_id,
            remote_id: new.remote_id,
            gateway_id: new.gateway_id,
            amount: new.amount,
            state: new.state,
            remote_state: None,
            created_at: now,
            updated_at: now,
        };
        records.push(record.clone());
        Ok(record)
    }

    async fn find_pending(
        &self,
        remote_id: &str,
        order_id: &str,
    ) -> StoreResult<Vec<PaymentRecord>> {
        let records = self.records.lock().await;
        Ok(records
            .iter()
            .filter(|record| {
                record.remote_id == remote_id
                    && record.order_id == order_id
                    && record.state == PaymentState::Authorization
            })
            .cloned()
            .collect())
    }

    async fn save(&self, record: &PaymentRecord) -> StoreResult<()> {
        let mut records = self.records.lock().await;
        let stored = records
            .iter_mut()
            .find(|existing| existing.id == record.id)
            .ok_or_else(|| StoreError::NotFound {
                id: record.id.to_string(),
            })?;
        stored.state = record.state;
        stored.remote_state = record.remote_state.clone();
        stored.updated_at = Utc::now();
        Ok(())
    }
}
