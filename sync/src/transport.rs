//! Transport abstraction between the device and the sync server.
//!
//! The orchestrator only ever talks to a [`SyncTransport`], so the same
//! push loop works against HTTP, gRPC, or the in-memory fake used by the
//! test suite. The server applies upserts idempotently and treats deletes
//! of unknown rows as no-ops, which lets the client retry any batch.

use async_trait::async_trait;
use liftlog_engine::{EntityId, Table};
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::Mutex;

/// Errors returned by a transport call.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("server unavailable: {0}")]
    Unavailable(String),

    #[error("not authorized")]
    Unauthorized,

    #[error("rejected: {0}")]
    Rejected(String),
}

impl TransportError {
    /// Check whether retrying the same batch later can succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, TransportError::Unavailable(_))
    }
}

/// Server acknowledgement for a batch of rows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PushAck {
    /// Row ids the server has durably applied.
    pub accepted: Vec<EntityId>,
}

/// The wire operations a sync cycle needs from the server.
#[async_trait]
pub trait SyncTransport: Send + Sync {
    /// Upsert a batch of rows into one table. Idempotent per row id.
    async fn upsert_rows(
        &self,
        table: Table,
        rows: Vec<Value>,
    ) -> Result<PushAck, TransportError>;

    /// Delete a batch of rows from one table. Unknown ids are no-ops.
    async fn delete_rows(
        &self,
        table: Table,
        row_ids: Vec<EntityId>,
    ) -> Result<PushAck, TransportError>;
}

#[derive(Debug, Default)]
struct Inner {
    tables: HashMap<Table, HashMap<EntityId, Value>>,
    fail_tables: HashMap<Table, TransportError>,
    upsert_calls: u64,
    delete_calls: u64,
}

/// In-memory transport backed by per-table row maps.
///
/// Mirrors the server's contract closely enough for integration tests:
/// upserts replace by id, deletes of unknown ids succeed, and individual
/// tables can be made to fail to exercise the orchestrator's error paths.
#[derive(Debug, Default)]
pub struct InMemoryTransport {
    inner: Mutex<Inner>,
}

impl InMemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch a stored row by table and id.
    pub async fn row(&self, table: Table, id: &str) -> Option<Value> {
        let inner = self.inner.lock().await;
        inner.tables.get(&table).and_then(|rows| rows.get(id)).cloned()
    }

    /// Number of rows currently stored in a table.
    pub async fn row_count(&self, table: Table) -> usize {
        let inner = self.inner.lock().await;
        inner.tables.get(&table).map(HashMap::len).unwrap_or(0)
    }

    /// Make every call against `table` fail with `err` until healed.
    pub async fn fail_table(&self, table: Table, err: TransportError) {
        let mut inner = self.inner.lock().await;
        inner.fail_tables.insert(table, err);
    }

    /// Clear a previously injected failure.
    pub async fn heal_table(&self, table: Table) {
        let mut inner = self.inner.lock().await;
        inner.fail_tables.remove(&table);
    }

    /// Total upsert calls received, failed ones included.
    pub async fn upsert_calls(&self) -> u64 {
        self.inner.lock().await.upsert_calls
    }

    /// Total delete calls received, failed ones included.
    pub async fn delete_calls(&self) -> u64 {
        self.inner.lock().await.delete_calls
    }
}

#[async_trait]
impl SyncTransport for InMemoryTransport {
    async fn upsert_rows(
        &self,
        table: Table,
        rows: Vec<Value>,
    ) -> Result<PushAck, TransportError> {
        let mut inner = self.inner.lock().await;
        inner.upsert_calls += 1;

        if let Some(err) = inner.fail_tables.get(&table).cloned() {
            return Err(err);
        }

        let mut accepted = Vec::with_capacity(rows.len());
        let stored = inner.tables.entry(table).or_default();
        for row in rows {
            let id = row
                .get("id")
                .and_then(Value::as_str)
                .ok_or_else(|| TransportError::Rejected("row without id".into()))?
                .to_string();
            stored.insert(id.clone(), row);
            accepted.push(id);
        }

        Ok(PushAck { accepted })
    }

    async fn delete_rows(
        &self,
        table: Table,
        row_ids: Vec<EntityId>,
    ) -> Result<PushAck, TransportError> {
        let mut inner = self.inner.lock().await;
        inner.delete_calls += 1;

        if let Some(err) = inner.fail_tables.get(&table).cloned() {
            return Err(err);
        }

        if let Some(stored) = inner.tables.get_mut(&table) {
            for id in &row_ids {
                stored.remove(id);
            }
        }

        Ok(PushAck { accepted: row_ids })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn upserts_are_idempotent_per_id() {
        let transport = InMemoryTransport::new();

        let ack = transport
            .upsert_rows(
                Table::BodyParts,
                vec![json!({"id": "bp-1", "name": "Chest"})],
            )
            .await
            .unwrap();
        assert_eq!(ack.accepted, vec!["bp-1".to_string()]);

        transport
            .upsert_rows(
                Table::BodyParts,
                vec![json!({"id": "bp-1", "name": "Upper Chest"})],
            )
            .await
            .unwrap();

        assert_eq!(transport.row_count(Table::BodyParts).await, 1);
        let row = transport.row(Table::BodyParts, "bp-1").await.unwrap();
        assert_eq!(row["name"], "Upper Chest");
    }

    #[tokio::test]
    async fn deleting_unknown_rows_is_a_no_op() {
        let transport = InMemoryTransport::new();

        let ack = transport
            .delete_rows(Table::Workouts, vec!["missing".to_string()])
            .await
            .unwrap();

        assert_eq!(ack.accepted, vec!["missing".to_string()]);
        assert_eq!(transport.delete_calls().await, 1);
    }

    #[tokio::test]
    async fn rows_without_an_id_are_rejected() {
        let transport = InMemoryTransport::new();

        let result = transport
            .upsert_rows(Table::Equipment, vec![json!({"name": "Barbell"})])
            .await;

        assert_eq!(
            result,
            Err(TransportError::Rejected("row without id".into()))
        );
    }

    #[tokio::test]
    async fn injected_failures_persist_until_healed() {
        let transport = InMemoryTransport::new();
        transport
            .fail_table(Table::Sessions, TransportError::Unavailable("503".into()))
            .await;

        let err = transport
            .upsert_rows(Table::Sessions, vec![json!({"id": "s-1"})])
            .await
            .unwrap_err();
        assert!(err.is_transient());

        transport.heal_table(Table::Sessions).await;
        transport
            .upsert_rows(Table::Sessions, vec![json!({"id": "s-1"})])
            .await
            .unwrap();
        assert_eq!(transport.row_count(Table::Sessions).await, 1);
    }

    #[test]
    fn only_unavailable_is_transient() {
        assert!(TransportError::Unavailable("timeout".into()).is_transient());
        assert!(!TransportError::Unauthorized.is_transient());
        assert!(!TransportError::Rejected("bad row".into()).is_transient());
    }
}
