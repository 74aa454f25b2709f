//! Structured audit log, keyed by actor + action + resource.
//!
//! Distinct from [`crate::event_ledger::EventLedger`]: the ledger records
//! *what happened to the payment state machine*; the audit log records *who
//! asked for it*. Together with the ledger and the outbox they are the three
//! observability streams spec'd for reconstructing a booking's history.

use crate::error::Result;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

/// One audit log entry.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AuditLogRow {
    /// Entry id.
    pub id: Uuid,
    /// Who performed the action: a user id, or the literal `"system"`.
    pub actor: String,
    /// Action tag, e.g. `"cancel_booking"`.
    pub action: String,
    /// Resource acted on, e.g. `"booking:<id>"`.
    pub resource: String,
    /// Optional structured detail.
    pub detail: Option<Value>,
    /// When the action happened.
    pub created_at: DateTime<Utc>,
}

/// Append-only audit log backed by an `audit_log` table.
#[derive(Clone)]
pub struct AuditLog {
    pool: PgPool,
}

impl AuditLog {
    /// Wrap an existing connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Record an audit entry inside the caller's transaction.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::PersistenceError::Database`] on a driver-level failure.
    pub async fn record(
        &self,
        tx: &mut sqlx::PgTransaction<'_>,
        actor: &str,
        action: &str,
        resource: &str,
        detail: Option<Value>,
    ) -> Result<()> {
        sqlx::query(
            r"INSERT INTO audit_log (id, actor, action, resource, detail, created_at)
              VALUES ($1, $2, $3, $4, $5, now())",
        )
        .bind(Uuid::new_v4())
        .bind(actor)
        .bind(action)
        .bind(resource)
        .bind(detail)
        .execute(&mut **tx)
        .await?;

        tracing::info!(actor, action, resource, "audit entry recorded");
        Ok(())
    }

    /// All audit entries for a resource, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::PersistenceError::Database`] on a driver-level failure.
    pub async fn for_resource(&self, resource: &str) -> Result<Vec<AuditLogRow>> {
        let rows = sqlx::query_as::<_, AuditLogRow>(
            r"SELECT id, actor, action, resource, detail, created_at
              FROM audit_log
              WHERE resource = $1
              ORDER BY created_at ASC",
        )
        .bind(resource)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}
