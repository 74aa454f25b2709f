//! Append-only `PaymentEvent` ledger.
//!
//! Every Phase 3 write appends exactly one row here. Appends are idempotent
//! on `(booking_id, event_type, external_ref)` so a worker that re-runs a
//! three-phase operation after a crash between Phase 2 and Phase 3 never
//! double-records the same PSP outcome.

use crate::error::{PersistenceError, Result};
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

/// A single row of the payment event ledger.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PaymentEventRow {
    /// Ledger row id.
    pub id: Uuid,
    /// Booking the event belongs to.
    pub booking_id: Uuid,
    /// Event type tag, e.g. `"auth_succeeded"`.
    pub event_type: String,
    /// External reference the event is idempotent on (PSP intent/transfer id, or a sentinel).
    pub external_ref: String,
    /// Arbitrary JSON payload describing the event.
    pub event_data: Value,
    /// When the event was recorded.
    pub created_at: DateTime<Utc>,
}

/// Append-only event ledger backed by a `payment_events` table.
#[derive(Clone)]
pub struct EventLedger {
    pool: PgPool,
}

impl EventLedger {
    /// Wrap an existing connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Append an event to the ledger, inside the caller's transaction.
    ///
    /// Idempotent: if a row with the same `(booking_id, event_type, external_ref)`
    /// already exists, this is a no-op and returns the existing row.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError::Database`] on a driver-level failure.
    pub async fn append(
        &self,
        tx: &mut sqlx::PgTransaction<'_>,
        booking_id: Uuid,
        event_type: &str,
        external_ref: &str,
        event_data: Value,
    ) -> Result<PaymentEventRow> {
        let row = sqlx::query_as::<_, PaymentEventRow>(
            r#"
            INSERT INTO payment_events (id, booking_id, event_type, external_ref, event_data, created_at)
            VALUES ($1, $2, $3, $4, $5, now())
            ON CONFLICT (booking_id, event_type, external_ref) DO UPDATE
                SET event_type = payment_events.event_type
            RETURNING id, booking_id, event_type, external_ref, event_data, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(booking_id)
        .bind(event_type)
        .bind(external_ref)
        .bind(event_data)
        .fetch_one(&mut **tx)
        .await?;

        tracing::info!(
            booking_id = %booking_id,
            event_type,
            external_ref,
            "appended payment event"
        );
        metrics::counter!("booking_ledger_appends_total", "event_type" => event_type.to_string())
            .increment(1);

        Ok(row)
    }

    /// Check whether an event of the given type and external reference already
    /// exists for a booking. Used by Phase 1 to decide whether a PSP call is
    /// still necessary before re-issuing it.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError::Database`] on a driver-level failure.
    pub async fn exists_for_booking(
        &self,
        booking_id: Uuid,
        event_type: &str,
        external_ref: &str,
    ) -> Result<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            r"SELECT EXISTS(
                SELECT 1 FROM payment_events
                WHERE booking_id = $1 AND event_type = $2 AND external_ref = $3
            )",
        )
        .bind(booking_id)
        .bind(event_type)
        .bind(external_ref)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    /// Return the most recent event of a given type for a booking, if any.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError::Database`] on a driver-level failure.
    pub async fn latest(
        &self,
        booking_id: Uuid,
        event_type: &str,
    ) -> Result<Option<PaymentEventRow>> {
        let row = sqlx::query_as::<_, PaymentEventRow>(
            r"SELECT id, booking_id, event_type, external_ref, event_data, created_at
              FROM payment_events
              WHERE booking_id = $1 AND event_type = $2
              ORDER BY created_at DESC
              LIMIT 1",
        )
        .bind(booking_id)
        .bind(event_type)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    /// All events for a booking, oldest first — used to reconstruct booking history.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError::Database`] on a driver-level failure.
    pub async fn history(&self, booking_id: Uuid) -> Result<Vec<PaymentEventRow>> {
        let rows = sqlx::query_as::<_, PaymentEventRow>(
            r"SELECT id, booking_id, event_type, external_ref, event_data, created_at
              FROM payment_events
              WHERE booking_id = $1
              ORDER BY created_at ASC",
        )
        .bind(booking_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn persistence_error_not_found_is_not_retryable() {
        let err = PersistenceError::NotFound("booking 1".into());
        assert!(!err.is_retryable());
    }

    #[test]
    fn persistence_error_concurrency_lost_is_retryable() {
        let err = PersistenceError::ConcurrencyLost("booking 1".into());
        assert!(err.is_retryable());
    }
}
