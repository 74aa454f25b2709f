//! Transactional outbox.
//!
//! An event is written to the `outbox` table in the same transaction as the
//! state change it describes (Phase 3), so it can never be lost or
//! duplicated relative to that state change. A separate [`OutboxDispatcher`]
//! polls undelivered rows and hands them to subscribers at-least-once;
//! subscribers are expected to be idempotent on `event_id`.

use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

/// The envelope shape delivered to outbox subscribers.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct OutboxEvent {
    /// Outbox row / event id.
    pub event_id: Uuid,
    /// Event type, e.g. `"booking.confirmed"`.
    pub event_type: String,
    /// Booking the event concerns.
    pub booking_id: Uuid,
    /// Student participant.
    pub student_id: Uuid,
    /// Instructor participant.
    pub instructor_id: Uuid,
    /// When the underlying state change occurred.
    pub occurred_at: DateTime<Utc>,
    /// Event-type-specific payload.
    pub payload: Value,
    /// Set once a dispatcher has delivered this row.
    pub dispatched_at: Option<DateTime<Utc>>,
}

/// Writer half of the transactional outbox.
#[derive(Clone)]
pub struct OutboxPublisher {
    pool: PgPool,
}

impl OutboxPublisher {
    /// Wrap an existing connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Write an outbox event inside the caller's transaction.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::PersistenceError::Database`] on a driver-level failure.
    #[allow(clippy::too_many_arguments)]
    pub async fn publish(
        &self,
        tx: &mut sqlx::PgTransaction<'_>,
        event_type: &str,
        booking_id: Uuid,
        student_id: Uuid,
        instructor_id: Uuid,
        occurred_at: DateTime<Utc>,
        payload: Value,
    ) -> Result<Uuid> {
        let event_id = Uuid::new_v4();

        sqlx::query(
            r"INSERT INTO outbox (event_id, event_type, booking_id, student_id, instructor_id, occurred_at, payload, dispatched_at)
              VALUES ($1, $2, $3, $4, $5, $6, $7, NULL)",
        )
        .bind(event_id)
        .bind(event_type)
        .bind(booking_id)
        .bind(student_id)
        .bind(instructor_id)
        .bind(occurred_at)
        .bind(payload)
        .execute(&mut **tx)
        .await?;

        tracing::debug!(event_id = %event_id, event_type, booking_id = %booking_id, "outbox event queued");
        metrics::counter!("booking_outbox_events_total", "event_type" => event_type.to_string())
            .increment(1);

        Ok(event_id)
    }
}

/// Reader half of the transactional outbox: polls for undelivered rows.
#[derive(Clone)]
pub struct OutboxDispatcher {
    pool: PgPool,
}

impl OutboxDispatcher {
    /// Wrap an existing connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Fetch up to `limit` undelivered events, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::PersistenceError::Database`] on a driver-level failure.
    pub async fn poll_undelivered(&self, limit: i64) -> Result<Vec<OutboxEvent>> {
        let rows = sqlx::query_as::<_, OutboxEvent>(
            r"SELECT event_id, event_type, booking_id, student_id, instructor_id, occurred_at, payload, dispatched_at
              FROM outbox
              WHERE dispatched_at IS NULL
              ORDER BY occurred_at ASC
              LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Mark an event delivered. Subscribers are idempotent, so a crash
    /// between a successful delivery and this call merely causes one
    /// harmless re-delivery, not data loss.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::PersistenceError::Database`] on a driver-level failure.
    pub async fn mark_dispatched(&self, event_id: Uuid) -> Result<()> {
        sqlx::query(r"UPDATE outbox SET dispatched_at = now() WHERE event_id = $1")
            .bind(event_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
