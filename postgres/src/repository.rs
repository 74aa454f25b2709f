//! Row-level CRUD for the booking aggregate: `Booking`, `BookingPayment`,
//! `Transfer`, `NoShowReport`, `LockRecord`.
//!
//! Every read used by Phase 1 or Phase 3 of a three-phase operation goes
//! through `fetch_for_update`, which takes the row lock for the duration of
//! the caller's transaction (`SELECT ... FOR UPDATE`). Workers never read
//! through this path outside a transaction; their read-only candidate scans
//! use the plain `find_*` queries below instead.

use crate::error::{PersistenceError, Result};
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

/// Row representation of a `Booking`. Status/enum columns are stored as text
/// and mapped to the domain crate's enums at the boundary.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct BookingRow {
    /// Primary key.
    pub id: Uuid,
    /// Student participant.
    pub student_id: Uuid,
    /// Instructor participant.
    pub instructor_id: Uuid,
    /// Booking status: `pending | confirmed | completed | cancelled | no_show`.
    pub status: String,
    /// Lesson start, UTC.
    pub booking_start_utc: DateTime<Utc>,
    /// Lesson end, UTC.
    pub booking_end_utc: DateTime<Utc>,
    /// Duration in minutes, denormalized for query convenience.
    pub duration_minutes: i32,
    /// IANA timezone name used to derive the UTC bounds.
    pub lesson_timezone: String,
    /// Service name snapshot.
    pub service_name: String,
    /// Hourly rate snapshot, cents.
    pub hourly_rate_cents: i64,
    /// Total price snapshot, cents.
    pub total_price_cents: i64,
    /// Location type: `student_location | instructor_location | online | neutral_location`.
    pub location_type: String,
    /// Optional parent booking if this one resulted from a reschedule.
    pub rescheduled_from_booking_id: Option<Uuid>,
    /// True if settlement of this booking is tied to a locked ancestor.
    pub has_locked_funds: bool,
    /// Cancellation reason, if cancelled.
    pub cancellation_reason: Option<String>,
    /// Role of whoever cancelled, if cancelled.
    pub cancelled_by_role: Option<String>,
    /// Amount credited back to the student's account balance, cents.
    pub student_credit_amount_cents: i64,
    /// Amount refunded directly to the student's card, cents.
    pub refunded_to_card_amount_cents: i64,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Confirmation time, if confirmed.
    pub confirmed_at: Option<DateTime<Utc>>,
    /// Completion time, if completed.
    pub completed_at: Option<DateTime<Utc>>,
    /// Cancellation time, if cancelled.
    pub cancelled_at: Option<DateTime<Utc>>,
}

/// Row representation of the 1:1 `BookingPayment`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct BookingPaymentRow {
    /// Owning booking.
    pub booking_id: Uuid,
    /// `scheduled | authorized | payment_method_required | settled | locked | manual_review`.
    pub payment_status: String,
    /// PSP payment intent reference.
    pub payment_intent_id: Option<String>,
    /// PSP payment method reference.
    pub payment_method_id: Option<String>,
    /// When the pre-authorization should run.
    pub auth_scheduled_for: Option<DateTime<Utc>>,
    /// When the last authorization attempt ran.
    pub auth_attempted_at: Option<DateTime<Utc>>,
    /// Consecutive authorization failures.
    pub auth_failure_count: i32,
    /// Last authorization error, if any.
    pub auth_last_error: Option<String>,
    /// Sentinel: first-failure email sent.
    pub auth_failure_first_email_sent_at: Option<DateTime<Utc>>,
    /// Sentinel: T-13h final-warning email sent.
    pub auth_failure_t13_warning_sent_at: Option<DateTime<Utc>>,
    /// When the last capture attempt failed.
    pub capture_failed_at: Option<DateTime<Utc>>,
    /// Consecutive capture failures.
    pub capture_retry_count: i32,
    /// Last capture error, if any.
    pub capture_error: Option<String>,
    /// When capture retries were escalated to manual review.
    pub capture_escalated_at: Option<DateTime<Utc>>,
    /// Credits reserved against this booking, cents.
    pub credits_reserved_cents: i64,
    /// Terminal settlement outcome label.
    pub settlement_outcome: Option<String>,
    /// Instructor payout amount, cents, set at settlement.
    pub instructor_payout_amount_cents: Option<i64>,
}

/// Row representation of the lazily-created `Transfer`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TransferRow {
    /// Owning booking.
    pub booking_id: Uuid,
    /// PSP transfer id for the instructor payout.
    pub stripe_transfer_id: Option<String>,
    /// PSP payout transfer id.
    pub payout_transfer_id: Option<String>,
    /// When the payout transfer last failed.
    pub payout_transfer_failed_at: Option<DateTime<Utc>>,
    /// Last payout transfer error.
    pub payout_transfer_error: Option<String>,
    /// Consecutive payout transfer retries.
    pub payout_transfer_retry_count: i32,
    /// PSP refund id.
    pub refund_id: Option<String>,
    /// Consecutive refund retries.
    pub refund_retry_count: i32,
}

/// Row representation of a `NoShowReport`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct NoShowReportRow {
    /// Owning booking.
    pub booking_id: Uuid,
    /// When the no-show was reported.
    pub no_show_reported_at: DateTime<Utc>,
    /// `student | instructor | mutual`.
    pub no_show_type: String,
    /// Whether the report is disputed.
    pub no_show_disputed: bool,
    /// When the report was resolved.
    pub no_show_resolved_at: Option<DateTime<Utc>>,
    /// Resolution outcome label.
    pub no_show_resolution: Option<String>,
}

/// Row representation of a `LockRecord`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct LockRecordRow {
    /// Owning (ancestor) booking.
    pub booking_id: Uuid,
    /// Amount locked, cents.
    pub locked_amount_cents: i64,
    /// When the lock was resolved.
    pub lock_resolved_at: Option<DateTime<Utc>>,
    /// Resolution reason label.
    pub lock_resolution: Option<String>,
}

/// Repository over the booking aggregate.
#[derive(Clone)]
pub struct BookingRepository {
    pool: PgPool,
}

impl BookingRepository {
    /// Wrap an existing connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A reference to the pool, for callers that need to open their own
    /// transaction spanning multiple repository calls (the three-phase
    /// pattern's Phase 1 and Phase 3).
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Phase 1 / Phase 3 read: lock the booking row for the duration of `tx`.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError::NotFound`] if no such booking exists, or
    /// [`PersistenceError::Database`] on a driver-level failure.
    pub async fn fetch_for_update(
        &self,
        tx: &mut sqlx::PgTransaction<'_>,
        booking_id: Uuid,
    ) -> Result<BookingRow> {
        sqlx::query_as::<_, BookingRow>(
            r"SELECT id, student_id, instructor_id, status, booking_start_utc, booking_end_utc,
                     duration_minutes, lesson_timezone, service_name, hourly_rate_cents,
                     total_price_cents, location_type, rescheduled_from_booking_id,
                     has_locked_funds, cancellation_reason, cancelled_by_role,
                     student_credit_amount_cents, refunded_to_card_amount_cents,
                     created_at, confirmed_at, completed_at, cancelled_at
              FROM bookings WHERE id = $1 FOR UPDATE",
        )
        .bind(booking_id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| PersistenceError::NotFound(format!("booking {booking_id}")))
    }

    /// Read-only lookup, no row lock — for candidate scans and presentation.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError::NotFound`] if no such booking exists, or
    /// [`PersistenceError::Database`] on a driver-level failure.
    pub async fn find(&self, booking_id: Uuid) -> Result<BookingRow> {
        sqlx::query_as::<_, BookingRow>(
            r"SELECT id, student_id, instructor_id, status, booking_start_utc, booking_end_utc,
                     duration_minutes, lesson_timezone, service_name, hourly_rate_cents,
                     total_price_cents, location_type, rescheduled_from_booking_id,
                     has_locked_funds, cancellation_reason, cancelled_by_role,
                     student_credit_amount_cents, refunded_to_card_amount_cents,
                     created_at, confirmed_at, completed_at, cancelled_at
              FROM bookings WHERE id = $1",
        )
        .bind(booking_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| PersistenceError::NotFound(format!("booking {booking_id}")))
    }

    /// Insert a newly created booking and its initial payment row.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError::Database`] on a driver-level failure.
    #[allow(clippy::too_many_arguments)]
    pub async fn insert(
        &self,
        tx: &mut sqlx::PgTransaction<'_>,
        booking: &BookingRow,
        payment: &BookingPaymentRow,
    ) -> Result<()> {
        sqlx::query(
            r"INSERT INTO bookings (id, student_id, instructor_id, status, booking_start_utc, booking_end_utc,
                     duration_minutes, lesson_timezone, service_name, hourly_rate_cents,
                     total_price_cents, location_type, rescheduled_from_booking_id,
                     has_locked_funds, cancellation_reason, cancelled_by_role,
                     student_credit_amount_cents, refunded_to_card_amount_cents,
                     created_at, confirmed_at, completed_at, cancelled_at)
              VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$15,$16,$17,$18,$19,$20,$21,$22)",
        )
        .bind(booking.id)
        .bind(booking.student_id)
        .bind(booking.instructor_id)
        .bind(&booking.status)
        .bind(booking.booking_start_utc)
        .bind(booking.booking_end_utc)
        .bind(booking.duration_minutes)
        .bind(&booking.lesson_timezone)
        .bind(&booking.service_name)
        .bind(booking.hourly_rate_cents)
        .bind(booking.total_price_cents)
        .bind(&booking.location_type)
        .bind(booking.rescheduled_from_booking_id)
        .bind(booking.has_locked_funds)
        .bind(&booking.cancellation_reason)
        .bind(&booking.cancelled_by_role)
        .bind(booking.student_credit_amount_cents)
        .bind(booking.refunded_to_card_amount_cents)
        .bind(booking.created_at)
        .bind(booking.confirmed_at)
        .bind(booking.completed_at)
        .bind(booking.cancelled_at)
        .execute(&mut **tx)
        .await?;

        self.upsert_payment(tx, payment).await
    }

    /// Fetch the payment row for a booking, locked for the duration of `tx`.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError::NotFound`] if no payment row exists, or
    /// [`PersistenceError::Database`] on a driver-level failure.
    pub async fn fetch_payment_for_update(
        &self,
        tx: &mut sqlx::PgTransaction<'_>,
        booking_id: Uuid,
    ) -> Result<BookingPaymentRow> {
        sqlx::query_as::<_, BookingPaymentRow>(
            r"SELECT booking_id, payment_status, payment_intent_id, payment_method_id,
                     auth_scheduled_for, auth_attempted_at, auth_failure_count, auth_last_error,
                     auth_failure_first_email_sent_at, auth_failure_t13_warning_sent_at,
                     capture_failed_at, capture_retry_count, capture_error, capture_escalated_at,
                     credits_reserved_cents, settlement_outcome, instructor_payout_amount_cents
              FROM booking_payments WHERE booking_id = $1 FOR UPDATE",
        )
        .bind(booking_id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| PersistenceError::NotFound(format!("booking_payment {booking_id}")))
    }

    /// Insert or fully overwrite the payment row for a booking.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError::Database`] on a driver-level failure.
    pub async fn upsert_payment(
        &self,
        tx: &mut sqlx::PgTransaction<'_>,
        payment: &BookingPaymentRow,
    ) -> Result<()> {
        sqlx::query(
            r"INSERT INTO booking_payments (booking_id, payment_status, payment_intent_id, payment_method_id,
                     auth_scheduled_for, auth_attempted_at, auth_failure_count, auth_last_error,
                     auth_failure_first_email_sent_at, auth_failure_t13_warning_sent_at,
                     capture_failed_at, capture_retry_count, capture_error, capture_escalated_at,
                     credits_reserved_cents, settlement_outcome, instructor_payout_amount_cents)
              VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$15,$16,$17)
              ON CONFLICT (booking_id) DO UPDATE SET
                payment_status = EXCLUDED.payment_status,
                payment_intent_id = EXCLUDED.payment_intent_id,
                payment_method_id = EXCLUDED.payment_method_id,
                auth_scheduled_for = EXCLUDED.auth_scheduled_for,
                auth_attempted_at = EXCLUDED.auth_attempted_at,
                auth_failure_count = EXCLUDED.auth_failure_count,
                auth_last_error = EXCLUDED.auth_last_error,
                auth_failure_first_email_sent_at = EXCLUDED.auth_failure_first_email_sent_at,
                auth_failure_t13_warning_sent_at = EXCLUDED.auth_failure_t13_warning_sent_at,
                capture_failed_at = EXCLUDED.capture_failed_at,
                capture_retry_count = EXCLUDED.capture_retry_count,
                capture_error = EXCLUDED.capture_error,
                capture_escalated_at = EXCLUDED.capture_escalated_at,
                credits_reserved_cents = EXCLUDED.credits_reserved_cents,
                settlement_outcome = EXCLUDED.settlement_outcome,
                instructor_payout_amount_cents = EXCLUDED.instructor_payout_amount_cents",
        )
        .bind(payment.booking_id)
        .bind(&payment.payment_status)
        .bind(&payment.payment_intent_id)
        .bind(&payment.payment_method_id)
        .bind(payment.auth_scheduled_for)
        .bind(payment.auth_attempted_at)
        .bind(payment.auth_failure_count)
        .bind(&payment.auth_last_error)
        .bind(payment.auth_failure_first_email_sent_at)
        .bind(payment.auth_failure_t13_warning_sent_at)
        .bind(payment.capture_failed_at)
        .bind(payment.capture_retry_count)
        .bind(&payment.capture_error)
        .bind(payment.capture_escalated_at)
        .bind(payment.credits_reserved_cents)
        .bind(&payment.settlement_outcome)
        .bind(payment.instructor_payout_amount_cents)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    /// Persist the booking row's mutable fields (status + timestamps + settlement amounts).
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError::Database`] on a driver-level failure.
    pub async fn update_booking(
        &self,
        tx: &mut sqlx::PgTransaction<'_>,
        booking: &BookingRow,
    ) -> Result<()> {
        sqlx::query(
            r"UPDATE bookings SET
                status = $2, cancellation_reason = $3, cancelled_by_role = $4,
                student_credit_amount_cents = $5, refunded_to_card_amount_cents = $6,
                confirmed_at = $7, completed_at = $8, cancelled_at = $9,
                has_locked_funds = $10
              WHERE id = $1",
        )
        .bind(booking.id)
        .bind(&booking.status)
        .bind(&booking.cancellation_reason)
        .bind(&booking.cancelled_by_role)
        .bind(booking.student_credit_amount_cents)
        .bind(booking.refunded_to_card_amount_cents)
        .bind(booking.confirmed_at)
        .bind(booking.completed_at)
        .bind(booking.cancelled_at)
        .bind(booking.has_locked_funds)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    /// Fetch or lazily create the transfer row for a booking, locked for `tx`.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError::Database`] on a driver-level failure.
    pub async fn fetch_or_create_transfer_for_update(
        &self,
        tx: &mut sqlx::PgTransaction<'_>,
        booking_id: Uuid,
    ) -> Result<TransferRow> {
        sqlx::query(
            r"INSERT INTO transfers (booking_id) VALUES ($1) ON CONFLICT (booking_id) DO NOTHING",
        )
        .bind(booking_id)
        .execute(&mut **tx)
        .await?;

        let row = sqlx::query_as::<_, TransferRow>(
            r"SELECT booking_id, stripe_transfer_id, payout_transfer_id, payout_transfer_failed_at,
                     payout_transfer_error, payout_transfer_retry_count, refund_id, refund_retry_count
              FROM transfers WHERE booking_id = $1 FOR UPDATE",
        )
        .bind(booking_id)
        .fetch_one(&mut **tx)
        .await?;

        Ok(row)
    }

    /// Persist the transfer row.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError::Database`] on a driver-level failure.
    pub async fn update_transfer(
        &self,
        tx: &mut sqlx::PgTransaction<'_>,
        transfer: &TransferRow,
    ) -> Result<()> {
        sqlx::query(
            r"UPDATE transfers SET
                stripe_transfer_id = $2, payout_transfer_id = $3, payout_transfer_failed_at = $4,
                payout_transfer_error = $5, payout_transfer_retry_count = $6,
                refund_id = $7, refund_retry_count = $8
              WHERE booking_id = $1",
        )
        .bind(transfer.booking_id)
        .bind(&transfer.stripe_transfer_id)
        .bind(&transfer.payout_transfer_id)
        .bind(transfer.payout_transfer_failed_at)
        .bind(&transfer.payout_transfer_error)
        .bind(transfer.payout_transfer_retry_count)
        .bind(&transfer.refund_id)
        .bind(transfer.refund_retry_count)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    /// Record or update a no-show report for a booking, inside `tx`.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError::Database`] on a driver-level failure.
    pub async fn upsert_no_show_report(
        &self,
        tx: &mut sqlx::PgTransaction<'_>,
        report: &NoShowReportRow,
    ) -> Result<()> {
        sqlx::query(
            r"INSERT INTO no_show_reports (booking_id, no_show_reported_at, no_show_type,
                     no_show_disputed, no_show_resolved_at, no_show_resolution)
              VALUES ($1,$2,$3,$4,$5,$6)
              ON CONFLICT (booking_id) DO UPDATE SET
                no_show_disputed = EXCLUDED.no_show_disputed,
                no_show_resolved_at = EXCLUDED.no_show_resolved_at,
                no_show_resolution = EXCLUDED.no_show_resolution",
        )
        .bind(report.booking_id)
        .bind(report.no_show_reported_at)
        .bind(&report.no_show_type)
        .bind(report.no_show_disputed)
        .bind(report.no_show_resolved_at)
        .bind(&report.no_show_resolution)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    /// Fetch a no-show report, locked for the duration of `tx`.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError::NotFound`] if no report exists, or
    /// [`PersistenceError::Database`] on a driver-level failure.
    pub async fn fetch_no_show_report_for_update(
        &self,
        tx: &mut sqlx::PgTransaction<'_>,
        booking_id: Uuid,
    ) -> Result<NoShowReportRow> {
        sqlx::query_as::<_, NoShowReportRow>(
            r"SELECT booking_id, no_show_reported_at, no_show_type, no_show_disputed,
                     no_show_resolved_at, no_show_resolution
              FROM no_show_reports WHERE booking_id = $1 FOR UPDATE",
        )
        .bind(booking_id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| PersistenceError::NotFound(format!("no_show_report {booking_id}")))
    }

    /// Create a lock record for a booking whose payment just transitioned to `LOCKED`.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError::Database`] on a driver-level failure.
    pub async fn create_lock_record(
        &self,
        tx: &mut sqlx::PgTransaction<'_>,
        booking_id: Uuid,
        locked_amount_cents: i64,
    ) -> Result<()> {
        sqlx::query(
            r"INSERT INTO lock_records (booking_id, locked_amount_cents, lock_resolved_at, lock_resolution)
              VALUES ($1, $2, NULL, NULL)
              ON CONFLICT (booking_id) DO UPDATE SET locked_amount_cents = EXCLUDED.locked_amount_cents",
        )
        .bind(booking_id)
        .bind(locked_amount_cents)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    /// Fetch the lock record for a booking, locked for `tx`.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError::NotFound`] if no lock record exists, or
    /// [`PersistenceError::Database`] on a driver-level failure.
    pub async fn fetch_lock_record_for_update(
        &self,
        tx: &mut sqlx::PgTransaction<'_>,
        booking_id: Uuid,
    ) -> Result<LockRecordRow> {
        sqlx::query_as::<_, LockRecordRow>(
            r"SELECT booking_id, locked_amount_cents, lock_resolved_at, lock_resolution
              FROM lock_records WHERE booking_id = $1 FOR UPDATE",
        )
        .bind(booking_id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| PersistenceError::NotFound(format!("lock_record {booking_id}")))
    }

    /// Resolve a lock record.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError::Database`] on a driver-level failure.
    pub async fn resolve_lock_record(
        &self,
        tx: &mut sqlx::PgTransaction<'_>,
        booking_id: Uuid,
        resolution: &str,
    ) -> Result<()> {
        sqlx::query(
            r"UPDATE lock_records SET lock_resolved_at = now(), lock_resolution = $2 WHERE booking_id = $1",
        )
        .bind(booking_id)
        .bind(resolution)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    /// Read-only candidate scan: `SCHEDULED` bookings due for pre-authorization.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError::Database`] on a driver-level failure.
    pub async fn find_due_for_authorization(&self, now: DateTime<Utc>) -> Result<Vec<Uuid>> {
        let ids = sqlx::query_scalar::<_, Uuid>(
            r"SELECT bp.booking_id FROM booking_payments bp
              WHERE bp.payment_status = 'scheduled' AND bp.auth_scheduled_for <= $1",
        )
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }

    /// Read-only candidate scan: bookings in `PAYMENT_METHOD_REQUIRED` eligible for retry.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError::Database`] on a driver-level failure.
    pub async fn find_payment_method_required(&self) -> Result<Vec<Uuid>> {
        let ids = sqlx::query_scalar::<_, Uuid>(
            r"SELECT booking_id FROM booking_payments WHERE payment_status = 'payment_method_required'",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }

    /// Read-only candidate scan: confirmed bookings past `end_utc + grace` not yet captured.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError::Database`] on a driver-level failure.
    pub async fn find_completed_awaiting_capture(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<Uuid>> {
        let ids = sqlx::query_scalar::<_, Uuid>(
            r"SELECT b.id FROM bookings b
              JOIN booking_payments bp ON bp.booking_id = b.id
              WHERE b.status IN ('completed', 'confirmed')
                AND b.booking_end_utc <= $1
                AND bp.payment_status = 'authorized'",
        )
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }

    /// Read-only candidate scan: bookings with a capture failure eligible for retry.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError::Database`] on a driver-level failure.
    pub async fn find_capture_failed(&self) -> Result<Vec<Uuid>> {
        let ids = sqlx::query_scalar::<_, Uuid>(
            r"SELECT booking_id FROM booking_payments
              WHERE payment_status = 'payment_method_required' AND capture_failed_at IS NOT NULL",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }

    /// Read-only candidate scan: undisputed no-show reports older than the grace window.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError::Database`] on a driver-level failure.
    pub async fn find_undisputed_no_shows(&self, cutoff: DateTime<Utc>) -> Result<Vec<Uuid>> {
        let ids = sqlx::query_scalar::<_, Uuid>(
            r"SELECT booking_id FROM no_show_reports
              WHERE no_show_reported_at <= $1 AND no_show_disputed = false AND no_show_resolved_at IS NULL",
        )
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }

    /// Read-only candidate scan: every non-terminal booking belonging to either
    /// participant, for overlap checking against a proposed new window.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError::Database`] on a driver-level failure.
    pub async fn find_non_terminal_for_participants(
        &self,
        student_id: Uuid,
        instructor_id: Uuid,
    ) -> Result<Vec<Uuid>> {
        let ids = sqlx::query_scalar::<_, Uuid>(
            r"SELECT id FROM bookings
              WHERE status NOT IN ('completed', 'cancelled', 'no_show')
                AND (instructor_id = $1 OR student_id = $2)",
        )
        .bind(instructor_id)
        .bind(student_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }

    /// Read-only candidate scan: bookings still `authorized` whose last
    /// authorization attempt ran before `cutoff`, meaning the hold may have
    /// expired before capture ran.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError::Database`] on a driver-level failure.
    pub async fn find_stale_authorizations(&self, cutoff: DateTime<Utc>) -> Result<Vec<Uuid>> {
        let ids = sqlx::query_scalar::<_, Uuid>(
            r"SELECT booking_id FROM booking_payments
              WHERE payment_status = 'authorized'
                AND auth_attempted_at <= $1",
        )
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }

    /// Read-only candidate scan: every instructor with at least one booking,
    /// i.e. every instructor account connected to the platform's PSP payouts.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError::Database`] on a driver-level failure.
    pub async fn find_distinct_instructor_ids(&self) -> Result<Vec<Uuid>> {
        let ids = sqlx::query_scalar::<_, Uuid>(r"SELECT DISTINCT instructor_id FROM bookings")
            .fetch_all(&self.pool)
            .await?;

        Ok(ids)
    }

    /// Pricing helper: total cents currently available as credit on a student account.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError::Database`] on a driver-level failure.
    pub async fn student_credit_balance_cents(&self, student_id: Uuid) -> Result<i64> {
        let balance = sqlx::query_scalar::<_, Option<i64>>(
            r"SELECT balance_cents FROM student_credit_accounts WHERE student_id = $1",
        )
        .bind(student_id)
        .fetch_optional(&self.pool)
        .await?
        .flatten()
        .unwrap_or(0);

        Ok(balance)
    }
}
