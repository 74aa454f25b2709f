//! Domain types for the booking aggregate, per spec §3.
//!
//! These are the types `BookingService`, `PaymentWorkerSet`, and
//! `BookingStateMachine` operate on. `booking-postgres::repository` owns the
//! row-level shapes; conversions live at the boundary in [`crate::service`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Booking lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    /// Created, payment not yet authorized.
    Pending,
    /// Payment authorized; lesson is scheduled.
    Confirmed,
    /// Lesson happened (or was auto-completed).
    Completed,
    /// Cancelled by either party or the system.
    Cancelled,
    /// Resolved as a no-show against one party.
    NoShow,
}

impl BookingStatus {
    /// Terminal statuses never transition further.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::NoShow)
    }
}

/// Payment lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Authorization not yet attempted.
    Scheduled,
    /// Authorization succeeded; funds are held.
    Authorized,
    /// Authorization failed; student must update their payment method.
    PaymentMethodRequired,
    /// Terminal: captured/refunded/zero-charge settlement recorded.
    Settled,
    /// Funds are held against an ancestor booking pending a reschedule's outcome.
    Locked,
    /// Escalated for human handling after repeated capture failures.
    ManualReview,
}

impl PaymentStatus {
    /// `Settled` and `ManualReview` never transition further (§8 invariant 7).
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Settled | Self::ManualReview)
    }
}

/// Where the lesson takes place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationType {
    /// At the student's location.
    StudentLocation,
    /// At the instructor's location.
    InstructorLocation,
    /// Online / video.
    Online,
    /// A neutral third location.
    NeutralLocation,
}

/// Who cancelled or who was absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// The student.
    Student,
    /// The instructor.
    Instructor,
    /// A background process, not a human actor.
    System,
    /// An administrator resolving a dispute.
    Admin,
}

/// The acting party for a request. Replaces duck-typed actor objects with an
/// explicit sum type per §9.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Actor {
    /// A human user acting in one or more roles.
    User {
        /// The user's id.
        id: Uuid,
        /// Roles held by this user with respect to the booking in question.
        roles: Vec<Role>,
    },
    /// The system itself (a scheduled worker).
    System,
}

impl Actor {
    /// A stable label for audit-log attribution.
    #[must_use]
    pub fn audit_label(&self) -> String {
        match self {
            Self::User { id, .. } => id.to_string(),
            Self::System => "system".to_string(),
        }
    }

    /// Whether this actor holds the given role.
    #[must_use]
    pub fn has_role(&self, role: Role) -> bool {
        match self {
            Self::User { roles, .. } => roles.contains(&role),
            Self::System => role == Role::System,
        }
    }
}

/// One scheduled lesson and its payment/settlement state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Booking {
    /// Primary key.
    pub id: Uuid,
    /// Student participant.
    pub student_id: Uuid,
    /// Instructor participant.
    pub instructor_id: Uuid,
    /// Lifecycle status.
    pub status: BookingStatus,
    /// Lesson start, UTC. Immutable once set.
    pub booking_start_utc: DateTime<Utc>,
    /// Lesson end, UTC. Immutable once set.
    pub booking_end_utc: DateTime<Utc>,
    /// Duration in minutes; `booking_end_utc - booking_start_utc` in seconds must equal this times 60.
    pub duration_minutes: i64,
    /// IANA timezone name the local wall-clock window was expressed in.
    pub lesson_timezone: String,
    /// Service name snapshot, for display/audit.
    pub service_name: String,
    /// Hourly rate snapshot, cents.
    pub hourly_rate_cents: i64,
    /// Total price snapshot, cents.
    pub total_price_cents: i64,
    /// Lesson location.
    pub location_type: LocationType,
    /// Ancestor booking if this one resulted from a reschedule.
    pub rescheduled_from_booking_id: Option<Uuid>,
    /// True if settlement of this booking is tied to a `LOCKED` ancestor.
    pub has_locked_funds: bool,
    /// Cancellation reason, if cancelled.
    pub cancellation_reason: Option<String>,
    /// Who cancelled, if cancelled.
    pub cancelled_by_role: Option<Role>,
    /// Cents credited to the student's account balance on settlement.
    pub student_credit_amount_cents: i64,
    /// Cents refunded directly to the student's card on settlement.
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

impl Booking {
    /// `[start, end)` as a half-open UTC interval.
    #[must_use]
    pub const fn interval(&self) -> (DateTime<Utc>, DateTime<Utc>) {
        (self.booking_start_utc, self.booking_end_utc)
    }

    /// Whether this booking's interval overlaps `other`'s (§8 invariant 3).
    #[must_use]
    pub fn overlaps(&self, other_start: DateTime<Utc>, other_end: DateTime<Utc>) -> bool {
        self.booking_start_utc < other_end && other_start < self.booking_end_utc
    }
}

/// Terminal settlement outcome labels, per spec §4.5.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettlementOutcome {
    /// Lesson completed; full payout to instructor.
    LessonCompletedFullPayout,
    /// Student cancelled ≥24h out, or auth was abandoned.
    StudentCancelGt24NoCharge,
    /// Student cancelled <12h out: full charge, 50/50 payout split.
    StudentCancelLt12Split5050,
    /// Instructor cancelled: no charge.
    InstructorCancel,
    /// Student confirmed absent: full charge, instructor paid.
    StudentNoShow,
    /// Instructor confirmed absent: student refunded.
    InstructorNoShow,
    /// Capture retries exhausted; escalated to manual review.
    CaptureFailureEscalated,
    /// Escalation resolved via a successful manual transfer.
    CaptureFailureInstructorPaid,
}

/// 1:1 payment record for a [`Booking`].
#[derive(Debug, Clone)]
pub struct BookingPayment {
    /// Owning booking.
    pub booking_id: Uuid,
    /// Payment lifecycle status.
    pub payment_status: PaymentStatus,
    /// PSP payment intent reference.
    pub payment_intent_id: Option<String>,
    /// PSP payment method reference.
    pub payment_method_id: Option<String>,
    /// When the pre-authorization should run (typically `start - 24h`).
    pub auth_scheduled_for: Option<DateTime<Utc>>,
    /// When the last authorization attempt ran.
    pub auth_attempted_at: Option<DateTime<Utc>>,
    /// Consecutive authorization failures.
    pub auth_failure_count: u32,
    /// Last authorization error, for display/audit.
    pub auth_last_error: Option<String>,
    /// Idempotency sentinel: first-failure email sent.
    pub auth_failure_first_email_sent_at: Option<DateTime<Utc>>,
    /// Idempotency sentinel: T-13h final-warning email sent.
    pub auth_failure_t13_warning_sent_at: Option<DateTime<Utc>>,
    /// When the last capture attempt failed.
    pub capture_failed_at: Option<DateTime<Utc>>,
    /// Consecutive capture failures.
    pub capture_retry_count: u32,
    /// Last capture error, for display/audit.
    pub capture_error: Option<String>,
    /// When capture retries were escalated to manual review.
    pub capture_escalated_at: Option<DateTime<Utc>>,
    /// Credits reserved against this booking, cents.
    pub credits_reserved_cents: i64,
    /// Terminal settlement outcome.
    pub settlement_outcome: Option<SettlementOutcome>,
    /// Instructor payout amount, cents, set at settlement.
    pub instructor_payout_amount_cents: Option<i64>,
}

/// Lazily-created PSP transfer/payout/refund bookkeeping for a booking.
#[derive(Debug, Clone, Default)]
pub struct Transfer {
    /// PSP transfer id for the instructor payout.
    pub stripe_transfer_id: Option<String>,
    /// PSP payout transfer id.
    pub payout_transfer_id: Option<String>,
    /// When the payout transfer last failed.
    pub payout_transfer_failed_at: Option<DateTime<Utc>>,
    /// Last payout transfer error.
    pub payout_transfer_error: Option<String>,
    /// Consecutive payout transfer retries.
    pub payout_transfer_retry_count: u32,
    /// PSP refund id.
    pub refund_id: Option<String>,
    /// Consecutive refund retries.
    pub refund_retry_count: u32,
}

/// Who was reported absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoShowType {
    /// The student did not attend.
    Student,
    /// The instructor did not attend.
    Instructor,
    /// Both parties failed to attend.
    Mutual,
}

/// A no-show report attached to a booking.
#[derive(Debug, Clone)]
pub struct NoShowReport {
    /// Owning booking.
    pub booking_id: Uuid,
    /// When the report was filed.
    pub no_show_reported_at: DateTime<Utc>,
    /// Who was reported absent.
    pub no_show_type: NoShowType,
    /// Whether the other party disputes the report.
    pub no_show_disputed: bool,
    /// When the report was resolved.
    pub no_show_resolved_at: Option<DateTime<Utc>>,
    /// Resolution outcome label.
    pub no_show_resolution: Option<String>,
}

/// Locked-funds bookkeeping created when a reschedule happens 12–24h before a lesson.
#[derive(Debug, Clone)]
pub struct LockRecord {
    /// Owning (ancestor) booking.
    pub booking_id: Uuid,
    /// Amount locked, cents.
    pub locked_amount_cents: i64,
    /// When the lock was resolved.
    pub lock_resolved_at: Option<DateTime<Utc>>,
    /// Resolution reason label.
    pub lock_resolution: Option<LockResolution>,
}

/// Why a locked booking was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockResolution {
    /// The replacement lesson completed and was captured.
    NewLessonCompleted,
    /// The instructor cancelled the replacement lesson.
    InstructorCancelled,
    /// The student no-showed the replacement lesson.
    StudentNoShow,
    /// Both parties no-showed the replacement lesson.
    MutualNoShow,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn terminal_booking_statuses_are_exactly_three() {
        assert!(BookingStatus::Completed.is_terminal());
        assert!(BookingStatus::Cancelled.is_terminal());
        assert!(BookingStatus::NoShow.is_terminal());
        assert!(!BookingStatus::Pending.is_terminal());
        assert!(!BookingStatus::Confirmed.is_terminal());
    }

    #[test]
    fn terminal_payment_statuses_are_settled_and_manual_review() {
        assert!(PaymentStatus::Settled.is_terminal());
        assert!(PaymentStatus::ManualReview.is_terminal());
        assert!(!PaymentStatus::Authorized.is_terminal());
    }

    fn sample_booking(start: DateTime<Utc>, end: DateTime<Utc>) -> Booking {
        Booking {
            id: Uuid::new_v4(),
            student_id: Uuid::new_v4(),
            instructor_id: Uuid::new_v4(),
            status: BookingStatus::Confirmed,
            booking_start_utc: start,
            booking_end_utc: end,
            duration_minutes: (end - start).num_minutes(),
            lesson_timezone: "America/New_York".to_string(),
            service_name: "Guitar lesson".to_string(),
            hourly_rate_cents: 5000,
            total_price_cents: 5000,
            location_type: LocationType::Online,
            rescheduled_from_booking_id: None,
            has_locked_funds: false,
            cancellation_reason: None,
            cancelled_by_role: None,
            student_credit_amount_cents: 0,
            refunded_to_card_amount_cents: 0,
            created_at: start - Duration::days(1),
            confirmed_at: Some(start - Duration::days(1)),
            completed_at: None,
            cancelled_at: None,
        }
    }

    #[test]
    fn overlapping_intervals_are_detected() {
        let base = DateTime::parse_from_rfc3339("2026-03-15T15:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let booking = sample_booking(base, base + Duration::hours(1));

        assert!(booking.overlaps(base + Duration::minutes(30), base + Duration::hours(2)));
        assert!(!booking.overlaps(base + Duration::hours(1), base + Duration::hours(2)));
    }
}
