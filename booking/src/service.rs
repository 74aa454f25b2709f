//! `BookingService`: the three-phase orchestration of booking creation,
//! payment confirmation, cancellation, and completion, per spec §4.3.
//!
//! Every public method here follows the same discipline: acquire the
//! per-booking [`booking_postgres::BookingLock`] (skipping, never blocking,
//! on contention), run Phase 1 in a short transaction, call out to the PSP
//! with no transaction held, then commit the terminal state in a fresh
//! Phase 3 transaction.

use crate::availability::{AvailabilityValidator, DayAvailability};
use crate::credit::CreditService;
use crate::environment::BookingEnvironment;
use crate::error::{BookingError, ConflictScope, Result};
use crate::idempotency;
use crate::mapping::{
    booking_from_row, booking_to_row, no_show_report_from_row, no_show_report_to_row, payment_from_row,
    payment_to_row,
};
use crate::model::{
    Actor, Booking, BookingPayment, BookingStatus, NoShowReport, NoShowType, PaymentStatus, Role,
    SettlementOutcome,
};
use crate::pricing::{PricingCalculator, PricingInput};
use crate::psp::{PspAdapter, PspIntent};
use crate::settlement::Settlement;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use uuid::Uuid;

/// A new booking's requested window and service details, as submitted by a student.
pub struct BookingDraft {
    /// Instructor being booked.
    pub instructor_id: Uuid,
    /// Service name snapshot.
    pub service_name: String,
    /// Local calendar date of the lesson.
    pub date: NaiveDate,
    /// Local start time of the lesson.
    pub start_time: NaiveTime,
    /// Lesson duration, minutes.
    pub duration_minutes: i64,
    /// IANA timezone the date/time above are expressed in.
    pub lesson_timezone: String,
    /// Where the lesson takes place.
    pub location_type: crate::model::LocationType,
    /// Instructor's hourly rate snapshot, cents.
    pub hourly_rate_cents: i64,
    /// Cents of student credit the student asked to apply.
    pub requested_credit_cents: i64,
    /// If this booking replaces a reschedule, the original booking's id.
    pub rescheduled_from_booking_id: Option<Uuid>,
    /// Whether settlement of this booking is tied to a `LOCKED` ancestor.
    pub has_locked_funds: bool,
}

/// Instructor-side constraints `createBookingWithPaymentSetup` enforces.
pub struct InstructorConstraints {
    /// Minimum lead time, hours, before a booking may start.
    pub min_advance_booking_hours: f64,
    /// The instructor's availability bitmap for the requested local date.
    pub availability: DayAvailability,
}

/// Platform-wide pricing parameters.
pub struct PlatformPricing {
    /// Platform fee, basis points.
    pub platform_fee_bps: i64,
}

/// `BookingService` ties the domain modules together behind the three-phase
/// discipline. Holds no state of its own beyond the injected environment.
pub struct BookingService<P: PspAdapter + Clone> {
    pub(crate) env: BookingEnvironment<P>,
}

impl<P: PspAdapter + Clone> BookingService<P> {
    /// Wrap an environment.
    #[must_use]
    pub const fn new(env: BookingEnvironment<P>) -> Self {
        Self { env }
    }

    /// §4.3.a: validate, price, and create a booking in `PENDING` with its
    /// payment row in `SCHEDULED`.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::ValidationFailed`] for a malformed window or
    /// unknown timezone, [`BookingError::BookingConflict`] for an overlap,
    /// and [`BookingError::BusinessRule`] if the lesson starts sooner than
    /// the instructor's minimum advance-booking window allows.
    pub async fn create_booking_with_payment_setup(
        &self,
        student_id: Uuid,
        draft: BookingDraft,
        constraints: InstructorConstraints,
        pricing: PlatformPricing,
    ) -> Result<Booking> {
        let end_time = draft
            .start_time
            .overflowing_add_signed(chrono::Duration::minutes(draft.duration_minutes))
            .0;
        if end_time <= draft.start_time {
            return Err(BookingError::ValidationFailed(
                "lesson must end before midnight local time".to_string(),
            ));
        }

        let (start_utc, end_utc) = self.env.clock.local_window_to_utc(
            draft.date,
            draft.start_time,
            end_time,
            &draft.lesson_timezone,
        )?;

        if !AvailabilityValidator::is_window_available(
            constraints.availability,
            draft.start_time,
            end_time,
        ) {
            return Err(BookingError::BusinessRule(
                "requested window is not available".to_string(),
            ));
        }

        self.reject_if_overlapping(student_id, draft.instructor_id, start_utc, end_utc)
            .await?;

        if self.env.clock.hours_until(start_utc) < constraints.min_advance_booking_hours {
            return Err(BookingError::BusinessRule(
                "booking does not meet the instructor's minimum advance notice".to_string(),
            ));
        }

        let available_credit_cents = CreditService::available_for_reservation(
            &self.env.repository,
            student_id,
            draft.requested_credit_cents,
        )
        .await?;

        let breakdown = PricingCalculator::compute(PricingInput {
            hourly_rate_cents: draft.hourly_rate_cents,
            duration_minutes: draft.duration_minutes,
            requested_credit_cents: draft.requested_credit_cents,
            available_credit_cents,
            platform_fee_bps: pricing.platform_fee_bps,
        });

        let now = self.env.clock.now();
        let auth_scheduled_for = start_utc - chrono::Duration::hours(24);
        let immediate_auth_required = auth_scheduled_for <= now;

        let booking = Booking {
            id: Uuid::new_v4(),
            student_id,
            instructor_id: draft.instructor_id,
            status: BookingStatus::Pending,
            booking_start_utc: start_utc,
            booking_end_utc: end_utc,
            duration_minutes: draft.duration_minutes,
            lesson_timezone: draft.lesson_timezone,
            service_name: draft.service_name,
            hourly_rate_cents: draft.hourly_rate_cents,
            total_price_cents: breakdown.base_price_cents,
            location_type: draft.location_type,
            rescheduled_from_booking_id: draft.rescheduled_from_booking_id,
            has_locked_funds: draft.has_locked_funds,
            cancellation_reason: None,
            cancelled_by_role: None,
            student_credit_amount_cents: 0,
            refunded_to_card_amount_cents: 0,
            created_at: now,
            confirmed_at: None,
            completed_at: None,
            cancelled_at: None,
        };

        let payment = BookingPayment {
            booking_id: booking.id,
            payment_status: PaymentStatus::Scheduled,
            payment_intent_id: None,
            payment_method_id: None,
            auth_scheduled_for: Some(auth_scheduled_for),
            auth_attempted_at: None,
            auth_failure_count: 0,
            auth_last_error: None,
            auth_failure_first_email_sent_at: None,
            auth_failure_t13_warning_sent_at: None,
            capture_failed_at: None,
            capture_retry_count: 0,
            capture_error: None,
            capture_escalated_at: None,
            credits_reserved_cents: CreditService::reserve(breakdown.applied_credit_cents),
            settlement_outcome: None,
            instructor_payout_amount_cents: None,
        };

        let mut tx = self
            .env
            .repository
            .pool()
            .begin()
            .await
            .map_err(booking_postgres::PersistenceError::Database)?;
        self.env
            .repository
            .insert(&mut tx, &booking_to_row(&booking), &payment_to_row(&payment))
            .await?;
        self.env
            .outbox
            .publish(
                &mut tx,
                "booking.created",
                booking.id,
                booking.student_id,
                booking.instructor_id,
                now,
                serde_json::json!({ "immediate_auth_required": immediate_auth_required }),
            )
            .await?;
        tx.commit().await.map_err(booking_postgres::PersistenceError::Database)?;

        Ok(booking)
    }

    async fn reject_if_overlapping(
        &self,
        student_id: Uuid,
        instructor_id: Uuid,
        start_utc: DateTime<Utc>,
        end_utc: DateTime<Utc>,
    ) -> Result<()> {
        let candidates = self
            .env
            .repository
            .find_non_terminal_for_participants(student_id, instructor_id)
            .await?;

        for candidate_id in candidates {
            let row = self.env.repository.find(candidate_id).await?;
            let candidate = booking_from_row(row)?;
            if candidate.status.is_terminal() {
                continue;
            }
            if candidate.instructor_id == instructor_id && candidate.overlaps(start_utc, end_utc) {
                return Err(BookingError::BookingConflict {
                    scope: ConflictScope::Instructor,
                });
            }
            if candidate.student_id == student_id && candidate.overlaps(start_utc, end_utc) {
                return Err(BookingError::BookingConflict {
                    scope: ConflictScope::Student,
                });
            }
        }
        Ok(())
    }

    /// §4.3.b: immediate authorization for a lesson starting within 24h.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::NotFound`] if the booking or payment method
    /// does not exist, [`BookingError::BusinessRule`] if the booking is not
    /// `PENDING`/`SCHEDULED`, or a propagated [`BookingError::Psp`] if the
    /// PSP call fails.
    pub async fn confirm_booking_payment(
        &self,
        booking_id: Uuid,
        payment_method_id: &str,
    ) -> Result<Booking> {
        let Some(_guard) = self.env.lock.try_acquire(booking_id).await? else {
            return Err(BookingError::BusinessRule(
                "booking is already being processed".to_string(),
            ));
        };

        let (booking, payment) = self.phase1_read(booking_id).await?;
        if booking.status != BookingStatus::Pending || payment.payment_status != PaymentStatus::Scheduled
        {
            return Err(BookingError::BusinessRule(
                "booking is not awaiting initial authorization".to_string(),
            ));
        }

        let key = idempotency::reauth(booking_id, payment_method_id);
        let outcome = self
            .env
            .psp
            .create_or_retry_auth(&key, payment_method_id, booking.total_price_cents)
            .await;

        let expected_status = payment.payment_status;
        let mut booking = booking;
        let mut payment = payment;
        match outcome {
            Ok(intent) => {
                self.apply_authorization_success(
                    &mut booking,
                    &mut payment,
                    expected_status,
                    intent,
                    "auth_succeeded",
                )
                .await?;
            }
            Err(err) => {
                self.apply_authorization_failure(&mut booking, &mut payment, expected_status, &err)
                    .await?;
                return Err(err);
            }
        }

        Ok(booking)
    }

    /// Shared Phase 1 read, exposed for [`crate::workers::PaymentWorkerSet`],
    /// which re-reads each candidate inside its own lock before acting.
    pub async fn phase1_read(&self, booking_id: Uuid) -> Result<(Booking, BookingPayment)> {
        let mut tx = self
            .env
            .repository
            .pool()
            .begin()
            .await
            .map_err(booking_postgres::PersistenceError::Database)?;
        let booking_row = self.env.repository.fetch_for_update(&mut tx, booking_id).await?;
        let payment_row = self
            .env
            .repository
            .fetch_payment_for_update(&mut tx, booking_id)
            .await?;
        tx.commit().await.map_err(booking_postgres::PersistenceError::Database)?;

        Ok((booking_from_row(booking_row)?, payment_from_row(payment_row)?))
    }

    pub(crate) async fn apply_authorization_success(
        &self,
        booking: &mut Booking,
        payment: &mut BookingPayment,
        expected_status: PaymentStatus,
        intent: PspIntent,
        event_type: &str,
    ) -> Result<()> {
        payment.payment_status = PaymentStatus::Authorized;
        payment.payment_intent_id = Some(intent.intent_id.clone());
        payment.payment_method_id = intent.payment_method_id.clone();
        payment.auth_attempted_at = Some(self.env.clock.now());
        payment.auth_failure_count = 0;
        payment.auth_last_error = None;
        booking.status = BookingStatus::Confirmed;
        booking.confirmed_at = Some(self.env.clock.now());

        self.phase3_commit(booking, payment, expected_status, event_type, &intent.intent_id)
            .await
    }

    pub(crate) async fn apply_authorization_failure(
        &self,
        booking: &Booking,
        payment: &mut BookingPayment,
        expected_status: PaymentStatus,
        err: &BookingError,
    ) -> Result<()> {
        payment.payment_status = PaymentStatus::PaymentMethodRequired;
        payment.auth_attempted_at = Some(self.env.clock.now());
        payment.auth_failure_count += 1;
        payment.auth_last_error = Some(err.to_string());

        self.phase3_commit(booking, payment, expected_status, "auth_failed", "n/a")
            .await
    }

    /// Shared Phase 3 commit, exposed for [`crate::workers::PaymentWorkerSet`].
    ///
    /// Re-reads the payment row under lock and compares it against
    /// `expected_status`, the status observed at Phase 1. A mismatch means
    /// another actor committed a terminal transition between Phase 1 and
    /// here; this caller's Phase 2 work is stale and must not land (§8
    /// invariant 7).
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::ConcurrencyLost`] if the payment row moved
    /// since Phase 1, or a propagated persistence error.
    pub async fn phase3_commit(
        &self,
        booking: &Booking,
        payment: &BookingPayment,
        expected_status: PaymentStatus,
        event_type: &str,
        external_ref: &str,
    ) -> Result<()> {
        let mut tx = self
            .env
            .repository
            .pool()
            .begin()
            .await
            .map_err(booking_postgres::PersistenceError::Database)?;

        let current_payment_row = self
            .env
            .repository
            .fetch_payment_for_update(&mut tx, booking.id)
            .await?;
        let current_payment = payment_from_row(current_payment_row)?;
        if current_payment.payment_status != expected_status {
            return Err(BookingError::ConcurrencyLost(booking.id.to_string()));
        }

        self.env.repository.update_booking(&mut tx, &booking_to_row(booking)).await?;
        self.env
            .repository
            .upsert_payment(&mut tx, &payment_to_row(payment))
            .await?;
        self.env
            .ledger
            .append(
                &mut tx,
                booking.id,
                event_type,
                external_ref,
                serde_json::json!({ "payment_status": payment.payment_status }),
            )
            .await?;
        self.env
            .outbox
            .publish(
                &mut tx,
                event_type,
                booking.id,
                booking.student_id,
                booking.instructor_id,
                self.env.clock.now(),
                serde_json::json!({}),
            )
            .await?;
        self.env
            .audit
            .record(
                &mut tx,
                "system",
                event_type,
                &booking.id.to_string(),
                None,
            )
            .await?;

        tx.commit().await.map_err(booking_postgres::PersistenceError::Database)?;
        Ok(())
    }

    /// §4.3.c: cancel a booking, dispatching the PSP call appropriate to its
    /// current payment state and the cancelling actor.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::Forbidden`] if `actor` is not a participant,
    /// [`BookingError::BusinessRule`] if the booking is already terminal.
    pub async fn cancel_booking(
        &self,
        booking_id: Uuid,
        actor: &Actor,
        reason: &str,
    ) -> Result<Booking> {
        let Some(_guard) = self.env.lock.try_acquire(booking_id).await? else {
            return Err(BookingError::BusinessRule(
                "booking is already being processed".to_string(),
            ));
        };

        let (mut booking, mut payment) = self.phase1_read(booking_id).await?;
        let expected_status = payment.payment_status;

        if booking.status.is_terminal() {
            return Err(BookingError::BusinessRule(
                "booking is already in a terminal state".to_string(),
            ));
        }
        if !actor.has_role(Role::Student) && !actor.has_role(Role::Instructor) && !actor.has_role(Role::Admin)
        {
            return Err(BookingError::Forbidden(
                "actor is not a participant in this booking".to_string(),
            ));
        }

        let cancelled_by = if actor.has_role(Role::Instructor) {
            Role::Instructor
        } else if actor.has_role(Role::Admin) {
            Role::Admin
        } else {
            Role::Student
        };

        let hours_until_start = self.env.clock.hours_until(booking.booking_start_utc);

        match payment.payment_status {
            PaymentStatus::Authorized if cancelled_by == Role::Student && hours_until_start >= 12.0 => {
                let key = idempotency::reauth(booking_id, payment.payment_intent_id.as_deref().unwrap_or(""));
                if let Some(intent_id) = payment.payment_intent_id.clone() {
                    let _ = self.env.psp.cancel_auth(&key, &intent_id).await;
                }
                booking.status = BookingStatus::Cancelled;
                booking.cancelled_at = Some(self.env.clock.now());
                booking.cancellation_reason = Some(reason.to_string());
                booking.cancelled_by_role = Some(cancelled_by);
                Settlement::apply(
                    &mut booking,
                    &mut payment,
                    SettlementOutcome::StudentCancelGt24NoCharge,
                    0,
                    0,
                );
            }
            PaymentStatus::Authorized if cancelled_by == Role::Student => {
                booking.status = BookingStatus::Cancelled;
                booking.cancelled_at = Some(self.env.clock.now());
                booking.cancellation_reason = Some(reason.to_string());
                booking.cancelled_by_role = Some(cancelled_by);
                // Late cancellation: capture still runs via captureLateCancellation (§4.4.5).
            }
            PaymentStatus::Authorized => {
                let key = idempotency::reauth(booking_id, payment.payment_intent_id.as_deref().unwrap_or(""));
                if let Some(intent_id) = payment.payment_intent_id.clone() {
                    let _ = self.env.psp.cancel_auth(&key, &intent_id).await;
                }
                booking.status = BookingStatus::Cancelled;
                booking.cancelled_at = Some(self.env.clock.now());
                booking.cancellation_reason = Some(reason.to_string());
                booking.cancelled_by_role = Some(cancelled_by);
                Settlement::apply(
                    &mut booking,
                    &mut payment,
                    SettlementOutcome::InstructorCancel,
                    0,
                    0,
                );
            }
            PaymentStatus::PaymentMethodRequired => {
                booking.status = BookingStatus::Cancelled;
                booking.cancelled_at = Some(self.env.clock.now());
                booking.cancellation_reason = Some(reason.to_string());
                booking.cancelled_by_role = Some(cancelled_by);
                Settlement::apply(
                    &mut booking,
                    &mut payment,
                    SettlementOutcome::StudentCancelGt24NoCharge,
                    0,
                    0,
                );
            }
            _ => {
                booking.status = BookingStatus::Cancelled;
                booking.cancelled_at = Some(self.env.clock.now());
                booking.cancellation_reason = Some(reason.to_string());
                booking.cancelled_by_role = Some(cancelled_by);
                // LOCKED is resolved separately by LockedFundsResolver.
            }
        }

        self.phase3_commit(&booking, &payment, expected_status, "booking_cancelled", reason)
            .await?;
        Ok(booking)
    }

    /// §4.3.d, first half: mark a `CONFIRMED`/`AUTHORIZED` booking complete.
    /// Leaves capture to [`Self::capture_booking`], a separate call, so the
    /// intermediate `COMPLETED`+`AUTHORIZED` state is durably committed
    /// rather than only existing inside one atomic operation.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::BusinessRule`] if the booking is not
    /// `CONFIRMED` and `AUTHORIZED`.
    pub async fn mark_booking_complete(&self, booking_id: Uuid) -> Result<Booking> {
        let Some(_guard) = self.env.lock.try_acquire(booking_id).await? else {
            return Err(BookingError::BusinessRule(
                "booking is already being processed".to_string(),
            ));
        };

        let (mut booking, payment) = self.phase1_read(booking_id).await?;
        if booking.status != BookingStatus::Confirmed || payment.payment_status != PaymentStatus::Authorized
        {
            return Err(BookingError::BusinessRule(
                "booking is not confirmed and authorized".to_string(),
            ));
        }

        let expected_status = payment.payment_status;
        booking.status = BookingStatus::Completed;
        booking.completed_at = Some(booking.completed_at.unwrap_or_else(|| self.env.clock.now()));

        self.phase3_commit(&booking, &payment, expected_status, "booking_completed", "n/a")
            .await?;
        Ok(booking)
    }

    /// §4.3.d, second half: capture a `COMPLETED` booking's authorized hold.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::BusinessRule`] if the booking is not
    /// `COMPLETED` and `AUTHORIZED`, or a propagated PSP error from the
    /// capture attempt.
    pub async fn capture_booking(
        &self,
        booking_id: Uuid,
        instructor_payout_target_cents: i64,
        capture_reason: &str,
    ) -> Result<Booking> {
        let Some(_guard) = self.env.lock.try_acquire(booking_id).await? else {
            return Err(BookingError::BusinessRule(
                "booking is already being processed".to_string(),
            ));
        };

        let (mut booking, mut payment) = self.phase1_read(booking_id).await?;
        if booking.status != BookingStatus::Completed || payment.payment_status != PaymentStatus::Authorized
        {
            return Err(BookingError::BusinessRule(
                "booking is not completed and authorized".to_string(),
            ));
        }
        let expected_status = payment.payment_status;

        let intent_id = payment
            .payment_intent_id
            .clone()
            .ok_or_else(|| BookingError::BusinessRule("no payment intent to capture".to_string()))?;
        let key = idempotency::capture(capture_reason, booking_id, &intent_id);

        match self.env.psp.capture_auth(&key, &intent_id, booking.total_price_cents).await {
            Ok(transfer) => {
                Settlement::apply(
                    &mut booking,
                    &mut payment,
                    SettlementOutcome::LessonCompletedFullPayout,
                    transfer.amount_cents,
                    instructor_payout_target_cents,
                );
                self.phase3_commit(
                    &booking,
                    &payment,
                    expected_status,
                    "payment_captured",
                    &transfer.transfer_id,
                )
                .await?;
            }
            Err(BookingError::Psp { class, message }) if class == crate::error::PspErrorClass::AlreadyCaptured => {
                let total_price_cents = booking.total_price_cents;
                Settlement::apply(
                    &mut booking,
                    &mut payment,
                    SettlementOutcome::LessonCompletedFullPayout,
                    total_price_cents,
                    instructor_payout_target_cents,
                );
                self.phase3_commit(&booking, &payment, expected_status, "payment_captured", &message)
                    .await?;
            }
            Err(err @ BookingError::Psp { class: crate::error::PspErrorClass::AuthExpired, .. }) => {
                // The hold itself lapsed; leave `payment_status` as `AUTHORIZED` so the
                // stale-authorization scan can find it and re-authorize (§4.4.3 set 3),
                // rather than routing it through the student-facing PaymentMethodRequired path.
                payment.capture_failed_at = Some(self.env.clock.now());
                payment.capture_retry_count += 1;
                payment.capture_error = Some(err.to_string());
                self.phase3_commit(&booking, &payment, expected_status, "capture_failed_auth_expired", &intent_id)
                    .await?;
                return Err(err);
            }
            Err(err) => {
                payment.payment_status = PaymentStatus::PaymentMethodRequired;
                payment.capture_failed_at = Some(self.env.clock.now());
                payment.capture_retry_count += 1;
                payment.capture_error = Some(err.to_string());
                self.phase3_commit(&booking, &payment, expected_status, "capture_failed", &intent_id)
                    .await?;
                return Err(err);
            }
        }

        Ok(booking)
    }

    /// §6 instructor-facing operation: complete then capture in one call,
    /// for callers that don't need the intermediate state to be visible.
    ///
    /// # Errors
    ///
    /// See [`Self::mark_booking_complete`] and [`Self::capture_booking`].
    pub async fn complete_booking(
        &self,
        booking_id: Uuid,
        instructor_payout_target_cents: i64,
    ) -> Result<Booking> {
        self.mark_booking_complete(booking_id).await?;
        self.capture_booking(booking_id, instructor_payout_target_cents, "instructor_completed")
            .await
    }

    /// §6/§4.3.e: reschedule a booking to a new window, submitted as a fresh
    /// [`BookingDraft`].
    ///
    /// Bookings due to start in under 12h cannot be rescheduled. Bookings
    /// 12-24h out with an authorized hold have that hold locked against the
    /// new booking's outcome rather than released (§4.3.e); anything further
    /// out is released at no charge, same as a plain cancellation.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::BusinessRule`] if the booking is terminal,
    /// not in an authorized/scheduled payment state, or too close to start.
    pub async fn reschedule_booking(
        &self,
        original_booking_id: Uuid,
        student_id: Uuid,
        new_draft: BookingDraft,
        constraints: InstructorConstraints,
        pricing: PlatformPricing,
    ) -> Result<Booking> {
        let Some(_guard) = self.env.lock.try_acquire(original_booking_id).await? else {
            return Err(BookingError::BusinessRule(
                "booking is already being processed".to_string(),
            ));
        };

        let (mut booking, mut payment) = self.phase1_read(original_booking_id).await?;
        if booking.status.is_terminal() {
            return Err(BookingError::BusinessRule(
                "booking is already in a terminal state".to_string(),
            ));
        }
        if !matches!(payment.payment_status, PaymentStatus::Authorized | PaymentStatus::Scheduled) {
            return Err(BookingError::BusinessRule(
                "payment is not in a reschedulable state".to_string(),
            ));
        }

        let hours_until_start = self.env.clock.hours_until(booking.booking_start_utc);
        if hours_until_start < 12.0 {
            return Err(BookingError::BusinessRule(
                "booking is too close to its start time to reschedule".to_string(),
            ));
        }

        let expected_status = payment.payment_status;
        let locked =
            (12.0..24.0).contains(&hours_until_start) && payment.payment_status == PaymentStatus::Authorized;

        if locked {
            let locked_amount_cents = booking.total_price_cents;
            payment.payment_status = PaymentStatus::Locked;
            self.phase3_commit(&booking, &payment, expected_status, "booking_rescheduled_locked", "n/a")
                .await?;
            let mut tx = self
                .env
                .repository
                .pool()
                .begin()
                .await
                .map_err(booking_postgres::PersistenceError::Database)?;
            self.env
                .repository
                .create_lock_record(&mut tx, booking.id, locked_amount_cents)
                .await?;
            tx.commit().await.map_err(booking_postgres::PersistenceError::Database)?;
        } else {
            booking.status = BookingStatus::Cancelled;
            booking.cancelled_at = Some(self.env.clock.now());
            booking.cancellation_reason = Some("rescheduled".to_string());
            Settlement::apply(&mut booking, &mut payment, SettlementOutcome::StudentCancelGt24NoCharge, 0, 0);
            self.phase3_commit(&booking, &payment, expected_status, "booking_rescheduled", "n/a")
                .await?;
        }

        drop(_guard);

        let mut draft = new_draft;
        draft.rescheduled_from_booking_id = Some(original_booking_id);
        draft.has_locked_funds = locked;
        self.create_booking_with_payment_setup(student_id, draft, constraints, pricing).await
    }

    /// §6: a participant reports the other party absent from a lesson whose
    /// window has already closed.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::Forbidden`] if `actor` is not a participant,
    /// [`BookingError::BusinessRule`] if the booking is not `CONFIRMED` or
    /// its lesson window has not ended yet.
    pub async fn mark_no_show(
        &self,
        booking_id: Uuid,
        actor: &Actor,
        no_show_type: NoShowType,
        reason: &str,
    ) -> Result<NoShowReport> {
        if !actor.has_role(Role::Student) && !actor.has_role(Role::Instructor) && !actor.has_role(Role::Admin)
        {
            return Err(BookingError::Forbidden(
                "actor is not a participant in this booking".to_string(),
            ));
        }

        let Some(_guard) = self.env.lock.try_acquire(booking_id).await? else {
            return Err(BookingError::BusinessRule(
                "booking is already being processed".to_string(),
            ));
        };

        let (booking, _payment) = self.phase1_read(booking_id).await?;
        if booking.status != BookingStatus::Confirmed {
            return Err(BookingError::BusinessRule(
                "booking is not eligible for a no-show report".to_string(),
            ));
        }
        if self.env.clock.now() < booking.booking_end_utc {
            return Err(BookingError::BusinessRule("lesson has not ended yet".to_string()));
        }

        let report = NoShowReport {
            booking_id,
            no_show_reported_at: self.env.clock.now(),
            no_show_type,
            no_show_disputed: false,
            no_show_resolved_at: None,
            no_show_resolution: None,
        };

        let mut tx = self
            .env
            .repository
            .pool()
            .begin()
            .await
            .map_err(booking_postgres::PersistenceError::Database)?;
        self.env
            .repository
            .upsert_no_show_report(&mut tx, &no_show_report_to_row(&report))
            .await?;
        self.env
            .ledger
            .append(
                &mut tx,
                booking_id,
                "no_show_reported",
                reason,
                serde_json::json!({ "no_show_type": no_show_type }),
            )
            .await?;
        tx.commit().await.map_err(booking_postgres::PersistenceError::Database)?;

        Ok(report)
    }

    /// §6: the other participant disputes a filed no-show report.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::Forbidden`] if `actor` is not a participant,
    /// [`BookingError::BusinessRule`] if the report is already resolved.
    pub async fn dispute_no_show(&self, booking_id: Uuid, actor: &Actor, reason: &str) -> Result<NoShowReport> {
        if !actor.has_role(Role::Student) && !actor.has_role(Role::Instructor) {
            return Err(BookingError::Forbidden(
                "actor is not a participant in this booking".to_string(),
            ));
        }

        let Some(_guard) = self.env.lock.try_acquire(booking_id).await? else {
            return Err(BookingError::BusinessRule(
                "booking is already being processed".to_string(),
            ));
        };

        let mut tx = self
            .env
            .repository
            .pool()
            .begin()
            .await
            .map_err(booking_postgres::PersistenceError::Database)?;
        let row = self.env.repository.fetch_no_show_report_for_update(&mut tx, booking_id).await?;
        let mut report = no_show_report_from_row(row)?;
        if report.no_show_resolved_at.is_some() {
            return Err(BookingError::BusinessRule(
                "no-show report is already resolved".to_string(),
            ));
        }
        report.no_show_disputed = true;
        self.env
            .repository
            .upsert_no_show_report(&mut tx, &no_show_report_to_row(&report))
            .await?;
        self.env
            .ledger
            .append(&mut tx, booking_id, "no_show_disputed", reason, serde_json::json!({}))
            .await?;
        tx.commit().await.map_err(booking_postgres::PersistenceError::Database)?;

        Ok(report)
    }

    /// §6: an admin resolves a disputed no-show report.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::Forbidden`] if `actor` is not an admin, or
    /// see [`Self::apply_no_show_resolution`].
    pub async fn resolve_no_show(
        &self,
        booking_id: Uuid,
        actor: &Actor,
        resolution_label: &str,
        instructor_payout_target_cents: i64,
    ) -> Result<Booking> {
        if !actor.has_role(Role::Admin) {
            return Err(BookingError::Forbidden(
                "only an admin may resolve a disputed no-show".to_string(),
            ));
        }

        let Some(_guard) = self.env.lock.try_acquire(booking_id).await? else {
            return Err(BookingError::BusinessRule(
                "booking is already being processed".to_string(),
            ));
        };

        self.apply_no_show_resolution(booking_id, resolution_label, instructor_payout_target_cents)
            .await
    }

    /// Settles a booking against its filed no-show report: captures or
    /// releases the authorized hold depending on who was absent, and marks
    /// the report resolved.
    ///
    /// Callers must already hold the per-booking lock; this does not
    /// acquire it, since [`Self::resolve_no_show`] and the auto-resolve
    /// worker both call in while holding it themselves.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::BusinessRule`] if the report is already
    /// resolved, or a propagated PSP/persistence error.
    pub(crate) async fn apply_no_show_resolution(
        &self,
        booking_id: Uuid,
        resolution_label: &str,
        instructor_payout_target_cents: i64,
    ) -> Result<Booking> {
        let mut tx = self
            .env
            .repository
            .pool()
            .begin()
            .await
            .map_err(booking_postgres::PersistenceError::Database)?;
        let report_row = self.env.repository.fetch_no_show_report_for_update(&mut tx, booking_id).await?;
        tx.commit().await.map_err(booking_postgres::PersistenceError::Database)?;
        let mut report = no_show_report_from_row(report_row)?;
        if report.no_show_resolved_at.is_some() {
            return Err(BookingError::BusinessRule(
                "no-show report is already resolved".to_string(),
            ));
        }

        let (mut booking, mut payment) = self.phase1_read(booking_id).await?;
        let expected_status = payment.payment_status;
        let outcome = match report.no_show_type {
            NoShowType::Student => SettlementOutcome::StudentNoShow,
            NoShowType::Instructor => SettlementOutcome::InstructorNoShow,
            NoShowType::Mutual => SettlementOutcome::InstructorCancel,
        };

        let captured_amount_cents = if let Some(intent_id) = payment.payment_intent_id.clone() {
            match report.no_show_type {
                NoShowType::Student => {
                    let key = idempotency::capture("no_show", booking_id, &intent_id);
                    self.env
                        .psp
                        .capture_auth(&key, &intent_id, booking.total_price_cents)
                        .await?
                        .amount_cents
                }
                NoShowType::Instructor | NoShowType::Mutual => {
                    let key = idempotency::reauth(booking_id, &intent_id);
                    let _ = self.env.psp.cancel_auth(&key, &intent_id).await;
                    0
                }
            }
        } else {
            0
        };

        booking.status = BookingStatus::NoShow;
        Settlement::apply(&mut booking, &mut payment, outcome, captured_amount_cents, instructor_payout_target_cents);
        self.phase3_commit(&booking, &payment, expected_status, "no_show_resolved", resolution_label)
            .await?;

        report.no_show_resolved_at = Some(self.env.clock.now());
        report.no_show_resolution = Some(resolution_label.to_string());
        let mut tx = self
            .env
            .repository
            .pool()
            .begin()
            .await
            .map_err(booking_postgres::PersistenceError::Database)?;
        self.env
            .repository
            .upsert_no_show_report(&mut tx, &no_show_report_to_row(&report))
            .await?;
        tx.commit().await.map_err(booking_postgres::PersistenceError::Database)?;

        Ok(booking)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn booking_draft_end_time_rejects_midnight_wraparound() {
        let start = NaiveTime::from_hms_opt(23, 30, 0).unwrap();
        let end = start
            .overflowing_add_signed(chrono::Duration::minutes(90))
            .0;
        assert!(end <= start);
    }
}
