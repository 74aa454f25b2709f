//! `PaymentWorkerSet`: the nine scheduled jobs from spec §4.4.
//!
//! Every job scans read-only candidates outside any lock, then processes
//! each candidate under its own `BookingLock` acquisition; a contended lock
//! is skipped, never awaited, so one slow booking never stalls the run.

use crate::credit::CreditService;
use crate::environment::BookingEnvironment;
use crate::error::{BookingError, Result};
use crate::idempotency;
use crate::model::{BookingStatus, PaymentStatus, SettlementOutcome};
use crate::psp::PspAdapter;
use crate::service::BookingService;
use crate::settlement::Settlement;
use uuid::Uuid;

/// Tally of how many candidates a worker run processed, by outcome.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Candidates inspected.
    pub scanned: usize,
    /// Candidates that changed state successfully.
    pub succeeded: usize,
    /// Candidates skipped (lock contention, ineligible, already handled).
    pub skipped: usize,
    /// Candidates that failed and were recorded as a failure state.
    pub failed: usize,
}

impl RunSummary {
    fn record(&mut self, outcome: &Result<bool>) {
        self.scanned += 1;
        match outcome {
            Ok(true) => self.succeeded += 1,
            Ok(false) => self.skipped += 1,
            Err(_) => self.failed += 1,
        }
    }
}

/// Health snapshot returned by `authorizationHealthCheck` (§4.4.9).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthorizationHealth {
    /// `SCHEDULED` bookings whose lesson starts within 24h but have not
    /// yet authorized.
    pub overdue_count: usize,
    /// Whether the system should be considered healthy.
    pub healthy: bool,
}

/// The nine scheduled jobs driving the payment lifecycle forward.
pub struct PaymentWorkerSet<P: PspAdapter + Clone> {
    service: BookingService<P>,
    env: BookingEnvironment<P>,
}

impl<P: PspAdapter + Clone> PaymentWorkerSet<P> {
    /// Wrap an environment. Builds its own [`BookingService`] to reuse the
    /// Phase 1/Phase 3 helpers instead of duplicating transaction plumbing.
    #[must_use]
    pub fn new(env: BookingEnvironment<P>) -> Self {
        Self {
            service: BookingService::new(env.clone()),
            env,
        }
    }

    /// §4.4.1: authorize bookings whose `authScheduledFor` has arrived.
    ///
    /// # Errors
    ///
    /// Returns a persistence error if the candidate scan itself fails;
    /// per-booking failures are absorbed into the returned [`RunSummary`].
    pub async fn process_scheduled_authorizations(&self) -> Result<RunSummary> {
        let now = self.env.clock.now();
        let candidates = self.env.repository.find_due_for_authorization(now).await?;
        let mut summary = RunSummary::default();

        for booking_id in candidates {
            let outcome = self.authorize_one(booking_id).await;
            summary.record(&outcome);
        }

        booking_runtime::metrics::WorkerMetrics::record_run(
            "process_scheduled_authorizations",
            if summary.failed == 0 { "ok" } else { "partial_failure" },
            std::time::Duration::from_secs(0),
        );
        Ok(summary)
    }

    async fn authorize_one(&self, booking_id: Uuid) -> Result<bool> {
        let Some(_guard) = self.env.lock.try_acquire(booking_id).await? else {
            return Ok(false);
        };

        let (booking, mut payment) = self.service.phase1_read(booking_id).await?;
        if payment.payment_status != PaymentStatus::Scheduled {
            return Ok(false);
        }
        let expected_status = payment.payment_status;

        let available_credit = CreditService::available_for_reservation(
            &self.env.repository,
            booking.student_id,
            payment.credits_reserved_cents,
        )
        .await?;

        if available_credit >= booking.total_price_cents {
            payment.payment_status = PaymentStatus::Authorized;
            let mut booking = booking;
            booking.status = BookingStatus::Confirmed;
            booking.confirmed_at = Some(self.env.clock.now());
            self.service
                .phase3_commit(&booking, &payment, expected_status, "auth_succeeded_credits_only", "credits")
                .await?;
            return Ok(true);
        }

        let key = idempotency::reauth(booking_id, payment.payment_intent_id.as_deref().unwrap_or("new"));
        let method_id = payment.payment_method_id.clone().unwrap_or_default();

        match self
            .env
            .psp
            .create_or_retry_auth(&key, &method_id, booking.total_price_cents)
            .await
        {
            Ok(intent) => {
                let mut booking = booking;
                payment.payment_status = PaymentStatus::Authorized;
                payment.payment_intent_id = Some(intent.intent_id.clone());
                payment.auth_attempted_at = Some(self.env.clock.now());
                payment.auth_failure_count = 0;
                booking.status = BookingStatus::Confirmed;
                booking.confirmed_at = Some(self.env.clock.now());
                self.service
                    .phase3_commit(&booking, &payment, expected_status, "auth_succeeded", &intent.intent_id)
                    .await?;
                Ok(true)
            }
            Err(err) => {
                payment.payment_status = PaymentStatus::PaymentMethodRequired;
                payment.auth_attempted_at = Some(self.env.clock.now());
                payment.auth_failure_count += 1;
                payment.auth_last_error = Some(err.to_string());
                self.service
                    .phase3_commit(&booking, &payment, expected_status, "auth_failed", "n/a")
                    .await?;
                if payment.auth_failure_first_email_sent_at.is_none() {
                    if self
                        .env
                        .notifier
                        .send_authorization_failed(booking.id, booking.student_id)
                        .await
                        .is_ok()
                    {
                        payment.auth_failure_first_email_sent_at = Some(self.env.clock.now());
                        self.service
                            .phase3_commit(&booking, &payment, PaymentStatus::PaymentMethodRequired, "auth_failed", "n/a")
                            .await?;
                    }
                }
                Ok(false)
            }
        }
    }

    /// §4.4.2: retry bookings stuck in `PAYMENT_METHOD_REQUIRED`, cancelling
    /// at no charge once the T-12h cutoff passes.
    ///
    /// # Errors
    ///
    /// Returns a persistence error if the candidate scan itself fails.
    pub async fn retry_failed_authorizations(&self) -> Result<RunSummary> {
        let candidates = self.env.repository.find_payment_method_required().await?;
        let mut summary = RunSummary::default();

        for booking_id in candidates {
            let outcome = self.retry_one_authorization(booking_id).await;
            summary.record(&outcome);
        }

        Ok(summary)
    }

    async fn retry_one_authorization(&self, booking_id: Uuid) -> Result<bool> {
        let Some(_guard) = self.env.lock.try_acquire(booking_id).await? else {
            return Ok(false);
        };

        let (mut booking, mut payment) = self.service.phase1_read(booking_id).await?;
        if payment.payment_status != PaymentStatus::PaymentMethodRequired {
            return Ok(false);
        }
        let expected_status = payment.payment_status;

        let hours_until_start = self.env.clock.hours_until(booking.booking_start_utc);

        // §4.4.2's four windows: <=12h cancels at no charge; 12-13h sends the
        // once-only final warning before falling through to a retry attempt;
        // 13-24h and >24h both retry silently on the same backoff table.
        if hours_until_start <= 12.0 {
            booking.status = BookingStatus::Cancelled;
            booking.cancelled_at = Some(self.env.clock.now());
            booking.cancellation_reason = Some("auth_abandoned_before_cutoff".to_string());
            Settlement::apply(
                &mut booking,
                &mut payment,
                SettlementOutcome::StudentCancelGt24NoCharge,
                0,
                0,
            );
            self.service
                .phase3_commit(&booking, &payment, expected_status, "auth_abandoned", "n/a")
                .await?;
            return Ok(true);
        }

        if hours_until_start < 13.0 && payment.auth_failure_t13_warning_sent_at.is_none() {
            if self
                .env
                .notifier
                .send_final_warning(booking.id, booking.student_id)
                .await
                .is_ok()
            {
                payment.auth_failure_t13_warning_sent_at = Some(self.env.clock.now());
                self.service
                    .phase3_commit(&booking, &payment, expected_status, "auth_final_warning_sent", "n/a")
                    .await?;
            }
        }

        if !retry_is_eligible(&self.env.clock, payment.auth_attempted_at, payment.auth_failure_count) {
            return Ok(false);
        }
        let expected_status = payment.payment_status;

        let key = idempotency::reauth(booking_id, payment.payment_intent_id.as_deref().unwrap_or("retry"));
        let method_id = payment.payment_method_id.clone().unwrap_or_default();

        match self
            .env
            .psp
            .create_or_retry_auth(&key, &method_id, booking.total_price_cents)
            .await
        {
            Ok(intent) => {
                payment.payment_status = PaymentStatus::Authorized;
                payment.payment_intent_id = Some(intent.intent_id.clone());
                payment.auth_attempted_at = Some(self.env.clock.now());
                booking.status = BookingStatus::Confirmed;
                booking.confirmed_at = Some(self.env.clock.now());
                self.service
                    .phase3_commit(&booking, &payment, expected_status, "auth_retry_succeeded", &intent.intent_id)
                    .await?;
                Ok(true)
            }
            Err(err) => {
                payment.auth_attempted_at = Some(self.env.clock.now());
                payment.auth_failure_count += 1;
                payment.auth_last_error = Some(err.to_string());
                self.service
                    .phase3_commit(&booking, &payment, expected_status, "auth_retry_failed", "n/a")
                    .await?;
                Ok(false)
            }
        }
    }

    /// §4.4.3: capture completed lessons whose 24h dispute window has passed.
    ///
    /// # Errors
    ///
    /// Returns a persistence error if the candidate scan itself fails.
    pub async fn capture_completed_lessons(&self, instructor_payout_target_cents: i64) -> Result<RunSummary> {
        let cutoff = self.env.clock.now() - chrono::Duration::hours(24);
        let candidates = self.env.repository.find_completed_awaiting_capture(cutoff).await?;
        let mut summary = RunSummary::default();

        for booking_id in candidates {
            let outcome = self
                .complete_and_capture_one(booking_id, instructor_payout_target_cents)
                .await
                .or_else(|err| if err.is_retryable() { Ok(false) } else { Err(err) });
            summary.record(&outcome);
        }

        // Candidate set 3 (§4.4.3): authorizations that went stale waiting on
        // the dispute window and now need a fresh hold before they can be
        // captured at all.
        let stale_cutoff = self.env.clock.now() - chrono::Duration::days(7);
        let stale_candidates = self.env.repository.find_stale_authorizations(stale_cutoff).await?;
        for booking_id in stale_candidates {
            let outcome = self
                .reauthorize_stale_capture(booking_id, instructor_payout_target_cents)
                .await;
            summary.record(&outcome);
        }

        Ok(summary)
    }

    async fn complete_and_capture_one(&self, booking_id: Uuid, instructor_payout_target_cents: i64) -> Result<bool> {
        let (booking, _payment) = self.service.phase1_read(booking_id).await?;
        if booking.status == BookingStatus::Confirmed {
            self.service.mark_booking_complete(booking_id).await?;
        }
        match self
            .service
            .capture_booking(booking_id, instructor_payout_target_cents, "auto_completed")
            .await
        {
            Ok(_) => Ok(true),
            Err(BookingError::Psp { class, .. }) if class == crate::error::PspErrorClass::AuthExpired => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// §4.4.3, candidate set 3: a `COMPLETED` booking whose authorized hold
    /// expired before it was captured. Attempts the capture first; on
    /// `AuthExpired` creates a fresh authorization and retries the capture
    /// against it.
    ///
    /// # Errors
    ///
    /// Propagates non-retryable PSP/persistence errors.
    async fn reauthorize_stale_capture(&self, booking_id: Uuid, instructor_payout_target_cents: i64) -> Result<bool> {
        let (booking, payment) = self.service.phase1_read(booking_id).await?;
        if booking.status != BookingStatus::Completed || payment.payment_status != PaymentStatus::Authorized {
            return Ok(false);
        }

        match self
            .service
            .capture_booking(booking_id, instructor_payout_target_cents, "stale_reauth")
            .await
        {
            Ok(_) => Ok(true),
            Err(BookingError::Psp { class, .. }) if class == crate::error::PspErrorClass::AuthExpired => {
                self.create_new_authorization_and_capture(booking_id, instructor_payout_target_cents)
                    .await
            }
            Err(err) if err.is_retryable() => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// Creates a fresh authorization against the booking's payment method
    /// and immediately captures it, for a hold that expired before capture.
    ///
    /// # Errors
    ///
    /// Propagates non-retryable PSP/persistence errors.
    async fn create_new_authorization_and_capture(
        &self,
        booking_id: Uuid,
        instructor_payout_target_cents: i64,
    ) -> Result<bool> {
        let Some(_guard) = self.env.lock.try_acquire(booking_id).await? else {
            return Ok(false);
        };

        let (mut booking, mut payment) = self.service.phase1_read(booking_id).await?;
        if booking.status != BookingStatus::Completed || payment.payment_status != PaymentStatus::Authorized {
            return Ok(false);
        }
        let expected_status = payment.payment_status;
        let method_id = payment.payment_method_id.clone().unwrap_or_default();

        let reauth_key = idempotency::reauth(booking_id, payment.payment_intent_id.as_deref().unwrap_or("stale"));
        let new_intent = match self
            .env
            .psp
            .create_or_retry_auth(&reauth_key, &method_id, booking.total_price_cents)
            .await
        {
            Ok(intent) => intent,
            Err(err) => {
                payment.auth_last_error = Some(err.to_string());
                self.service
                    .phase3_commit(&booking, &payment, expected_status, "reauth_and_capture_failed", "n/a")
                    .await?;
                return if err.is_retryable() { Ok(false) } else { Err(err) };
            }
        };

        payment.payment_intent_id = Some(new_intent.intent_id.clone());
        let capture_key = idempotency::capture_reauth(booking_id, &new_intent.intent_id);

        match self
            .env
            .psp
            .capture_auth(&capture_key, &new_intent.intent_id, booking.total_price_cents)
            .await
        {
            Ok(transfer) => {
                Settlement::apply(
                    &mut booking,
                    &mut payment,
                    SettlementOutcome::LessonCompletedFullPayout,
                    transfer.amount_cents,
                    instructor_payout_target_cents,
                );
                self.service
                    .phase3_commit(
                        &booking,
                        &payment,
                        expected_status,
                        "reauth_and_capture_success",
                        &transfer.transfer_id,
                    )
                    .await?;
                Ok(true)
            }
            Err(err) => {
                payment.capture_error = Some(err.to_string());
                payment.capture_failed_at = Some(self.env.clock.now());
                self.service
                    .phase3_commit(&booking, &payment, expected_status, "reauth_and_capture_failed", "n/a")
                    .await?;
                if err.is_retryable() { Ok(false) } else { Err(err) }
            }
        }
    }

    /// §4.4.4: retry capture failures, escalating to manual review after 72h.
    ///
    /// # Errors
    ///
    /// Returns a persistence error if the candidate scan itself fails.
    pub async fn retry_failed_captures(&self, instructor_payout_target_cents: i64) -> Result<RunSummary> {
        let candidates = self.env.repository.find_capture_failed().await?;
        let mut summary = RunSummary::default();

        for booking_id in candidates {
            let outcome = self
                .retry_one_capture(booking_id, instructor_payout_target_cents)
                .await;
            summary.record(&outcome);
        }

        Ok(summary)
    }

    async fn retry_one_capture(&self, booking_id: Uuid, instructor_payout_target_cents: i64) -> Result<bool> {
        let Some(_guard) = self.env.lock.try_acquire(booking_id).await? else {
            return Ok(false);
        };

        let (mut booking, mut payment) = self.service.phase1_read(booking_id).await?;
        let Some(failed_at) = payment.capture_failed_at else {
            return Ok(false);
        };
        let expected_status = payment.payment_status;

        let elapsed_hours = (self.env.clock.now() - failed_at).num_seconds() as f64 / 3600.0;

        if elapsed_hours >= 72.0 {
            let intent_id = payment.payment_intent_id.clone().unwrap_or_default();
            let key = idempotency::capture_failure_payout(booking_id);
            let transfer_result = self
                .env
                .psp
                .manual_transfer(&key, &booking.instructor_id.to_string(), instructor_payout_target_cents)
                .await;

            payment.payment_status = PaymentStatus::ManualReview;
            payment.capture_escalated_at = Some(self.env.clock.now());

            let outcome = match transfer_result {
                Ok(_) => SettlementOutcome::CaptureFailureInstructorPaid,
                Err(_) => SettlementOutcome::CaptureFailureEscalated,
            };
            Settlement::apply(&mut booking, &mut payment, outcome, 0, instructor_payout_target_cents);
            self.service
                .phase3_commit(&booking, &payment, expected_status, "capture_failure_escalated", &intent_id)
                .await?;
            return Ok(true);
        }

        if elapsed_hours < 4.0 {
            return Ok(false);
        }

        let intent_id = payment.payment_intent_id.clone().unwrap_or_default();
        let key = idempotency::capture("retry", booking_id, &intent_id);

        match self.env.psp.capture_auth(&key, &intent_id, booking.total_price_cents).await {
            Ok(transfer) => {
                Settlement::apply(
                    &mut booking,
                    &mut payment,
                    SettlementOutcome::LessonCompletedFullPayout,
                    transfer.amount_cents,
                    instructor_payout_target_cents,
                );
                self.service
                    .phase3_commit(&booking, &payment, expected_status, "payment_captured", &transfer.transfer_id)
                    .await?;
                Ok(true)
            }
            Err(err) => {
                payment.capture_retry_count += 1;
                payment.capture_error = Some(err.to_string());
                payment.capture_failed_at = Some(self.env.clock.now());
                self.service
                    .phase3_commit(&booking, &payment, expected_status, "capture_failed", &intent_id)
                    .await?;
                Ok(false)
            }
        }
    }

    /// §4.4.5: immediate capture when a student cancels <12h before start.
    ///
    /// # Errors
    ///
    /// Propagates PSP/persistence errors; the caller (`cancelBooking`) has
    /// already transitioned the booking to `CANCELLED`.
    pub async fn capture_late_cancellation(
        &self,
        booking_id: Uuid,
        instructor_payout_target_cents: i64,
    ) -> Result<bool> {
        let Some(_guard) = self.env.lock.try_acquire(booking_id).await? else {
            return Ok(false);
        };

        let (mut booking, mut payment) = self.service.phase1_read(booking_id).await?;
        let expected_status = payment.payment_status;
        let intent_id = payment
            .payment_intent_id
            .clone()
            .ok_or_else(|| BookingError::BusinessRule("no intent to capture for late cancellation".to_string()))?;
        let key = idempotency::capture_late_cancel(booking_id, &intent_id);

        let transfer = self.env.psp.capture_auth(&key, &intent_id, booking.total_price_cents).await?;
        Settlement::apply(
            &mut booking,
            &mut payment,
            SettlementOutcome::StudentCancelLt12Split5050,
            transfer.amount_cents,
            instructor_payout_target_cents,
        );
        self.service
            .phase3_commit(&booking, &payment, expected_status, "late_cancellation_captured", &transfer.transfer_id)
            .await?;

        Ok(true)
    }

    /// §4.4.6: resolve no-show reports that went undisputed for 24h.
    ///
    /// # Errors
    ///
    /// Returns a persistence error if the candidate scan itself fails.
    pub async fn resolve_undisputed_no_shows(&self, instructor_payout_target_cents: i64) -> Result<RunSummary> {
        let cutoff = self.env.clock.now() - chrono::Duration::hours(24);
        let candidates = self.env.repository.find_undisputed_no_shows(cutoff).await?;
        let mut summary = RunSummary::default();

        for booking_id in candidates {
            let outcome = self.resolve_one_no_show(booking_id, instructor_payout_target_cents).await;
            summary.record(&outcome);
        }

        Ok(summary)
    }

    async fn resolve_one_no_show(&self, booking_id: Uuid, instructor_payout_target_cents: i64) -> Result<bool> {
        let Some(_guard) = self.env.lock.try_acquire(booking_id).await? else {
            return Ok(false);
        };

        match self
            .service
            .apply_no_show_resolution(booking_id, "confirmed_no_dispute", instructor_payout_target_cents)
            .await
        {
            Ok(_) => Ok(true),
            Err(err) if err.is_user_error() || err.is_retryable() => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// §4.4.7: cancel a booking whose immediate auth attempt timed out 30
    /// minutes ago without recovering.
    ///
    /// # Errors
    ///
    /// Propagates persistence errors from the cancellation.
    pub async fn check_immediate_auth_timeout(&self, booking_id: Uuid) -> Result<bool> {
        let Some(_guard) = self.env.lock.try_acquire(booking_id).await? else {
            return Ok(false);
        };

        let (mut booking, mut payment) = self.service.phase1_read(booking_id).await?;
        if payment.payment_status != PaymentStatus::PaymentMethodRequired {
            return Ok(false);
        }
        let expected_status = payment.payment_status;
        let Some(attempted_at) = payment.auth_attempted_at else {
            return Ok(false);
        };
        if (self.env.clock.now() - attempted_at).num_minutes() < 30 {
            return Ok(false);
        }

        booking.status = BookingStatus::Cancelled;
        booking.cancelled_at = Some(self.env.clock.now());
        booking.cancellation_reason = Some("immediate_auth_timeout".to_string());
        Settlement::apply(
            &mut booking,
            &mut payment,
            SettlementOutcome::StudentCancelGt24NoCharge,
            0,
            0,
        );
        self.service
            .phase3_commit(&booking, &payment, expected_status, "auth_abandoned", "n/a")
            .await?;

        Ok(true)
    }

    /// §4.4.8: push a weekly payout schedule to every instructor account the
    /// PSP knows about via a booking on file.
    ///
    /// # Errors
    ///
    /// Returns a persistence error if the candidate scan itself fails;
    /// per-instructor PSP failures are absorbed into the returned
    /// [`RunSummary`].
    pub async fn audit_payout_schedules(&self) -> Result<RunSummary> {
        let instructor_ids = self.env.repository.find_distinct_instructor_ids().await?;
        let mut summary = RunSummary::default();

        for instructor_id in instructor_ids {
            let outcome = self
                .env
                .psp
                .set_payout_schedule(&instructor_id.to_string(), 7)
                .await
                .map(|()| true)
                .or_else(|err| if err.is_retryable() { Ok(false) } else { Err(err) });
            summary.record(&outcome);
        }

        Ok(summary)
    }

    /// §4.4.9: count `SCHEDULED` bookings overdue for authorization and
    /// report whether the subsystem looks healthy.
    ///
    /// # Errors
    ///
    /// Returns a persistence error if the candidate scan itself fails.
    pub async fn authorization_health_check(&self) -> Result<AuthorizationHealth> {
        let candidates = self
            .env
            .repository
            .find_due_for_authorization(self.env.clock.now())
            .await?;

        let healthy = candidates.len() <= 5;
        booking_runtime::metrics::WorkerMetrics::record_authorization_overdue_count(candidates.len());

        Ok(AuthorizationHealth {
            overdue_count: candidates.len(),
            healthy,
        })
    }
}

/// Retry eligibility per §4.4.2's backoff table: 1st failure waits 1h, 2nd
/// waits 4h, 3rd+ waits 8h.
fn retry_is_eligible(
    clock: &crate::clock_service::ClockService,
    last_attempted_at: Option<chrono::DateTime<chrono::Utc>>,
    failure_count: u32,
) -> bool {
    let Some(last_attempted_at) = last_attempted_at else {
        return true;
    };

    let wait_hours = match failure_count {
        0 | 1 => 1.0,
        2 => 4.0,
        _ => 8.0,
    };

    let elapsed_hours = (clock.now() - last_attempted_at).num_seconds() as f64 / 3600.0;
    elapsed_hours >= wait_hours
}

#[cfg(test)]
mod tests {
    use super::*;
    use booking_testing::test_clock;
    use std::sync::Arc;

    #[test]
    fn first_failure_waits_one_hour() {
        let service = crate::clock_service::ClockService::new(Arc::new(test_clock()));
        let last = service.now() - chrono::Duration::minutes(30);
        assert!(!retry_is_eligible(&service, Some(last), 1));

        let last = service.now() - chrono::Duration::hours(2);
        assert!(retry_is_eligible(&service, Some(last), 1));
    }

    #[test]
    fn third_failure_waits_eight_hours() {
        let service = crate::clock_service::ClockService::new(Arc::new(test_clock()));
        let last = service.now() - chrono::Duration::hours(5);
        assert!(!retry_is_eligible(&service, Some(last), 3));

        let last = service.now() - chrono::Duration::hours(9);
        assert!(retry_is_eligible(&service, Some(last), 3));
    }

    #[test]
    fn no_prior_attempt_is_always_eligible() {
        let service = crate::clock_service::ClockService::new(Arc::new(test_clock()));
        assert!(retry_is_eligible(&service, None, 0));
    }
}
