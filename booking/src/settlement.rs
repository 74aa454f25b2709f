//! Settlement outcome application, per spec §4.5 and the resolved open
//! question on the late-cancellation split (see `DESIGN.md`).

use crate::model::{Booking, BookingPayment, PaymentStatus, SettlementOutcome};

/// Applies a terminal settlement outcome to a booking/payment pair.
///
/// This is the single site in the crate that zeroes
/// `student_credit_amount_cents`/`refunded_to_card_amount_cents` together,
/// which is what resolves the ambiguity the distilled spec flagged: there is
/// exactly one zeroing path, not several independently-maintained ones.
pub struct Settlement;

impl Settlement {
    /// Apply `outcome` to `booking`/`payment`, given the amount actually
    /// captured by the PSP (0 if nothing was captured) and the instructor's
    /// payout target computed by [`crate::pricing::PricingCalculator`].
    pub fn apply(
        booking: &mut Booking,
        payment: &mut BookingPayment,
        outcome: SettlementOutcome,
        captured_amount_cents: i64,
        instructor_payout_target_cents: i64,
    ) {
        let payout = match outcome {
            SettlementOutcome::LessonCompletedFullPayout | SettlementOutcome::StudentNoShow => {
                instructor_payout_target_cents
            }
            SettlementOutcome::StudentCancelLt12Split5050 => {
                crate::pricing::PricingCalculator::split_late_cancellation_payout(
                    instructor_payout_target_cents,
                )
            }
            SettlementOutcome::StudentCancelGt24NoCharge
            | SettlementOutcome::InstructorCancel
            | SettlementOutcome::InstructorNoShow => 0,
            SettlementOutcome::CaptureFailureEscalated => 0,
            SettlementOutcome::CaptureFailureInstructorPaid => instructor_payout_target_cents,
        };

        match outcome {
            SettlementOutcome::StudentCancelGt24NoCharge
            | SettlementOutcome::InstructorCancel
            | SettlementOutcome::InstructorNoShow => {
                booking.student_credit_amount_cents = 0;
                booking.refunded_to_card_amount_cents = captured_amount_cents;
            }
            _ => {}
        }

        payment.settlement_outcome = Some(outcome);
        payment.instructor_payout_amount_cents = Some(payout);
        payment.payment_status = if outcome == SettlementOutcome::CaptureFailureEscalated {
            PaymentStatus::ManualReview
        } else {
            PaymentStatus::Settled
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BookingStatus, LocationType};
    use chrono::Utc;
    use uuid::Uuid;

    fn sample() -> (Booking, BookingPayment) {
        let now = Utc::now();
        let booking = Booking {
            id: Uuid::new_v4(),
            student_id: Uuid::new_v4(),
            instructor_id: Uuid::new_v4(),
            status: BookingStatus::Confirmed,
            booking_start_utc: now,
            booking_end_utc: now + chrono::Duration::hours(1),
            duration_minutes: 60,
            lesson_timezone: "UTC".to_string(),
            service_name: "Piano".to_string(),
            hourly_rate_cents: 5000,
            total_price_cents: 5000,
            location_type: LocationType::Online,
            rescheduled_from_booking_id: None,
            has_locked_funds: false,
            cancellation_reason: None,
            cancelled_by_role: None,
            student_credit_amount_cents: 0,
            refunded_to_card_amount_cents: 0,
            created_at: now,
            confirmed_at: Some(now),
            completed_at: None,
            cancelled_at: None,
        };
        let payment = BookingPayment {
            booking_id: booking.id,
            payment_status: PaymentStatus::Authorized,
            payment_intent_id: Some("pi_1".to_string()),
            payment_method_id: Some("pm_1".to_string()),
            auth_scheduled_for: None,
            auth_attempted_at: None,
            auth_failure_count: 0,
            auth_last_error: None,
            auth_failure_first_email_sent_at: None,
            auth_failure_t13_warning_sent_at: None,
            capture_failed_at: None,
            capture_retry_count: 0,
            capture_error: None,
            capture_escalated_at: None,
            credits_reserved_cents: 0,
            settlement_outcome: None,
            instructor_payout_amount_cents: None,
        };
        (booking, payment)
    }

    #[test]
    fn full_completion_pays_the_full_target() {
        let (mut booking, mut payment) = sample();
        Settlement::apply(
            &mut booking,
            &mut payment,
            SettlementOutcome::LessonCompletedFullPayout,
            5000,
            4250,
        );
        assert_eq!(payment.instructor_payout_amount_cents, Some(4250));
        assert_eq!(payment.payment_status, PaymentStatus::Settled);
    }

    #[test]
    fn late_cancellation_halves_the_payout_but_keeps_the_full_charge() {
        let (mut booking, mut payment) = sample();
        Settlement::apply(
            &mut booking,
            &mut payment,
            SettlementOutcome::StudentCancelLt12Split5050,
            5000,
            4250,
        );
        assert_eq!(payment.instructor_payout_amount_cents, Some(2125));
    }

    #[test]
    fn no_charge_cancellation_zeroes_both_student_amount_fields_together() {
        let (mut booking, mut payment) = sample();
        booking.student_credit_amount_cents = 500;
        booking.refunded_to_card_amount_cents = 500;
        Settlement::apply(
            &mut booking,
            &mut payment,
            SettlementOutcome::StudentCancelGt24NoCharge,
            0,
            4250,
        );
        assert_eq!(booking.student_credit_amount_cents, 0);
        assert_eq!(booking.refunded_to_card_amount_cents, 0);
        assert_eq!(payment.instructor_payout_amount_cents, Some(0));
    }

    #[test]
    fn capture_failure_escalated_transitions_to_manual_review() {
        let (mut booking, mut payment) = sample();
        Settlement::apply(
            &mut booking,
            &mut payment,
            SettlementOutcome::CaptureFailureEscalated,
            0,
            4250,
        );
        assert_eq!(payment.payment_status, PaymentStatus::ManualReview);
    }
}
