//! Pure booking-status and payment-status transition guards, per spec §4.2.
//!
//! Every state mutation in the engine goes through one of these two
//! [`booking_core::transition::Transition`] implementations so the permitted
//! edges live in exactly one place instead of being re-checked ad hoc at each
//! call site.

use crate::model::{BookingStatus, PaymentStatus, SettlementOutcome};
use booking_core::effect::Effect;
use booking_core::transition::Transition;

/// Events that drive the booking-status machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookingEvent {
    /// Payment authorization succeeded for a pending booking.
    PaymentAuthorized,
    /// Either party (or the system) cancelled the booking.
    Cancelled,
    /// The instructor marked the lesson complete, or the auto-complete
    /// worker fired T+24h after the scheduled end.
    MarkedComplete,
    /// A no-show report was resolved against an absent party.
    NoShowResolved,
}

/// Rejection raised when a [`BookingEvent`] is not valid from the current
/// [`BookingStatus`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("cannot apply {event:?} to a booking in {from:?}")]
pub struct BookingTransitionError {
    /// Rejected event.
    pub event: BookingEvent,
    /// Status the booking was in when the event was rejected.
    pub from: BookingStatus,
}

/// No follow-up action type is needed for booking-status transitions; every
/// effect they produce is a plain notification with no retry schedule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookingAction {
    /// Emit a `booking.confirmed`/`booking.cancelled`/... domain event.
    EmitDomainEvent(&'static str),
}

/// Guards the booking-status diagram from spec §4.2.
#[derive(Debug, Clone, Copy, Default)]
pub struct BookingStateMachine;

impl Transition for BookingStateMachine {
    type State = BookingStatus;
    type Event = BookingEvent;
    type Action = BookingAction;
    type Error = BookingTransitionError;

    fn apply(
        &self,
        state: &mut Self::State,
        event: Self::Event,
    ) -> Result<Vec<Effect<Self::Action>>, Self::Error> {
        let (next, label) = match (*state, &event) {
            (BookingStatus::Pending, BookingEvent::PaymentAuthorized) => {
                (BookingStatus::Confirmed, "booking.confirmed")
            }
            (BookingStatus::Pending, BookingEvent::Cancelled) => {
                (BookingStatus::Cancelled, "booking.cancelled")
            }
            (BookingStatus::Confirmed, BookingEvent::MarkedComplete) => {
                (BookingStatus::Completed, "booking.completed")
            }
            (BookingStatus::Confirmed, BookingEvent::Cancelled) => {
                (BookingStatus::Cancelled, "booking.cancelled")
            }
            (BookingStatus::Confirmed, BookingEvent::NoShowResolved) => {
                (BookingStatus::NoShow, "booking.no_show")
            }
            _ => {
                return Err(BookingTransitionError {
                    event,
                    from: *state,
                })
            }
        };

        *state = next;
        Ok(vec![Effect::Sequential(vec![Effect::Delay {
            duration: std::time::Duration::ZERO,
            action: Box::new(BookingAction::EmitDomainEvent(label)),
        }])])
    }
}

/// Events that drive the payment-status machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentEvent {
    /// Authorization succeeded.
    Authorized,
    /// Authorization attempt failed (declined, expired method, ...).
    AuthorizeFailed,
    /// A retried authorization succeeded after `PAYMENT_METHOD_REQUIRED`.
    RetrySucceeded,
    /// T-12h cutoff reached, or the student abandoned recovery, with the
    /// booking settling at no charge.
    AbandonedBeforeCutoff,
    /// Capture succeeded, settling the booking with the given outcome.
    Captured(SettlementOutcome),
    /// A late reschedule (12-24h out) locked the authorized funds pending
    /// resolution against the new booking.
    LockedByReschedule,
    /// Capture attempt failed.
    CaptureFailed,
    /// 72h of capture retries elapsed with no success.
    CaptureRetriesExhausted,
    /// The locked-funds resolver settled the parent booking.
    LockedFundsResolved(SettlementOutcome),
}

/// Rejection raised when a [`PaymentEvent`] is not valid from the current
/// [`PaymentStatus`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("cannot apply {event:?} to a payment in {from:?}")]
pub struct PaymentTransitionError {
    /// Rejected event.
    pub event: PaymentEvent,
    /// Status the payment was in when the event was rejected.
    pub from: PaymentStatus,
}

/// Follow-up work a payment transition implies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentAction {
    /// Record `outcome` via [`crate::settlement::Settlement::apply`].
    Settle(SettlementOutcome),
    /// Emit a `payment.*` domain event.
    EmitDomainEvent(&'static str),
}

/// Guards the payment-status diagram from spec §4.2.
#[derive(Debug, Clone, Copy, Default)]
pub struct PaymentStateMachine;

impl Transition for PaymentStateMachine {
    type State = PaymentStatus;
    type Event = PaymentEvent;
    type Action = PaymentAction;
    type Error = PaymentTransitionError;

    fn apply(
        &self,
        state: &mut Self::State,
        event: Self::Event,
    ) -> Result<Vec<Effect<Self::Action>>, Self::Error> {
        let (next, effects) = match (*state, event.clone()) {
            (PaymentStatus::Scheduled, PaymentEvent::Authorized) => (
                PaymentStatus::Authorized,
                vec![domain_event("payment.authorized")],
            ),
            (PaymentStatus::Scheduled, PaymentEvent::AuthorizeFailed) => (
                PaymentStatus::PaymentMethodRequired,
                vec![domain_event("payment.authorize_failed")],
            ),
            (PaymentStatus::PaymentMethodRequired, PaymentEvent::RetrySucceeded) => (
                PaymentStatus::Authorized,
                vec![domain_event("payment.authorized")],
            ),
            (PaymentStatus::PaymentMethodRequired, PaymentEvent::AbandonedBeforeCutoff) => (
                PaymentStatus::Settled,
                vec![settle_action(SettlementOutcome::StudentCancelGt24NoCharge)],
            ),
            (PaymentStatus::Authorized, PaymentEvent::Captured(outcome)) => {
                (PaymentStatus::Settled, vec![settle_action(outcome)])
            }
            (PaymentStatus::Authorized, PaymentEvent::LockedByReschedule) => (
                PaymentStatus::Locked,
                vec![domain_event("payment.locked")],
            ),
            (PaymentStatus::Authorized, PaymentEvent::CaptureFailed) => (
                PaymentStatus::PaymentMethodRequired,
                vec![domain_event("payment.capture_failed")],
            ),
            (PaymentStatus::PaymentMethodRequired, PaymentEvent::CaptureRetriesExhausted) => (
                PaymentStatus::ManualReview,
                vec![domain_event("payment.escalated_to_manual_review")],
            ),
            (PaymentStatus::Locked, PaymentEvent::LockedFundsResolved(outcome)) => {
                (PaymentStatus::Settled, vec![settle_action(outcome)])
            }
            (from, event) => return Err(PaymentTransitionError { event, from }),
        };

        *state = next;
        Ok(effects)
    }
}

fn domain_event(label: &'static str) -> Effect<PaymentAction> {
    Effect::Delay {
        duration: std::time::Duration::ZERO,
        action: Box::new(PaymentAction::EmitDomainEvent(label)),
    }
}

fn settle_action(outcome: SettlementOutcome) -> Effect<PaymentAction> {
    Effect::Delay {
        duration: std::time::Duration::ZERO,
        action: Box::new(PaymentAction::Settle(outcome)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_booking_confirms_on_authorization() {
        let mut status = BookingStatus::Pending;
        BookingStateMachine
            .apply(&mut status, BookingEvent::PaymentAuthorized)
            .unwrap();
        assert_eq!(status, BookingStatus::Confirmed);
    }

    #[test]
    fn completed_booking_rejects_further_events() {
        let mut status = BookingStatus::Completed;
        let result = BookingStateMachine.apply(&mut status, BookingEvent::Cancelled);
        assert!(result.is_err());
        assert_eq!(status, BookingStatus::Completed);
    }

    #[test]
    fn no_show_is_only_reachable_from_confirmed() {
        let mut status = BookingStatus::Pending;
        assert!(BookingStateMachine
            .apply(&mut status, BookingEvent::NoShowResolved)
            .is_err());

        let mut status = BookingStatus::Confirmed;
        assert!(BookingStateMachine
            .apply(&mut status, BookingEvent::NoShowResolved)
            .is_ok());
        assert_eq!(status, BookingStatus::NoShow);
    }

    #[test]
    fn authorized_payment_locks_on_late_reschedule() {
        let mut status = PaymentStatus::Authorized;
        PaymentStateMachine
            .apply(&mut status, PaymentEvent::LockedByReschedule)
            .unwrap();
        assert_eq!(status, PaymentStatus::Locked);
    }

    #[test]
    fn manual_review_is_terminal() {
        let mut status = PaymentStatus::ManualReview;
        assert!(PaymentStateMachine
            .apply(&mut status, PaymentEvent::Authorized)
            .is_err());
    }

    #[test]
    fn capture_retries_exhausted_only_fires_from_payment_method_required() {
        let mut status = PaymentStatus::Authorized;
        assert!(PaymentStateMachine
            .apply(&mut status, PaymentEvent::CaptureRetriesExhausted)
            .is_err());
    }
}
