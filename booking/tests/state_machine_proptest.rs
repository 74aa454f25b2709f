//! Property tests for the booking-status and payment-status transition
//! guards: no event ever mutates a terminal state, and a rejected event
//! never leaves a partial mutation behind.

use booking::model::{BookingStatus, PaymentStatus, SettlementOutcome};
use booking::state_machine::{BookingEvent, BookingStateMachine, PaymentEvent, PaymentStateMachine};
use booking_core::transition::Transition;
use proptest::prelude::*;

fn booking_status_strategy() -> impl Strategy<Value = BookingStatus> {
    prop_oneof![
        Just(BookingStatus::Pending),
        Just(BookingStatus::Confirmed),
        Just(BookingStatus::Completed),
        Just(BookingStatus::Cancelled),
        Just(BookingStatus::NoShow),
    ]
}

fn booking_event_strategy() -> impl Strategy<Value = BookingEvent> {
    prop_oneof![
        Just(BookingEvent::PaymentAuthorized),
        Just(BookingEvent::Cancelled),
        Just(BookingEvent::MarkedComplete),
        Just(BookingEvent::NoShowResolved),
    ]
}

fn settlement_outcome_strategy() -> impl Strategy<Value = SettlementOutcome> {
    prop_oneof![
        Just(SettlementOutcome::LessonCompletedFullPayout),
        Just(SettlementOutcome::StudentCancelGt24NoCharge),
        Just(SettlementOutcome::StudentCancelLt12Split5050),
        Just(SettlementOutcome::InstructorCancel),
        Just(SettlementOutcome::StudentNoShow),
        Just(SettlementOutcome::InstructorNoShow),
        Just(SettlementOutcome::CaptureFailureEscalated),
        Just(SettlementOutcome::CaptureFailureInstructorPaid),
    ]
}

fn payment_status_strategy() -> impl Strategy<Value = PaymentStatus> {
    prop_oneof![
        Just(PaymentStatus::Scheduled),
        Just(PaymentStatus::Authorized),
        Just(PaymentStatus::PaymentMethodRequired),
        Just(PaymentStatus::Settled),
        Just(PaymentStatus::Locked),
        Just(PaymentStatus::ManualReview),
    ]
}

fn payment_event_strategy() -> impl Strategy<Value = PaymentEvent> {
    prop_oneof![
        Just(PaymentEvent::Authorized),
        Just(PaymentEvent::AuthorizeFailed),
        Just(PaymentEvent::RetrySucceeded),
        Just(PaymentEvent::AbandonedBeforeCutoff),
        settlement_outcome_strategy().prop_map(PaymentEvent::Captured),
        Just(PaymentEvent::LockedByReschedule),
        Just(PaymentEvent::CaptureFailed),
        Just(PaymentEvent::CaptureRetriesExhausted),
        settlement_outcome_strategy().prop_map(PaymentEvent::LockedFundsResolved),
    ]
}

proptest! {
    #[test]
    fn booking_terminal_states_never_mutate(
        status in prop_oneof![
            Just(BookingStatus::Completed),
            Just(BookingStatus::Cancelled),
            Just(BookingStatus::NoShow),
        ],
        event in booking_event_strategy(),
    ) {
        let mut state = status;
        let result = BookingStateMachine.apply(&mut state, event);
        prop_assert!(result.is_err());
        prop_assert_eq!(state, status);
    }

    #[test]
    fn booking_rejected_event_leaves_state_unchanged(
        status in booking_status_strategy(),
        event in booking_event_strategy(),
    ) {
        let mut state = status;
        if BookingStateMachine.apply(&mut state, event).is_err() {
            prop_assert_eq!(state, status);
        }
    }

    #[test]
    fn payment_terminal_states_never_mutate(
        status in prop_oneof![Just(PaymentStatus::Settled), Just(PaymentStatus::ManualReview)],
        event in payment_event_strategy(),
    ) {
        let mut state = status;
        let result = PaymentStateMachine.apply(&mut state, event);
        prop_assert!(result.is_err());
        prop_assert_eq!(state, status);
    }

    #[test]
    fn payment_rejected_event_leaves_state_unchanged(
        status in payment_status_strategy(),
        event in payment_event_strategy(),
    ) {
        let mut state = status;
        if PaymentStateMachine.apply(&mut state, event).is_err() {
            prop_assert_eq!(state, status);
        }
    }

    #[test]
    fn booking_random_walk_never_leaves_a_terminal_status(
        events in proptest::collection::vec(booking_event_strategy(), 1..12),
    ) {
        let mut state = BookingStatus::Pending;
        for event in events {
            let was_terminal = state.is_terminal();
            let _ = BookingStateMachine.apply(&mut state, event);
            if was_terminal {
                prop_assert!(state.is_terminal());
            }
        }
    }

    #[test]
    fn payment_random_walk_never_leaves_a_terminal_status(
        events in proptest::collection::vec(payment_event_strategy(), 1..12),
    ) {
        let mut state = PaymentStatus::Scheduled;
        for event in events {
            let was_terminal = state.is_terminal();
            let _ = PaymentStateMachine.apply(&mut state, event);
            if was_terminal {
                prop_assert!(state.is_terminal());
            }
        }
    }
}
