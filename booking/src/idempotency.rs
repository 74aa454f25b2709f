//! Deterministic idempotency key derivation for PSP calls.
//!
//! Every function here is a pure function of stable booking fields — never of
//! `now()` — so that a worker retrying after a crash between Phase 2 and
//! Phase 3 reconstructs the exact same key and the PSP's own idempotency
//! handling collapses the retry into the original call.
//!
//! Formats confirmed against the distilled original source's
//! `backend/app/tasks/payment_tasks.py`.

use uuid::Uuid;

/// Key for a capture, scoped by a reason tag (e.g. `"instructor_completed"`, `"auto_completed"`).
#[must_use]
pub fn capture(reason: &str, booking_id: Uuid, intent_id: &str) -> String {
    format!("capture_{reason}_{booking_id}_{intent_id}")
}

/// Key for a fresh authorization attempt or retry.
#[must_use]
pub fn reauth(booking_id: Uuid, intent_id: &str) -> String {
    format!("reauth_{booking_id}_{intent_id}")
}

/// Key for the manual transfer issued when a capture failure escalates to manual review.
#[must_use]
pub fn capture_failure_payout(booking_id: Uuid) -> String {
    format!("capture_failure_payout_{booking_id}")
}

/// Key for a late-cancellation capture (<12h before lesson start).
#[must_use]
pub fn capture_late_cancel(booking_id: Uuid, intent_id: &str) -> String {
    format!("capture_late_cancel_{booking_id}_{intent_id}")
}

/// Key for the capture that follows a fresh re-authorization (auth expired, §4.4.3 set 3).
#[must_use]
pub fn capture_reauth(booking_id: Uuid, new_intent_id: &str) -> String {
    format!("capture_reauth_{booking_id}_{new_intent_id}")
}

/// Key for resolving a `LOCKED` ancestor booking, scoped by resolution reason.
#[must_use]
pub fn locked_funds(reason: &str, parent_booking_id: Uuid) -> String {
    format!("locked_funds_{reason}_{parent_booking_id}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_deterministic_for_the_same_inputs() {
        let id = Uuid::new_v4();
        assert_eq!(
            capture("instructor_completed", id, "pi_1"),
            capture("instructor_completed", id, "pi_1")
        );
    }

    #[test]
    fn capture_key_includes_reason_booking_and_intent() {
        let id = Uuid::new_v4();
        let key = capture("auto_completed", id, "pi_42");
        assert_eq!(key, format!("capture_auto_completed_{id}_pi_42"));
    }

    #[test]
    fn locked_funds_key_is_scoped_by_reason_and_parent() {
        let parent = Uuid::new_v4();
        let key = locked_funds("instructor_cancelled", parent);
        assert_eq!(key, format!("locked_funds_instructor_cancelled_{parent}"));
    }

    #[test]
    fn different_reasons_yield_different_keys_for_same_booking() {
        let id = Uuid::new_v4();
        assert_ne!(
            capture("instructor_completed", id, "pi_1"),
            capture("auto_completed", id, "pi_1")
        );
    }
}
