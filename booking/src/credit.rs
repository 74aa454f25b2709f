//! Student credit ledger operations against a single booking.
//!
//! Credits are reserved at booking-creation time (Phase 1, under the
//! student's row lock via [`booking_postgres::BookingRepository`]) and either
//! forfeited (consumed by a no-charge settlement) or released back to the
//! student's balance (booking never reached a chargeable state).

use crate::error::{BookingError, Result};
use booking_postgres::BookingRepository;
use uuid::Uuid;

/// Reserves, forfeits, or releases student credit against a booking.
///
/// Holds no state of its own; every call takes the repository explicitly so
/// callers control transaction scope, the same shape `BookingRepository`'s
/// own methods use.
pub struct CreditService;

impl CreditService {
    /// Checks that `requested_cents` does not exceed the student's current
    /// balance, returning the amount that can actually be reserved (capped at
    /// the balance, floored at zero).
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::Persistence`] if the balance lookup fails.
    pub async fn available_for_reservation(
        repo: &BookingRepository,
        student_id: Uuid,
        requested_cents: i64,
    ) -> Result<i64> {
        let balance_cents = repo.student_credit_balance_cents(student_id).await?;
        Ok(requested_cents.min(balance_cents).max(0))
    }

    /// Records that `amount_cents` of credit has been reserved against
    /// `booking_id`. Reservation itself is just bookkeeping on the payment
    /// row; the actual balance deduction happens at forfeiture or release,
    /// since until settlement the reservation is provisional.
    #[must_use]
    pub fn reserve(amount_cents: i64) -> i64 {
        amount_cents.max(0)
    }

    /// Forfeits reserved credit: the student keeps the charge on their card
    /// for the non-credit portion, and the reserved credit is consumed
    /// (never returned to the balance). Used when a booking settles with a
    /// charge.
    #[must_use]
    pub fn forfeit(reserved_cents: i64) -> i64 {
        reserved_cents
    }

    /// Releases reserved credit back to the student's balance unconsumed.
    /// Used when a booking never reaches a chargeable settlement (e.g. a
    /// cancellation that zeroes the charge entirely).
    ///
    /// Returns the amount to credit back; callers persist it via
    /// whatever ledger table backs `student_credit_balance_cents`.
    #[must_use]
    pub fn release(reserved_cents: i64) -> i64 {
        reserved_cents
    }

    /// Validates a requested reservation is non-negative and does not exceed
    /// the booking's base price, surfacing a user-facing error rather than
    /// silently clamping when the caller asked for something nonsensical.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::ValidationFailed`] if `requested_cents` is
    /// negative or exceeds `base_price_cents`.
    pub fn validate_requested(requested_cents: i64, base_price_cents: i64) -> Result<()> {
        if requested_cents < 0 {
            return Err(BookingError::ValidationFailed(
                "requested credit cannot be negative".to_string(),
            ));
        }
        if requested_cents > base_price_cents {
            return Err(BookingError::ValidationFailed(
                "requested credit exceeds the booking's base price".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserve_floors_negative_amounts_at_zero() {
        assert_eq!(CreditService::reserve(-100), 0);
        assert_eq!(CreditService::reserve(500), 500);
    }

    #[test]
    fn forfeit_and_release_are_identity_on_the_reserved_amount() {
        assert_eq!(CreditService::forfeit(500), 500);
        assert_eq!(CreditService::release(500), 500);
    }

    #[test]
    fn validate_requested_rejects_negative_amounts() {
        assert!(CreditService::validate_requested(-1, 1000).is_err());
    }

    #[test]
    fn validate_requested_rejects_amounts_above_base_price() {
        assert!(CreditService::validate_requested(2000, 1000).is_err());
        assert!(CreditService::validate_requested(1000, 1000).is_ok());
    }
}
