//! Resolves a `LOCKED` ancestor booking once its replacement lesson reaches
//! an outcome, per spec §4.7.

use crate::environment::BookingEnvironment;
use crate::error::{BookingError, Result};
use crate::idempotency;
use crate::mapping::{booking_from_row, booking_to_row, payment_from_row, payment_to_row};
use crate::model::{Booking, BookingPayment, LockResolution, PaymentStatus, SettlementOutcome};
use crate::psp::PspAdapter;
use crate::settlement::Settlement;
use uuid::Uuid;

/// Why a `LOCKED` booking is being resolved, and the settlement it implies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockReason {
    /// The replacement lesson completed and was captured.
    NewLessonCompleted,
    /// The instructor cancelled the replacement lesson.
    InstructorCancelled,
    /// The student no-showed the replacement lesson.
    StudentNoShow,
    /// Both parties no-showed the replacement lesson.
    MutualNoShow,
}

impl LockReason {
    fn as_str(self) -> &'static str {
        match self {
            Self::NewLessonCompleted => "new_lesson_completed",
            Self::InstructorCancelled => "instructor_cancelled",
            Self::StudentNoShow => "student_no_show",
            Self::MutualNoShow => "mutual_no_show",
        }
    }

    const fn resolution(self) -> LockResolution {
        match self {
            Self::NewLessonCompleted => LockResolution::NewLessonCompleted,
            Self::InstructorCancelled => LockResolution::InstructorCancelled,
            Self::StudentNoShow => LockResolution::StudentNoShow,
            Self::MutualNoShow => LockResolution::MutualNoShow,
        }
    }

    const fn settlement_outcome(self) -> SettlementOutcome {
        match self {
            Self::NewLessonCompleted | Self::StudentNoShow => SettlementOutcome::LessonCompletedFullPayout,
            Self::InstructorCancelled | Self::MutualNoShow => SettlementOutcome::InstructorCancel,
        }
    }
}

/// Outcome of attempting to resolve a locked booking, distinguishing a
/// genuine resolution from a short-circuit on an already-handled booking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveOutcome {
    /// The lock was resolved and the parent booking settled.
    Resolved(Booking),
    /// Nothing to do: the parent was already resolved, already settled, or
    /// was never locked in the first place.
    AlreadyHandled(&'static str),
}

/// Resolves ancestor bookings whose payment sits in `LOCKED`.
pub struct LockedFundsResolver<P: PspAdapter + Clone> {
    env: BookingEnvironment<P>,
}

impl<P: PspAdapter + Clone> LockedFundsResolver<P> {
    /// Wrap an environment.
    #[must_use]
    pub const fn new(env: BookingEnvironment<P>) -> Self {
        Self { env }
    }

    /// Resolve `parent_booking_id`'s lock for `reason`, given the instructor
    /// payout target computed for the parent's original price. `child_booking_id`
    /// is the replacement lesson whose outcome triggered this resolution;
    /// once the parent settles, its payment is marked settled too if it
    /// somehow hasn't reached a terminal state on its own already (§4.7
    /// step 3).
    ///
    /// # Errors
    ///
    /// Propagates persistence and PSP errors. Does not error on an
    /// already-resolved lock; see [`ResolveOutcome::AlreadyHandled`].
    pub async fn resolve(
        &self,
        parent_booking_id: Uuid,
        child_booking_id: Uuid,
        reason: LockReason,
        instructor_payout_target_cents: i64,
    ) -> Result<ResolveOutcome> {
        let Some(_guard) = self.env.lock.try_acquire(parent_booking_id).await? else {
            return Ok(ResolveOutcome::AlreadyHandled("lock_contended"));
        };

        let (mut booking, mut payment) = self.phase1_read(parent_booking_id).await?;

        if payment.payment_status.is_terminal() {
            return Ok(ResolveOutcome::AlreadyHandled("already_settled"));
        }
        if payment.payment_status != PaymentStatus::Locked {
            return Ok(ResolveOutcome::AlreadyHandled("not_locked"));
        }

        let mut tx = self
            .env
            .repository
            .pool()
            .begin()
            .await
            .map_err(booking_postgres::PersistenceError::Database)?;
        let lock_record = self
            .env
            .repository
            .fetch_lock_record_for_update(&mut tx, parent_booking_id)
            .await?;
        tx.commit().await.map_err(booking_postgres::PersistenceError::Database)?;

        if lock_record.lock_resolved_at.is_some() {
            return Ok(ResolveOutcome::AlreadyHandled("already_resolved"));
        }

        let key = idempotency::locked_funds(reason.as_str(), parent_booking_id);
        let intent_id = payment
            .payment_intent_id
            .clone()
            .ok_or_else(|| BookingError::BusinessRule("locked booking has no payment intent".to_string()))?;

        let captured_amount_cents = match reason {
            LockReason::NewLessonCompleted | LockReason::StudentNoShow => {
                let transfer = self
                    .env
                    .psp
                    .capture_auth(&key, &intent_id, lock_record.locked_amount_cents)
                    .await?;
                transfer.amount_cents
            }
            LockReason::InstructorCancelled | LockReason::MutualNoShow => {
                self.env.psp.cancel_auth(&key, &intent_id).await?;
                0
            }
        };

        Settlement::apply(
            &mut booking,
            &mut payment,
            reason.settlement_outcome(),
            captured_amount_cents,
            instructor_payout_target_cents,
        );

        self.commit(&booking, &payment, reason).await?;
        self.mark_child_settled_if_open(child_booking_id, reason).await?;

        Ok(ResolveOutcome::Resolved(booking))
    }

    async fn mark_child_settled_if_open(&self, child_booking_id: Uuid, reason: LockReason) -> Result<()> {
        let (mut child_booking, mut child_payment) = self.phase1_read(child_booking_id).await?;
        if child_payment.payment_status.is_terminal() {
            return Ok(());
        }

        Settlement::apply(&mut child_booking, &mut child_payment, reason.settlement_outcome(), 0, 0);
        self.commit_child(&child_booking, &child_payment).await
    }

    async fn commit_child(&self, booking: &Booking, payment: &BookingPayment) -> Result<()> {
        let mut tx = self
            .env
            .repository
            .pool()
            .begin()
            .await
            .map_err(booking_postgres::PersistenceError::Database)?;

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
                "child_settled_on_parent_resolution",
                "n/a",
                serde_json::json!({}),
            )
            .await?;

        tx.commit().await.map_err(booking_postgres::PersistenceError::Database)?;
        Ok(())
    }

    async fn phase1_read(&self, booking_id: Uuid) -> Result<(Booking, BookingPayment)> {
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

    async fn commit(&self, booking: &Booking, payment: &BookingPayment, reason: LockReason) -> Result<()> {
        let mut tx = self
            .env
            .repository
            .pool()
            .begin()
            .await
            .map_err(booking_postgres::PersistenceError::Database)?;

        self.env.repository.update_booking(&mut tx, &booking_to_row(booking)).await?;
        self.env
            .repository
            .upsert_payment(&mut tx, &payment_to_row(payment))
            .await?;
        self.env
            .repository
            .resolve_lock_record(&mut tx, booking.id, reason.resolution().label())
            .await?;
        self.env
            .ledger
            .append(
                &mut tx,
                booking.id,
                "locked_funds_resolved",
                reason.as_str(),
                serde_json::json!({ "reason": reason.as_str() }),
            )
            .await?;
        self.env
            .outbox
            .publish(
                &mut tx,
                "locked_funds_resolved",
                booking.id,
                booking.student_id,
                booking.instructor_id,
                self.env.clock.now(),
                serde_json::json!({ "reason": reason.as_str() }),
            )
            .await?;

        tx.commit().await.map_err(booking_postgres::PersistenceError::Database)?;
        Ok(())
    }
}

impl LockResolution {
    fn label(self) -> &'static str {
        match self {
            Self::NewLessonCompleted => "new_lesson_completed",
            Self::InstructorCancelled => "instructor_cancelled",
            Self::StudentNoShow => "student_no_show",
            Self::MutualNoShow => "mutual_no_show",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_lesson_completed_settles_as_full_payout() {
        assert_eq!(
            LockReason::NewLessonCompleted.settlement_outcome(),
            SettlementOutcome::LessonCompletedFullPayout
        );
    }

    #[test]
    fn instructor_cancelled_settles_with_no_charge() {
        assert_eq!(
            LockReason::InstructorCancelled.settlement_outcome(),
            SettlementOutcome::InstructorCancel
        );
    }

    #[test]
    fn reason_labels_match_the_idempotency_key_vocabulary() {
        assert_eq!(LockReason::NewLessonCompleted.as_str(), "new_lesson_completed");
        assert_eq!(LockReason::MutualNoShow.as_str(), "mutual_no_show");
    }
}
