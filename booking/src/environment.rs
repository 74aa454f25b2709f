//! Dependency-injection environment wiring the booking engine's
//! collaborators together for `BookingService` and `PaymentWorkerSet`.

use crate::clock_service::ClockService;
use crate::notifier::{NoopNotifier, Notifier};
use crate::psp::PspAdapter;
use booking_postgres::{AuditLog, BookingLock, BookingRepository, EventLedger, OutboxPublisher};
use std::sync::Arc;

/// Everything a `BookingService`/`PaymentWorkerSet` method needs, bundled so
/// call sites take one argument instead of seven.
///
/// # Type Parameters
///
/// - `P`: PSP adapter implementation (swappable for tests via a fake).
#[derive(Clone)]
pub struct BookingEnvironment<P>
where
    P: PspAdapter + Clone,
{
    /// Row-locked reads/writes against bookings, payments, transfers.
    pub repository: BookingRepository,
    /// Per-booking advisory mutex.
    pub lock: BookingLock,
    /// Append-only payment event log.
    pub ledger: EventLedger,
    /// Transactional outbox writer.
    pub outbox: OutboxPublisher,
    /// Actor/action audit trail.
    pub audit: AuditLog,
    /// Payment service provider.
    pub psp: P,
    /// Time source, DST-aware window conversion.
    pub clock: ClockService,
    /// Outbound email/push notification seam.
    pub notifier: Arc<dyn Notifier>,
}

impl<P> BookingEnvironment<P>
where
    P: PspAdapter + Clone,
{
    /// Assemble an environment from its collaborators.
    #[must_use]
    pub fn new(
        repository: BookingRepository,
        lock: BookingLock,
        ledger: EventLedger,
        outbox: OutboxPublisher,
        audit: AuditLog,
        psp: P,
        clock: ClockService,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            repository,
            lock,
            ledger,
            outbox,
            audit,
            psp,
            clock,
            notifier,
        }
    }

    /// Build all Postgres-backed collaborators from one pool, leaving only
    /// the PSP adapter, clock, and notifier to be supplied by the caller.
    /// Defaults the notifier to [`NoopNotifier`] when the caller has none.
    #[must_use]
    pub fn from_pool(pool: sqlx::PgPool, psp: P, clock: Arc<dyn booking_core::clock::Clock>) -> Self {
        Self::from_pool_with_notifier(pool, psp, clock, Arc::new(NoopNotifier))
    }

    /// As [`Self::from_pool`], with an explicit notifier.
    #[must_use]
    pub fn from_pool_with_notifier(
        pool: sqlx::PgPool,
        psp: P,
        clock: Arc<dyn booking_core::clock::Clock>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            repository: BookingRepository::new(pool.clone()),
            lock: BookingLock::new(pool.clone()),
            ledger: EventLedger::new(pool.clone()),
            outbox: OutboxPublisher::new(pool.clone()),
            audit: AuditLog::new(pool),
            psp,
            clock: ClockService::new(clock),
            notifier,
        }
    }
}
