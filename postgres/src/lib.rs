//! `PostgreSQL`-backed persistence for the booking payment lifecycle engine.
//!
//! Five small modules, each owning one table family:
//!
//! - [`repository`]: the `Booking` aggregate (booking, payment, transfer,
//!   no-show report, lock record), including the `SELECT ... FOR UPDATE`
//!   reads the three-phase pattern's Phase 1/Phase 3 require.
//! - [`booking_lock`]: the distributed advisory mutex spanning all three
//!   phases of a single booking's processing.
//! - [`event_ledger`]: the append-only, idempotent `PaymentEvent` log.
//! - [`outbox`]: the transactional outbox and its polling dispatcher.
//! - [`audit_log`]: actor-attributed audit entries.
//!
//! None of these modules hold a transaction open across a PSP call; callers
//! are responsible for scoping each `sqlx::PgTransaction` to a single phase.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod audit_log;
pub mod booking_lock;
pub mod error;
pub mod event_ledger;
pub mod outbox;
pub mod repository;

pub use audit_log::AuditLog;
pub use booking_lock::{BookingLock, BookingLockGuard};
pub use error::{PersistenceError, Result};
pub use event_ledger::EventLedger;
pub use outbox::{OutboxDispatcher, OutboxPublisher};
pub use repository::BookingRepository;
