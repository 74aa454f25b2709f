//! # Booking
//!
//! The booking payment lifecycle engine: pure state-machine guards for
//! booking/payment status, the three-phase PSP orchestration that drives
//! those machines forward, and the scheduled workers that sweep for
//! candidates outside any user-facing request.
//!
//! Persistence lives in `booking-postgres`; this crate owns the domain
//! model, pricing, availability, the PSP adapter seam, and everything that
//! decides *what* should happen to a booking, never *how* a row gets locked.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod availability;
pub mod clock_service;
pub mod config;
pub mod credit;
pub mod environment;
pub mod error;
pub mod idempotency;
pub mod locked_funds;
mod mapping;
pub mod model;
pub mod notifier;
pub mod pricing;
pub mod psp;
pub mod service;
pub mod settlement;
pub mod state_machine;
pub mod workers;

pub use environment::BookingEnvironment;
pub use error::{BookingError, PspErrorClass, Result};
pub use locked_funds::{LockReason, LockedFundsResolver, ResolveOutcome};
pub use notifier::{NoopNotifier, Notifier};
pub use service::{BookingDraft, BookingService, InstructorConstraints, PlatformPricing};
pub use workers::{AuthorizationHealth, PaymentWorkerSet, RunSummary};
