//! # Booking Runtime
//!
//! Resilience primitives shared by the booking payment lifecycle engine's
//! `PSPAdapter` and `PaymentWorkerSet`:
//!
//! - [`retry`]: exponential backoff for transient PSP failures.
//! - [`circuit_breaker`]: trips when the PSP is unhealthy so workers fail
//!   fast instead of piling up retries against a down dependency.
//! - [`metrics`]: Prometheus counters/histograms for authorizations,
//!   captures, refunds, and worker job runs.
//!
//! This crate deliberately does not provide a generic dispatch loop or
//! event-store runtime: the booking engine's three-phase execution pattern
//! (short DB transaction, external PSP call, short DB transaction) is
//! orchestrated directly by `BookingService` and `PaymentWorkerSet` in the
//! `booking` crate, not by a feedback-driven reducer loop.

pub mod circuit_breaker;
pub mod metrics;
pub mod retry;
