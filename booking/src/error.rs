//! Error taxonomy for the booking payment lifecycle engine.

use thiserror::Error;

/// Result type alias for booking operations.
pub type Result<T> = std::result::Result<T, BookingError>;

/// The scope a booking-conflict error applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictScope {
    /// The new booking overlaps another booking of the same instructor.
    Instructor,
    /// The new booking overlaps another booking of the same student.
    Student,
}

impl std::fmt::Display for ConflictScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Instructor => write!(f, "instructor"),
            Self::Student => write!(f, "student"),
        }
    }
}

/// Classification of a PSP-level failure, surfaced from [`crate::psp::PspAdapter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PspErrorClass {
    /// The card was declined by the issuer.
    CardDeclined,
    /// The capture was already performed under this idempotency key.
    AlreadyCaptured,
    /// The authorization is no longer capturable (expired hold).
    AuthExpired,
    /// The PSP rejected the call because of the intent's current state.
    InvalidState,
    /// Network/5xx/timeout — worth retrying.
    SystemError,
}

impl std::fmt::Display for PspErrorClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::CardDeclined => "card_declined",
            Self::AlreadyCaptured => "already_captured",
            Self::AuthExpired => "auth_expired",
            Self::InvalidState => "invalid_state",
            Self::SystemError => "system_error",
        };
        write!(f, "{label}")
    }
}

/// The engine's error taxonomy, transport-agnostic per spec §7.
#[derive(Debug, Error)]
pub enum BookingError {
    /// Referenced booking/user/service does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Input malformed or violates a stateless rule.
    #[error("validation failed: {0}")]
    ValidationFailed(String),

    /// Violates a stateful policy (advance hours, ineligible payment status, ...).
    #[error("business rule violated: {0}")]
    BusinessRule(String),

    /// Time overlap with another active booking.
    #[error("booking conflict ({scope})")]
    BookingConflict {
        /// Whose schedule the conflict is against.
        scope: ConflictScope,
    },

    /// Actor not permitted for the requested action.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Phase 3's re-read found the row had changed since Phase 1.
    #[error("concurrency lost for {0}")]
    ConcurrencyLost(String),

    /// A classified PSP outcome. Never surfaced past `BookingService`/workers
    /// to the excluded HTTP layer; absorbed into state transitions instead.
    #[error("psp error: {class}: {message}")]
    Psp {
        /// Classified outcome.
        class: PspErrorClass,
        /// Raw PSP message, for logs only.
        message: String,
    },

    /// Database deadlock; caller may retry the whole three-phase sequence.
    #[error("deadlock, retryable: {0}")]
    DeadlockRetryable(String),

    /// Persistence-layer failure.
    #[error(transparent)]
    Persistence(#[from] booking_postgres::PersistenceError),
}

impl BookingError {
    /// Returns `true` if this error should be shown to the end user as-is
    /// rather than logged and converted to a generic failure.
    #[must_use]
    pub const fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::ValidationFailed(_) | Self::BusinessRule(_) | Self::BookingConflict { .. }
        )
    }

    /// Returns `true` if retrying the whole three-phase operation might succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::ConcurrencyLost(_) | Self::DeadlockRetryable(_))
    }
}
