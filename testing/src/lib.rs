//! # Booking Testing
//!
//! Deterministic test doubles shared across the booking payment lifecycle
//! engine's crates: a fixed [`clock::FixedClock`] so scenario tests can
//! assert on exact retry/warning windows (e.g. "fires at T+1h, not T+59m"),
//! and a handful of builders for constructing advanceable clocks mid-test.
//!
//! ```
//! use booking_testing::clock::test_clock;
//! use booking_core::clock::Clock;
//!
//! let clock = test_clock();
//! assert_eq!(clock.now(), clock.now());
//! ```

pub mod clock {
    use booking_core::clock::Clock;
    use chrono::{DateTime, Utc};
    use std::sync::Mutex;

    /// A clock that always returns the same instant, optionally advanceable.
    ///
    /// Unlike a plain `const` fixed time, `advance` lets a single scenario
    /// test move the clock forward between phases (e.g. simulate "12 hours
    /// before the lesson" becoming "11 hours before the lesson") without
    /// constructing a new environment.
    #[derive(Debug)]
    pub struct FixedClock {
        time: Mutex<DateTime<Utc>>,
    }

    impl FixedClock {
        /// Create a fixed clock starting at `time`.
        #[must_use]
        pub fn new(time: DateTime<Utc>) -> Self {
            Self {
                time: Mutex::new(time),
            }
        }

        /// Move the clock forward by `duration`.
        ///
        /// # Panics
        ///
        /// Panics if the internal mutex is poisoned, which only happens if
        /// another thread panicked while holding it.
        pub fn advance(&self, duration: chrono::Duration) {
            let mut guard = self.time.lock().expect("clock mutex poisoned");
            *guard += duration;
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            *self.time.lock().expect("clock mutex poisoned")
        }
    }

    /// A fixed clock anchored to a fixed, arbitrary reference instant
    /// (2025-06-02T12:00:00Z, a Monday) used as the default "now" across
    /// scenario tests unless a test needs a specific lesson time.
    ///
    /// # Panics
    ///
    /// Panics if the hardcoded timestamp fails to parse, which would
    /// indicate a typo caught immediately by any test that calls this.
    #[must_use]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-06-02T12:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }
}

pub use clock::{FixedClock, test_clock};

#[cfg(test)]
mod tests {
    use super::*;
    use booking_core::clock::Clock;

    #[test]
    fn fixed_clock_is_stable_across_reads() {
        let clock = test_clock();
        assert_eq!(clock.now(), clock.now());
    }

    #[test]
    fn fixed_clock_advances_on_demand() {
        let clock = test_clock();
        let before = clock.now();
        clock.advance(chrono::Duration::hours(1));
        assert_eq!(clock.now(), before + chrono::Duration::hours(1));
    }
}
