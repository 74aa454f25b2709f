//! DST-safe local↔UTC conversion and "time until" arithmetic.
//!
//! Wraps [`booking_core::clock::Clock`] so the rest of the engine asks for
//! `now()`/`hours_until(t)` instead of reaching for `Utc::now()` directly,
//! keeping scenario tests deterministic via `booking-testing::FixedClock`.

use crate::error::{BookingError, Result};
use booking_core::clock::Clock;
use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use std::sync::Arc;

/// Wraps a [`Clock`] with the lesson-window conversion logic spec'd in §9.
#[derive(Clone)]
pub struct ClockService {
    clock: Arc<dyn Clock>,
}

impl ClockService {
    /// Wrap a clock implementation.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    /// Current instant.
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Hours from now until `t`. Negative if `t` is in the past.
    #[must_use]
    pub fn hours_until(&self, t: DateTime<Utc>) -> f64 {
        (t - self.now()).num_seconds() as f64 / 3600.0
    }

    /// Convert a local lesson date/time window, expressed in `timezone`, to
    /// UTC bounds.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::ValidationFailed`] if `timezone` is not a
    /// recognized IANA name, or if the local time falls in a DST gap with no
    /// corresponding UTC instant.
    pub fn local_window_to_utc(
        &self,
        date: NaiveDate,
        start_time: NaiveTime,
        end_time: NaiveTime,
        timezone: &str,
    ) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
        let tz: Tz = timezone
            .parse()
            .map_err(|_| BookingError::ValidationFailed(format!("unknown timezone {timezone}")))?;

        let start_local = date.and_time(start_time);
        let end_local = date.and_time(end_time);

        let start_utc = resolve_local(&tz, start_local)?;
        let end_utc = resolve_local(&tz, end_local)?;

        if end_utc <= start_utc {
            return Err(BookingError::ValidationFailed(
                "lesson end must be after start".to_string(),
            ));
        }

        Ok((start_utc, end_utc))
    }
}

fn resolve_local(tz: &Tz, naive: chrono::NaiveDateTime) -> Result<DateTime<Utc>> {
    match tz.from_local_datetime(&naive) {
        chrono::LocalResult::Single(dt) => Ok(dt.with_timezone(&Utc)),
        // During a "spring forward" DST gap, fall forward to the first valid instant.
        chrono::LocalResult::None => {
            tracing::warn!(%naive, timezone = %tz, "local time falls in a DST gap, rounding forward");
            let mut candidate = naive;
            for _ in 0..4 {
                candidate += chrono::Duration::minutes(30);
                if let chrono::LocalResult::Single(dt) = tz.from_local_datetime(&candidate) {
                    return Ok(dt.with_timezone(&Utc));
                }
            }
            Err(BookingError::ValidationFailed(
                "could not resolve local time across DST gap".to_string(),
            ))
        }
        // During a "fall back" DST overlap, prefer the earlier (first) occurrence.
        chrono::LocalResult::Ambiguous(earlier, _later) => Ok(earlier.with_timezone(&Utc)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use booking_testing::test_clock;

    #[test]
    fn converts_a_simple_local_window_to_utc() {
        let service = ClockService::new(Arc::new(test_clock()));
        let date = NaiveDate::from_ymd_opt(2026, 3, 15).unwrap();
        let start = NaiveTime::from_hms_opt(10, 0, 0).unwrap();
        let end = NaiveTime::from_hms_opt(11, 0, 0).unwrap();

        let (start_utc, end_utc) = service
            .local_window_to_utc(date, start, end, "America/New_York")
            .unwrap();

        assert_eq!((end_utc - start_utc).num_minutes(), 60);
    }

    #[test]
    fn rejects_unknown_timezone() {
        let service = ClockService::new(Arc::new(test_clock()));
        let date = NaiveDate::from_ymd_opt(2026, 3, 15).unwrap();
        let start = NaiveTime::from_hms_opt(10, 0, 0).unwrap();
        let end = NaiveTime::from_hms_opt(11, 0, 0).unwrap();

        let result = service.local_window_to_utc(date, start, end, "Not/A_Zone");
        assert!(result.is_err());
    }

    #[test]
    fn hours_until_is_negative_for_past_instants() {
        let clock = test_clock();
        let now = clock.now();
        let service = ClockService::new(Arc::new(clock));

        assert!(service.hours_until(now - chrono::Duration::hours(2)) < 0.0);
        assert!((service.hours_until(now + chrono::Duration::hours(24)) - 24.0).abs() < 0.01);
    }
}
