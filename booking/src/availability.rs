//! Per-day 48-bit availability bitmap validation, per §9's design note.
//!
//! Bit `i` covers the half-open 30-minute window
//! `[i * 30min, (i + 1) * 30min)` of an instructor's local day.

use chrono::{NaiveTime, Timelike};

/// Number of 30-minute slots in a day.
pub const SLOTS_PER_DAY: u32 = 48;

/// A single day's availability, packed as a 48-bit mask (stored as `u64`,
/// upper 16 bits unused).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayAvailability(u64);

impl DayAvailability {
    /// Wrap a raw bitmask. Bits above position 47 are ignored.
    #[must_use]
    pub const fn from_bits(bits: u64) -> Self {
        Self(bits & ((1u64 << SLOTS_PER_DAY) - 1))
    }

    /// An availability mask with every slot open.
    #[must_use]
    pub const fn fully_open() -> Self {
        Self((1u64 << SLOTS_PER_DAY) - 1)
    }

    /// An availability mask with every slot closed.
    #[must_use]
    pub const fn fully_closed() -> Self {
        Self(0)
    }

    /// Mark the half-open window `[start, end)` as available.
    #[must_use]
    pub fn with_window_open(mut self, start: NaiveTime, end: NaiveTime) -> Self {
        for slot in slot_range(start, end) {
            self.0 |= 1 << slot;
        }
        self
    }

    fn is_slot_open(self, slot: u32) -> bool {
        slot < SLOTS_PER_DAY && (self.0 & (1 << slot)) != 0
    }
}

fn slot_range(start: NaiveTime, end: NaiveTime) -> std::ops::Range<u32> {
    let start_slot = (start.num_seconds_from_midnight() / (30 * 60)).min(SLOTS_PER_DAY);
    let end_slot = if end == NaiveTime::from_hms_opt(0, 0, 0).unwrap_or(end) && start > end {
        SLOTS_PER_DAY
    } else {
        (end.num_seconds_from_midnight() / (30 * 60)).min(SLOTS_PER_DAY)
    };
    start_slot..end_slot.max(start_slot)
}

/// Validates that a requested booking window lies entirely within the
/// instructor's available slots for that day.
pub struct AvailabilityValidator;

impl AvailabilityValidator {
    /// Returns `true` iff every 30-minute slot touched by `[start, end)` is open.
    #[must_use]
    pub fn is_window_available(day: DayAvailability, start: NaiveTime, end: NaiveTime) -> bool {
        let range = slot_range(start, end);
        if range.is_empty() {
            return false;
        }
        range.into_iter().all(|slot| day.is_slot_open(slot))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn fully_open_day_accepts_any_window() {
        let day = DayAvailability::fully_open();
        assert!(AvailabilityValidator::is_window_available(
            day,
            time(9, 0),
            time(17, 0)
        ));
    }

    #[test]
    fn fully_closed_day_rejects_any_window() {
        let day = DayAvailability::fully_closed();
        assert!(!AvailabilityValidator::is_window_available(
            day,
            time(9, 0),
            time(10, 0)
        ));
    }

    #[test]
    fn partially_open_day_rejects_a_window_spanning_a_closed_slot() {
        let day = DayAvailability::fully_closed().with_window_open(time(9, 0), time(12, 0));
        assert!(AvailabilityValidator::is_window_available(
            day,
            time(9, 0),
            time(10, 0)
        ));
        assert!(!AvailabilityValidator::is_window_available(
            day,
            time(11, 30),
            time(12, 30)
        ));
    }

    #[test]
    fn window_must_align_within_open_slots_exactly() {
        let day = DayAvailability::fully_closed().with_window_open(time(9, 0), time(10, 0));
        assert!(AvailabilityValidator::is_window_available(
            day,
            time(9, 0),
            time(10, 0)
        ));
        assert!(!AvailabilityValidator::is_window_available(
            day,
            time(9, 30),
            time(10, 30)
        ));
    }
}
