//! Property test cross-checking the 48-bit availability bitmap against a
//! naive per-slot oracle over random masks and random windows.

use booking::availability::{AvailabilityValidator, DayAvailability, SLOTS_PER_DAY};
use chrono::NaiveTime;
use proptest::prelude::*;

fn slot_time(slot: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(0, 0, 0).unwrap() + chrono::Duration::minutes(i64::from(slot) * 30)
}

/// Independent, deliberately naive re-implementation: walk every slot the
/// window touches and check each bit directly against the raw mask.
fn naive_is_available(bits: u64, start_slot: u32, end_slot: u32) -> bool {
    if start_slot >= end_slot {
        return false;
    }
    (start_slot..end_slot).all(|slot| slot < SLOTS_PER_DAY && (bits & (1 << slot)) != 0)
}

proptest! {
    #[test]
    fn window_check_matches_naive_oracle(
        bits in 0u64..(1u64 << SLOTS_PER_DAY),
        start_slot in 0u32..SLOTS_PER_DAY,
        span in 0u32..SLOTS_PER_DAY,
    ) {
        let end_slot = (start_slot + span).min(SLOTS_PER_DAY);
        let day = DayAvailability::from_bits(bits);
        let actual = AvailabilityValidator::is_window_available(day, slot_time(start_slot), slot_time(end_slot));
        let expected = naive_is_available(bits, start_slot, end_slot);
        prop_assert_eq!(actual, expected);
    }

    #[test]
    fn fully_open_day_accepts_every_nonempty_window(
        start_slot in 0u32..SLOTS_PER_DAY,
        span in 1u32..SLOTS_PER_DAY,
    ) {
        let end_slot = (start_slot + span).min(SLOTS_PER_DAY);
        prop_assume!(start_slot < end_slot);
        let day = DayAvailability::fully_open();
        prop_assert!(AvailabilityValidator::is_window_available(day, slot_time(start_slot), slot_time(end_slot)));
    }

    #[test]
    fn fully_closed_day_rejects_every_window(
        start_slot in 0u32..SLOTS_PER_DAY,
        span in 1u32..SLOTS_PER_DAY,
    ) {
        let end_slot = (start_slot + span).min(SLOTS_PER_DAY);
        prop_assume!(start_slot < end_slot);
        let day = DayAvailability::fully_closed();
        prop_assert!(!AvailabilityValidator::is_window_available(day, slot_time(start_slot), slot_time(end_slot)));
    }

    #[test]
    fn with_window_open_round_trips_through_is_window_available(
        start_slot in 0u32..SLOTS_PER_DAY,
        span in 1u32..SLOTS_PER_DAY,
    ) {
        let end_slot = (start_slot + span).min(SLOTS_PER_DAY);
        prop_assume!(start_slot < end_slot);
        let day = DayAvailability::fully_closed().with_window_open(slot_time(start_slot), slot_time(end_slot));
        prop_assert!(AvailabilityValidator::is_window_available(day, slot_time(start_slot), slot_time(end_slot)));
    }
}
