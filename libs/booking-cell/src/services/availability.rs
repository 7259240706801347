// libs/booking-cell/src/services/availability.rs
use std::collections::BTreeSet;

use chrono::{NaiveDate, NaiveDateTime};
use tracing::debug;

use crate::models::{BookedSlot, BookingError, CallDuration};
use crate::services::slots;

/// Blocked-slot state for one selected day.
///
/// The state has exactly two writers: an authoritative fetch, which replaces
/// the blocked set wholesale, and optimistic reservations, which are additive
/// and never speculatively removed. Fetch responses carry the date they were
/// requested for; a response for a day that is no longer selected is rejected
/// so a rapid date change can never display the wrong day's blockage.
#[derive(Debug, Clone)]
pub struct DayAvailability {
    date: NaiveDate,
    blocked: BTreeSet<&'static str>,
}

impl DayAvailability {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            blocked: BTreeSet::new(),
        }
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn blocked(&self) -> &BTreeSet<&'static str> {
        &self.blocked
    }

    /// Switch the selected day. State from the previous day is dropped;
    /// any fetch still in flight for it becomes stale.
    pub fn select(&mut self, date: NaiveDate) {
        if date != self.date {
            debug!("Switching selected day from {} to {}", self.date, date);
            self.date = date;
            self.blocked.clear();
        }
    }

    /// Apply an authoritative fetch result, replacing the blocked set
    /// wholesale. A result tagged with another date is stale and leaves the
    /// state untouched; callers drop the error silently.
    pub fn apply_fetch(
        &mut self,
        date: NaiveDate,
        rows: &[BookedSlot],
        now: NaiveDateTime,
    ) -> Result<(), BookingError> {
        if date != self.date {
            debug!("Discarding stale availability response for {}", date);
            return Err(BookingError::StaleFetch {
                selected: self.date,
                got: date,
            });
        }

        self.blocked = slots::blocked_slots(date, rows, now);
        Ok(())
    }

    /// Optimistically reserve a booked range ahead of the next authoritative
    /// fetch. Union semantics: applying the same reservation twice is a
    /// no-op.
    pub fn reserve(&mut self, start_slot: &str, duration: CallDuration) {
        self.blocked.extend(slots::expand_booking(start_slot, duration));
    }

    /// Merge slots already reserved elsewhere (other sessions in this
    /// process) into the blocked set.
    pub fn merge_reserved<I>(&mut self, reserved: I)
    where
        I: IntoIterator<Item = &'static str>,
    {
        self.blocked.extend(reserved);
    }

    pub fn is_available(&self, slot: &str, duration: CallDuration) -> bool {
        slots::is_slot_available(slot, duration, &self.blocked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 9, d).unwrap()
    }

    fn noon_elsewhere() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2020, 1, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    fn booked(time_slot: &str, minutes: u32) -> BookedSlot {
        BookedSlot {
            time_slot: time_slot.to_string(),
            duration: CallDuration::try_from(minutes).unwrap(),
        }
    }

    #[test]
    fn test_fetch_replaces_blocked_wholesale() {
        let mut state = DayAvailability::new(day(7));
        state.reserve("16:00", CallDuration::Project);

        state
            .apply_fetch(day(7), &[booked("09:00", 30)], noon_elsewhere())
            .unwrap();

        // The optimistic 16:00 reservation is gone; the fetch is the truth now
        assert!(state.is_available("16:00", CallDuration::Project));
        assert!(!state.is_available("09:00", CallDuration::Project));
    }

    #[test]
    fn test_stale_fetch_is_rejected_and_leaves_state_untouched() {
        let mut state = DayAvailability::new(day(7));
        state
            .apply_fetch(day(7), &[booked("09:00", 30)], noon_elsewhere())
            .unwrap();

        state.select(day(8));
        let result = state.apply_fetch(day(7), &[booked("14:00", 60)], noon_elsewhere());

        assert_matches!(result, Err(BookingError::StaleFetch { .. }));
        assert!(state.blocked().is_empty());
        assert_eq!(state.date(), day(8));
    }

    #[test]
    fn test_selecting_same_day_keeps_state() {
        let mut state = DayAvailability::new(day(7));
        state.reserve("09:00", CallDuration::Project);

        state.select(day(7));

        assert!(!state.is_available("09:00", CallDuration::Project));
    }

    #[test]
    fn test_reserve_is_idempotent() {
        let mut state = DayAvailability::new(day(7));

        state.reserve("14:00", CallDuration::Consultation);
        let after_first = state.blocked().clone();
        state.reserve("14:00", CallDuration::Consultation);

        assert_eq!(state.blocked(), &after_first);
        assert_eq!(after_first.len(), 2);
    }

    #[test]
    fn test_reserve_is_additive_over_fetch() {
        let mut state = DayAvailability::new(day(7));
        state
            .apply_fetch(day(7), &[booked("09:00", 30)], noon_elsewhere())
            .unwrap();

        state.reserve("10:00", CallDuration::Consultation);

        assert!(!state.is_available("09:00", CallDuration::Project));
        assert!(!state.is_available("10:00", CallDuration::Project));
        assert!(!state.is_available("10:30", CallDuration::Project));
        assert!(state.is_available("11:00", CallDuration::Project));
    }

    #[test]
    fn test_confirming_fetch_covers_the_optimistic_update() {
        // Once the submission is persisted, a fresh fetch for the same day
        // must block at least everything the optimistic update blocked
        let mut state = DayAvailability::new(day(7));
        state.reserve("14:00", CallDuration::Consultation);
        let optimistic = state.blocked().clone();

        state
            .apply_fetch(day(7), &[booked("14:00", 60)], noon_elsewhere())
            .unwrap();

        assert!(state.blocked().is_superset(&optimistic));
    }

    #[test]
    fn test_duration_change_invalidates_previous_selection() {
        // A neighbour booked 14:30; 14:00 was fine for 30 min but the user
        // then switches to one hour
        let mut state = DayAvailability::new(day(7));
        state
            .apply_fetch(day(7), &[booked("14:30", 30)], noon_elsewhere())
            .unwrap();

        assert!(state.is_available("14:00", CallDuration::Project));
        assert!(!state.is_available("14:00", CallDuration::Consultation));
    }
}
