// libs/booking-cell/src/services/slots.rs
//
// Pure availability arithmetic over the slot catalog. Everything here is
// deterministic: callers pass the wall-clock time in.
use std::collections::BTreeSet;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use crate::models::{BookedSlot, CallDuration, TIME_SLOTS};

/// Position of a slot in the catalog, if it is a catalog slot at all.
pub fn slot_index(slot: &str) -> Option<usize> {
    TIME_SLOTS.iter().position(|s| *s == slot)
}

/// Time-of-day of a catalog slot.
pub fn slot_time(slot: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(slot, "%H:%M").ok()
}

/// Expand a booking into the catalog slots it occupies: `slots_needed`
/// contiguous entries starting at `start_slot`. An expansion that would run
/// past the end of the catalog is truncated silently; a start slot that is
/// not in the catalog expands to nothing.
pub fn expand_booking(start_slot: &str, duration: CallDuration) -> Vec<&'static str> {
    let Some(start) = slot_index(start_slot) else {
        return Vec::new();
    };

    TIME_SLOTS
        .iter()
        .skip(start)
        .take(duration.slots_needed())
        .copied()
        .collect()
}

/// Blocked slots for a date: the union of every booking's expansion, plus -
/// when the date is today - every slot at or before the current time.
///
/// The result is advisory for rendering; the authoritative double-booking
/// check lives in the persistence layer.
pub fn blocked_slots(
    date: NaiveDate,
    bookings: &[BookedSlot],
    now: NaiveDateTime,
) -> BTreeSet<&'static str> {
    let mut blocked = BTreeSet::new();

    for booking in bookings {
        blocked.extend(expand_booking(&booking.time_slot, booking.duration));
    }

    if date == now.date() {
        for slot in TIME_SLOTS {
            match slot_time(slot) {
                Some(time) if time <= now.time() => {
                    blocked.insert(slot);
                }
                _ => {}
            }
        }
    }

    blocked
}

/// A slot can host a call of the given duration iff the whole contiguous
/// range exists within the catalog and none of its entries is blocked.
///
/// Must be re-evaluated whenever the duration changes, not only when the
/// slot is picked: a slot that fits 30 minutes may not fit 60.
pub fn is_slot_available(
    slot: &str,
    duration: CallDuration,
    blocked: &BTreeSet<&'static str>,
) -> bool {
    let Some(start) = slot_index(slot) else {
        return false;
    };

    let needed = duration.slots_needed();
    if start + needed > TIME_SLOTS.len() {
        return false;
    }

    TIME_SLOTS[start..start + needed]
        .iter()
        .all(|s| !blocked.contains(s))
}
