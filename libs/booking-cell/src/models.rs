// libs/booking-cell/src/models.rs
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

// ==============================================================================
// SLOT CATALOG
// ==============================================================================

/// Bookable time-of-day slots at 30-minute granularity, 9h-18h with the
/// lunch break represented by omission. Strictly increasing, process-wide
/// constant.
pub const TIME_SLOTS: [&str; 14] = [
    "09:00", "09:30", "10:00", "10:30", "11:00", "11:30",
    "14:00", "14:30", "15:00", "15:30", "16:00", "16:30", "17:00", "17:30",
];

pub const SLOT_INTERVAL_MINUTES: u32 = 30;

/// Calls can be booked at most this many days in advance.
pub const BOOKING_HORIZON_DAYS: i64 = 60;

/// Offered call lengths. Serialized as integer minutes on the wire, matching
/// the `duration` column of the bookings table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum CallDuration {
    /// 15 minutes - quick discovery call
    Discovery,
    /// 30 minutes - project discussion
    Project,
    /// 60 minutes - full consultation
    Consultation,
}

impl CallDuration {
    pub fn minutes(self) -> u32 {
        match self {
            CallDuration::Discovery => 15,
            CallDuration::Project => 30,
            CallDuration::Consultation => 60,
        }
    }

    /// Number of contiguous catalog slots this duration occupies.
    pub fn slots_needed(self) -> usize {
        self.minutes().div_ceil(SLOT_INTERVAL_MINUTES) as usize
    }
}

impl TryFrom<u32> for CallDuration {
    type Error = String;

    fn try_from(minutes: u32) -> Result<Self, Self::Error> {
        match minutes {
            15 => Ok(CallDuration::Discovery),
            30 => Ok(CallDuration::Project),
            60 => Ok(CallDuration::Consultation),
            other => Err(format!("Unsupported call duration: {} minutes", other)),
        }
    }
}

impl From<CallDuration> for u32 {
    fn from(duration: CallDuration) -> u32 {
        duration.minutes()
    }
}

impl fmt::Display for CallDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} min", self.minutes())
    }
}

// ==============================================================================
// CORE BOOKING MODELS
// ==============================================================================

/// Non-personal projection of a booking, as returned by the
/// `get_booked_slots` RPC. Contact fields never reach this type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookedSlot {
    pub time_slot: String,
    pub duration: CallDuration,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallBooking {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub booking_date: NaiveDate,
    pub time_slot: String,
    pub duration: CallDuration,
    pub notes: Option<String>,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BookingStatus::Pending => write!(f, "pending"),
            BookingStatus::Confirmed => write!(f, "confirmed"),
            BookingStatus::Completed => write!(f, "completed"),
            BookingStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookCallRequest {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub booking_date: NaiveDate,
    pub time_slot: String,
    pub duration: CallDuration,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookingSearchQuery {
    pub date: Option<NaiveDate>,
    pub status: Option<BookingStatus>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateBookingStatusRequest {
    pub status: BookingStatus,
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Error, Debug)]
pub enum BookingError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Invalid email address")]
    InvalidEmail,

    #[error("Unknown time slot: {0}")]
    UnknownSlot(String),

    #[error("Slot no longer available")]
    SlotUnavailable,

    #[error("Booking date is in the past")]
    PastDate,

    #[error("Calls are only taken Monday to Friday")]
    WeekendDate,

    #[error("Booking date is more than {0} days ahead")]
    HorizonExceeded(i64),

    #[error("Availability response for {got} arrived after {selected} was selected")]
    StaleFetch { selected: NaiveDate, got: NaiveDate },

    #[error("Invalid status transition from {from} to {to}")]
    InvalidStatusTransition {
        from: BookingStatus,
        to: BookingStatus,
    },

    #[error("Booking not found: {0}")]
    NotFound(Uuid),

    #[error("Database error: {0}")]
    DatabaseError(String),
}
