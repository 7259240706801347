// libs/booking-cell/src/services/booking.rs
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex};

use chrono::{Datelike, Duration as ChronoDuration, Local, NaiveDate, Weekday};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{
    BookCallRequest, BookedSlot, BookingError, BookingSearchQuery, BookingStatus, CallBooking,
    BOOKING_HORIZON_DAYS,
};
use crate::services::availability::DayAvailability;
use crate::services::slots;

pub struct CallBookingService {
    supabase: Arc<SupabaseClient>,
    /// Slots reserved by submissions this process accepted but that a caller
    /// may not have refetched yet. Additive overlay per date; an
    /// authoritative fetch for a date replaces it wholesale.
    optimistic: Mutex<HashMap<NaiveDate, BTreeSet<&'static str>>>,
}

impl CallBookingService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: Arc::new(SupabaseClient::new(config)),
            optimistic: Mutex::new(HashMap::new()),
        }
    }

    /// Blocked slots for a date, for rendering the slot picker.
    ///
    /// Uses the privacy-preserving RPC that only exposes `{time_slot,
    /// duration}` pairs of non-cancelled bookings; contact data never
    /// reaches unauthenticated callers. The result is advisory - the
    /// persistence layer remains the double-booking authority.
    pub async fn blocked_slots_for_date(
        &self,
        date: NaiveDate,
    ) -> Result<BTreeSet<&'static str>, BookingError> {
        let rows = self.fetch_booked_slots(date).await?;

        let mut day = DayAvailability::new(date);
        day.apply_fetch(date, &rows, Local::now().naive_local())?;

        // The fetch is authoritative: it supersedes the optimistic overlay
        // for this date.
        self.optimistic.lock().unwrap().remove(&date);

        debug!("{} blocked slots on {}", day.blocked().len(), date);
        Ok(day.blocked().clone())
    }

    /// Gate a submission and persist it.
    ///
    /// Validation and the availability check are defense-in-depth: two
    /// clients can still race for the same slot, and the persistence layer
    /// has the final word. On success the booked range is reserved in the
    /// local overlay so availability answers reflect it before the next
    /// authoritative fetch.
    pub async fn book_call(&self, request: BookCallRequest) -> Result<CallBooking, BookingError> {
        let now = Local::now().naive_local();
        validate_booking_request(&request, now.date())?;

        let rows = self.fetch_booked_slots(request.booking_date).await?;

        let mut day = DayAvailability::new(request.booking_date);
        day.apply_fetch(request.booking_date, &rows, now)?;
        if let Some(reserved) = self.optimistic.lock().unwrap().get(&request.booking_date) {
            day.merge_reserved(reserved.iter().copied());
        }

        if !day.is_available(&request.time_slot, request.duration) {
            warn!(
                "Rejecting booking for {} at {}: slot no longer available",
                request.booking_date, request.time_slot
            );
            return Err(BookingError::SlotUnavailable);
        }

        let booking = self.insert_booking(&request).await?;

        // Reserve optimistically only after the insert landed, so a network
        // failure leaves local state untouched.
        self.optimistic
            .lock()
            .unwrap()
            .entry(request.booking_date)
            .or_default()
            .extend(slots::expand_booking(&request.time_slot, request.duration));

        info!(
            "Call booked: {} on {} at {} ({})",
            booking.id, booking.booking_date, booking.time_slot, booking.duration
        );
        Ok(booking)
    }

    /// Admin listing with optional date and status filters.
    pub async fn list_bookings(
        &self,
        query: &BookingSearchQuery,
        auth_token: &str,
    ) -> Result<Vec<CallBooking>, BookingError> {
        let mut query_parts = Vec::new();

        if let Some(date) = query.date {
            query_parts.push(format!("booking_date=eq.{}", date));
        }
        if let Some(status) = query.status {
            query_parts.push(format!("status=eq.{}", status));
        }
        query_parts.push("order=booking_date.desc,time_slot.asc".to_string());

        let path = format!("/rest/v1/call_bookings?{}", query_parts.join("&"));

        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| BookingError::DatabaseError(e.to_string()))?;

        result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<CallBooking>, _>>()
            .map_err(|e| BookingError::DatabaseError(format!("Failed to parse bookings: {}", e)))
    }

    pub async fn get_booking(
        &self,
        booking_id: Uuid,
        auth_token: &str,
    ) -> Result<CallBooking, BookingError> {
        let path = format!("/rest/v1/call_bookings?id=eq.{}", booking_id);

        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| BookingError::DatabaseError(e.to_string()))?;

        let row = result
            .into_iter()
            .next()
            .ok_or(BookingError::NotFound(booking_id))?;

        serde_json::from_value(row)
            .map_err(|e| BookingError::DatabaseError(format!("Failed to parse booking: {}", e)))
    }

    /// Staff status transition with a validated lifecycle.
    pub async fn update_status(
        &self,
        booking_id: Uuid,
        new_status: BookingStatus,
        auth_token: &str,
    ) -> Result<CallBooking, BookingError> {
        let current = self.get_booking(booking_id, auth_token).await?;
        validate_status_transition(current.status, new_status)?;

        let path = format!("/rest/v1/call_bookings?id=eq.{}", booking_id);
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            "Prefer",
            reqwest::header::HeaderValue::from_static("return=representation"),
        );

        let result: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::PATCH,
                &path,
                Some(auth_token),
                Some(json!({ "status": new_status })),
                Some(headers),
            )
            .await
            .map_err(|e| BookingError::DatabaseError(e.to_string()))?;

        let row = result
            .into_iter()
            .next()
            .ok_or(BookingError::NotFound(booking_id))?;

        let updated: CallBooking = serde_json::from_value(row)
            .map_err(|e| BookingError::DatabaseError(format!("Failed to parse booking: {}", e)))?;

        info!(
            "Booking {} moved from {} to {}",
            booking_id, current.status, updated.status
        );
        Ok(updated)
    }

    // ==============================================================================
    // PRIVATE HELPER METHODS
    // ==============================================================================

    async fn fetch_booked_slots(&self, date: NaiveDate) -> Result<Vec<BookedSlot>, BookingError> {
        debug!("Fetching booked slots for {}", date);

        self.supabase
            .rpc(
                "get_booked_slots",
                None,
                json!({ "p_booking_date": date.format("%Y-%m-%d").to_string() }),
            )
            .await
            .map_err(|e| BookingError::DatabaseError(e.to_string()))
    }

    async fn insert_booking(&self, request: &BookCallRequest) -> Result<CallBooking, BookingError> {
        let booking_data = json!({
            "name": request.name,
            "email": request.email,
            "phone": request.phone,
            "booking_date": request.booking_date.format("%Y-%m-%d").to_string(),
            "time_slot": request.time_slot,
            "duration": request.duration,
            "notes": request.notes,
            "status": BookingStatus::Pending,
        });

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            "Prefer",
            reqwest::header::HeaderValue::from_static("return=representation"),
        );

        let result: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/call_bookings",
                None,
                Some(booking_data),
                Some(headers),
            )
            .await
            .map_err(|e| BookingError::DatabaseError(e.to_string()))?;

        let row = result
            .into_iter()
            .next()
            .ok_or_else(|| BookingError::DatabaseError("Insert returned no row".to_string()))?;

        serde_json::from_value(row)
            .map_err(|e| BookingError::DatabaseError(format!("Failed to parse booking: {}", e)))
    }
}

fn validate_booking_request(
    request: &BookCallRequest,
    today: NaiveDate,
) -> Result<(), BookingError> {
    if request.name.trim().is_empty() {
        return Err(BookingError::MissingField("name"));
    }
    if request.email.trim().is_empty() {
        return Err(BookingError::MissingField("email"));
    }
    if !request.email.contains('@') {
        return Err(BookingError::InvalidEmail);
    }
    if request.phone.trim().is_empty() {
        return Err(BookingError::MissingField("phone"));
    }

    if slots::slot_index(&request.time_slot).is_none() {
        return Err(BookingError::UnknownSlot(request.time_slot.clone()));
    }

    if request.booking_date < today {
        return Err(BookingError::PastDate);
    }
    if matches!(
        request.booking_date.weekday(),
        Weekday::Sat | Weekday::Sun
    ) {
        return Err(BookingError::WeekendDate);
    }
    if request.booking_date > today + ChronoDuration::days(BOOKING_HORIZON_DAYS) {
        return Err(BookingError::HorizonExceeded(BOOKING_HORIZON_DAYS));
    }

    Ok(())
}

fn validate_status_transition(
    from: BookingStatus,
    to: BookingStatus,
) -> Result<(), BookingError> {
    let allowed: &[BookingStatus] = match from {
        BookingStatus::Pending => &[BookingStatus::Confirmed, BookingStatus::Cancelled],
        BookingStatus::Confirmed => &[BookingStatus::Completed, BookingStatus::Cancelled],
        // Terminal states
        BookingStatus::Completed | BookingStatus::Cancelled => &[],
    };

    if allowed.contains(&to) {
        Ok(())
    } else {
        warn!("Invalid booking status transition: {} -> {}", from, to);
        Err(BookingError::InvalidStatusTransition { from, to })
    }
}
