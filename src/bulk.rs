// Bulk booking reconciliation.
//
// The facility's bulk submit endpoint answers with a page that says nothing
// about which requests took. Ground truth is the reservations dashboard
// fetched right after the submit: a requested slot that shows up there was
// booked, one that does not was lost to somebody else. Matching is by
// rendered date and time range only; the dashboard does not render the court
// number, so two same-time requests on different courts are indistinguishable
// and inherit each other's outcome.

use std::collections::HashMap;

use tracing::info;

use crate::models::{CourtBooking, ReservationSummary};
use crate::util::{validate_date, validate_time};

/// One requested booking with its reconciled outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingOutcome {
    pub booking: CourtBooking,
    pub success: bool,
    /// Present only when the booking was confirmed on the dashboard.
    pub booking_id: Option<String>,
}

/// Outcome of a whole bulk request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkOutcome {
    pub success: bool,
    pub message: String,
    pub bookings: Vec<BookingOutcome>,
}

impl BulkOutcome {
    /// Outcome for a batch rejected before submission. Every booking is
    /// marked unsuccessful and nothing reaches the wire.
    pub fn rejected(message: impl Into<String>, bookings: &[CourtBooking]) -> Self {
        Self {
            success: false,
            message: message.into(),
            bookings: bookings
                .iter()
                .map(|b| BookingOutcome {
                    booking: b.clone(),
                    success: false,
                    booking_id: None,
                })
                .collect(),
        }
    }
}

/// Outcome of deleting every reservation on the dashboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteAllOutcome {
    pub success: bool,
    pub message: String,
    /// Booking ids confirmed deleted, dashboard order.
    pub deleted: Vec<String>,
    /// Booking ids whose deletion failed.
    pub failed: Vec<String>,
}

impl DeleteAllOutcome {
    pub fn deleted_count(&self) -> usize {
        self.deleted.len()
    }
}

/// Summarize a delete-everything sweep. Success means nothing was left
/// behind; an empty dashboard counts as success.
pub fn summarize_deletions(deleted: Vec<String>, failed: Vec<String>) -> DeleteAllOutcome {
    let total = deleted.len() + failed.len();
    let (success, message) = if total == 0 {
        (true, "No reservations found".to_string())
    } else if failed.is_empty() {
        (
            true,
            format!("Successfully deleted all {total} reservation(s)"),
        )
    } else if deleted.is_empty() {
        (
            false,
            format!("Failed to delete any of the {total} reservation(s)"),
        )
    } else {
        (
            false,
            format!(
                "Deleted {} of {total} reservation(s); {} deletion(s) failed",
                deleted.len(),
                failed.len()
            ),
        )
    };
    DeleteAllOutcome {
        success,
        message,
        deleted,
        failed,
    }
}

/// Validate a batch before it goes anywhere near the wire.
pub fn validate_batch(bookings: &[CourtBooking]) -> Result<(), String> {
    if bookings.is_empty() {
        return Err("No bookings provided".to_string());
    }
    for booking in bookings {
        if !validate_date(&booking.date) {
            return Err(format!("Invalid date format: {}", booking.date));
        }
        if !validate_time(&booking.time_start) || !validate_time(&booking.time_end) {
            return Err(format!(
                "Invalid time format: {} - {}",
                booking.time_start, booking.time_end
            ));
        }
    }
    Ok(())
}

/// Match each requested booking against the post-submit dashboard.
pub fn reconcile(bookings: Vec<CourtBooking>, after: &[ReservationSummary]) -> BulkOutcome {
    // Last occurrence wins when the dashboard renders duplicate slots.
    let mut by_key: HashMap<String, &ReservationSummary> = HashMap::new();
    for summary in after {
        by_key.insert(summary.correlation_key(), summary);
    }

    let outcomes: Vec<BookingOutcome> = bookings
        .into_iter()
        .map(|booking| {
            let confirmed = by_key.get(&booking.correlation_key());
            BookingOutcome {
                success: confirmed.is_some(),
                booking_id: confirmed.map(|s| s.booking_id.clone()),
                booking,
            }
        })
        .collect();

    let booked = outcomes.iter().filter(|o| o.success).count();
    let unavailable = outcomes.len() - booked;
    info!(booked, unavailable, "bulk reservation reconciled");

    let (success, message) = if unavailable == 0 {
        (
            true,
            format!("Bulk reservation successful: {booked} court(s) booked"),
        )
    } else if booked > 0 {
        (
            true,
            format!(
                "Partial bulk reservation: {booked} court(s) booked, {unavailable} court(s) unavailable"
            ),
        )
    } else {
        (
            false,
            format!("Bulk reservation failed: {unavailable} court(s) unavailable"),
        )
    };

    BulkOutcome {
        success,
        message,
        bookings: outcomes,
    }
}
