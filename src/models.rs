// Data model for facilities, schedules and reservations.

use serde::{Deserialize, Serialize};

use crate::timegrid::TimeSlot;

/// A sport supported by a club.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sport {
    pub id: u32,
    pub name: String,
}

/// A club from the catalog file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Club {
    /// URL identifier, e.g. "blonia-sport".
    pub id: String,
    /// Numeric identifier used in emblem paths and form posts.
    pub num: u32,
    pub name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub phone: String,
    /// Filled lazily from the club info page.
    #[serde(default)]
    pub sports: Option<Vec<Sport>>,
}

/// One court's availability for a single date.
///
/// `grid` is ordered and its label sequence always equals the time axis of
/// the schedule block it came from; partial grids are never produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourtAvailability {
    /// Display header verbatim, e.g. "Badminton 1" or "Hala 2".
    pub court: String,
    pub grid: Vec<(TimeSlot, bool)>,
}

impl CourtAvailability {
    pub fn is_open(&self, slot: &str) -> Option<bool> {
        self.grid
            .iter()
            .find(|(label, _)| label == slot)
            .map(|(_, open)| *open)
    }
}

/// All courts of one sport at one facility on one date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SportScheduleBlock {
    /// Sport identifier as rendered in the block's structural id.
    pub sport_id: String,
    pub courts: Vec<CourtAvailability>,
}

/// One row of the authenticated reservations dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationSummary {
    pub booking_id: String,
    /// DD.MM.YYYY as rendered.
    pub date: String,
    /// Time range as rendered, e.g. "21:00 - 21:30".
    pub time: String,
    pub club_num: u32,
    pub club_name: String,
}

impl ReservationSummary {
    /// Correlation key used by the bulk reconciler; deliberately excludes the
    /// court (see `bulk`).
    pub fn correlation_key(&self) -> String {
        format!("{}_{}", self.date, self.time)
    }
}

/// Everything the reservation detail page exposes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationDetail {
    pub booking_id: String,
    pub club_id: String,
    pub club_name: String,
    pub club_num: u32,
    pub date: String,
    pub time: String,
    pub sport: String,
    pub court: String,
    /// Free-text remainder of the comma-joined label, may be empty.
    pub details: String,
    pub cancel_deadline: String,
    pub price: String,
    pub payment_deadline: String,
}

/// One item of a bulk booking request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourtBooking {
    pub court: String,
    /// DD.MM.YYYY
    pub date: String,
    /// HH:MM
    pub time_start: String,
    /// HH:MM
    pub time_end: String,
}

impl CourtBooking {
    /// Key used to match this request against the post-submit reservation
    /// list. Matches the dashboard's rendered `date` + `time` pair. Note the
    /// court is not part of the key.
    pub fn correlation_key(&self) -> String {
        format!("{}_{} - {}", self.date, self.time_start, self.time_end)
    }
}
