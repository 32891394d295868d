// Client library for court-reservation sites that only expose
// server-rendered schedules.

pub mod bulk;
pub mod catalog;
pub mod club;
pub mod config;
pub mod error;
pub mod markup;
pub mod models;
pub mod reservation;
pub mod schedule;
pub mod service;
pub mod session;
pub mod timegrid;
pub mod transport;
pub mod util;

// Re-export key types for convenience
pub use bulk::{BookingOutcome, BulkOutcome, DeleteAllOutcome};
pub use catalog::Catalog;
pub use club::{ClubInfo, ClubInfoOutcome};
pub use config::{Config, Credentials};
pub use error::ApiError;
pub use models::{
    Club, CourtAvailability, CourtBooking, ReservationDetail, ReservationSummary, Sport,
    SportScheduleBlock,
};
pub use schedule::ScheduleQuery;
pub use service::{CourtService, CredentialLogin};
pub use session::{Authenticator, SessionManager, SessionToken};
pub use transport::{HttpTransport, Transport};
