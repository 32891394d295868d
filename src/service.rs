// High-level client operations.
//
// `CourtService` ties the transport, the session executor and the decoders
// together: each remote operation builds its wire request, runs it through
// `with_session_retry`, and hands the body to the matching decoder. Wire
// details (paths, form field names, the reservation field encoding) live
// here and nowhere else.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::bulk::{self, BulkOutcome, DeleteAllOutcome};
use crate::catalog::Catalog;
use crate::club::{self, ClubInfoOutcome};
use crate::config::Config;
use crate::error::ApiError;
use crate::models::{CourtBooking, ReservationDetail, ReservationSummary, SportScheduleBlock};
use crate::reservation::{decode_reservation_detail, decode_reservations};
use crate::schedule::{self, ScheduleQuery};
use crate::session::{with_session_retry, Authenticator, SessionManager, SessionToken};
use crate::transport::{HttpTransport, Transport, TransportRequest};
use crate::util::validate_date;

const LOGIN_PATH: &str = "/pl/login.html";
const HOME_PATH: &str = "/pl/home.html";
const LOGOUT_PATH: &str = "/pl/logout.html";
const COURTS_LIST_PATH: &str = "/ajax.php?load=courts_list";
const KEEP_LOGGED_PATH: &str = "/ajax.php?load=keep_logged";
const RESERVATIONS_PATH: &str = "/pl/dashboard/reservations.html";
const RESERVE_PATH: &str = "/pl/rsv/make.html";
const DELETE_PATH: &str = "/pl/rsv/delete.html";

/// Auth error message reserved for the club info flow; see `club_info`.
const CLUB_SESSION_EXPIRED: &str = "club page rendered without an active session";

/// Acquires sessions by posting the login form and reading the session
/// cookie off the redirect.
pub struct CredentialLogin {
    transport: Arc<dyn Transport>,
    config: Config,
}

impl CredentialLogin {
    pub fn new(transport: Arc<dyn Transport>, config: Config) -> Self {
        Self { transport, config }
    }
}

#[async_trait]
impl Authenticator for CredentialLogin {
    async fn login(&self) -> Result<SessionToken, ApiError> {
        let Some(credentials) = &self.config.credentials else {
            return Err(ApiError::NoSession(
                "no credentials configured and no session token supplied".to_string(),
            ));
        };
        let request = TransportRequest::post(self.config.endpoint(LOGIN_PATH)).form(vec![
            ("login".to_string(), credentials.email.clone()),
            ("pass".to_string(), credentials.password.clone()),
            ("back_url".to_string(), HOME_PATH.to_string()),
            ("action".to_string(), "login".to_string()),
        ]);
        let response = self.transport.perform(request).await?;
        match response.status {
            302 => response.session_cookie().ok_or_else(|| {
                ApiError::Auth("login redirect carried no session cookie".to_string())
            }),
            200 => Err(ApiError::Auth("credentials rejected".to_string())),
            status => Err(ApiError::Http {
                status,
                details: Some("unexpected login response".to_string()),
            }),
        }
    }
}

pub struct CourtService {
    transport: Arc<dyn Transport>,
    config: Config,
    session: SessionManager,
    catalog: Option<Arc<Catalog>>,
}

impl CourtService {
    pub fn new(config: Config) -> Result<Self, ApiError> {
        let transport: Arc<dyn Transport> = Arc::new(HttpTransport::new(&config)?);
        Ok(Self::with_transport(config, transport))
    }

    pub fn with_transport(config: Config, transport: Arc<dyn Transport>) -> Self {
        let auth = Arc::new(CredentialLogin::new(transport.clone(), config.clone()));
        Self {
            session: SessionManager::new(auth),
            transport,
            config,
            catalog: None,
        }
    }

    /// Run against a session token obtained elsewhere, e.g. from a browser.
    pub fn with_session(config: Config, transport: Arc<dyn Transport>, token: SessionToken) -> Self {
        let auth = Arc::new(CredentialLogin::new(transport.clone(), config.clone()));
        Self {
            session: SessionManager::with_token(auth, token),
            transport,
            config,
            catalog: None,
        }
    }

    pub fn with_catalog(mut self, catalog: Arc<Catalog>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Ensure a session exists, logging in if necessary.
    pub async fn login(&self) -> Result<SessionToken, ApiError> {
        self.session.current().await
    }

    /// Best-effort server-side logout; local session state is always
    /// dropped.
    pub async fn logout(&self) -> Result<(), ApiError> {
        if let Some(token) = self.session.peek().await {
            let request =
                TransportRequest::get(self.config.endpoint(LOGOUT_PATH)).session(token);
            if let Err(err) = self.transport.perform(request).await {
                debug!(error = %err, "logout request failed, dropping session anyway");
            }
        }
        self.session.clear().await;
        Ok(())
    }

    /// Whether the held session is still accepted. Runs a single probe with
    /// no retry; any failure answers `Ok(false)` rather than an error.
    pub async fn keep_alive(&self) -> Result<bool, ApiError> {
        let token = self.session.current().await?;
        let request = TransportRequest::post(self.config.endpoint(KEEP_LOGGED_PATH))
            .header("X-Requested-With", "XMLHttpRequest")
            .session(token);
        match self.transport.perform(request).await {
            Ok(response) => Ok(response.is_success()),
            Err(err) => {
                warn!(error = %err, "keep-alive probe failed");
                Ok(false)
            }
        }
    }

    /// All sport blocks rendered for a club on one date.
    pub async fn club_schedules(
        &self,
        club_id: &str,
        date: &str,
    ) -> Result<Vec<SportScheduleBlock>, ApiError> {
        self.fetch_schedules(club_id, date, None).await
    }

    /// One sport's availability for a club on one date.
    ///
    /// `ScheduleQuery::NotListed` means the page rendered no block for the
    /// sport, which is not the same thing as every slot being closed.
    pub async fn sport_schedule(
        &self,
        club_id: &str,
        date: &str,
        sport_id: u32,
    ) -> Result<ScheduleQuery, ApiError> {
        if let Some(catalog) = &self.catalog {
            if !catalog.is_valid_sport_id(sport_id) {
                return Err(ApiError::Parse(format!("unknown sport id: {sport_id}")));
            }
        }
        let blocks = self.fetch_schedules(club_id, date, Some(sport_id)).await?;
        Ok(schedule::select_sport(blocks, &sport_id.to_string()))
    }

    async fn fetch_schedules(
        &self,
        club_id: &str,
        date: &str,
        sport_id: Option<u32>,
    ) -> Result<Vec<SportScheduleBlock>, ApiError> {
        if !validate_date(date) {
            return Err(ApiError::Parse(format!(
                "invalid date, expected DD.MM.YYYY: {date}"
            )));
        }
        let request = TransportRequest::post(self.config.endpoint(COURTS_LIST_PATH))
            .header("X-Requested-With", "XMLHttpRequest")
            .form(vec![
                ("date".to_string(), date.to_string()),
                ("club_url".to_string(), club_id.to_string()),
                ("page".to_string(), "NaN".to_string()),
                (
                    "spr".to_string(),
                    sport_id.map_or_else(|| "0".to_string(), |s| s.to_string()),
                ),
                ("zsh".to_string(), "0".to_string()),
                ("tz".to_string(), "0".to_string()),
            ]);
        let transport = self.transport.clone();
        with_session_retry(&self.session, self.config.retry_delay, move |token| {
            let transport = transport.clone();
            let request = request.clone().session(token);
            async move {
                let response = transport.perform(request).await?;
                if !response.is_success() {
                    return Err(ApiError::Http {
                        status: response.status,
                        details: None,
                    });
                }
                let html = schedule::schedule_html(&response.payload)?;
                schedule::decode_schedules(&html)
            }
        })
        .await
    }

    /// Sports and operating hours of a club.
    ///
    /// An expired session is reported as an outcome, not an error, but only
    /// after the executor has already spent its refresh-and-replay on it.
    pub async fn club_info(&self, club_id: &str) -> Result<ClubInfoOutcome, ApiError> {
        let url = self.config.endpoint(&format!("/pl/kluby/{club_id}.html"));
        let transport = self.transport.clone();
        let result = with_session_retry(&self.session, self.config.retry_delay, move |token| {
            let transport = transport.clone();
            let request = TransportRequest::get(url.clone()).session(token);
            async move {
                let response = transport.perform(request).await?;
                if !response.is_success() {
                    return Err(ApiError::Http {
                        status: response.status,
                        details: None,
                    });
                }
                let html = response.payload.as_html().unwrap_or("");
                match club::decode_club_info(html) {
                    ClubInfoOutcome::SessionExpired => {
                        Err(ApiError::Auth(CLUB_SESSION_EXPIRED.to_string()))
                    }
                    outcome => Ok(outcome),
                }
            }
        })
        .await;

        match result {
            Ok(outcome) => {
                if let (ClubInfoOutcome::Parsed(info), Some(catalog)) = (&outcome, &self.catalog) {
                    catalog.record_sports(club_id, info.sports.clone());
                }
                Ok(outcome)
            }
            Err(ApiError::Auth(msg)) if msg == CLUB_SESSION_EXPIRED => {
                Ok(ClubInfoOutcome::SessionExpired)
            }
            Err(err) => Err(err),
        }
    }

    /// Current reservations from the dashboard.
    pub async fn reservations(&self) -> Result<Vec<ReservationSummary>, ApiError> {
        let url = self.config.endpoint(RESERVATIONS_PATH);
        let transport = self.transport.clone();
        with_session_retry(&self.session, self.config.retry_delay, move |token| {
            let transport = transport.clone();
            let request = TransportRequest::get(url.clone()).session(token);
            async move {
                let response = transport.perform(request).await?;
                if !response.is_success() {
                    return Err(ApiError::Http {
                        status: response.status,
                        details: None,
                    });
                }
                decode_reservations(response.payload.as_html().unwrap_or(""))
            }
        })
        .await
    }

    /// Full detail of one reservation.
    pub async fn reservation_detail(
        &self,
        booking_id: &str,
    ) -> Result<ReservationDetail, ApiError> {
        let url = self.config.endpoint(&format!("/pl/rsv/show/{booking_id}.html"));
        let booking_id = booking_id.to_string();
        let transport = self.transport.clone();
        with_session_retry(&self.session, self.config.retry_delay, move |token| {
            let transport = transport.clone();
            let request = TransportRequest::get(url.clone()).session(token);
            let booking_id = booking_id.clone();
            async move {
                let response = transport.perform(request).await?;
                if !response.is_success() {
                    return Err(ApiError::Http {
                        status: response.status,
                        details: None,
                    });
                }
                decode_reservation_detail(response.payload.as_html().unwrap_or(""), &booking_id)
            }
        })
        .await
    }

    /// Book one court slot. Confirmation comes from the dashboard, the same
    /// way bulk requests are confirmed.
    pub async fn make_reservation(
        &self,
        club_num: u32,
        sport_id: u32,
        booking: CourtBooking,
    ) -> Result<BulkOutcome, ApiError> {
        self.make_bulk_reservation(club_num, sport_id, vec![booking])
            .await
    }

    /// Submit a batch of bookings in one form post, then reconcile against
    /// the refreshed dashboard. Validation failures reject the whole batch
    /// before anything reaches the wire.
    pub async fn make_bulk_reservation(
        &self,
        club_num: u32,
        sport_id: u32,
        bookings: Vec<CourtBooking>,
    ) -> Result<BulkOutcome, ApiError> {
        if let Err(message) = bulk::validate_batch(&bookings) {
            return Ok(BulkOutcome::rejected(message, &bookings));
        }
        if let Some(catalog) = &self.catalog {
            if !catalog.is_valid_sport_id(sport_id) {
                return Ok(BulkOutcome::rejected(
                    format!("Unknown sport id: {sport_id}"),
                    &bookings,
                ));
            }
        }

        self.submit_reservation_form(club_num, sport_id, &bookings, false)
            .await?;
        let after = self.reservations().await?;
        let outcome = bulk::reconcile(bookings, &after);
        info!(success = outcome.success, message = %outcome.message, "bulk reservation finished");
        Ok(outcome)
    }

    /// Cancel a previously booked slot.
    pub async fn delete_reservation(
        &self,
        club_num: u32,
        sport_id: u32,
        booking: CourtBooking,
    ) -> Result<(), ApiError> {
        if let Err(message) = bulk::validate_batch(std::slice::from_ref(&booking)) {
            return Err(ApiError::Parse(message));
        }
        self.submit_reservation_form(club_num, sport_id, std::slice::from_ref(&booking), true)
            .await
    }

    /// Delete every reservation on the dashboard, one by one, and report
    /// which booking ids went through. Per-item failures do not stop the
    /// sweep.
    ///
    /// Each deletion needs the slot details the dashboard row does not
    /// render, so every item costs a detail fetch before its delete post.
    /// Resolving the sport id from the rendered sport name requires a
    /// catalog.
    pub async fn delete_all_reservations(&self) -> Result<DeleteAllOutcome, ApiError> {
        let summaries = self.reservations().await?;
        let mut deleted = Vec::new();
        let mut failed = Vec::new();
        for summary in summaries {
            match self.delete_listed_reservation(&summary).await {
                Ok(()) => deleted.push(summary.booking_id),
                Err(err) => {
                    warn!(booking_id = %summary.booking_id, error = %err, "deletion failed");
                    failed.push(summary.booking_id);
                }
            }
        }
        let outcome = bulk::summarize_deletions(deleted, failed);
        info!(success = outcome.success, message = %outcome.message, "delete all reservations finished");
        Ok(outcome)
    }

    async fn delete_listed_reservation(
        &self,
        summary: &ReservationSummary,
    ) -> Result<(), ApiError> {
        let detail = self.reservation_detail(&summary.booking_id).await?;
        let sport_id = self
            .catalog
            .as_ref()
            .and_then(|c| c.sport_id_by_name(&detail.sport))
            .ok_or_else(|| {
                ApiError::Unexpected(format!("cannot resolve sport id for {:?}", detail.sport))
            })?;
        let (start, end) = detail
            .time
            .split_once(" - ")
            .ok_or_else(|| ApiError::Parse(format!("unrecognized time range: {}", detail.time)))?;
        let booking = CourtBooking {
            court: court_number(&detail.court),
            date: detail.date.clone(),
            time_start: start.trim().to_string(),
            time_end: end.trim().to_string(),
        };
        self.delete_reservation(detail.club_num, sport_id, booking)
            .await
    }

    async fn submit_reservation_form(
        &self,
        club_num: u32,
        sport_id: u32,
        bookings: &[CourtBooking],
        delete: bool,
    ) -> Result<(), ApiError> {
        let mut form = vec![
            ("club_id".to_string(), club_num.to_string()),
            ("type".to_string(), "corts".to_string()),
        ];
        if delete {
            form.push(("action".to_string(), "delete".to_string()));
        }
        for booking in bookings {
            form.push(booking_field(sport_id, booking));
        }
        let path = if delete { DELETE_PATH } else { RESERVE_PATH };
        let request = TransportRequest::post(self.config.endpoint(path)).form(form);
        let transport = self.transport.clone();
        with_session_retry(&self.session, self.config.retry_delay, move |token| {
            let transport = transport.clone();
            let request = request.clone().session(token);
            async move {
                let response = transport.perform(request).await?;
                if !response.is_success() {
                    return Err(ApiError::Http {
                        status: response.status,
                        details: None,
                    });
                }
                Ok(())
            }
        })
        .await
    }
}

/// Trailing number of a rendered court label: "kort 1" -> "1". Labels
/// without one are kept verbatim.
fn court_number(court: &str) -> String {
    let digits: String = court
        .chars()
        .rev()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    if digits.is_empty() {
        court.to_string()
    } else {
        digits.chars().rev().collect()
    }
}

/// Encode one booking as the reservation form expects it: a field named
/// after the slot with a JSON description of the booking as its value.
/// The date drops its separators entirely ("27.12.2025" -> "27122025");
/// the hour swaps the colon for an underscore. `cort_id` goes over the wire
/// as a number.
fn booking_field(sport_id: u32, booking: &CourtBooking) -> (String, String) {
    let date_key = booking.date.replace('.', "");
    let hour_key = booking.time_start.replace(':', "_");
    let name = format!("rsv_{date_key}_{sport_id}_{}_{hour_key}", booking.court);
    let cort_id = match booking.court.parse::<u32>() {
        Ok(n) => serde_json::Value::from(n),
        Err(_) => serde_json::Value::from(booking.court.as_str()),
    };
    let value = serde_json::json!({
        "sport_id": sport_id,
        "cort_id": cort_id,
        "date": booking.date,
        "hour": booking.time_start,
    })
    .to_string();
    (name, value)
}
