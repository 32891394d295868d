// Static catalog of known clubs and sports.
//
// The website has no listing endpoint; the catalog is shipped as JSON and
// loaded once. Per-club sport listings are discovered lazily from club info
// pages and merged back in, so the club table sits behind a lock.

use parking_lot::Mutex;

use tracing::debug;

use crate::error::ApiError;
use crate::models::{Club, Sport};

pub struct Catalog {
    clubs: Mutex<Vec<Club>>,
    sports: Vec<Sport>,
}

impl Catalog {
    pub fn from_parts(clubs: Vec<Club>, sports: Vec<Sport>) -> Self {
        Self {
            clubs: Mutex::new(clubs),
            sports,
        }
    }

    /// Load from the shipped JSON documents: an array of clubs and an array
    /// of sports.
    pub fn from_json(clubs_json: &str, sports_json: &str) -> Result<Self, ApiError> {
        let clubs: Vec<Club> = serde_json::from_str(clubs_json)
            .map_err(|e| ApiError::Parse(format!("invalid clubs catalog: {e}")))?;
        let sports: Vec<Sport> = serde_json::from_str(sports_json)
            .map_err(|e| ApiError::Parse(format!("invalid sports catalog: {e}")))?;
        debug!(clubs = clubs.len(), sports = sports.len(), "catalog loaded");
        Ok(Self::from_parts(clubs, sports))
    }

    pub fn is_valid_sport_id(&self, id: u32) -> bool {
        self.sports.iter().any(|s| s.id == id)
    }

    pub fn sport_name(&self, id: u32) -> Option<String> {
        self.sports
            .iter()
            .find(|s| s.id == id)
            .map(|s| s.name.clone())
    }

    /// Sport id by display name, case-insensitive. Used to recover the id
    /// from pages that only render the name.
    pub fn sport_id_by_name(&self, name: &str) -> Option<u32> {
        self.sports
            .iter()
            .find(|s| s.name.eq_ignore_ascii_case(name.trim()))
            .map(|s| s.id)
    }

    pub fn sports(&self) -> &[Sport] {
        &self.sports
    }

    /// Club by its URL identifier.
    pub fn club_by_id(&self, id: &str) -> Option<Club> {
        self.clubs.lock().iter().find(|c| c.id == id).cloned()
    }

    pub fn clubs(&self) -> Vec<Club> {
        self.clubs.lock().clone()
    }

    /// Record the sports discovered on a club's info page.
    pub fn record_sports(&self, club_id: &str, sports: Vec<Sport>) {
        let mut clubs = self.clubs.lock();
        if let Some(club) = clubs.iter_mut().find(|c| c.id == club_id) {
            debug!(club = %club_id, count = sports.len(), "recording club sports");
            club.sports = Some(sports);
        }
    }
}
