// Facility info decoder.
//
// A club's schedule page doubles as its capability listing: each rendered
// schedule block names one sport (caption in a `strong`) and carries the
// sport's numeric id in the block's structural id. The page also fixes the
// operating time axis. This decoder distinguishes three shapes of response
// rather than guessing: an empty body, a body without the logged-in anchor,
// and a parseable page.

use tracing::warn;

use crate::markup;
use crate::models::Sport;
use crate::schedule::block_time_axis;
use crate::timegrid::{TimeSlot, DEFAULT_SLOTS};
use crate::util::sport_id_from_element_id;

/// Element id present only on pages rendered for an authenticated session.
pub const AUTH_ANCHOR_ID: &str = "logged_cont";

/// What a club info fetch produced.
#[derive(Debug, Clone, PartialEq)]
pub enum ClubInfoOutcome {
    /// Body was empty. The club id may be wrong.
    NoContent,
    /// Page rendered, but for an anonymous visitor.
    SessionExpired,
    Parsed(ClubInfo),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClubInfo {
    pub sports: Vec<Sport>,
    /// Time axis of the first schedule block, or the default operating
    /// window when the page renders no usable axis.
    pub time_grid: Vec<TimeSlot>,
}

pub fn decode_club_info(html: &str) -> ClubInfoOutcome {
    if html.trim().is_empty() {
        return ClubInfoOutcome::NoContent;
    }
    if markup::find_by_id(html, AUTH_ANCHOR_ID).is_none() {
        return ClubInfoOutcome::SessionExpired;
    }

    let mut sports = Vec::new();
    let mut time_grid: Vec<TimeSlot> = Vec::new();
    for block in markup::find_all(html, "div", Some("schedule")) {
        let Some(raw_id) = block.id().and_then(sport_id_from_element_id) else {
            continue;
        };
        let Ok(id) = raw_id.parse::<u32>() else {
            warn!(sport_id = %raw_id, "non-numeric sport id in schedule block");
            continue;
        };
        let name = markup::find_first(block.inner(), "strong", None)
            .map(|h| h.text())
            .unwrap_or_default();
        if name.is_empty() {
            warn!(sport_id = id, "schedule block without a sport caption");
            continue;
        }
        if !sports.iter().any(|s: &Sport| s.id == id) {
            sports.push(Sport { id, name });
        }
        if time_grid.is_empty() {
            time_grid = block_time_axis(&block);
        }
    }

    if time_grid.is_empty() {
        time_grid = DEFAULT_SLOTS.clone();
    }
    ClubInfoOutcome::Parsed(ClubInfo { sports, time_grid })
}
