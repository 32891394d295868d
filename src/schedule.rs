// Availability grid decoder.
//
// The courts_list endpoint answers with a JSON envelope whose `schedule`
// field holds the same markup the browser renders: one `div.schedule` block
// per sport, each holding an hour axis column, one column per court, and a
// trailing repeat of the axis. Closed spans are drawn as absolutely
// positioned markers sized in multiples of the slot height; this module
// turns that geometry back into per-slot booleans.

use tracing::{debug, warn};

use crate::error::ApiError;
use crate::markup::{self, Element};
use crate::models::{CourtAvailability, SportScheduleBlock};
use crate::timegrid::{self, TimeSlot};
use crate::transport::Payload;
use crate::util::sport_id_from_element_id;

/// Rendered height of one 30-minute slot. Closure markers are drawn at
/// integral multiples of this.
pub const PX_PER_SLOT: f64 = 41.0;

/// Result of looking one sport up in a decoded schedule page.
///
/// `NotListed` is distinct from a block whose every slot is closed: the
/// page simply renders no block for a sport with no schedule on that date.
#[derive(Debug, Clone, PartialEq)]
pub enum ScheduleQuery {
    Found(SportScheduleBlock),
    NotListed,
}

/// Unwrap the courts_list response payload into schedule markup.
pub fn schedule_html(payload: &Payload) -> Result<String, ApiError> {
    match payload {
        Payload::Json(value) => value
            .get("schedule")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| ApiError::parse("courts_list response has no schedule field")),
        Payload::Html(text) => Ok(text.clone()),
        Payload::Binary(_) => Err(ApiError::parse("courts_list response is not text")),
    }
}

/// Decode every sport block on a schedule page.
///
/// Blocks without a recognizable sport id are skipped; a page with no
/// schedule blocks at all decodes to an empty list (the date may simply have
/// nothing on offer).
pub fn decode_schedules(html: &str) -> Result<Vec<SportScheduleBlock>, ApiError> {
    let mut blocks = Vec::new();
    for block in markup::find_all(html, "div", Some("schedule")) {
        let Some(sport_id) = block.id().and_then(sport_id_from_element_id) else {
            warn!(id = ?block.id(), "schedule block without a sport id, skipping");
            continue;
        };
        let courts = decode_block(&block)?;
        blocks.push(SportScheduleBlock {
            sport_id: sport_id.to_string(),
            courts,
        });
    }
    Ok(blocks)
}

/// Pick one sport's block out of a decoded page.
pub fn select_sport(blocks: Vec<SportScheduleBlock>, sport_id: &str) -> ScheduleQuery {
    blocks
        .into_iter()
        .find(|b| b.sport_id == sport_id)
        .map_or(ScheduleQuery::NotListed, ScheduleQuery::Found)
}

/// Time axis of a schedule block: the hourboxer labels of its first column.
pub fn block_time_axis(block: &Element) -> Vec<TimeSlot> {
    let Some(axis_col) = markup::find_first(block.inner(), "div", Some("schedule_col")) else {
        return Vec::new();
    };
    markup::find_all(axis_col.inner(), "div", Some("hourboxer"))
        .iter()
        .map(|h| h.text())
        .filter(|t| !t.is_empty())
        .collect()
}

fn decode_block(block: &Element) -> Result<Vec<CourtAvailability>, ApiError> {
    let columns = markup::find_all(block.inner(), "div", Some("schedule_col"));
    if columns.is_empty() {
        return Err(ApiError::parse("schedule block has no columns"));
    }

    let times = block_time_axis(block);
    if times.is_empty() {
        return Err(ApiError::parse("schedule block has no time axis"));
    }

    // First column is the hour axis; the last repeats it when more than two
    // columns are present.
    let court_columns = if columns.len() > 2 {
        &columns[1..columns.len() - 1]
    } else {
        &columns[1..]
    };

    let mut courts = Vec::new();
    for column in court_columns {
        let header = markup::find_first(column.inner(), "strong", None)
            .map(|h| h.text())
            .unwrap_or_default();
        if header.is_empty() {
            // Spacer column, not a court.
            continue;
        }

        let rows = markup::find_all(column.inner(), "div", Some("schedule_line"));
        // The first line repeats the header.
        let slot_rows = if rows.len() > times.len() {
            &rows[rows.len() - times.len()..]
        } else {
            &rows[..]
        };
        if slot_rows.len() < times.len() {
            warn!(
                court = %header,
                rows = slot_rows.len(),
                slots = times.len(),
                "court column shorter than time axis, omitting"
            );
            continue;
        }

        let codes: Vec<u32> = slot_rows.iter().map(closure_code).collect();
        let open = timegrid::expand_run_lengths(&codes);
        debug!(court = %header, slots = open.len(), "decoded court column");
        courts.push(CourtAvailability {
            court: header,
            grid: times.iter().cloned().zip(open).collect(),
        });
    }
    Ok(courts)
}

/// Closure code for one slot row: 0 when open, otherwise the number of slots
/// the closure marker spans.
fn closure_code(row: &Element) -> u32 {
    let style = if row.has_class("reservation_closed") {
        Some(row.attr("style").unwrap_or("").to_string())
    } else {
        markup::find_first(row.inner(), "div", Some("reservation_closed"))
            .map(|m| m.attr("style").unwrap_or("").to_string())
    };
    match style {
        None => 0,
        Some(style) => match markup::style_height_px(&style) {
            // A marker always closes at least its own slot.
            Some(px) => (px / PX_PER_SLOT).round().max(1.0) as u32,
            None => 1,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn axis_col(times: &[&str]) -> String {
        let boxes: String = times
            .iter()
            .map(|t| format!(r#"<div class="hourboxer">{t}</div>"#))
            .collect();
        format!(r#"<div class="schedule_col">{boxes}</div>"#)
    }

    fn court_col(name: &str, rows: &[&str]) -> String {
        let lines: String = rows
            .iter()
            .map(|r| format!(r#"<div class="schedule_line">{r}</div>"#))
            .collect();
        format!(
            r#"<div class="schedule_col"><div class="schedule_line"><strong>{name}</strong></div>{lines}</div>"#
        )
    }

    fn closed(px: u32) -> String {
        format!(r#"<div class="reservation_closed" style="height: {px}px;"></div>"#)
    }

    const TIMES: [&str; 4] = ["07:00", "07:30", "08:00", "08:30"];

    fn sample_page() -> String {
        // Badminton 1: open, 2-slot closure, (swallowed), open.
        // Badminton 2: fully open.
        let block = format!(
            r#"<div class="schedule" id="cl_70_1">{axis}{c1}{c2}{mirror}</div>"#,
            axis = axis_col(&TIMES),
            c1 = court_col(
                "Badminton 1",
                &["", &closed(82), "", ""],
            ),
            c2 = court_col("Badminton 2", &["", "", "", ""]),
            mirror = axis_col(&TIMES),
        );
        format!("<div id=\"logged_cont\">{block}</div>")
    }

    #[test]
    fn decodes_courts_and_grids() {
        let blocks = decode_schedules(&sample_page()).unwrap();
        assert_eq!(blocks.len(), 1);
        let block = &blocks[0];
        assert_eq!(block.sport_id, "70");
        assert_eq!(block.courts.len(), 2);

        let first = &block.courts[0];
        assert_eq!(first.court, "Badminton 1");
        assert_eq!(
            first.grid,
            vec![
                ("07:00".to_string(), true),
                ("07:30".to_string(), false),
                ("08:00".to_string(), false),
                ("08:30".to_string(), true),
            ]
        );
        assert!(block.courts[1].grid.iter().all(|(_, open)| *open));
    }

    #[test]
    fn grid_labels_always_cover_the_axis() {
        let blocks = decode_schedules(&sample_page()).unwrap();
        for court in &blocks[0].courts {
            let labels: Vec<&str> = court.grid.iter().map(|(l, _)| l.as_str()).collect();
            assert_eq!(labels, TIMES);
        }
    }

    #[test]
    fn marker_without_height_closes_one_slot() {
        let block = format!(
            r#"<div class="schedule" id="cl_84_1">{axis}{col}</div>"#,
            axis = axis_col(&TIMES),
            col = court_col(
                "Squash 1",
                &[r#"<div class="reservation_closed"></div>"#, "", "", ""],
            ),
        );
        let blocks = decode_schedules(&block).unwrap();
        let grid = &blocks[0].courts[0].grid;
        assert_eq!(grid[0].1, false);
        assert!(grid[1..].iter().all(|(_, open)| *open));
    }

    #[test]
    fn four_slot_marker_swallows_short_axis() {
        let block = format!(
            r#"<div class="schedule" id="cl_84_1">{axis}{col}</div>"#,
            axis = axis_col(&TIMES),
            col = court_col("Squash 1", &[&closed(164), "", "", ""]),
        );
        let blocks = decode_schedules(&block).unwrap();
        assert!(blocks[0].courts[0].grid.iter().all(|(_, open)| !open));
    }

    #[test]
    fn short_court_column_is_omitted() {
        let block = format!(
            r#"<div class="schedule" id="cl_70_1">{axis}{short}{full}{mirror}</div>"#,
            axis = axis_col(&TIMES),
            short = court_col("Broken", &["", ""]),
            full = court_col("Whole", &["", "", "", ""]),
            mirror = axis_col(&TIMES),
        );
        let blocks = decode_schedules(&block).unwrap();
        assert_eq!(blocks[0].courts.len(), 1);
        assert_eq!(blocks[0].courts[0].court, "Whole");
    }

    #[test]
    fn block_without_sport_id_is_skipped() {
        let html = format!(
            r#"<div class="schedule">{axis}{col}</div>"#,
            axis = axis_col(&TIMES),
            col = court_col("Court", &["", "", "", ""]),
        );
        assert!(decode_schedules(&html).unwrap().is_empty());
    }

    #[test]
    fn empty_page_decodes_to_nothing() {
        assert!(decode_schedules("<div id=\"logged_cont\"></div>")
            .unwrap()
            .is_empty());
    }

    #[test]
    fn block_without_axis_is_an_error() {
        let html = r#"<div class="schedule" id="cl_70_1"><div class="schedule_col"></div></div>"#;
        assert!(matches!(decode_schedules(html), Err(ApiError::Parse(_))));
    }

    #[test]
    fn sport_selection() {
        let blocks = decode_schedules(&sample_page()).unwrap();
        assert!(matches!(
            select_sport(blocks.clone(), "70"),
            ScheduleQuery::Found(_)
        ));
        assert_eq!(select_sport(blocks, "84"), ScheduleQuery::NotListed);
    }

    #[test]
    fn envelope_unwrapping() {
        let payload = Payload::Json(json!({"schedule": "<div></div>"}));
        assert_eq!(schedule_html(&payload).unwrap(), "<div></div>");

        let payload = Payload::Json(json!({"error": "x"}));
        assert!(matches!(schedule_html(&payload), Err(ApiError::Parse(_))));

        let payload = Payload::Html("<div></div>".into());
        assert_eq!(schedule_html(&payload).unwrap(), "<div></div>");
    }
}
