// Reservation record decoders: the dashboard list and the detail page.
//
// Both pages require an authenticated session; the logged-in anchor doubles
// as the expiry detector. List rows are strict: a reservation box missing
// any of its identifying pieces fails the whole decode instead of shipping
// a partial record that a cancel call could then aim at the wrong booking.

use crate::club::AUTH_ANCHOR_ID;
use crate::error::ApiError;
use crate::markup::{self, Element};
use crate::models::{ReservationDetail, ReservationSummary};
use crate::util::extract_trailing_id;

/// Path fragment of reservation detail links.
const DETAIL_PATH: &str = "/rsv/show/";
/// Path fragment of club emblem images; the numeric club id is the filename.
const EMBLEM_PATH: &str = "/emblems/";
/// Path fragment of club profile links; the club's URL id is the filename.
const CLUB_PATH: &str = "/kluby/";

/// Decode the reservations dashboard into summaries, newest markup order
/// preserved.
pub fn decode_reservations(html: &str) -> Result<Vec<ReservationSummary>, ApiError> {
    if markup::find_by_id(html, AUTH_ANCHOR_ID).is_none() {
        return Err(ApiError::Auth(
            "reservations page rendered without an active session".to_string(),
        ));
    }

    let mut out = Vec::new();
    for (index, cell) in markup::find_all(html, "div", Some("reservation_box"))
        .iter()
        .enumerate()
    {
        out.push(decode_summary(cell).map_err(|e| {
            ApiError::Parse(format!("reservation box {index}: {e}"))
        })?);
    }
    Ok(out)
}

fn decode_summary(cell: &Element) -> Result<ReservationSummary, String> {
    let booking_id = markup::find_all(cell.inner(), "a", None)
        .iter()
        .filter_map(|a| a.attr("href"))
        .find(|href| href.contains(DETAIL_PATH))
        .and_then(extract_trailing_id)
        .ok_or("no detail link")?
        .to_string();
    let club_num = emblem_club_num(cell.inner()).ok_or("no emblem image")?;
    let club_name = markup::find_first(cell.inner(), "h3", None)
        .map(|h| h.text())
        .filter(|t| !t.is_empty())
        .ok_or("no club name")?;
    let date = span_text(cell, "date").ok_or("no date")?;
    let time = span_text(cell, "hours").ok_or("no hours")?;
    Ok(ReservationSummary {
        booking_id,
        date,
        time,
        club_num,
        club_name,
    })
}

/// Decode a reservation detail page.
pub fn decode_reservation_detail(
    html: &str,
    booking_id: &str,
) -> Result<ReservationDetail, ApiError> {
    if markup::find_by_id(html, AUTH_ANCHOR_ID).is_none() {
        return Err(ApiError::Auth(
            "reservation detail rendered without an active session".to_string(),
        ));
    }

    let club_id = markup::find_all(html, "a", None)
        .iter()
        .filter_map(|a| a.attr("href"))
        .find(|href| href.contains(CLUB_PATH))
        .and_then(extract_trailing_id)
        .ok_or_else(|| ApiError::parse("detail page has no club link"))?
        .to_string();
    let club_name = markup::find_first(html, "h2", None)
        .map(|h| h.text())
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::parse("detail page has no club name"))?;
    let club_num =
        emblem_club_num(html).ok_or_else(|| ApiError::parse("detail page has no emblem"))?;

    let data = markup::find_first(html, "table", Some("rsv_data"))
        .ok_or_else(|| ApiError::parse("detail page has no data table"))?;
    let date = table_cell(&data, 0)?;
    let time = table_cell(&data, 1)?;
    let label = table_cell(&data, 2)?;
    let cancel_deadline = table_cell(&data, 3)?;

    let payment = markup::find_first(html, "table", Some("rsv_payment"))
        .ok_or_else(|| ApiError::parse("detail page has no payment table"))?;
    let price = table_cell(&payment, 0)?;
    let payment_deadline = table_cell(&payment, 1)?;

    // "Badminton, kort 1, 60 min" -> sport, court, free-text remainder.
    let mut parts = label.splitn(3, ',').map(str::trim);
    let sport = parts.next().unwrap_or("").to_string();
    let court = parts.next().unwrap_or("").to_string();
    let details = parts.next().unwrap_or("").to_string();

    Ok(ReservationDetail {
        booking_id: booking_id.to_string(),
        club_id,
        club_name,
        club_num,
        date,
        time,
        sport,
        court,
        details,
        cancel_deadline,
        price,
        payment_deadline,
    })
}

/// Numeric club id recovered from the first emblem image path.
fn emblem_club_num(html: &str) -> Option<u32> {
    markup::find_all(html, "img", None)
        .iter()
        .filter_map(|img| img.attr("src"))
        .find(|src| src.contains(EMBLEM_PATH))
        .and_then(extract_trailing_id)
        .and_then(|id| id.parse().ok())
}

fn span_text(cell: &Element, class: &str) -> Option<String> {
    markup::find_first(cell.inner(), "span", Some(class))
        .map(|s| s.text())
        .filter(|t| !t.is_empty())
}

/// Value cell of the `index`-th row of a two-column label/value table.
fn table_cell(table: &Element, index: usize) -> Result<String, ApiError> {
    let rows = markup::find_all(table.inner(), "tr", None);
    let row = rows
        .get(index)
        .ok_or_else(|| ApiError::Parse(format!("table has no row {index}")))?;
    let cells = markup::find_all(row.inner(), "td", None);
    let cell = cells
        .get(1)
        .or_else(|| cells.first())
        .ok_or_else(|| ApiError::Parse(format!("table row {index} has no cells")))?;
    Ok(cell.text())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reservation_box(id: &str, date: &str, time: &str) -> String {
        format!(
            r#"<div class="reservation_box">
                 <img src="/www/clubs/emblems/90.png">
                 <h3>Błonia Sport</h3>
                 <span class="date">{date}</span>
                 <span class="hours">{time}</span>
                 <a href="/pl/rsv/show/{id}.html">pokaż</a>
               </div>"#
        )
    }

    fn dashboard(boxes: &str) -> String {
        format!(r#"<div id="logged_cont">{boxes}</div>"#)
    }

    #[test]
    fn decodes_dashboard_rows() {
        let html = dashboard(&format!(
            "{}{}",
            reservation_box("abc123", "27.12.2025", "21:00 - 21:30"),
            reservation_box("def456", "28.12.2025", "09:00 - 10:00"),
        ));
        let rows = decode_reservations(&html).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].booking_id, "abc123");
        assert_eq!(rows[0].date, "27.12.2025");
        assert_eq!(rows[0].time, "21:00 - 21:30");
        assert_eq!(rows[0].club_num, 90);
        assert_eq!(rows[0].club_name, "Błonia Sport");
        assert_eq!(rows[1].booking_id, "def456");
    }

    #[test]
    fn empty_dashboard_is_ok() {
        assert!(decode_reservations(&dashboard("")).unwrap().is_empty());
    }

    #[test]
    fn missing_anchor_is_auth_error() {
        let html = reservation_box("abc123", "27.12.2025", "21:00 - 21:30");
        assert!(matches!(
            decode_reservations(&html),
            Err(ApiError::Auth(_))
        ));
    }

    #[test]
    fn incomplete_box_fails_the_decode() {
        let html = dashboard(
            r#"<div class="reservation_box">
                 <h3>Błonia Sport</h3>
                 <span class="date">27.12.2025</span>
               </div>"#,
        );
        let err = decode_reservations(&html).unwrap_err();
        assert!(matches!(err, ApiError::Parse(_)));
        assert!(err.to_string().contains("reservation box 0"));
    }

    const DETAIL: &str = r#"
        <div id="logged_cont">
          <a href="/pl/kluby/blonia-sport.html">Błonia Sport</a>
          <h2>Błonia Sport</h2>
          <img src="/www/clubs/emblems/90.png">
          <table class="rsv_data">
            <tr><td>Data</td><td>27.12.2025</td></tr>
            <tr><td>Godzina</td><td>21:00 - 21:30</td></tr>
            <tr><td>Usługa</td><td>Badminton, kort 1, 30 min</td></tr>
            <tr><td>Bezpłatne odwołanie do</td><td>26.12.2025 21:00</td></tr>
          </table>
          <table class="rsv_payment">
            <tr><td>Cena</td><td>45,00 zł</td></tr>
            <tr><td>Termin płatności</td><td>na miejscu</td></tr>
          </table>
        </div>
    "#;

    #[test]
    fn decodes_detail_page() {
        let detail = decode_reservation_detail(DETAIL, "abc123").unwrap();
        assert_eq!(detail.booking_id, "abc123");
        assert_eq!(detail.club_id, "blonia-sport");
        assert_eq!(detail.club_name, "Błonia Sport");
        assert_eq!(detail.club_num, 90);
        assert_eq!(detail.date, "27.12.2025");
        assert_eq!(detail.time, "21:00 - 21:30");
        assert_eq!(detail.sport, "Badminton");
        assert_eq!(detail.court, "kort 1");
        assert_eq!(detail.details, "30 min");
        assert_eq!(detail.cancel_deadline, "26.12.2025 21:00");
        assert_eq!(detail.price, "45,00 zł");
        assert_eq!(detail.payment_deadline, "na miejscu");
    }

    #[test]
    fn detail_with_short_label() {
        let html = DETAIL.replace("Badminton, kort 1, 30 min", "Badminton");
        let detail = decode_reservation_detail(&html, "abc123").unwrap();
        assert_eq!(detail.sport, "Badminton");
        assert_eq!(detail.court, "");
        assert_eq!(detail.details, "");
    }

    #[test]
    fn detail_missing_payment_table_fails() {
        let html = DETAIL.replace("rsv_payment", "other");
        assert!(matches!(
            decode_reservation_detail(&html, "abc123"),
            Err(ApiError::Parse(_))
        ));
    }

    #[test]
    fn detail_without_anchor_is_auth_error() {
        let html = DETAIL.replace("logged_cont", "anon");
        assert!(matches!(
            decode_reservation_detail(&html, "abc123"),
            Err(ApiError::Auth(_))
        ));
    }
}
