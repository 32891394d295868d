// Small extraction and validation primitives shared by the decoders.

use chrono::NaiveDate;

/// Final path segment of a URL with its extension stripped.
///
/// `/pl/rsv/show/69184bbcb7df0.html` -> `69184bbcb7df0`
/// `/www/clubs/emblems/90.png` -> `90`
///
/// Returns `None` when the input has no path separator, no extension, or an
/// empty stem. Used to recover booking ids from detail links and facility
/// numeric ids from emblem image paths.
pub fn extract_trailing_id(url: &str) -> Option<&str> {
    let (_, segment) = url.rsplit_once('/')?;
    let (stem, ext) = segment.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    if !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(stem)
}

/// Second `_`-separated field of a structural element id such as `cl_70_1`.
pub fn sport_id_from_element_id(id: &str) -> Option<&str> {
    let field = id.splitn(3, '_').nth(1)?;
    if field.is_empty() {
        return None;
    }
    Some(field)
}

/// Strict `DD.MM.YYYY` with a real calendar date in years 2020..=2030.
pub fn validate_date(date: &str) -> bool {
    let mut parts = date.split('.');
    let (Some(day), Some(month), Some(year), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return false;
    };
    if day.len() != 2 || month.len() != 2 || year.len() != 4 {
        return false;
    }
    let (Ok(day), Ok(month), Ok(year)) = (
        day.parse::<u32>(),
        month.parse::<u32>(),
        year.parse::<i32>(),
    ) else {
        return false;
    };
    if !(1..=31).contains(&day) || !(1..=12).contains(&month) || !(2020..=2030).contains(&year) {
        return false;
    }
    NaiveDate::from_ymd_opt(year, month, day).is_some()
}

/// Strict `HH:MM` on a half-hour boundary.
pub fn validate_time(time: &str) -> bool {
    let Some((hour, minute)) = time.split_once(':') else {
        return false;
    };
    if hour.len() != 2 || minute.len() != 2 {
        return false;
    }
    let (Ok(hour), Ok(minute)) = (hour.parse::<u32>(), minute.parse::<u32>()) else {
        return false;
    };
    hour <= 23 && (minute == 0 || minute == 30)
}
