//! Wall-clock slot times.
//!
//! Owners type slot times in whatever form they like ("18:00", "6 PM",
//! "6:30pm"). Everything is reduced to minutes since midnight and stored in
//! canonical 24-hour `HH:MM` form so that the booking key compares equal no
//! matter how the time was written.

use crate::errors::{AppError, AppResult};

pub const MINUTES_PER_DAY: u32 = 24 * 60;

/// Parse a wall-clock string into minutes since midnight.
///
/// Accepts 24-hour `HH:MM` (including `24:00`) and 12-hour forms with an
/// `am`/`pm` suffix, with or without minutes, spaces or dots.
pub fn parse_minutes(raw: &str) -> AppResult<u32> {
    let cleaned: String = raw
        .trim()
        .to_lowercase()
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '.')
        .collect();

    if cleaned.is_empty() {
        return Err(AppError::Validation("time is required".into()));
    }

    let (clock, meridiem) = if let Some(rest) = cleaned.strip_suffix("am") {
        (rest, Some(false))
    } else if let Some(rest) = cleaned.strip_suffix("pm") {
        (rest, Some(true))
    } else {
        (cleaned.as_str(), None)
    };

    let invalid = || AppError::Validation(format!("invalid time: {raw}"));

    let (hour, minute) = match clock.split_once(':') {
        Some((h, m)) => {
            if m.len() != 2 {
                return Err(invalid());
            }
            let hour: u32 = h.parse().map_err(|_| invalid())?;
            let minute: u32 = m.parse().map_err(|_| invalid())?;
            (hour, minute)
        }
        // A bare hour is only unambiguous with a meridiem ("6pm").
        None if meridiem.is_some() => (clock.parse().map_err(|_| invalid())?, 0),
        None => return Err(invalid()),
    };

    if minute > 59 {
        return Err(invalid());
    }

    let hour = match meridiem {
        Some(is_pm) => {
            if !(1..=12).contains(&hour) {
                return Err(invalid());
            }
            match (hour, is_pm) {
                (12, false) => 0,
                (12, true) => 12,
                (h, false) => h,
                (h, true) => h + 12,
            }
        }
        None => {
            if hour > 24 || (hour == 24 && minute != 0) {
                return Err(invalid());
            }
            hour
        }
    };

    Ok(hour * 60 + minute)
}

/// Render minutes since midnight as canonical `HH:MM`.
pub fn format_minutes(minutes: u32) -> String {
    format!("{:02}:{:02}", minutes / 60, minutes % 60)
}

/// Resolve a start/end pair into minute bounds.
///
/// An end of midnight (`00:00`, `12 am`) closes the day, i.e. 1440.
pub fn slot_bounds(start: &str, end: &str) -> AppResult<(u32, u32)> {
    let start_min = parse_minutes(start)?;
    let mut end_min = parse_minutes(end)?;
    if end_min == 0 {
        end_min = MINUTES_PER_DAY;
    }

    if start_min >= MINUTES_PER_DAY {
        return Err(AppError::Validation(format!("slot cannot start at {start}")));
    }
    if end_min <= start_min {
        return Err(AppError::Validation(format!(
            "slot end {end} must be after start {start}"
        )));
    }
    Ok((start_min, end_min))
}

/// Canonical `(start, end)` strings for a slot.
pub fn normalize_slot(start: &str, end: &str) -> AppResult<(String, String)> {
    let (s, e) = slot_bounds(start, end)?;
    Ok((format_minutes(s), format_minutes(e)))
}
