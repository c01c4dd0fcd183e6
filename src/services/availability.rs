//! Projects a turf's weekly template onto a calendar date.
//!
//! The booking ledger is the only source of "taken"; the binding cache on the
//! template is never consulted here.

use std::collections::HashSet;

use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};
use rusqlite::Connection;
use serde::Serialize;

use crate::db::queries;
use crate::errors::{AppError, AppResult};
use crate::models::slot_time::normalize_slot;
use crate::models::{OwnerStanding, Turf};
use crate::services::templates;
use crate::state::AppState;

/// Why a slot-instant can or cannot be reserved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotState {
    Open,
    Taken,
    Closed,
    Elapsed,
    NotOffered,
    OwnerUnavailable,
}

impl SlotState {
    pub fn is_open(&self) -> bool {
        matches!(self, SlotState::Open)
    }

    pub fn describe(&self) -> &'static str {
        match self {
            SlotState::Open => "slot is open",
            SlotState::Taken => "slot is already booked",
            SlotState::Closed => "turf is closed on this day",
            SlotState::Elapsed => "slot start time has passed",
            SlotState::NotOffered => "slot is not offered on this day",
            SlotState::OwnerUnavailable => "turf is not accepting bookings",
        }
    }

    /// Map a non-open state to the error a reservation attempt should see.
    pub fn ensure_open(self) -> AppResult<()> {
        match self {
            SlotState::Open => Ok(()),
            SlotState::Taken => Err(AppError::SlotConflict),
            other => Err(AppError::SlotUnavailable(other.describe().to_string())),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AvailableSlot {
    pub start_time: String,
    pub end_time: String,
    pub price: f64,
}

fn minutes_of_day(now: &NaiveDateTime) -> u32 {
    now.hour() * 60 + now.minute()
}

fn has_elapsed(date: &NaiveDate, start_minutes: u32, now: &NaiveDateTime) -> bool {
    let today = now.date();
    *date < today || (*date == today && start_minutes <= minutes_of_day(now))
}

/// Open slots for `date`, ordered by start time.
pub fn open_slots(
    conn: &Connection,
    turf: &Turf,
    standing: Option<OwnerStanding>,
    date: &NaiveDate,
    now: &NaiveDateTime,
) -> AppResult<Vec<AvailableSlot>> {
    if !standing.is_some_and(|s| s.can_take_bookings()) {
        return Ok(vec![]);
    }

    let Some(day) = turf.day(date.weekday()).filter(|d| d.is_open) else {
        return Ok(vec![]);
    };

    let booked: HashSet<(String, String)> = queries::booked_slots_for_date(conn, &turf.id, date)?
        .into_iter()
        .collect();

    let mut slots = Vec::with_capacity(day.slots.len());
    for slot in &day.slots {
        let (start, _) = slot.bounds()?;
        if has_elapsed(date, start, now) {
            continue;
        }
        if booked.contains(&(slot.start_time.clone(), slot.end_time.clone())) {
            continue;
        }
        slots.push((
            start,
            AvailableSlot {
                start_time: slot.start_time.clone(),
                end_time: slot.end_time.clone(),
                price: turf.resolve_price(slot),
            },
        ));
    }

    slots.sort_by_key(|(start, _)| *start);
    Ok(slots.into_iter().map(|(_, slot)| slot).collect())
}

/// The same filters as [`open_slots`], applied to one slot.
pub fn slot_state(
    conn: &Connection,
    turf: &Turf,
    standing: Option<OwnerStanding>,
    date: &NaiveDate,
    start_time: &str,
    end_time: &str,
    now: &NaiveDateTime,
) -> AppResult<SlotState> {
    let (start_time, end_time) = normalize_slot(start_time, end_time)?;

    if !standing.is_some_and(|s| s.can_take_bookings()) {
        return Ok(SlotState::OwnerUnavailable);
    }

    let Some(day) = turf.day(date.weekday()).filter(|d| d.is_open) else {
        return Ok(SlotState::Closed);
    };

    let Some(slot) = day.find_slot(&start_time, &end_time) else {
        return Ok(SlotState::NotOffered);
    };

    let (start, _) = slot.bounds()?;
    if has_elapsed(date, start, now) {
        return Ok(SlotState::Elapsed);
    }

    if queries::is_slot_booked(conn, &turf.id, date, &start_time, &end_time)? {
        return Ok(SlotState::Taken);
    }

    Ok(SlotState::Open)
}

pub async fn owner_standing(state: &AppState, owner_id: &str) -> AppResult<Option<OwnerStanding>> {
    Ok(state.owners.standing(owner_id).await?)
}

pub async fn available_slots(
    state: &AppState,
    turf_id: &str,
    date: NaiveDate,
) -> AppResult<Vec<AvailableSlot>> {
    let turf = {
        let conn = state.conn()?;
        templates::require_turf(&conn, turf_id)?
    };
    let standing = owner_standing(state, &turf.owner_id).await?;

    let conn = state.conn()?;
    open_slots(&conn, &turf, standing, &date, &state.clock.now())
}

pub async fn check_slot_availability(
    state: &AppState,
    turf_id: &str,
    date: NaiveDate,
    start_time: &str,
    end_time: &str,
) -> AppResult<SlotState> {
    let turf = {
        let conn = state.conn()?;
        templates::require_turf(&conn, turf_id)?
    };
    let standing = owner_standing(state, &turf.owner_id).await?;

    let conn = state.conn()?;
    slot_state(&conn, &turf, standing, &date, start_time, end_time, &state.clock.now())
}
