use chrono::Weekday;
use rusqlite::{Connection, TransactionBehavior};
use serde::Deserialize;

use crate::db::queries;
use crate::errors::{AppError, AppResult};
use crate::models::turf::validate_price;
use crate::models::{DayTemplate, SlotDefinition, Turf, WeekTemplate};
use crate::state::AppState;

const DEFAULT_ADVANCE_BOOKING_DAYS: i64 = 30;
pub const MAX_ADVANCE_BOOKING_DAYS: i64 = 365;

pub fn require_turf(conn: &Connection, turf_id: &str) -> AppResult<Turf> {
    queries::get_turf(conn, turf_id)?.ok_or_else(|| AppError::NotFound(format!("turf {turf_id}")))
}

fn advance_window(days: Option<i64>) -> AppResult<i64> {
    let days = days.unwrap_or(DEFAULT_ADVANCE_BOOKING_DAYS);
    if !(0..=MAX_ADVANCE_BOOKING_DAYS).contains(&days) {
        return Err(AppError::Validation(format!(
            "advance_booking_days must be between 0 and {MAX_ADVANCE_BOOKING_DAYS}"
        )));
    }
    Ok(days)
}

#[derive(Debug, Deserialize)]
pub struct NewTurf {
    pub name: String,
    pub base_price: f64,
    pub advance_booking_days: Option<i64>,
    #[serde(default)]
    pub template: WeekTemplate,
}

#[derive(Debug, Deserialize)]
pub struct DayTemplateInput {
    pub is_open: bool,
    #[serde(default)]
    pub slots: Vec<SlotDefinition>,
}

pub fn create_turf(state: &AppState, owner_id: &str, input: NewTurf) -> AppResult<Turf> {
    let name = input.name.trim();
    if name.is_empty() {
        return Err(AppError::Validation("turf name is required".into()));
    }
    validate_price(input.base_price)?;

    let advance_booking_days = advance_window(input.advance_booking_days)?;

    let template = input.template.validate()?;
    let now = state.clock.now();
    let turf = Turf {
        id: uuid::Uuid::new_v4().to_string(),
        owner_id: owner_id.to_string(),
        name: name.to_string(),
        base_price: input.base_price,
        advance_booking_days,
        days: template.days,
        created_at: now,
        updated_at: now,
    };

    let mut conn = state.conn()?;
    if queries::get_owner(&conn, owner_id)?.is_none() {
        return Err(AppError::NotFound(format!("owner {owner_id}")));
    }

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    queries::insert_turf(&tx, &turf)?;
    let created = require_turf(&tx, &turf.id)?;
    tx.commit()?;

    tracing::info!(turf_id = %created.id, owner_id = %owner_id, "turf created");
    Ok(created)
}

/// Replace one weekday of a turf's template. Only the turf's owner may do this.
///
/// Bindings on slots that keep their `(start, end)` pair are preserved.
pub fn set_day_template(
    state: &AppState,
    owner_id: &str,
    turf_id: &str,
    weekday: Weekday,
    input: DayTemplateInput,
) -> AppResult<Turf> {
    let day = DayTemplate {
        weekday,
        is_open: input.is_open,
        slots: input.slots,
    }
    .validate()?;

    let mut conn = state.conn()?;
    let turf = require_turf(&conn, turf_id)?;
    if turf.owner_id != owner_id {
        return Err(AppError::Forbidden);
    }

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    queries::replace_day_template(&tx, turf_id, &day)?;
    queries::touch_turf(&tx, turf_id, &state.clock.now())?;
    let updated = require_turf(&tx, turf_id)?;
    tx.commit()?;

    tracing::info!(
        turf_id = %turf_id,
        weekday = %weekday,
        slots = day.slots.len(),
        is_open = day.is_open,
        "day template updated"
    );
    Ok(updated)
}
