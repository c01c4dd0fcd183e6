use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, Sse};
use axum::Json;
use serde::{Deserialize, Serialize};
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::{BroadcastStream, IntervalStream};
use tokio_stream::StreamExt;

use crate::errors::AppResult;
use crate::handlers::auth::require_owner;
use crate::handlers::{parse_date, parse_opt_date};
use crate::models::turf::parse_weekday;
use crate::models::{Booking, Turf};
use crate::services::availability::{self, AvailableSlot};
use crate::services::booking::{self, Actor};
use crate::services::templates::{self, DayTemplateInput, NewTurf};
use crate::state::AppState;

// POST /api/turfs
pub async fn create_turf(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Json(body): Json<NewTurf>,
) -> AppResult<(StatusCode, Json<Turf>)> {
    let owner_id = require_owner(&actor)?;
    let turf = templates::create_turf(&state, owner_id, body)?;
    Ok((StatusCode::CREATED, Json(turf)))
}

// GET /api/turfs/:id
pub async fn get_turf(
    State(state): State<Arc<AppState>>,
    Path(turf_id): Path<String>,
) -> AppResult<Json<Turf>> {
    let conn = state.conn()?;
    Ok(Json(templates::require_turf(&conn, &turf_id)?))
}

// PUT /api/turfs/:id/days/:weekday
pub async fn set_day_template(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path((turf_id, weekday)): Path<(String, String)>,
    Json(body): Json<DayTemplateInput>,
) -> AppResult<Json<Turf>> {
    let owner_id = require_owner(&actor)?;
    let weekday = parse_weekday(&weekday)?;
    let turf = templates::set_day_template(&state, owner_id, &turf_id, weekday, body)?;
    Ok(Json(turf))
}

// GET /api/turfs/:id/availability?date=
#[derive(Deserialize)]
pub struct AvailabilityQuery {
    pub date: String,
}

#[derive(Serialize)]
pub struct AvailabilityResponse {
    pub turf_id: String,
    pub date: String,
    pub slots: Vec<AvailableSlot>,
}

pub async fn get_availability(
    State(state): State<Arc<AppState>>,
    Path(turf_id): Path<String>,
    Query(query): Query<AvailabilityQuery>,
) -> AppResult<Json<AvailabilityResponse>> {
    let date = parse_date(&query.date)?;
    let slots = availability::available_slots(&state, &turf_id, date).await?;
    Ok(Json(AvailabilityResponse {
        turf_id,
        date: date.format("%Y-%m-%d").to_string(),
        slots,
    }))
}

// GET /api/turfs/:id/slots/check?date=&start_time=&end_time=
#[derive(Deserialize)]
pub struct SlotCheckQuery {
    pub date: String,
    pub start_time: String,
    pub end_time: String,
}

#[derive(Serialize)]
pub struct SlotCheckResponse {
    pub available: bool,
    pub reason: Option<&'static str>,
}

pub async fn check_slot(
    State(state): State<Arc<AppState>>,
    Path(turf_id): Path<String>,
    Query(query): Query<SlotCheckQuery>,
) -> AppResult<Json<SlotCheckResponse>> {
    let date = parse_date(&query.date)?;
    let slot = availability::check_slot_availability(
        &state,
        &turf_id,
        date,
        &query.start_time,
        &query.end_time,
    )
    .await?;

    Ok(Json(SlotCheckResponse {
        available: slot.is_open(),
        reason: (!slot.is_open()).then(|| slot.describe()),
    }))
}

// GET /api/turfs/:id/bookings?date=
#[derive(Deserialize)]
pub struct TurfBookingsQuery {
    pub date: Option<String>,
}

pub async fn list_bookings(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(turf_id): Path<String>,
    Query(query): Query<TurfBookingsQuery>,
) -> AppResult<Json<Vec<Booking>>> {
    let owner_id = require_owner(&actor)?;
    let date = parse_opt_date(query.date.as_deref())?;
    let bookings = booking::list_turf_bookings(&state, owner_id, &turf_id, date)?;
    Ok(Json(bookings))
}

// GET /api/turfs/:id/events (SSE)
pub async fn events_stream(
    State(state): State<Arc<AppState>>,
    Path(turf_id): Path<String>,
) -> AppResult<Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>>>> {
    {
        let conn = state.conn()?;
        templates::require_turf(&conn, &turf_id)?;
    }

    let rx = state.events.subscribe();

    let live_stream = BroadcastStream::new(rx).filter_map(move |result| match result {
        Ok(event) if event.turf_id == turf_id => {
            let data = serde_json::to_string(&event).unwrap_or_default();
            Some(Ok(Event::default().data(data).event("slot_event")))
        }
        Ok(_) => None,
        Err(BroadcastStreamRecvError::Lagged(skipped)) => {
            tracing::debug!(skipped, "slot event subscriber lagged");
            None
        }
    });

    let keepalive_stream = IntervalStream::new(tokio::time::interval(Duration::from_secs(30)))
        .map(|_| Ok(Event::default().comment("keepalive")));

    Ok(Sse::new(live_stream.merge(keepalive_stream)))
}
