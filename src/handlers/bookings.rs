use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use crate::errors::AppResult;
use crate::handlers::auth::{require_customer, require_owner};
use crate::handlers::{parse_date, parse_opt_date};
use crate::models::{Booking, PaymentMethod, PaymentStatus};
use crate::services::booking::{self, Actor, Party, Reservation, ReservationRequest};
use crate::state::AppState;

// POST /api/bookings
#[derive(Deserialize)]
pub struct ReserveRequest {
    pub turf_id: String,
    pub date: String,
    pub start_time: String,
    pub end_time: String,
}

pub async fn reserve(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Json(body): Json<ReserveRequest>,
) -> AppResult<(StatusCode, Json<Reservation>)> {
    let customer_id = require_customer(&actor)?;
    let request = ReservationRequest {
        turf_id: body.turf_id,
        date: parse_date(&body.date)?,
        start_time: body.start_time,
        end_time: body.end_time,
        party: Party::Customer {
            customer_id: customer_id.to_string(),
        },
    };

    let reservation = booking::create_booking(&state, request).await?;
    Ok((StatusCode::CREATED, Json(reservation)))
}

// POST /api/turfs/:id/walk-ins
#[derive(Deserialize)]
pub struct WalkInRequest {
    /// Defaults to today; walk-ins are only taken for the current day.
    pub date: Option<String>,
    pub start_time: String,
    pub end_time: String,
    pub name: String,
    pub phone: Option<String>,
    pub payment_method: Option<PaymentMethod>,
    pub payment_status: Option<PaymentStatus>,
}

pub async fn walk_in(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(turf_id): Path<String>,
    Json(body): Json<WalkInRequest>,
) -> AppResult<(StatusCode, Json<Reservation>)> {
    let owner_id = require_owner(&actor)?;
    let date = match parse_opt_date(body.date.as_deref())? {
        Some(date) => date,
        None => state.clock.today(),
    };

    let request = ReservationRequest {
        turf_id,
        date,
        start_time: body.start_time,
        end_time: body.end_time,
        party: Party::WalkIn {
            owner_id: owner_id.to_string(),
            name: body.name,
            phone: body.phone,
            payment_method: body.payment_method.unwrap_or(PaymentMethod::Cash),
            payment_status: body.payment_status.unwrap_or(PaymentStatus::Pending),
        },
    };

    let reservation = booking::create_booking(&state, request).await?;
    Ok((StatusCode::CREATED, Json(reservation)))
}

// GET /api/bookings/:id
pub async fn get_booking(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(booking_id): Path<String>,
) -> AppResult<Json<Booking>> {
    Ok(Json(booking::get_booking(&state, &actor, &booking_id)?))
}

// POST /api/bookings/:id/cancel
#[derive(Deserialize, Default)]
pub struct CancelRequest {
    pub reason: Option<String>,
}

pub async fn cancel(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(booking_id): Path<String>,
    body: Option<Json<CancelRequest>>,
) -> AppResult<Json<Booking>> {
    let reason = body.and_then(|Json(b)| b.reason);
    Ok(Json(booking::cancel_booking(&state, &actor, &booking_id, reason)?))
}

// POST /api/bookings/checkin
#[derive(Deserialize)]
pub struct CheckInRequest {
    pub booking_code: String,
    pub turf_id: Option<String>,
    pub date: Option<String>,
}

pub async fn check_in(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Json(body): Json<CheckInRequest>,
) -> AppResult<Json<Booking>> {
    let owner_id = require_owner(&actor)?;
    let date = parse_opt_date(body.date.as_deref())?;
    let booking = booking::check_in(
        &state,
        owner_id,
        &body.booking_code,
        body.turf_id.as_deref(),
        date,
    )?;
    Ok(Json(booking))
}

// POST /api/bookings/:id/no-show
pub async fn no_show(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(booking_id): Path<String>,
) -> AppResult<Json<Booking>> {
    let owner_id = require_owner(&actor)?;
    Ok(Json(booking::mark_no_show(&state, owner_id, &booking_id)?))
}
