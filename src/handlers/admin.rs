use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::Deserialize;

use crate::db::queries::{self, PaymentEventRecord};
use crate::errors::{AppError, AppResult};
use crate::handlers::auth::check_auth;
use crate::models::{Customer, Owner};
use crate::services::lifecycle::{self, SweepReport};
use crate::services::reconciler::{self, RebuildReport};
use crate::state::AppState;

// POST /api/admin/turfs/:id/rebuild-bindings
pub async fn rebuild_bindings(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(turf_id): Path<String>,
) -> AppResult<Json<RebuildReport>> {
    check_auth(&headers, &state.config.admin_token)?;

    let today = state.clock.today();
    let mut conn = state.conn()?;
    Ok(Json(reconciler::rebuild_bindings(&mut conn, &turf_id, &today)?))
}

// POST /api/admin/sweep
pub async fn run_sweep(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> AppResult<Json<SweepReport>> {
    check_auth(&headers, &state.config.admin_token)?;
    Ok(Json(lifecycle::sweep(&state).await?))
}

// PUT /api/admin/owners/:id
#[derive(Deserialize)]
pub struct OwnerRequest {
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    #[serde(default)]
    pub is_approved: bool,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

pub async fn upsert_owner(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(owner_id): Path<String>,
    Json(body): Json<OwnerRequest>,
) -> AppResult<Json<Owner>> {
    check_auth(&headers, &state.config.admin_token)?;
    if body.name.trim().is_empty() {
        return Err(AppError::Validation("name is required".into()));
    }

    let owner = Owner {
        id: owner_id,
        name: body.name.trim().to_string(),
        phone: body.phone,
        email: body.email,
        is_approved: body.is_approved,
        is_active: body.is_active,
    };
    let conn = state.conn()?;
    queries::upsert_owner(&conn, &owner)?;

    tracing::info!(
        owner_id = %owner.id,
        is_approved = owner.is_approved,
        is_active = owner.is_active,
        "owner updated"
    );
    Ok(Json(owner))
}

// PUT /api/admin/customers/:id
#[derive(Deserialize)]
pub struct CustomerRequest {
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
}

pub async fn upsert_customer(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(customer_id): Path<String>,
    Json(body): Json<CustomerRequest>,
) -> AppResult<Json<Customer>> {
    check_auth(&headers, &state.config.admin_token)?;
    if body.name.trim().is_empty() {
        return Err(AppError::Validation("name is required".into()));
    }

    let customer = Customer {
        id: customer_id,
        name: body.name.trim().to_string(),
        phone: body.phone,
        email: body.email,
    };
    let conn = state.conn()?;
    queries::upsert_customer(&conn, &customer)?;
    Ok(Json(customer))
}

// GET /api/admin/payment-events?limit=
#[derive(Deserialize)]
pub struct PaymentEventsQuery {
    pub limit: Option<i64>,
}

pub async fn payment_events(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<PaymentEventsQuery>,
) -> AppResult<Json<Vec<PaymentEventRecord>>> {
    check_auth(&headers, &state.config.admin_token)?;

    let limit = query.limit.unwrap_or(50).clamp(1, 500);
    let conn = state.conn()?;
    Ok(Json(queries::list_payment_events(&conn, limit)?))
}
