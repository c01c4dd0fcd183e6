use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::errors::AppResult;
use crate::models::Booking;
use crate::services::payment;
use crate::state::AppState;

pub const SIGNATURE_HEADER: &str = "x-razorpay-signature";

// POST /api/payments/verify
#[derive(Deserialize)]
pub struct VerifyRequest {
    pub order_id: String,
    pub payment_id: String,
    pub signature: String,
}

pub async fn verify(
    State(state): State<Arc<AppState>>,
    Json(body): Json<VerifyRequest>,
) -> AppResult<Json<Booking>> {
    let booking =
        payment::verify_payment(&state, &body.order_id, &body.payment_id, &body.signature).await?;
    Ok(Json(booking))
}

// POST /api/payments/webhook
pub async fn webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<Json<Value>> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());

    let outcome = payment::handle_webhook(&state, &body, signature).await?;
    Ok(Json(json!({ "status": "ok", "outcome": outcome.as_str() })))
}
