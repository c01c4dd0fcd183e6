pub mod config;
pub mod db;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod services;
pub mod state;

use std::sync::Arc;

use axum::routing::{get, post, put};
use axum::Router;

use crate::state::AppState;

/// Every route the service exposes, without middleware layers.
pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handlers::health::health))
        .route("/api/turfs", post(handlers::turfs::create_turf))
        .route("/api/turfs/:id", get(handlers::turfs::get_turf))
        .route(
            "/api/turfs/:id/days/:weekday",
            put(handlers::turfs::set_day_template),
        )
        .route(
            "/api/turfs/:id/availability",
            get(handlers::turfs::get_availability),
        )
        .route("/api/turfs/:id/slots/check", get(handlers::turfs::check_slot))
        .route("/api/turfs/:id/bookings", get(handlers::turfs::list_bookings))
        .route("/api/turfs/:id/events", get(handlers::turfs::events_stream))
        .route("/api/turfs/:id/walk-ins", post(handlers::bookings::walk_in))
        .route("/api/bookings", post(handlers::bookings::reserve))
        .route("/api/bookings/checkin", post(handlers::bookings::check_in))
        .route("/api/bookings/:id", get(handlers::bookings::get_booking))
        .route("/api/bookings/:id/cancel", post(handlers::bookings::cancel))
        .route("/api/bookings/:id/no-show", post(handlers::bookings::no_show))
        .route("/api/payments/verify", post(handlers::payments::verify))
        .route("/api/payments/webhook", post(handlers::payments::webhook))
        .route(
            "/api/admin/turfs/:id/rebuild-bindings",
            post(handlers::admin::rebuild_bindings),
        )
        .route("/api/admin/sweep", post(handlers::admin::run_sweep))
        .route("/api/admin/owners/:id", put(handlers::admin::upsert_owner))
        .route(
            "/api/admin/customers/:id",
            put(handlers::admin::upsert_customer),
        )
        .route(
            "/api/admin/payment-events",
            get(handlers::admin::payment_events),
        )
        .with_state(state)
}
