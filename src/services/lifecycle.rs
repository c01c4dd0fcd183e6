use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::db::queries;
use crate::errors::AppResult;
use crate::models::{Booking, BookingStatus};
use crate::services::notifications;
use crate::state::AppState;

#[derive(Debug, Default, Clone, Serialize, PartialEq, Eq)]
pub struct SweepReport {
    pub started: usize,
    pub completed: usize,
    pub notified: usize,
    pub failed: usize,
}

/// Where wall-clock time says a live booking should be.
pub fn due_status(booking: &Booking, now: &NaiveDateTime) -> AppResult<Option<BookingStatus>> {
    let (start, end) = booking.window()?;
    let target = if *now >= end {
        Some(BookingStatus::Completed)
    } else if *now >= start && booking.status == BookingStatus::Confirmed {
        Some(BookingStatus::InProgress)
    } else {
        None
    };
    Ok(target.filter(|t| booking.status.can_transition_to(*t)))
}

enum Advance {
    Unchanged,
    Started,
    Completed { notify: bool },
}

fn advance(state: &AppState, booking: &Booking, now: &NaiveDateTime) -> AppResult<Advance> {
    let Some(next) = due_status(booking, now)? else {
        return Ok(Advance::Unchanged);
    };

    let conn = state.conn()?;
    if !queries::update_booking_status(&conn, &booking.id, booking.status, next, now)? {
        // Cancelled or checked in since the sweep listed it.
        return Ok(Advance::Unchanged);
    }

    Ok(match next {
        BookingStatus::Completed => Advance::Completed {
            notify: queries::claim_review_notification(&conn, &booking.id)?,
        },
        _ => Advance::Started,
    })
}

/// Advance every live booking by wall-clock time.
///
/// Each booking is handled on its own; one bad row does not stop the sweep.
pub async fn sweep(state: &AppState) -> AppResult<SweepReport> {
    let now = state.clock.now();
    let bookings = {
        let conn = state.conn()?;
        queries::list_open_bookings(&conn)?
    };

    let mut report = SweepReport::default();
    for booking in bookings {
        match advance(state, &booking, &now) {
            Ok(Advance::Unchanged) => {}
            Ok(Advance::Started) => {
                tracing::info!(booking_id = %booking.id, "booking in progress");
                report.started += 1;
            }
            Ok(Advance::Completed { notify }) => {
                tracing::info!(booking_id = %booking.id, "booking completed");
                report.completed += 1;
                if notify {
                    notifications::send_review_request(state, &booking).await;
                    report.notified += 1;
                }
            }
            Err(e) => {
                tracing::error!(booking_id = %booking.id, error = %e, "lifecycle sweep failed for booking");
                report.failed += 1;
            }
        }
    }

    if report != SweepReport::default() {
        tracing::info!(
            started = report.started,
            completed = report.completed,
            notified = report.notified,
            failed = report.failed,
            "lifecycle sweep finished"
        );
    }
    Ok(report)
}

/// Background task running [`sweep`] on a fixed interval.
pub async fn run_lifecycle_scheduler(state: Arc<AppState>) {
    let mut interval = tokio::time::interval(Duration::from_secs(state.config.sweep_interval_secs));
    loop {
        interval.tick().await;
        if let Err(e) = sweep(&state).await {
            tracing::error!(error = %e, "lifecycle sweep aborted");
        }
    }
}
