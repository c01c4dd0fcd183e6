//! Keeps the per-date binding cache on template slots in step with the ledger.
//!
//! `bind` and `release` run on whatever connection or transaction the caller
//! holds, so they commit or roll back together with the booking row.

use chrono::{Datelike, NaiveDate};
use rusqlite::{Connection, TransactionBehavior};
use serde::Serialize;

use crate::db::queries;
use crate::errors::{AppError, AppResult};
use crate::models::turf::weekday_index;

pub fn bind(
    conn: &Connection,
    turf_id: &str,
    date: &NaiveDate,
    start_time: &str,
    end_time: &str,
    booking_id: &str,
) -> AppResult<()> {
    let weekday = weekday_index(date.weekday());
    if queries::bind_slot(conn, turf_id, weekday, start_time, end_time, date, booking_id)? {
        return Ok(());
    }

    if queries::slot_exists(conn, turf_id, weekday, start_time, end_time)? {
        Err(AppError::AlreadyBound {
            date: queries::fmt_date(date),
        })
    } else {
        Err(AppError::NotFound(format!(
            "slot {start_time}-{end_time} on {}",
            date.weekday()
        )))
    }
}

/// Clear the binding if it still points at `date`. Returns whether anything changed.
pub fn release(
    conn: &Connection,
    turf_id: &str,
    date: &NaiveDate,
    start_time: &str,
    end_time: &str,
) -> AppResult<bool> {
    let weekday = weekday_index(date.weekday());
    queries::release_slot(conn, turf_id, weekday, start_time, end_time, date)
}

#[derive(Debug, Default, Serialize)]
pub struct RebuildReport {
    pub cleared: usize,
    pub bound: usize,
    pub skipped: usize,
}

/// Recompute every binding of a turf from the ledger.
pub fn rebuild_bindings(
    conn: &mut Connection,
    turf_id: &str,
    today: &NaiveDate,
) -> AppResult<RebuildReport> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    if queries::get_turf(&tx, turf_id)?.is_none() {
        return Err(AppError::NotFound(format!("turf {turf_id}")));
    }

    let mut report = RebuildReport {
        cleared: queries::clear_bindings(&tx, turf_id)?,
        ..Default::default()
    };

    for booking in queries::list_bindable_bookings(&tx, turf_id, today)? {
        match bind(
            &tx,
            turf_id,
            &booking.date,
            &booking.start_time,
            &booking.end_time,
            &booking.id,
        ) {
            Ok(()) => report.bound += 1,
            Err(AppError::NotFound(_)) | Err(AppError::AlreadyBound { .. }) => {
                tracing::warn!(
                    booking_id = %booking.id,
                    turf_id = %turf_id,
                    date = %booking.date,
                    "booking has no bindable template slot"
                );
                report.skipped += 1;
            }
            Err(e) => return Err(e),
        }
    }

    tx.commit()?;

    tracing::info!(
        turf_id = %turf_id,
        cleared = report.cleared,
        bound = report.bound,
        skipped = report.skipped,
        "rebuilt slot bindings"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BookingStatus, Turf};
    use crate::services::fixtures::{self, at, monday};

    fn slot(turf: &Turf, date: &NaiveDate, start: &str) -> crate::models::SlotDefinition {
        turf.day(date.weekday())
            .unwrap()
            .slots
            .iter()
            .find(|s| s.start_time == start)
            .unwrap()
            .clone()
    }

    fn reload(conn: &Connection) -> Turf {
        queries::get_turf(conn, "turf-1").unwrap().unwrap()
    }

    #[test]
    fn test_bind_then_rebind_same_date_fails() {
        let conn = fixtures::db();
        fixtures::seed_turf(&conn);

        bind(&conn, "turf-1", &monday(), "18:00", "19:00", "b1").unwrap();
        let turf = reload(&conn);
        let bound = slot(&turf, &monday(), "18:00");
        assert!(bound.is_booked);
        assert_eq!(bound.bound_booking_id.as_deref(), Some("b1"));
        assert_eq!(bound.bound_date, Some(monday()));

        let err = bind(&conn, "turf-1", &monday(), "18:00", "19:00", "b2").unwrap_err();
        assert!(matches!(err, AppError::AlreadyBound { .. }));
    }

    #[test]
    fn test_bind_overwrites_other_date() {
        let conn = fixtures::db();
        fixtures::seed_turf(&conn);
        let next_monday = monday() + chrono::Duration::days(7);

        bind(&conn, "turf-1", &monday(), "18:00", "19:00", "b1").unwrap();
        bind(&conn, "turf-1", &next_monday, "18:00", "19:00", "b2").unwrap();

        let bound = slot(&reload(&conn), &monday(), "18:00");
        assert_eq!(bound.bound_date, Some(next_monday));
        assert_eq!(bound.bound_booking_id.as_deref(), Some("b2"));
    }

    #[test]
    fn test_bind_missing_slot() {
        let conn = fixtures::db();
        fixtures::seed_turf(&conn);
        let err = bind(&conn, "turf-1", &monday(), "07:00", "08:00", "b1").unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[test]
    fn test_release_ignores_stale_date() {
        let conn = fixtures::db();
        fixtures::seed_turf(&conn);
        let next_monday = monday() + chrono::Duration::days(7);

        bind(&conn, "turf-1", &next_monday, "18:00", "19:00", "b2").unwrap();
        assert!(!release(&conn, "turf-1", &monday(), "18:00", "19:00").unwrap());
        assert!(slot(&reload(&conn), &monday(), "18:00").is_booked);

        assert!(release(&conn, "turf-1", &next_monday, "18:00", "19:00").unwrap());
        let cleared = slot(&reload(&conn), &monday(), "18:00");
        assert!(!cleared.is_booked);
        assert_eq!(cleared.bound_booking_id, None);
    }

    #[test]
    fn test_rebuild_replays_live_bookings_in_creation_order() {
        let mut conn = fixtures::db();
        let turf = fixtures::seed_turf(&conn);
        let next_monday = monday() + chrono::Duration::days(7);

        let mut first = fixtures::booking(&turf, monday(), "18:00", "19:00");
        first.created_at = at(monday(), 7, 0);
        queries::insert_booking(&conn, &first).unwrap();

        let mut second = fixtures::booking(&turf, next_monday, "18:00", "19:00");
        second.created_at = at(monday(), 7, 30);
        queries::insert_booking(&conn, &second).unwrap();

        let cancelled = fixtures::insert_booking(&conn, &turf, monday(), "10:00", "11:00");
        queries::mark_cancelled(&conn, &cancelled.id, BookingStatus::Confirmed, "cust-1", None, &at(monday(), 7, 0))
            .unwrap();

        let past = fixtures::insert_booking(&conn, &turf, monday() - chrono::Duration::days(2), "06:00", "07:00");

        // Corrupt the cache.
        bind(&conn, "turf-1", &monday(), "10:00", "11:00", &cancelled.id).unwrap();
        bind(&conn, "turf-1", &past.date, "06:00", "07:00", &past.id).unwrap();

        let report = rebuild_bindings(&mut conn, "turf-1", &monday()).unwrap();
        assert_eq!(report.cleared, 2);
        assert_eq!(report.bound, 2);
        assert_eq!(report.skipped, 0);

        let turf = reload(&conn);
        let evening = slot(&turf, &monday(), "18:00");
        assert_eq!(evening.bound_booking_id.as_deref(), Some(second.id.as_str()));
        assert!(!slot(&turf, &monday(), "10:00").is_booked);
        assert!(!slot(&turf, &past.date, "06:00").is_booked);
    }

    #[test]
    fn test_rebuild_unknown_turf() {
        let mut conn = fixtures::db();
        let err = rebuild_bindings(&mut conn, "nope", &monday()).unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
