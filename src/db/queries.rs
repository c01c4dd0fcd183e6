use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::{params, Connection};
use serde::Serialize;

use crate::errors::{AppError, AppResult};
use crate::models::turf::{weekday_from_index, weekday_index, WEEKDAYS};
use crate::models::{
    Booking, BookingStatus, BookingType, Customer, DayTemplate, Owner, PaymentMethod,
    PaymentStatus, SlotDefinition, Turf,
};

const TS_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn fmt_ts(ts: &NaiveDateTime) -> String {
    ts.format(TS_FORMAT).to_string()
}

pub fn fmt_date(date: &NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

fn parse_ts(s: &str) -> AppResult<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, TS_FORMAT)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("bad timestamp {s:?} in database: {e}")))
}

fn parse_date(s: &str) -> AppResult<NaiveDate> {
    NaiveDate::parse_from_str(s, DATE_FORMAT)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("bad date {s:?} in database: {e}")))
}

fn parse_opt_ts(s: Option<String>) -> AppResult<Option<NaiveDateTime>> {
    s.as_deref().map(parse_ts).transpose()
}

// ── Owners ──

pub fn upsert_owner(conn: &Connection, owner: &Owner) -> AppResult<()> {
    conn.execute(
        "INSERT INTO owners (id, name, phone, email, is_approved, is_active)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT(id) DO UPDATE SET
           name = excluded.name,
           phone = excluded.phone,
           email = excluded.email,
           is_approved = excluded.is_approved,
           is_active = excluded.is_active",
        params![
            owner.id,
            owner.name,
            owner.phone,
            owner.email,
            owner.is_approved,
            owner.is_active,
        ],
    )?;
    Ok(())
}

pub fn get_owner(conn: &Connection, id: &str) -> AppResult<Option<Owner>> {
    let result = conn.query_row(
        "SELECT id, name, phone, email, is_approved, is_active FROM owners WHERE id = ?1",
        params![id],
        |row| {
            Ok(Owner {
                id: row.get(0)?,
                name: row.get(1)?,
                phone: row.get(2)?,
                email: row.get(3)?,
                is_approved: row.get(4)?,
                is_active: row.get(5)?,
            })
        },
    );

    match result {
        Ok(owner) => Ok(Some(owner)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

// ── Customers ──

pub fn upsert_customer(conn: &Connection, customer: &Customer) -> AppResult<()> {
    conn.execute(
        "INSERT INTO customers (id, name, phone, email) VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(id) DO UPDATE SET
           name = excluded.name,
           phone = excluded.phone,
           email = excluded.email",
        params![customer.id, customer.name, customer.phone, customer.email],
    )?;
    Ok(())
}

pub fn get_customer(conn: &Connection, id: &str) -> AppResult<Option<Customer>> {
    let result = conn.query_row(
        "SELECT id, name, phone, email FROM customers WHERE id = ?1",
        params![id],
        |row| {
            Ok(Customer {
                id: row.get(0)?,
                name: row.get(1)?,
                phone: row.get(2)?,
                email: row.get(3)?,
            })
        },
    );

    match result {
        Ok(customer) => Ok(Some(customer)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

// ── Turfs & Templates ──

pub fn insert_turf(conn: &Connection, turf: &Turf) -> AppResult<()> {
    conn.execute(
        "INSERT INTO turfs (id, owner_id, name, base_price, advance_booking_days, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            turf.id,
            turf.owner_id,
            turf.name,
            turf.base_price,
            turf.advance_booking_days,
            fmt_ts(&turf.created_at),
            fmt_ts(&turf.updated_at),
        ],
    )?;

    for day in &turf.days {
        replace_day_template(conn, &turf.id, day)?;
    }
    Ok(())
}

/// Load a turf with all seven weekday templates, Monday first.
pub fn get_turf(conn: &Connection, id: &str) -> AppResult<Option<Turf>> {
    let result = conn.query_row(
        "SELECT id, owner_id, name, base_price, advance_booking_days, created_at, updated_at
         FROM turfs WHERE id = ?1",
        params![id],
        |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, f64>(3)?,
                row.get::<_, i64>(4)?,
                row.get::<_, String>(5)?,
                row.get::<_, String>(6)?,
            ))
        },
    );

    let (id, owner_id, name, base_price, advance_booking_days, created_at, updated_at) =
        match result {
            Ok(row) => row,
            Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(None),
            Err(e) => return Err(e.into()),
        };

    let mut days: Vec<DayTemplate> = WEEKDAYS.iter().map(|d| DayTemplate::closed(*d)).collect();

    let mut stmt = conn.prepare("SELECT weekday, is_open FROM turf_days WHERE turf_id = ?1")?;
    let rows = stmt.query_map(params![id], |row| {
        Ok((row.get::<_, u8>(0)?, row.get::<_, bool>(1)?))
    })?;
    for row in rows {
        let (weekday, is_open) = row?;
        days[weekday as usize].is_open = is_open;
    }

    let mut stmt = conn.prepare(
        "SELECT weekday, start_time, end_time, price, is_booked, bound_booking_id, bound_date
         FROM template_slots WHERE turf_id = ?1 ORDER BY weekday, position",
    )?;
    let rows = stmt.query_map(params![id], |row| {
        Ok((
            row.get::<_, u8>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, Option<f64>>(3)?,
            row.get::<_, bool>(4)?,
            row.get::<_, Option<String>>(5)?,
            row.get::<_, Option<String>>(6)?,
        ))
    })?;
    for row in rows {
        let (weekday, start_time, end_time, price, is_booked, bound_booking_id, bound_date) = row?;
        weekday_from_index(weekday)?;
        days[weekday as usize].slots.push(SlotDefinition {
            start_time,
            end_time,
            price,
            is_booked,
            bound_booking_id,
            bound_date: bound_date.as_deref().map(parse_date).transpose()?,
        });
    }

    Ok(Some(Turf {
        id,
        owner_id,
        name,
        base_price,
        advance_booking_days,
        days,
        created_at: parse_ts(&created_at)?,
        updated_at: parse_ts(&updated_at)?,
    }))
}

/// Replace one weekday's template.
///
/// Slots whose `(start, end)` survive keep their binding columns; slots that
/// disappear are deleted along with whatever they cached.
pub fn replace_day_template(conn: &Connection, turf_id: &str, day: &DayTemplate) -> AppResult<()> {
    let weekday = weekday_index(day.weekday);

    conn.execute(
        "INSERT INTO turf_days (turf_id, weekday, is_open) VALUES (?1, ?2, ?3)
         ON CONFLICT(turf_id, weekday) DO UPDATE SET is_open = excluded.is_open",
        params![turf_id, weekday, day.is_open],
    )?;

    let existing: Vec<(i64, String, String)> = {
        let mut stmt = conn.prepare(
            "SELECT id, start_time, end_time FROM template_slots WHERE turf_id = ?1 AND weekday = ?2",
        )?;
        let rows = stmt.query_map(params![turf_id, weekday], |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?))
        })?;
        let mut existing = vec![];
        for row in rows {
            existing.push(row?);
        }
        existing
    };

    for (slot_id, start, end) in existing {
        if day.find_slot(&start, &end).is_none() {
            conn.execute("DELETE FROM template_slots WHERE id = ?1", params![slot_id])?;
        }
    }

    for (position, slot) in day.slots.iter().enumerate() {
        conn.execute(
            "INSERT INTO template_slots (turf_id, weekday, position, start_time, end_time, price)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(turf_id, weekday, start_time, end_time) DO UPDATE SET
               position = excluded.position,
               price = excluded.price",
            params![
                turf_id,
                weekday,
                position as i64,
                slot.start_time,
                slot.end_time,
                slot.price,
            ],
        )?;
    }

    Ok(())
}

pub fn touch_turf(conn: &Connection, turf_id: &str, now: &NaiveDateTime) -> AppResult<()> {
    conn.execute(
        "UPDATE turfs SET updated_at = ?1 WHERE id = ?2",
        params![fmt_ts(now), turf_id],
    )?;
    Ok(())
}

// ── Slot Bindings ──

pub fn slot_exists(
    conn: &Connection,
    turf_id: &str,
    weekday: u8,
    start_time: &str,
    end_time: &str,
) -> AppResult<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM template_slots
         WHERE turf_id = ?1 AND weekday = ?2 AND start_time = ?3 AND end_time = ?4",
        params![turf_id, weekday, start_time, end_time],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

/// Compare-and-swap the binding cache onto a slot.
///
/// Succeeds unless the slot is already bound for `date`. Returns false when no
/// row changed.
pub fn bind_slot(
    conn: &Connection,
    turf_id: &str,
    weekday: u8,
    start_time: &str,
    end_time: &str,
    date: &NaiveDate,
    booking_id: &str,
) -> AppResult<bool> {
    let count = conn.execute(
        "UPDATE template_slots
         SET is_booked = 1, bound_booking_id = ?1, bound_date = ?2
         WHERE turf_id = ?3 AND weekday = ?4 AND start_time = ?5 AND end_time = ?6
           AND NOT (is_booked = 1 AND bound_date IS ?2)",
        params![booking_id, fmt_date(date), turf_id, weekday, start_time, end_time],
    )?;
    Ok(count > 0)
}

pub fn release_slot(
    conn: &Connection,
    turf_id: &str,
    weekday: u8,
    start_time: &str,
    end_time: &str,
    date: &NaiveDate,
) -> AppResult<bool> {
    let count = conn.execute(
        "UPDATE template_slots
         SET is_booked = 0, bound_booking_id = NULL, bound_date = NULL
         WHERE turf_id = ?1 AND weekday = ?2 AND start_time = ?3 AND end_time = ?4
           AND bound_date = ?5",
        params![turf_id, weekday, start_time, end_time, fmt_date(date)],
    )?;
    Ok(count > 0)
}

pub fn clear_bindings(conn: &Connection, turf_id: &str) -> AppResult<usize> {
    let count = conn.execute(
        "UPDATE template_slots
         SET is_booked = 0, bound_booking_id = NULL, bound_date = NULL
         WHERE turf_id = ?1 AND is_booked = 1",
        params![turf_id],
    )?;
    Ok(count)
}

// ── Bookings ──

const BOOKING_COLUMNS: &str = "id, turf_id, owner_id, customer_id, walk_in_name, walk_in_phone, \
    date, start_time, end_time, price_per_hour, duration_minutes, total_amount, status, \
    payment_status, payment_method, booking_type, booking_code, payment_order_id, payment_id, \
    payment_signature, paid_at, cancelled_at, cancelled_by, cancellation_reason, checked_in_at, \
    review_email_sent, created_at, updated_at";

pub fn insert_booking(conn: &Connection, booking: &Booking) -> AppResult<()> {
    conn.execute(
        &format!(
            "INSERT INTO bookings ({BOOKING_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14,
                     ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24, ?25, ?26, ?27, ?28)"
        ),
        params![
            booking.id,
            booking.turf_id,
            booking.owner_id,
            booking.customer_id,
            booking.walk_in_name,
            booking.walk_in_phone,
            fmt_date(&booking.date),
            booking.start_time,
            booking.end_time,
            booking.price_per_hour,
            booking.duration_minutes,
            booking.total_amount,
            booking.status.as_str(),
            booking.payment_status.as_str(),
            booking.payment_method.as_str(),
            booking.booking_type.as_str(),
            booking.booking_code,
            booking.payment_order_id,
            booking.payment_id,
            booking.payment_signature,
            booking.paid_at.as_ref().map(fmt_ts),
            booking.cancelled_at.as_ref().map(fmt_ts),
            booking.cancelled_by,
            booking.cancellation_reason,
            booking.checked_in_at.as_ref().map(fmt_ts),
            booking.review_email_sent,
            fmt_ts(&booking.created_at),
            fmt_ts(&booking.updated_at),
        ],
    )?;
    Ok(())
}

fn query_one_booking(
    conn: &Connection,
    where_clause: &str,
    params: impl rusqlite::Params,
) -> AppResult<Option<Booking>> {
    let result = conn.query_row(
        &format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE {where_clause}"),
        params,
        |row| Ok(parse_booking_row(row)),
    );

    match result {
        Ok(booking) => Ok(Some(booking?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn query_bookings(
    conn: &Connection,
    where_clause: &str,
    params: impl rusqlite::Params,
) -> AppResult<Vec<Booking>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {BOOKING_COLUMNS} FROM bookings WHERE {where_clause}"
    ))?;
    let rows = stmt.query_map(params, |row| Ok(parse_booking_row(row)))?;

    let mut bookings = vec![];
    for row in rows {
        bookings.push(row??);
    }
    Ok(bookings)
}

pub fn get_booking(conn: &Connection, id: &str) -> AppResult<Option<Booking>> {
    query_one_booking(conn, "id = ?1", params![id])
}

pub fn get_booking_by_order_id(conn: &Connection, order_id: &str) -> AppResult<Option<Booking>> {
    query_one_booking(conn, "payment_order_id = ?1", params![order_id])
}

pub fn get_booking_by_payment_id(
    conn: &Connection,
    payment_id: &str,
) -> AppResult<Option<Booking>> {
    query_one_booking(conn, "payment_id = ?1", params![payment_id])
}

/// `(start_time, end_time)` of every non-cancelled booking on a turf for a date.
pub fn booked_slots_for_date(
    conn: &Connection,
    turf_id: &str,
    date: &NaiveDate,
) -> AppResult<Vec<(String, String)>> {
    let mut stmt = conn.prepare(
        "SELECT start_time, end_time FROM bookings
         WHERE turf_id = ?1 AND date = ?2 AND status != 'cancelled'",
    )?;
    let rows = stmt.query_map(params![turf_id, fmt_date(date)], |row| {
        Ok((row.get(0)?, row.get(1)?))
    })?;

    let mut slots = vec![];
    for row in rows {
        slots.push(row?);
    }
    Ok(slots)
}

pub fn is_slot_booked(
    conn: &Connection,
    turf_id: &str,
    date: &NaiveDate,
    start_time: &str,
    end_time: &str,
) -> AppResult<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM bookings
         WHERE turf_id = ?1 AND date = ?2 AND start_time = ?3 AND end_time = ?4
           AND status != 'cancelled'",
        params![turf_id, fmt_date(date), start_time, end_time],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

pub fn booking_code_in_use(conn: &Connection, code: &str) -> AppResult<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM bookings
         WHERE booking_code = ?1 AND status IN ('confirmed', 'in_progress')",
        params![code],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

/// Earliest confirmed booking holding `code`, optionally narrowed to a turf and date.
pub fn find_confirmed_by_code(
    conn: &Connection,
    code: &str,
    turf_id: Option<&str>,
    date: Option<&NaiveDate>,
) -> AppResult<Option<Booking>> {
    query_one_booking(
        conn,
        "booking_code = ?1 AND status = 'confirmed'
           AND (?2 IS NULL OR turf_id = ?2)
           AND (?3 IS NULL OR date = ?3)
         ORDER BY date ASC, start_time ASC, created_at ASC
         LIMIT 1",
        params![code, turf_id, date.map(fmt_date)],
    )
}

pub fn list_turf_bookings(
    conn: &Connection,
    turf_id: &str,
    date: Option<&NaiveDate>,
) -> AppResult<Vec<Booking>> {
    query_bookings(
        conn,
        "turf_id = ?1 AND (?2 IS NULL OR date = ?2) ORDER BY date ASC, start_time ASC",
        params![turf_id, date.map(fmt_date)],
    )
}

/// Bookings the lifecycle sweep still has to look at.
pub fn list_open_bookings(conn: &Connection) -> AppResult<Vec<Booking>> {
    query_bookings(
        conn,
        "status IN ('confirmed', 'in_progress') ORDER BY date ASC, start_time ASC",
        [],
    )
}

/// Live bookings dated on or after `from`, oldest reservation first.
pub fn list_bindable_bookings(
    conn: &Connection,
    turf_id: &str,
    from: &NaiveDate,
) -> AppResult<Vec<Booking>> {
    query_bookings(
        conn,
        "turf_id = ?1 AND date >= ?2 AND status IN ('confirmed', 'in_progress')
         ORDER BY created_at ASC, rowid ASC",
        params![turf_id, fmt_date(from)],
    )
}

/// Move a booking from `from` to `to`. Returns false if it was no longer in `from`.
pub fn update_booking_status(
    conn: &Connection,
    id: &str,
    from: BookingStatus,
    to: BookingStatus,
    now: &NaiveDateTime,
) -> AppResult<bool> {
    let count = conn.execute(
        "UPDATE bookings SET status = ?1, updated_at = ?2 WHERE id = ?3 AND status = ?4",
        params![to.as_str(), fmt_ts(now), id, from.as_str()],
    )?;
    Ok(count > 0)
}

pub fn mark_cancelled(
    conn: &Connection,
    id: &str,
    from: BookingStatus,
    cancelled_by: &str,
    reason: Option<&str>,
    now: &NaiveDateTime,
) -> AppResult<bool> {
    let now = fmt_ts(now);
    let count = conn.execute(
        "UPDATE bookings
         SET status = 'cancelled', cancelled_at = ?1, cancelled_by = ?2,
             cancellation_reason = ?3, updated_at = ?1
         WHERE id = ?4 AND status = ?5",
        params![now, cancelled_by, reason, id, from.as_str()],
    )?;
    Ok(count > 0)
}

pub fn mark_checked_in(conn: &Connection, id: &str, now: &NaiveDateTime) -> AppResult<bool> {
    let now = fmt_ts(now);
    let count = conn.execute(
        "UPDATE bookings
         SET status = 'in_progress', checked_in_at = ?1, updated_at = ?1
         WHERE id = ?2 AND status = 'confirmed'",
        params![now, id],
    )?;
    Ok(count > 0)
}

/// First application of a captured payment. Returns false when already paid.
pub fn mark_paid(
    conn: &Connection,
    order_id: &str,
    payment_id: &str,
    signature: Option<&str>,
    now: &NaiveDateTime,
) -> AppResult<bool> {
    let now = fmt_ts(now);
    let count = conn.execute(
        "UPDATE bookings
         SET payment_status = 'paid', payment_method = 'online', payment_id = ?1,
             payment_signature = COALESCE(?2, payment_signature), paid_at = ?3, updated_at = ?3
         WHERE payment_order_id = ?4 AND payment_status NOT IN ('paid', 'refunded')",
        params![payment_id, signature, now, order_id],
    )?;
    Ok(count > 0)
}

/// Record a failed attempt. Never overrides a payment that already landed.
pub fn mark_payment_failed(
    conn: &Connection,
    order_id: &str,
    now: &NaiveDateTime,
) -> AppResult<bool> {
    let count = conn.execute(
        "UPDATE bookings SET payment_status = 'failed', updated_at = ?1
         WHERE payment_order_id = ?2 AND payment_status IN ('pending', 'failed')",
        params![fmt_ts(now), order_id],
    )?;
    Ok(count > 0)
}

pub fn mark_refunded(conn: &Connection, payment_id: &str, now: &NaiveDateTime) -> AppResult<bool> {
    let count = conn.execute(
        "UPDATE bookings SET payment_status = 'refunded', updated_at = ?1
         WHERE payment_id = ?2 AND payment_status IN ('paid', 'partial')",
        params![fmt_ts(now), payment_id],
    )?;
    Ok(count > 0)
}

/// Claim the one post-stay notification for a booking.
pub fn claim_review_notification(conn: &Connection, id: &str) -> AppResult<bool> {
    let count = conn.execute(
        "UPDATE bookings SET review_email_sent = 1 WHERE id = ?1 AND review_email_sent = 0",
        params![id],
    )?;
    Ok(count > 0)
}

fn parse_booking_row(row: &rusqlite::Row) -> AppResult<Booking> {
    let date: String = row.get(6)?;
    let status: String = row.get(12)?;
    let payment_status: String = row.get(13)?;
    let payment_method: String = row.get(14)?;
    let booking_type: String = row.get(15)?;
    let created_at: String = row.get(26)?;
    let updated_at: String = row.get(27)?;

    Ok(Booking {
        id: row.get(0)?,
        turf_id: row.get(1)?,
        owner_id: row.get(2)?,
        customer_id: row.get(3)?,
        walk_in_name: row.get(4)?,
        walk_in_phone: row.get(5)?,
        date: parse_date(&date)?,
        start_time: row.get(7)?,
        end_time: row.get(8)?,
        price_per_hour: row.get(9)?,
        duration_minutes: row.get(10)?,
        total_amount: row.get(11)?,
        status: BookingStatus::parse(&status)?,
        payment_status: PaymentStatus::parse(&payment_status)?,
        payment_method: PaymentMethod::parse(&payment_method)?,
        booking_type: BookingType::parse(&booking_type)?,
        booking_code: row.get(16)?,
        payment_order_id: row.get(17)?,
        payment_id: row.get(18)?,
        payment_signature: row.get(19)?,
        paid_at: parse_opt_ts(row.get(20)?)?,
        cancelled_at: parse_opt_ts(row.get(21)?)?,
        cancelled_by: row.get(22)?,
        cancellation_reason: row.get(23)?,
        checked_in_at: parse_opt_ts(row.get(24)?)?,
        review_email_sent: row.get(25)?,
        created_at: parse_ts(&created_at)?,
        updated_at: parse_ts(&updated_at)?,
    })
}

// ── Payment Events ──

#[derive(Debug, Clone, Serialize)]
pub struct PaymentEventRecord {
    pub id: i64,
    pub source: String,
    pub event: String,
    pub order_id: Option<String>,
    pub payment_id: Option<String>,
    pub outcome: String,
    pub received_at: String,
}

pub fn record_payment_event(
    conn: &Connection,
    source: &str,
    event: &str,
    order_id: Option<&str>,
    payment_id: Option<&str>,
    outcome: &str,
) -> AppResult<i64> {
    conn.execute(
        "INSERT INTO payment_events (source, event, order_id, payment_id, outcome)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![source, event, order_id, payment_id, outcome],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn list_payment_events(conn: &Connection, limit: i64) -> AppResult<Vec<PaymentEventRecord>> {
    let mut stmt = conn.prepare(
        "SELECT id, source, event, order_id, payment_id, outcome, received_at
         FROM payment_events ORDER BY id DESC LIMIT ?1",
    )?;
    let rows = stmt.query_map(params![limit], |row| {
        Ok(PaymentEventRecord {
            id: row.get(0)?,
            source: row.get(1)?,
            event: row.get(2)?,
            order_id: row.get(3)?,
            payment_id: row.get(4)?,
            outcome: row.get(5)?,
            received_at: row.get(6)?,
        })
    })?;

    let mut events = vec![];
    for row in rows {
        events.push(row?);
    }
    Ok(events)
}
