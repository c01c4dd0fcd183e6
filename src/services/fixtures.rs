//! Shared seed data for service unit tests.

use chrono::{NaiveDate, NaiveDateTime, Weekday};
use rusqlite::Connection;

use crate::db::{self, queries};
use crate::models::turf::WEEKDAYS;
use crate::models::{
    Booking, BookingStatus, BookingType, Customer, DayTemplate, Owner, OwnerStanding,
    PaymentMethod, PaymentStatus, Pricing, SlotDefinition, Turf,
};

pub const APPROVED: Option<OwnerStanding> = Some(OwnerStanding {
    is_approved: true,
    is_active: true,
});

pub fn db() -> Connection {
    db::init_db(":memory:").unwrap()
}

/// 2025-06-16, a Monday.
pub fn monday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 16).unwrap()
}

pub fn at(date: NaiveDate, hour: u32, minute: u32) -> NaiveDateTime {
    date.and_hms_opt(hour, minute, 0).unwrap()
}

/// Owner `owner-1`, customer `cust-1`, and turf `turf-1` open Monday to
/// Saturday with four slots, closed on Sunday.
pub fn seed_turf(conn: &Connection) -> Turf {
    queries::upsert_owner(
        conn,
        &Owner {
            id: "owner-1".into(),
            name: "Arena Owner".into(),
            phone: Some("+919800000001".into()),
            email: None,
            is_approved: true,
            is_active: true,
        },
    )
    .unwrap();
    queries::upsert_customer(
        conn,
        &Customer {
            id: "cust-1".into(),
            name: "Ravi".into(),
            phone: Some("+919800000002".into()),
            email: None,
        },
    )
    .unwrap();

    let slots = vec![
        SlotDefinition::new("06:00", "07:00", Some(800.0)).unwrap(),
        SlotDefinition::new("10:00", "11:00", None).unwrap(),
        SlotDefinition::new("18:00", "19:00", Some(800.0)).unwrap(),
        SlotDefinition::new("23:00", "00:00", None).unwrap(),
    ];
    let days = WEEKDAYS
        .iter()
        .map(|weekday| match weekday {
            Weekday::Sun => DayTemplate::closed(*weekday),
            _ => DayTemplate {
                weekday: *weekday,
                is_open: true,
                slots: slots.clone(),
            },
        })
        .collect();

    let created = at(monday() - chrono::Duration::days(30), 9, 0);
    let turf = Turf {
        id: "turf-1".into(),
        owner_id: "owner-1".into(),
        name: "Central Arena".into(),
        base_price: 600.0,
        advance_booking_days: 30,
        days,
        created_at: created,
        updated_at: created,
    };
    queries::insert_turf(conn, &turf).unwrap();
    queries::get_turf(conn, "turf-1").unwrap().unwrap()
}

pub fn booking(turf: &Turf, date: NaiveDate, start: &str, end: &str) -> Booking {
    let price = turf
        .day(chrono::Datelike::weekday(&date))
        .and_then(|d| d.find_slot(start, end))
        .map(|s| turf.resolve_price(s))
        .unwrap_or(turf.base_price);
    let pricing = Pricing::derive(start, end, price).unwrap();
    let created = at(monday() - chrono::Duration::days(1), 12, 0);

    Booking {
        id: uuid::Uuid::new_v4().to_string(),
        turf_id: turf.id.clone(),
        owner_id: turf.owner_id.clone(),
        customer_id: Some("cust-1".into()),
        walk_in_name: None,
        walk_in_phone: None,
        date,
        start_time: start.into(),
        end_time: end.into(),
        price_per_hour: pricing.price_per_hour,
        duration_minutes: pricing.duration_minutes,
        total_amount: pricing.total_amount,
        status: BookingStatus::Confirmed,
        payment_status: PaymentStatus::Pending,
        payment_method: PaymentMethod::Online,
        booking_type: BookingType::Online,
        booking_code: "4321".into(),
        payment_order_id: None,
        payment_id: None,
        payment_signature: None,
        paid_at: None,
        cancelled_at: None,
        cancelled_by: None,
        cancellation_reason: None,
        checked_in_at: None,
        review_email_sent: false,
        created_at: created,
        updated_at: created,
    }
}

pub fn insert_booking(
    conn: &Connection,
    turf: &Turf,
    date: NaiveDate,
    start: &str,
    end: &str,
) -> Booking {
    let booking = booking(turf, date, start, end);
    queries::insert_booking(conn, &booking).unwrap();
    booking
}
