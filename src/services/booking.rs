//! Booking ledger: reservation, cancellation, check-in and no-show.
//!
//! A reservation claims `(turf, date, start, end)` in one IMMEDIATE transaction
//! that re-reads the ledger, flips the template binding and inserts the row.
//! The partial unique index on live bookings backs this up if two writers ever
//! get past the re-read together.

use chrono::{Datelike, Days, Duration, NaiveDate};
use rand::Rng;
use rusqlite::{Connection, TransactionBehavior};
use serde::{Deserialize, Serialize};

use crate::db::queries;
use crate::errors::{AppError, AppResult};
use crate::models::slot_time::normalize_slot;
use crate::models::{
    Booking, BookingStatus, BookingType, PaymentMethod, PaymentStatus, Pricing, Turf,
};
use crate::services::availability::{self, SlotState};
use crate::services::events::{self, SlotEvent, SlotEventKind};
use crate::services::notifications;
use crate::services::payment::{OrderRequest, ProviderOrder};
use crate::services::reconciler;
use crate::services::templates;
use crate::state::AppState;

const CODE_ATTEMPTS: usize = 10;

/// Who a reservation is for.
#[derive(Debug, Clone)]
pub enum Party {
    Customer {
        customer_id: String,
    },
    /// Booked at the desk by the turf's owner.
    WalkIn {
        owner_id: String,
        name: String,
        phone: Option<String>,
        payment_method: PaymentMethod,
        payment_status: PaymentStatus,
    },
}

#[derive(Debug, Clone)]
pub struct ReservationRequest {
    pub turf_id: String,
    pub date: NaiveDate,
    pub start_time: String,
    pub end_time: String,
    pub party: Party,
}

#[derive(Debug, Clone, Serialize)]
pub struct Reservation {
    pub booking: Booking,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment: Option<CheckoutDetails>,
}

/// What the client needs to open the provider's checkout.
#[derive(Debug, Clone, Serialize)]
pub struct CheckoutDetails {
    pub key_id: String,
    pub order_id: String,
    pub amount_minor: i64,
    pub currency: String,
}

/// Caller identity as asserted by the upstream identity layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub id: String,
    pub role: ActorRole,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorRole {
    Customer,
    Owner,
}

impl ActorRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActorRole::Customer => "customer",
            ActorRole::Owner => "owner",
        }
    }

    pub fn parse(s: &str) -> AppResult<Self> {
        match s.trim().to_lowercase().as_str() {
            "customer" => Ok(ActorRole::Customer),
            "owner" => Ok(ActorRole::Owner),
            other => Err(AppError::Validation(format!("unknown actor role: {other}"))),
        }
    }
}

impl Actor {
    /// True when the actor is the booking's customer or the turf's owner.
    pub fn may_manage(&self, booking: &Booking) -> bool {
        match self.role {
            ActorRole::Customer => booking.customer_id.as_deref() == Some(self.id.as_str()),
            ActorRole::Owner => booking.owner_id == self.id,
        }
    }
}

fn required(value: &str, field: &str) -> AppResult<()> {
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{field} is required")));
    }
    Ok(())
}

fn resolve_pricing(turf: &Turf, date: &NaiveDate, start: &str, end: &str) -> AppResult<Pricing> {
    let slot = turf
        .day(date.weekday())
        .and_then(|d| d.find_slot(start, end))
        .ok_or_else(|| AppError::SlotUnavailable(SlotState::NotOffered.describe().into()))?;
    Pricing::derive(start, end, turf.resolve_price(slot))
}

/// Sample a 4-digit check-in code not held by any live booking.
///
/// Gives up after a bounded number of draws and returns an unchecked sample;
/// codes are a convenience key, not an identity.
pub fn generate_booking_code(conn: &Connection) -> AppResult<String> {
    let mut rng = rand::rng();
    for _ in 0..CODE_ATTEMPTS {
        let code = rng.random_range(1000..=9999).to_string();
        if !queries::booking_code_in_use(conn, &code)? {
            return Ok(code);
        }
    }
    tracing::warn!("booking code space congested, using unchecked code");
    Ok(rng.random_range(1000..=9999).to_string())
}

/// Window and policy checks that do not depend on current bookings.
fn check_booking_window(turf: &Turf, party: &Party, date: &NaiveDate, today: &NaiveDate) -> AppResult<()> {
    match party {
        Party::WalkIn { owner_id, .. } => {
            if *owner_id != turf.owner_id {
                return Err(AppError::Forbidden);
            }
            if date != today {
                return Err(AppError::Policy(
                    "offline bookings are allowed for today only".into(),
                ));
            }
        }
        Party::Customer { .. } => {
            if date < today {
                return Err(AppError::Policy("cannot book a date in the past".into()));
            }
            let last = u64::try_from(turf.advance_booking_days)
                .ok()
                .and_then(|days| today.checked_add_days(Days::new(days)))
                .ok_or_else(|| {
                    AppError::Validation(format!(
                        "invalid advance booking window: {} days",
                        turf.advance_booking_days
                    ))
                })?;
            if *date > last {
                return Err(AppError::Policy(format!(
                    "bookings open at most {} days in advance",
                    turf.advance_booking_days
                )));
            }
        }
    }
    Ok(())
}

/// Reserve one slot-instant.
///
/// Online reservations get a provider order before anything is written, so a
/// provider failure leaves no trace in the ledger.
pub async fn create_booking(state: &AppState, request: ReservationRequest) -> AppResult<Reservation> {
    required(&request.turf_id, "turf_id")?;
    required(&request.start_time, "start_time")?;
    required(&request.end_time, "end_time")?;
    match &request.party {
        Party::Customer { customer_id } => required(customer_id, "customer_id")?,
        Party::WalkIn { name, payment_status, .. } => {
            required(name, "walk_in_name")?;
            if matches!(payment_status, PaymentStatus::Refunded | PaymentStatus::Failed) {
                return Err(AppError::Validation(
                    "walk-in payment status must be pending, paid or partial".into(),
                ));
            }
        }
    }
    let (start_time, end_time) = normalize_slot(&request.start_time, &request.end_time)?;
    let date = request.date;

    let turf = {
        let conn = state.conn()?;
        templates::require_turf(&conn, &request.turf_id)?
    };

    let now = state.clock.now();
    check_booking_window(&turf, &request.party, &date, &now.date())?;

    let standing = availability::owner_standing(state, &turf.owner_id).await?;
    {
        let conn = state.conn()?;
        if let Party::Customer { customer_id } = &request.party {
            if queries::get_customer(&conn, customer_id)?.is_none() {
                return Err(AppError::NotFound(format!("customer {customer_id}")));
            }
        }
        availability::slot_state(&conn, &turf, standing, &date, &start_time, &end_time, &now)?
            .ensure_open()?;
    }

    let pricing = resolve_pricing(&turf, &date, &start_time, &end_time)?;
    let booking_id = uuid::Uuid::new_v4().to_string();

    let order = match &request.party {
        Party::Customer { .. } => {
            Some(create_order(state, &booking_id, &turf, &date, &start_time, &pricing).await?)
        }
        Party::WalkIn { .. } => None,
    };

    let (customer_id, walk_in_name, walk_in_phone, payment_method, payment_status, booking_type) =
        match &request.party {
            Party::Customer { customer_id } => (
                Some(customer_id.clone()),
                None,
                None,
                PaymentMethod::Online,
                PaymentStatus::Pending,
                BookingType::Online,
            ),
            Party::WalkIn {
                name,
                phone,
                payment_method,
                payment_status,
                ..
            } => (
                None,
                Some(name.trim().to_string()),
                phone.clone().filter(|p| !p.trim().is_empty()),
                *payment_method,
                *payment_status,
                BookingType::Offline,
            ),
        };

    let now = state.clock.now();
    let mut booking = Booking {
        id: booking_id,
        turf_id: turf.id.clone(),
        owner_id: turf.owner_id.clone(),
        customer_id,
        walk_in_name,
        walk_in_phone,
        date,
        start_time,
        end_time,
        price_per_hour: pricing.price_per_hour,
        duration_minutes: pricing.duration_minutes,
        total_amount: pricing.total_amount,
        status: BookingStatus::Confirmed,
        payment_status,
        payment_method,
        booking_type,
        booking_code: String::new(),
        payment_order_id: order.as_ref().map(|o| o.order_id.clone()),
        payment_id: None,
        payment_signature: None,
        paid_at: matches!(payment_status, PaymentStatus::Paid).then_some(now),
        cancelled_at: None,
        cancelled_by: None,
        cancellation_reason: None,
        checked_in_at: None,
        review_email_sent: false,
        created_at: now,
        updated_at: now,
    };

    {
        let mut conn = state.conn()?;
        booking.booking_code = claim_slot(&mut conn, &booking)?;
    }

    tracing::info!(
        booking_id = %booking.id,
        turf_id = %booking.turf_id,
        date = %booking.date,
        start_time = %booking.start_time,
        end_time = %booking.end_time,
        booking_type = booking.booking_type.as_str(),
        "booking created"
    );

    events::publish(
        &state.events,
        SlotEvent {
            kind: SlotEventKind::Booked,
            turf_id: booking.turf_id.clone(),
            date: booking.date,
            start_time: booking.start_time.clone(),
            end_time: booking.end_time.clone(),
        },
    );

    if booking.booking_type == BookingType::Offline {
        notifications::send_confirmation(state, &booking).await;
    }

    let payment = order.map(|o| CheckoutDetails {
        key_id: state.payments.key_id().to_string(),
        order_id: o.order_id,
        amount_minor: o.amount_minor,
        currency: o.currency,
    });

    Ok(Reservation { booking, payment })
}

async fn create_order(
    state: &AppState,
    booking_id: &str,
    turf: &Turf,
    date: &NaiveDate,
    start_time: &str,
    pricing: &Pricing,
) -> AppResult<ProviderOrder> {
    let request = OrderRequest {
        amount_minor: pricing.amount_minor(),
        currency: state.config.payment_currency.clone(),
        receipt: booking_id.to_string(),
        notes: serde_json::json!({
            "booking_id": booking_id,
            "turf_id": turf.id,
            "date": queries::fmt_date(date),
            "start_time": start_time,
        }),
    };

    state.payments.create_order(&request).await.map_err(|e| {
        tracing::error!(booking_id = %booking_id, error = %e, "payment order creation failed");
        AppError::Payment(e.to_string())
    })
}

/// Re-check, bind and insert atomically. Returns the booking code used.
fn claim_slot(conn: &mut Connection, booking: &Booking) -> AppResult<String> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    if queries::is_slot_booked(&tx, &booking.turf_id, &booking.date, &booking.start_time, &booking.end_time)? {
        return Err(AppError::SlotConflict);
    }

    match reconciler::bind(
        &tx,
        &booking.turf_id,
        &booking.date,
        &booking.start_time,
        &booking.end_time,
        &booking.id,
    ) {
        Ok(()) => {}
        Err(AppError::AlreadyBound { .. }) => return Err(AppError::SlotConflict),
        Err(AppError::NotFound(_)) => {
            return Err(AppError::SlotUnavailable(SlotState::NotOffered.describe().into()))
        }
        Err(e) => return Err(e),
    }

    let code = generate_booking_code(&tx)?;
    let row = Booking {
        booking_code: code.clone(),
        ..booking.clone()
    };
    match queries::insert_booking(&tx, &row) {
        Ok(()) => {}
        Err(AppError::Database(e)) if AppError::is_unique_violation(&e) => {
            return Err(AppError::SlotConflict)
        }
        Err(e) => return Err(e),
    }

    tx.commit()?;
    Ok(code)
}

fn require_booking(conn: &Connection, booking_id: &str) -> AppResult<Booking> {
    queries::get_booking(conn, booking_id)?
        .ok_or_else(|| AppError::NotFound(format!("booking {booking_id}")))
}

pub fn get_booking(state: &AppState, actor: &Actor, booking_id: &str) -> AppResult<Booking> {
    let conn = state.conn()?;
    let booking = require_booking(&conn, booking_id)?;
    if !actor.may_manage(&booking) {
        return Err(AppError::Forbidden);
    }
    Ok(booking)
}

/// Cancel a booking at least `cancellation_lead_minutes` before it starts.
///
/// Only `confirmed` bookings can be cancelled; one already checked in
/// (`in_progress`) fails with `InvalidTransition` even inside the window.
pub fn cancel_booking(
    state: &AppState,
    actor: &Actor,
    booking_id: &str,
    reason: Option<String>,
) -> AppResult<Booking> {
    let lead_minutes = state.config.cancellation_lead_minutes;
    let mut conn = state.conn()?;
    let booking = require_booking(&conn, booking_id)?;

    if !actor.may_manage(&booking) {
        return Err(AppError::Forbidden);
    }
    if booking.status.is_terminal() {
        return Err(AppError::InvalidTransition {
            from: booking.status.as_str(),
            to: BookingStatus::Cancelled.as_str(),
        });
    }

    let now = state.clock.now();
    let (start, _) = booking.window()?;
    if now > start - Duration::minutes(lead_minutes) {
        return Err(AppError::CancellationWindowClosed { lead_minutes });
    }
    booking.status.transition(BookingStatus::Cancelled)?;

    let reason = reason.map(|r| r.trim().to_string()).filter(|r| !r.is_empty());
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    if !queries::mark_cancelled(&tx, &booking.id, booking.status, &actor.id, reason.as_deref(), &now)? {
        return Err(AppError::InvalidTransition {
            from: booking.status.as_str(),
            to: BookingStatus::Cancelled.as_str(),
        });
    }
    reconciler::release(&tx, &booking.turf_id, &booking.date, &booking.start_time, &booking.end_time)?;
    let cancelled = require_booking(&tx, &booking.id)?;
    tx.commit()?;

    tracing::info!(
        booking_id = %cancelled.id,
        cancelled_by = %actor.id,
        role = actor.role.as_str(),
        "booking cancelled"
    );

    events::publish(
        &state.events,
        SlotEvent {
            kind: SlotEventKind::Released,
            turf_id: cancelled.turf_id.clone(),
            date: cancelled.date,
            start_time: cancelled.start_time.clone(),
            end_time: cancelled.end_time.clone(),
        },
    );

    Ok(cancelled)
}

/// Owner-side check-in by the short booking code.
pub fn check_in(
    state: &AppState,
    owner_id: &str,
    booking_code: &str,
    turf_id: Option<&str>,
    date: Option<NaiveDate>,
) -> AppResult<Booking> {
    required(booking_code, "booking_code")?;

    let conn = state.conn()?;
    let booking = queries::find_confirmed_by_code(&conn, booking_code.trim(), turf_id, date.as_ref())?
        .ok_or_else(|| AppError::NotFound(format!("booking with code {booking_code}")))?;

    if booking.owner_id != owner_id {
        return Err(AppError::Forbidden);
    }
    booking.status.transition(BookingStatus::InProgress)?;

    if !queries::mark_checked_in(&conn, &booking.id, &state.clock.now())? {
        return Err(AppError::InvalidTransition {
            from: booking.status.as_str(),
            to: BookingStatus::InProgress.as_str(),
        });
    }
    let checked_in = require_booking(&conn, &booking.id)?;

    tracing::info!(booking_id = %checked_in.id, turf_id = %checked_in.turf_id, "checked in");
    Ok(checked_in)
}

/// Owner marks a booking as a no-show. The slot stays claimed for the record.
pub fn mark_no_show(state: &AppState, owner_id: &str, booking_id: &str) -> AppResult<Booking> {
    let conn = state.conn()?;
    let booking = require_booking(&conn, booking_id)?;
    if booking.owner_id != owner_id {
        return Err(AppError::Forbidden);
    }

    let next = booking.status.transition(BookingStatus::NoShow)?;
    if !queries::update_booking_status(&conn, &booking.id, booking.status, next, &state.clock.now())? {
        return Err(AppError::InvalidTransition {
            from: booking.status.as_str(),
            to: next.as_str(),
        });
    }
    let updated = require_booking(&conn, &booking.id)?;

    tracing::info!(booking_id = %updated.id, "marked no-show");
    Ok(updated)
}

pub fn list_turf_bookings(
    state: &AppState,
    owner_id: &str,
    turf_id: &str,
    date: Option<NaiveDate>,
) -> AppResult<Vec<Booking>> {
    let conn = state.conn()?;
    let turf = templates::require_turf(&conn, turf_id)?;
    if turf.owner_id != owner_id {
        return Err(AppError::Forbidden);
    }
    queries::list_turf_bookings(&conn, turf_id, date.as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::fixtures::{self, monday};

    #[test]
    fn test_generate_code_is_four_digits() {
        let conn = fixtures::db();
        let code = generate_booking_code(&conn).unwrap();
        assert_eq!(code.len(), 4);
        assert!(code.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_claim_slot_conflicts_on_second_claim() {
        let mut conn = fixtures::db();
        let turf = fixtures::seed_turf(&conn);

        let first = fixtures::booking(&turf, monday(), "18:00", "19:00");
        claim_slot(&mut conn, &first).unwrap();

        let second = fixtures::booking(&turf, monday(), "18:00", "19:00");
        assert!(matches!(claim_slot(&mut conn, &second), Err(AppError::SlotConflict)));

        // Nothing from the losing attempt was written.
        assert!(queries::get_booking(&conn, &second.id).unwrap().is_none());
    }

    #[test]
    fn test_unique_index_is_last_line_of_defence() {
        let mut conn = fixtures::db();
        let turf = fixtures::seed_turf(&conn);

        // The cache was never bound for this row.
        let first = fixtures::insert_booking(&conn, &turf, monday(), "18:00", "19:00");
        let mut dup = fixtures::booking(&turf, monday(), "18:00", "19:00");
        dup.id = "dup".into();
        let err = queries::insert_booking(&conn, &dup).unwrap_err();
        match err {
            AppError::Database(e) => assert!(AppError::is_unique_violation(&e)),
            other => panic!("unexpected error: {other:?}"),
        }

        assert!(matches!(claim_slot(&mut conn, &dup), Err(AppError::SlotConflict)));
        assert!(queries::get_booking(&conn, &first.id).unwrap().is_some());
    }

    #[test]
    fn test_window_policy() {
        let conn = fixtures::db();
        let turf = fixtures::seed_turf(&conn);
        let today = monday();
        let customer = Party::Customer { customer_id: "cust-1".into() };
        let walk_in = Party::WalkIn {
            owner_id: "owner-1".into(),
            name: "Guest".into(),
            phone: None,
            payment_method: PaymentMethod::Cash,
            payment_status: PaymentStatus::Paid,
        };

        assert!(check_booking_window(&turf, &customer, &today, &today).is_ok());
        assert!(check_booking_window(&turf, &customer, &(today + Duration::days(30)), &today).is_ok());
        assert!(matches!(
            check_booking_window(&turf, &customer, &(today + Duration::days(31)), &today),
            Err(AppError::Policy(_))
        ));
        assert!(matches!(
            check_booking_window(&turf, &customer, &(today - Duration::days(1)), &today),
            Err(AppError::Policy(_))
        ));

        assert!(check_booking_window(&turf, &walk_in, &today, &today).is_ok());
        assert!(matches!(
            check_booking_window(&turf, &walk_in, &(today + Duration::days(1)), &today),
            Err(AppError::Policy(_))
        ));

        let mut unbounded = turf.clone();
        unbounded.advance_booking_days = 100_000_000;
        assert!(matches!(
            check_booking_window(&unbounded, &customer, &today, &today),
            Err(AppError::Validation(_))
        ));
        unbounded.advance_booking_days = -1;
        assert!(matches!(
            check_booking_window(&unbounded, &customer, &today, &today),
            Err(AppError::Validation(_))
        ));

        let stranger = Party::WalkIn {
            owner_id: "owner-2".into(),
            name: "Guest".into(),
            phone: None,
            payment_method: PaymentMethod::Cash,
            payment_status: PaymentStatus::Pending,
        };
        assert!(matches!(
            check_booking_window(&turf, &stranger, &today, &today),
            Err(AppError::Forbidden)
        ));
    }

    #[test]
    fn test_actor_may_manage() {
        let conn = fixtures::db();
        let turf = fixtures::seed_turf(&conn);
        let booking = fixtures::booking(&turf, monday(), "18:00", "19:00");

        let customer = Actor { id: "cust-1".into(), role: ActorRole::Customer };
        let owner = Actor { id: "owner-1".into(), role: ActorRole::Owner };
        let other = Actor { id: "cust-2".into(), role: ActorRole::Customer };
        let owner_as_customer = Actor { id: "owner-1".into(), role: ActorRole::Customer };

        assert!(customer.may_manage(&booking));
        assert!(owner.may_manage(&booking));
        assert!(!other.may_manage(&booking));
        assert!(!owner_as_customer.may_manage(&booking));
    }

    #[test]
    fn test_resolve_pricing_uses_slot_then_base() {
        let conn = fixtures::db();
        let turf = fixtures::seed_turf(&conn);
        assert_eq!(resolve_pricing(&turf, &monday(), "18:00", "19:00").unwrap().total_amount, 800.0);
        assert_eq!(resolve_pricing(&turf, &monday(), "10:00", "11:00").unwrap().total_amount, 600.0);
        assert!(resolve_pricing(&turf, &monday(), "07:00", "08:00").is_err());
    }
}
