use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::slot_time::slot_bounds;
use crate::errors::{AppError, AppResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: String,
    pub turf_id: String,
    pub owner_id: String,
    pub customer_id: Option<String>,
    pub walk_in_name: Option<String>,
    pub walk_in_phone: Option<String>,
    pub date: NaiveDate,
    pub start_time: String,
    pub end_time: String,
    pub price_per_hour: f64,
    pub duration_minutes: i64,
    pub total_amount: f64,
    pub status: BookingStatus,
    pub payment_status: PaymentStatus,
    pub payment_method: PaymentMethod,
    pub booking_type: BookingType,
    pub booking_code: String,
    pub payment_order_id: Option<String>,
    pub payment_id: Option<String>,
    pub payment_signature: Option<String>,
    pub paid_at: Option<NaiveDateTime>,
    pub cancelled_at: Option<NaiveDateTime>,
    pub cancelled_by: Option<String>,
    pub cancellation_reason: Option<String>,
    pub checked_in_at: Option<NaiveDateTime>,
    pub review_email_sent: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Booking {
    /// Absolute start and end instants in facility-local time.
    pub fn window(&self) -> AppResult<(NaiveDateTime, NaiveDateTime)> {
        let (start_min, end_min) = slot_bounds(&self.start_time, &self.end_time)?;
        let midnight = self.date.and_hms_opt(0, 0, 0).unwrap_or_default();
        Ok((
            midnight + Duration::minutes(start_min as i64),
            midnight + Duration::minutes(end_min as i64),
        ))
    }
}

/// Slot pricing derived from times and hourly rate. Never set by hand.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pricing {
    pub duration_minutes: i64,
    pub price_per_hour: f64,
    pub total_amount: f64,
}

impl Pricing {
    pub fn derive(start_time: &str, end_time: &str, price_per_hour: f64) -> AppResult<Self> {
        let (start, end) = slot_bounds(start_time, end_time)?;
        let duration_minutes = (end - start) as i64;
        Ok(Self {
            duration_minutes,
            price_per_hour,
            total_amount: (duration_minutes as f64 / 60.0) * price_per_hour,
        })
    }

    /// Amount in the currency's minor unit, as payment providers expect.
    pub fn amount_minor(&self) -> i64 {
        (self.total_amount * 100.0).round() as i64
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Confirmed,
    InProgress,
    Completed,
    Cancelled,
    NoShow,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::InProgress => "in_progress",
            BookingStatus::Completed => "completed",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::NoShow => "no_show",
        }
    }

    pub fn parse(s: &str) -> AppResult<Self> {
        match s {
            "confirmed" => Ok(BookingStatus::Confirmed),
            "in_progress" => Ok(BookingStatus::InProgress),
            "completed" => Ok(BookingStatus::Completed),
            "cancelled" => Ok(BookingStatus::Cancelled),
            "no_show" | "no-show" => Ok(BookingStatus::NoShow),
            other => Err(AppError::Validation(format!("unknown booking status: {other}"))),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            BookingStatus::Completed | BookingStatus::Cancelled | BookingStatus::NoShow
        )
    }

    /// The lifecycle transition table. Every mutation path goes through here.
    pub fn can_transition_to(&self, next: BookingStatus) -> bool {
        use BookingStatus::*;
        matches!(
            (self, next),
            (Confirmed, InProgress)
                | (Confirmed, Completed)
                | (InProgress, Completed)
                | (Confirmed, Cancelled)
                | (Confirmed, NoShow)
                | (InProgress, NoShow)
        )
    }

    pub fn transition(&self, next: BookingStatus) -> AppResult<BookingStatus> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(AppError::InvalidTransition {
                from: self.as_str(),
                to: next.as_str(),
            })
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Partial,
    Refunded,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Partial => "partial",
            PaymentStatus::Refunded => "refunded",
            PaymentStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> AppResult<Self> {
        match s {
            "pending" => Ok(PaymentStatus::Pending),
            "paid" => Ok(PaymentStatus::Paid),
            "partial" => Ok(PaymentStatus::Partial),
            "refunded" => Ok(PaymentStatus::Refunded),
            "failed" => Ok(PaymentStatus::Failed),
            other => Err(AppError::Validation(format!("unknown payment status: {other}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Online,
    Cash,
    Upi,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Online => "online",
            PaymentMethod::Cash => "cash",
            PaymentMethod::Upi => "upi",
        }
    }

    pub fn parse(s: &str) -> AppResult<Self> {
        match s {
            "online" => Ok(PaymentMethod::Online),
            "cash" => Ok(PaymentMethod::Cash),
            "upi" => Ok(PaymentMethod::Upi),
            other => Err(AppError::Validation(format!("unknown payment method: {other}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BookingType {
    Online,
    Offline,
}

impl BookingType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingType::Online => "online",
            BookingType::Offline => "offline",
        }
    }

    pub fn parse(s: &str) -> AppResult<Self> {
        match s {
            "online" => Ok(BookingType::Online),
            "offline" => Ok(BookingType::Offline),
            other => Err(AppError::Validation(format!("unknown booking type: {other}"))),
        }
    }
}
