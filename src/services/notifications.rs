use async_trait::async_trait;
use rusqlite::Connection;

use crate::db::queries;
use crate::errors::AppResult;
use crate::models::Booking;
use crate::services::messaging::MessagingProvider;
use crate::state::AppState;

#[derive(Debug, Clone, PartialEq)]
pub struct Recipient {
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
}

/// Customer-facing notifications. Delivery failures are logged, never returned.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_booking_confirmation(&self, booking: &Booking, recipient: &Recipient);
    async fn send_post_stay_review(&self, booking: &Booking, recipient: &Recipient);
}

/// Who hears about a booking: the registered customer, else the walk-in contact.
pub fn recipient_for(conn: &Connection, booking: &Booking) -> AppResult<Option<Recipient>> {
    if let Some(customer_id) = &booking.customer_id {
        return Ok(queries::get_customer(conn, customer_id)?.map(|c| Recipient {
            name: c.name,
            phone: c.phone,
            email: c.email,
        }));
    }

    Ok(booking.walk_in_name.as_ref().map(|name| Recipient {
        name: name.clone(),
        phone: booking.walk_in_phone.clone(),
        email: None,
    }))
}

fn lookup(state: &AppState, booking: &Booking) -> Option<Recipient> {
    match state.conn().and_then(|conn| recipient_for(&conn, booking)) {
        Ok(Some(recipient)) => Some(recipient),
        Ok(None) => {
            tracing::debug!(booking_id = %booking.id, "booking has no recipient");
            None
        }
        Err(e) => {
            tracing::error!(booking_id = %booking.id, error = %e, "failed to resolve recipient");
            None
        }
    }
}

pub async fn send_confirmation(state: &AppState, booking: &Booking) {
    if let Some(recipient) = lookup(state, booking) {
        state
            .notifier
            .send_booking_confirmation(booking, &recipient)
            .await;
    }
}

pub async fn send_review_request(state: &AppState, booking: &Booking) {
    if let Some(recipient) = lookup(state, booking) {
        state.notifier.send_post_stay_review(booking, &recipient).await;
    }
}

/// Formats booking notices as SMS.
pub struct SmsNotifier {
    messaging: Box<dyn MessagingProvider>,
    currency: String,
}

impl SmsNotifier {
    pub fn new(messaging: Box<dyn MessagingProvider>, currency: String) -> Self {
        Self { messaging, currency }
    }

    fn confirmation_text(&self, booking: &Booking, recipient: &Recipient) -> String {
        format!(
            "Hi {}, your booking is confirmed for {} {}-{}. Check-in code: {}. Total: {} {:.2}",
            recipient.name,
            booking.date.format("%a %d %b %Y"),
            booking.start_time,
            booking.end_time,
            booking.booking_code,
            self.currency,
            booking.total_amount,
        )
    }

    fn review_text(booking: &Booking, recipient: &Recipient) -> String {
        format!(
            "Thanks for playing with us on {}, {}! Reply with a rating from 1 to 5 to tell us how it went.",
            booking.date.format("%d %b"),
            recipient.name,
        )
    }

    async fn deliver(&self, booking: &Booking, recipient: &Recipient, kind: &str, body: String) {
        let Some(phone) = recipient.phone.as_deref() else {
            tracing::debug!(booking_id = %booking.id, kind, "recipient has no phone");
            return;
        };

        match self.messaging.send_message(phone, &body).await {
            Ok(()) => tracing::info!(booking_id = %booking.id, kind, "notification sent"),
            Err(e) => {
                tracing::error!(booking_id = %booking.id, kind, error = %e, "notification failed")
            }
        }
    }
}

#[async_trait]
impl Notifier for SmsNotifier {
    async fn send_booking_confirmation(&self, booking: &Booking, recipient: &Recipient) {
        let body = self.confirmation_text(booking, recipient);
        self.deliver(booking, recipient, "confirmation", body).await;
    }

    async fn send_post_stay_review(&self, booking: &Booking, recipient: &Recipient) {
        let body = Self::review_text(booking, recipient);
        self.deliver(booking, recipient, "review", body).await;
    }
}
