//! Payment reconciliation.
//!
//! Two channels report the same capture: the client-side checkout callback
//! (`verify_payment`) and the provider webhook (`handle_webhook`). They race,
//! repeat and arrive out of order, so every state change is a compare-and-swap
//! on `payment_status` and the confirmation goes out only on the first one.

pub mod razorpay;
pub mod signature;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use rusqlite::{Connection, TransactionBehavior};
use serde::Serialize;

use crate::db::queries;
use crate::errors::{AppError, AppResult};
use crate::models::{Booking, PaymentEvent, WebhookEnvelope};
use crate::services::notifications;
use crate::state::AppState;

#[derive(Debug, Clone, Serialize)]
pub struct OrderRequest {
    pub amount_minor: i64,
    pub currency: String,
    pub receipt: String,
    pub notes: serde_json::Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProviderOrder {
    pub order_id: String,
    pub amount_minor: i64,
    pub currency: String,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Public key handed to the checkout widget.
    fn key_id(&self) -> &str;

    async fn create_order(&self, request: &OrderRequest) -> anyhow::Result<ProviderOrder>;

    fn verify_payment_signature(&self, order_id: &str, payment_id: &str, signature: &str) -> bool;

    fn verify_webhook_signature(&self, body: &[u8], signature: &str) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplyOutcome {
    Applied,
    AlreadyApplied,
    UnknownOrder,
    FailureRecorded,
    FailureIgnored,
    Refunded,
    RefundIgnored,
    Ignored,
    Malformed,
}

impl ApplyOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplyOutcome::Applied => "applied",
            ApplyOutcome::AlreadyApplied => "already_applied",
            ApplyOutcome::UnknownOrder => "unknown_order",
            ApplyOutcome::FailureRecorded => "failure_recorded",
            ApplyOutcome::FailureIgnored => "failure_ignored",
            ApplyOutcome::Refunded => "refunded",
            ApplyOutcome::RefundIgnored => "refund_ignored",
            ApplyOutcome::Ignored => "ignored",
            ApplyOutcome::Malformed => "malformed",
        }
    }
}

/// Apply one payment event to the ledger.
pub fn apply_event(
    conn: &Connection,
    event: &PaymentEvent,
    signature: Option<&str>,
    now: &NaiveDateTime,
) -> AppResult<ApplyOutcome> {
    let outcome = match event {
        PaymentEvent::Captured { order_id, payment_id } => {
            if queries::get_booking_by_order_id(conn, order_id)?.is_none() {
                ApplyOutcome::UnknownOrder
            } else if queries::mark_paid(conn, order_id, payment_id, signature, now)? {
                ApplyOutcome::Applied
            } else {
                ApplyOutcome::AlreadyApplied
            }
        }
        PaymentEvent::Failed { order_id, reason, .. } => {
            if queries::get_booking_by_order_id(conn, order_id)?.is_none() {
                ApplyOutcome::UnknownOrder
            } else if queries::mark_payment_failed(conn, order_id, now)? {
                tracing::info!(order_id = %order_id, reason = ?reason, "payment failed");
                ApplyOutcome::FailureRecorded
            } else {
                ApplyOutcome::FailureIgnored
            }
        }
        PaymentEvent::Refunded { payment_id } => {
            if queries::mark_refunded(conn, payment_id, now)? {
                ApplyOutcome::Refunded
            } else if queries::get_booking_by_payment_id(conn, payment_id)?.is_none() {
                ApplyOutcome::UnknownOrder
            } else {
                ApplyOutcome::RefundIgnored
            }
        }
        PaymentEvent::Ignored { .. } => ApplyOutcome::Ignored,
    };
    Ok(outcome)
}

fn record(
    conn: &Connection,
    source: &str,
    event_name: &str,
    event: Option<&PaymentEvent>,
    outcome: ApplyOutcome,
) -> AppResult<()> {
    queries::record_payment_event(
        conn,
        source,
        event_name,
        event.and_then(|e| e.order_id()),
        event.and_then(|e| e.payment_id()),
        outcome.as_str(),
    )?;
    Ok(())
}

/// Apply and audit in one transaction, returning the booking when this call
/// was the one that marked it paid.
fn apply_and_record(
    state: &AppState,
    source: &str,
    event_name: &str,
    event: &PaymentEvent,
    signature: Option<&str>,
) -> AppResult<(ApplyOutcome, Option<Booking>)> {
    let mut conn = state.conn()?;
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let outcome = apply_event(&tx, event, signature, &state.clock.now())?;
    record(&tx, source, event_name, Some(event), outcome)?;

    let newly_paid = match (outcome, event.order_id()) {
        (ApplyOutcome::Applied, Some(order_id)) => queries::get_booking_by_order_id(&tx, order_id)?,
        _ => None,
    };
    tx.commit()?;

    Ok((outcome, newly_paid))
}

/// Synchronous confirmation from the checkout widget.
pub async fn verify_payment(
    state: &AppState,
    order_id: &str,
    payment_id: &str,
    signature: &str,
) -> AppResult<Booking> {
    if order_id.trim().is_empty() || payment_id.trim().is_empty() || signature.trim().is_empty() {
        return Err(AppError::Validation(
            "order_id, payment_id and signature are required".into(),
        ));
    }

    let event = PaymentEvent::Captured {
        order_id: order_id.to_string(),
        payment_id: payment_id.to_string(),
    };

    if !state
        .payments
        .verify_payment_signature(order_id, payment_id, signature)
    {
        // Unauthenticated calls are logged, not audited.
        tracing::warn!(order_id = %order_id, payment_id = %payment_id, "payment signature mismatch");
        return Err(AppError::InvalidSignature);
    }

    let (outcome, newly_paid) =
        apply_and_record(state, "checkout", "payment.verify", &event, Some(signature))?;

    tracing::info!(order_id = %order_id, outcome = outcome.as_str(), "payment verified");

    if outcome == ApplyOutcome::UnknownOrder {
        return Err(AppError::NotFound(format!("order {order_id}")));
    }

    if let Some(booking) = &newly_paid {
        notifications::send_confirmation(state, booking).await;
    }

    let conn = state.conn()?;
    queries::get_booking_by_order_id(&conn, order_id)?
        .ok_or_else(|| AppError::NotFound(format!("order {order_id}")))
}

/// Asynchronous provider callback. Anything past the signature check is
/// acknowledged, including bodies we cannot use.
pub async fn handle_webhook(
    state: &AppState,
    body: &[u8],
    signature: Option<&str>,
) -> AppResult<ApplyOutcome> {
    let verified = signature
        .map(|sig| state.payments.verify_webhook_signature(body, sig))
        .unwrap_or(false);
    if !verified {
        tracing::warn!(has_signature = signature.is_some(), "webhook signature rejected");
        return Err(AppError::InvalidSignature);
    }

    let envelope = match WebhookEnvelope::from_slice(body) {
        Ok(envelope) => envelope,
        Err(e) => {
            tracing::warn!(error = %e, "unreadable webhook body");
            let conn = state.conn()?;
            record(&conn, "webhook", "unparsed", None, ApplyOutcome::Malformed)?;
            return Ok(ApplyOutcome::Malformed);
        }
    };
    let event_name = envelope.event.clone();

    let event = match envelope.into_event() {
        Ok(event) => event,
        Err(e) => {
            tracing::warn!(event = %event_name, error = %e, "webhook missing fields");
            let conn = state.conn()?;
            record(&conn, "webhook", &event_name, None, ApplyOutcome::Malformed)?;
            return Ok(ApplyOutcome::Malformed);
        }
    };

    let (outcome, newly_paid) = apply_and_record(state, "webhook", &event_name, &event, None)?;

    match outcome {
        ApplyOutcome::UnknownOrder => tracing::warn!(
            event = %event_name,
            order_id = ?event.order_id(),
            payment_id = ?event.payment_id(),
            "webhook for unknown order"
        ),
        _ => tracing::info!(event = %event_name, outcome = outcome.as_str(), "webhook processed"),
    }

    if let Some(booking) = &newly_paid {
        notifications::send_confirmation(state, booking).await;
    }

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PaymentStatus;
    use crate::services::fixtures::{self, at, monday};

    fn seeded_with_order(order_id: &str) -> (Connection, Booking) {
        let conn = fixtures::db();
        let turf = fixtures::seed_turf(&conn);
        let mut booking = fixtures::booking(&turf, monday(), "18:00", "19:00");
        booking.payment_order_id = Some(order_id.to_string());
        queries::insert_booking(&conn, &booking).unwrap();
        (conn, booking)
    }

    fn captured(order_id: &str, payment_id: &str) -> PaymentEvent {
        PaymentEvent::Captured {
            order_id: order_id.into(),
            payment_id: payment_id.into(),
        }
    }

    #[test]
    fn test_capture_applies_once() {
        let (conn, booking) = seeded_with_order("order_1");
        let first = at(monday(), 8, 0);
        let later = at(monday(), 8, 5);

        let outcome = apply_event(&conn, &captured("order_1", "pay_1"), Some("sig"), &first).unwrap();
        assert_eq!(outcome, ApplyOutcome::Applied);

        let outcome = apply_event(&conn, &captured("order_1", "pay_1"), None, &later).unwrap();
        assert_eq!(outcome, ApplyOutcome::AlreadyApplied);

        let stored = queries::get_booking(&conn, &booking.id).unwrap().unwrap();
        assert_eq!(stored.payment_status, PaymentStatus::Paid);
        assert_eq!(stored.payment_id.as_deref(), Some("pay_1"));
        assert_eq!(stored.payment_signature.as_deref(), Some("sig"));
        assert_eq!(stored.paid_at, Some(first));
    }

    #[test]
    fn test_failure_then_capture_ends_paid() {
        let (conn, booking) = seeded_with_order("order_2");
        let now = at(monday(), 8, 0);
        let failed = PaymentEvent::Failed {
            order_id: "order_2".into(),
            payment_id: "pay_a".into(),
            reason: None,
        };

        assert_eq!(apply_event(&conn, &failed, None, &now).unwrap(), ApplyOutcome::FailureRecorded);
        let stored = queries::get_booking(&conn, &booking.id).unwrap().unwrap();
        assert_eq!(stored.payment_status, PaymentStatus::Failed);
        assert_eq!(stored.status, booking.status);

        apply_event(&conn, &captured("order_2", "pay_b"), None, &now).unwrap();
        assert_eq!(apply_event(&conn, &failed, None, &now).unwrap(), ApplyOutcome::FailureIgnored);

        let stored = queries::get_booking(&conn, &booking.id).unwrap().unwrap();
        assert_eq!(stored.payment_status, PaymentStatus::Paid);
    }

    #[test]
    fn test_refund_after_capture() {
        let (conn, booking) = seeded_with_order("order_3");
        let now = at(monday(), 8, 0);
        let refund = PaymentEvent::Refunded { payment_id: "pay_3".into() };

        assert_eq!(apply_event(&conn, &refund, None, &now).unwrap(), ApplyOutcome::UnknownOrder);

        apply_event(&conn, &captured("order_3", "pay_3"), None, &now).unwrap();
        assert_eq!(apply_event(&conn, &refund, None, &now).unwrap(), ApplyOutcome::Refunded);
        assert_eq!(apply_event(&conn, &refund, None, &now).unwrap(), ApplyOutcome::RefundIgnored);

        // A replayed capture cannot resurrect a refunded payment.
        assert_eq!(
            apply_event(&conn, &captured("order_3", "pay_3"), None, &now).unwrap(),
            ApplyOutcome::AlreadyApplied
        );
        let stored = queries::get_booking(&conn, &booking.id).unwrap().unwrap();
        assert_eq!(stored.payment_status, PaymentStatus::Refunded);
    }

    #[test]
    fn test_unknown_order() {
        let (conn, _) = seeded_with_order("order_4");
        let outcome =
            apply_event(&conn, &captured("order_missing", "pay_x"), None, &at(monday(), 8, 0)).unwrap();
        assert_eq!(outcome, ApplyOutcome::UnknownOrder);
    }
}
