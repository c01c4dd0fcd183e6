use serde::Deserialize;

use crate::errors::{AppError, AppResult};

/// Raw webhook body as sent by the payment provider.
///
/// `{"event": "payment.captured", "payload": {"payment": {"entity": {...}}}}`
#[derive(Debug, Deserialize)]
pub struct WebhookEnvelope {
    pub event: String,
    #[serde(default)]
    pub payload: WebhookPayload,
}

#[derive(Debug, Default, Deserialize)]
pub struct WebhookPayload {
    pub payment: Option<Entity<PaymentEntity>>,
    pub order: Option<Entity<OrderEntity>>,
    pub refund: Option<Entity<RefundEntity>>,
}

#[derive(Debug, Deserialize)]
pub struct Entity<T> {
    pub entity: T,
}

#[derive(Debug, Deserialize)]
pub struct PaymentEntity {
    pub id: String,
    pub order_id: Option<String>,
    pub error_description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct OrderEntity {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub struct RefundEntity {
    pub id: String,
    pub payment_id: String,
}

/// A provider callback reduced to what the ledger cares about.
#[derive(Debug, Clone, PartialEq)]
pub enum PaymentEvent {
    Captured {
        order_id: String,
        payment_id: String,
    },
    Failed {
        order_id: String,
        payment_id: String,
        reason: Option<String>,
    },
    Refunded {
        payment_id: String,
    },
    Ignored {
        event: String,
    },
}

impl PaymentEvent {
    pub fn order_id(&self) -> Option<&str> {
        match self {
            PaymentEvent::Captured { order_id, .. } | PaymentEvent::Failed { order_id, .. } => {
                Some(order_id)
            }
            _ => None,
        }
    }

    pub fn payment_id(&self) -> Option<&str> {
        match self {
            PaymentEvent::Captured { payment_id, .. }
            | PaymentEvent::Failed { payment_id, .. }
            | PaymentEvent::Refunded { payment_id } => Some(payment_id),
            PaymentEvent::Ignored { .. } => None,
        }
    }
}

impl WebhookEnvelope {
    pub fn from_slice(body: &[u8]) -> AppResult<Self> {
        serde_json::from_slice(body)
            .map_err(|e| AppError::Validation(format!("malformed webhook body: {e}")))
    }

    pub fn into_event(self) -> AppResult<PaymentEvent> {
        let payment = self.payload.payment.map(|p| p.entity);
        let order = self.payload.order.map(|o| o.entity);

        match self.event.as_str() {
            "payment.captured" | "order.paid" => {
                let payment = payment.ok_or_else(|| missing(&self.event, "payment"))?;
                let order_id = order
                    .map(|o| o.id)
                    .or(payment.order_id)
                    .ok_or_else(|| missing(&self.event, "order_id"))?;
                Ok(PaymentEvent::Captured {
                    order_id,
                    payment_id: payment.id,
                })
            }
            "payment.failed" => {
                let payment = payment.ok_or_else(|| missing(&self.event, "payment"))?;
                let order_id = payment
                    .order_id
                    .ok_or_else(|| missing(&self.event, "order_id"))?;
                Ok(PaymentEvent::Failed {
                    order_id,
                    payment_id: payment.id,
                    reason: payment.error_description,
                })
            }
            "refund.processed" => {
                let refund = self
                    .payload
                    .refund
                    .map(|r| r.entity)
                    .ok_or_else(|| missing(&self.event, "refund"))?;
                tracing::debug!(refund_id = %refund.id, "refund processed");
                Ok(PaymentEvent::Refunded {
                    payment_id: refund.payment_id,
                })
            }
            _ => Ok(PaymentEvent::Ignored { event: self.event }),
        }
    }
}

fn missing(event: &str, field: &str) -> AppError {
    AppError::Validation(format!("{event} webhook is missing {field}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(json: &str) -> PaymentEvent {
        WebhookEnvelope::from_slice(json.as_bytes())
            .unwrap()
            .into_event()
            .unwrap()
    }

    #[test]
    fn test_payment_captured() {
        let e = event(
            r#"{"event":"payment.captured","payload":{"payment":{"entity":{"id":"pay_1","order_id":"order_1","status":"captured"}}}}"#,
        );
        assert_eq!(
            e,
            PaymentEvent::Captured {
                order_id: "order_1".into(),
                payment_id: "pay_1".into()
            }
        );
    }

    #[test]
    fn test_order_paid_prefers_order_entity() {
        let e = event(
            r#"{"event":"order.paid","payload":{"payment":{"entity":{"id":"pay_2"}},"order":{"entity":{"id":"order_2"}}}}"#,
        );
        assert_eq!(
            e,
            PaymentEvent::Captured {
                order_id: "order_2".into(),
                payment_id: "pay_2".into()
            }
        );
    }

    #[test]
    fn test_payment_failed_carries_reason() {
        let e = event(
            r#"{"event":"payment.failed","payload":{"payment":{"entity":{"id":"pay_3","order_id":"order_3","error_description":"card declined"}}}}"#,
        );
        assert_eq!(
            e,
            PaymentEvent::Failed {
                order_id: "order_3".into(),
                payment_id: "pay_3".into(),
                reason: Some("card declined".into()),
            }
        );
    }

    #[test]
    fn test_refund_processed() {
        let e = event(
            r#"{"event":"refund.processed","payload":{"refund":{"entity":{"id":"rfnd_1","payment_id":"pay_4"}}}}"#,
        );
        assert_eq!(e, PaymentEvent::Refunded { payment_id: "pay_4".into() });
    }

    #[test]
    fn test_unknown_event_ignored() {
        let e = event(r#"{"event":"payout.processed","payload":{}}"#);
        assert_eq!(e, PaymentEvent::Ignored { event: "payout.processed".into() });
    }

    #[test]
    fn test_captured_without_order_is_rejected() {
        let envelope = WebhookEnvelope::from_slice(
            br#"{"event":"payment.captured","payload":{"payment":{"entity":{"id":"pay_5"}}}}"#,
        )
        .unwrap();
        assert!(envelope.into_event().is_err());
    }
}
