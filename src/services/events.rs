use chrono::NaiveDate;
use serde::Serialize;
use tokio::sync::broadcast;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotEventKind {
    Booked,
    Released,
}

/// Pushed to live availability subscribers whenever a slot-instant changes hands.
#[derive(Debug, Clone, Serialize)]
pub struct SlotEvent {
    pub kind: SlotEventKind,
    pub turf_id: String,
    pub date: NaiveDate,
    pub start_time: String,
    pub end_time: String,
}

pub fn publish(tx: &broadcast::Sender<SlotEvent>, event: SlotEvent) {
    // Err only means nobody is listening.
    if tx.send(event).is_err() {
        tracing::trace!("no slot event subscribers");
    }
}
