pub mod availability;
pub mod booking;
pub mod clock;
pub mod directory;
pub mod events;
pub mod lifecycle;
pub mod messaging;
pub mod notifications;
pub mod payment;
pub mod reconciler;
pub mod templates;

#[cfg(test)]
pub(crate) mod fixtures;
