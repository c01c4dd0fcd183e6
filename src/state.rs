use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::Connection;
use tokio::sync::broadcast;

use crate::config::AppConfig;
use crate::errors::{AppError, AppResult};
use crate::services::clock::Clock;
use crate::services::directory::OwnerDirectory;
use crate::services::events::SlotEvent;
use crate::services::notifications::Notifier;
use crate::services::payment::PaymentGateway;

pub struct AppState {
    pub db: Arc<Mutex<Connection>>,
    pub config: AppConfig,
    pub clock: Box<dyn Clock>,
    pub owners: Box<dyn OwnerDirectory>,
    pub payments: Box<dyn PaymentGateway>,
    pub notifier: Box<dyn Notifier>,
    pub events: broadcast::Sender<SlotEvent>,
}

impl AppState {
    /// Lock the shared connection. Never hold the guard across an `.await`.
    pub fn conn(&self) -> AppResult<MutexGuard<'_, Connection>> {
        self.db
            .lock()
            .map_err(|_| AppError::Internal(anyhow::anyhow!("database lock poisoned")))
    }
}
