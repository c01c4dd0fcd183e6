use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::Connection;

use crate::db::queries;
use crate::models::OwnerStanding;

/// Answers whether a turf owner may currently take bookings.
#[async_trait]
pub trait OwnerDirectory: Send + Sync {
    async fn standing(&self, owner_id: &str) -> anyhow::Result<Option<OwnerStanding>>;
}

/// Reads standing from the local `owners` table.
pub struct DbOwnerDirectory {
    db: Arc<Mutex<Connection>>,
}

impl DbOwnerDirectory {
    pub fn new(db: Arc<Mutex<Connection>>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl OwnerDirectory for DbOwnerDirectory {
    async fn standing(&self, owner_id: &str) -> anyhow::Result<Option<OwnerStanding>> {
        let db = self
            .db
            .lock()
            .map_err(|_| anyhow::anyhow!("database lock poisoned"))?;
        let owner = queries::get_owner(&db, owner_id)?;
        Ok(owner.map(|o| OwnerStanding {
            is_approved: o.is_approved,
            is_active: o.is_active,
        }))
    }
}
