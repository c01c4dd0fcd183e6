use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Owner {
    pub id: String,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub is_approved: bool,
    pub is_active: bool,
}

/// What the identity service tells us about a turf's owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OwnerStanding {
    pub is_approved: bool,
    pub is_active: bool,
}

impl OwnerStanding {
    pub fn can_take_bookings(&self) -> bool {
        self.is_approved && self.is_active
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    pub id: String,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
}
