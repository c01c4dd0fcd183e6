pub mod admin;
pub mod auth;
pub mod bookings;
pub mod health;
pub mod payments;
pub mod turfs;

use chrono::NaiveDate;

use crate::errors::{AppError, AppResult};

/// Parse a `YYYY-MM-DD` request value.
pub(crate) fn parse_date(raw: &str) -> AppResult<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| AppError::Validation(format!("invalid date '{raw}', expected YYYY-MM-DD")))
}

pub(crate) fn parse_opt_date(raw: Option<&str>) -> AppResult<Option<NaiveDate>> {
    raw.filter(|s| !s.trim().is_empty()).map(parse_date).transpose()
}
