use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("invalid request: {0}")]
    Validation(String),

    #[error("{0}")]
    Policy(String),

    #[error("slot is not available: {0}")]
    SlotUnavailable(String),

    #[error("slot has already been booked")]
    SlotConflict,

    #[error("slot is already bound for {date}")]
    AlreadyBound { date: String },

    #[error("cancellation window closed: bookings can only be cancelled {lead_minutes} minutes before start")]
    CancellationWindowClosed { lead_minutes: i64 },

    #[error("cannot move booking from {from} to {to}")]
    InvalidTransition { from: &'static str, to: &'static str },

    #[error("invalid payment signature")]
    InvalidSignature,

    #[error("not found: {0}")]
    NotFound(String),

    #[error("forbidden")]
    Forbidden,

    #[error("unauthorized")]
    Unauthorized,

    #[error("payment provider error: {0}")]
    Payment(String),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Stable machine-readable code for API clients.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Database(_) => "DATABASE_ERROR",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::Policy(_) => "POLICY_VIOLATION",
            AppError::SlotUnavailable(_) => "SLOT_UNAVAILABLE",
            AppError::SlotConflict => "SLOT_CONFLICT",
            AppError::AlreadyBound { .. } => "ALREADY_BOUND",
            AppError::CancellationWindowClosed { .. } => "CANCELLATION_WINDOW_CLOSED",
            AppError::InvalidTransition { .. } => "INVALID_TRANSITION",
            AppError::InvalidSignature => "INVALID_SIGNATURE",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Forbidden => "FORBIDDEN",
            AppError::Unauthorized => "UNAUTHORIZED",
            AppError::Payment(_) => "PAYMENT_PROVIDER_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Policy(_) => StatusCode::BAD_REQUEST,
            AppError::SlotUnavailable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::SlotConflict => StatusCode::CONFLICT,
            AppError::AlreadyBound { .. } => StatusCode::CONFLICT,
            AppError::CancellationWindowClosed { .. } => StatusCode::BAD_REQUEST,
            AppError::InvalidTransition { .. } => StatusCode::CONFLICT,
            AppError::InvalidSignature => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Payment(_) => StatusCode::BAD_GATEWAY,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// True when the storage layer rejected a write on a uniqueness constraint.
    pub fn is_unique_violation(err: &rusqlite::Error) -> bool {
        matches!(
            err,
            rusqlite::Error::SqliteFailure(e, _)
                if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
        )
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let body = serde_json::json!({ "error": self.to_string(), "code": self.code() });
        (status, axum::Json(body)).into_response()
    }
}
