use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::HeaderMap;

use crate::errors::{AppError, AppResult};
use crate::services::booking::{Actor, ActorRole};

pub const ACTOR_ID_HEADER: &str = "x-actor-id";
pub const ACTOR_ROLE_HEADER: &str = "x-actor-role";

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Identity forwarded by the upstream auth layer.
#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for Actor {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let id = header_value(&parts.headers, ACTOR_ID_HEADER).ok_or(AppError::Unauthorized)?;
        let role = header_value(&parts.headers, ACTOR_ROLE_HEADER).ok_or(AppError::Unauthorized)?;
        Ok(Actor {
            id,
            role: ActorRole::parse(&role)?,
        })
    }
}

pub fn require_owner(actor: &Actor) -> AppResult<&str> {
    match actor.role {
        ActorRole::Owner => Ok(&actor.id),
        ActorRole::Customer => Err(AppError::Forbidden),
    }
}

pub fn require_customer(actor: &Actor) -> AppResult<&str> {
    match actor.role {
        ActorRole::Customer => Ok(&actor.id),
        ActorRole::Owner => Err(AppError::Forbidden),
    }
}

/// Bearer check for operator endpoints.
pub fn check_auth(headers: &HeaderMap, expected_token: &str) -> AppResult<()> {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    let token = auth.strip_prefix("Bearer ").unwrap_or("");
    if expected_token.is_empty() || token != expected_token {
        return Err(AppError::Unauthorized);
    }
    Ok(())
}
