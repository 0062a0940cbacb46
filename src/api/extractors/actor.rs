use axum::{extract::FromRequestParts, http::request::Parts};
use tracing::Span;
use crate::domain::models::actor::{Actor, ActorRole};
use crate::error::AppError;

/// Identity forwarded by the gateway after it has authenticated the caller.
/// Requests without both headers are rejected before any handler runs.
pub struct AuthActor(pub Actor);

impl<S> FromRequestParts<S> for AuthActor
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let actor_id = parts
            .headers
            .get("x-actor-id")
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .ok_or(AppError::Unauthorized)?
            .to_string();

        let role = parts
            .headers
            .get("x-actor-role")
            .and_then(|v| v.to_str().ok())
            .and_then(ActorRole::parse)
            .ok_or(AppError::Unauthorized)?;

        let actor = Actor { id: actor_id, role };

        Span::current().record("actor_id", &actor.id);
        Span::current().record("actor_role", actor.role.as_str());

        Ok(AuthActor(actor))
    }
}
