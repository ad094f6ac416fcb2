use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use tracing::warn;

use crate::error::ApiError;
use crate::state::AppState;
use crate::users::repo::User;

/// Authenticated user, resolved from the `Authorization: Bearer <token>`
/// header against the stored per-user token.
pub struct AuthUser(pub User);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);

        let auth_header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::unauthorized("Missing Authorization header"))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| ApiError::unauthorized("Invalid Authorization header"))?;

        match User::find_by_token(&state.db, token).await {
            Ok(Some(user)) => Ok(AuthUser(user)),
            Ok(None) => {
                warn!("unknown bearer token");
                Err(ApiError::unauthorized("Unauthorized"))
            }
            Err(e) => {
                warn!(error = %e, "token lookup failed");
                Err(ApiError::unauthorized("Unauthorized"))
            }
        }
    }
}
