use axum::extract::FromRequestParts;
use axum::extract::Request;
use axum::extract::State;
use axum::http::request::Parts;
use axum::http::{self};
use axum::middleware::Next;
use axum::response::Response;

use super::handlers::ApiError;
use crate::domain::auth::models::AccessClaims;
use crate::domain::user::models::User;
use crate::inbound::http::router::AppState;
use crate::user::errors::UserError;

/// The caller of an authenticated request, resolved from its bearer token.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user: User,
    pub claims: AccessClaims,
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or(ApiError::Unauthenticated)
    }
}

/// Middleware that validates the bearer token and resolves its user.
pub async fn authenticate(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_token_from_header(&req)?;

    let claims = state
        .auth_service
        .validate_token(token)
        .map_err(|_| ApiError::Unauthenticated)?;

    let user = state
        .user_service
        .get_user(&claims.user_id)
        .await
        .map_err(|e| match e {
            UserError::NotFound(_) => {
                tracing::debug!(user_id = %claims.user_id, "Token subject no longer exists");
                ApiError::Unauthenticated
            }
            other => ApiError::from(other),
        })?;

    req.extensions_mut()
        .insert(AuthenticatedUser { user, claims });

    Ok(next.run(req).await)
}

fn extract_token_from_header(req: &Request) -> Result<&str, ApiError> {
    let auth_header = req
        .headers()
        .get(http::header::AUTHORIZATION)
        .ok_or(ApiError::Unauthenticated)?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| ApiError::Unauthenticated)?;

    auth_str
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or(ApiError::Unauthenticated)
}
