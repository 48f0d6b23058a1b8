use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use tracing::debug;

use warden_types::api::{Claims, TokenKind};

use crate::error::ApiError;
use crate::extract::{ACCESS_COOKIE, bearer_or_cookie};
use crate::policy::{self, STAFF_ROLES};
use crate::state::AppState;

/// Verify the access token (bearer header or `access_token` cookie) and
/// attach its claims to the request for downstream handlers.
pub async fn require_access(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_or_cookie(req.headers(), ACCESS_COOKIE)
        .ok_or_else(|| ApiError::Unauthorized("Missing access token".into()))?;

    let claims = state.tokens.verify(&token, TokenKind::Access).map_err(|e| {
        debug!("Access token rejected on {}: {}", req.uri().path(), e);
        e
    })?;

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

/// Manager/admin gate. Must be layered inside `require_access`.
pub async fn require_staff(req: Request, next: Next) -> Result<Response, ApiError> {
    let claims = req
        .extensions()
        .get::<Claims>()
        .ok_or_else(|| ApiError::Unauthorized("Missing access token".into()))?;

    policy::require_role(claims, STAFF_ROLES)?;
    Ok(next.run(req).await)
}
