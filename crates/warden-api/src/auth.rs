use axum::{
    Extension, Json,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;
use serde_json::json;
use tracing::{debug, info, warn};

use warden_types::User;
use warden_types::api::{
    Claims, LoginRequest, LoginResponse, MeResponse, TokenKind, TokenPair, ValidateResponse,
};

use crate::error::{ApiError, ApiResult};
use crate::extract::{ACCESS_COOKIE, ApiJson, REFRESH_COOKIE, bearer_or_cookie, bearer_token};
use crate::session::with_session_cookies;
use crate::state::{AppState, blocking};

pub async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    let user = check_credentials(&state, req.username, req.password).await?;
    let tokens = state.tokens.issue(user.id, &user.username, user.role)?;

    info!("User '{}' logged in", user.username);
    Ok(Json(LoginResponse::new(&user, tokens)))
}

/// Shared by the JSON and web-session logins. Unknown users, wrong
/// passwords and inactive accounts are indistinguishable to the caller.
pub(crate) async fn check_credentials(
    state: &AppState,
    username: String,
    password: String,
) -> ApiResult<User> {
    let username = username.trim().to_string();
    if username.is_empty() || password.is_empty() {
        return Err(ApiError::Validation("Username and password required".into()));
    }

    blocking(state, move |s| {
        s.db.verify_credentials(&username, &password)?.ok_or_else(|| {
            warn!("Rejected login for '{}'", username);
            ApiError::Unauthorized("Invalid credentials".into())
        })
    })
    .await
}

/// Takes the refresh token from the bearer header or, failing that, the
/// `refresh_token` cookie. Cookie callers get their cookies rotated too.
pub async fn refresh(
    State(state): State<AppState>,
    headers: HeaderMap,
    jar: CookieJar,
) -> ApiResult<(CookieJar, Json<TokenPair>)> {
    let (token, from_cookie) = match bearer_token(&headers) {
        Some(token) => (token, false),
        None => {
            let token = jar
                .get(REFRESH_COOKIE)
                .map(|c| c.value().to_string())
                .ok_or_else(|| ApiError::Unauthorized("Missing refresh token".into()))?;
            (token, true)
        }
    };

    let tokens = blocking(&state, move |s| s.tokens.refresh(&s.db, &token)).await?;

    let jar = if from_cookie {
        with_session_cookies(jar, &tokens)
    } else {
        jar
    };
    Ok((jar, Json(tokens)))
}

pub async fn me(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<MeResponse>> {
    let user_id = claims.sub;
    let user = blocking(&state, move |s| Ok(s.db.get_user_by_id(user_id)?))
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    if !user.is_active {
        return Err(ApiError::Unauthorized("User is inactive".into()));
    }

    Ok(Json(MeResponse {
        id: user.id,
        username: user.username,
        role: user.role,
        created_at: user.created_at,
    }))
}

/// For other services holding a token: answers from the live user record.
/// Any authentication failure is a bare `{"valid": false}` 401.
pub async fn validate(State(state): State<AppState>, headers: HeaderMap) -> Response {
    match validate_token(&state, &headers).await {
        Ok(valid) => Json(valid).into_response(),
        Err(err @ ApiError::Internal(_)) => err.into_response(),
        Err(err) => {
            debug!("Token validation failed: {}", err);
            (StatusCode::UNAUTHORIZED, Json(json!({ "valid": false }))).into_response()
        }
    }
}

async fn validate_token(state: &AppState, headers: &HeaderMap) -> ApiResult<ValidateResponse> {
    let token = bearer_or_cookie(headers, ACCESS_COOKIE)
        .ok_or_else(|| ApiError::Unauthorized("Missing access token".into()))?;
    let claims = state.tokens.verify(&token, TokenKind::Access)?;

    let user_id = claims.sub;
    let user = blocking(state, move |s| Ok(s.db.get_user_by_id(user_id)?))
        .await?
        .filter(|user| user.is_active)
        .ok_or_else(|| ApiError::Unauthorized("User not found or inactive".into()))?;

    Ok(ValidateResponse {
        valid: true,
        user_id: user.id,
        username: user.username,
        role: user.role,
    })
}
