//! Cookie transport for browser sessions. The access cookie stays readable
//! by page scripts, which call the JSON API with it; the refresh cookie is
//! HttpOnly.

use axum::{Json, extract::State};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{info, warn};

use warden_types::api::{LoginResponse, TokenPair};

use crate::auth::check_credentials;
use crate::error::{ApiError, ApiResult};
use crate::extract::{ACCESS_COOKIE, ApiForm, REFRESH_COOKIE};
use crate::policy::STAFF_ROLES;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SessionLoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    ApiForm(form): ApiForm<SessionLoginForm>,
) -> ApiResult<(CookieJar, Json<LoginResponse>)> {
    let user = check_credentials(&state, form.username, form.password).await?;

    if !STAFF_ROLES.contains(&user.role) {
        warn!("Session login refused for {} '{}'", user.role, user.username);
        return Err(ApiError::Forbidden("Admin access required".into()));
    }

    let tokens = state.tokens.issue(user.id, &user.username, user.role)?;
    info!("Session started for '{}'", user.username);

    let jar = with_session_cookies(jar, &tokens);
    Ok((jar, Json(LoginResponse::new(&user, tokens))))
}

pub async fn logout(jar: CookieJar) -> (CookieJar, Json<Value>) {
    let jar = jar
        .remove(Cookie::build(ACCESS_COOKIE).path("/"))
        .remove(Cookie::build(REFRESH_COOKIE).path("/"));
    (jar, Json(json!({ "message": "Logged out" })))
}

pub(crate) fn with_session_cookies(jar: CookieJar, tokens: &TokenPair) -> CookieJar {
    let access = Cookie::build((ACCESS_COOKIE, tokens.access_token.clone()))
        .path("/")
        .http_only(false)
        .same_site(SameSite::Lax);
    let refresh = Cookie::build((REFRESH_COOKIE, tokens.refresh_token.clone()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax);

    jar.add(access).add(refresh)
}
