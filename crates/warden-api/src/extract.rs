use axum::extract::{FromRequest, FromRequestParts};
use axum::http::HeaderMap;
use axum_extra::extract::cookie::CookieJar;
use axum_extra::headers::{Authorization, HeaderMapExt, authorization::Bearer};

use crate::error::ApiError;

pub const ACCESS_COOKIE: &str = "access_token";
pub const REFRESH_COOKIE: &str = "refresh_token";

/// `axum::Json` with rejections rendered as our JSON error body.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

#[derive(FromRequest)]
#[from_request(via(axum::Form), rejection(ApiError))]
pub struct ApiForm<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct ApiPath<T>(pub T);

pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .typed_get::<Authorization<Bearer>>()
        .map(|auth| auth.token().to_string())
}

/// Bearer header first, then the named cookie.
pub fn bearer_or_cookie(headers: &HeaderMap, cookie: &str) -> Option<String> {
    bearer_token(headers).or_else(|| {
        CookieJar::from_headers(headers)
            .get(cookie)
            .map(|c| c.value().to_string())
    })
}
