use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode, header},
    response::Response,
};
use chrono::Duration;
use serde_json::{Value, json};
use tower::ServiceExt;

use warden_api::{AppState, AppStateInner, TokenService, router};
use warden_db::Database;
use warden_types::Role;

pub const ADMIN_PASSWORD: &str = "admin-pass";

#[allow(dead_code)]
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub admin_id: i64,
}

#[allow(dead_code)]
impl TestApp {
    pub fn new() -> Self {
        let db = Database::open_in_memory().expect("Failed to open test db");
        let admin_id = db
            .create_user("admin", ADMIN_PASSWORD, Role::Admin, None)
            .expect("Failed to create admin");

        let tokens = TokenService::new("test-secret", Duration::hours(24), Duration::days(30));
        let state = AppStateInner::new(db, tokens);

        Self {
            router: router(state.clone()),
            state,
            admin_id,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Response {
        self.router.clone().oneshot(request).await.unwrap()
    }

    /// JSON request with an optional bearer token. Empty bodies come back as `Value::Null`.
    pub async fn call(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.send(request).await;
        let status = response.status();
        (status, body_json(response).await)
    }

    pub async fn login(&self, username: &str, password: &str) -> (StatusCode, Value) {
        self.call(
            Method::POST,
            "/auth/login",
            None,
            Some(json!({ "username": username, "password": password })),
        )
        .await
    }

    /// Access token for an account, panicking if login fails.
    pub async fn access_token(&self, username: &str, password: &str) -> String {
        let (status, body) = self.login(username, password).await;
        assert_eq!(status, StatusCode::OK, "login failed for {}: {}", username, body);
        body["access_token"].as_str().unwrap().to_string()
    }

    pub async fn admin_token(&self) -> String {
        self.access_token("admin", ADMIN_PASSWORD).await
    }

    /// Create an account through the API as `token`'s owner and return its id.
    pub async fn create_user(&self, token: &str, username: &str, password: &str, role: &str) -> i64 {
        let (status, body) = self
            .call(
                Method::POST,
                "/api/users",
                Some(token),
                Some(json!({ "username": username, "password": password, "role": role })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create {} failed: {}", username, body);
        body["user"]["id"].as_i64().unwrap()
    }
}

pub async fn body_json(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    }
}

/// `Set-Cookie` headers of a response, one string each.
pub fn set_cookies(response: &Response) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect()
}
