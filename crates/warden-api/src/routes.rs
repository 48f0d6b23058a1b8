use axum::{
    Router, middleware,
    routing::{get, post},
};

use crate::middleware::{require_access, require_staff};
use crate::state::AppState;
use crate::{auth, contacts, messages, session, users};

/// All API routes. CORS and tracing layers are added by the binary.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/auth/login", post(auth::login))
        .route("/auth/refresh", post(auth::refresh))
        .route("/auth/validate", post(auth::validate))
        .route("/session/login", post(session::login))
        .route("/session/logout", post(session::logout));

    let staff_routes = Router::new()
        .route("/api/users", get(users::list_users).post(users::create_user))
        .route(
            "/api/users/{id}",
            get(users::get_user)
                .put(users::update_user)
                .delete(users::delete_user),
        )
        .layer(middleware::from_fn(require_staff));

    let protected_routes = Router::new()
        .route("/auth/me", get(auth::me))
        .route("/api/contacts", get(contacts::list_contacts).post(contacts::upsert_contact))
        .route("/api/contacts/sync", post(contacts::sync_contacts))
        .route("/api/contacts/stats", get(contacts::contact_stats))
        .route("/api/messages", get(messages::list_messages))
        .route("/api/messages/log", post(messages::log_message))
        .route("/api/messages/bulk-log", post(messages::bulk_log_messages))
        .route("/api/messages/stats", get(messages::message_stats))
        .merge(staff_routes)
        .layer(middleware::from_fn_with_state(state.clone(), require_access));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}
