use std::sync::Arc;

use tracing::error;

use warden_db::Database;
use warden_types::User;

use crate::error::{ApiError, ApiResult};
use crate::tokens::TokenService;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub tokens: TokenService,
}

impl AppStateInner {
    pub fn new(db: Database, tokens: TokenService) -> AppState {
        Arc::new(Self { db, tokens })
    }

    /// The caller's own record, which must still exist and be active.
    /// Blocking: call from inside [`blocking`].
    pub fn live_actor(&self, actor_id: i64) -> ApiResult<User> {
        self.db
            .get_user_by_id(actor_id)?
            .filter(|user| user.is_active)
            .ok_or_else(|| ApiError::Unauthorized("User not found or inactive".into()))
    }
}

/// Run store access (and password hashing) off the async runtime.
///
/// The closure runs to completion even if the request future is dropped,
/// so a client disconnect never leaves a half-applied write.
pub async fn blocking<F, T>(state: &AppState, f: F) -> ApiResult<T>
where
    F: FnOnce(&AppStateInner) -> ApiResult<T> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal(format!("blocking task failed: {}", e))
        })?
}
