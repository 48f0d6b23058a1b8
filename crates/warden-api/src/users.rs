use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;
use tracing::info;

use warden_db::UserUpdate;
use warden_types::api::{
    Claims, CreateUserRequest, CreatedUser, UpdateUserRequest, UserListResponse,
};
use warden_types::{Role, User};

use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiJson, ApiPath};
use crate::policy;
use crate::state::{AppState, AppStateInner, blocking};

// Every route here sits behind `require_access` and `require_staff`.

pub async fn list_users(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<UserListResponse>> {
    let creator = policy::user_list_scope(&claims);
    let users = blocking(&state, move |s| Ok(s.db.list_users(creator)?)).await?;

    Ok(Json(UserListResponse {
        total: users.len(),
        users,
    }))
}

pub async fn get_user(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiPath(target_id): ApiPath<i64>,
) -> ApiResult<Json<User>> {
    let actor_id = claims.sub;
    let target = blocking(&state, move |s| managed_target(s, actor_id, target_id)).await?;
    Ok(Json(target))
}

pub async fn create_user(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiJson(req): ApiJson<CreateUserRequest>,
) -> ApiResult<impl IntoResponse> {
    let username = req.username.trim().to_string();
    if username.is_empty() || req.password.is_empty() {
        return Err(ApiError::Validation("Username and password required".into()));
    }

    let role = match req.role.as_deref() {
        None => Role::Worker,
        Some(raw) => raw
            .parse::<Role>()
            .map_err(|e| ApiError::Validation(e.to_string()))?,
    };

    if !policy::can_create(claims.role, role) {
        return Err(ApiError::Forbidden(format!("Cannot create user with role '{}'", role)));
    }

    let creator_id = claims.sub;
    let password = req.password;
    let name = username.clone();
    let id = blocking(&state, move |s| {
        s.live_actor(creator_id)?;
        Ok(s.db.create_user(&name, &password, role, Some(creator_id))?)
    })
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "User created successfully",
            "user": CreatedUser {
                id,
                username,
                role,
                created_by: Some(creator_id),
            },
        })),
    ))
}

pub async fn update_user(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiPath(target_id): ApiPath<i64>,
    ApiJson(req): ApiJson<UpdateUserRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    let username = match req.username {
        Some(raw) => {
            let trimmed = raw.trim().to_string();
            if trimmed.is_empty() {
                return Err(ApiError::Validation("Username cannot be empty".into()));
            }
            Some(trimmed)
        }
        None => None,
    };
    if req.password.as_deref() == Some("") {
        return Err(ApiError::Validation("Password cannot be empty".into()));
    }
    if req.is_active == Some(false) && target_id == claims.sub {
        return Err(ApiError::Validation("Cannot deactivate your own account".into()));
    }

    let update = UserUpdate {
        username,
        password: req.password,
        is_active: req.is_active,
    };

    let actor_id = claims.sub;
    blocking(&state, move |s| {
        managed_target(s, actor_id, target_id)?;
        if !s.db.update_user(target_id, &update)? {
            return Err(ApiError::Validation("No changes supplied".into()));
        }
        Ok(())
    })
    .await?;

    info!("User {} updated by {}", target_id, claims.username);
    Ok(Json(json!({ "message": "User updated successfully" })))
}

/// Soft delete. Repeating it on an already inactive account succeeds.
pub async fn delete_user(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiPath(target_id): ApiPath<i64>,
) -> ApiResult<Json<serde_json::Value>> {
    if target_id == claims.sub {
        return Err(ApiError::Validation("Cannot delete your own account".into()));
    }

    let actor_id = claims.sub;
    blocking(&state, move |s| {
        managed_target(s, actor_id, target_id)?;
        Ok(s.db.deactivate_user(target_id)?)
    })
    .await?;

    info!("User {} terminated by {}", target_id, claims.username);
    Ok(Json(json!({ "message": "User terminated successfully" })))
}

/// Load `target_id` and check the caller may manage it. Ownership is judged
/// on the live actor record, not the token's role snapshot.
fn managed_target(s: &AppStateInner, actor_id: i64, target_id: i64) -> ApiResult<User> {
    let actor = s.live_actor(actor_id)?;
    let target = s
        .db
        .get_user_by_id(target_id)?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    if !policy::can_manage(&actor, &target) {
        return Err(ApiError::Forbidden("Cannot manage this user".into()));
    }
    Ok(target)
}
