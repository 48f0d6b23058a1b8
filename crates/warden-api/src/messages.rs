use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::{Value, json};
use tracing::info;

use warden_types::api::{BulkLogRequest, Claims, MessageListResponse, NewMessage, PageQuery};

use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiJson, ApiQuery};
use crate::policy;
use crate::state::{AppState, blocking};

/// Workers get their own messages regardless of `sender_id`; `total` is
/// counted under the same scope as the listing.
pub async fn list_messages(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> ApiResult<Json<MessageListResponse>> {
    let limit = query.limit();
    let offset = query.offset();
    let sender = policy::message_sender_scope(&claims, query.sender_id);

    let caller = claims.sub;
    let (messages, total) = blocking(&state, move |s| {
        s.live_actor(caller)?;
        let messages = s.db.list_messages(limit, offset, sender)?;
        let total = s.db.count_messages(sender)?;
        Ok((messages, total))
    })
    .await?;

    Ok(Json(MessageListResponse {
        messages,
        total,
        limit,
        offset,
    }))
}

pub async fn log_message(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiJson(message): ApiJson<NewMessage>,
) -> ApiResult<impl IntoResponse> {
    if message.recipient_phone.trim().is_empty() {
        return Err(ApiError::Validation("Recipient phone required".into()));
    }

    let sender = claims.sub;
    let log_id = blocking(&state, move |s| {
        s.live_actor(sender)?;
        Ok(s.db.append_message(sender, &message)?)
    })
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Message logged", "log_id": log_id })),
    ))
}

pub async fn bulk_log_messages(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiJson(req): ApiJson<BulkLogRequest>,
) -> ApiResult<impl IntoResponse> {
    if req.messages.is_empty() {
        return Err(ApiError::Validation("No messages provided".into()));
    }

    let sender = claims.sub;
    let messages = req.messages;
    let logged = blocking(&state, move |s| {
        s.live_actor(sender)?;
        Ok(s.db.bulk_append_messages(&messages, sender)?)
    })
    .await?;

    info!("'{}' logged {} messages", claims.username, logged);
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": format!("Logged {} messages", logged),
            "logged": logged,
        })),
    ))
}

pub async fn message_stats(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<Value>> {
    let sender = policy::message_sender_scope(&claims, None);
    let caller = claims.sub;
    let total = blocking(&state, move |s| {
        s.live_actor(caller)?;
        Ok(s.db.count_messages(sender)?)
    })
    .await?;
    Ok(Json(json!({ "total_messages": total })))
}
