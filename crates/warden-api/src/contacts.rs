use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::{Value, json};
use tracing::info;

use warden_types::api::{
    Claims, ContactListResponse, ContactSyncRequest, PageQuery, UpsertContactRequest,
};

use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiJson, ApiQuery};
use crate::state::{AppState, blocking};

const DEFAULT_SOURCE_GROUP: &str = "Unknown";

// Record handlers re-read the caller so a deactivated account loses access
// before its access token expires.

pub async fn list_contacts(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> ApiResult<Json<ContactListResponse>> {
    let limit = query.limit();
    let offset = query.offset();
    let search = query.search().map(String::from);

    let caller = claims.sub;
    let (contacts, total) = blocking(&state, move |s| {
        s.live_actor(caller)?;
        let contacts = s.db.list_contacts(limit, offset, search.as_deref())?;
        let total = s.db.count_contacts()?;
        Ok((contacts, total))
    })
    .await?;

    Ok(Json(ContactListResponse {
        contacts,
        total,
        limit,
        offset,
    }))
}

pub async fn upsert_contact(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiJson(req): ApiJson<UpsertContactRequest>,
) -> ApiResult<impl IntoResponse> {
    let phone = req.phone.trim().to_string();
    if phone.is_empty() {
        return Err(ApiError::Validation("Phone required".into()));
    }

    let scraped_by = claims.sub;
    let id = blocking(&state, move |s| {
        s.live_actor(scraped_by)?;
        Ok(s.db.upsert_contact(
            &phone,
            req.name.as_deref(),
            req.source_group.as_deref(),
            scraped_by,
        )?)
    })
    .await?;

    Ok((StatusCode::CREATED, Json(json!({ "message": "Contact saved", "id": id }))))
}

pub async fn sync_contacts(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiJson(req): ApiJson<ContactSyncRequest>,
) -> ApiResult<Json<Value>> {
    if req.contacts.is_empty() {
        return Err(ApiError::Validation("No contacts provided".into()));
    }

    let source_group = req
        .source_group
        .unwrap_or_else(|| DEFAULT_SOURCE_GROUP.to_string());
    let scraped_by = claims.sub;
    let contacts = req.contacts;

    let synced = blocking(&state, move |s| {
        s.live_actor(scraped_by)?;
        Ok(s.db.bulk_upsert_contacts(&contacts, &source_group, scraped_by)?)
    })
    .await?;

    info!("'{}' synced {} contacts", claims.username, synced);
    Ok(Json(json!({
        "message": format!("Synced {} contacts", synced),
        "synced": synced,
    })))
}

pub async fn contact_stats(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<Value>> {
    let caller = claims.sub;
    let total = blocking(&state, move |s| {
        s.live_actor(caller)?;
        Ok(s.db.count_contacts()?)
    })
    .await?;
    Ok(Json(json!({ "total_contacts": total })))
}
