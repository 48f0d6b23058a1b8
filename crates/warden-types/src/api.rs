use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Contact, MessageLog, Role, User};

// -- JWT Claims --

/// Which half of a token pair a JWT is. Access and refresh tokens are
/// signed with the same key, so the kind claim is what keeps them apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// JWT claims. `sub` is the user id, string-encoded on the wire; username
/// and role are a snapshot taken when the token was minted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    #[serde(with = "string_id")]
    pub sub: i64,
    pub username: String,
    pub role: Role,
    pub kind: TokenKind,
    pub iat: u64,
    pub exp: u64,
    pub jti: String,
}

mod string_id {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(id: &i64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(id)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: i64,
    pub username: String,
    pub role: Role,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            role: user.role,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub message: String,
    pub user: UserSummary,
    #[serde(flatten)]
    pub tokens: TokenPair,
}

impl LoginResponse {
    pub const MESSAGE: &'static str = "Login successful";

    pub fn new(user: &User, tokens: TokenPair) -> Self {
        Self {
            message: Self::MESSAGE.to_string(),
            user: UserSummary::from(user),
            tokens,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MeResponse {
    pub id: i64,
    pub username: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ValidateResponse {
    pub valid: bool,
    pub user_id: i64,
    pub username: String,
    pub role: Role,
}

// -- Users --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateUserRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    /// Parsed by the handler so an unknown role is a validation error
    /// rather than a body rejection. Defaults to worker.
    pub role: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreatedUser {
    pub id: i64,
    pub username: String,
    pub role: Role,
    pub created_by: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateUserRequest {
    pub username: Option<String>,
    pub password: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserListResponse {
    pub users: Vec<User>,
    pub total: usize,
}

// -- Contacts --

/// One scraped contact. Scrapers send either `phone` or `number`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewContact {
    #[serde(default, alias = "number")]
    pub phone: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpsertContactRequest {
    #[serde(default)]
    pub phone: String,
    pub name: Option<String>,
    pub source_group: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ContactSyncRequest {
    #[serde(default)]
    pub contacts: Vec<NewContact>,
    pub source_group: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ContactListResponse {
    pub contacts: Vec<Contact>,
    pub total: u64,
    pub limit: u32,
    pub offset: u32,
}

// -- Message logs --

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewMessage {
    #[serde(default)]
    pub recipient_phone: String,
    #[serde(default)]
    pub message_content: String,
    pub attachment_path: Option<String>,
    pub template_used: Option<String>,
    pub status: Option<String>,
}

impl NewMessage {
    pub const DEFAULT_STATUS: &'static str = "sent";

    pub fn status(&self) -> &str {
        self.status.as_deref().unwrap_or(Self::DEFAULT_STATUS)
    }
}

#[derive(Debug, Deserialize)]
pub struct BulkLogRequest {
    #[serde(default)]
    pub messages: Vec<NewMessage>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageListResponse {
    pub messages: Vec<MessageLog>,
    pub total: u64,
    pub limit: u32,
    pub offset: u32,
}

// -- Pagination --

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
    pub search: Option<String>,
    pub sender_id: Option<i64>,
}

impl PageQuery {
    pub const DEFAULT_LIMIT: u32 = 100;
    pub const MAX_LIMIT: u32 = 500;

    /// Requested limit, hard-capped regardless of what the client asked for.
    pub fn limit(&self) -> u32 {
        self.limit.unwrap_or(Self::DEFAULT_LIMIT).min(Self::MAX_LIMIT)
    }

    pub fn offset(&self) -> u32 {
        self.offset.unwrap_or(0)
    }

    /// Search term, if one was given and is not blank.
    pub fn search(&self) -> Option<&str> {
        self.search.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }
}
