//! Database row types. These map directly to SQLite rows and are converted
//! into the `warden-types` models at the crate boundary.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use warden_types::{Contact, MessageLog, Role, User};

use crate::{StoreError, StoreResult};

pub(crate) struct UserRow {
    pub id: i64,
    pub username: String,
    pub role: String,
    pub created_by: Option<i64>,
    pub created_at: String,
    pub is_active: bool,
}

impl UserRow {
    pub fn into_user(self) -> StoreResult<User> {
        let role: Role = self
            .role
            .parse()
            .map_err(|e| StoreError::Corrupt(format!("user {}: {}", self.id, e)))?;

        Ok(User {
            id: self.id,
            username: self.username,
            role,
            created_by: self.created_by,
            created_at: parse_timestamp(&self.created_at)?,
            is_active: self.is_active,
        })
    }
}

pub(crate) struct ContactRow {
    pub id: i64,
    pub phone: String,
    pub name: Option<String>,
    pub source_group: Option<String>,
    pub scraped_by: Option<i64>,
    pub scraped_at: String,
}

impl ContactRow {
    pub fn into_contact(self) -> StoreResult<Contact> {
        Ok(Contact {
            id: self.id,
            phone: self.phone,
            name: self.name,
            source_group: self.source_group,
            scraped_by: self.scraped_by,
            scraped_at: parse_timestamp(&self.scraped_at)?,
        })
    }
}

pub(crate) struct MessageRow {
    pub id: i64,
    pub sender_id: Option<i64>,
    pub sender_username: Option<String>,
    pub recipient_phone: String,
    pub message_content: String,
    pub attachment_path: Option<String>,
    pub template_used: Option<String>,
    pub sent_at: String,
    pub status: String,
}

impl MessageRow {
    pub fn into_message(self) -> StoreResult<MessageLog> {
        Ok(MessageLog {
            id: self.id,
            sender_id: self.sender_id,
            sender_username: self.sender_username,
            recipient_phone: self.recipient_phone,
            message_content: self.message_content,
            attachment_path: self.attachment_path,
            template_used: self.template_used,
            sent_at: parse_timestamp(&self.sent_at)?,
            status: self.status,
        })
    }
}

/// Fields to change on a user. `None` leaves the column untouched.
#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
    pub username: Option<String>,
    pub password: Option<String>,
    pub is_active: Option<bool>,
}

impl UserUpdate {
    pub fn is_empty(&self) -> bool {
        self.username.is_none() && self.password.is_none() && self.is_active.is_none()
    }
}

/// Fixed-width UTC timestamp so lexical order in SQLite matches time order.
pub(crate) fn timestamp_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_timestamp(raw: &str) -> StoreResult<DateTime<Utc>> {
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| {
            // datetime('now') style, written without a timezone.
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .map_err(|e| StoreError::Corrupt(format!("timestamp '{}': {}", raw, e)))
}

/// Extension trait for optional query results
pub(crate) trait OptionalExt<T> {
    fn optional(self) -> StoreResult<Option<T>>;
}

impl<T> OptionalExt<T> for Result<T, rusqlite::Error> {
    fn optional(self) -> StoreResult<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
