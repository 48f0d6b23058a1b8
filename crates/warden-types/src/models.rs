use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Account roles, ordered from least to most privileged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Worker,
    Manager,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Worker => "worker",
            Role::Manager => "manager",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownRole(pub String);

impl fmt::Display for UnknownRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown role '{}'", self.0)
    }
}

impl std::error::Error for UnknownRole {}

impl FromStr for Role {
    type Err = UnknownRole;

    /// Case-insensitive; surrounding whitespace is ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "worker" => Ok(Role::Worker),
            "manager" => Ok(Role::Manager),
            "admin" => Ok(Role::Admin),
            _ => Err(UnknownRole(s.to_string())),
        }
    }
}

/// A user account as seen outside the credential store.
/// The password hash deliberately has no field here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub role: Role,
    pub created_by: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    pub id: i64,
    pub phone: String,
    pub name: Option<String>,
    pub source_group: Option<String>,
    pub scraped_by: Option<i64>,
    pub scraped_at: DateTime<Utc>,
}

/// Append-only record of a message sent by a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageLog {
    pub id: i64,
    pub sender_id: Option<i64>,
    pub sender_username: Option<String>,
    pub recipient_phone: String,
    pub message_content: String,
    pub attachment_path: Option<String>,
    pub template_used: Option<String>,
    pub sent_at: DateTime<Utc>,
    pub status: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_ordering() {
        assert!(Role::Worker < Role::Manager);
        assert!(Role::Manager < Role::Admin);
    }

    #[test]
    fn test_role_parse() {
        assert_eq!("worker".parse::<Role>(), Ok(Role::Worker));
        assert_eq!(" Manager ".parse::<Role>(), Ok(Role::Manager));
        assert_eq!("ADMIN".parse::<Role>(), Ok(Role::Admin));
        assert!("superuser".parse::<Role>().is_err());
    }

    #[test]
    fn test_role_serde_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Manager).unwrap(), "\"manager\"");
        let role: Role = serde_json::from_str("\"worker\"").unwrap();
        assert_eq!(role, Role::Worker);
    }
}
