use thiserror::Error;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("username '{0}' is already taken")]
    Conflict(String),

    #[error("user {0} not found")]
    UserNotFound(i64),

    #[error("password hashing failed: {0}")]
    Hash(String),

    #[error("database lock poisoned: {0}")]
    Poisoned(String),

    #[error("corrupt row: {0}")]
    Corrupt(String),

    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
}

/// SQLITE_CONSTRAINT_UNIQUE extended result code.
const SQLITE_CONSTRAINT_UNIQUE: i32 = 2067;

pub(crate) fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.extended_code == SQLITE_CONSTRAINT_UNIQUE
    )
}
