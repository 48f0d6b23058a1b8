use rusqlite::{Connection, Row, ToSql};
use tracing::info;
use warden_types::{Role, User};

use crate::Database;
use crate::error::is_unique_violation;
use crate::models::{OptionalExt, UserRow, UserUpdate, timestamp_now};
use crate::password;
use crate::{StoreError, StoreResult};

const USER_COLUMNS: &str = "id, username, role, created_by, created_at, is_active";

impl Database {
    // -- Users --

    /// Create an account and return its id. The password is hashed before
    /// the write guard is taken; the uniqueness check and insert run under it.
    pub fn create_user(
        &self,
        username: &str,
        password: &str,
        role: Role,
        created_by: Option<i64>,
    ) -> StoreResult<i64> {
        let password_hash = password::hash_password(password)?;
        let created_at = timestamp_now();

        self.with_conn_mut(|conn| {
            if username_owner(conn, username)?.is_some() {
                return Err(StoreError::Conflict(username.to_string()));
            }

            conn.execute(
                "INSERT INTO users (username, password_hash, role, created_by, created_at, is_active)
                 VALUES (?1, ?2, ?3, ?4, ?5, 1)",
                rusqlite::params![username, password_hash, role.as_str(), created_by, created_at],
            )
            .map_err(|e| {
                if is_unique_violation(&e) {
                    StoreError::Conflict(username.to_string())
                } else {
                    e.into()
                }
            })?;

            let id = conn.last_insert_rowid();
            info!("Created {} '{}' (id {}, created by {:?})", role, username, id, created_by);
            Ok(id)
        })
    }

    /// Returns the user only if it exists, is active, and the password matches.
    pub fn verify_credentials(&self, username: &str, password: &str) -> StoreResult<Option<User>> {
        let Some((row, password_hash)) = self.with_conn(|conn| query_credentials(conn, username))?
        else {
            return Ok(None);
        };

        if !row.is_active || !password::verify_password(password, &password_hash) {
            return Ok(None);
        }

        row.into_user().map(Some)
    }

    pub fn get_user_by_id(&self, id: i64) -> StoreResult<Option<User>> {
        self.with_conn(|conn| query_user_by_id(conn, id))?
            .map(UserRow::into_user)
            .transpose()
    }

    pub fn get_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {} FROM users WHERE username = ?1", USER_COLUMNS);
            conn.query_row(&sql, [username], map_user_row).optional()
        })?
        .map(UserRow::into_user)
        .transpose()
    }

    /// All users, newest first, optionally only those created by `created_by`.
    pub fn list_users(&self, created_by: Option<i64>) -> StoreResult<Vec<User>> {
        let rows = self.with_conn(|conn| {
            let rows = match created_by {
                Some(creator) => {
                    let sql = format!(
                        "SELECT {} FROM users WHERE created_by = ?1 ORDER BY id DESC",
                        USER_COLUMNS
                    );
                    let mut stmt = conn.prepare(&sql)?;
                    stmt.query_map([creator], map_user_row)?
                        .collect::<Result<Vec<_>, _>>()?
                }
                None => {
                    let sql = format!("SELECT {} FROM users ORDER BY id DESC", USER_COLUMNS);
                    let mut stmt = conn.prepare(&sql)?;
                    stmt.query_map([], map_user_row)?
                        .collect::<Result<Vec<_>, _>>()?
                }
            };
            Ok(rows)
        })?;

        rows.into_iter().map(UserRow::into_user).collect()
    }

    pub fn count_users(&self) -> StoreResult<u64> {
        self.with_conn(|conn| {
            Ok(conn.query_row("SELECT COUNT(*) FROM users", [], |r| r.get(0))?)
        })
    }

    /// Apply the supplied fields. Returns `Ok(false)` when nothing was
    /// supplied. Renaming to the user's current name is a successful no-op.
    pub fn update_user(&self, id: i64, update: &UserUpdate) -> StoreResult<bool> {
        let password_hash = update
            .password
            .as_deref()
            .map(password::hash_password)
            .transpose()?;

        self.with_conn_mut(|conn| {
            let current = query_user_by_id(conn, id)?.ok_or(StoreError::UserNotFound(id))?;

            if update.is_empty() {
                return Ok(false);
            }

            let mut sets: Vec<&str> = Vec::new();
            let mut values: Vec<Box<dyn ToSql>> = Vec::new();

            if let Some(username) = &update.username {
                if *username != current.username {
                    if let Some(owner) = username_owner(conn, username)? {
                        if owner != id {
                            return Err(StoreError::Conflict(username.clone()));
                        }
                    }
                    sets.push("username = ?");
                    values.push(Box::new(username.clone()));
                }
            }
            if let Some(hash) = password_hash {
                sets.push("password_hash = ?");
                values.push(Box::new(hash));
            }
            if let Some(is_active) = update.is_active {
                sets.push("is_active = ?");
                values.push(Box::new(is_active));
            }

            if sets.is_empty() {
                return Ok(true);
            }

            let sql = format!("UPDATE users SET {} WHERE id = ?", sets.join(", "));
            values.push(Box::new(id));
            let params: Vec<&dyn ToSql> = values.iter().map(|v| v.as_ref()).collect();

            conn.execute(&sql, params.as_slice()).map_err(|e| match &update.username {
                Some(username) if is_unique_violation(&e) => StoreError::Conflict(username.clone()),
                _ => e.into(),
            })?;

            info!("Updated user {} ({})", id, sets.join(", "));
            Ok(true)
        })
    }

    /// Soft delete. Deactivating an already inactive user succeeds again.
    pub fn deactivate_user(&self, id: i64) -> StoreResult<()> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute("UPDATE users SET is_active = 0 WHERE id = ?1", [id])?;
            if changed == 0 {
                return Err(StoreError::UserNotFound(id));
            }
            info!("Deactivated user {}", id);
            Ok(())
        })
    }

    /// Create the first admin account if the store has no users at all.
    /// Returns the new id, or `None` if accounts already exist.
    pub fn seed_admin(&self, username: &str, password: &str) -> StoreResult<Option<i64>> {
        if self.count_users()? > 0 {
            info!("Users present, skipping admin bootstrap");
            return Ok(None);
        }

        let id = self.create_user(username, password, Role::Admin, None)?;
        info!("Bootstrapped admin account '{}'", username);
        Ok(Some(id))
    }
}

fn map_user_row(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        username: row.get(1)?,
        role: row.get(2)?,
        created_by: row.get(3)?,
        created_at: row.get(4)?,
        is_active: row.get(5)?,
    })
}

fn query_user_by_id(conn: &Connection, id: i64) -> StoreResult<Option<UserRow>> {
    let sql = format!("SELECT {} FROM users WHERE id = ?1", USER_COLUMNS);
    conn.query_row(&sql, [id], map_user_row).optional()
}

fn query_credentials(conn: &Connection, username: &str) -> StoreResult<Option<(UserRow, String)>> {
    let sql = format!("SELECT {}, password_hash FROM users WHERE username = ?1", USER_COLUMNS);
    conn.query_row(&sql, [username], |row| Ok((map_user_row(row)?, row.get(6)?)))
        .optional()
}

fn username_owner(conn: &Connection, username: &str) -> StoreResult<Option<i64>> {
    conn.query_row("SELECT id FROM users WHERE username = ?1", [username], |row| row.get(0))
        .optional()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn db() -> Database {
        Database::open_in_memory().unwrap()
    }

    #[test]
    fn test_create_and_fetch() {
        let db = db();
        let admin = db.create_user("root", "pw-root", Role::Admin, None).unwrap();
        let id = db.create_user("alice", "pw-alice", Role::Manager, Some(admin)).unwrap();

        let user = db.get_user_by_id(id).unwrap().unwrap();
        assert_eq!(user.username, "alice");
        assert_eq!(user.role, Role::Manager);
        assert_eq!(user.created_by, Some(admin));
        assert!(user.is_active);

        let same = db.get_user_by_username("alice").unwrap().unwrap();
        assert_eq!(same, user);
        assert!(db.get_user_by_id(9999).unwrap().is_none());
    }

    #[test]
    fn test_duplicate_username_conflicts_without_mutation() {
        let db = db();
        db.create_user("root", "pw", Role::Admin, None).unwrap();
        let err = db.create_user("root", "other", Role::Worker, None).unwrap_err();
        assert!(matches!(err, StoreError::Conflict(name) if name == "root"));
        assert_eq!(db.count_users().unwrap(), 1);
        // old password still works
        assert!(db.verify_credentials("root", "pw").unwrap().is_some());
    }

    #[test]
    fn test_unknown_creator_is_rejected() {
        let db = db();
        let err = db.create_user("orphan", "pw", Role::Worker, Some(42)).unwrap_err();
        assert!(matches!(err, StoreError::Sqlite(_)));
    }

    #[test]
    fn test_verify_credentials() {
        let db = db();
        let id = db.create_user("bob", "hunter2", Role::Admin, None).unwrap();

        let user = db.verify_credentials("bob", "hunter2").unwrap().unwrap();
        assert_eq!(user.id, id);
        assert!(db.verify_credentials("bob", "wrong").unwrap().is_none());
        assert!(db.verify_credentials("nobody", "hunter2").unwrap().is_none());

        db.deactivate_user(id).unwrap();
        assert!(db.verify_credentials("bob", "hunter2").unwrap().is_none());
    }

    #[test]
    fn test_update_user_fields() {
        let db = db();
        let admin = db.create_user("root", "pw", Role::Admin, None).unwrap();
        let id = db.create_user("carol", "old-pass", Role::Worker, Some(admin)).unwrap();

        let changed = db
            .update_user(id, &UserUpdate {
                username: Some("caroline".into()),
                password: Some("new-pass".into()),
                is_active: None,
            })
            .unwrap();
        assert!(changed);

        assert!(db.verify_credentials("caroline", "new-pass").unwrap().is_some());
        assert!(db.verify_credentials("caroline", "old-pass").unwrap().is_none());
        assert!(db.get_user_by_username("carol").unwrap().is_none());
    }

    #[test]
    fn test_update_user_edge_cases() {
        let db = db();
        let admin = db.create_user("root", "pw", Role::Admin, None).unwrap();
        let id = db.create_user("dave", "pw", Role::Worker, Some(admin)).unwrap();

        // nothing supplied
        assert!(!db.update_user(id, &UserUpdate::default()).unwrap());

        // rename to own name is a no-op success
        let same = UserUpdate { username: Some("dave".into()), ..Default::default() };
        assert!(db.update_user(id, &same).unwrap());

        // rename onto someone else
        let taken = UserUpdate { username: Some("root".into()), ..Default::default() };
        assert!(matches!(db.update_user(id, &taken), Err(StoreError::Conflict(_))));
        assert_eq!(db.get_user_by_id(id).unwrap().unwrap().username, "dave");

        // missing target
        assert!(matches!(
            db.update_user(777, &UserUpdate::default()),
            Err(StoreError::UserNotFound(777))
        ));
    }

    #[test]
    fn test_deactivate_is_idempotent() {
        let db = db();
        let id = db.create_user("erin", "pw", Role::Admin, None).unwrap();

        db.deactivate_user(id).unwrap();
        db.deactivate_user(id).unwrap();
        assert!(!db.get_user_by_id(id).unwrap().unwrap().is_active);

        assert!(matches!(db.deactivate_user(555), Err(StoreError::UserNotFound(555))));
    }

    #[test]
    fn test_list_users_by_creator() {
        let db = db();
        let admin = db.create_user("root", "pw", Role::Admin, None).unwrap();
        let m1 = db.create_user("m1", "pw", Role::Manager, Some(admin)).unwrap();
        let w1 = db.create_user("w1", "pw", Role::Worker, Some(m1)).unwrap();
        let w2 = db.create_user("w2", "pw", Role::Worker, Some(admin)).unwrap();

        let all: Vec<i64> = db.list_users(None).unwrap().iter().map(|u| u.id).collect();
        assert_eq!(all, vec![w2, w1, m1, admin]);

        let mine: Vec<i64> = db.list_users(Some(m1)).unwrap().iter().map(|u| u.id).collect();
        assert_eq!(mine, vec![w1]);
    }

    #[test]
    fn test_seed_admin_only_when_empty() {
        let db = db();
        let id = db.seed_admin("admin", "bootstrap").unwrap().unwrap();
        let admin = db.get_user_by_id(id).unwrap().unwrap();
        assert_eq!(admin.role, Role::Admin);
        assert_eq!(admin.created_by, None);

        assert!(db.seed_admin("admin2", "bootstrap").unwrap().is_none());
        assert_eq!(db.count_users().unwrap(), 1);
    }
}
