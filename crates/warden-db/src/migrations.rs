use rusqlite::Connection;
use tracing::info;

use crate::StoreResult;

pub fn run(conn: &Connection) -> StoreResult<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < 1 {
        info!("Database: running migration v1 (initial schema)");
        conn.execute_batch(
            "
            BEGIN;

            CREATE TABLE users (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                username        TEXT NOT NULL UNIQUE,
                password_hash   TEXT NOT NULL,
                role            TEXT NOT NULL CHECK (role IN ('worker', 'manager', 'admin')),
                created_by      INTEGER REFERENCES users(id),
                created_at      TEXT NOT NULL,
                is_active       INTEGER NOT NULL DEFAULT 1
            );

            CREATE INDEX idx_users_created_by ON users(created_by);

            CREATE TABLE contacts (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                phone           TEXT NOT NULL UNIQUE,
                name            TEXT,
                source_group    TEXT,
                scraped_by      INTEGER REFERENCES users(id),
                scraped_at      TEXT NOT NULL
            );

            CREATE INDEX idx_contacts_scraped_at ON contacts(scraped_at);

            CREATE TABLE message_logs (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                sender_id       INTEGER REFERENCES users(id),
                recipient_phone TEXT NOT NULL,
                message_content TEXT NOT NULL DEFAULT '',
                attachment_path TEXT,
                template_used   TEXT,
                sent_at         TEXT NOT NULL,
                status          TEXT NOT NULL DEFAULT 'sent'
            );

            CREATE INDEX idx_message_logs_sender ON message_logs(sender_id, sent_at);

            INSERT INTO schema_version (version) VALUES (1);

            COMMIT;
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
