use rusqlite::{Connection, Row};
use warden_types::MessageLog;
use warden_types::api::NewMessage;

use crate::Database;
use crate::StoreResult;
use crate::models::{MessageRow, timestamp_now};

const INSERT_MESSAGE: &str = "
    INSERT INTO message_logs
        (sender_id, recipient_phone, message_content, attachment_path, template_used, sent_at, status)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)";

impl Database {
    // -- Message logs --

    /// Append one log entry for `sender_id` and return its id. Callers
    /// validate the recipient; the store writes whatever it is given.
    pub fn append_message(&self, sender_id: i64, message: &NewMessage) -> StoreResult<i64> {
        let sent_at = timestamp_now();
        self.with_conn_mut(|conn| {
            conn.execute(INSERT_MESSAGE, rusqlite::params![
                sender_id,
                message.recipient_phone.trim(),
                message.message_content,
                message.attachment_path,
                message.template_used,
                sent_at,
                message.status(),
            ])?;
            Ok(conn.last_insert_rowid())
        })
    }

    /// Append a batch in one transaction, skipping entries with no
    /// recipient. Returns how many were written.
    pub fn bulk_append_messages(&self, messages: &[NewMessage], sender_id: i64) -> StoreResult<usize> {
        let sent_at = timestamp_now();
        self.with_conn_mut(|conn| {
            let tx = conn.unchecked_transaction()?;
            let mut count = 0;
            {
                let mut stmt = tx.prepare(INSERT_MESSAGE)?;
                for message in messages {
                    let recipient = message.recipient_phone.trim();
                    if recipient.is_empty() {
                        continue;
                    }
                    stmt.execute(rusqlite::params![
                        sender_id,
                        recipient,
                        message.message_content,
                        message.attachment_path,
                        message.template_used,
                        sent_at,
                        message.status(),
                    ])?;
                    count += 1;
                }
            }
            tx.commit()?;
            Ok(count)
        })
    }

    /// Newest first, with the sender's current username.
    pub fn list_messages(
        &self,
        limit: u32,
        offset: u32,
        sender_id: Option<i64>,
    ) -> StoreResult<Vec<MessageLog>> {
        let rows = self.with_conn(|conn| query_messages(conn, limit, offset, sender_id))?;
        rows.into_iter().map(MessageRow::into_message).collect()
    }

    pub fn count_messages(&self, sender_id: Option<i64>) -> StoreResult<u64> {
        self.with_conn(|conn| {
            let count = match sender_id {
                Some(sender) => conn.query_row(
                    "SELECT COUNT(*) FROM message_logs WHERE sender_id = ?1",
                    [sender],
                    |r| r.get(0),
                )?,
                None => conn.query_row("SELECT COUNT(*) FROM message_logs", [], |r| r.get(0))?,
            };
            Ok(count)
        })
    }
}

fn map_message_row(row: &Row<'_>) -> rusqlite::Result<MessageRow> {
    Ok(MessageRow {
        id: row.get(0)?,
        sender_id: row.get(1)?,
        sender_username: row.get(2)?,
        recipient_phone: row.get(3)?,
        message_content: row.get(4)?,
        attachment_path: row.get(5)?,
        template_used: row.get(6)?,
        sent_at: row.get(7)?,
        status: row.get(8)?,
    })
}

fn query_messages(
    conn: &Connection,
    limit: u32,
    offset: u32,
    sender_id: Option<i64>,
) -> StoreResult<Vec<MessageRow>> {
    // JOIN users to fetch sender_username in a single query
    let rows = match sender_id {
        Some(sender) => {
            let mut stmt = conn.prepare(
                "SELECT m.id, m.sender_id, u.username, m.recipient_phone, m.message_content,
                        m.attachment_path, m.template_used, m.sent_at, m.status
                 FROM message_logs m
                 LEFT JOIN users u ON m.sender_id = u.id
                 WHERE m.sender_id = ?1
                 ORDER BY m.sent_at DESC, m.id DESC
                 LIMIT ?2 OFFSET ?3",
            )?;
            stmt.query_map(rusqlite::params![sender, limit, offset], map_message_row)?
                .collect::<Result<Vec<_>, _>>()?
        }
        None => {
            let mut stmt = conn.prepare(
                "SELECT m.id, m.sender_id, u.username, m.recipient_phone, m.message_content,
                        m.attachment_path, m.template_used, m.sent_at, m.status
                 FROM message_logs m
                 LEFT JOIN users u ON m.sender_id = u.id
                 ORDER BY m.sent_at DESC, m.id DESC
                 LIMIT ?1 OFFSET ?2",
            )?;
            stmt.query_map(rusqlite::params![limit, offset], map_message_row)?
                .collect::<Result<Vec<_>, _>>()?
        }
    };

    Ok(rows)
}
