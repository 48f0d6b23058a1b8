use rusqlite::{Connection, Row};
use warden_types::Contact;
use warden_types::api::NewContact;

use crate::Database;
use crate::StoreResult;
use crate::models::{ContactRow, timestamp_now};

const UPSERT_CONTACT: &str = "
    INSERT INTO contacts (phone, name, source_group, scraped_by, scraped_at)
    VALUES (?1, ?2, ?3, ?4, ?5)
    ON CONFLICT(phone) DO UPDATE SET
        name = excluded.name,
        source_group = excluded.source_group,
        scraped_by = excluded.scraped_by,
        scraped_at = excluded.scraped_at
    RETURNING id";

impl Database {
    // -- Contacts --

    /// Insert or overwrite the contact keyed by `phone`. Last write wins;
    /// nothing from the previous row is merged.
    pub fn upsert_contact(
        &self,
        phone: &str,
        name: Option<&str>,
        source_group: Option<&str>,
        scraped_by: i64,
    ) -> StoreResult<i64> {
        let scraped_at = timestamp_now();
        self.with_conn_mut(|conn| {
            Ok(conn.query_row(
                UPSERT_CONTACT,
                rusqlite::params![phone, name, source_group, scraped_by, scraped_at],
                |row| row.get(0),
            )?)
        })
    }

    /// Upsert a batch in one transaction. Entries without a phone are
    /// skipped; returns how many were written.
    pub fn bulk_upsert_contacts(
        &self,
        contacts: &[NewContact],
        source_group: &str,
        scraped_by: i64,
    ) -> StoreResult<usize> {
        let scraped_at = timestamp_now();
        self.with_conn_mut(|conn| {
            let tx = conn.unchecked_transaction()?;
            let mut count = 0;
            {
                let mut stmt = tx.prepare(UPSERT_CONTACT)?;
                for contact in contacts {
                    let Some(phone) = contact.phone.as_deref().map(str::trim).filter(|p| !p.is_empty())
                    else {
                        continue;
                    };
                    stmt.query_row(
                        rusqlite::params![phone, contact.name, source_group, scraped_by, scraped_at],
                        |row| row.get::<_, i64>(0),
                    )?;
                    count += 1;
                }
            }
            tx.commit()?;
            Ok(count)
        })
    }

    /// Newest first. `search` is a literal substring match on phone or name.
    pub fn list_contacts(
        &self,
        limit: u32,
        offset: u32,
        search: Option<&str>,
    ) -> StoreResult<Vec<Contact>> {
        let rows = self.with_conn(|conn| query_contacts(conn, limit, offset, search))?;
        rows.into_iter().map(ContactRow::into_contact).collect()
    }

    pub fn count_contacts(&self) -> StoreResult<u64> {
        self.with_conn(|conn| {
            Ok(conn.query_row("SELECT COUNT(*) FROM contacts", [], |r| r.get(0))?)
        })
    }
}

fn map_contact_row(row: &Row<'_>) -> rusqlite::Result<ContactRow> {
    Ok(ContactRow {
        id: row.get(0)?,
        phone: row.get(1)?,
        name: row.get(2)?,
        source_group: row.get(3)?,
        scraped_by: row.get(4)?,
        scraped_at: row.get(5)?,
    })
}

fn query_contacts(
    conn: &Connection,
    limit: u32,
    offset: u32,
    search: Option<&str>,
) -> StoreResult<Vec<ContactRow>> {
    let rows = match search {
        Some(term) => {
            let pattern = format!("%{}%", escape_like(term));
            let mut stmt = conn.prepare(
                "SELECT id, phone, name, source_group, scraped_by, scraped_at
                 FROM contacts
                 WHERE phone LIKE ?1 ESCAPE '\\' OR name LIKE ?1 ESCAPE '\\'
                 ORDER BY scraped_at DESC, id DESC
                 LIMIT ?2 OFFSET ?3",
            )?;
            stmt.query_map(rusqlite::params![pattern, limit, offset], map_contact_row)?
                .collect::<Result<Vec<_>, _>>()?
        }
        None => {
            let mut stmt = conn.prepare(
                "SELECT id, phone, name, source_group, scraped_by, scraped_at
                 FROM contacts
                 ORDER BY scraped_at DESC, id DESC
                 LIMIT ?1 OFFSET ?2",
            )?;
            stmt.query_map(rusqlite::params![limit, offset], map_contact_row)?
                .collect::<Result<Vec<_>, _>>()?
        }
    };

    Ok(rows)
}

fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for ch in term.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}
