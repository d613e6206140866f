//! Section repository — persistence for the `sections` table.

use rusqlite::{params, Connection, Row};

use super::{Database, DatabaseError};

/// A raw section row from the database.
#[derive(Debug, Clone)]
pub struct SectionRow {
    pub id: i64,
    pub document_id: String,
    pub section_type: String,
    pub content: String,
    pub ord: i64,
    pub created_at: String,
}

impl SectionRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            document_id: row.get("document_id")?,
            section_type: row.get("section_type")?,
            content: row.get("content")?,
            ord: row.get("ord")?,
            created_at: row.get("created_at")?,
        })
    }
}

/// A section awaiting insertion. Order comes from slice position.
#[derive(Debug, Clone)]
pub struct NewSection {
    pub section_type: String,
    pub content: String,
}

/// Replaces all sections of a document inside an open transaction. Previous
/// sections are dropped so reprocessing never leaves stale rows; ord is
/// assigned contiguously from 0 in slice order.
pub fn replace_for_document_tx(
    conn: &Connection,
    document_id: &str,
    sections: &[NewSection],
    now: &str,
) -> Result<(), DatabaseError> {
    conn.execute(
        "DELETE FROM sections WHERE document_id = ?1",
        params![document_id],
    )?;

    let mut stmt = conn.prepare(
        "INSERT INTO sections (document_id, section_type, content, ord, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
    )?;
    for (ord, section) in sections.iter().enumerate() {
        stmt.execute(params![
            document_id,
            section.section_type,
            section.content,
            ord as i64,
            now,
        ])?;
    }
    Ok(())
}

/// Lists a document's sections in order.
pub fn list_for_document(
    db: &Database,
    document_id: &str,
) -> Result<Vec<SectionRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt =
            conn.prepare("SELECT * FROM sections WHERE document_id = ?1 ORDER BY ord ASC")?;
        let rows = stmt
            .query_map(params![document_id], SectionRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

/// Counts a document's sections.
pub fn count_for_document(db: &Database, document_id: &str) -> Result<u64, DatabaseError> {
    db.with_conn(|conn| {
        let count: u64 = conn.query_row(
            "SELECT COUNT(*) FROM sections WHERE document_id = ?1",
            params![document_id],
            |r| r.get(0),
        )?;
        Ok(count)
    })
}
