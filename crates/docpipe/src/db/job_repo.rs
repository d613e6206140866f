//! Processing job repository — lifecycle operations for the
//! `processing_jobs` table.

use rusqlite::{params, Connection, Row};

use super::{Database, DatabaseError};

/// A raw processing job row from the database.
#[derive(Debug, Clone)]
pub struct JobRow {
    pub id: i64,
    pub document_id: String,
    pub job_type: String,
    pub status: String,
    pub error: Option<String>,
    pub result_data: Option<String>,
    pub started_at: Option<String>,
    pub completed_at: Option<String>,
    pub created_at: String,
}

impl JobRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            document_id: row.get("document_id")?,
            job_type: row.get("job_type")?,
            status: row.get("status")?,
            error: row.get("error")?,
            result_data: row.get("result_data")?,
            started_at: row.get("started_at")?,
            completed_at: row.get("completed_at")?,
            created_at: row.get("created_at")?,
        })
    }
}

/// Inserts a pending job for a document and returns its ID.
pub fn insert_pending(
    db: &Database,
    document_id: &str,
    job_type: &str,
    now: &str,
) -> Result<i64, DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO processing_jobs (document_id, job_type, status, created_at)
             VALUES (?1, ?2, 'pending', ?3)",
            params![document_id, job_type, now],
        )?;
        Ok(conn.last_insert_rowid())
    })
}

/// Transitions a pending job to running and stamps its start time.
pub fn mark_running(db: &Database, job_id: i64, now: &str) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "UPDATE processing_jobs SET status = 'running', started_at = ?2 WHERE id = ?1",
            params![job_id, now],
        )?;
        Ok(())
    })
}

/// Finds a job by its ID.
pub fn find_by_id(db: &Database, job_id: i64) -> Result<Option<JobRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare("SELECT * FROM processing_jobs WHERE id = ?1")?;
        let mut rows = stmt.query_map(params![job_id], JobRow::from_row)?;
        match rows.next() {
            Some(Ok(row)) => Ok(Some(row)),
            Some(Err(e)) => Err(DatabaseError::Sqlite(e)),
            None => Ok(None),
        }
    })
}

/// Finds a non-terminal job for a document, if any. Used as the concurrency
/// guard: at most one pending or running job per document.
pub fn find_active(db: &Database, document_id: &str) -> Result<Option<JobRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT * FROM processing_jobs
             WHERE document_id = ?1 AND status IN ('pending', 'running')
             ORDER BY created_at DESC LIMIT 1",
        )?;
        let mut rows = stmt.query_map(params![document_id], JobRow::from_row)?;
        match rows.next() {
            Some(Ok(row)) => Ok(Some(row)),
            Some(Err(e)) => Err(DatabaseError::Sqlite(e)),
            None => Ok(None),
        }
    })
}

/// Lists a document's jobs, newest first.
pub fn list_for_document(db: &Database, document_id: &str) -> Result<Vec<JobRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT * FROM processing_jobs WHERE document_id = ?1
             ORDER BY created_at DESC, id DESC",
        )?;
        let rows = stmt
            .query_map(params![document_id], JobRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

/// Closes a job as completed inside an open transaction.
pub fn complete_tx(
    conn: &Connection,
    job_id: i64,
    result_data: &str,
    now: &str,
) -> Result<(), DatabaseError> {
    conn.execute(
        "UPDATE processing_jobs SET status = 'completed', result_data = ?2, completed_at = ?3
         WHERE id = ?1",
        params![job_id, result_data, now],
    )?;
    Ok(())
}

/// Closes a job as failed inside an open transaction.
pub fn fail_tx(conn: &Connection, job_id: i64, error: &str, now: &str) -> Result<(), DatabaseError> {
    conn.execute(
        "UPDATE processing_jobs SET status = 'failed', error = ?2, completed_at = ?3
         WHERE id = ?1",
        params![job_id, error, now],
    )?;
    Ok(())
}
