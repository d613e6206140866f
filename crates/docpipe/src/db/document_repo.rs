//! Document repository — CRUD operations for the `documents` table, plus
//! the transactional state changes the pipeline commits at its boundary.

use rusqlite::{params, Row};

use super::{job_repo, section_repo, Database, DatabaseError};

/// A raw document row from the database.
#[derive(Debug, Clone)]
pub struct DocumentRow {
    pub id: String,
    pub filename: String,
    pub file_path: String,
    pub file_size: i64,
    pub status: String,
    pub extracted_text: Option<String>,
    pub extraction_metadata: Option<String>,
    pub error: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl DocumentRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            filename: row.get("filename")?,
            file_path: row.get("file_path")?,
            file_size: row.get("file_size")?,
            status: row.get("status")?,
            extracted_text: row.get("extracted_text")?,
            extraction_metadata: row.get("extraction_metadata")?,
            error: row.get("error")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

/// Inserts a new document row.
pub fn insert(db: &Database, document: &DocumentRow) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO documents (id, filename, file_path, file_size, status, extracted_text,
             extraction_metadata, error, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                document.id,
                document.filename,
                document.file_path,
                document.file_size,
                document.status,
                document.extracted_text,
                document.extraction_metadata,
                document.error,
                document.created_at,
                document.updated_at,
            ],
        )?;
        Ok(())
    })
}

/// Finds a document by its ID.
pub fn find_by_id(db: &Database, id: &str) -> Result<Option<DocumentRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare("SELECT * FROM documents WHERE id = ?1")?;
        let mut rows = stmt.query_map(params![id], DocumentRow::from_row)?;
        match rows.next() {
            Some(Ok(row)) => Ok(Some(row)),
            Some(Err(e)) => Err(DatabaseError::Sqlite(e)),
            None => Ok(None),
        }
    })
}

/// Lists documents with the given status, oldest first.
pub fn list_by_status(db: &Database, status: &str) -> Result<Vec<DocumentRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt =
            conn.prepare("SELECT * FROM documents WHERE status = ?1 ORDER BY created_at ASC")?;
        let rows = stmt
            .query_map(params![status], DocumentRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

/// Updates only the status and updated_at of a document.
pub fn set_status(
    db: &Database,
    id: &str,
    status: &str,
    updated_at: &str,
) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "UPDATE documents SET status = ?2, updated_at = ?3 WHERE id = ?1",
            params![id, status, updated_at],
        )?;
        Ok(())
    })
}

/// Deletes a document. Sections and jobs follow via ON DELETE CASCADE.
/// Returns whether a row was actually removed.
pub fn delete(db: &Database, id: &str) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let affected = conn.execute("DELETE FROM documents WHERE id = ?1", params![id])?;
        Ok(affected > 0)
    })
}

/// Atomically flips a document to `processing` and opens a `running` job
/// for it. Returns `Ok(None)` without changing anything when the document
/// already has an active (pending or running) job; the check and the
/// transition commit under one transaction and the connection lock, so two
/// concurrent callers can never both start.
pub fn begin_extraction(
    db: &Database,
    document_id: &str,
    job_type: &str,
    now: &str,
) -> Result<Option<i64>, DatabaseError> {
    db.with_conn(|conn| {
        let tx = conn.unchecked_transaction()?;

        let active: u32 = tx.query_row(
            "SELECT COUNT(*) FROM processing_jobs
             WHERE document_id = ?1 AND status IN ('pending', 'running')",
            params![document_id],
            |r| r.get(0),
        )?;
        if active > 0 {
            return Ok(None);
        }

        tx.execute(
            "UPDATE documents SET status = 'processing', updated_at = ?2 WHERE id = ?1",
            params![document_id, now],
        )?;
        tx.execute(
            "INSERT INTO processing_jobs (document_id, job_type, status, started_at, created_at)
             VALUES (?1, ?2, 'running', ?3, ?3)",
            params![document_id, job_type, now],
        )?;
        let job_id = tx.last_insert_rowid();

        tx.commit()?;
        Ok(Some(job_id))
    })
}

/// Commits a successful extraction in one transaction: the document gets its
/// text, metadata and `completed` status, its sections are replaced, and the
/// job is closed out. Either everything lands or nothing does.
#[allow(clippy::too_many_arguments)]
pub fn complete_extraction(
    db: &Database,
    document_id: &str,
    text: &str,
    metadata_json: &str,
    sections: &[section_repo::NewSection],
    job_id: i64,
    result_data: &str,
    now: &str,
) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        let tx = conn.unchecked_transaction()?;

        tx.execute(
            "UPDATE documents SET status = 'completed', extracted_text = ?2,
             extraction_metadata = ?3, error = NULL, updated_at = ?4
             WHERE id = ?1",
            params![document_id, text, metadata_json, now],
        )?;
        section_repo::replace_for_document_tx(&tx, document_id, sections, now)?;
        job_repo::complete_tx(&tx, job_id, result_data, now)?;

        tx.commit()?;
        Ok(())
    })
}

/// Marks a document and (if present) its job as failed, in one transaction.
pub fn mark_failed(
    db: &Database,
    document_id: &str,
    job_id: Option<i64>,
    error: &str,
    now: &str,
) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        let tx = conn.unchecked_transaction()?;

        // Failed documents never carry stale results from an earlier run.
        tx.execute(
            "UPDATE documents SET status = 'failed', error = ?2, extracted_text = NULL,
             extraction_metadata = NULL, updated_at = ?3
             WHERE id = ?1",
            params![document_id, error, now],
        )?;
        if let Some(job_id) = job_id {
            job_repo::fail_tx(&tx, job_id, error, now)?;
        }

        tx.commit()?;
        Ok(())
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn sample_document(id: &str) -> DocumentRow {
        DocumentRow {
            id: id.to_string(),
            filename: "paper.pdf".to_string(),
            file_path: "/tmp/paper.pdf".to_string(),
            file_size: 2048,
            status: "uploaded".to_string(),
            extracted_text: None,
            extraction_metadata: None,
            error: None,
            created_at: "2026-01-01T00:00:00Z".to_string(),
            updated_at: "2026-01-01T00:00:00Z".to_string(),
        }
    }

    fn test_db() -> Database {
        Database::open_in_memory().expect("Failed to create test database")
    }

    #[test]
    fn test_insert_and_find() {
        let db = test_db();
        insert(&db, &sample_document("doc-1")).unwrap();

        let found = find_by_id(&db, "doc-1").unwrap().unwrap();
        assert_eq!(found.filename, "paper.pdf");
        assert_eq!(found.status, "uploaded");
        assert!(found.extracted_text.is_none());
    }

    #[test]
    fn test_find_nonexistent() {
        let db = test_db();
        assert!(find_by_id(&db, "missing").unwrap().is_none());
    }

    #[test]
    fn test_set_status() {
        let db = test_db();
        insert(&db, &sample_document("doc-2")).unwrap();

        set_status(&db, "doc-2", "processing", "2026-01-01T00:01:00Z").unwrap();

        let found = find_by_id(&db, "doc-2").unwrap().unwrap();
        assert_eq!(found.status, "processing");
        assert_eq!(found.updated_at, "2026-01-01T00:01:00Z");
    }

    #[test]
    fn test_list_by_status() {
        let db = test_db();
        insert(&db, &sample_document("a")).unwrap();
        insert(&db, &sample_document("b")).unwrap();
        set_status(&db, "b", "completed", "2026-01-01T00:01:00Z").unwrap();

        let uploaded = list_by_status(&db, "uploaded").unwrap();
        assert_eq!(uploaded.len(), 1);
        assert_eq!(uploaded[0].id, "a");
    }

    #[test]
    fn test_delete_cascades() {
        let db = test_db();
        insert(&db, &sample_document("doc-3")).unwrap();
        let job_id = job_repo::insert_pending(&db, "doc-3", "extraction", "2026-01-01T00:00:00Z")
            .unwrap();
        assert!(job_id > 0);

        assert!(delete(&db, "doc-3").unwrap());
        assert!(!delete(&db, "doc-3").unwrap());
        assert!(job_repo::list_for_document(&db, "doc-3").unwrap().is_empty());
    }

    #[test]
    fn test_complete_extraction_is_atomic() {
        let db = test_db();
        insert(&db, &sample_document("doc-4")).unwrap();
        let job_id =
            job_repo::insert_pending(&db, "doc-4", "extraction", "2026-01-01T00:00:00Z").unwrap();

        let sections = vec![
            section_repo::NewSection {
                section_type: "title".to_string(),
                content: "A Title".to_string(),
            },
            section_repo::NewSection {
                section_type: "body".to_string(),
                content: "Body text.".to_string(),
            },
        ];
        complete_extraction(
            &db,
            "doc-4",
            "# A Title\n\nBody text.",
            "{\"pages\":1}",
            &sections,
            job_id,
            "Extracted 24 characters",
            "2026-01-01T00:02:00Z",
        )
        .unwrap();

        let doc = find_by_id(&db, "doc-4").unwrap().unwrap();
        assert_eq!(doc.status, "completed");
        assert!(doc.extracted_text.is_some());
        assert!(doc.error.is_none());

        let stored = section_repo::list_for_document(&db, "doc-4").unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].ord, 0);
        assert_eq!(stored[1].ord, 1);

        let jobs = job_repo::list_for_document(&db, "doc-4").unwrap();
        assert_eq!(jobs[0].status, "completed");
        assert_eq!(jobs[0].result_data.as_deref(), Some("Extracted 24 characters"));
    }

    #[test]
    fn test_mark_failed() {
        let db = test_db();
        insert(&db, &sample_document("doc-5")).unwrap();
        let job_id =
            job_repo::insert_pending(&db, "doc-5", "extraction", "2026-01-01T00:00:00Z").unwrap();

        mark_failed(
            &db,
            "doc-5",
            Some(job_id),
            "No text extracted from document",
            "2026-01-01T00:03:00Z",
        )
        .unwrap();

        let doc = find_by_id(&db, "doc-5").unwrap().unwrap();
        assert_eq!(doc.status, "failed");
        assert_eq!(doc.error.as_deref(), Some("No text extracted from document"));

        let jobs = job_repo::list_for_document(&db, "doc-5").unwrap();
        assert_eq!(jobs[0].status, "failed");
        assert_eq!(jobs[0].error.as_deref(), Some("No text extracted from document"));
    }

    #[test]
    fn test_begin_extraction_refuses_second_run() {
        let db = test_db();
        insert(&db, &sample_document("doc-7")).unwrap();

        let first = begin_extraction(&db, "doc-7", "extraction", "2026-01-01T00:00:00Z").unwrap();
        assert!(first.is_some());
        // A second begin while the first job is still active changes nothing.
        let second = begin_extraction(&db, "doc-7", "extraction", "2026-01-01T00:00:01Z").unwrap();
        assert!(second.is_none());

        let doc = find_by_id(&db, "doc-7").unwrap().unwrap();
        assert_eq!(doc.status, "processing");
        let jobs = job_repo::list_for_document(&db, "doc-7").unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].status, "running");
        assert!(jobs[0].started_at.is_some());
    }

    #[test]
    fn test_begin_extraction_rolls_back_on_job_failure() {
        let db = test_db();
        insert(&db, &sample_document("doc-8")).unwrap();
        db.with_conn(|conn| {
            conn.execute_batch(
                "CREATE TRIGGER jobs_unavailable BEFORE INSERT ON processing_jobs
                 BEGIN SELECT RAISE(ABORT, 'jobs table unavailable'); END;",
            )?;
            Ok(())
        })
        .unwrap();

        let result = begin_extraction(&db, "doc-8", "extraction", "2026-01-01T00:00:00Z");
        assert!(result.is_err());

        // The document transition rolled back with the failed job insert.
        let doc = find_by_id(&db, "doc-8").unwrap().unwrap();
        assert_eq!(doc.status, "uploaded");
    }

    #[test]
    fn test_mark_failed_without_job() {
        let db = test_db();
        insert(&db, &sample_document("doc-6")).unwrap();

        mark_failed(&db, "doc-6", None, "boom", "2026-01-01T00:03:00Z").unwrap();

        let doc = find_by_id(&db, "doc-6").unwrap().unwrap();
        assert_eq!(doc.status, "failed");
    }
}
