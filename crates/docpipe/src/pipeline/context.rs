use std::path::PathBuf;

use crate::db::document_repo::DocumentRow;
use crate::extract::ExtractedDocument;
use crate::segment::Section;

pub struct ExtractionContext {
    // Input
    pub document: DocumentRow,
    pub job_id: i64,

    // Step 1 result — guaranteed Some after step_extract
    pub extracted: Option<ExtractedDocument>,

    // Step 2 result
    pub quality_score: Option<f64>,

    // Step 3 result
    pub sections: Vec<Section>,

    // Step 4 result
    pub artifact_path: Option<PathBuf>,
}

impl ExtractionContext {
    pub fn new(document: DocumentRow, job_id: i64) -> Self {
        Self {
            document,
            job_id,
            extracted: None,
            quality_score: None,
            sections: Vec::new(),
            artifact_path: None,
        }
    }
}
