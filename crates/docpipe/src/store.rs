//! Artifact store for extraction results.
//!
//! Each processed document gets one JSON file named after its ID. The file
//! is the durable record of what extraction produced and is overwritten on
//! reprocessing.

use std::path::{Path, PathBuf};

use crate::error::StorageError;
use crate::extract::ExtractedDocument;

#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    /// Creates the store, ensuring its directory exists.
    pub fn new(dir: &Path) -> Result<Self, StorageError> {
        std::fs::create_dir_all(dir).map_err(|e| StorageError::CreateDirectory {
            path: dir.to_path_buf(),
            source: e,
        })?;
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    /// Path an artifact for the given document lives at.
    pub fn path_for(&self, document_id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", document_id))
    }

    /// Writes the artifact for a document, replacing any previous one.
    pub fn save(
        &self,
        document_id: &str,
        extracted: &ExtractedDocument,
    ) -> Result<PathBuf, StorageError> {
        let path = self.path_for(document_id);
        let json = serde_json::to_vec_pretty(extracted)?;
        std::fs::write(&path, json).map_err(|e| StorageError::WriteFile {
            path: path.clone(),
            source: e,
        })?;
        log::debug!("Wrote extraction artifact to {}", path.display());
        Ok(path)
    }

    /// Loads the artifact for a document, if one exists.
    pub fn load(&self, document_id: &str) -> Result<Option<ExtractedDocument>, StorageError> {
        let path = self.path_for(document_id);
        if !path.exists() {
            return Ok(None);
        }
        let bytes = std::fs::read(&path).map_err(|e| StorageError::ReadFile {
            path: path.clone(),
            source: e,
        })?;
        let extracted = serde_json::from_slice(&bytes).map_err(StorageError::Decode)?;
        Ok(Some(extracted))
    }
}
