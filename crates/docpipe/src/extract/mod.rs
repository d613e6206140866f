pub mod pdf;

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ExtractError;

pub use pdf::{HeadingThresholds, PdfConfig, PdfExtractor};

/// Text extracted from one document plus its structural metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedDocument {
    pub text: String,
    pub metadata: ExtractionMetadata,
}

/// Metadata recorded alongside the extracted text and persisted as JSON on
/// the document row and in the artifact store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionMetadata {
    /// Page count of the source document.
    pub pages: usize,
    /// Size of the source file in bytes.
    pub file_size: u64,
    /// When extraction ran, RFC3339 UTC.
    pub extraction_date: String,
    /// Identifier of the extraction backend.
    pub converter: String,
    /// Output format of the extracted text.
    pub format: String,
    /// Whether any page carried native image objects.
    pub has_images: bool,
    /// Whether any page looked like it draws tables.
    pub has_tables: bool,
    /// Heuristic confidence score, set by the pipeline after scoring.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality_score: Option<f64>,
}

/// Extraction backend seam. The production implementation is
/// [`PdfExtractor`]; the pipeline only depends on this trait so tests can
/// substitute slow or failing backends.
pub trait TextExtractor: Send + Sync {
    fn extract(&self, path: &Path) -> Result<ExtractedDocument, ExtractError>;
}
