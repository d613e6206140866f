pub mod db;
pub mod error;
pub mod extract;
pub mod logging;
pub mod model;
pub mod pipeline;
pub mod quality;
pub mod segment;
pub mod store;

pub use error::{DocpipeError, ExtractError, Result, StorageError};
pub use extract::{ExtractedDocument, ExtractionMetadata, PdfExtractor, TextExtractor};
pub use model::{DocumentStatus, JobStatus, JobType, SectionType};
pub use pipeline::{Orchestrator, PipelineConfig, PipelineError, TimeoutPolicy};
pub use segment::{segment, Section};
pub use store::ArtifactStore;
