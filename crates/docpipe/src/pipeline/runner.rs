use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::db::{document_repo, section_repo, Database};
use crate::db::document_repo::DocumentRow;
use crate::error::StorageError;
use crate::extract::{PdfExtractor, TextExtractor};
use crate::model::{DocumentStatus, JobType};
use crate::quality;
use crate::segment;
use crate::store::ArtifactStore;

use super::config::PipelineConfig;
use super::context::ExtractionContext;
use super::error::PipelineError;

/// Drives a document through extraction end to end and owns every status
/// transition along the way. Documents move `uploaded -> processing ->
/// completed|failed`; each run gets its own job row moving
/// `pending -> running -> completed|failed`.
pub struct Orchestrator {
    config: Arc<PipelineConfig>,
    extractor: Arc<dyn TextExtractor>,
    db: Database,
    store: ArtifactStore,
}

impl Orchestrator {
    /// Production constructor — builds all sub-components from config.
    pub fn from_config(config: Arc<PipelineConfig>, db: Database) -> Result<Self, PipelineError> {
        let store = ArtifactStore::new(&config.processed_dir)?;
        let extractor = Arc::new(PdfExtractor::new(config.pdf.clone()));
        Ok(Self {
            config,
            extractor,
            db,
            store,
        })
    }

    /// Test constructor — inject a specific extraction backend.
    #[cfg(test)]
    pub fn new(
        config: Arc<PipelineConfig>,
        extractor: Arc<dyn TextExtractor>,
        db: Database,
        store: ArtifactStore,
    ) -> Self {
        Self {
            config,
            extractor,
            db,
            store,
        }
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    /// Registers an uploaded file as a new document in `uploaded` state and
    /// returns its row. Processing is a separate call.
    pub fn register_document(
        &self,
        filename: &str,
        file_path: &Path,
    ) -> Result<DocumentRow, PipelineError> {
        let file_size = std::fs::metadata(file_path)
            .map(|m| m.len() as i64)
            .unwrap_or(0);
        let now = now();
        let document = DocumentRow {
            id: Uuid::new_v4().to_string(),
            filename: filename.to_string(),
            file_path: file_path.display().to_string(),
            file_size,
            status: DocumentStatus::Uploaded.as_str().to_string(),
            extracted_text: None,
            extraction_metadata: None,
            error: None,
            created_at: now.clone(),
            updated_at: now,
        };
        document_repo::insert(&self.db, &document)?;
        info!("Registered document {} ({})", document.id, filename);
        Ok(document)
    }

    /// Deletes a document, its sections and jobs (via cascade), and its
    /// extraction artifact. Returns whether the document existed.
    pub fn delete_document(&self, document_id: &str) -> Result<bool, PipelineError> {
        let existed = document_repo::delete(&self.db, document_id)?;
        if existed {
            let artifact = self.store.path_for(document_id);
            if artifact.exists() {
                if let Err(e) = std::fs::remove_file(&artifact) {
                    warn!("Could not remove artifact {}: {}", artifact.display(), e);
                }
            }
        }
        Ok(existed)
    }

    /// Runs the full extraction pipeline for one document.
    ///
    /// A document deleted before processing starts is a no-op, not an error.
    /// Any failure past the concurrency guard marks the document and its job
    /// failed with the error's message before the error is returned.
    pub async fn process_document(&self, document_id: &str) -> Result<(), PipelineError> {
        let document = match document_repo::find_by_id(&self.db, document_id)? {
            Some(document) => document,
            None => {
                warn!("Document {} no longer exists, skipping", document_id);
                return Ok(());
            }
        };

        // A crash between this transition and the terminal commit leaves the
        // document stuck in `processing`; recovering those needs a startup
        // sweep over non-terminal rows, which does not exist yet.
        let job_id = match document_repo::begin_extraction(
            &self.db,
            document_id,
            JobType::Extraction.as_str(),
            &now(),
        ) {
            Ok(Some(job_id)) => job_id,
            Ok(None) => return Err(PipelineError::AlreadyProcessing),
            Err(e) => {
                let message = e.to_string();
                warn!("Could not start processing {}: {}", document_id, message);
                self.record_failure(document_id, None, &message);
                return Err(e.into());
            }
        };

        let span = info_span!("pipeline", document_id = %document_id, filename = %document.filename);
        let mut ctx = ExtractionContext::new(document, job_id);
        match self.run(&mut ctx).instrument(span).await {
            Ok(()) => {
                info!(
                    "Document {} processed into {} sections",
                    document_id,
                    ctx.sections.len()
                );
                Ok(())
            }
            Err(e) => {
                let message = e.to_string();
                warn!("Processing {} failed: {}", document_id, message);
                self.record_failure(document_id, Some(job_id), &message);
                Err(e)
            }
        }
    }

    /// Best-effort terminal failure write. Secondary errors are logged so
    /// the original failure stays the one that surfaces.
    fn record_failure(&self, document_id: &str, job_id: Option<i64>, message: &str) {
        if let Err(db_err) =
            document_repo::mark_failed(&self.db, document_id, job_id, message, &now())
        {
            error!(
                "Could not record failure for document {}: {}",
                document_id, db_err
            );
        }
    }

    /// Fire-and-forget processing on the runtime. Errors are already
    /// persisted on the document by the time they reach here, so they are
    /// only logged.
    pub fn spawn(self: &Arc<Self>, document_id: String) -> tokio::task::JoinHandle<()> {
        let orchestrator = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(e) = orchestrator.process_document(&document_id).await {
                error!("Background processing of {} failed: {}", document_id, e);
            }
        })
    }

    async fn run(&self, ctx: &mut ExtractionContext) -> Result<(), PipelineError> {
        // Step 1: extract text, bounded by the size-scaled deadline.
        self.step_extract(ctx).await?;

        // Step 2: score extraction quality.
        {
            let _step = info_span!("score_quality").entered();
            self.step_score(ctx)?;
        }

        // Step 3: segment into typed sections.
        {
            let _step = info_span!("segment").entered();
            self.step_segment(ctx);
        }

        // Step 4: write the artifact. Happens before the database commit so
        // a completed row never points at a missing artifact.
        {
            let _step = info_span!("store_artifact").entered();
            self.step_store(ctx)?;
        }

        // Step 5: commit text, sections and job completion atomically.
        {
            let _step = info_span!("persist").entered();
            self.step_persist(ctx)?;
        }

        Ok(())
    }

    async fn step_extract(&self, ctx: &mut ExtractionContext) -> Result<(), PipelineError> {
        let deadline = self
            .config
            .timeout
            .deadline_for(ctx.document.file_size.max(0) as u64);
        let extractor = Arc::clone(&self.extractor);
        let path = PathBuf::from(&ctx.document.file_path);

        let handle = tokio::task::spawn_blocking(move || extractor.extract(&path));
        // On expiry the blocking task keeps running to completion but its
        // result is dropped; blocking threads cannot be cancelled.
        let extracted = match tokio::time::timeout(deadline, handle).await {
            Err(_) => {
                return Err(PipelineError::Timeout {
                    secs: deadline.as_secs(),
                })
            }
            Ok(Err(join_err)) => return Err(PipelineError::TaskPanicked(join_err.to_string())),
            Ok(Ok(result)) => result?,
        };

        if extracted.text.trim().is_empty() {
            return Err(PipelineError::EmptyText);
        }

        ctx.extracted = Some(extracted);
        Ok(())
    }

    fn step_score(&self, ctx: &mut ExtractionContext) -> Result<(), PipelineError> {
        let extracted = ctx.extracted.as_mut().ok_or(PipelineError::EmptyText)?;
        let score = quality::score(&extracted.text);
        if score < self.config.quality_warn_threshold {
            warn!(
                "Low extraction quality {:.2} for document {}",
                score, ctx.document.id
            );
        }
        extracted.metadata.quality_score = Some(score);
        ctx.quality_score = Some(score);
        Ok(())
    }

    fn step_segment(&self, ctx: &mut ExtractionContext) {
        if let Some(extracted) = ctx.extracted.as_ref() {
            ctx.sections = segment::segment(&extracted.text);
        }
    }

    fn step_store(&self, ctx: &mut ExtractionContext) -> Result<(), PipelineError> {
        let extracted = ctx.extracted.as_ref().ok_or(PipelineError::EmptyText)?;
        let path = self.store.save(&ctx.document.id, extracted)?;
        ctx.artifact_path = Some(path);
        Ok(())
    }

    fn step_persist(&self, ctx: &mut ExtractionContext) -> Result<(), PipelineError> {
        let extracted = ctx.extracted.as_ref().ok_or(PipelineError::EmptyText)?;
        let metadata_json =
            serde_json::to_string(&extracted.metadata).map_err(StorageError::Encode)?;

        let sections: Vec<section_repo::NewSection> = ctx
            .sections
            .iter()
            .map(|s| section_repo::NewSection {
                section_type: s.section_type.as_str().to_string(),
                content: s.content.clone(),
            })
            .collect();

        let chars = extracted.text.chars().count();
        let quality = ctx.quality_score.unwrap_or(0.0);
        let result_data = format!("Extracted {} characters (quality {:.2})", chars, quality);

        document_repo::complete_extraction(
            &self.db,
            &ctx.document.id,
            &extracted.text,
            &metadata_json,
            &sections,
            ctx.job_id,
            &result_data,
            &now(),
        )?;
        Ok(())
    }
}

fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}
