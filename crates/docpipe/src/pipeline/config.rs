use std::path::PathBuf;
use std::time::Duration;

use crate::extract::PdfConfig;

/// Extraction deadline scaled to file size: `secs_per_mb` seconds per
/// megabyte, clamped to `[min_secs, max_secs]`. Large scans get more time
/// without letting a pathological file hold a worker forever.
#[derive(Debug, Clone)]
pub struct TimeoutPolicy {
    pub secs_per_mb: u64,
    pub min_secs: u64,
    pub max_secs: u64,
}

impl Default for TimeoutPolicy {
    fn default() -> Self {
        Self {
            secs_per_mb: 20,
            min_secs: 120,
            max_secs: 600,
        }
    }
}

impl TimeoutPolicy {
    pub fn deadline_for(&self, file_size: u64) -> Duration {
        // Fractional megabytes count; truncating first would undersize the
        // deadline by up to secs_per_mb - 1 seconds.
        let mb = file_size as f64 / (1024.0 * 1024.0);
        let secs = (mb * self.secs_per_mb as f64).clamp(self.min_secs as f64, self.max_secs as f64);
        Duration::from_secs(secs as u64)
    }
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Directory extraction artifacts are written to.
    pub processed_dir: PathBuf,
    pub timeout: TimeoutPolicy,
    pub pdf: PdfConfig,
    /// Quality scores below this are logged as warnings. Never fails a
    /// document; the score is diagnostic.
    pub quality_warn_threshold: f64,
}

impl PipelineConfig {
    pub fn new(processed_dir: impl Into<PathBuf>) -> Self {
        Self {
            processed_dir: processed_dir.into(),
            timeout: TimeoutPolicy::default(),
            pdf: PdfConfig::default(),
            quality_warn_threshold: 0.5,
        }
    }
}
