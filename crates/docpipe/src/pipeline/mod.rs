pub mod config;
pub mod context;
pub mod error;
pub mod runner;

pub use config::{PipelineConfig, TimeoutPolicy};
pub use context::ExtractionContext;
pub use error::PipelineError;
pub use runner::Orchestrator;
