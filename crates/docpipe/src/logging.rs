//! Tracing setup for binaries and integration tests.
//!
//! The database layer logs through the `log` facade; everything else uses
//! `tracing` spans and events. The subscriber's built-in log bridge routes
//! both to one sink.

use tracing_subscriber::{fmt, EnvFilter};

/// Initializes the global subscriber. Filter comes from `RUST_LOG`,
/// defaulting to `info`. Safe to call more than once; later calls are
/// no-ops.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        init();
        init();
        tracing::info!("logging initialized");
        log::info!("log facade bridged");
    }
}
