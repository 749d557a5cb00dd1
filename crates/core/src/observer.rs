//! Injected side-effect sink for progress messages.
//!
//! The orchestrator and the executor report what they do through an
//! [`Observer`] instead of logging directly, so the CLI can turn the same
//! messages into workflow annotations. The classifier and matcher are pure
//! and never see one.

use std::sync::Arc;

use tracing::{error, info, warn};

/// Receives human-readable progress messages.
pub trait Observer: Send + Sync {
    fn info(&self, message: &str);
    fn warn(&self, message: &str);
    fn error(&self, message: &str);
}

/// Shared handle passed to the orchestrator and the executor.
pub type SharedObserver = Arc<dyn Observer>;

/// Forwards every message to `tracing` at the matching level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl TracingObserver {
    pub fn shared() -> SharedObserver {
        Arc::new(Self)
    }
}

impl Observer for TracingObserver {
    fn info(&self, message: &str) {
        info!("{message}");
    }

    fn warn(&self, message: &str) {
        warn!("{message}");
    }

    fn error(&self, message: &str) {
        error!("{message}");
    }
}
