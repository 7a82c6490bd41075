// src/observer.rs
use crate::error::PreviewError;
use tracing::{error, warn};

/// Receives errors the pipeline recovers from.
///
/// The watcher thread and the debouncer never propagate these; they report
/// them here and carry on. The default implementation logs them, tests swap in
/// a recorder.
pub trait Observer: Send + Sync + 'static {
    /// The file watch facility failed (event error, failed re-arm).
    fn watch_error(&self, err: &PreviewError);

    /// A settled burst could not be rendered; the previous artifact is kept.
    fn render_failed(&self, err: &PreviewError);
}

/// Logs recoverable errors through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl Observer for TracingObserver {
    fn watch_error(&self, err: &PreviewError) {
        if err.is_recoverable() {
            warn!("[Watcher] {}", err);
        } else {
            error!("[Watcher] {}", err);
        }
    }

    fn render_failed(&self, err: &PreviewError) {
        if err.is_recoverable() {
            warn!("[Debouncer] Keeping previous artifact, render failed: {}", err);
        } else {
            error!("[Debouncer] Keeping previous artifact, renderer broke: {}", err);
        }
    }
}
