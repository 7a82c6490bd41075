// src/debounce.rs
use crate::artifact::ArtifactStore;
use crate::error::{PreviewError, Result};
use crate::event::RawChangeEvent;
use crate::fanout::UpdateFanout;
use crate::observer::Observer;
use crate::render::Render;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::Receiver;
use tokio::time::timeout;
use tracing::{debug, info};

/// Default quiescence window.
pub const DEFAULT_WINDOW: Duration = Duration::from_millis(50);

/// Collapses bursts of change events into one re-render and one update.
///
/// The first event after an idle period opens a quiescence window. Every
/// further event restarts it. When the window passes with no event, the
/// document is read and rendered once, the artifact is replaced, and a single
/// [`SettledUpdate`](crate::event::SettledUpdate) is published.
pub struct Debouncer {
    window: Duration,
    document: PathBuf,
    renderer: Arc<dyn Render>,
    store: ArtifactStore,
    fanout: UpdateFanout,
    observer: Arc<dyn Observer>,
}

impl Debouncer {
    pub fn new(
        document: impl Into<PathBuf>,
        renderer: Arc<dyn Render>,
        store: ArtifactStore,
        fanout: UpdateFanout,
        observer: Arc<dyn Observer>,
    ) -> Self {
        Self {
            window: DEFAULT_WINDOW,
            document: document.into(),
            renderer,
            store,
            fanout,
            observer,
        }
    }

    pub fn with_window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }

    /// Consumes change events until the sender side is dropped. A burst that is
    /// still open at that point is settled before returning.
    pub async fn run(self, mut events: Receiver<RawChangeEvent>) {
        info!(
            "[Debouncer] Started for {} ({:?} window)",
            self.document.display(),
            self.window
        );
        while let Some(first) = events.recv().await {
            debug!("[Debouncer] Burst opened by {:?}", first.op);
            let mut collapsed = 1usize;
            let mut source_open = true;
            loop {
                match timeout(self.window, events.recv()).await {
                    Ok(Some(_)) => collapsed += 1,
                    Ok(None) => {
                        source_open = false;
                        break;
                    }
                    Err(_) => break,
                }
            }
            debug!("[Debouncer] Burst settled after {} events", collapsed);
            self.settle().await;
            if !source_open {
                break;
            }
        }
        info!("[Debouncer] Change source closed, exiting.");
    }

    /// Re-renders the document and publishes an update. On failure the
    /// observer is told, the old artifact stays, and nothing is published.
    ///
    /// Returns whether an update was published.
    pub async fn settle(&self) -> bool {
        match self.render_document().await {
            Ok(artifact) => {
                self.store.write(artifact).await;
                let viewers = self.fanout.publish();
                debug!(
                    "[Debouncer] Artifact generation {} announced to {} viewers",
                    self.store.generation(),
                    viewers
                );
                true
            }
            Err(e) => {
                self.observer.render_failed(&e);
                false
            }
        }
    }

    async fn render_document(&self) -> Result<Vec<u8>> {
        let document = tokio::fs::read(&self.document)
            .await
            .map_err(|source| PreviewError::Read {
                path: self.document.clone(),
                source,
            })?;
        // Highlighting may spawn subprocesses; keep it off the async workers.
        let renderer = Arc::clone(&self.renderer);
        tokio::task::spawn_blocking(move || renderer.render(&document))
            .await
            .map_err(|e| PreviewError::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))
    }
}
