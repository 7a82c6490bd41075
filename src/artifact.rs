// src/artifact.rs
use axum::body::Bytes;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

/// The single shared cell holding the most recently rendered artifact.
///
/// Cloning yields another handle to the same cell. The debouncer is the only
/// writer; every HTTP handler is a reader. A write swaps the whole buffer under
/// the exclusive lock, so readers see either the old or the new artifact,
/// never a mix.
#[derive(Clone, Debug)]
pub struct ArtifactStore {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    artifact: RwLock<Bytes>,
    generation: AtomicU64,
}

impl ArtifactStore {
    pub fn new(initial: impl Into<Bytes>) -> Self {
        Self {
            inner: Arc::new(Inner {
                artifact: RwLock::new(initial.into()),
                generation: AtomicU64::new(0),
            }),
        }
    }

    /// Replaces the artifact. The buffer is moved in, not copied under the lock.
    pub async fn write(&self, artifact: impl Into<Bytes>) {
        let artifact = artifact.into();
        let mut guard = self.inner.artifact.write().await;
        *guard = artifact;
        self.inner.generation.fetch_add(1, Ordering::Release);
    }

    /// Returns a snapshot of the current artifact. Cheap: `Bytes` is reference counted.
    pub async fn read(&self) -> Bytes {
        self.inner.artifact.read().await.clone()
    }

    /// Number of writes since construction.
    pub fn generation(&self) -> u64 {
        self.inner.generation.load(Ordering::Acquire)
    }
}
