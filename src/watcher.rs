// src/watcher.rs
use crate::error::{PreviewError, Result};
use crate::event::{ChangeOp, RawChangeEvent};
use crate::observer::Observer;
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError, Receiver, Sender};
use tracing::{debug, info};

/// Buffer between the watcher thread and the debouncer. When it is full a
/// burst is already pending, so further events can be dropped.
const EVENT_BUFFER: usize = 64;

/// The document being previewed.
///
/// The containing directory is canonicalised once so the path compares equal
/// to what the OS watcher reports, whatever form the user typed it in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchedPath {
    given: PathBuf,
    dir: PathBuf,
    resolved: PathBuf,
}

impl WatchedPath {
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let given = path.into();
        let file_name: OsString = given
            .file_name()
            .ok_or_else(|| PreviewError::Usage(format!("{} is not a file", given.display())))?
            .to_os_string();
        let parent = match given.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let dir = parent.canonicalize().map_err(|source| PreviewError::Read {
            path: parent.clone(),
            source,
        })?;
        Ok(Self {
            resolved: dir.join(file_name),
            given,
            dir,
        })
    }

    /// The path as given on the command line.
    pub fn path(&self) -> &Path {
        &self.given
    }

    /// Directory that is actually watched.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn resolved(&self) -> &Path {
        &self.resolved
    }

    pub fn matches(&self, path: &Path) -> bool {
        path == self.resolved
    }
}

/// Starts watching the directory containing `watched`.
///
/// The OS watcher lives on a dedicated thread for the rest of the process. Events
/// for other files in the directory are discarded; events for the watched file
/// are sent without blocking to the returned receiver. Errors after startup
/// go to `observer`.
///
/// # Errors
///
/// Returns an error if the OS watcher cannot be created or the directory
/// cannot be watched.
pub fn start(watched: WatchedPath, observer: Arc<dyn Observer>) -> Result<Receiver<RawChangeEvent>> {
    let (raw_tx, raw_rx) = std::sync::mpsc::channel::<notify::Result<notify::Event>>();
    let mut watcher = notify::recommended_watcher(raw_tx)?;
    watcher.watch(watched.dir(), RecursiveMode::NonRecursive)?;
    info!(
        "[WatcherThread] Watching {} for changes to {}",
        watched.dir().display(),
        watched.path().display()
    );

    let (event_tx, event_rx) = mpsc::channel(EVENT_BUFFER);
    std::thread::Builder::new()
        .name("mdpreview-watcher".into())
        .spawn(move || {
            while let Ok(res) = raw_rx.recv() {
                match res {
                    Ok(event) => {
                        if !handle_event(&event, &watched, &mut watcher, &event_tx, observer.as_ref()) {
                            break;
                        }
                    }
                    Err(e) => observer.watch_error(&PreviewError::Watch(e)),
                }
            }
            info!("[WatcherThread] Debouncer gone, watcher thread exiting.");
        })?;

    Ok(event_rx)
}

/// Filters one notify event down to the watched file and forwards it.
///
/// Returns `false` once the receiving side has been dropped.
fn handle_event(
    event: &notify::Event,
    watched: &WatchedPath,
    watcher: &mut RecommendedWatcher,
    event_tx: &Sender<RawChangeEvent>,
    observer: &dyn Observer,
) -> bool {
    let Some(op) = ChangeOp::from_kind(&event.kind) else {
        return true;
    };

    // A rename carries both the old and new path.
    for path in event.paths.iter().filter(|p| watched.matches(p)) {
        if op == ChangeOp::Removed {
            rearm(watcher, watched, observer);
        }
        let raw = RawChangeEvent::new(path.clone(), op);
        debug!("[WatcherThread] {:?} {}", raw.op, raw.path.display());
        match event_tx.try_send(raw) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                debug!("[WatcherThread] Event buffer full, dropping event");
            }
            Err(TrySendError::Closed(_)) => return false,
        }
    }
    true
}

/// Re-establishes the watch after the file was removed. Some editors save by
/// replacing the file, which can leave the old watch pointing at nothing.
fn rearm(watcher: &mut RecommendedWatcher, watched: &WatchedPath, observer: &dyn Observer) {
    if let Err(e) = watcher.unwatch(watched.dir()) {
        debug!("[WatcherThread] Unwatch of {} failed: {}", watched.dir().display(), e);
    }
    match watcher.watch(watched.dir(), RecursiveMode::NonRecursive) {
        Ok(()) => debug!("[WatcherThread] Re-armed watch on {}", watched.dir().display()),
        Err(e) => observer.watch_error(&PreviewError::Watch(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_relative_paths_against_canonical_dir() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("notes.md");
        std::fs::write(&file, "# notes").unwrap();

        let watched = WatchedPath::new(&file).unwrap();
        let canonical_dir = dir.path().canonicalize().unwrap();
        assert_eq!(watched.dir(), canonical_dir);
        assert!(watched.matches(&canonical_dir.join("notes.md")));
        assert!(!watched.matches(&canonical_dir.join("other.md")));
        assert_eq!(watched.path(), file);
    }

    #[test]
    fn bare_file_name_watches_current_dir() {
        let watched = WatchedPath::new("README.md").unwrap();
        assert_eq!(watched.dir(), std::env::current_dir().unwrap().canonicalize().unwrap());
    }

    #[test]
    fn rejects_missing_directory() {
        let err = WatchedPath::new("/definitely/not/here/doc.md").unwrap_err();
        assert!(matches!(err, PreviewError::Read { .. }));
    }
}
