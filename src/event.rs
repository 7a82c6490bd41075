// src/event.rs
use std::path::PathBuf;

/// Kind of filesystem change observed on the watched document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeOp {
    /// Content or name change that leaves the file in place.
    Modified,
    /// The file was deleted or renamed away. Editors that replace the inode on
    /// save produce this, followed by a create.
    Removed,
    /// Anything else notify reports for the path (create, metadata, ...).
    Other,
}

impl ChangeOp {
    /// Maps a notify event kind onto the three operations the pipeline cares
    /// about. Returns `None` for reads and metadata-only changes, which would
    /// otherwise let the renderer's own file access trigger another render.
    pub fn from_kind(kind: &notify::EventKind) -> Option<Self> {
        use notify::event::{AccessKind, AccessMode, ModifyKind, RenameMode};
        use notify::EventKind;

        match kind {
            EventKind::Remove(_) => Some(Self::Removed),
            EventKind::Modify(ModifyKind::Name(RenameMode::From)) => Some(Self::Removed),
            EventKind::Modify(ModifyKind::Metadata(_)) => None,
            EventKind::Modify(_) => Some(Self::Modified),
            EventKind::Access(AccessKind::Close(AccessMode::Write)) => Some(Self::Modified),
            EventKind::Access(_) => None,
            _ => Some(Self::Other),
        }
    }
}

/// A filesystem change for the watched document.
///
/// # Fields
/// - `path`: The path reported by the OS watcher.
/// - `op`: What happened to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawChangeEvent {
    pub path: PathBuf,
    pub op: ChangeOp,
}

impl RawChangeEvent {
    pub fn new(path: impl Into<PathBuf>, op: ChangeOp) -> Self {
        Self {
            path: path.into(),
            op,
        }
    }
}

/// Signal that the artifact has been recomputed and can be re-read.
///
/// Carries no payload; viewers fetch the new artifact themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SettledUpdate;

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{
        AccessKind, AccessMode, CreateKind, DataChange, MetadataKind, ModifyKind, RemoveKind,
        RenameMode,
    };
    use notify::EventKind;

    #[test]
    fn maps_notify_kinds() {
        assert_eq!(
            ChangeOp::from_kind(&EventKind::Modify(ModifyKind::Data(DataChange::Content))),
            Some(ChangeOp::Modified)
        );
        assert_eq!(
            ChangeOp::from_kind(&EventKind::Remove(RemoveKind::File)),
            Some(ChangeOp::Removed)
        );
        assert_eq!(
            ChangeOp::from_kind(&EventKind::Modify(ModifyKind::Name(RenameMode::From))),
            Some(ChangeOp::Removed)
        );
        assert_eq!(
            ChangeOp::from_kind(&EventKind::Create(CreateKind::File)),
            Some(ChangeOp::Other)
        );
    }

    #[test]
    fn ignores_reads_and_metadata() {
        assert_eq!(
            ChangeOp::from_kind(&EventKind::Access(AccessKind::Open(AccessMode::Read))),
            None
        );
        assert_eq!(
            ChangeOp::from_kind(&EventKind::Modify(ModifyKind::Metadata(MetadataKind::Any))),
            None
        );
        assert_eq!(
            ChangeOp::from_kind(&EventKind::Access(AccessKind::Close(AccessMode::Write))),
            Some(ChangeOp::Modified)
        );
    }
}
