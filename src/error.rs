// src/error.rs

//! Error types and exit codes for mdpreview.

use std::path::PathBuf;
use std::process::ExitCode;
use thiserror::Error;

/// Errors produced by the preview pipeline.
///
/// Usage and environment errors abort the process. Read and watch errors are
/// recoverable in watch mode: they are handed to an [`Observer`](crate::observer::Observer)
/// and the pipeline keeps serving the last good artifact.
#[derive(Error, Debug)]
pub enum PreviewError {
    #[error("{0}")]
    Usage(String),

    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("file watch error: {0}")]
    Watch(#[from] notify::Error),

    #[error("could not bind a loopback listener: {0}")]
    Bind(#[source] std::io::Error),

    #[error("could not open {target} with `{command}`: {reason}")]
    Browser {
        command: String,
        target: String,
        reason: String,
    },

    #[error("configuration error: {0}")]
    Config(#[from] Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PreviewError {
    /// Every error maps to exit status 1; success and a viewer disconnect exit with 0.
    pub fn exit_code(&self) -> ExitCode {
        ExitCode::FAILURE
    }

    /// Whether the pipeline can keep serving after this error.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Read { .. } | Self::Watch(_))
    }
}

impl From<figment::Error> for PreviewError {
    fn from(e: figment::Error) -> Self {
        Self::Config(Box::new(e))
    }
}

pub type Result<T> = std::result::Result<T, PreviewError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_and_watch_errors_are_recoverable() {
        let read = PreviewError::Read {
            path: PathBuf::from("doc.md"),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        };
        assert!(read.is_recoverable());
        assert!(PreviewError::Watch(notify::Error::generic("inotify gone")).is_recoverable());

        let bind = PreviewError::Bind(std::io::Error::from(std::io::ErrorKind::AddrInUse));
        assert!(!bind.is_recoverable());
        assert!(!PreviewError::Usage("-w requires a FILE".into()).is_recoverable());
    }

    #[test]
    fn fatal_errors_exit_with_one() {
        let err = PreviewError::Usage("two files".into());
        assert_eq!(format!("{:?}", err.exit_code()), format!("{:?}", ExitCode::FAILURE));
    }
}
