//! Error types for LayerLoop.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Coarse classification of a [`LoopError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    PermissionDenied,
    RecordingFailed,
    PlaybackFailed,
    MixingFailed,
    FileNotFound,
    InvalidFormat,
    ResourceUnavailable,
    InvalidArgument,
    Cancelled,
    Unknown,
}

impl ErrorKind {
    /// Whether the caller may retry the same operation.
    pub fn is_recoverable(self) -> bool {
        matches!(
            self,
            Self::RecordingFailed
                | Self::PlaybackFailed
                | Self::MixingFailed
                | Self::ResourceUnavailable
        )
    }
}

/// Main error type for LayerLoop operations.
#[derive(Error, Debug)]
pub enum LoopError {
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Recording failed: {0}")]
    RecordingFailed(String),

    #[error("Playback failed: {0}")]
    PlaybackFailed(String),

    #[error("Mixing failed for {track_count} track(s): {source}")]
    MixingFailed {
        track_count: usize,
        #[source]
        source: Box<LoopError>,
    },

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    #[error("Resource unavailable: {0}")]
    ResourceUnavailable(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl LoopError {
    /// Wrap `cause` as a mixdown failure over `track_count` tracks.
    ///
    /// A cause that is already `MixingFailed` is returned unchanged.
    pub fn mixing(track_count: usize, cause: LoopError) -> Self {
        match cause {
            already @ Self::MixingFailed { .. } => already,
            other => Self::MixingFailed {
                track_count,
                source: Box::new(other),
            },
        }
    }

    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::PermissionDenied(_) => ErrorKind::PermissionDenied,
            Self::RecordingFailed(_) => ErrorKind::RecordingFailed,
            Self::PlaybackFailed(_) => ErrorKind::PlaybackFailed,
            Self::MixingFailed { .. } => ErrorKind::MixingFailed,
            Self::FileNotFound(_) => ErrorKind::FileNotFound,
            Self::InvalidFormat(_) => ErrorKind::InvalidFormat,
            Self::ResourceUnavailable(_) => ErrorKind::ResourceUnavailable,
            Self::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::Io(e) => match e.kind() {
                std::io::ErrorKind::NotFound => ErrorKind::FileNotFound,
                std::io::ErrorKind::PermissionDenied => ErrorKind::PermissionDenied,
                _ => ErrorKind::Unknown,
            },
            Self::Unknown(_) => ErrorKind::Unknown,
        }
    }

    /// Shorthand for `self.kind().is_recoverable()`.
    pub fn is_recoverable(&self) -> bool {
        self.kind().is_recoverable()
    }
}

/// Result type alias for LayerLoop operations.
pub type Result<T> = std::result::Result<T, LoopError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_kinds() {
        assert!(ErrorKind::RecordingFailed.is_recoverable());
        assert!(ErrorKind::PlaybackFailed.is_recoverable());
        assert!(ErrorKind::MixingFailed.is_recoverable());
        assert!(ErrorKind::ResourceUnavailable.is_recoverable());

        assert!(!ErrorKind::PermissionDenied.is_recoverable());
        assert!(!ErrorKind::FileNotFound.is_recoverable());
        assert!(!ErrorKind::InvalidFormat.is_recoverable());
        assert!(!ErrorKind::Unknown.is_recoverable());
    }

    #[test]
    fn test_mixing_wraps_once() {
        let err = LoopError::mixing(3, LoopError::InvalidFormat("bad header".into()));
        assert_eq!(err.kind(), ErrorKind::MixingFailed);
        assert!(err.to_string().contains("3 track(s)"));
        assert!(err.to_string().contains("bad header"));

        let rewrapped = LoopError::mixing(7, err);
        match rewrapped {
            LoopError::MixingFailed { track_count, .. } => assert_eq!(track_count, 3),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_io_kind_mapping() {
        let missing = LoopError::from(std::io::Error::from(std::io::ErrorKind::NotFound));
        assert_eq!(missing.kind(), ErrorKind::FileNotFound);

        let denied = LoopError::from(std::io::Error::from(std::io::ErrorKind::PermissionDenied));
        assert_eq!(denied.kind(), ErrorKind::PermissionDenied);

        let other = LoopError::from(std::io::Error::from(std::io::ErrorKind::BrokenPipe));
        assert_eq!(other.kind(), ErrorKind::Unknown);
    }
}
