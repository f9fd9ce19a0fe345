//! References to audio content that a decoder or player can open.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Where a track's audio lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceHandle {
    /// A file on disk.
    File(PathBuf),
    /// Encoded bytes already in memory (a fresh recording, an import).
    Memory {
        /// Name used for format hints and logging, e.g. `take-3.wav`.
        name: String,
        #[serde(skip)]
        bytes: Arc<Vec<u8>>,
    },
}

impl SourceHandle {
    /// Reference a file path.
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::File(path.into())
    }

    /// Wrap encoded bytes.
    pub fn memory(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self::Memory {
            name: name.into(),
            bytes: Arc::new(bytes),
        }
    }

    /// File extension used as a format hint, if any.
    pub fn extension(&self) -> Option<&str> {
        let name = match self {
            Self::File(path) => path.as_path(),
            Self::Memory { name, .. } => Path::new(name),
        };
        name.extension().and_then(|e| e.to_str())
    }
}

impl fmt::Display for SourceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(path) => write!(f, "{}", path.display()),
            Self::Memory { name, bytes } => write!(f, "{} ({} bytes in memory)", name, bytes.len()),
        }
    }
}
