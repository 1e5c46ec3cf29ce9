//! Error types shared by the index, loaders and extraction

use std::io;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("invalid entry path '{path}': {reason}")]
    InvalidPath { path: String, reason: &'static str },

    #[error("unreadable entry{}: {reason}", .path.as_deref().map(|p| format!(" '{}'", p)).unwrap_or_default())]
    SourceRead { path: Option<String>, reason: String },

    #[error("cannot open {label}: {reason}")]
    SourceOpen { label: String, reason: String },

    #[error("failed to extract '{path}': {source}")]
    Extraction {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("'{path}' is used both as a file and as a directory")]
    PathConflict { path: String },

    #[error("duplicate entry path '{path}'")]
    DuplicatePath { path: String },

    #[error("'{path}' has no content to extract")]
    NotALeaf { path: String },

    #[error("invalid filter pattern: {0}")]
    InvalidPattern(String),

    #[error("no such entry '{0}'")]
    NotFound(String),

    #[error("IO error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("manifest error: {0}")]
    Manifest(#[from] serde_json::Error),
}

impl ArchiveError {
    /// Shorthand for per-entry metadata failures.
    pub fn read(path: Option<&str>, reason: impl Into<String>) -> Self {
        Self::SourceRead {
            path: path.map(str::to_string),
            reason: reason.into(),
        }
    }

    /// Path of the entry this error is about, when it has one.
    pub fn entry_path(&self) -> Option<&str> {
        match self {
            Self::InvalidPath { path, .. }
            | Self::Extraction { path, .. }
            | Self::PathConflict { path }
            | Self::DuplicatePath { path }
            | Self::NotALeaf { path }
            | Self::NotFound(path) => Some(path),
            Self::SourceRead { path, .. } => path.as_deref(),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ArchiveError>;
