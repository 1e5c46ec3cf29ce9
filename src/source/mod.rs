//! Entry sources: fully enumerated archive listings
//!
//! A source hands the loader its whole listing at once. Opening the archive may
//! fail as a whole; individual entries may fail on their own without affecting
//! the rest.

mod directory;
mod manifest;
mod memory;

use serde::{Deserialize, Serialize};

use crate::entry::Entry;
use crate::error::Result;

pub use directory::DirectorySource;
pub use manifest::ManifestSource;
pub use memory::MemorySource;

/// The two archive flavours the index understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArchiveKind {
    /// Game package: plain files.
    Package,
    /// Records database: entries carry a GUID and a structure type.
    Records,
}

impl std::fmt::Display for ArchiveKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ArchiveKind::Package => f.write_str("package"),
            ArchiveKind::Records => f.write_str("records"),
        }
    }
}

/// A read-only archive listing.
pub trait EntrySource: Send + Sync {
    fn kind(&self) -> ArchiveKind;

    /// Human-readable name, used in task messages.
    fn label(&self) -> &str;

    /// The listing in source order. The outer error means the archive could
    /// not be opened at all; inner errors are per-entry.
    fn entries(&self) -> Result<Vec<Result<Entry>>>;
}
