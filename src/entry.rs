//! Archive entries as handed over by an entry source

use std::fmt;
use std::io::{self, Read};
use std::sync::Arc;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// What an entry represents inside its archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Record,
}

/// Read access to the content behind entries, keyed by the entry's locator.
///
/// Implementations are shared read-only between the index and any number of
/// extraction batches, so they must not hold per-read state.
pub trait ContentReader: Send + Sync {
    fn open(&self, locator: &str) -> io::Result<Box<dyn Read + Send>>;
}

/// Opaque handle from an entry back to the archive that owns its content.
#[derive(Clone)]
pub struct BackingRef {
    reader: Arc<dyn ContentReader>,
    locator: String,
}

impl BackingRef {
    pub fn new(reader: Arc<dyn ContentReader>, locator: impl Into<String>) -> Self {
        Self {
            reader,
            locator: locator.into(),
        }
    }

    /// The key the owning archive uses for this entry (its original path).
    pub fn locator(&self) -> &str {
        &self.locator
    }

    pub fn open(&self) -> io::Result<Box<dyn Read + Send>> {
        self.reader.open(&self.locator)
    }
}

impl fmt::Debug for BackingRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackingRef")
            .field("locator", &self.locator)
            .finish_non_exhaustive()
    }
}

/// One record of an archive's flat listing.
#[derive(Debug, Clone)]
pub struct Entry {
    path: String,
    size: u64,
    modified: NaiveDateTime,
    kind: EntryKind,
    backing: BackingRef,
    secondary_key: Option<String>,
    type_name: Option<String>,
}

impl Entry {
    pub fn new(
        path: impl Into<String>,
        size: u64,
        modified: NaiveDateTime,
        kind: EntryKind,
        backing: BackingRef,
    ) -> Self {
        Self {
            path: path.into(),
            size,
            modified,
            kind,
            backing,
            secondary_key: None,
            type_name: None,
        }
    }

    /// Attach a stable identifier. Blank keys are treated as absent.
    pub fn with_secondary_key(mut self, key: impl Into<String>) -> Self {
        let key = key.into();
        self.secondary_key = if key.trim().is_empty() { None } else { Some(key) };
        self
    }

    /// Attach the record's structure type.
    pub fn with_type_name(mut self, type_name: impl Into<String>) -> Self {
        let type_name = type_name.into();
        self.type_name = if type_name.is_empty() {
            None
        } else {
            Some(type_name)
        };
        self
    }

    /// Same entry under a different index path; the backing locator is kept.
    pub(crate) fn relocated(mut self, path: String) -> Self {
        self.path = path;
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn modified(&self) -> NaiveDateTime {
        self.modified
    }

    pub fn kind(&self) -> EntryKind {
        self.kind
    }

    pub fn backing(&self) -> &BackingRef {
        &self.backing
    }

    pub fn secondary_key(&self) -> Option<&str> {
        self.secondary_key.as_deref()
    }

    pub fn type_name(&self) -> Option<&str> {
        self.type_name.as_deref()
    }
}
