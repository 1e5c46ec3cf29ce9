//! In-memory archive listings

use std::collections::HashMap;
use std::io::{self, Cursor, Read};
use std::sync::Arc;

use chrono::{DateTime, NaiveDateTime};

use crate::entry::{BackingRef, ContentReader, Entry, EntryKind};
use crate::error::{ArchiveError, Result};

use super::{ArchiveKind, EntrySource};

struct MemoryReader {
    contents: HashMap<String, Vec<u8>>,
}

impl ContentReader for MemoryReader {
    fn open(&self, locator: &str) -> io::Result<Box<dyn Read + Send>> {
        match self.contents.get(locator) {
            Some(bytes) => Ok(Box::new(Cursor::new(bytes.clone()))),
            None => Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no content for '{}'", locator),
            )),
        }
    }
}

#[derive(Debug, Clone)]
enum Item {
    Entry {
        path: String,
        modified: NaiveDateTime,
        kind: EntryKind,
        key: Option<String>,
        type_name: Option<String>,
    },
    Unreadable {
        path: Option<String>,
        reason: String,
    },
}

/// An archive built in memory, entry by entry.
///
/// ```
/// use arbor::source::{EntrySource, MemorySource};
///
/// let source = MemorySource::package("Data.p4k")
///     .file("Data/a.txt", "hello")
///     .file("Data/b.txt", "world");
/// assert_eq!(source.entries().unwrap().len(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct MemorySource {
    label: String,
    kind: ArchiveKind,
    items: Vec<Item>,
    contents: HashMap<String, Vec<u8>>,
    open_error: Option<String>,
    modified: NaiveDateTime,
}

impl MemorySource {
    pub fn package(label: impl Into<String>) -> Self {
        Self::new(label, ArchiveKind::Package)
    }

    pub fn records(label: impl Into<String>) -> Self {
        Self::new(label, ArchiveKind::Records)
    }

    fn new(label: impl Into<String>, kind: ArchiveKind) -> Self {
        Self {
            label: label.into(),
            kind,
            items: Vec::new(),
            contents: HashMap::new(),
            open_error: None,
            modified: NaiveDateTime::default(),
        }
    }

    /// Timestamp given to entries added after this call.
    pub fn modified_at(mut self, unix_secs: i64) -> Self {
        self.modified = DateTime::from_timestamp(unix_secs, 0)
            .map(|t| t.naive_utc())
            .unwrap_or_default();
        self
    }

    pub fn file(mut self, path: impl Into<String>, contents: impl Into<Vec<u8>>) -> Self {
        let path = path.into();
        self.contents.insert(path.clone(), contents.into());
        self.items.push(Item::Entry {
            path,
            modified: self.modified,
            kind: EntryKind::File,
            key: None,
            type_name: None,
        });
        self
    }

    pub fn record(
        mut self,
        path: impl Into<String>,
        key: impl Into<String>,
        type_name: impl Into<String>,
        contents: impl Into<Vec<u8>>,
    ) -> Self {
        let path = path.into();
        self.contents.insert(path.clone(), contents.into());
        self.items.push(Item::Entry {
            path,
            modified: self.modified,
            kind: EntryKind::Record,
            key: Some(key.into()),
            type_name: Some(type_name.into()),
        });
        self
    }

    /// An entry whose metadata cannot be read. With a path, the loader can
    /// still place a bare leaf for it.
    pub fn unreadable(mut self, path: Option<&str>, reason: impl Into<String>) -> Self {
        self.items.push(Item::Unreadable {
            path: path.map(str::to_string),
            reason: reason.into(),
        });
        self
    }

    /// Make `entries()` fail as if the archive could not be opened.
    pub fn failing_open(mut self, reason: impl Into<String>) -> Self {
        self.open_error = Some(reason.into());
        self
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl EntrySource for MemorySource {
    fn kind(&self) -> ArchiveKind {
        self.kind
    }

    fn label(&self) -> &str {
        &self.label
    }

    fn entries(&self) -> Result<Vec<Result<Entry>>> {
        if let Some(reason) = &self.open_error {
            return Err(ArchiveError::SourceOpen {
                label: self.label.clone(),
                reason: reason.clone(),
            });
        }

        let reader: Arc<dyn ContentReader> = Arc::new(MemoryReader {
            contents: self.contents.clone(),
        });

        Ok(self
            .items
            .iter()
            .map(|item| match item {
                Item::Entry {
                    path,
                    modified,
                    kind,
                    key,
                    type_name,
                } => {
                    let size = self.contents.get(path).map_or(0, |c| c.len() as u64);
                    let mut entry = Entry::new(
                        path.clone(),
                        size,
                        *modified,
                        *kind,
                        BackingRef::new(Arc::clone(&reader), path.clone()),
                    );
                    if let Some(key) = key {
                        entry = entry.with_secondary_key(key.clone());
                    }
                    if let Some(type_name) = type_name {
                        entry = entry.with_type_name(type_name.clone());
                    }
                    Ok(entry)
                }
                Item::Unreadable { path, reason } => {
                    Err(ArchiveError::read(path.as_deref(), reason.clone()))
                }
            })
            .collect())
    }
}
