//! JSON manifests describing an archive listing
//!
//! ```json
//! {
//!   "label": "Game.dcb",
//!   "kind": "records",
//!   "content_root": "extracted",
//!   "entries": [
//!     { "path": "libs/foundry/records/ships/aurora.xml", "size": 812,
//!       "modified": "2023-04-01 12:00:00", "key": "0a1b...", "type": "EntityClassDefinition" }
//!   ]
//! }
//! ```
//!
//! The header is parsed up front; each entry is validated on its own so one
//! malformed entry does not spoil the listing.

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, NaiveDateTime};
use serde::Deserialize;
use serde_json::Value;

use crate::entry::{BackingRef, ContentReader, Entry, EntryKind};
use crate::error::{ArchiveError, Result};

use super::directory::FsReader;
use super::{ArchiveKind, EntrySource};

#[derive(Debug, Deserialize)]
struct Document {
    label: Option<String>,
    kind: ArchiveKind,
    content_root: Option<PathBuf>,
    #[serde(default)]
    entries: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct ManifestEntry {
    path: String,
    #[serde(default)]
    size: u64,
    modified: Option<Timestamp>,
    key: Option<String>,
    #[serde(rename = "type")]
    type_name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Timestamp {
    Unix(i64),
    Text(String),
}

impl Timestamp {
    fn resolve(&self) -> std::result::Result<NaiveDateTime, String> {
        match self {
            Timestamp::Unix(secs) => DateTime::from_timestamp(*secs, 0)
                .map(|t| t.naive_utc())
                .ok_or_else(|| format!("timestamp {} out of range", secs)),
            Timestamp::Text(text) => ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"]
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
                .ok_or_else(|| format!("unrecognised timestamp '{}'", text)),
        }
    }
}

struct NoContent;

impl ContentReader for NoContent {
    fn open(&self, locator: &str) -> io::Result<Box<dyn Read + Send>> {
        Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("manifest has no content root for '{}'", locator),
        ))
    }
}

/// An archive listing read from a JSON manifest.
pub struct ManifestSource {
    label: String,
    kind: ArchiveKind,
    content_root: Option<PathBuf>,
    entries: Vec<Value>,
}

impl ManifestSource {
    /// Read and parse the manifest header. `content_root` is resolved
    /// relative to the manifest's directory.
    pub fn open(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|source| ArchiveError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        let fallback = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self::parse(&text, base, fallback)
    }

    /// Parse manifest text; `base` anchors a relative content root.
    pub fn parse(text: &str, base: &Path, fallback_label: String) -> Result<Self> {
        let doc: Document = serde_json::from_str(text)?;
        Ok(Self {
            label: doc.label.unwrap_or(fallback_label),
            kind: doc.kind,
            content_root: doc.content_root.map(|root| base.join(root)),
            entries: doc.entries,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn entry_kind(&self) -> EntryKind {
        match self.kind {
            ArchiveKind::Package => EntryKind::File,
            ArchiveKind::Records => EntryKind::Record,
        }
    }

    fn convert(&self, raw: &Value, reader: &Arc<dyn ContentReader>) -> Result<Entry> {
        let raw_path = raw.get("path").and_then(Value::as_str);
        let parsed = ManifestEntry::deserialize(raw)
            .map_err(|e| ArchiveError::read(raw_path, e.to_string()))?;
        let modified = match &parsed.modified {
            Some(stamp) => stamp
                .resolve()
                .map_err(|reason| ArchiveError::read(Some(&parsed.path), reason))?,
            None => NaiveDateTime::default(),
        };

        let mut entry = Entry::new(
            parsed.path.clone(),
            parsed.size,
            modified,
            self.entry_kind(),
            BackingRef::new(Arc::clone(reader), parsed.path),
        );
        if let Some(key) = parsed.key {
            entry = entry.with_secondary_key(key);
        }
        if let Some(type_name) = parsed.type_name {
            entry = entry.with_type_name(type_name);
        }
        Ok(entry)
    }
}

impl EntrySource for ManifestSource {
    fn kind(&self) -> ArchiveKind {
        self.kind
    }

    fn label(&self) -> &str {
        &self.label
    }

    fn entries(&self) -> Result<Vec<Result<Entry>>> {
        let reader: Arc<dyn ContentReader> = match &self.content_root {
            Some(root) if root.is_dir() => Arc::new(FsReader::new(root.clone())),
            Some(root) => {
                return Err(ArchiveError::SourceOpen {
                    label: self.label.clone(),
                    reason: format!("content root {} is not a directory", root.display()),
                });
            }
            None => Arc::new(NoContent),
        };
        Ok(self
            .entries
            .iter()
            .map(|raw| self.convert(raw, &reader))
            .collect())
    }
}
