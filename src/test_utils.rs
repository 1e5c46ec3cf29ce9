//! Test utilities for building entries, indexes and sample archives.
//!
//! This module is only compiled for tests and benchmarks.

use std::fs;
use std::io::{self, Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, NaiveDateTime};
use tempfile::TempDir;

use crate::entry::{BackingRef, ContentReader, Entry, EntryKind};
use crate::index::{BatchItem, PathTreeIndex, split_parent};

/// Serves every locator's own name as its content.
pub struct EchoReader;

impl ContentReader for EchoReader {
    fn open(&self, locator: &str) -> io::Result<Box<dyn Read + Send>> {
        Ok(Box::new(Cursor::new(locator.as_bytes().to_vec())))
    }
}

fn at(secs: i64) -> NaiveDateTime {
    DateTime::from_timestamp(secs, 0)
        .map(|t| t.naive_utc())
        .unwrap_or_default()
}

/// A file entry dated at the Unix epoch.
pub fn file_entry(path: &str, size: u64) -> Entry {
    entry_at(path, size, 0)
}

pub fn entry_at(path: &str, size: u64, secs: i64) -> Entry {
    Entry::new(
        path,
        size,
        at(secs),
        EntryKind::File,
        BackingRef::new(Arc::new(EchoReader), path),
    )
}

pub fn record_entry(path: &str, key: &str, type_name: &str) -> Entry {
    Entry::new(
        path,
        0,
        at(0),
        EntryKind::Record,
        BackingRef::new(Arc::new(EchoReader), path),
    )
    .with_secondary_key(key)
    .with_type_name(type_name)
}

/// An index holding a 10-byte file for each of `paths`, inserted in order.
pub fn index_of(paths: &[&str]) -> PathTreeIndex {
    let mut index = PathTreeIndex::new();
    for (ordinal, path) in paths.iter().enumerate() {
        let (parent, _) = split_parent(path);
        index
            .insert_batch(parent, vec![BatchItem::new(ordinal, file_entry(path, 10))])
            .expect("sample paths must not conflict");
    }
    index
}

/// Sample archives on disk: a package directory and a records manifest.
///
/// The directory is removed when dropped.
pub struct SampleArchive {
    dir: TempDir,
}

impl SampleArchive {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        Self { dir }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Add a file below the package directory `package`.
    pub fn add_file(&self, package: &str, path: &str, content: &str) -> PathBuf {
        let full_path = self.dir.path().join(package).join(path);
        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent dirs");
        }
        fs::write(&full_path, content).expect("Failed to write file");
        full_path
    }

    /// A small package: `Data/Objects/ship.cgf`, `Data/Textures/hull.dds`,
    /// `Data/Textures/hull.dds.1`, `Data/readme.txt`.
    pub fn package(&self, name: &str) -> PathBuf {
        self.add_file(name, "Data/Objects/ship.cgf", "CryTek");
        self.add_file(name, "Data/Textures/hull.dds", "DDS hull");
        self.add_file(name, "Data/Textures/hull.dds.1", "mip");
        self.add_file(name, "Data/readme.txt", "read me");
        self.dir.path().join(name)
    }

    /// Write a manifest file and return its path.
    pub fn manifest(&self, name: &str, json: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        fs::write(&path, json).expect("Failed to write manifest");
        path
    }

    /// A records manifest with three records, one of them a duplicate name,
    /// and content files under `records/`.
    pub fn records(&self, name: &str) -> PathBuf {
        let root = "libs/foundry/records";
        for (file, body) in [
            ("ships/aurora.xml", "<Ship name=\"aurora\"/>"),
            ("ammo/bullet.xml", "<Ammo/>"),
        ] {
            self.add_file("records", &format!("{}/{}", root, file), body);
        }
        let json = format!(
            r#"{{
  "label": "Game.dcb",
  "kind": "records",
  "content_root": "records",
  "entries": [
    {{"path": "{root}/ships/aurora.xml", "size": 21, "modified": "2023-04-01 12:00:00",
      "key": "0a1b2c3d-0000-0000-0000-000000000001", "type": "EntityClassDefinition"}},
    {{"path": "{root}/ammo/bullet.xml", "size": 7, "modified": "2023-04-02 08:30:00",
      "key": "0a1b2c3d-0000-0000-0000-000000000002", "type": "AmmoParams"}},
    {{"path": "{root}/ships/aurora.xml", "size": 21, "modified": "2023-04-03 09:00:00",
      "key": "0a1b2c3d-0000-0000-0000-000000000003", "type": "EntityClassDefinition"}}
  ]
}}"#
        );
        self.manifest(name, &json)
    }
}

impl Default for SampleArchive {
    fn default() -> Self {
        Self::new()
    }
}
