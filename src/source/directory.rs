//! A directory on disk, read as a package archive

use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Local};
use ignore::WalkBuilder;

use crate::entry::{BackingRef, ContentReader, Entry, EntryKind};
use crate::error::{ArchiveError, Result};

use super::{ArchiveKind, EntrySource};

/// Reads entry content relative to a root directory.
pub(crate) struct FsReader {
    root: PathBuf,
}

impl FsReader {
    pub(crate) fn new(root: PathBuf) -> Self {
        Self { root }
    }
}

impl ContentReader for FsReader {
    fn open(&self, locator: &str) -> io::Result<Box<dyn Read + Send>> {
        Ok(Box::new(File::open(self.root.join(locator))?))
    }
}

/// Every file below `root`, in sorted walk order.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
    label: String,
    show_hidden: bool,
    respect_ignore: bool,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let label = root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| root.display().to_string());
        Self {
            root,
            label,
            show_hidden: false,
            respect_ignore: true,
        }
    }

    /// Include dot-files.
    pub fn show_hidden(mut self, show: bool) -> Self {
        self.show_hidden = show;
        self
    }

    /// Honour `.gitignore` and `.ignore` files.
    pub fn respect_ignore(mut self, respect: bool) -> Self {
        self.respect_ignore = respect;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn relative(&self, path: &Path) -> Option<String> {
        let rel = path.strip_prefix(&self.root).ok()?;
        let segments: Vec<_> = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect();
        (!segments.is_empty()).then(|| segments.join("/"))
    }
}

impl EntrySource for DirectorySource {
    fn kind(&self) -> ArchiveKind {
        ArchiveKind::Package
    }

    fn label(&self) -> &str {
        &self.label
    }

    fn entries(&self) -> Result<Vec<Result<Entry>>> {
        if !self.root.is_dir() {
            return Err(ArchiveError::SourceOpen {
                label: self.label.clone(),
                reason: "not a directory".to_string(),
            });
        }

        let reader: Arc<dyn ContentReader> = Arc::new(FsReader::new(self.root.clone()));
        let walker = WalkBuilder::new(&self.root)
            .hidden(!self.show_hidden)
            .ignore(self.respect_ignore)
            .git_ignore(self.respect_ignore)
            .git_global(false)
            .git_exclude(self.respect_ignore)
            .require_git(false)
            .sort_by_file_name(|a, b| a.cmp(b))
            .build();

        let mut entries = Vec::new();
        for result in walker {
            let dent = match result {
                Ok(dent) => dent,
                Err(e) => {
                    entries.push(Err(ArchiveError::read(None, e.to_string())));
                    continue;
                }
            };
            if !dent.file_type().is_some_and(|t| t.is_file()) {
                continue;
            }
            let Some(rel) = self.relative(dent.path()) else {
                continue;
            };

            let entry = dent
                .metadata()
                .map_err(|e| ArchiveError::read(Some(&rel), e.to_string()))
                .map(|meta| {
                    let modified = meta
                        .modified()
                        .map(|t| DateTime::<Local>::from(t).naive_local())
                        .unwrap_or_default();
                    Entry::new(
                        rel.clone(),
                        meta.len(),
                        modified,
                        EntryKind::File,
                        BackingRef::new(Arc::clone(&reader), rel.clone()),
                    )
                });
            entries.push(entry);
        }
        Ok(entries)
    }
}
