//! Archive statistics collection and display
//!
//! Aggregate counts over a loaded index: leaves, directories, total bytes and
//! a breakdown by type label.

use serde::Serialize;
use std::collections::HashMap;
use std::io::{self, Write};
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

use crate::index::{PathTreeIndex, format_size};
use crate::loader::LoadReport;

/// Collected statistics about one archive.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ArchiveStats {
    pub label: String,
    pub files: usize,
    pub directories: usize,
    pub total_bytes: u64,
    /// Leaves without readable metadata
    pub without_metadata: usize,
    /// Listing entries left out of the index
    pub skipped: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub by_type: Vec<TypeStats>,
}

/// Statistics for a single type label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeStats {
    /// Type label, or empty for names without one
    pub label: String,
    pub files: usize,
    pub bytes: u64,
}

impl ArchiveStats {
    pub fn collect(label: &str, index: &PathTreeIndex, report: Option<&LoadReport>) -> Self {
        let mut by_type: HashMap<String, (usize, u64)> = HashMap::new();
        let mut total_bytes = 0;
        let mut without_metadata = 0;

        for node in index.iter().filter(|n| !n.is_dir()) {
            let size = node.entry().map_or(0, |e| e.size());
            if node.entry().is_none() {
                without_metadata += 1;
            }
            total_bytes += size;
            let slot = by_type
                .entry(node.type_label().to_lowercase())
                .or_insert((0, 0));
            slot.0 += 1;
            slot.1 += size;
        }

        let mut types: Vec<TypeStats> = by_type
            .into_iter()
            .map(|(label, (files, bytes))| TypeStats { label, files, bytes })
            .collect();
        // Sort by file count descending, then by label
        types.sort_by(|a, b| b.files.cmp(&a.files).then_with(|| a.label.cmp(&b.label)));

        Self {
            label: label.to_string(),
            files: index.leaf_count(),
            directories: index.directory_count(),
            total_bytes,
            without_metadata,
            skipped: report.map_or(0, |r| r.skipped.len()),
            by_type: types,
        }
    }
}

/// Print statistics to stdout with optional color.
pub fn print_stats(stats: &ArchiveStats, use_color: bool) -> io::Result<()> {
    let color_choice = if use_color {
        ColorChoice::Auto
    } else {
        ColorChoice::Never
    };
    let mut stdout = StandardStream::stdout(color_choice);
    write_stats(stats, &mut stdout)
}

pub fn write_stats<W: WriteColor>(stats: &ArchiveStats, out: &mut W) -> io::Result<()> {
    let mut bold = ColorSpec::new();
    bold.set_bold(true);
    out.set_color(&bold)?;
    writeln!(out, "{}", stats.label)?;
    out.reset()?;
    writeln!(out, "{}", "─".repeat(stats.label.chars().count().max(19)))?;

    writeln!(out, "Files:        {} total", format_number(stats.files))?;
    writeln!(out, "Directories:  {}", format_number(stats.directories))?;
    writeln!(out, "Size:         {}", format_size(stats.total_bytes))?;
    if stats.without_metadata > 0 {
        writeln!(out, "No metadata:  {}", format_number(stats.without_metadata))?;
    }
    if stats.skipped > 0 {
        writeln!(out, "Skipped:      {}", format_number(stats.skipped))?;
    }
    writeln!(out)?;

    if !stats.by_type.is_empty() {
        out.set_color(&bold)?;
        writeln!(out, "By Type:")?;
        out.reset()?;

        let mut type_color = ColorSpec::new();
        type_color.set_fg(Some(Color::Cyan));

        for entry in &stats.by_type {
            let label = if entry.label.is_empty() {
                "(none)"
            } else {
                entry.label.as_str()
            };
            write!(out, "  ")?;
            out.set_color(&type_color)?;
            write!(out, "{:<24}", label)?;
            out.reset()?;
            writeln!(
                out,
                "{:>8} files  {:>7}",
                format_number(entry.files),
                format_size(entry.bytes)
            )?;
        }
        writeln!(out)?;
    }

    Ok(())
}

/// Format a number with thousand separators.
fn format_number(n: usize) -> String {
    let s = n.to_string();
    let chars: Vec<char> = s.chars().collect();
    let mut result = String::new();

    for (i, c) in chars.iter().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.insert(0, ',');
        }
        result.insert(0, *c);
    }

    result
}
