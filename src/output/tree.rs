//! Tree formatter for projections
//!
//! Renders a `FilteredProjection` with box-drawing connectors, either to a
//! plain string or to a colored stdout stream.

use std::io::{self, Write};
use termcolor::{Buffer, Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

use crate::index::{FilteredProjection, NodeId};

use super::config::OutputConfig;

/// Formatter for tree output.
pub struct TreeFormatter {
    config: OutputConfig,
}

impl TreeFormatter {
    pub fn new(config: OutputConfig) -> Self {
        Self { config }
    }

    /// Plain-text rendering, root labelled `title`.
    pub fn format(
        &self,
        projection: &FilteredProjection<'_>,
        title: &str,
    ) -> io::Result<String> {
        let mut buffer = Buffer::no_color();
        self.write(projection, title, &mut buffer)?;
        Ok(String::from_utf8_lossy(buffer.as_slice()).into_owned())
    }

    pub fn print(&self, projection: &FilteredProjection<'_>, title: &str) -> io::Result<()> {
        let choice = if self.config.use_color {
            ColorChoice::Auto
        } else {
            ColorChoice::Never
        };
        let mut stdout = StandardStream::stdout(choice);
        self.write(projection, title, &mut stdout)
    }

    pub fn write<W: WriteColor>(
        &self,
        projection: &FilteredProjection<'_>,
        title: &str,
        out: &mut W,
    ) -> io::Result<()> {
        out.set_color(ColorSpec::new().set_fg(Some(Color::Blue)).set_bold(true))?;
        write!(out, "{}", title)?;
        out.reset()?;
        self.write_columns(projection, NodeId::ROOT, out)?;
        writeln!(out)?;

        let (dir_count, file_count) = self.write_children(projection, NodeId::ROOT, out, "", 1)?;
        writeln!(out)?;
        writeln!(out, "{} directories, {} files", dir_count, file_count)?;
        Ok(())
    }

    fn visible_children(&self, projection: &FilteredProjection<'_>, id: NodeId) -> Vec<NodeId> {
        let mut children = projection.children(id);
        if self.config.dirs_only {
            children.retain(|&child| projection.node(child).is_dir());
        }
        children
    }

    fn write_children<W: WriteColor>(
        &self,
        projection: &FilteredProjection<'_>,
        id: NodeId,
        out: &mut W,
        prefix: &str,
        depth: usize,
    ) -> io::Result<(usize, usize)> {
        if !self.config.shows_depth(depth) {
            return Ok((0, 0));
        }

        let children = self.visible_children(projection, id);
        let mut dir_count = 0;
        let mut file_count = 0;

        for (i, &child) in children.iter().enumerate() {
            let is_last = i == children.len() - 1;
            let connector = if is_last { "└── " } else { "├── " };
            let node = projection.node(child);

            write!(out, "{}{}", prefix, connector)?;
            if node.is_dir() {
                out.set_color(ColorSpec::new().set_fg(Some(Color::Blue)).set_bold(true))?;
            } else {
                out.set_color(ColorSpec::new().set_fg(Some(Color::White)))?;
            }
            write!(out, "{}", node.display_name())?;
            out.reset()?;
            self.write_columns(projection, child, out)?;
            writeln!(out)?;

            if node.is_dir() {
                dir_count += 1;
                let new_prefix = if is_last {
                    format!("{}    ", prefix)
                } else {
                    format!("{}│   ", prefix)
                };
                let (d, f) = self.write_children(projection, child, out, &new_prefix, depth + 1)?;
                dir_count += d;
                file_count += f;
            } else {
                file_count += 1;
            }
        }

        Ok((dir_count, file_count))
    }

    /// Long-format columns after the name: size, date, type label.
    fn write_columns<W: WriteColor>(
        &self,
        projection: &FilteredProjection<'_>,
        id: NodeId,
        out: &mut W,
    ) -> io::Result<()> {
        if !self.config.long {
            return Ok(());
        }
        let index = projection.index();
        let node = index.node(id);
        out.set_color(ColorSpec::new().set_fg(Some(Color::Cyan)))?;
        write!(out, "  {:>6}  {:<19}", index.size_label(id), index.date_label(id))?;
        out.reset()?;
        let label = node.type_label();
        if !label.is_empty() {
            out.set_color(ColorSpec::new().set_fg(Some(Color::Yellow)))?;
            write!(out, "  {}", label)?;
            out.reset()?;
        }
        Ok(())
    }
}
