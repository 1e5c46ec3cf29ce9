//! Output configuration types

/// Configuration for output formatting.
#[derive(Debug, Clone)]
pub struct OutputConfig {
    pub use_color: bool,
    /// Show size, date and type columns.
    pub long: bool,
    /// Descend only this many levels below the root.
    pub max_depth: Option<usize>,
    pub dirs_only: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            use_color: true,
            long: false,
            max_depth: None,
            dirs_only: false,
        }
    }
}

impl OutputConfig {
    /// Whether nodes at `depth` (root = 0) are shown.
    pub fn shows_depth(&self, depth: usize) -> bool {
        self.max_depth.is_none_or(|max| depth <= max)
    }
}
