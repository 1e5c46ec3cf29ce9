//! Tree formatting and display
//!
//! - `config` - Output configuration types
//! - `tree` - Box-drawing tree formatter with optional colors
//! - `json` - JSON output

mod config;
mod json;
mod tree;

pub use config::OutputConfig;
pub use json::{JsonNode, print_json};
pub use tree::TreeFormatter;
