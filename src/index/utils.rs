//! Formatting helpers for node display columns

use chrono::NaiveDateTime;

/// Format a size in bytes to human-readable format.
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1}G", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1}M", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1}K", bytes as f64 / KB as f64)
    } else {
        format!("{}B", bytes)
    }
}

/// Format a modification time for display.
pub fn format_date(time: NaiveDateTime) -> String {
    time.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Everything from the first `.` of a name, e.g. `".dds.1"` for `"hull.dds.1"`.
pub fn name_suffix(name: &str) -> &str {
    name.find('.').map_or("", |i| &name[i..])
}
