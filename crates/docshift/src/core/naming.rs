//! Filesystem-safe names for staged uploads, run directories and outputs.

use once_cell::sync::Lazy;
use regex::Regex;

/// Longest base name kept by [`safe_base_name`], in characters.
pub const MAX_BASE_NAME_LEN: usize = 80;

/// Used when sanitising leaves nothing behind.
pub const FALLBACK_BASE_NAME: &str = "output";

static UNSAFE_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^A-Za-z0-9_-]+").expect("Unsafe character regex pattern is valid and should compile"));

/// Final path component of `name`, accepting both `/` and `\` as separators.
fn file_name_component(name: &str) -> &str {
    name.rsplit(['/', '\\']).next().unwrap_or(name)
}

/// Base name of `name` without directories or extension, with every run of characters outside
/// `[A-Za-z0-9_-]` collapsed to `_` and the result cut to 80 characters.
///
/// ```rust
/// use docshift::core::naming::safe_base_name;
///
/// assert_eq!(safe_base_name("Quarterly Report (final).pdf"), "Quarterly_Report_final_");
/// assert_eq!(safe_base_name(""), "output");
/// ```
pub fn safe_base_name(name: &str) -> String {
    let file_name = file_name_component(name.trim_end_matches(['/', '\\']));
    // A leading dot starts a hidden name, not an extension.
    let stem = match file_name.rfind('.') {
        Some(0) | None => file_name,
        Some(dot) => &file_name[..dot],
    };

    let sanitized = UNSAFE_RUN.replace_all(stem, "_");
    let truncated: String = sanitized.chars().take(MAX_BASE_NAME_LEN).collect();

    if truncated.is_empty() {
        FALLBACK_BASE_NAME.to_string()
    } else {
        truncated
    }
}

/// Lowercased extension of `name` without the dot, if any.
pub fn extension_of(name: &str) -> Option<String> {
    let file_name = file_name_component(name);
    match file_name.rfind('.') {
        Some(dot) if dot + 1 < file_name.len() => Some(file_name[dot + 1..].to_ascii_lowercase()),
        _ => None,
    }
}

/// Unique staging name: `<uuid>-<sanitised base>[.<ext>]`.
///
/// The extension is kept so downstream tools that key on it still work.
pub fn unique_stage_name(original: &str) -> String {
    let base = safe_base_name(original);
    match extension_of(original) {
        Some(ext) if UNSAFE_RUN.find(&ext).is_none() => format!("{}-{}.{}", new_run_id(), base, ext),
        _ => format!("{}-{}", new_run_id(), base),
    }
}

/// Fresh random identifier for one conversion run.
pub fn new_run_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}
