//! Sentinel template paths.
//!
//! A logical template path is tagged with the active theme before it is
//! handed to the template engine:
//!
//! ```text
//! ☃/<theme>/<relative/path.html>
//! ```
//!
//! Only the themed loader understands these paths; every other source in the
//! loader chain simply reports them as missing. The relative path may contain
//! further separators, so parsing splits on the first separator after the
//! prefix only.

use crate::error::{Result, ThemeError};

/// Marks a template path as theme-scoped. Real template paths never start
/// with it.
pub const MAGIC_PATH_PREFIX: &str = "\u{2603}";

/// Separator between prefix, theme name and relative path.
pub const SEPARATOR: char = '/';

/// Builds the sentinel path for `path` inside `theme`.
///
/// # Example
///
/// ```rust
/// use themer::sentinel::to_sentinel;
///
/// assert_eq!(to_sentinel("dark", "pages/index.html"), "\u{2603}/dark/pages/index.html");
/// ```
pub fn to_sentinel(theme: &str, path: &str) -> String {
    format!("{MAGIC_PATH_PREFIX}{SEPARATOR}{theme}{SEPARATOR}{path}")
}

/// Returns true if `raw` carries the sentinel prefix.
pub fn is_sentinel(raw: &str) -> bool {
    strip_prefix(raw).is_some()
}

fn strip_prefix(raw: &str) -> Option<&str> {
    raw.strip_prefix(MAGIC_PATH_PREFIX)?.strip_prefix(SEPARATOR)
}

/// Splits a sentinel path into `(theme, relative_path)`.
///
/// # Errors
///
/// - [`ThemeError::NotFound`] if `raw` does not start with the prefix
/// - [`ThemeError::MalformedSentinel`] if no separator follows the theme name
pub fn parse_sentinel(raw: &str) -> Result<(&str, &str)> {
    let rest = strip_prefix(raw).ok_or_else(|| ThemeError::not_found(raw))?;
    rest.split_once(SEPARATOR)
        .ok_or_else(|| ThemeError::MalformedSentinel {
            path: raw.to_string(),
        })
}
