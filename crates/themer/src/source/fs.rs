//! Filesystem-backed theme provider.
//!
//! A themes root looks like this:
//!
//! ```text
//! themes/
//! ├── dark/
//! │   ├── theme.yaml        (optional metadata)
//! │   ├── index.html
//! │   └── static/
//! │       └── app.css
//! └── _drafts/              (can be excluded with a filter)
//! ```
//!
//! Each immediate sub-directory is a theme named after the directory. Its
//! templates are read relative to the directory itself and its assets
//! relative to `<theme>/static`.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::{Map, Value};

use super::{AssetSource, TemplateSource, ThemeSourceProvider};
use crate::error::{Result, ThemeError};
use crate::theme::Theme;

/// Name of the optional per-theme metadata file.
pub const METADATA_FILE: &str = "theme.yaml";

/// Name of the per-theme static asset directory.
pub const STATIC_DIR: &str = "static";

/// Predicate deciding whether a candidate theme directory is kept.
pub type DirFilter = Arc<dyn Fn(&Path) -> bool + Send + Sync>;

/// Joins a slash-separated relative path onto `root` without escaping it.
///
/// Empty and `.` segments are skipped. Returns `None` if any segment is
/// `..` or contains a backslash or a drive separator.
///
/// # Example
///
/// ```rust
/// use std::path::Path;
/// use themer::source::safe_join;
///
/// let joined = safe_join(Path::new("/srv/static"), "css/app.css").unwrap();
/// assert_eq!(joined, Path::new("/srv/static/css/app.css"));
/// assert!(safe_join(Path::new("/srv/static"), "../secret").is_none());
/// ```
pub fn safe_join(root: &Path, relative: &str) -> Option<PathBuf> {
    let mut joined = root.to_path_buf();
    for segment in relative.split('/') {
        match segment {
            "" | "." => continue,
            ".." => return None,
            s if s.contains('\\') || s.contains(':') => return None,
            s => joined.push(s),
        }
    }
    Some(joined)
}

/// Reads a file under `root`, mapping every flavor of "absent" to NotFound.
fn read_under(root: &Path, relative: &str) -> Result<Vec<u8>> {
    let path = safe_join(root, relative).ok_or_else(|| ThemeError::not_found(relative))?;
    if !path.is_file() {
        return Err(ThemeError::not_found(relative));
    }
    fs::read(&path).map_err(|source| match source.kind() {
        io::ErrorKind::NotFound => ThemeError::not_found(relative),
        _ => ThemeError::Io { path, source },
    })
}

/// Template source rooted at a directory.
#[derive(Debug, Clone)]
pub struct DirTemplateSource {
    root: PathBuf,
}

impl DirTemplateSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl TemplateSource for DirTemplateSource {
    fn load(&self, path: &str) -> Result<String> {
        let bytes = read_under(&self.root, path)?;
        String::from_utf8(bytes).map_err(|e| ThemeError::Io {
            path: self.root.join(path),
            source: io::Error::new(io::ErrorKind::InvalidData, e),
        })
    }
}

/// Static asset source rooted at a directory.
#[derive(Debug, Clone)]
pub struct StaticDir {
    root: PathBuf,
}

impl StaticDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl AssetSource for StaticDir {
    fn fetch(&self, path: &str) -> Result<Vec<u8>> {
        read_under(&self.root, path)
    }
}

/// A provider that treats every sub-directory of `root` as a theme.
///
/// # Example
///
/// ```rust,ignore
/// use themer::FileSystemProvider;
///
/// let provider = FileSystemProvider::new("themes")
///     .with_filter(|dir| !dir.file_name().unwrap().to_string_lossy().starts_with('_'));
/// ```
#[derive(Clone)]
pub struct FileSystemProvider {
    root: PathBuf,
    filter: Option<DirFilter>,
}

impl FileSystemProvider {
    /// Creates a provider searching `root` for theme directories.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            filter: None,
        }
    }

    /// Keeps only the candidate directories for which `filter` returns true.
    pub fn with_filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&Path) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Arc::new(filter));
        self
    }

    /// Same as [`with_filter`](Self::with_filter), for an already shared predicate.
    pub fn with_shared_filter(mut self, filter: DirFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    /// The directory being searched.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn static_dir(&self, theme: &str) -> Option<StaticDir> {
        if theme.is_empty() || theme.contains('/') {
            return None;
        }
        let theme_dir = safe_join(&self.root, theme)?;
        Some(StaticDir::new(theme_dir.join(STATIC_DIR)))
    }

    fn keep(&self, dir: &Path) -> bool {
        self.filter.as_ref().map_or(true, |filter| filter(dir))
    }
}

impl std::fmt::Debug for FileSystemProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileSystemProvider")
            .field("root", &self.root)
            .field("filtered", &self.filter.is_some())
            .finish()
    }
}

impl ThemeSourceProvider for FileSystemProvider {
    fn themes(&self) -> Result<Vec<Theme>> {
        if !self.root.exists() {
            tracing::debug!(target: "themer::source", root = %self.root.display(), "themes root does not exist");
            return Ok(Vec::new());
        }

        let entries = fs::read_dir(&self.root).map_err(|source| ThemeError::Io {
            path: self.root.clone(),
            source,
        })?;

        let mut themes = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| ThemeError::Io {
                path: self.root.clone(),
                source,
            })?;
            let path = entry.path();
            if !path.is_dir() || !self.keep(&path) {
                continue;
            }
            // Theme names travel through URLs and sentinel paths, so they must be UTF-8.
            let Some(name) = path.file_name().and_then(|n| n.to_str()).map(str::to_owned) else {
                continue;
            };

            let data = match read_metadata(&path) {
                Ok(data) => data,
                Err(err) => {
                    tracing::warn!(target: "themer::source", theme = %name, "ignoring theme metadata: {}", err);
                    Map::new()
                }
            };

            themes.push(
                Theme::new(
                    name,
                    Arc::new(DirTemplateSource::new(&path)),
                    Arc::new(StaticDir::new(path.join(STATIC_DIR))),
                )
                .with_data(data),
            );
        }

        themes.sort_by(|a, b| a.name().cmp(b.name()));
        tracing::debug!(target: "themer::source", root = %self.root.display(), count = themes.len(), "enumerated themes");
        Ok(themes)
    }

    fn fetch_asset(&self, theme: &str, path: &str) -> Result<Vec<u8>> {
        self.static_dir(theme)
            .ok_or_else(|| ThemeError::not_found(path))?
            .fetch(path)
    }
}

/// Reads the optional metadata file of a theme directory.
///
/// A missing file yields an empty mapping. The document must be a YAML
/// mapping; its contents are not otherwise interpreted.
pub fn read_metadata(theme_dir: &Path) -> Result<Map<String, Value>> {
    let path = theme_dir.join(METADATA_FILE);
    if !path.is_file() {
        return Ok(Map::new());
    }
    let text = fs::read_to_string(&path).map_err(|source| ThemeError::Io {
        path: path.clone(),
        source,
    })?;
    match serde_yaml::from_str::<Value>(&text) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(Value::Null) => Ok(Map::new()),
        Ok(_) => Err(ThemeError::Metadata {
            path,
            message: "expected a mapping at the top level".to_string(),
        }),
        Err(e) => Err(ThemeError::Metadata {
            path,
            message: e.to_string(),
        }),
    }
}
