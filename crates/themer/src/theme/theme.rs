//! Theme struct.

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::error::Result;
use crate::source::{AssetSource, TemplateSource};

/// A named bundle that can override templates and serve static assets.
///
/// Themes are created by a [`ThemeSourceProvider`](crate::ThemeSourceProvider)
/// and are immutable once registered; re-scanning replaces them.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use themer::{InlineAssets, InlineTemplates, Theme};
///
/// let mut templates = InlineTemplates::new();
/// templates.add("index.html", "Hello from dark");
///
/// let theme = Theme::new("dark", Arc::new(templates), Arc::new(InlineAssets::new()));
/// assert_eq!(theme.load_template("index.html").unwrap(), "Hello from dark");
/// ```
#[derive(Debug, Clone)]
pub struct Theme {
    name: String,
    templates: Arc<dyn TemplateSource>,
    assets: Arc<dyn AssetSource>,
    data: Map<String, Value>,
}

impl Theme {
    /// Creates a theme with empty metadata.
    pub fn new(
        name: impl Into<String>,
        templates: Arc<dyn TemplateSource>,
        assets: Arc<dyn AssetSource>,
    ) -> Self {
        Self {
            name: name.into(),
            templates,
            assets,
            data: Map::new(),
        }
    }

    /// Replaces the theme's metadata, returning the updated theme.
    ///
    /// Providers are free to put anything here, for example the contents of
    /// a metadata file shipped with the theme.
    pub fn with_data(mut self, data: Map<String, Value>) -> Self {
        self.data = data;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data(&self) -> &Map<String, Value> {
        &self.data
    }

    pub fn templates(&self) -> &Arc<dyn TemplateSource> {
        &self.templates
    }

    pub fn assets(&self) -> &Arc<dyn AssetSource> {
        &self.assets
    }

    /// Loads template source text from this theme.
    pub fn load_template(&self, path: &str) -> Result<String> {
        self.templates.load(path)
    }

    /// Fetches static asset bytes from this theme.
    pub fn fetch_asset(&self, path: &str) -> Result<Vec<u8>> {
        self.assets.fetch(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{InlineAssets, InlineTemplates};

    fn theme() -> Theme {
        let mut templates = InlineTemplates::new();
        templates.add("index.html", "index");
        let mut assets = InlineAssets::new();
        assets.add("logo.svg", b"<svg/>".to_vec());
        Theme::new("test", Arc::new(templates), Arc::new(assets))
    }

    #[test]
    fn test_theme_delegates_templates() {
        let theme = theme();
        assert_eq!(theme.name(), "test");
        assert_eq!(theme.load_template("index.html").unwrap(), "index");
        assert!(theme.load_template("other.html").unwrap_err().is_not_found());
    }

    #[test]
    fn test_theme_delegates_assets() {
        let theme = theme();
        assert_eq!(theme.fetch_asset("logo.svg").unwrap(), b"<svg/>".to_vec());
        assert!(theme.fetch_asset("logo.png").unwrap_err().is_not_found());
    }

    #[test]
    fn test_theme_with_data() {
        let mut data = Map::new();
        data.insert("author".to_string(), Value::from("someone"));
        let theme = theme().with_data(data);
        assert_eq!(theme.data().get("author"), Some(&Value::from("someone")));
    }

    #[test]
    fn test_theme_default_data_is_empty() {
        assert!(theme().data().is_empty());
    }
}
