//! In-memory theme provider.
//!
//! Themes built from inline template strings and asset bytes. Useful for
//! themes compiled into the binary and for tests that should not touch the
//! filesystem.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{Map, Value};

use super::{AssetSource, TemplateSource, ThemeSourceProvider};
use crate::error::{Result, ThemeError};
use crate::theme::Theme;

/// Template sources stored directly in memory.
#[derive(Debug, Clone, Default)]
pub struct InlineTemplates {
    templates: HashMap<String, String>,
}

impl InlineTemplates {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a template, replacing any previous one with the same path.
    pub fn add(&mut self, path: impl Into<String>, source: impl Into<String>) {
        self.templates.insert(path.into(), source.into());
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

impl TemplateSource for InlineTemplates {
    fn load(&self, path: &str) -> Result<String> {
        self.templates
            .get(path)
            .cloned()
            .ok_or_else(|| ThemeError::not_found(path))
    }
}

/// Static assets stored directly in memory.
#[derive(Debug, Clone, Default)]
pub struct InlineAssets {
    assets: HashMap<String, Vec<u8>>,
}

impl InlineAssets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, path: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        self.assets.insert(path.into(), bytes.into());
    }
}

impl AssetSource for InlineAssets {
    fn fetch(&self, path: &str) -> Result<Vec<u8>> {
        self.assets
            .get(path)
            .cloned()
            .ok_or_else(|| ThemeError::not_found(path))
    }
}

/// Builder for a single in-memory theme.
///
/// # Example
///
/// ```rust
/// use themer::{MemoryProvider, MemoryTheme};
///
/// let provider = MemoryProvider::new()
///     .with_theme(
///         MemoryTheme::new("dark")
///             .template("index.html", "<body class=\"dark\">")
///             .asset("app.css", "body { background: #000 }"),
///     );
/// ```
#[derive(Debug, Clone)]
pub struct MemoryTheme {
    name: String,
    templates: Arc<InlineTemplates>,
    assets: Arc<InlineAssets>,
    data: Map<String, Value>,
}

impl MemoryTheme {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            templates: Arc::default(),
            assets: Arc::default(),
            data: Map::new(),
        }
    }

    pub fn template(mut self, path: impl Into<String>, source: impl Into<String>) -> Self {
        Arc::make_mut(&mut self.templates).add(path, source);
        self
    }

    pub fn asset(mut self, path: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Arc::make_mut(&mut self.assets).add(path, bytes);
        self
    }

    /// Attaches a metadata entry.
    pub fn data(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn to_theme(&self) -> Theme {
        Theme::new(
            self.name.clone(),
            self.templates.clone(),
            self.assets.clone(),
        )
        .with_data(self.data.clone())
    }
}

/// A provider serving themes held in memory.
///
/// Themes are reported in insertion order; a later theme with the same name
/// is reported after the earlier one, so registry collision rules apply.
#[derive(Debug, Clone, Default)]
pub struct MemoryProvider {
    themes: Vec<MemoryTheme>,
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_theme(mut self, theme: MemoryTheme) -> Self {
        self.themes.push(theme);
        self
    }
}

impl ThemeSourceProvider for MemoryProvider {
    fn themes(&self) -> Result<Vec<Theme>> {
        Ok(self.themes.iter().map(MemoryTheme::to_theme).collect())
    }

    fn fetch_asset(&self, theme: &str, path: &str) -> Result<Vec<u8>> {
        self.themes
            .iter()
            .rev()
            .find(|t| t.name == theme)
            .ok_or_else(|| ThemeError::not_found(path))?
            .assets
            .fetch(path)
    }
}
