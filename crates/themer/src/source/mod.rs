//! Theme sources: where themes, their templates and their assets come from.
//!
//! This module provides:
//!
//! - [`TemplateSource`]: resolves a relative path to template source text
//! - [`AssetSource`]: resolves a relative path to static asset bytes
//! - [`ThemeSourceProvider`]: enumerates themes from a backing store
//! - [`FileSystemProvider`]: every sub-directory of a root is a theme
//! - [`MemoryProvider`]: themes assembled from inline strings and bytes
//!
//! Providers are selected at configuration time. When several providers are
//! configured they are queried in order and their themes merged into the
//! [`ThemeRegistry`](crate::ThemeRegistry).

mod fs;
mod memory;

use std::fmt;

use crate::error::Result;
use crate::theme::Theme;

pub use fs::{
    read_metadata, safe_join, DirFilter, DirTemplateSource, FileSystemProvider, StaticDir,
    METADATA_FILE, STATIC_DIR,
};
pub use memory::{InlineAssets, InlineTemplates, MemoryProvider, MemoryTheme};

/// Something that can produce template source text for a relative path.
///
/// Implementations report a missing template with
/// [`ThemeError::NotFound`](crate::ThemeError::NotFound); any other error is
/// treated as fatal by the loader chain.
pub trait TemplateSource: Send + Sync + fmt::Debug {
    fn load(&self, path: &str) -> Result<String>;
}

/// Something that can produce the bytes of a static asset.
pub trait AssetSource: Send + Sync + fmt::Debug {
    fn fetch(&self, path: &str) -> Result<Vec<u8>>;
}

/// A backing store of themes.
pub trait ThemeSourceProvider: Send + Sync + fmt::Debug {
    /// Returns every theme this provider knows about.
    ///
    /// A provider whose backing store does not exist yields no themes
    /// rather than an error.
    fn themes(&self) -> Result<Vec<Theme>>;

    /// Fetches a static asset for `theme` straight from the backing store.
    ///
    /// This is for direct access outside the request path, e.g. tooling or
    /// preloading. The static asset route reads through the registered
    /// [`Theme`]'s asset source instead, so it only serves themes that are
    /// currently loaded.
    fn fetch_asset(&self, theme: &str, path: &str) -> Result<Vec<u8>>;
}
