//! Themes and the registry that holds them.
//!
//! This module provides:
//!
//! - [`Theme`]: a named bundle of a template source, an asset source and metadata
//! - [`ThemeRegistry`]: the read-mostly name → theme mapping
//! - [`CollisionPolicy`]: which theme wins when two providers share a name

#[allow(clippy::module_inception)]
mod theme;
mod registry;

pub use registry::{CollisionPolicy, ThemeMap, ThemeRegistry};
pub use theme::Theme;
