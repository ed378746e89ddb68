//! The themed template loader.
//!
//! [`ThemeTemplateLoader`] sits in the host's template loader chain next to
//! the application's own template folder. It only answers sentinel paths
//! (see [`crate::sentinel`]) and reports everything else as missing, so the
//! two never compete for the same name.

use std::sync::Arc;

use crate::error::{Result, ThemeError};
use crate::sentinel::parse_sentinel;
use crate::source::TemplateSource;
use crate::theme::ThemeRegistry;

/// Resolves `☃/<theme>/<path>` against the theme registry.
#[derive(Debug, Clone)]
pub struct ThemeTemplateLoader {
    registry: Arc<ThemeRegistry>,
}

impl ThemeTemplateLoader {
    pub fn new(registry: Arc<ThemeRegistry>) -> Self {
        Self { registry }
    }
}

impl TemplateSource for ThemeTemplateLoader {
    /// Loads a themed template.
    ///
    /// Plain paths, malformed sentinels and unknown themes are reported as
    /// [`ThemeError::NotFound`] for `raw`. Errors from the theme's own
    /// template source are returned unchanged.
    fn load(&self, raw: &str) -> Result<String> {
        let (theme_name, path) = match parse_sentinel(raw) {
            Ok(parts) => parts,
            Err(err) => {
                if matches!(err, ThemeError::MalformedSentinel { .. }) {
                    tracing::debug!(target: "themer::loader", path = raw, "malformed theme path");
                }
                return Err(ThemeError::not_found(raw));
            }
        };

        let Some(theme) = self.registry.lookup(theme_name) else {
            tracing::debug!(target: "themer::loader", theme = theme_name, "unknown theme");
            return Err(ThemeError::not_found(raw));
        };

        tracing::trace!(target: "themer::loader", theme = theme_name, template = path, "loading themed template");
        theme.load_template(path)
    }
}
