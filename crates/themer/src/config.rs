//! Themer configuration.
//!
//! Settings are read from the host application's config map. Every key
//! starting with [`CONFIG_PREFIX`] belongs to the themer:
//!
//! | Key | Default | Meaning |
//! |-----|---------|---------|
//! | `THEMER_DEFAULT_DIRECTORY` | `themes` | Themes root, relative to the app root |
//! | `THEMER_URL_PREFIX` | `_theme` | First path segment of static asset URLs |
//! | `THEMER_COLLISION_POLICY` | `last_wins` | `last_wins` or `first_wins` |

use std::path::PathBuf;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;

use crate::app::Config;
use crate::error::Result;
use crate::source::{DirFilter, ThemeSourceProvider};
use crate::theme::CollisionPolicy;

/// Prefix for all configuration keys.
pub const CONFIG_PREFIX: &str = "THEMER_";

/// Default themes root, relative to the application root.
pub const DEFAULT_DIRECTORY: &str = "themes";

/// Default first path segment of static asset URLs.
pub const DEFAULT_URL_PREFIX: &str = "_theme";

/// Settings read from the application config.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ThemerConfig {
    pub default_directory: PathBuf,
    pub url_prefix: String,
    pub collision_policy: CollisionPolicy,
}

impl Default for ThemerConfig {
    fn default() -> Self {
        Self {
            default_directory: PathBuf::from(DEFAULT_DIRECTORY),
            url_prefix: DEFAULT_URL_PREFIX.to_string(),
            collision_policy: CollisionPolicy::default(),
        }
    }
}

impl ThemerConfig {
    /// Reads the `THEMER_*` keys of `config`.
    ///
    /// `THEMER_DEFAULT_DIRECTORY` is written back with its default when
    /// absent, so the effective value is visible in the app config.
    ///
    /// # Errors
    ///
    /// Returns [`ThemeError::Config`](crate::ThemeError::Config) if a value
    /// has the wrong type.
    pub fn from_app_config(config: &mut Config) -> Result<Self> {
        config.set_default(format!("{CONFIG_PREFIX}DEFAULT_DIRECTORY"), DEFAULT_DIRECTORY);
        let values = config.with_prefix(CONFIG_PREFIX);
        Ok(serde_json::from_value(Value::Object(values))?)
    }
}

/// Programmatic options passed to [`Themer::new`](crate::Themer::new).
#[derive(Clone, Default)]
pub struct ThemerOptions {
    pub(crate) providers: Option<Vec<Arc<dyn ThemeSourceProvider>>>,
    pub(crate) filter: Option<DirFilter>,
}

impl ThemerOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a provider. Once any provider is given, the default filesystem
    /// provider is not created.
    pub fn provider<P>(mut self, provider: P) -> Self
    where
        P: ThemeSourceProvider + 'static,
    {
        self.providers
            .get_or_insert_with(Vec::new)
            .push(Arc::new(provider));
        self
    }

    /// Replaces the provider list. An empty list means "no themes", not
    /// "use the default provider".
    pub fn providers(mut self, providers: Vec<Arc<dyn ThemeSourceProvider>>) -> Self {
        self.providers = Some(providers);
        self
    }

    /// Filter applied by the default filesystem provider to candidate theme
    /// directories.
    pub fn filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&std::path::Path) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Arc::new(filter));
        self
    }
}

impl std::fmt::Debug for ThemerOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThemerOptions")
            .field("providers", &self.providers)
            .field("filtered", &self.filter.is_some())
            .finish()
    }
}
