//! The themer extension and its public entry points.
//!
//! [`Themer`] owns the theme registry and the ambient resolver, and wires
//! both into an [`App`]:
//!
//! - a `theme(path)` template global returning the sentinel path of `path`
//!   in the active theme, for use in `{% extends %}` and `{% include %}`
//! - a `theme_static(path, **params)` template global returning the URL of a
//!   static asset of the active theme
//! - a [`ThemeTemplateLoader`] in the template loader chain
//! - the static asset URL rule (see [`crate::assets`])
//!
//! Rendering goes through [`render_template`], which tries the active
//! theme first and falls back to the application's own templates.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use themer::{app::App, render_template, use_theme, Themer, ThemerOptions};
//!
//! let mut app = App::new("/srv/site");
//! let themer = Themer::new(ThemerOptions::new());
//! themer.init_app(&mut app)?;
//! themer.set_resolver(|_ctx| Ok("default".to_string()));
//!
//! let app = Arc::new(app);
//! let ctx = app.app_context();
//! let page = render_template(&ctx, "index.html", &serde_json::json!({}))?;
//!
//! let _preview = use_theme(&ctx, "dark")?;
//! let preview = render_template(&ctx, "index.html", &serde_json::json!({}))?;
//! ```

use std::sync::Arc;

use minijinja::value::{Kwargs, Value};
use minijinja::ErrorKind;
use parking_lot::RwLock;
use serde::Serialize;

use crate::active::{ActiveThemeResolver, ThemeOverride};
use crate::app::{App, AppContext, TemplateCache};
use crate::assets::{serve_static, static_pattern, STATIC_ENDPOINT};
use crate::config::{ThemerConfig, ThemerOptions};
use crate::error::{Result, ThemeError};
use crate::loader::ThemeTemplateLoader;
use crate::sentinel::{to_sentinel, MAGIC_PATH_PREFIX};
use crate::source::{FileSystemProvider, ThemeSourceProvider};
use crate::theme::{Theme, ThemeRegistry};

/// Key under which the themer is attached to the app's extensions.
pub const EXTENSION_KEY: &str = "themer";

/// Priority of the themed loader in the template loader chain. It runs
/// after the app's own folder, which never matches sentinel paths anyway.
pub const LOADER_PRIORITY: i32 = 100;

/// Theme support for an [`App`].
pub struct Themer {
    options: ThemerOptions,
    providers: RwLock<Vec<Arc<dyn ThemeSourceProvider>>>,
    registry: Arc<ThemeRegistry>,
    active: ActiveThemeResolver,
    config: RwLock<ThemerConfig>,
    cache: RwLock<Option<TemplateCache>>,
}

impl Themer {
    /// Creates a themer. Nothing is loaded until [`init_app`](Self::init_app).
    pub fn new(options: ThemerOptions) -> Arc<Self> {
        Arc::new(Self {
            providers: RwLock::new(options.providers.clone().unwrap_or_default()),
            options,
            registry: Arc::new(ThemeRegistry::new()),
            active: ActiveThemeResolver::new(),
            config: RwLock::new(ThemerConfig::default()),
            cache: RwLock::new(None),
        })
    }

    /// Attaches the themer to `app` and loads the themes.
    ///
    /// Without explicit providers, themes are read from
    /// `<app root>/<THEMER_DEFAULT_DIRECTORY>`.
    ///
    /// # Errors
    ///
    /// Fails on invalid `THEMER_*` configuration or if a provider fails to
    /// enumerate its themes.
    pub fn init_app(self: &Arc<Self>, app: &mut App) -> Result<()> {
        let config = ThemerConfig::from_app_config(app.config_mut())?;

        if self.options.providers.is_none() {
            let mut provider = FileSystemProvider::new(app.root_path().join(&config.default_directory));
            if let Some(filter) = &self.options.filter {
                provider = provider.with_shared_filter(Arc::clone(filter));
            }
            *self.providers.write() = vec![Arc::new(provider)];
        }

        app.insert_extension(EXTENSION_KEY, Arc::clone(self));
        app.add_template_global("theme", Value::from_function(theme_global));
        app.add_template_global("theme_static", Value::from_function(theme_static_global));
        app.add_template_source(
            MAGIC_PATH_PREFIX,
            LOADER_PRIORITY,
            Arc::new(ThemeTemplateLoader::new(Arc::clone(&self.registry))),
        );

        let registry = Arc::clone(&self.registry);
        app.add_url_rule(static_pattern(&config.url_prefix), STATIC_ENDPOINT, move |_, params| {
            serve_static(&registry, params)
        });

        *self.config.write() = config;
        *self.cache.write() = Some(app.template_cache());
        self.reload()?;
        Ok(())
    }

    /// Re-enumerates every provider and atomically replaces the registry
    /// contents. Returns the number of themes loaded.
    ///
    /// Templates the app already compiled are dropped, so removed themes
    /// stop resolving and changed templates are read again.
    pub fn reload(&self) -> Result<usize> {
        let providers = self.providers.read().clone();
        let policy = self.config.read().collision_policy;

        let mut themes: Vec<Theme> = Vec::new();
        for provider in &providers {
            themes.extend(provider.themes()?);
        }

        let count = self.registry.replace_all(themes, policy);
        if let Some(cache) = &*self.cache.read() {
            cache.clear();
        }
        tracing::debug!(target: "themer", count, providers = providers.len(), "themes loaded");
        Ok(count)
    }

    /// Registers the ambient resolver used when no override is active.
    ///
    /// ```rust,ignore
    /// themer.set_resolver(|ctx| {
    ///     ctx.with_local(|user: &mut CurrentUser| Ok(user.theme.clone()))
    /// });
    /// ```
    pub fn set_resolver<F>(&self, resolver: F)
    where
        F: Fn(&AppContext) -> Result<String> + Send + Sync + 'static,
    {
        self.active.set_resolver(resolver);
    }

    /// The active theme name for `ctx`.
    pub fn current_theme(&self, ctx: &AppContext) -> Result<String> {
        self.active.current(ctx)
    }

    /// Looks up a loaded theme.
    pub fn theme(&self, name: &str) -> Option<Arc<Theme>> {
        self.registry.lookup(name)
    }

    /// Every loaded theme.
    pub fn themes(&self) -> Vec<Arc<Theme>> {
        self.registry.all()
    }

    pub fn registry(&self) -> &Arc<ThemeRegistry> {
        &self.registry
    }

    pub fn providers(&self) -> Vec<Arc<dyn ThemeSourceProvider>> {
        self.providers.read().clone()
    }

    /// The effective configuration. Defaults until `init_app` has run.
    pub fn config(&self) -> ThemerConfig {
        self.config.read().clone()
    }
}

impl std::fmt::Debug for Themer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Themer")
            .field("registry", &self.registry)
            .field("active", &self.active)
            .field("config", &*self.config.read())
            .finish_non_exhaustive()
    }
}

/// Returns the themer attached to the context's app.
///
/// # Errors
///
/// [`ThemeError::ThemerNotInitialized`] if [`Themer::init_app`] was never
/// called for this app.
pub fn current_themer(ctx: &AppContext) -> Result<Arc<Themer>> {
    ctx.app()
        .extension::<Themer>(EXTENSION_KEY)
        .ok_or(ThemeError::ThemerNotInitialized)
}

/// Returns the sentinel path of `path` in the active theme.
pub fn lookup_theme_path(ctx: &AppContext, path: &str) -> Result<String> {
    let themer = current_themer(ctx)?;
    let theme = themer.current_theme(ctx)?;
    Ok(to_sentinel(&theme, path))
}

/// Returns the URL of the static asset `path` in the active theme.
///
/// `extra` parameters are passed through to URL building and end up in the
/// query string.
pub fn lookup_static_theme_path(ctx: &AppContext, path: &str, extra: &[(&str, &str)]) -> Result<String> {
    let themer = current_themer(ctx)?;
    let theme = themer.current_theme(ctx)?;

    let mut params = vec![("theme", theme.as_str()), ("filename", path)];
    params.extend_from_slice(extra);
    ctx.app().url_for(STATIC_ENDPOINT, &params)
}

/// Renders `path` from the active theme, falling back to the app's own
/// templates when the theme does not have it.
///
/// # Errors
///
/// [`ThemeError::NotFound`] if neither the theme nor the app has the
/// template. Resolution errors ([`ThemeError::NoThemeResolver`],
/// [`ThemeError::ThemerNotInitialized`], resolver failures) and render
/// failures are returned without attempting the fallback.
pub fn render_template<T: Serialize>(ctx: &AppContext, path: &str, data: &T) -> Result<String> {
    let themed = lookup_theme_path(ctx, path)?;
    match ctx.app().render_template(ctx, &themed, data) {
        Err(err) if err.is_not_found() => {
            tracing::debug!(target: "themer", template = path, "not in active theme, using default template");
            ctx.app().render_template(ctx, path, data)
        }
        other => other,
    }
}

/// Forces `theme` as the active theme until the returned guard is dropped.
///
/// Overrides nest: the innermost one wins, and dropping it restores the
/// previous state exactly.
pub fn use_theme(ctx: &AppContext, theme: impl Into<String>) -> Result<ThemeOverride> {
    current_themer(ctx)?;
    Ok(ThemeOverride::push(ctx, theme))
}

/// Runs `f` with `theme` forced as the active theme.
pub fn with_theme<R>(ctx: &AppContext, theme: impl Into<String>, f: impl FnOnce() -> R) -> Result<R> {
    let _guard = use_theme(ctx, theme)?;
    Ok(f())
}

fn bound_context() -> std::result::Result<AppContext, minijinja::Error> {
    AppContext::current().ok_or_else(|| {
        minijinja::Error::new(
            ErrorKind::InvalidOperation,
            "theme helpers can only be used while rendering through an app context",
        )
    })
}

fn to_template_error(err: ThemeError) -> minijinja::Error {
    minijinja::Error::new(ErrorKind::InvalidOperation, err.to_string()).with_source(err)
}

fn theme_global(path: String) -> std::result::Result<String, minijinja::Error> {
    let ctx = bound_context()?;
    lookup_theme_path(&ctx, &path).map_err(to_template_error)
}

fn theme_static_global(path: String, kwargs: Kwargs) -> std::result::Result<String, minijinja::Error> {
    let ctx = bound_context()?;
    let mut extra: Vec<(String, String)> = Vec::new();
    for key in kwargs.args() {
        let value: Value = kwargs.get(key)?;
        let value = match value.as_str() {
            Some(s) => s.to_string(),
            None => value.to_string(),
        };
        extra.push((key.to_string(), value));
    }
    let extra: Vec<(&str, &str)> = extra.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
    lookup_static_theme_path(&ctx, &path, &extra).map_err(to_template_error)
}
