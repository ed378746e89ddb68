//! Minimal host application.
//!
//! The theme layer only needs a handful of capabilities from the web
//! application it plugs into:
//!
//! - a prioritized chain of named template sources, tried in order until one
//!   has the requested template ([`App::add_template_source`])
//! - template globals ([`App::add_template_global`])
//! - URL rules with handlers ([`App::add_url_rule`]) and URL building
//!   ([`App::url_for`])
//! - a configuration map and a slot to attach extensions
//!
//! [`App`] provides exactly these on top of a MiniJinja [`Environment`] and
//! the [`http`] types. An app is configured through `&mut self` and then
//! shared behind an [`Arc`]; each unit of work runs in its own
//! [`AppContext`].
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use themer::app::App;
//!
//! let mut app = App::new("/srv/site");
//! app.config_mut().set("SERVER_NAME", "example.org");
//! let app = Arc::new(app);
//!
//! let ctx = app.app_context();
//! let html = app.render_template(&ctx, "index.html", &serde_json::json!({}))?;
//! ```

mod config;
mod context;
pub mod response;
mod routing;

use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use http::{Method, Request, Response};
use minijinja::{Environment, ErrorKind, Value};
use parking_lot::{RwLock, RwLockReadGuard};
use serde::Serialize;

use crate::error::{Result, ThemeError};
use crate::source::{DirTemplateSource, TemplateSource};

pub use config::Config;
pub use context::{AppContext, BoundContext};
pub use routing::{RouteHandler, RouteParams, UrlRule};

/// Name of the application's own template source.
pub const APP_SOURCE: &str = "app";

/// Default template folder, relative to the app root.
pub const DEFAULT_TEMPLATE_FOLDER: &str = "templates";

/// A named entry of the template loader chain.
#[derive(Debug, Clone)]
struct SourceEntry {
    name: String,
    priority: i32,
    source: Arc<dyn TemplateSource>,
}

type LoaderChain = Arc<RwLock<Vec<SourceEntry>>>;

/// The host application.
pub struct App {
    root_path: PathBuf,
    config: Config,
    extensions: HashMap<String, Arc<dyn Any + Send + Sync>>,
    env: Arc<RwLock<Environment<'static>>>,
    globals: HashSet<String>,
    sources: LoaderChain,
    rules: Vec<UrlRule>,
}

impl App {
    /// Creates an app whose own templates live in `<root>/templates`.
    pub fn new(root_path: impl Into<PathBuf>) -> Self {
        Self::with_template_folder(root_path, DEFAULT_TEMPLATE_FOLDER)
    }

    /// Creates an app with a custom template folder, relative to the root
    /// unless absolute.
    pub fn with_template_folder(root_path: impl Into<PathBuf>, folder: impl AsRef<Path>) -> Self {
        let root_path = root_path.into();
        let sources: LoaderChain = Arc::default();

        let mut env = Environment::new();
        let chain = Arc::clone(&sources);
        env.set_loader(move |name| load_from_chain(&chain, name));

        let mut app = Self {
            root_path,
            config: Config::new(),
            extensions: HashMap::new(),
            env: Arc::new(RwLock::new(env)),
            globals: HashSet::new(),
            sources,
            rules: Vec::new(),
        };
        let folder = app.root_path.join(folder);
        app.add_template_source(APP_SOURCE, 0, Arc::new(DirTemplateSource::new(folder)));
        app
    }

    pub fn root_path(&self) -> &Path {
        &self.root_path
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    /// Starts a fresh context for one unit of work.
    pub fn app_context(self: &Arc<Self>) -> AppContext {
        AppContext::new(Arc::clone(self))
    }

    // =========================================================================
    // Extensions
    // =========================================================================

    /// Attaches an extension under `key`, replacing any previous one.
    pub fn insert_extension<T>(&mut self, key: impl Into<String>, extension: Arc<T>)
    where
        T: Any + Send + Sync,
    {
        self.extensions.insert(key.into(), extension);
    }

    /// Returns the extension under `key` if it exists and has type `T`.
    pub fn extension<T>(&self, key: &str) -> Option<Arc<T>>
    where
        T: Any + Send + Sync,
    {
        self.extensions
            .get(key)
            .and_then(|ext| Arc::clone(ext).downcast::<T>().ok())
    }

    // =========================================================================
    // Templates
    // =========================================================================

    /// Adds a source to the template loader chain.
    ///
    /// Sources are tried in ascending `priority`; equal priorities keep
    /// registration order. A source reporting not-found passes the lookup on
    /// to the next one. Registering a name twice replaces the earlier entry.
    pub fn add_template_source(
        &mut self,
        name: impl Into<String>,
        priority: i32,
        source: Arc<dyn TemplateSource>,
    ) {
        let name = name.into();
        let mut chain = self.sources.write();
        chain.retain(|entry| entry.name != name);
        chain.push(SourceEntry {
            name,
            priority,
            source,
        });
        chain.sort_by_key(|entry| entry.priority);
        drop(chain);
        self.env.write().clear_templates();
    }

    /// Names of the template sources, in lookup order.
    pub fn template_sources(&self) -> Vec<String> {
        self.sources.read().iter().map(|e| e.name.clone()).collect()
    }

    /// Exposes a value, typically a function built with
    /// [`Value::from_function`], to every template under `name`.
    ///
    /// Globals that need the calling context can read it through
    /// [`AppContext::current`]; it is bound for the duration of
    /// [`render_template`](Self::render_template).
    pub fn add_template_global(&mut self, name: impl Into<String>, value: Value) {
        let name = name.into();
        self.globals.insert(name.clone());
        self.env.write().add_global(name, value);
    }

    /// Returns true if a global named `name` is registered.
    pub fn has_template_global(&self, name: &str) -> bool {
        self.globals.contains(name)
    }

    /// The underlying MiniJinja environment.
    pub fn environment(&self) -> RwLockReadGuard<'_, Environment<'static>> {
        self.env.read()
    }

    /// A handle that can drop compiled templates after the app is shared.
    pub fn template_cache(&self) -> TemplateCache {
        TemplateCache {
            env: Arc::clone(&self.env),
        }
    }

    /// Renders the template `name` through the loader chain.
    ///
    /// # Errors
    ///
    /// [`ThemeError::NotFound`] if no source has the template, or if a
    /// template it extends or includes is missing. Any other engine failure
    /// as [`ThemeError::Template`].
    pub fn render_template<T: Serialize>(&self, ctx: &AppContext, name: &str, data: &T) -> Result<String> {
        let _bound = ctx.bind();
        let env = self.env.read_recursive();
        let rendered = env
            .get_template(name)
            .and_then(|template| template.render(data));
        rendered.map_err(|err| {
            if err.kind() == ErrorKind::TemplateNotFound {
                tracing::debug!(target: "themer::app", template = name, "template not found: {}", err);
                ThemeError::not_found(name)
            } else {
                ThemeError::Template(err)
            }
        })
    }

    /// Renders a template given as a string, with globals available.
    pub fn render_str<T: Serialize>(&self, ctx: &AppContext, source: &str, data: &T) -> Result<String> {
        let _bound = ctx.bind();
        Ok(self.env.read_recursive().render_str(source, data)?)
    }

    // =========================================================================
    // Routing
    // =========================================================================

    /// Registers a URL rule.
    pub fn add_url_rule<F>(&mut self, pattern: impl Into<String>, endpoint: impl Into<String>, handler: F)
    where
        F: Fn(&AppContext, &RouteParams) -> Response<Vec<u8>> + Send + Sync + 'static,
    {
        self.rules
            .push(UrlRule::new(pattern, endpoint, Arc::new(handler)));
    }

    pub fn url_rules(&self) -> &[UrlRule] {
        &self.rules
    }

    /// Builds the URL for `endpoint`.
    ///
    /// When `SERVER_NAME` is configured the URL is absolute, using
    /// `PREFERRED_URL_SCHEME` (default `http`).
    pub fn url_for(&self, endpoint: &str, params: &[(&str, &str)]) -> Result<String> {
        let rule = self
            .rules
            .iter()
            .find(|rule| rule.endpoint() == endpoint)
            .ok_or_else(|| ThemeError::UnknownEndpoint {
                endpoint: endpoint.to_string(),
            })?;
        let path = rule.build(params)?;

        match self.config.get_str("SERVER_NAME") {
            Some(server) => {
                let scheme = self
                    .config
                    .get_str("PREFERRED_URL_SCHEME")
                    .unwrap_or("http");
                Ok(format!("{scheme}://{server}{path}"))
            }
            None => Ok(path),
        }
    }

    /// Dispatches a request to the first matching rule, in a fresh context.
    ///
    /// Absolute request URIs are matched on their path. Unmatched paths get
    /// a 404; methods other than GET and HEAD get a 405.
    pub fn handle<B>(self: &Arc<Self>, request: &Request<B>) -> Response<Vec<u8>> {
        let path = request.uri().path();
        let Some((rule, params)) = self
            .rules
            .iter()
            .find_map(|rule| rule.matches(path).map(|params| (rule, params)))
        else {
            tracing::debug!(target: "themer::app", path, "no rule matched");
            return response::not_found();
        };

        let method = request.method();
        if method != Method::GET && method != Method::HEAD {
            return response::method_not_allowed();
        }

        let ctx = self.app_context();
        let mut response = (rule.handler())(&ctx, &params);
        if method == Method::HEAD {
            response.body_mut().clear();
        }
        response
    }
}

/// Shared handle on an [`App`]'s compiled template cache.
#[derive(Clone)]
pub struct TemplateCache {
    env: Arc<RwLock<Environment<'static>>>,
}

impl TemplateCache {
    /// Drops every compiled template. The next lookup goes back to the
    /// loader chain.
    pub fn clear(&self) {
        self.env.write().clear_templates();
    }
}

impl std::fmt::Debug for TemplateCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplateCache").finish_non_exhaustive()
    }
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("root_path", &self.root_path)
            .field("template_sources", &self.template_sources())
            .field("rules", &self.rules)
            .finish_non_exhaustive()
    }
}

/// Walks the loader chain for `name`.
fn load_from_chain(chain: &LoaderChain, name: &str) -> std::result::Result<Option<String>, minijinja::Error> {
    let sources: Vec<SourceEntry> = chain.read().clone();
    for entry in &sources {
        match entry.source.load(name) {
            Ok(source) => {
                tracing::trace!(target: "themer::app", template = name, source = %entry.name, "template found");
                return Ok(Some(source));
            }
            Err(err) if err.is_not_found() => continue,
            Err(err) => {
                return Err(minijinja::Error::new(
                    ErrorKind::InvalidOperation,
                    format!("template source \"{}\" failed", entry.name),
                )
                .with_source(err));
            }
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::InlineTemplates;
    use http::StatusCode;
    use serde_json::json;

    fn inline(pairs: &[(&str, &str)]) -> Arc<InlineTemplates> {
        let mut templates = InlineTemplates::new();
        for (name, source) in pairs {
            templates.add(*name, *source);
        }
        Arc::new(templates)
    }

    fn app() -> App {
        let mut app = App::new("/nonexistent-themer-root");
        app.add_template_source("inline", 10, inline(&[("hello.html", "Hello {{ name }}")]));
        app
    }

    // =========================================================================
    // Loader chain
    // =========================================================================

    #[test]
    fn test_render_from_chain() {
        let app = Arc::new(app());
        let ctx = app.app_context();
        let out = app
            .render_template(&ctx, "hello.html", &json!({"name": "World"}))
            .unwrap();
        assert_eq!(out, "Hello World");
    }

    #[test]
    fn test_render_missing_is_not_found() {
        let app = Arc::new(app());
        let ctx = app.app_context();
        let err = app.render_template(&ctx, "missing.html", &()).unwrap_err();
        assert!(matches!(err, ThemeError::NotFound { ref name } if name == "missing.html"));
    }

    #[test]
    fn test_render_missing_include_is_not_found() {
        let mut app = app();
        app.add_template_source(
            "partials",
            20,
            inline(&[
                ("page.html", "page {% include 'missing_part.html' %}"),
                ("child.html", "{% extends 'missing_base.html' %}"),
            ]),
        );
        let app = Arc::new(app);
        let ctx = app.app_context();

        let err = app.render_template(&ctx, "page.html", &()).unwrap_err();
        assert!(matches!(err, ThemeError::NotFound { ref name } if name == "page.html"));

        let err = app.render_template(&ctx, "child.html", &()).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_template_cache_clear_reloads_sources() {
        let mut app = app();
        app.add_template_source("inline", 10, inline(&[("hello.html", "v1")]));
        let cache = app.template_cache();
        let app = Arc::new(app);
        let ctx = app.app_context();
        assert_eq!(app.render_template(&ctx, "hello.html", &()).unwrap(), "v1");

        // Compiled templates outlive changes to their source.
        let replacement: Arc<dyn TemplateSource> = inline(&[("hello.html", "v2")]);
        for entry in app.sources.write().iter_mut() {
            if entry.name == "inline" {
                entry.source = Arc::clone(&replacement);
            }
        }
        assert_eq!(app.render_template(&ctx, "hello.html", &()).unwrap(), "v1");

        cache.clear();
        assert_eq!(app.render_template(&ctx, "hello.html", &()).unwrap(), "v2");
    }

    #[test]
    fn test_chain_priority_order() {
        let mut app = app();
        app.add_template_source("first", -5, inline(&[("hello.html", "from first")]));
        assert_eq!(app.template_sources(), vec!["first", "app", "inline"]);

        let app = Arc::new(app);
        let ctx = app.app_context();
        assert_eq!(app.render_template(&ctx, "hello.html", &()).unwrap(), "from first");
    }

    #[test]
    fn test_chain_replaces_same_name() {
        let mut app = app();
        app.add_template_source("inline", 10, inline(&[("hello.html", "replaced")]));
        assert_eq!(app.template_sources(), vec!["app", "inline"]);
    }

    #[test]
    fn test_render_syntax_error_is_template_error() {
        let mut app = app();
        app.add_template_source("broken", 20, inline(&[("broken.html", "{{ unclosed")]));
        let app = Arc::new(app);
        let ctx = app.app_context();
        let err = app.render_template(&ctx, "broken.html", &()).unwrap_err();
        assert!(matches!(err, ThemeError::Template(_)));
    }

    #[test]
    fn test_globals_see_bound_context() {
        let mut app = app();
        app.add_template_global(
            "has_context",
            Value::from_function(|| AppContext::current().is_some()),
        );
        assert!(app.has_template_global("has_context"));

        let app = Arc::new(app);
        let ctx = app.app_context();
        assert_eq!(app.render_str(&ctx, "{{ has_context() }}", &()).unwrap(), "true");
        assert!(AppContext::current().is_none());
    }

    // =========================================================================
    // Extensions
    // =========================================================================

    #[test]
    fn test_extension_roundtrip_and_type_check() {
        let mut app = app();
        app.insert_extension("counter", Arc::new(41u32));
        assert_eq!(app.extension::<u32>("counter").as_deref(), Some(&41));
        assert!(app.extension::<String>("counter").is_none());
        assert!(app.extension::<u32>("other").is_none());
    }

    // =========================================================================
    // Routing
    // =========================================================================

    fn routed_app() -> Arc<App> {
        let mut app = app();
        app.add_url_rule("/echo/<path:rest>", "echo", |_, params| {
            Response::new(params.get("rest").unwrap_or_default().as_bytes().to_vec())
        });
        Arc::new(app)
    }

    #[test]
    fn test_url_for_relative_and_absolute() {
        let mut app = app();
        app.add_url_rule("/echo/<path:rest>", "echo", |_, _| response::not_found());
        assert_eq!(app.url_for("echo", &[("rest", "a/b")]).unwrap(), "/echo/a/b");

        app.config_mut().set("SERVER_NAME", "testing");
        assert_eq!(
            app.url_for("echo", &[("rest", "a/b")]).unwrap(),
            "http://testing/echo/a/b"
        );

        app.config_mut().set("PREFERRED_URL_SCHEME", "https");
        assert_eq!(
            app.url_for("echo", &[("rest", "a")]).unwrap(),
            "https://testing/echo/a"
        );
    }

    #[test]
    fn test_url_for_unknown_endpoint() {
        let err = app().url_for("nope", &[]).unwrap_err();
        assert!(matches!(err, ThemeError::UnknownEndpoint { .. }));
    }

    #[test]
    fn test_handle_dispatch() {
        let app = routed_app();
        let request = Request::get("http://testing/echo/x/y").body(()).unwrap();
        let response = app.handle(&request);
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.body(), b"x/y");
    }

    #[test]
    fn test_handle_unmatched_is_404() {
        let app = routed_app();
        let request = Request::get("/elsewhere").body(()).unwrap();
        assert_eq!(app.handle(&request).status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_handle_post_is_405() {
        let app = routed_app();
        let request = Request::post("/echo/x").body(()).unwrap();
        assert_eq!(app.handle(&request).status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[test]
    fn test_handle_head_has_empty_body() {
        let app = routed_app();
        let request = Request::head("/echo/x").body(()).unwrap();
        let response = app.handle(&request);
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.body().is_empty());
    }
}
