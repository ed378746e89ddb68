//! # Themer - theme-aware template and static asset resolution
//!
//! Themer lets an application ship a default set of templates and have any
//! number of *themes* override some of them, each with its own static
//! assets. The active theme is decided per request.
//!
//! ## How resolution works
//!
//! 1. [`render_template`]`(ctx, "page.html", data)` asks for the active theme
//!    (an explicit override if one is in scope, otherwise the resolver
//!    registered with [`Themer::set_resolver`]).
//! 2. The path is rewritten to a sentinel path, `☃/<theme>/page.html`
//!    (see [`sentinel`]), and rendered through the app's template loader
//!    chain.
//! 3. The [`ThemeTemplateLoader`] in that chain recognizes the sentinel,
//!    finds the theme in the [`ThemeRegistry`] and loads `page.html` from it.
//! 4. If the theme does not have the template, the plain `page.html` is
//!    rendered from the app's own templates instead.
//!
//! Static assets are served from `/<prefix>/<theme>/<path>`; templates build
//! those URLs with `theme_static("app.css")`.
//!
//! ## Quick start
//!
//! ```rust
//! use std::sync::Arc;
//! use themer::app::App;
//! use themer::{render_template, use_theme, MemoryProvider, MemoryTheme, Themer, ThemerOptions};
//!
//! let themer = Themer::new(
//!     ThemerOptions::new().provider(
//!         MemoryProvider::new()
//!             .with_theme(MemoryTheme::new("plain").template("hello.html", "Hello, {{ name }}."))
//!             .with_theme(MemoryTheme::new("loud").template("hello.html", "HELLO, {{ name | upper }}!")),
//!     ),
//! );
//!
//! let mut app = App::new("/srv/site");
//! themer.init_app(&mut app).unwrap();
//! themer.set_resolver(|_ctx| Ok("plain".to_string()));
//!
//! let app = Arc::new(app);
//! let ctx = app.app_context();
//! let data = serde_json::json!({ "name": "World" });
//!
//! assert_eq!(render_template(&ctx, "hello.html", &data).unwrap(), "Hello, World.");
//!
//! let _loud = use_theme(&ctx, "loud").unwrap();
//! assert_eq!(render_template(&ctx, "hello.html", &data).unwrap(), "HELLO, WORLD!");
//! ```
//!
//! ## Theme sources
//!
//! By default themes are the sub-directories of `<app root>/themes`
//! ([`FileSystemProvider`]). Any [`ThemeSourceProvider`] can be supplied
//! instead through [`ThemerOptions`].
//!
//! ## Isolation
//!
//! All per-request state (the override stack) lives in the [`AppContext`];
//! the registry is shared read-mostly and replaced atomically on
//! [`Themer::reload`].

pub mod active;
pub mod app;
pub mod assets;
pub mod config;
mod error;
pub mod loader;
pub mod sentinel;
pub mod source;
pub mod theme;
#[allow(clippy::module_inception)]
mod themer;

pub use active::{ActiveThemeResolver, OverrideStack, ThemeOverride, ThemeResolverFn};
pub use app::{App, AppContext};
pub use assets::STATIC_ENDPOINT;
pub use config::{ThemerConfig, ThemerOptions, CONFIG_PREFIX};
pub use error::{Result, ThemeError};
pub use loader::ThemeTemplateLoader;
pub use sentinel::MAGIC_PATH_PREFIX;
pub use source::{
    AssetSource, DirTemplateSource, FileSystemProvider, InlineAssets, InlineTemplates,
    MemoryProvider, MemoryTheme, StaticDir, TemplateSource, ThemeSourceProvider,
};
pub use theme::{CollisionPolicy, Theme, ThemeRegistry};
pub use themer::{
    current_themer, lookup_static_theme_path, lookup_theme_path, render_template, use_theme,
    with_theme, Themer, EXTENSION_KEY,
};
