//! Serving theme static assets.
//!
//! The themer mounts one URL rule:
//!
//! ```text
//! GET /<url_prefix>/<theme>/<path:filename>
//! ```
//!
//! An unknown theme and a missing file both produce a plain 404 response;
//! neither is surfaced as an error.

use std::sync::Arc;

use http::Response;

use crate::app::{response, RouteParams};
use crate::theme::ThemeRegistry;

/// Endpoint name of the static asset rule, used with
/// [`App::url_for`](crate::app::App::url_for). Namespaced by the sentinel
/// prefix.
pub const STATIC_ENDPOINT: &str = "\u{2603}.static";

/// Builds the URL pattern for the static asset rule.
pub fn static_pattern(url_prefix: &str) -> String {
    format!("/{}/<theme>/<path:filename>", url_prefix.trim_matches('/'))
}

/// Serves `filename` from `theme`'s assets.
pub fn serve_static(registry: &Arc<ThemeRegistry>, params: &RouteParams) -> Response<Vec<u8>> {
    let (Some(theme_name), Some(filename)) = (params.get("theme"), params.get("filename")) else {
        return response::not_found();
    };

    let Some(theme) = registry.lookup(theme_name) else {
        tracing::debug!(target: "themer::assets", theme = theme_name, "static asset requested from unknown theme");
        return response::not_found();
    };

    match theme.fetch_asset(filename) {
        Ok(bytes) => response::file(filename, bytes),
        Err(err) if err.is_not_found() => {
            tracing::debug!(target: "themer::assets", theme = theme_name, filename, "static asset not found");
            response::not_found()
        }
        Err(err) => {
            tracing::warn!(target: "themer::assets", theme = theme_name, filename, "failed to read static asset: {}", err);
            response::internal_error()
        }
    }
}
