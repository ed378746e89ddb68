//! Error types for theme resolution.

use std::path::PathBuf;

/// Errors raised while resolving themes, templates and static assets.
///
/// Only [`ThemeError::NotFound`] and [`ThemeError::MalformedSentinel`] are
/// recoverable: they drive the fallback from themed to default template
/// resolution. Everything else is surfaced to the caller unchanged.
#[derive(Debug, thiserror::Error)]
pub enum ThemeError {
    /// A template or asset is absent from the source that was asked.
    #[error("not found: \"{name}\"")]
    NotFound { name: String },

    /// No ambient resolver is registered and no override is active.
    #[error("no current theme resolver is registered, set one using Themer::set_resolver")]
    NoThemeResolver,

    /// The themer was never attached to the running application.
    #[error("trying to use an uninitialized Themer, make sure you call Themer::init_app")]
    ThemerNotInitialized,

    /// A sentinel path without a theme/path separator.
    #[error("malformed theme path: \"{path}\"")]
    MalformedSentinel { path: String },

    /// Raised by a user-supplied theme resolver.
    #[error("theme resolver failed: {message}")]
    Resolver { message: String },

    /// The template engine failed for a reason other than a missing template.
    #[error(transparent)]
    Template(#[from] minijinja::Error),

    #[error("failed to read \"{}\": {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A theme's metadata file could not be parsed.
    #[error("invalid theme metadata in \"{}\": {message}", path.display())]
    Metadata { path: PathBuf, message: String },

    #[error("no route registered for endpoint \"{endpoint}\"")]
    UnknownEndpoint { endpoint: String },

    #[error("endpoint \"{endpoint}\" requires parameter \"{param}\"")]
    MissingUrlParam { endpoint: String, param: String },

    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
}

impl ThemeError {
    pub fn not_found(name: impl Into<String>) -> Self {
        ThemeError::NotFound { name: name.into() }
    }

    /// Creates the error a custom resolver returns when it cannot decide.
    pub fn resolver(message: impl Into<String>) -> Self {
        ThemeError::Resolver {
            message: message.into(),
        }
    }

    /// Returns true for the recoverable not-found family.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            ThemeError::NotFound { .. } | ThemeError::MalformedSentinel { .. }
        )
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ThemeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_display() {
        let err = ThemeError::not_found("missing.html");
        assert!(err.to_string().contains("missing.html"));
        assert!(err.is_not_found());
    }

    #[test]
    fn test_malformed_sentinel_is_not_found() {
        let err = ThemeError::MalformedSentinel {
            path: "\u{2603}/".to_string(),
        };
        assert!(err.is_not_found());
    }

    #[test]
    fn test_surfaced_errors_are_not_recoverable() {
        assert!(!ThemeError::NoThemeResolver.is_not_found());
        assert!(!ThemeError::ThemerNotInitialized.is_not_found());
        assert!(!ThemeError::resolver("nope").is_not_found());
    }

    #[test]
    fn test_io_error_display_names_path() {
        let err = ThemeError::Io {
            path: PathBuf::from("/themes/dark/static/app.css"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        let msg = err.to_string();
        assert!(msg.contains("/themes/dark/static/app.css"));
        assert!(msg.contains("denied"));
    }
}
