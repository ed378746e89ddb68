//! URL rules: matching request paths and building URLs.
//!
//! Patterns are slash-separated. A segment is either literal text, a
//! `<name>` placeholder matching exactly one segment, or a `<path:name>`
//! placeholder matching the remainder of the path (separators included).
//!
//! ```text
//! /_theme/<theme>/<path:filename>
//! ```

use std::borrow::Cow;
use std::sync::Arc;

use http::Response;

use super::context::AppContext;
use crate::error::{Result, ThemeError};

/// Handler invoked for a matched rule.
pub type RouteHandler = Arc<dyn Fn(&AppContext, &RouteParams) -> Response<Vec<u8>> + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
    Path(String),
}

impl Segment {
    fn parse(raw: &str) -> Segment {
        let Some(inner) = raw.strip_prefix('<').and_then(|r| r.strip_suffix('>')) else {
            return Segment::Literal(raw.to_string());
        };
        match inner.split_once(':') {
            Some(("path", name)) => Segment::Path(name.to_string()),
            Some((_, name)) => Segment::Param(name.to_string()),
            None => Segment::Param(inner.to_string()),
        }
    }
}

/// Parameters captured from a matched URL, already percent-decoded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteParams {
    values: Vec<(String, String)>,
}

impl RouteParams {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    fn push(&mut self, name: &str, value: String) {
        self.values.push((name.to_string(), value));
    }
}

/// A URL pattern bound to an endpoint name and a handler.
#[derive(Clone)]
pub struct UrlRule {
    pattern: String,
    endpoint: String,
    segments: Vec<Segment>,
    handler: RouteHandler,
}

impl UrlRule {
    pub fn new(pattern: impl Into<String>, endpoint: impl Into<String>, handler: RouteHandler) -> Self {
        let pattern = pattern.into();
        let segments = pattern
            .trim_start_matches('/')
            .split('/')
            .filter(|s| !s.is_empty())
            .map(Segment::parse)
            .collect();
        Self {
            pattern,
            endpoint: endpoint.into(),
            segments,
            handler,
        }
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn handler(&self) -> &RouteHandler {
        &self.handler
    }

    /// Matches a request path, returning the captured parameters.
    pub fn matches(&self, path: &str) -> Option<RouteParams> {
        let parts: Vec<&str> = path.trim_start_matches('/').split('/').collect();
        let mut params = RouteParams::default();
        let mut idx = 0;

        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => {
                    if parts.get(idx) != Some(&text.as_str()) {
                        return None;
                    }
                    idx += 1;
                }
                Segment::Param(name) => {
                    let part = parts.get(idx).filter(|p| !p.is_empty())?;
                    params.push(name, decode(part)?);
                    idx += 1;
                }
                Segment::Path(name) => {
                    let rest = parts.get(idx..).filter(|r| !r.is_empty())?;
                    let decoded: Option<Vec<String>> = rest.iter().map(|p| decode(p)).collect();
                    let joined = decoded?.join("/");
                    if joined.is_empty() {
                        return None;
                    }
                    params.push(name, joined);
                    idx = parts.len();
                }
            }
        }

        (idx == parts.len()).then_some(params)
    }

    /// Builds the path for this rule.
    ///
    /// Placeholders are filled from `params` and percent-encoded (`path`
    /// placeholders keep their `/` separators). Parameters that fill no
    /// placeholder are appended as a query string, in the order given.
    pub fn build(&self, params: &[(&str, &str)]) -> Result<String> {
        let mut used = vec![false; params.len()];
        let mut url = String::new();

        for segment in &self.segments {
            url.push('/');
            match segment {
                Segment::Literal(text) => url.push_str(text),
                Segment::Param(name) | Segment::Path(name) => {
                    let idx = params
                        .iter()
                        .position(|(key, _)| key == name)
                        .ok_or_else(|| ThemeError::MissingUrlParam {
                            endpoint: self.endpoint.clone(),
                            param: name.clone(),
                        })?;
                    used[idx] = true;
                    let value = params[idx].1;
                    if matches!(segment, Segment::Path(_)) {
                        let encoded: Vec<Cow<'_, str>> =
                            value.split('/').map(urlencoding::encode).collect();
                        url.push_str(&encoded.join("/"));
                    } else {
                        url.push_str(&urlencoding::encode(value));
                    }
                }
            }
        }
        if url.is_empty() {
            url.push('/');
        }

        let query: Vec<String> = params
            .iter()
            .zip(&used)
            .filter(|(_, used)| !**used)
            .map(|((key, value), _)| {
                format!("{}={}", urlencoding::encode(key), urlencoding::encode(value))
            })
            .collect();
        if !query.is_empty() {
            url.push('?');
            url.push_str(&query.join("&"));
        }

        Ok(url)
    }
}

impl std::fmt::Debug for UrlRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UrlRule")
            .field("pattern", &self.pattern)
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

fn decode(part: &str) -> Option<String> {
    urlencoding::decode(part).ok().map(Cow::into_owned)
}
