//! Application configuration map.

use serde_json::{Map, Value};

/// Flat `KEY → value` configuration of an [`App`](super::App).
///
/// Keys are conventionally upper case and namespaced by a prefix, e.g.
/// `THEMER_DEFAULT_DIRECTORY`.
#[derive(Debug, Clone, Default)]
pub struct Config {
    values: Map<String, Value>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Returns the value under `key` if it is a string.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.values.get(key).and_then(Value::as_str)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(key.into(), value.into());
    }

    /// Stores `value` under `key` unless a value is already present, and
    /// returns whatever is stored afterwards.
    pub fn set_default(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &Value {
        self.values.entry(key.into()).or_insert_with(|| value.into())
    }

    /// Collects every key starting with `prefix` into a new map, with the
    /// prefix stripped and the remainder lowercased.
    ///
    /// # Example
    ///
    /// ```rust
    /// use themer::app::Config;
    ///
    /// let mut config = Config::new();
    /// config.set("THEMER_URL_PREFIX", "themes");
    /// config.set("SERVER_NAME", "example.org");
    ///
    /// let themer = config.with_prefix("THEMER_");
    /// assert_eq!(themer.get("url_prefix").and_then(|v| v.as_str()), Some("themes"));
    /// assert_eq!(themer.len(), 1);
    /// ```
    pub fn with_prefix(&self, prefix: &str) -> Map<String, Value> {
        self.values
            .iter()
            .filter_map(|(key, value)| {
                key.strip_prefix(prefix)
                    .map(|rest| (rest.to_lowercase(), value.clone()))
            })
            .collect()
    }
}
