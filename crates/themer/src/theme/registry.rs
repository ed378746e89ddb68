//! Theme registry.
//!
//! The registry maps theme names to [`Theme`]s. It is populated once at
//! startup and then only read, so it is stored as an immutable snapshot
//! behind an [`ArcSwap`]: readers grab the current snapshot without
//! locking, and every write publishes a complete new mapping. A reload can
//! therefore never be observed half-applied.

use std::collections::HashMap;
use std::sync::Arc;

use arc_swap::ArcSwap;
use serde::Deserialize;

use super::Theme;
use crate::sentinel::SEPARATOR;

/// Snapshot type stored by the registry.
pub type ThemeMap = HashMap<String, Arc<Theme>>;

/// Which theme is kept when two providers report the same name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollisionPolicy {
    /// The theme reported later overwrites the earlier one.
    #[default]
    LastWins,
    /// The first theme reported under a name is kept.
    FirstWins,
}

/// Name → theme mapping shared between the loader, the static route and the
/// public API.
pub struct ThemeRegistry {
    snapshot: ArcSwap<ThemeMap>,
}

impl ThemeRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            snapshot: ArcSwap::from_pointee(ThemeMap::new()),
        }
    }

    /// Inserts a theme, overwriting any theme with the same name.
    ///
    /// Returns false, and leaves the registry untouched, if the name could
    /// never be resolved from a sentinel path (empty or containing `/`).
    pub fn register(&self, theme: Theme) -> bool {
        if !accepts_name(theme.name()) {
            return false;
        }
        let theme = Arc::new(theme);
        self.snapshot.rcu(|current| {
            let mut next = ThemeMap::clone(current);
            next.insert(theme.name().to_string(), theme.clone());
            next
        });
        true
    }

    /// Replaces the whole mapping in one atomic swap.
    ///
    /// Themes are applied in iteration order; `policy` decides the winner on
    /// a name collision. Returns the number of distinct themes.
    pub fn replace_all<I>(&self, themes: I, policy: CollisionPolicy) -> usize
    where
        I: IntoIterator<Item = Theme>,
    {
        let mut next = ThemeMap::new();
        for theme in themes {
            let name = theme.name().to_string();
            if !accepts_name(&name) {
                continue;
            }
            if policy == CollisionPolicy::FirstWins && next.contains_key(&name) {
                tracing::debug!(target: "themer::registry", theme = %name, "keeping first theme on name collision");
                continue;
            }
            if next.insert(name.clone(), Arc::new(theme)).is_some() {
                tracing::debug!(target: "themer::registry", theme = %name, "theme overwritten on name collision");
            }
        }
        let count = next.len();
        self.snapshot.store(Arc::new(next));
        count
    }

    pub fn lookup(&self, name: &str) -> Option<Arc<Theme>> {
        self.snapshot.load().get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.snapshot.load().contains_key(name)
    }

    /// Returns every registered theme, in no particular order.
    pub fn all(&self) -> Vec<Arc<Theme>> {
        self.snapshot.load().values().cloned().collect()
    }

    /// Returns the registered theme names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.snapshot.load().keys().cloned().collect();
        names.sort();
        names
    }

    /// Returns the current snapshot.
    pub fn snapshot(&self) -> Arc<ThemeMap> {
        self.snapshot.load_full()
    }

    pub fn len(&self) -> usize {
        self.snapshot.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot.load().is_empty()
    }
}

/// Theme names travel as one sentinel path segment.
fn accepts_name(name: &str) -> bool {
    if name.is_empty() || name.contains(SEPARATOR) {
        tracing::warn!(target: "themer::registry", theme = name, "skipping theme whose name is not a single path segment");
        return false;
    }
    true
}

impl Default for ThemeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ThemeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThemeRegistry")
            .field("themes", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{InlineAssets, InlineTemplates};

    fn theme(name: &str, marker: &str) -> Theme {
        let mut templates = InlineTemplates::new();
        templates.add("marker", marker);
        Theme::new(name, Arc::new(templates), Arc::new(InlineAssets::new()))
    }

    fn marker(registry: &ThemeRegistry, name: &str) -> String {
        registry.lookup(name).unwrap().load_template("marker").unwrap()
    }

    #[test]
    fn test_register_and_lookup() {
        let registry = ThemeRegistry::new();
        assert!(registry.is_empty());

        registry.register(theme("dark", "d"));
        assert_eq!(registry.len(), 1);
        assert!(registry.contains("dark"));
        assert_eq!(marker(&registry, "dark"), "d");
        assert!(registry.lookup("light").is_none());
    }

    #[test]
    fn test_register_overwrites() {
        let registry = ThemeRegistry::new();
        registry.register(theme("dark", "first"));
        registry.register(theme("dark", "second"));

        assert_eq!(registry.len(), 1);
        assert_eq!(marker(&registry, "dark"), "second");
    }

    #[test]
    fn test_replace_all_last_wins() {
        let registry = ThemeRegistry::new();
        let count = registry.replace_all(
            vec![theme("dark", "first"), theme("dark", "second"), theme("light", "l")],
            CollisionPolicy::LastWins,
        );

        assert_eq!(count, 2);
        assert_eq!(marker(&registry, "dark"), "second");
    }

    #[test]
    fn test_replace_all_first_wins() {
        let registry = ThemeRegistry::new();
        registry.replace_all(
            vec![theme("dark", "first"), theme("dark", "second")],
            CollisionPolicy::FirstWins,
        );

        assert_eq!(marker(&registry, "dark"), "first");
    }

    #[test]
    fn test_replace_all_drops_previous_entries() {
        let registry = ThemeRegistry::new();
        registry.register(theme("old", "o"));
        registry.replace_all(vec![theme("new", "n")], CollisionPolicy::LastWins);

        assert_eq!(registry.names(), vec!["new".to_string()]);
    }

    #[test]
    fn test_snapshot_is_unaffected_by_later_writes() {
        let registry = ThemeRegistry::new();
        registry.register(theme("dark", "d"));
        let before = registry.snapshot();

        registry.replace_all(Vec::new(), CollisionPolicy::LastWins);

        assert!(before.contains_key("dark"));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_unresolvable_names_are_skipped() {
        let registry = ThemeRegistry::new();
        assert!(!registry.register(theme("a/b", "x")));
        assert!(!registry.register(theme("", "x")));
        assert!(registry.is_empty());

        let count = registry.replace_all(
            vec![theme("nested/dark", "n"), theme("dark", "d")],
            CollisionPolicy::LastWins,
        );
        assert_eq!(count, 1);
        assert_eq!(registry.names(), vec!["dark".to_string()]);
    }

    #[test]
    fn test_names_sorted_and_all() {
        let registry = ThemeRegistry::new();
        registry.register(theme("zeta", "z"));
        registry.register(theme("alpha", "a"));

        assert_eq!(registry.names(), vec!["alpha".to_string(), "zeta".to_string()]);
        assert_eq!(registry.all().len(), 2);
    }

    #[test]
    fn test_collision_policy_deserializes() {
        let policy: CollisionPolicy = serde_json::from_str("\"first_wins\"").unwrap();
        assert_eq!(policy, CollisionPolicy::FirstWins);
        assert_eq!(CollisionPolicy::default(), CollisionPolicy::LastWins);
    }
}
