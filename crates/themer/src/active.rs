//! Determining the currently active theme.
//!
//! Two layers decide which theme is active:
//!
//! 1. An explicit override stack, stored in the [`AppContext`]. Its top
//!    always wins. Overrides are only pushed through [`ThemeOverride`],
//!    whose drop pops them again, so the stack stays balanced even when the
//!    scope is left early through `?` or a panic.
//! 2. The ambient resolver, a user-supplied function consulted when no
//!    override is active.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::app::AppContext;
use crate::error::{Result, ThemeError};

/// User-supplied function returning the ambient theme name.
pub type ThemeResolverFn = Arc<dyn Fn(&AppContext) -> Result<String> + Send + Sync>;

/// The explicit override stack of one context.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OverrideStack {
    themes: Vec<String>,
}

impl OverrideStack {
    pub fn top(&self) -> Option<&str> {
        self.themes.last().map(String::as_str)
    }

    pub fn depth(&self) -> usize {
        self.themes.len()
    }
}

/// Returns the override stack depth of `ctx`.
pub fn override_depth(ctx: &AppContext) -> usize {
    ctx.with_local(|stack: &mut OverrideStack| stack.depth())
}

/// Holds the ambient resolver.
#[derive(Default)]
pub struct ActiveThemeResolver {
    resolver: RwLock<Option<ThemeResolverFn>>,
}

impl ActiveThemeResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the ambient resolver, replacing any previous one.
    pub fn set_resolver<F>(&self, resolver: F)
    where
        F: Fn(&AppContext) -> Result<String> + Send + Sync + 'static,
    {
        *self.resolver.write() = Some(Arc::new(resolver));
    }

    pub fn has_resolver(&self) -> bool {
        self.resolver.read().is_some()
    }

    /// Returns the active theme for `ctx`.
    ///
    /// # Errors
    ///
    /// [`ThemeError::NoThemeResolver`] if no override is active and no
    /// resolver is registered. Errors raised by the resolver itself are
    /// returned unchanged.
    pub fn current(&self, ctx: &AppContext) -> Result<String> {
        if let Some(theme) = ctx.with_local(|stack: &mut OverrideStack| stack.top().map(str::to_owned)) {
            return Ok(theme);
        }

        // Release the lock before calling out, the resolver may re-enter.
        let resolver = self.resolver.read().clone();
        match resolver {
            Some(resolver) => resolver(ctx),
            None => Err(ThemeError::NoThemeResolver),
        }
    }
}

impl std::fmt::Debug for ActiveThemeResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActiveThemeResolver")
            .field("has_resolver", &self.has_resolver())
            .finish()
    }
}

/// Scoped theme override.
///
/// Pushes a theme onto the context's override stack on creation and restores
/// the stack to its previous depth when dropped.
///
/// # Example
///
/// ```rust,ignore
/// {
///     let _dark = themer::use_theme(&ctx, "dark")?;
///     // Everything rendered here uses "dark".
/// }
/// // Back to the ambient theme.
/// ```
#[must_use = "the override ends as soon as the guard is dropped"]
pub struct ThemeOverride {
    ctx: AppContext,
    depth: usize,
}

impl ThemeOverride {
    pub(crate) fn push(ctx: &AppContext, theme: impl Into<String>) -> Self {
        let theme = theme.into();
        let depth = ctx.with_local(|stack: &mut OverrideStack| {
            let depth = stack.themes.len();
            stack.themes.push(theme);
            depth
        });
        Self {
            ctx: ctx.clone(),
            depth,
        }
    }
}

impl Drop for ThemeOverride {
    fn drop(&mut self) {
        let depth = self.depth;
        self.ctx.with_local(|stack: &mut OverrideStack| {
            if stack.themes.len() != depth + 1 {
                tracing::warn!(
                    target: "themer",
                    depth,
                    stack = stack.themes.len(),
                    "theme overrides dropped out of order"
                );
            }
            stack.themes.truncate(depth);
        });
    }
}

impl std::fmt::Debug for ThemeOverride {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThemeOverride")
            .field("depth", &self.depth)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::App;
    use std::panic::{catch_unwind, AssertUnwindSafe};

    fn context() -> AppContext {
        Arc::new(App::new("/nonexistent-themer-root")).app_context()
    }

    #[test]
    fn test_no_resolver() {
        let ctx = context();
        let active = ActiveThemeResolver::new();
        assert!(!active.has_resolver());
        assert!(matches!(active.current(&ctx), Err(ThemeError::NoThemeResolver)));
    }

    #[test]
    fn test_resolver_is_used() {
        let ctx = context();
        let active = ActiveThemeResolver::new();
        active.set_resolver(|_| Ok("ambient".to_string()));
        assert_eq!(active.current(&ctx).unwrap(), "ambient");
    }

    #[test]
    fn test_resolver_error_propagates() {
        let ctx = context();
        let active = ActiveThemeResolver::new();
        active.set_resolver(|_| Err(ThemeError::resolver("no user")));
        assert!(matches!(active.current(&ctx), Err(ThemeError::Resolver { .. })));
    }

    #[test]
    fn test_override_without_resolver() {
        let ctx = context();
        let active = ActiveThemeResolver::new();
        let _guard = ThemeOverride::push(&ctx, "forced");
        assert_eq!(active.current(&ctx).unwrap(), "forced");
    }

    #[test]
    fn test_nested_overrides() {
        let ctx = context();
        let active = ActiveThemeResolver::new();
        active.set_resolver(|_| Ok("ambient".to_string()));

        let mut seen = Vec::new();
        {
            let _a = ThemeOverride::push(&ctx, "A");
            seen.push(active.current(&ctx).unwrap());
            {
                let _b = ThemeOverride::push(&ctx, "B");
                seen.push(active.current(&ctx).unwrap());
            }
            seen.push(active.current(&ctx).unwrap());
        }
        seen.push(active.current(&ctx).unwrap());

        assert_eq!(seen, vec!["A", "B", "A", "ambient"]);
        assert_eq!(override_depth(&ctx), 0);
    }

    #[test]
    fn test_override_popped_on_panic() {
        let ctx = context();
        let result = catch_unwind(AssertUnwindSafe(|| {
            let _guard = ThemeOverride::push(&ctx, "raises");
            assert_eq!(override_depth(&ctx), 1);
            panic!("boom");
        }));

        assert!(result.is_err());
        assert_eq!(override_depth(&ctx), 0);
    }

    #[test]
    fn test_override_popped_on_early_return() {
        fn failing(ctx: &AppContext) -> Result<String> {
            let _guard = ThemeOverride::push(ctx, "raises");
            let name = Err(ThemeError::resolver("bail"))?;
            Ok(name)
        }

        let ctx = context();
        assert!(failing(&ctx).is_err());
        assert_eq!(override_depth(&ctx), 0);
    }

    #[test]
    fn test_out_of_order_drop_restores_outer_state() {
        let ctx = context();
        let active = ActiveThemeResolver::new();
        active.set_resolver(|_| Ok("ambient".to_string()));

        let outer = ThemeOverride::push(&ctx, "outer");
        let inner = ThemeOverride::push(&ctx, "inner");
        drop(outer);
        assert_eq!(override_depth(&ctx), 0);
        assert_eq!(active.current(&ctx).unwrap(), "ambient");

        drop(inner);
        assert_eq!(override_depth(&ctx), 0);
        assert_eq!(active.current(&ctx).unwrap(), "ambient");
    }

    #[test]
    fn test_overrides_are_per_context() {
        let app = Arc::new(App::new("/nonexistent-themer-root"));
        let first = app.app_context();
        let second = app.app_context();
        let active = ActiveThemeResolver::new();
        active.set_resolver(|_| Ok("ambient".to_string()));

        let _guard = ThemeOverride::push(&first, "forced");
        assert_eq!(active.current(&first).unwrap(), "forced");
        assert_eq!(active.current(&second).unwrap(), "ambient");
    }
}
