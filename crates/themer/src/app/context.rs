//! Per-request application context.
//!
//! An [`AppContext`] is the unit of isolation: everything that must not leak
//! between requests (such as the theme override stack) is stored in the
//! context's typed local storage, never on the [`App`] itself.
//!
//! Most of the API takes the context explicitly. Template globals are the
//! exception, since the engine calls them without any handle to the caller.
//! For those, [`AppContext::bind`] makes a context visible to the current
//! thread through [`AppContext::current`] for the lifetime of a guard.

use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;

use parking_lot::Mutex;

use super::App;

type Locals = HashMap<TypeId, Box<dyn Any + Send>>;

struct ContextInner {
    app: Arc<App>,
    locals: Mutex<Locals>,
}

/// Execution scope of a single request (or any other unit of work).
///
/// Cloning a context yields another handle to the same scope.
#[derive(Clone)]
pub struct AppContext {
    inner: Arc<ContextInner>,
}

thread_local! {
    static BOUND: RefCell<Vec<AppContext>> = const { RefCell::new(Vec::new()) };
}

impl AppContext {
    /// Creates a fresh context with empty local storage.
    pub fn new(app: Arc<App>) -> Self {
        Self {
            inner: Arc::new(ContextInner {
                app,
                locals: Mutex::new(Locals::new()),
            }),
        }
    }

    pub fn app(&self) -> &Arc<App> {
        &self.inner.app
    }

    /// Runs `f` with mutable access to this context's value of type `T`,
    /// creating it with `T::default()` on first use.
    ///
    /// The storage lock is held while `f` runs, so `f` must not call back
    /// into `with_local` on the same context.
    pub fn with_local<T, R>(&self, f: impl FnOnce(&mut T) -> R) -> R
    where
        T: Default + Send + 'static,
    {
        let mut locals = self.inner.locals.lock();
        let slot = locals
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Box::new(T::default()));
        match slot.downcast_mut::<T>() {
            Some(value) => f(value),
            // Entries are keyed by their own TypeId.
            None => unreachable!("context local stored under a foreign TypeId"),
        }
    }

    /// Returns true if both handles refer to the same scope.
    pub fn ptr_eq(&self, other: &AppContext) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Makes this context the current one for this thread until the guard
    /// is dropped. Bindings nest.
    pub fn bind(&self) -> BoundContext {
        BOUND.with(|stack| stack.borrow_mut().push(self.clone()));
        BoundContext {
            _not_send: PhantomData,
        }
    }

    /// Returns the innermost context bound on this thread.
    pub fn current() -> Option<AppContext> {
        BOUND.with(|stack| stack.borrow().last().cloned())
    }
}

impl std::fmt::Debug for AppContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppContext")
            .field("app", &self.inner.app.root_path())
            .finish_non_exhaustive()
    }
}

/// Guard returned by [`AppContext::bind`].
///
/// Bound to the thread that created it.
#[must_use = "the context is unbound as soon as the guard is dropped"]
pub struct BoundContext {
    _not_send: PhantomData<*const ()>,
}

impl Drop for BoundContext {
    fn drop(&mut self) {
        BOUND.with(|stack| {
            stack.borrow_mut().pop();
        });
    }
}
