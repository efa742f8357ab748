//! Result combinators and scoped result blocks
//!
//! Every fallible operation in this crate returns a plain [`std::result::Result`].
//! This module adds the few combinators the routing pipeline leans on that std
//! does not name directly, plus [`result_block`], a scoped builder that runs a
//! body and collects cleanup hooks that must run on both the success and the
//! failure path.
//!
//! ```rust
//! use agent_router::result::{result_block, ResultExt};
//!
//! let outcome: Result<usize, String> = result_block(|scope| {
//!     let value = scope.ensure_not_null(Some("agent-1"), || "missing".to_string())?;
//!     scope.ensure(!value.is_empty(), || "blank".to_string())?;
//!     Ok(value.len())
//! });
//!
//! assert_eq!(outcome.get_or_none(), Some(7));
//! ```
//!
//! A panic inside the body is never turned into a failure: it unwinds through
//! the block (cleanup hooks still run) because it signals a bug, not an outcome.

use std::fmt::Display;
use std::marker::PhantomData;

/// Extra combinators over [`Result`] used at strategy boundaries
pub trait ResultExt<T, E> {
    /// Run a side effect on the failure value and hand the result back unchanged
    fn on_failure<F>(self, hook: F) -> Self
    where
        F: FnOnce(&E);

    /// Transform the failure type, passing success through
    fn map_failure<E2, F>(self, transform: F) -> Result<T, E2>
    where
        F: FnOnce(E) -> E2;

    /// Success value, or `None` on failure
    ///
    /// For `Result<Option<U>, E>` this yields `Option<Option<U>>`, so a successful
    /// "no match" stays distinguishable from a failure.
    fn get_or_none(self) -> Option<T>;

    /// Success value, panicking with the failure's message otherwise
    ///
    /// # Panics
    ///
    /// Panics when the result is a failure. Library code propagates with `?`
    /// instead; this is for call sites where failure is a broken invariant.
    fn get_or_throw(self) -> T
    where
        E: Display;
}

impl<T, E> ResultExt<T, E> for Result<T, E> {
    fn on_failure<F>(self, hook: F) -> Self
    where
        F: FnOnce(&E),
    {
        if let Err(ref error) = self {
            hook(error);
        }
        self
    }

    fn map_failure<E2, F>(self, transform: F) -> Result<T, E2>
    where
        F: FnOnce(E) -> E2,
    {
        self.map_err(transform)
    }

    fn get_or_none(self) -> Option<T> {
        self.ok()
    }

    fn get_or_throw(self) -> T
    where
        E: Display,
    {
        match self {
            Ok(value) => value,
            Err(error) => panic!("{error}"),
        }
    }
}

/// Scope handed to the body of a [`result_block`]
pub struct ResultScope<E> {
    finalizers: Vec<Box<dyn FnOnce()>>,
    _failure: PhantomData<E>,
}

impl<E> ResultScope<E> {
    fn new() -> Self {
        Self {
            finalizers: Vec::new(),
            _failure: PhantomData,
        }
    }

    /// Short-circuit the block with the computed failure
    pub fn fail_with<T, F>(&self, error: F) -> Result<T, E>
    where
        F: FnOnce() -> E,
    {
        Err(error())
    }

    /// Fail with the computed error unless `predicate` holds
    pub fn ensure<F>(&self, predicate: bool, error: F) -> Result<(), E>
    where
        F: FnOnce() -> E,
    {
        if predicate {
            Ok(())
        } else {
            Err(error())
        }
    }

    /// Unwrap `value` or fail with the computed error
    pub fn ensure_not_null<T, F>(&self, value: Option<T>, error: F) -> Result<T, E>
    where
        F: FnOnce() -> E,
    {
        value.ok_or_else(error)
    }

    /// Register a cleanup hook; hooks run in registration order once the body ends
    pub fn finally<F>(&mut self, cleanup: F)
    where
        F: FnOnce() + 'static,
    {
        self.finalizers.push(Box::new(cleanup));
    }
}

impl<E> Drop for ResultScope<E> {
    fn drop(&mut self) {
        for cleanup in self.finalizers.drain(..) {
            cleanup();
        }
    }
}

/// Run `body` as a result block
///
/// The body's returned `Ok` is the block's success value; any `Err` (including
/// those produced through [`ResultScope::fail_with`], [`ResultScope::ensure`] and
/// [`ResultScope::ensure_not_null`] with `?`) is its failure. Hooks registered with
/// [`ResultScope::finally`] run on every exit path, unwinding included.
pub fn result_block<T, E, F>(body: F) -> Result<T, E>
where
    F: FnOnce(&mut ResultScope<E>) -> Result<T, E>,
{
    let mut scope = ResultScope::new();
    body(&mut scope)
}
