use std::{fmt::Display, panic::Location};

use anyhow::{Context, Result};

/// Common error-handling imports for the workspace.
///
/// Re-exports anyhow and thiserror, so that downstream crates only ever need
/// `use located_error::prelude::*;`
pub mod prelude {
    extern crate anyhow;
    pub use anyhow::{anyhow, bail, Context, Result};

    extern crate thiserror;
    pub use thiserror::Error;

    pub use super::LocatedError;
}

/// Extend [`Result`] with context carrying the caller's `[file:line:column]`.
///
/// Errors bubbling through several crates lose track of where they were
/// raised; wrapping each `?` with [`LocatedError::loc`] or
/// [`LocatedError::with_loc`] keeps the chain readable:
///
/// ```text
/// Error: [src/lib.rs:31:42] While running the LD engine
///
/// Caused by:
///     0: [src/estimators/src/ld/mod.rs:120:18] While enumerating locus pairs
///     1: No such file or directory (os error 2)
/// ```
pub trait LocatedError<T, E> {
    /// Eagerly add `context` plus the caller location to the error value.
    fn loc<C>(self, context: C) -> Result<T, anyhow::Error>
    where
        C: Display + Send + Sync + 'static;

    /// Lazily add `f()` plus the caller location, evaluated only on error.
    fn with_loc<C, F>(self, f: F) -> Result<T, anyhow::Error>
    where
        C: Display + Send + Sync + 'static,
        F: FnOnce() -> C;
}

impl<T, E> LocatedError<T, E> for Result<T, E>
where
    E: Display + Send + Sync + 'static,
    Result<T, E>: Context<T, E>,
{
    #[track_caller]
    fn loc<C>(self, context: C) -> Result<T, anyhow::Error>
    where
        C: Display + Send + Sync + 'static
    {
        match self {
            Ok(ok)  => Ok(ok),
            Err(_)  => {
                let caller = Location::caller();
                self.context(format!("[{}:{}:{}] {context}", caller.file(), caller.line(), caller.column()))
            }
        }
    }

    #[track_caller]
    fn with_loc<C, F>(self, f: F) -> Result<T, anyhow::Error>
    where
        C: Display + Send + Sync + 'static,
        F: FnOnce() -> C
    {
        match self {
            Ok(ok)  => Ok(ok),
            Err(_)  => {
                let caller = Location::caller();
                let loc    = format!("[{}:{}:{}]", caller.file(), caller.line(), caller.column());
                self.with_context(|| format!("{loc} {}", f()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    fn faulty() -> Result<()> {
        Err(anyhow!("inner failure"))
    }

    #[test]
    fn loc_prepends_location() {
        let err = faulty().loc("outer context").unwrap_err();
        let msg = format!("{err}");
        assert!(msg.contains("outer context"));
        assert!(msg.contains("lib.rs"));
    }

    #[test]
    fn with_loc_is_lazy_on_ok() {
        let ok: Result<u8, anyhow::Error> = Ok(42);
        let out = ok.with_loc(|| -> String { panic!("must not evaluate") }).unwrap();
        assert_eq!(out, 42);
    }

    #[test]
    fn with_loc_formats_on_err() {
        let err = faulty().with_loc(|| format!("while checking {}", "input")).unwrap_err();
        assert!(format!("{err}").contains("while checking input"));
    }
}
