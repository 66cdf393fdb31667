// src/errors.rs

//! Crate-wide error types.
//!
//! Structured failures get their own `thiserror` variants; everything else is
//! propagated as `anyhow::Error` with `.context(...)` along the way.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

pub use anyhow::Error;
pub type Result<T> = anyhow::Result<T>;

#[derive(Error, Debug, Clone)]
pub enum RundagError {
    /// Requested target name has no registered target.
    #[error("unknown target: {0:?}")]
    UnknownTarget(String),

    /// A dependency body panicked with something other than an [`Abort`]
    /// payload.
    ///
    /// [`Abort`]: crate::must::Abort
    #[error("panic in {id}: {message}\n{backtrace}")]
    Panicked {
        /// Identity of the failing node.
        id: String,
        /// Rendered panic payload.
        message: String,
        /// Backtrace captured when the panic was recovered.
        backtrace: String,
    },
}

/// Joined failures of sibling dependencies from one `parallel` call.
///
/// Individual errors stay introspectable via [`AggregateError::errors`].
/// No ordering is guaranteed; siblings land in whatever order they finish.
#[derive(Debug)]
pub struct AggregateError {
    errors: Vec<anyhow::Error>,
}

impl AggregateError {
    pub(crate) fn new(errors: Vec<anyhow::Error>) -> Self {
        Self { errors }
    }

    /// The collected sibling errors.
    pub fn errors(&self) -> &[anyhow::Error] {
        &self.errors
    }
}

impl fmt::Display for AggregateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, err) in self.errors.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{err:#}")?;
        }
        Ok(())
    }
}

impl std::error::Error for AggregateError {}

/// Clonable wrapper around a cached execution error.
///
/// A gate executes its body once and replays the outcome to every caller
/// that references the same identity, so the stored error must be shareable.
#[derive(Debug, Clone)]
pub struct SharedError(Arc<anyhow::Error>);

impl SharedError {
    pub(crate) fn new(err: anyhow::Error) -> Self {
        Self(Arc::new(err))
    }

    /// A fresh error replaying the cached failure.
    ///
    /// A structured [`RundagError`] at the top of the cached chain is cloned
    /// so it stays directly downcastable; everything else is replayed through
    /// the shared wrapper, whose `source` chain exposes the cached causes.
    pub(crate) fn replay(&self) -> anyhow::Error {
        if let Some(structured) = self
            .0
            .chain()
            .next()
            .and_then(|outer| outer.downcast_ref::<RundagError>())
        {
            return anyhow::Error::new(structured.clone());
        }
        anyhow::Error::new(self.clone())
    }
}

impl fmt::Display for SharedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // `{}` prints one message so an enclosing chain joins cleanly;
        // `{:#}` is the flattened standalone form.
        if f.alternate() {
            write!(f, "{:#}", self.0)
        } else {
            write!(f, "{}", self.0)
        }
    }
}

impl std::error::Error for SharedError {
    // Skip the level Display already shows; the rest of the cached chain
    // stays reachable without printing any cause twice.
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.0.source()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replayed_structured_errors_stay_downcastable() {
        let cached = SharedError::new(
            RundagError::Panicked {
                id: "x".into(),
                message: "m".into(),
                backtrace: "bt".into(),
            }
            .into(),
        );
        let replayed = cached.replay();
        assert!(matches!(
            replayed.downcast_ref::<RundagError>(),
            Some(RundagError::Panicked { .. })
        ));
    }

    #[test]
    fn replayed_context_chains_render_each_cause_once() {
        let cached = SharedError::new(anyhow::anyhow!("root").context("middle"));
        let replayed = cached.replay().context("outer");
        assert_eq!(format!("{replayed:#}"), "outer: middle: root");
    }

    #[test]
    fn aggregate_error_joins_messages_line_per_error() {
        let agg = AggregateError::new(vec![
            anyhow::anyhow!("one"),
            anyhow::anyhow!("two"),
        ]);
        assert_eq!(agg.to_string(), "one\ntwo");
    }
}
