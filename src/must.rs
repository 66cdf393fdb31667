// src/must.rs

//! Abort-on-error helper for dependency bodies.
//!
//! [`must`] turns "this call must not fail" checks into an unwind carrying an
//! [`Abort`] payload. The failure normalizer in the engine is the only place
//! that recovers the payload, unwrapping it back into the original error, so
//! callers further up the graph simply observe a failed dependency. Prefer
//! plain `?` propagation where the signature allows it; `must` exists for
//! bodies that fan out work without surfacing every intermediate `Result`.

use std::panic::{self, panic_any};
use std::sync::Once;

/// Panic payload distinguishing a deliberate abort from an unexpected fault.
pub struct Abort(anyhow::Error);

impl Abort {
    pub(crate) fn into_inner(self) -> anyhow::Error {
        self.0
    }
}

static INSTALL_HOOK: Once = Once::new();

/// Keep deliberate aborts quiet: the default hook would dump a "thread
/// panicked" message and backtrace for every unwind the engine recovers.
/// Other payloads still go through the previously installed hook.
fn silence_abort_unwinds() {
    INSTALL_HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            if info.payload().is::<Abort>() {
                return;
            }
            previous(info);
        }));
    });
}

/// Abort the current dependency body if `res` is an error.
///
/// The error re-surfaces unchanged as the body's execution result.
pub fn must<T, E>(res: Result<T, E>) -> T
where
    E: Into<anyhow::Error>,
{
    match res {
        Ok(v) => v,
        Err(err) => {
            silence_abort_unwinds();
            panic_any(Abort(err.into()))
        }
    }
}
