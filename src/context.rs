// src/context.rs

//! The per-run execution context threaded through every dependency body.
//!
//! A [`RunContext`] bundles the run's cancellation token with a handle to the
//! run's ledger, so bodies can schedule further dependencies with
//! [`RunContext::serial`] / [`RunContext::parallel`] without holding a
//! reference back to the [`Manager`].
//!
//! [`Manager`]: crate::manager::Manager

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::dep::Dependency;
use crate::engine::Ledger;
use crate::errors::Result;
use crate::identity::Identify;
use crate::report::Report;

/// Cancellation-capable context for one run.
///
/// Cheap to clone; every clone refers to the same run. Dropping all clones
/// ends the run's bookkeeping, the engine persists nothing across runs.
#[derive(Clone)]
pub struct RunContext {
    cancel: CancellationToken,
    ledger: Arc<Ledger>,
}

impl RunContext {
    /// Start a fresh run with its own ledger and cancellation token.
    pub fn new() -> Self {
        Self::with_cancel(CancellationToken::new())
    }

    /// Start a fresh run cancelled through the given token.
    pub fn with_cancel(cancel: CancellationToken) -> Self {
        Self {
            cancel,
            ledger: Arc::new(Ledger::new()),
        }
    }

    pub(crate) fn for_ledger(ledger: Arc<Ledger>, cancel: CancellationToken) -> Self {
        Self { cancel, ledger }
    }

    /// Execute dependencies one after the other, stopping at the first error.
    ///
    /// Every dependency is registered as a child of `parent` before anything
    /// runs. Each one resolves to its memo gate: already-completed work is
    /// replayed from cache, in-flight work is awaited.
    pub async fn serial<P>(&self, parent: &P, deps: Vec<Box<dyn Dependency>>) -> Result<()>
    where
        P: Identify + ?Sized,
    {
        debug!(parent = %parent.id(), count = deps.len(), "serial deps");
        self.ledger.serial(self.clone(), &parent.id(), deps).await
    }

    /// Execute dependencies concurrently, waiting for all of them.
    ///
    /// Never short-circuits; every sibling failure is collected into an
    /// [`AggregateError`].
    ///
    /// [`AggregateError`]: crate::errors::AggregateError
    pub async fn parallel<P>(&self, parent: &P, deps: Vec<Box<dyn Dependency>>) -> Result<()>
    where
        P: Identify + ?Sized,
    {
        debug!(parent = %parent.id(), count = deps.len(), "parallel deps");
        self.ledger.parallel(self.clone(), &parent.id(), deps).await
    }

    /// Snapshot of the run so far, renderable as a success/failure tree.
    pub fn report(&self) -> Report {
        Report::new(self.ledger.snapshot())
    }

    /// Request cancellation of the whole run.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Completes when the run is cancelled.
    pub async fn cancelled(&self) {
        self.cancel.cancelled().await;
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// The underlying cancellation token, for wiring into external I/O.
    pub fn cancellation(&self) -> CancellationToken {
        self.cancel.clone()
    }
}

impl Default for RunContext {
    fn default() -> Self {
        Self::new()
    }
}
