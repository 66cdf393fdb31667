// src/engine/gate.rs

//! One-shot execution gates.
//!
//! Each identity gets exactly one [`Gate`] per run. The first caller takes
//! the registered body and hands it to a detached task that executes it and
//! publishes the [`Outcome`] on a watch channel; every caller, the first one
//! included, awaits that channel. The publisher outlives its callers, so a
//! caller dropped mid-flight never loses the result for later arrivals.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use anyhow::Context as _;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::context::RunContext;
use crate::dep::Dependency;
use crate::errors::{Result, SharedError};

use super::fault;

/// Cached result of one execution.
#[derive(Debug, Clone)]
pub(crate) struct Outcome {
    pub(crate) err: Option<SharedError>,
    pub(crate) took: Duration,
}

pub(crate) struct Gate {
    id: String,
    // Consumed by the single execution; None afterwards and for duplicate
    // registrations of the same identity.
    body: Mutex<Option<Box<dyn Dependency>>>,
    done: watch::Sender<Option<Outcome>>,
}

impl Gate {
    pub(crate) fn new(dep: Box<dyn Dependency>) -> Self {
        let (done, _) = watch::channel(None);
        Self {
            id: dep.id(),
            body: Mutex::new(Some(dep)),
            done,
        }
    }

    pub(crate) fn id(&self) -> &str {
        &self.id
    }

    /// Outcome of the execution, if it has happened.
    pub(crate) fn outcome(&self) -> Option<Outcome> {
        self.done.borrow().clone()
    }

    /// Execute the body once; replay the published result to everyone else.
    pub(crate) async fn run(self: Arc<Self>, ctx: RunContext) -> Result<()> {
        let body = self.body.lock().expect("gate body lock poisoned").take();
        if let Some(body) = body {
            let gate = Arc::clone(&self);
            // Detached: the outcome must land even if every caller currently
            // awaiting this identity is dropped.
            tokio::spawn(async move {
                gate.execute(body, ctx).await;
            });
        }

        let mut done = self.done.subscribe();
        let outcome = done
            .wait_for(Option::is_some)
            .await
            .with_context(|| format!("execution of {} was abandoned", self.id))?;
        let err = outcome.as_ref().and_then(|o| o.err.clone());
        drop(outcome);
        match err {
            None => Ok(()),
            Some(err) => Err(err.replay()),
        }
    }

    async fn execute(&self, body: Box<dyn Dependency>, ctx: RunContext) {
        debug!(id = %self.id, "executing dependency");
        let start = Instant::now();

        // Spawning isolates panics: they come back as JoinErrors and are
        // normalized into error values instead of crashing the run.
        let handle = tokio::spawn(body.run(ctx));
        let result = match handle.await {
            Ok(result) => result,
            Err(join_err) => Err(fault::error_from_join(&self.id, join_err)),
        };
        let took = start.elapsed();

        match &result {
            Ok(()) => debug!(id = %self.id, ?took, "dependency succeeded"),
            Err(err) => warn!(id = %self.id, ?took, error = %format!("{err:#}"), "dependency failed"),
        }

        self.done.send_replace(Some(Outcome {
            err: result.err().map(SharedError::new),
            took,
        }));
    }
}
