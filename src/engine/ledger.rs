// src/engine/ledger.rs

//! Run-scoped execution ledger.
//!
//! The ledger owns the identity-to-gate mapping and the parent/child
//! adjacency recorded while the graph is walked. Gates provide the
//! "one identity, one execution" guarantee on their own; the ledger's mutex
//! only protects the bookkeeping and is never held across a body execution.
//!
//! The adjacency exists purely for reporting. A node reached through several
//! parents is recorded as an edge under each of them even though the
//! underlying work runs once.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::Context as _;
use tokio::task::JoinSet;
use tracing::debug;

use crate::context::RunContext;
use crate::dep::Dependency;
use crate::errors::{AggregateError, Result};

use super::gate::{Gate, Outcome};

#[derive(Default)]
struct LedgerState {
    gates: HashMap<String, Arc<Gate>>,
    root: Option<String>,
    children: HashMap<String, Vec<String>>,
}

/// Mutable state of one run.
#[derive(Default)]
pub(crate) struct Ledger {
    state: Mutex<LedgerState>,
}

/// Read-only copy of the ledger for report rendering.
pub(crate) struct LedgerSnapshot {
    pub(crate) root: Option<String>,
    pub(crate) children: HashMap<String, Vec<String>>,
    pub(crate) outcomes: HashMap<String, Outcome>,
}

impl Ledger {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Register a dependency under `parent` and resolve its gate.
    ///
    /// The first registration of an identity creates the gate and hands it
    /// the body; later registrations only add a report edge and drop the
    /// duplicate body.
    fn admit(&self, parent: &str, dep: Box<dyn Dependency>) -> Arc<Gate> {
        let id = dep.id();
        let mut state = self.state.lock().expect("ledger lock poisoned");

        // The first parent seen in a run is the root of the report tree.
        if state.root.is_none() {
            state.root = Some(parent.to_string());
        }
        state
            .children
            .entry(parent.to_string())
            .or_default()
            .push(id.clone());

        match state.gates.get(&id) {
            Some(gate) => {
                debug!(id = %id, parent = %parent, "identity already scheduled, reusing gate");
                Arc::clone(gate)
            }
            None => {
                let gate = Arc::new(Gate::new(dep));
                state.gates.insert(id, Arc::clone(&gate));
                gate
            }
        }
    }

    /// Execute dependencies in order, stopping at the first error.
    ///
    /// All dependencies are admitted before any executes, so the report
    /// shows nodes that were scheduled but skipped by fail-fast.
    pub(crate) async fn serial(
        &self,
        ctx: RunContext,
        parent: &str,
        deps: Vec<Box<dyn Dependency>>,
    ) -> Result<()> {
        let gates: Vec<Arc<Gate>> = deps.into_iter().map(|d| self.admit(parent, d)).collect();

        for gate in gates {
            let id = gate.id().to_string();
            gate.run(ctx.clone())
                .await
                .with_context(|| format!("running {id}"))?;
        }
        Ok(())
    }

    /// Execute dependencies concurrently and wait for all of them.
    ///
    /// Sibling failures are collected into one [`AggregateError`]; this
    /// never short-circuits.
    pub(crate) async fn parallel(
        &self,
        ctx: RunContext,
        parent: &str,
        deps: Vec<Box<dyn Dependency>>,
    ) -> Result<()> {
        let gates: Vec<Arc<Gate>> = deps.into_iter().map(|d| self.admit(parent, d)).collect();

        let mut set = JoinSet::new();
        for gate in gates {
            let ctx = ctx.clone();
            set.spawn(async move {
                let id = gate.id().to_string();
                gate.run(ctx)
                    .await
                    .with_context(|| format!("running {id}"))
            });
        }

        let mut errors = Vec::new();
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(Ok(())) => {}
                Ok(Err(err)) => errors.push(err),
                // Gate::run never panics; this covers runtime shutdown.
                Err(join_err) => errors.push(join_err.into()),
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(AggregateError::new(errors).into())
        }
    }

    pub(crate) fn snapshot(&self) -> LedgerSnapshot {
        let state = self.state.lock().expect("ledger lock poisoned");
        let outcomes = state
            .gates
            .iter()
            .filter_map(|(id, gate)| gate.outcome().map(|o| (id.clone(), o)))
            .collect();
        LedgerSnapshot {
            root: state.root.clone(),
            children: state.children.clone(),
            outcomes,
        }
    }
}
