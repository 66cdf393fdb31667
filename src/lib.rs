// src/lib.rs

//! `rundag` is a programmable task-execution engine: declare units of work
//! ("targets" and their "dependencies"), compose them into a graph at
//! runtime, and execute that graph with the guarantee that any given unit of
//! work runs **at most once** per run, however many paths reach it. Results
//! (success, error, duration) are cached per identity and replayed to every
//! caller, and a post-run report reconstructs the tree that was actually
//! walked.
//!
//! There is no separate planning phase: dependency bodies call
//! [`RunContext::serial`] / [`RunContext::parallel`] with further
//! dependencies, and that recursion *is* the graph.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use rundag::identity::{arg_repr, debug_id, meth_id};
//! use rundag::{deps, Dep, Identify, Manager, RunContext, Target, TargetGroup};
//!
//! async fn generate(_ctx: RunContext) -> rundag::Result<()> {
//!     Ok(())
//! }
//!
//! #[derive(Debug)]
//! struct Dev;
//!
//! impl Identify for Dev {
//!     fn id(&self) -> String {
//!         debug_id(self)
//!     }
//! }
//!
//! impl Dev {
//!     async fn unit(self: Arc<Self>, ctx: RunContext, args: Vec<String>) -> rundag::Result<()> {
//!         let parent = meth_id(&self.id(), "Unit", &[arg_repr(&args)]);
//!         ctx.serial(parent.as_str(), deps![Dep::func(generate)]).await
//!     }
//! }
//!
//! impl TargetGroup for Dev {
//!     fn targets(self: Arc<Self>) -> Vec<Target> {
//!         vec![Target::new(&self, "Unit", |ctx, dev: Arc<Dev>, args| async move {
//!             dev.unit(ctx, args).await
//!         })]
//!     }
//! }
//!
//! # async fn demo() -> rundag::Result<()> {
//! let dev = Arc::new(Dev);
//! let mgr = Manager::builder().register(&dev)?.build();
//! mgr.run("Dev:Unit", vec![]).await
//! # }
//! ```

pub mod context;
pub mod dep;
mod engine;
pub mod errors;
pub mod identity;
pub mod logging;
pub mod manager;
pub mod must;
pub mod report;
pub mod shell;

pub use context::RunContext;
pub use dep::{Dep, DepFuture, Dependency};
pub use errors::{AggregateError, Result, RundagError};
pub use identity::Identify;
pub use manager::{Manager, ManagerBuilder, Target, TargetGroup};
pub use must::must;
pub use report::Report;
pub use shell::Shell;
