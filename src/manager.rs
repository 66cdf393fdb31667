// src/manager.rs

//! Public-facing façade over the engine.
//!
//! A [`Manager`] holds the registry of named, externally invocable targets,
//! the configured always-run-first dependency lists, and the single ledger
//! for the process run. Targets are contributed by [`TargetGroup`]
//! implementations, an explicit capability rather than reflection: a type
//! lists its invocable methods itself.

use std::collections::HashMap;
use std::future::Future;
use std::io::Write;
use std::mem;
use std::sync::{Arc, Mutex};

use anyhow::{Context as _, bail};
use tokio::sync::OnceCell;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::context::RunContext;
use crate::dep::{Dep, DepFuture, Dependency};
use crate::engine::Ledger;
use crate::errors::{Result, RundagError, SharedError};
use crate::identity::{self, Identify};
use crate::report::color_default;

/// Identity of the run root; targets and configured dependencies hang off
/// this pseudo node.
const ROOT: &str = ".";

/// A named, externally invocable operation.
///
/// Invocation names follow the `Group:Method` convention, looked up
/// case-insensitively. The node identity embeds the literal arguments, e.g.
/// `my_tool::Dev { cluster: "kind" }.Deploy(["--wait"])`.
pub struct Target {
    name: String,
    id_with_args: Box<dyn Fn(&[String]) -> String + Send + Sync>,
    body: Arc<dyn Fn(RunContext, Vec<String>) -> DepFuture + Send + Sync>,
}

impl Target {
    /// Bind `method` of `recv` as an invocable target.
    ///
    /// The body receives the run context, the shared receiver and the
    /// invocation arguments:
    ///
    /// ```ignore
    /// Target::new(&dev, "Deploy", |ctx, dev: Arc<Dev>, args| async move {
    ///     dev.deploy(ctx, args).await
    /// })
    /// ```
    pub fn new<R, F, Fut>(recv: &Arc<R>, method: &str, f: F) -> Self
    where
        R: Identify + Send + Sync + 'static,
        F: Fn(RunContext, Arc<R>, Vec<String>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        let name = format!("{}:{}", short_type_name::<R>(), method);

        let id_recv = Arc::clone(recv);
        let id_method = method.to_string();
        let id_with_args = Box::new(move |args: &[String]| {
            identity::meth_id(&id_recv.id(), &id_method, &[identity::arg_repr(&args)])
        });

        let body_recv = Arc::clone(recv);
        let body = Arc::new(move |ctx: RunContext, args: Vec<String>| {
            Box::pin(f(ctx, Arc::clone(&body_recv), args)) as DepFuture
        });

        Self {
            name,
            id_with_args,
            body,
        }
    }

    /// Invocation name, `Group:Method`.
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// A type that exposes invocable targets.
pub trait TargetGroup: Identify + Send + Sync + 'static {
    /// List the targets this group contributes to the registry.
    fn targets(self: Arc<Self>) -> Vec<Target>;
}

/// Configures and constructs a [`Manager`].
#[derive(Default)]
pub struct ManagerBuilder {
    targets: HashMap<String, Target>,
    target_names: Vec<String>,
    parallel: Vec<Box<dyn Dependency>>,
    serial: Vec<Box<dyn Dependency>>,
    color: Option<bool>,
    cancel: Option<CancellationToken>,
    report_to: Option<Box<dyn Write + Send>>,
}

impl ManagerBuilder {
    /// Register every target of a group, rejecting case-insensitive name
    /// collisions.
    pub fn register<G: TargetGroup>(mut self, group: &Arc<G>) -> Result<Self> {
        for target in Arc::clone(group).targets() {
            let key = target.name.to_lowercase();
            if self.targets.contains_key(&key) {
                bail!("a target for {} is already registered", target.name);
            }
            debug!(target = %target.name, "registered target");
            self.target_names.push(target.name.clone());
            self.targets.insert(key, target);
        }
        Ok(self)
    }

    /// Add a dependency run unconditionally, in parallel with its peers,
    /// before any target.
    pub fn parallel_dep(mut self, dep: impl Dependency) -> Self {
        self.parallel.push(Box::new(dep));
        self
    }

    /// Add a dependency run unconditionally, after all parallel
    /// dependencies, before any target.
    pub fn serial_dep(mut self, dep: impl Dependency) -> Self {
        self.serial.push(Box::new(dep));
        self
    }

    /// Force colored report output on or off. Defaults to an
    /// environment-derived value (`NO_COLOR`, `TERM`, stderr tty-ness).
    pub fn color(mut self, color: bool) -> Self {
        self.color = Some(color);
        self
    }

    /// Cancel the whole run through this token.
    pub fn cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Where the rendered report is written after a run. Defaults to stderr.
    pub fn report_writer(mut self, writer: impl Write + Send + 'static) -> Self {
        self.report_to = Some(Box::new(writer));
        self
    }

    pub fn build(self) -> Manager {
        let mut target_names = self.target_names;
        target_names.sort();
        Manager {
            targets: self.targets,
            target_names,
            parallel: Mutex::new(self.parallel),
            serial: Mutex::new(self.serial),
            ledger: Arc::new(Ledger::new()),
            cancel: self.cancel.unwrap_or_default(),
            color: self.color.unwrap_or_else(color_default),
            report_to: Mutex::new(
                self.report_to
                    .unwrap_or_else(|| Box::new(std::io::stderr())),
            ),
            run_once: OnceCell::new(),
        }
    }
}

/// Coordinates runnable targets and dependencies for one process run.
pub struct Manager {
    targets: HashMap<String, Target>,
    target_names: Vec<String>,
    parallel: Mutex<Vec<Box<dyn Dependency>>>,
    serial: Mutex<Vec<Box<dyn Dependency>>>,
    ledger: Arc<Ledger>,
    cancel: CancellationToken,
    color: bool,
    report_to: Mutex<Box<dyn Write + Send>>,
    run_once: OnceCell<Option<SharedError>>,
}

impl Manager {
    pub fn builder() -> ManagerBuilder {
        ManagerBuilder::default()
    }

    /// A context for this manager's run, sharing its ledger and token.
    pub fn context(&self) -> RunContext {
        RunContext::for_ledger(Arc::clone(&self.ledger), self.cancel.clone())
    }

    /// Registered target names, sorted.
    pub fn target_names(&self) -> &[String] {
        &self.target_names
    }

    /// Look up `name` (case-insensitive) and execute it as the root
    /// dependency of this run.
    pub async fn invoke(&self, ctx: &RunContext, name: &str, args: Vec<String>) -> Result<()> {
        let Some(target) = self.targets.get(&name.to_lowercase()) else {
            return Err(RundagError::UnknownTarget(name.to_string()).into());
        };

        let id = (target.id_with_args)(&args);
        let body = Arc::clone(&target.body);
        let dep = Dep::func_named(id, move |ctx: RunContext| body(ctx, args));
        ctx.serial(ROOT, vec![Box::new(dep) as Box<dyn Dependency>])
            .await
    }

    /// Execute one full run: configured parallel dependencies, configured
    /// serial dependencies, then the requested target, then the report.
    ///
    /// Guarded by its own one-shot gate: a second call does not re-execute
    /// anything and replays the first call's result.
    pub async fn run(&self, target: &str, args: Vec<String>) -> Result<()> {
        let outcome = self
            .run_once
            .get_or_init(|| async {
                self.execute(target, args).await.err().map(SharedError::new)
            })
            .await;
        match outcome {
            None => Ok(()),
            Some(err) => Err(err.replay()),
        }
    }

    /// The rendered report for the run so far.
    pub fn report(&self) -> String {
        self.context().report().colored(self.color).render()
    }

    async fn execute(&self, target: &str, args: Vec<String>) -> Result<()> {
        let ctx = self.context();
        info!(target = %target, "run started");

        let parallel = mem::take(&mut *self.parallel.lock().expect("dep list lock poisoned"));
        if !parallel.is_empty() {
            ctx.parallel(ROOT, parallel)
                .await
                .context("parallel dependency failed")?;
        }

        let serial = mem::take(&mut *self.serial.lock().expect("dep list lock poisoned"));
        if !serial.is_empty() {
            ctx.serial(ROOT, serial)
                .await
                .context("serial dependency failed")?;
        }

        let result = self.invoke(&ctx, target, args).await;

        let report = ctx.report().colored(self.color).render();
        {
            let mut writer = self.report_to.lock().expect("report writer lock poisoned");
            let _ = writer.write_all(report.as_bytes());
            let _ = writer.flush();
        }

        match &result {
            Ok(()) => info!(target = %target, "run finished"),
            Err(err) => info!(target = %target, error = %format!("{err:#}"), "run failed"),
        }
        result
    }
}

fn short_type_name<R>() -> &'static str {
    let full = std::any::type_name::<R>();
    full.rsplit("::").next().unwrap_or(full)
}
