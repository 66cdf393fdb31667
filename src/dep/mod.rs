// src/dep/mod.rs

//! Dependency capability and the adapter family that produces it.
//!
//! A [`Dependency`] is a unit of work: a stable identity plus an executable
//! body. Dependencies are transient value objects, rebuilt at every call
//! site; the engine treats two of them with equal identities as the same
//! node and executes that node at most once per run.
//!
//! [`Dep`] adapts ordinary async functions and bound methods into the
//! capability. Constructors exist for zero to six bound arguments; each
//! accepted callable may take a leading [`RunContext`] and may return either
//! nothing or a `Result`.

mod call;

use std::fmt::Debug;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

pub use call::{DepCall, IntoDepResult, NoCtx, WithCtx};

use crate::context::RunContext;
use crate::errors::Result;
use crate::identity::{self, Identify};

/// Boxed future returned by dependency bodies.
pub type DepFuture = Pin<Box<dyn Future<Output = Result<()>> + Send>>;

/// A unit of work with a stable identity.
///
/// Execution consumes the dependency; the engine guarantees that for any
/// identity only one dependency body is ever consumed per run.
pub trait Dependency: Identify + Send + 'static {
    /// Execute the body with the run's context.
    fn run(self: Box<Self>, ctx: RunContext) -> DepFuture;
}

/// Generic dependency adapter around a bound callable.
pub struct Dep {
    id: String,
    body: Box<dyn FnOnce(RunContext) -> DepFuture + Send>,
}

impl Identify for Dep {
    fn id(&self) -> String {
        self.id.clone()
    }
}

impl Dependency for Dep {
    fn run(self: Box<Self>, ctx: RunContext) -> DepFuture {
        (self.body)(ctx)
    }
}

impl Debug for Dep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dep").field("id", &self.id).finish()
    }
}

impl Dep {
    fn build<F, M, Args>(id: String, f: F, args: Args) -> Self
    where
        F: DepCall<Args, M>,
        Args: Send + 'static,
    {
        Self {
            id,
            body: Box::new(move |ctx| f.call(ctx, args)),
        }
    }

    /// Replace the computed identity with an explicit one.
    ///
    /// Used verbatim; no argument rendering is appended.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Wrap a function with no bound arguments.
    ///
    /// The identity is derived from the function item's fully-qualified
    /// name, so independent call sites referencing the same function agree
    /// on the same node.
    pub fn func<F, M>(f: F) -> Self
    where
        F: DepCall<(), M>,
    {
        let id = identity::func_id(&identity::callable_name::<F>(), &[]);
        Self::build(id, f, ())
    }

    /// Wrap a callable under an explicit identity.
    ///
    /// This is the escape hatch for closures (whose item names are not
    /// meaningful) and for callers that want a custom node name.
    pub fn func_named<F, M>(id: impl Into<String>, f: F) -> Self
    where
        F: DepCall<(), M>,
    {
        Self::build(id.into(), f, ())
    }

    /// Wrap a function with one bound argument.
    pub fn func1<F, M, A1>(f: F, a1: A1) -> Self
    where
        F: DepCall<(A1,), M>,
        A1: Debug + Send + 'static,
    {
        let id = identity::func_id(
            &identity::callable_name::<F>(),
            &[identity::arg_repr(&a1)],
        );
        Self::build(id, f, (a1,))
    }

    /// Wrap a function with two bound arguments.
    pub fn func2<F, M, A1, A2>(f: F, a1: A1, a2: A2) -> Self
    where
        F: DepCall<(A1, A2), M>,
        A1: Debug + Send + 'static,
        A2: Debug + Send + 'static,
    {
        let id = identity::func_id(
            &identity::callable_name::<F>(),
            &[identity::arg_repr(&a1), identity::arg_repr(&a2)],
        );
        Self::build(id, f, (a1, a2))
    }

    /// Wrap a function with three bound arguments.
    pub fn func3<F, M, A1, A2, A3>(f: F, a1: A1, a2: A2, a3: A3) -> Self
    where
        F: DepCall<(A1, A2, A3), M>,
        A1: Debug + Send + 'static,
        A2: Debug + Send + 'static,
        A3: Debug + Send + 'static,
    {
        let id = identity::func_id(
            &identity::callable_name::<F>(),
            &[
                identity::arg_repr(&a1),
                identity::arg_repr(&a2),
                identity::arg_repr(&a3),
            ],
        );
        Self::build(id, f, (a1, a2, a3))
    }

    /// Wrap a function with four bound arguments.
    pub fn func4<F, M, A1, A2, A3, A4>(f: F, a1: A1, a2: A2, a3: A3, a4: A4) -> Self
    where
        F: DepCall<(A1, A2, A3, A4), M>,
        A1: Debug + Send + 'static,
        A2: Debug + Send + 'static,
        A3: Debug + Send + 'static,
        A4: Debug + Send + 'static,
    {
        let id = identity::func_id(
            &identity::callable_name::<F>(),
            &[
                identity::arg_repr(&a1),
                identity::arg_repr(&a2),
                identity::arg_repr(&a3),
                identity::arg_repr(&a4),
            ],
        );
        Self::build(id, f, (a1, a2, a3, a4))
    }

    /// Wrap a function with five bound arguments.
    pub fn func5<F, M, A1, A2, A3, A4, A5>(f: F, a1: A1, a2: A2, a3: A3, a4: A4, a5: A5) -> Self
    where
        F: DepCall<(A1, A2, A3, A4, A5), M>,
        A1: Debug + Send + 'static,
        A2: Debug + Send + 'static,
        A3: Debug + Send + 'static,
        A4: Debug + Send + 'static,
        A5: Debug + Send + 'static,
    {
        let id = identity::func_id(
            &identity::callable_name::<F>(),
            &[
                identity::arg_repr(&a1),
                identity::arg_repr(&a2),
                identity::arg_repr(&a3),
                identity::arg_repr(&a4),
                identity::arg_repr(&a5),
            ],
        );
        Self::build(id, f, (a1, a2, a3, a4, a5))
    }

    /// Wrap a function with six bound arguments.
    #[allow(clippy::too_many_arguments)]
    pub fn func6<F, M, A1, A2, A3, A4, A5, A6>(
        f: F,
        a1: A1,
        a2: A2,
        a3: A3,
        a4: A4,
        a5: A5,
        a6: A6,
    ) -> Self
    where
        F: DepCall<(A1, A2, A3, A4, A5, A6), M>,
        A1: Debug + Send + 'static,
        A2: Debug + Send + 'static,
        A3: Debug + Send + 'static,
        A4: Debug + Send + 'static,
        A5: Debug + Send + 'static,
        A6: Debug + Send + 'static,
    {
        let id = identity::func_id(
            &identity::callable_name::<F>(),
            &[
                identity::arg_repr(&a1),
                identity::arg_repr(&a2),
                identity::arg_repr(&a3),
                identity::arg_repr(&a4),
                identity::arg_repr(&a5),
                identity::arg_repr(&a6),
            ],
        );
        Self::build(id, f, (a1, a2, a3, a4, a5, a6))
    }

    /// Wrap a method bound to a receiver, with no further arguments.
    ///
    /// The receiver is passed to the callable as its first argument (after
    /// the context, if the callable takes one):
    ///
    /// ```ignore
    /// Dep::method(&dev, "Deploy", |ctx, dev: Arc<Dev>| async move {
    ///     dev.deploy(ctx).await
    /// })
    /// ```
    ///
    /// Identity is `receiver_id.Method()`; two receivers reporting equal
    /// identities share nodes, matching the value-based receiver semantics
    /// of [`identity::debug_id`].
    pub fn method<R, F, M>(recv: &Arc<R>, method: &str, f: F) -> Self
    where
        R: Identify + Send + Sync + 'static,
        F: DepCall<(Arc<R>,), M>,
    {
        let id = identity::meth_id(&recv.id(), method, &[]);
        Self::build(id, f, (Arc::clone(recv),))
    }

    /// Wrap a method bound to a receiver, with one argument.
    pub fn method1<R, F, M, A1>(recv: &Arc<R>, method: &str, f: F, a1: A1) -> Self
    where
        R: Identify + Send + Sync + 'static,
        F: DepCall<(Arc<R>, A1), M>,
        A1: Debug + Send + 'static,
    {
        let id = identity::meth_id(&recv.id(), method, &[identity::arg_repr(&a1)]);
        Self::build(id, f, (Arc::clone(recv), a1))
    }

    /// Wrap a method bound to a receiver, with two arguments.
    pub fn method2<R, F, M, A1, A2>(recv: &Arc<R>, method: &str, f: F, a1: A1, a2: A2) -> Self
    where
        R: Identify + Send + Sync + 'static,
        F: DepCall<(Arc<R>, A1, A2), M>,
        A1: Debug + Send + 'static,
        A2: Debug + Send + 'static,
    {
        let id = identity::meth_id(
            &recv.id(),
            method,
            &[identity::arg_repr(&a1), identity::arg_repr(&a2)],
        );
        Self::build(id, f, (Arc::clone(recv), a1, a2))
    }

    /// Wrap a method bound to a receiver, with three arguments.
    pub fn method3<R, F, M, A1, A2, A3>(
        recv: &Arc<R>,
        method: &str,
        f: F,
        a1: A1,
        a2: A2,
        a3: A3,
    ) -> Self
    where
        R: Identify + Send + Sync + 'static,
        F: DepCall<(Arc<R>, A1, A2, A3), M>,
        A1: Debug + Send + 'static,
        A2: Debug + Send + 'static,
        A3: Debug + Send + 'static,
    {
        let id = identity::meth_id(
            &recv.id(),
            method,
            &[
                identity::arg_repr(&a1),
                identity::arg_repr(&a2),
                identity::arg_repr(&a3),
            ],
        );
        Self::build(id, f, (Arc::clone(recv), a1, a2, a3))
    }

    /// Wrap a method bound to a receiver, with four arguments.
    #[allow(clippy::too_many_arguments)]
    pub fn method4<R, F, M, A1, A2, A3, A4>(
        recv: &Arc<R>,
        method: &str,
        f: F,
        a1: A1,
        a2: A2,
        a3: A3,
        a4: A4,
    ) -> Self
    where
        R: Identify + Send + Sync + 'static,
        F: DepCall<(Arc<R>, A1, A2, A3, A4), M>,
        A1: Debug + Send + 'static,
        A2: Debug + Send + 'static,
        A3: Debug + Send + 'static,
        A4: Debug + Send + 'static,
    {
        let id = identity::meth_id(
            &recv.id(),
            method,
            &[
                identity::arg_repr(&a1),
                identity::arg_repr(&a2),
                identity::arg_repr(&a3),
                identity::arg_repr(&a4),
            ],
        );
        Self::build(id, f, (Arc::clone(recv), a1, a2, a3, a4))
    }

    /// Wrap a method bound to a receiver, with five arguments.
    #[allow(clippy::too_many_arguments)]
    pub fn method5<R, F, M, A1, A2, A3, A4, A5>(
        recv: &Arc<R>,
        method: &str,
        f: F,
        a1: A1,
        a2: A2,
        a3: A3,
        a4: A4,
        a5: A5,
    ) -> Self
    where
        R: Identify + Send + Sync + 'static,
        F: DepCall<(Arc<R>, A1, A2, A3, A4, A5), M>,
        A1: Debug + Send + 'static,
        A2: Debug + Send + 'static,
        A3: Debug + Send + 'static,
        A4: Debug + Send + 'static,
        A5: Debug + Send + 'static,
    {
        let id = identity::meth_id(
            &recv.id(),
            method,
            &[
                identity::arg_repr(&a1),
                identity::arg_repr(&a2),
                identity::arg_repr(&a3),
                identity::arg_repr(&a4),
                identity::arg_repr(&a5),
            ],
        );
        Self::build(id, f, (Arc::clone(recv), a1, a2, a3, a4, a5))
    }

    /// Wrap a method bound to a receiver, with six arguments.
    #[allow(clippy::too_many_arguments)]
    pub fn method6<R, F, M, A1, A2, A3, A4, A5, A6>(
        recv: &Arc<R>,
        method: &str,
        f: F,
        a1: A1,
        a2: A2,
        a3: A3,
        a4: A4,
        a5: A5,
        a6: A6,
    ) -> Self
    where
        R: Identify + Send + Sync + 'static,
        F: DepCall<(Arc<R>, A1, A2, A3, A4, A5, A6), M>,
        A1: Debug + Send + 'static,
        A2: Debug + Send + 'static,
        A3: Debug + Send + 'static,
        A4: Debug + Send + 'static,
        A5: Debug + Send + 'static,
        A6: Debug + Send + 'static,
    {
        let id = identity::meth_id(
            &recv.id(),
            method,
            &[
                identity::arg_repr(&a1),
                identity::arg_repr(&a2),
                identity::arg_repr(&a3),
                identity::arg_repr(&a4),
                identity::arg_repr(&a5),
                identity::arg_repr(&a6),
            ],
        );
        Self::build(id, f, (Arc::clone(recv), a1, a2, a3, a4, a5, a6))
    }
}

/// Build a `Vec<Box<dyn Dependency>>` from a list of dependency values.
///
/// ```ignore
/// ctx.serial(&parent, deps![Dep::func(compile), Dep::func1(package, "deb")]).await?;
/// ```
#[macro_export]
macro_rules! deps {
    ($($dep:expr),* $(,)?) => {
        vec![$(Box::new($dep) as Box<dyn $crate::Dependency>),*]
    };
}
