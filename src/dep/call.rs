// src/dep/call.rs

//! Uniform invocation of heterogeneous callables.
//!
//! [`DepCall`] erases the differences between the callable shapes the adapter
//! family accepts: zero to six bound arguments, with or without a leading
//! [`RunContext`], returning `()` or a `Result`. The marker type parameter
//! disambiguates which shape a given closure satisfies, the same trick axum
//! uses for its handler trait.

use std::future::Future;

use crate::context::RunContext;
use crate::errors::Result;

use super::DepFuture;

/// Return values accepted from a dependency body.
///
/// "No return value" is normalized to `Ok(())`.
pub trait IntoDepResult {
    fn into_dep_result(self) -> Result<()>;
}

impl IntoDepResult for () {
    fn into_dep_result(self) -> Result<()> {
        Ok(())
    }
}

impl<E> IntoDepResult for std::result::Result<(), E>
where
    E: Into<anyhow::Error>,
{
    fn into_dep_result(self) -> Result<()> {
        self.map_err(Into::into)
    }
}

#[doc(hidden)]
pub struct WithCtx;

#[doc(hidden)]
pub struct NoCtx;

/// A callable that can serve as a dependency body once its arguments are
/// bound.
///
/// `Args` is the tuple of bound arguments, `Marker` selects the signature
/// shape. Callers never name the marker; it is inferred from the closure.
pub trait DepCall<Args, Marker>: Send + 'static {
    /// Invoke the callable with the run context and the bound arguments.
    fn call(self, ctx: RunContext, args: Args) -> DepFuture;
}

macro_rules! impl_dep_call {
    ($($ty:ident),*) => {
        impl<F, Fut, $($ty,)*> DepCall<($($ty,)*), WithCtx> for F
        where
            F: FnOnce(RunContext, $($ty,)*) -> Fut + Send + 'static,
            Fut: Future + Send + 'static,
            Fut::Output: IntoDepResult,
            $($ty: Send + 'static,)*
        {
            #[allow(non_snake_case)]
            fn call(self, ctx: RunContext, ($($ty,)*): ($($ty,)*)) -> DepFuture {
                Box::pin(async move { self(ctx, $($ty,)*).await.into_dep_result() })
            }
        }

        impl<F, Fut, $($ty,)*> DepCall<($($ty,)*), NoCtx> for F
        where
            F: FnOnce($($ty,)*) -> Fut + Send + 'static,
            Fut: Future + Send + 'static,
            Fut::Output: IntoDepResult,
            $($ty: Send + 'static,)*
        {
            #[allow(non_snake_case)]
            fn call(self, _ctx: RunContext, ($($ty,)*): ($($ty,)*)) -> DepFuture {
                Box::pin(async move { self($($ty,)*).await.into_dep_result() })
            }
        }
    };
}

impl_dep_call!();
impl_dep_call!(A1);
impl_dep_call!(A1, A2);
impl_dep_call!(A1, A2, A3);
impl_dep_call!(A1, A2, A3, A4);
impl_dep_call!(A1, A2, A3, A4, A5);
impl_dep_call!(A1, A2, A3, A4, A5, A6);
// One extra arity so bound methods fit six arguments plus their receiver.
impl_dep_call!(A1, A2, A3, A4, A5, A6, A7);
