// src/identity.rs

//! Identity resolution for units of work.
//!
//! Every dependency carries a stable string identity; two dependencies with
//! equal identities are treated as the *same node* and execute at most once
//! per run. For bare functions the identity is the fully-qualified function
//! name plus a canonical rendering of the bound arguments. For methods it is
//! the receiver's identity, a `.`, the method name and the bound arguments:
//!
//! ```text
//! my_tool::tasks::compile()
//! my_tool::Dev { cluster: "kind" }.Deploy(["--wait"])
//! ```
//!
//! Receiver identity and method identity are composed from two explicit
//! halves rather than reconstructed from any formatted function name, so
//! distinct receivers sharing a method name can never be merged by accident.

use std::fmt::Debug;

/// A value that can report a stable identity for itself.
///
/// Receiver types implement this so their methods can be registered as
/// dependencies. [`debug_id`] gives a structural implementation for types
/// deriving `Debug`:
///
/// ```
/// use rundag::identity::{debug_id, Identify};
///
/// #[derive(Debug)]
/// struct Dev {
///     cluster: String,
/// }
///
/// impl Identify for Dev {
///     fn id(&self) -> String {
///         debug_id(self)
///     }
/// }
/// ```
pub trait Identify {
    /// Stable identity string, unique within a run.
    fn id(&self) -> String;
}

// Plain strings are usable as parent identities, e.g. the run root ".".
impl Identify for str {
    fn id(&self) -> String {
        self.to_string()
    }
}

impl Identify for String {
    fn id(&self) -> String {
        self.clone()
    }
}

/// Structural identity from a type's `Debug` representation.
///
/// Produces `<fully-qualified-type-name> { <fields> }`, so two distinct
/// instances with equal field values share an identity. This is value-based
/// on purpose: "the same logical receiver" means equal configuration, not
/// equal addresses.
pub fn debug_id<T: Debug>(value: &T) -> String {
    let full = std::any::type_name::<T>();
    let short = full.rsplit("::").next().unwrap_or(full);
    let rendered = format!("{value:?}");
    match rendered.strip_prefix(short) {
        Some(rest) => format!("{full}{rest}"),
        None => format!("{full}{rendered}"),
    }
}

/// Canonical, type-revealing representation of one bound argument.
///
/// Debug formatting keeps `"1"` and `1` distinct.
pub fn arg_repr<T: Debug>(value: &T) -> String {
    format!("{value:?}")
}

/// Identity of a bare function call: `name(arg1, arg2, ...)`.
pub fn func_id(name: &str, args: &[String]) -> String {
    format!("{name}({})", args.join(", "))
}

/// Identity of a method call bound to a receiver:
/// `receiver_id.Method(arg1, ...)`.
pub fn meth_id(receiver_id: &str, method: &str, args: &[String]) -> String {
    format!("{receiver_id}.{method}({})", args.join(", "))
}

/// Fully-qualified name of a callable, from its unique item type.
///
/// For function items this resolves to the declaring path, e.g.
/// `my_tool::tasks::compile`, independent of the call site. Closures render
/// with a `{{closure}}` suffix; prefer [`Dep::func_named`] for those.
///
/// [`Dep::func_named`]: crate::dep::Dep::func_named
pub(crate) fn callable_name<F>() -> String {
    std::any::type_name::<F>().to_string()
}
