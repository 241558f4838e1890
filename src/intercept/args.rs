//! Dynamic call arguments and the argument binder.
//!
//! Host methods take a flat argument list whose shape is only known at
//! run time. [`CallArgs`] models that list; each [`Arg`] is either plain
//! data or a callback. [`bind_args`] is the piece the patch layer uses to
//! capture context: it walks a list and replaces every callback with a
//! version bound to the current zone.

use crate::tracing_compat::trace;
use crate::types::Value;
use crate::zone::zone::Zone;
use core::fmt;
use std::sync::Arc;

/// A dynamically typed callback.
///
/// Callables take a [`CallArgs`] list and may return a [`Value`]; `None`
/// means the call produced nothing. They are `Send + Sync` so a host can
/// store them and fire them from any thread.
#[derive(Clone)]
pub struct Callable {
    inner: Arc<dyn Fn(CallArgs) -> Option<Value> + Send + Sync>,
}

impl Callable {
    /// Wraps a closure as a callable.
    pub fn new(f: impl Fn(CallArgs) -> Option<Value> + Send + Sync + 'static) -> Self {
        Self { inner: Arc::new(f) }
    }

    /// Wraps a plain closure that ignores its arguments and returns
    /// nothing. Convenient for fire-and-forget callbacks.
    pub fn from_fn(f: impl Fn() + Send + Sync + 'static) -> Self {
        Self::new(move |_args| {
            f();
            None
        })
    }

    /// Invokes the callable.
    pub fn call(&self, args: CallArgs) -> Option<Value> {
        (self.inner)(args)
    }
}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Callable(..)")
    }
}

/// One argument in a dynamic call.
#[derive(Debug, Clone)]
pub enum Arg {
    /// Plain data, passed through untouched.
    Value(Value),
    /// A callback. The argument binder replaces these with zone-bound
    /// versions.
    Callback(Callable),
}

impl Arg {
    /// Returns `true` if this argument is a callback.
    #[must_use]
    pub const fn is_callback(&self) -> bool {
        matches!(self, Self::Callback(_))
    }

    /// Returns the data value if this argument holds one.
    #[must_use]
    pub const fn as_value(&self) -> Option<&Value> {
        match self {
            Self::Value(v) => Some(v),
            Self::Callback(_) => None,
        }
    }

    /// Returns the callback if this argument holds one.
    #[must_use]
    pub const fn as_callback(&self) -> Option<&Callable> {
        match self {
            Self::Callback(c) => Some(c),
            Self::Value(_) => None,
        }
    }

    /// Returns the argument shape, for diagnostics.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Value(v) => v.type_name(),
            Self::Callback(_) => "callback",
        }
    }
}

impl From<Value> for Arg {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

impl From<Callable> for Arg {
    fn from(callable: Callable) -> Self {
        Self::Callback(callable)
    }
}

/// A flat, dynamically typed argument list.
#[derive(Debug, Clone, Default)]
pub struct CallArgs {
    args: Vec<Arg>,
}

impl CallArgs {
    /// Creates an empty argument list.
    #[must_use]
    pub const fn new() -> Self {
        Self { args: Vec::new() }
    }

    /// Creates a list from already-built arguments.
    #[must_use]
    pub fn from_args(args: Vec<Arg>) -> Self {
        Self { args }
    }

    /// Appends a data value.
    #[must_use]
    pub fn with_value(mut self, value: impl Into<Value>) -> Self {
        self.args.push(Arg::Value(value.into()));
        self
    }

    /// Appends a callback.
    #[must_use]
    pub fn with_callback(mut self, callback: Callable) -> Self {
        self.args.push(Arg::Callback(callback));
        self
    }

    /// Returns the number of arguments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.args.len()
    }

    /// Returns `true` if the list is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    /// Returns the argument at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Arg> {
        self.args.get(index)
    }

    /// Iterates over the arguments in order.
    pub fn iter(&self) -> std::slice::Iter<'_, Arg> {
        self.args.iter()
    }

    /// Returns a new list holding the arguments from `from` onward.
    #[must_use]
    pub fn tail(&self, from: usize) -> Self {
        Self {
            args: self.args.get(from..).unwrap_or(&[]).to_vec(),
        }
    }
}

impl<'a> IntoIterator for &'a CallArgs {
    type Item = &'a Arg;
    type IntoIter = std::slice::Iter<'a, Arg>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Binds every callback argument to the current zone.
///
/// The list is scanned from the end; each [`Arg::Callback`] is replaced
/// with [`Zone::bind_callable`] applied to it, so each callback gets its
/// own child fork of the zone that is current right now. Data arguments
/// pass through untouched. This mirrors how a patched method captures
/// context for the callbacks handed to it.
#[must_use]
pub fn bind_args(args: CallArgs) -> CallArgs {
    let zone = Zone::current();
    let mut args = args;
    for arg in args.args.iter_mut().rev() {
        if let Arg::Callback(callback) = arg {
            let bound = zone.bind_callable(callback.clone());
            *arg = Arg::Callback(bound);
        }
    }
    trace!(zone = %zone.id(), argc = args.len(), "callback arguments bound");
    args
}
