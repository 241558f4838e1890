//! Interception: routing host callbacks through zones.
//!
//! A [`Host`] is a registry of named methods that accept callbacks, e.g. a
//! timer facility. [`patch`] rewires selected methods so that every call
//! flows through the zone that is current *at call time*: the original
//! method is captured into a delegate stored on the patching zone's
//! extension chain, callback arguments are bound to the caller's zone on
//! the way through, and the host's slot is replaced by a thin forwarder
//! that re-resolves the delegate on every invocation.
//!
//! Module layout:
//! - [`args`]: dynamic call arguments and the argument binder
//! - [`host`]: the method registry
//! - [`patch`]: the delegate/forwarder rewiring

pub mod args;
pub mod host;
pub mod patch;

pub use args::{bind_args, Arg, CallArgs, Callable};
pub use host::Host;
pub use patch::patch;
