//! Zones: forkable execution contexts with inherited extensions.
//!
//! A [`Zone`] is a node in a tree of execution contexts. Each zone carries
//! a mutable set of named extensions; lookups that miss locally fall back
//! to the parent chain, so a child inherits everything it does not
//! override. The per-thread current zone is tracked by a cell that
//! [`Zone::run`] saves and restores around every callback, which is what
//! lets hooks and patched hosts observe "which context is live right now"
//! without threading a context argument through every call.
//!
//! Module layout:
//! - [`zone`]: the zone node, forking, and chain lookup
//! - [`extensions`]: extension values, hooks, and the builder
//! - [`current`]: the thread-local current-zone cell and its guard
//! - [`run`]: the run/bind protocol and panic containment

pub mod current;
pub mod extensions;
pub mod run;
#[allow(clippy::module_inception)]
pub mod zone;

pub use extensions::{ExtValue, Extensions, Hook, ON_ENTER, ON_LEAVE, PANIC_RESPONSE};
pub use run::Bound;
pub use zone::Zone;
