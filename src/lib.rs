//! Zonal: execution contexts that survive callback boundaries.
//!
//! # Overview
//!
//! A [`Zone`] is a node in a tree of execution contexts. Each thread has a
//! root zone; child zones are created with [`Zone::fork`] and inherit the
//! extensions of every ancestor. Running a closure inside a zone makes that
//! zone "current" for the duration of the call, fires its enter/leave hooks,
//! and contains panics according to the zone's panic policy.
//!
//! The point of the exercise is that a zone follows work across callback
//! boundaries: [`Zone::bind`] captures a zone at one point in time and
//! replays it whenever the bound function is later called, and
//! [`intercept::patch`] rewires host methods so that callbacks handed to
//! them are bound automatically. A callback scheduled from inside a zone
//! then runs inside (a child of) that zone, no matter which component ends
//! up invoking it.
//!
//! # Core Guarantees
//!
//! - **Inheritance**: extension lookup walks the parent chain; a child sees
//!   everything its ancestors set unless it shadows the key locally
//! - **Balanced transitions**: entering a zone always restores the previous
//!   current zone on exit, even when the body or a hook panics
//! - **Hook ordering**: `on_enter` fires before the body, `on_leave` after,
//!   and `on_leave` still fires when the body panics
//! - **Panic containment**: a panic inside [`Zone::run`] is caught, logged,
//!   and swallowed by default; the policy is configurable per zone and
//!   process wide
//! - **Stable identity**: every zone has a process-unique [`ZoneId`]
//!
//! # Module Structure
//!
//! - [`zone`]: The zone tree, the per-thread current-zone cell, and the run
//!   protocol
//! - [`intercept`]: Host method patching and callback argument binding
//! - [`time`]: Timer queue and clock sources for scheduling bound callbacks
//! - [`types`]: Identifiers, extension values, and panic payloads
//! - [`config`]: Process-wide configuration with environment overrides
//! - [`error`]: Error types
//!
//! # Example
//!
//! ```
//! use zonal::{Extensions, Value, Zone};
//!
//! let request = Zone::current().fork(
//!     Extensions::new().with_value("request_id", Value::from(42u64)),
//! );
//! let seen = request.run(|| Zone::current().value("request_id"));
//! assert_eq!(seen.flatten(), Some(Value::Uint(42)));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::module_inception)]
#![allow(clippy::doc_markdown)]

pub mod config;
pub mod error;
pub mod intercept;
#[cfg(any(test, feature = "test-internals"))]
pub mod test_utils;
pub mod time;
pub mod tracing_compat;
pub mod types;
pub mod zone;

// Re-exports for convenient access to core types
pub use config::{ConfigError, PanicResponse, ZoneConfig};
pub use error::{Error, ErrorKind, Result};
pub use intercept::{bind_args, patch, Arg, CallArgs, Callable, Host};
pub use time::{TimeSource, TimerQueue, VirtualClock, WallClock};
pub use types::{PanicPayload, Time, Value, ZoneId};
pub use zone::{Bound, ExtValue, Extensions, Hook, Zone, ON_ENTER, ON_LEAVE, PANIC_RESPONSE};
