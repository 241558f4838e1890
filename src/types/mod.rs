//! Core types shared across the crate.
//!
//! This module contains the small foundational types the rest of the crate
//! builds on:
//!
//! - [`id`]: zone identifiers and the nanosecond [`Time`] timestamp
//! - [`value`]: plain data values carried in extensions and call arguments
//! - [`panic`]: best-effort rendering of a caught panic payload
//!
//! Everything here is cheap to clone and free of interior locking.

pub mod id;
pub mod panic;
pub mod value;

pub use id::{Time, ZoneId};
pub use panic::PanicPayload;
pub use value::Value;
