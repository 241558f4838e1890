//! Time sources and the deferred-call queue.
//!
//! This module provides the clock abstraction and the timer queue used by
//! deferred-call hosts:
//! - [`TimeSource`]: trait over "what time is it now"
//! - [`WallClock`]: monotonic wall time, for production
//! - [`VirtualClock`]: manually advanced time, for deterministic tests
//! - [`TimerQueue`]: deadline-ordered callback queue driven by a clock
//!
//! # Virtual vs Wall Time
//!
//! A [`TimerQueue`] built on a [`VirtualClock`] never waits: tests advance
//! the clock explicitly and drain due callbacks with
//! [`TimerQueue::fire_due`] or [`TimerQueue::run_until_idle`], which makes
//! elapsed-time behavior exactly reproducible. The same queue code runs
//! against [`WallClock`] in production.

mod clock;
mod queue;

pub use clock::{TimeSource, VirtualClock, WallClock};
pub use queue::TimerQueue;
