//! The deadline-ordered deferred-call queue.

use crate::error::{Error, ErrorKind, Result};
use crate::intercept::args::{Arg, CallArgs, Callable};
use crate::intercept::host::Host;
use crate::time::clock::{TimeSource, VirtualClock, WallClock};
use crate::tracing_compat::{trace, warn};
use crate::types::{Time, Value};
use core::fmt;
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// A pending deferred call.
struct TimerEntry {
    deadline: Time,
    seq: u64,
    callback: Callable,
    args: CallArgs,
}

impl PartialEq for TimerEntry {
    fn eq(&self, other: &Self) -> bool {
        self.deadline == other.deadline && self.seq == other.seq
    }
}

impl Eq for TimerEntry {}

impl PartialOrd for TimerEntry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TimerEntry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.deadline, self.seq).cmp(&(other.deadline, other.seq))
    }
}

struct QueueState {
    entries: BinaryHeap<Reverse<TimerEntry>>,
    next_seq: u64,
}

/// A deadline-ordered queue of deferred calls, driven by a clock source.
///
/// Entries fire in `(deadline, seq)` order: earlier deadlines first, and
/// among equal deadlines, scheduling order. The queue never spawns a
/// thread or sleeps. The owner drives it by calling [`fire_due`] after
/// time has passed, or, on a virtual clock, [`run_until_idle`] to advance
/// time to each deadline in turn.
///
/// `TimerQueue` is a cheap clone-able handle; clones share the same
/// queue. Callbacks are invoked without the queue lock held, so a firing
/// callback may schedule further entries.
///
/// [`fire_due`]: TimerQueue::fire_due
/// [`run_until_idle`]: TimerQueue::run_until_idle
#[derive(Clone)]
pub struct TimerQueue {
    clock: Arc<dyn TimeSource>,
    virtual_clock: Option<Arc<VirtualClock>>,
    state: Arc<Mutex<QueueState>>,
}

impl TimerQueue {
    /// Creates a queue driven by the given clock source.
    #[must_use]
    pub fn new(clock: Arc<dyn TimeSource>) -> Self {
        Self {
            clock,
            virtual_clock: None,
            state: Arc::new(Mutex::new(QueueState {
                entries: BinaryHeap::new(),
                next_seq: 1,
            })),
        }
    }

    /// Creates a queue on a fresh wall clock.
    #[must_use]
    pub fn wall() -> Self {
        Self::new(Arc::new(WallClock::new()))
    }

    /// Creates a queue on a fresh virtual clock, returning both.
    ///
    /// Only a queue built this way can advance time in
    /// [`run_until_idle`](TimerQueue::run_until_idle).
    #[must_use]
    pub fn virtual_time() -> (Self, Arc<VirtualClock>) {
        let clock = Arc::new(VirtualClock::new());
        let time_source: Arc<dyn TimeSource> = clock.clone();
        let mut queue = Self::new(time_source);
        queue.virtual_clock = Some(Arc::clone(&clock));
        (queue, clock)
    }

    /// Returns the queue's current time.
    #[must_use]
    pub fn now(&self) -> Time {
        self.clock.now()
    }

    /// Schedules `callback` to fire `delay` from now with `args`.
    ///
    /// Returns the entry's sequence number. Scheduling directly bypasses
    /// any zone machinery: the callback fires exactly as given, in
    /// whatever zone is current when the queue is drained.
    pub fn schedule(&self, delay: Duration, callback: Callable, args: CallArgs) -> u64 {
        let deadline = self.clock.now() + delay;
        let mut state = self.state.lock().expect("queue lock poisoned");
        let seq = state.next_seq;
        state.next_seq += 1;
        state.entries.push(Reverse(TimerEntry {
            deadline,
            seq,
            callback,
            args,
        }));
        drop(state);
        trace!(seq, deadline = %deadline, "timer scheduled");
        seq
    }

    /// Returns the number of pending entries.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.state.lock().expect("queue lock poisoned").entries.len()
    }

    /// Returns the earliest pending deadline, if any.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Time> {
        self.state
            .lock()
            .expect("queue lock poisoned")
            .entries
            .peek()
            .map(|Reverse(entry)| entry.deadline)
    }

    /// Fires every entry whose deadline has been reached.
    ///
    /// Entries are popped one at a time and invoked without the lock
    /// held, so a callback that schedules new due entries gets them fired
    /// in the same drain. Returns the number of entries fired.
    pub fn fire_due(&self) -> usize {
        let mut fired = 0;
        loop {
            let now = self.clock.now();
            let due = {
                let mut state = self.state.lock().expect("queue lock poisoned");
                match state.entries.peek() {
                    Some(Reverse(entry)) if entry.deadline <= now => {
                        state.entries.pop().map(|Reverse(entry)| entry)
                    }
                    _ => None,
                }
            };
            let Some(entry) = due else {
                break;
            };
            trace!(seq = entry.seq, deadline = %entry.deadline, "timer fired");
            let _ = entry.callback.call(entry.args);
            fired += 1;
        }
        fired
    }

    /// Drains the queue, advancing a virtual clock from deadline to
    /// deadline until nothing is pending.
    ///
    /// On a wall-clock queue this fires only what is already due and then
    /// returns; wall time cannot be advanced. Returns the total number of
    /// entries fired.
    pub fn run_until_idle(&self) -> usize {
        let mut fired = self.fire_due();
        while let (Some(clock), Some(deadline)) =
            (self.virtual_clock.as_deref(), self.next_deadline())
        {
            clock.advance_to(deadline);
            let count = self.fire_due();
            fired += count;
            if count == 0 {
                break;
            }
        }
        fired
    }

    /// Installs this queue on `host` as a deferred-call method.
    ///
    /// The method accepts `[callback, delay?, rest...]`: the callback to
    /// fire, an optional delay (a duration value or a millisecond count),
    /// and further arguments passed to the callback at fire time. It
    /// returns the sequence number as [`Value::Uint`], or `None` when the
    /// arguments are malformed.
    pub fn install(&self, host: &Host, method: impl Into<String>) {
        let method = method.into();
        let queue = self.clone();
        let label = method.clone();
        host.install(
            method,
            Callable::new(move |args| match queue.try_schedule_from_args(args) {
                Ok(seq) => Some(Value::Uint(seq)),
                Err(err) => {
                    warn!(method = %label, error = %err, "rejecting malformed deferred call");
                    let _ = (&label, &err);
                    None
                }
            }),
        );
    }

    /// Parses a `[callback, delay?, rest...]` argument list and schedules
    /// it.
    ///
    /// The delay may be [`Value::Duration`], or a non-negative
    /// millisecond count as [`Value::Uint`] or [`Value::Int`]; omitted
    /// means fire at the next drain. Anything else is rejected with
    /// [`ErrorKind::InvalidArgument`].
    pub fn try_schedule_from_args(&self, args: CallArgs) -> Result<u64> {
        let callback = match args.get(0) {
            Some(Arg::Callback(callback)) => callback.clone(),
            Some(other) => {
                return Err(Error::new(ErrorKind::InvalidArgument).with_message(format!(
                    "first argument must be a callback, got {}",
                    other.type_name()
                )))
            }
            None => {
                return Err(Error::new(ErrorKind::InvalidArgument)
                    .with_message("first argument must be a callback, got nothing"))
            }
        };
        let delay = match args.get(1) {
            None => Duration::ZERO,
            Some(Arg::Value(Value::Duration(delay))) => *delay,
            Some(Arg::Value(Value::Uint(millis))) => Duration::from_millis(*millis),
            Some(Arg::Value(Value::Int(millis))) if *millis >= 0 => {
                Duration::from_millis(u64::try_from(*millis).unwrap_or(0))
            }
            Some(other) => {
                return Err(Error::new(ErrorKind::InvalidArgument).with_message(format!(
                    "delay must be a duration or non-negative millisecond count, got {}",
                    other.type_name()
                )))
            }
        };
        Ok(self.schedule(delay, callback, args.tail(2)))
    }
}

impl fmt::Debug for TimerQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerQueue")
            .field("pending", &self.pending())
            .field("virtual", &self.virtual_clock.is_some())
            .finish()
    }
}
