//! The thread-local current-zone cell.
//!
//! Each thread carries exactly one cell holding the zone it is currently
//! executing in, bootstrapped to a fresh root zone on first touch. The
//! cell is only ever updated through [`enter`], which returns a guard that
//! restores the previous zone on drop. Because guards are stack-scoped,
//! nested runs save and restore in strict LIFO order, and an unwinding
//! panic restores the cell exactly like a normal return.

use crate::zone::zone::Zone;
use std::cell::RefCell;

struct ThreadZones {
    root: Zone,
    current: RefCell<Zone>,
}

impl ThreadZones {
    fn new() -> Self {
        let root = Zone::new_root();
        Self {
            root: root.clone(),
            current: RefCell::new(root),
        }
    }
}

thread_local! {
    static THREAD_ZONES: ThreadZones = ThreadZones::new();
}

/// Returns the zone the current thread is executing in.
pub(crate) fn current() -> Zone {
    THREAD_ZONES.with(|zones| zones.current.borrow().clone())
}

/// Returns the current thread's root zone.
pub(crate) fn root() -> Zone {
    THREAD_ZONES.with(|zones| zones.root.clone())
}

/// Makes `zone` current for this thread until the returned guard drops.
pub(crate) fn enter(zone: Zone) -> EnterGuard {
    let prev = THREAD_ZONES.with(|zones| {
        let mut current = zones.current.borrow_mut();
        std::mem::replace(&mut *current, zone)
    });
    EnterGuard { prev: Some(prev) }
}

/// Restores the previously current zone on drop.
pub(crate) struct EnterGuard {
    prev: Option<Zone>,
}

impl Drop for EnterGuard {
    fn drop(&mut self) {
        if let Some(prev) = self.prev.take() {
            THREAD_ZONES.with(|zones| {
                *zones.current.borrow_mut() = prev;
            });
        }
    }
}
