//! The run/bind protocol: entering zones, firing hooks, containing panics.
//!
//! [`Zone::run`] is the only way execution enters a zone. It swaps the
//! thread's current-zone cell, fires the inherited `on_enter` hook, runs
//! the body under `catch_unwind`, fires `on_leave`, and restores the cell
//! before anything escapes. The restore is backed by a drop guard, so it
//! holds on every path out, including a propagated panic.
//!
//! [`Zone::bind`] captures the current zone into a callback: it forks a
//! child once, at bind time, and every later invocation re-enters that
//! same child through the run protocol.

use crate::config::{self, PanicResponse};
use crate::error::{Error, ErrorKind, Result};
use crate::intercept::{CallArgs, Callable};
use crate::tracing_compat::{debug, error, trace, warn};
use crate::types::{PanicPayload, Value, ZoneId};
use crate::zone::current;
use crate::zone::extensions::{Extensions, ON_ENTER, ON_LEAVE, PANIC_RESPONSE};
use crate::zone::zone::Zone;
use core::fmt;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

/// A failure caught during a zone run, with the raw payload preserved so
/// the propagate response can resume the original unwind.
struct RunFailure {
    kind: ErrorKind,
    raw: Box<dyn Any + Send>,
}

impl RunFailure {
    fn new(kind: ErrorKind, raw: Box<dyn Any + Send>) -> Self {
        Self { kind, raw }
    }

    fn into_error(self, zone: ZoneId) -> Error {
        let payload = PanicPayload::from_raw(self.raw.as_ref());
        Error::new(self.kind)
            .with_zone(zone)
            .with_message(payload.into_message())
    }
}

impl Zone {
    /// Runs `f` inside this zone.
    ///
    /// The sequence is: make this zone current, fire the inherited
    /// `on_enter` hook, run `f`, fire `on_leave`, restore the previously
    /// current zone. The leave hook and the restore happen on every path;
    /// if the enter hook panics the body is skipped but the leave hook
    /// still fires.
    ///
    /// A panic in the body or a hook is caught. What happens next is
    /// decided by the nearest [`PANIC_RESPONSE`] extension on the chain,
    /// falling back to the process config: log and return `None` (the
    /// default), return `None` silently, or resume the unwind after the
    /// restore. `Some` is returned only when everything succeeded.
    ///
    /// # Example
    ///
    /// ```
    /// use zonal::{Extensions, Zone};
    ///
    /// let zone = Zone::current().fork(Extensions::new().with_value("who", "worker"));
    /// let seen = zone.run(|| {
    ///     Zone::current()
    ///         .value("who")
    ///         .and_then(|v| v.as_text().map(str::to_string))
    /// });
    /// assert_eq!(seen.flatten().as_deref(), Some("worker"));
    /// ```
    pub fn run<F, T>(&self, f: F) -> Option<T>
    where
        F: FnOnce() -> T,
    {
        match self.run_guarded(f) {
            Ok(value) => Some(value),
            Err(failure) => match self.panic_response() {
                PanicResponse::Log => {
                    error!(
                        zone = %self.id(),
                        kind = failure.kind.as_str(),
                        payload = %PanicPayload::from_raw(failure.raw.as_ref()),
                        "zone run failed; result discarded"
                    );
                    None
                }
                PanicResponse::Silent => None,
                PanicResponse::Propagate => panic::resume_unwind(failure.raw),
            },
        }
    }

    /// Runs `f` inside this zone, reporting failures to the caller
    /// instead of consulting the panic response.
    ///
    /// The run sequence is identical to [`Zone::run`]; only the failure
    /// path differs. The raw panic payload is rendered into the error
    /// message and never re-thrown.
    pub fn try_run<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce() -> T,
    {
        self.run_guarded(f)
            .map_err(|failure| failure.into_error(self.id()))
    }

    /// Runs a dynamic callable inside this zone.
    ///
    /// Returns `None` both when the callable itself returned nothing and
    /// when the run failed; deferred-call hosts treat the two the same.
    pub fn run_callable(&self, callable: &Callable, args: CallArgs) -> Option<Value> {
        self.run(|| callable.call(args)).flatten()
    }

    /// Captures this zone into `f`.
    ///
    /// A child zone is forked once, now; every [`Bound::call`] re-enters
    /// that same child. Two binds from the same zone get distinct
    /// children, so their bookkeeping never collides.
    ///
    /// # Example
    ///
    /// ```
    /// use zonal::{Extensions, Zone};
    ///
    /// let origin = Zone::current().fork(Extensions::new().with_value("who", "origin"));
    /// let bound = origin.bind(|| {
    ///     Zone::current()
    ///         .value("who")
    ///         .and_then(|v| v.as_text().map(str::to_string))
    /// });
    /// // The callback sees the captured context no matter where it is called from.
    /// assert_eq!(bound.call().flatten().as_deref(), Some("origin"));
    /// assert!(bound.zone().descends_from(&origin));
    /// ```
    pub fn bind<F, T>(&self, f: F) -> Bound<F>
    where
        F: Fn() -> T,
    {
        let zone = self.fork(Extensions::new());
        debug!(origin = %self.id(), bound = %zone.id(), "function bound to forked zone");
        Bound { zone, f }
    }

    /// Captures this zone into a dynamic callable.
    ///
    /// Same contract as [`Zone::bind`], for callables whose signature is
    /// not known at compile time. The argument binder uses this to wrap
    /// callback arguments before they reach a host.
    #[must_use]
    pub fn bind_callable(&self, callable: Callable) -> Callable {
        let zone = self.fork(Extensions::new());
        debug!(origin = %self.id(), bound = %zone.id(), "callable bound to forked zone");
        Callable::new(move |args| zone.run_callable(&callable, args))
    }

    /// The shared run body. Swaps the cell, fires hooks around the body,
    /// restores the cell, and reports the first failure.
    fn run_guarded<F, T>(&self, f: F) -> std::result::Result<T, RunFailure>
    where
        F: FnOnce() -> T,
    {
        let trace_transitions = config::get().trace_transitions;
        let guard = current::enter(self.clone());
        if trace_transitions {
            debug!(zone = %self.id(), "zone entered");
        }

        let body = match self.fire_hook(ON_ENTER) {
            Ok(()) => panic::catch_unwind(AssertUnwindSafe(f))
                .map_err(|raw| RunFailure::new(ErrorKind::CallbackPanicked, raw)),
            Err(raw) => Err(RunFailure::new(ErrorKind::HookPanicked, raw)),
        };

        let leave = self.fire_hook(ON_LEAVE);
        if trace_transitions {
            debug!(zone = %self.id(), "zone left");
        }
        drop(guard);

        match (body, leave) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(raw)) => Err(RunFailure::new(ErrorKind::HookPanicked, raw)),
            (Err(failure), Ok(())) => Err(failure),
            (Err(failure), Err(_)) => {
                debug!(zone = %self.id(), "leave hook panicked during an already-failed run");
                Err(failure)
            }
        }
    }

    /// Fires the chain-inherited hook under `name`, if any, catching its
    /// panic. The hook receives this zone even when it was registered on
    /// an ancestor.
    fn fire_hook(&self, name: &str) -> std::result::Result<(), Box<dyn Any + Send>> {
        let Some(hook) = self.hook(name) else {
            return Ok(());
        };
        trace!(zone = %self.id(), hook = name, "hook firing");
        panic::catch_unwind(AssertUnwindSafe(|| hook.call(self)))
    }

    /// Resolves the panic response for runs of this zone: the nearest
    /// [`PANIC_RESPONSE`] extension wins, then the process config.
    fn panic_response(&self) -> PanicResponse {
        match self.value(PANIC_RESPONSE) {
            None => config::get().panic_response,
            Some(Value::Text(text)) => PanicResponse::parse(&text).unwrap_or_else(|| {
                warn!(
                    zone = %self.id(),
                    value = %text,
                    "unrecognized panic_response extension; using process default"
                );
                config::get().panic_response
            }),
            Some(other) => {
                warn!(
                    zone = %self.id(),
                    slot = other.type_name(),
                    "panic_response extension must be text; using process default"
                );
                let _ = &other;
                config::get().panic_response
            }
        }
    }
}

/// A callback bound to a zone at bind time.
///
/// Created by [`Zone::bind`]. Calling it re-enters the same forked child
/// zone every time, through the full run protocol.
pub struct Bound<F> {
    zone: Zone,
    f: F,
}

impl<F, T> Bound<F>
where
    F: Fn() -> T,
{
    /// Invokes the callback inside its bound zone.
    pub fn call(&self) -> Option<T> {
        self.zone.run(&self.f)
    }

    /// Invokes the callback inside its bound zone, reporting failures.
    pub fn try_call(&self) -> Result<T> {
        self.zone.try_run(&self.f)
    }
}

impl<F> Bound<F> {
    /// Returns the zone this callback was bound to.
    #[must_use]
    pub fn zone(&self) -> &Zone {
        &self.zone
    }
}

impl<F> fmt::Debug for Bound<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bound")
            .field("zone", &self.zone.id())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::EventLog;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};

    fn init_test(name: &str) {
        crate::test_utils::init_test_logging();
        crate::test_phase!(name);
    }

    #[test]
    fn run_returns_value_and_restores_current() {
        init_test("run_returns_value_and_restores_current");
        let before = Zone::current().id();
        let zone = Zone::current().fork(Extensions::new());
        let result = zone.run(|| 41 + 1);
        assert_eq!(result, Some(42));
        assert_eq!(Zone::current().id(), before);
        crate::test_complete!("run_returns_value_and_restores_current");
    }

    #[test]
    fn current_is_the_run_zone_inside_the_body() {
        init_test("current_is_the_run_zone_inside_the_body");
        let zone = Zone::current().fork(Extensions::new());
        let inside = zone.run(|| Zone::current().id());
        assert_eq!(inside, Some(zone.id()));
        crate::test_complete!("current_is_the_run_zone_inside_the_body");
    }

    #[test]
    fn hooks_fire_in_order_around_the_body() {
        init_test("hooks_fire_in_order_around_the_body");
        let log = Arc::new(EventLog::new());
        let enter_log = Arc::clone(&log);
        let leave_log = Arc::clone(&log);
        let zone = Zone::current().fork(
            Extensions::new()
                .on_enter(move |_| enter_log.record("enter"))
                .on_leave(move |_| leave_log.record("leave")),
        );
        let body_log = Arc::clone(&log);
        zone.run(move || body_log.record("body"));
        assert_eq!(log.snapshot(), ["enter", "body", "leave"]);
        crate::test_complete!("hooks_fire_in_order_around_the_body");
    }

    #[test]
    fn inherited_hooks_receive_the_running_zone() {
        init_test("inherited_hooks_receive_the_running_zone");
        let observed = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&observed);
        let parent = Zone::current().fork(
            Extensions::new().on_enter(move |zone| sink.lock().unwrap().push(zone.id())),
        );
        let child = parent.fork(Extensions::new());
        child.run(|| {});
        assert_eq!(*observed.lock().unwrap(), [child.id()]);
        crate::test_complete!("inherited_hooks_receive_the_running_zone");
    }

    #[test]
    fn callback_panic_is_swallowed_and_cell_restored() {
        init_test("callback_panic_is_swallowed_and_cell_restored");
        let before = Zone::current().id();
        let zone = Zone::current().fork(Extensions::new());
        let result: Option<()> = zone.run(|| panic!("boom"));
        assert!(result.is_none());
        assert_eq!(Zone::current().id(), before);
        crate::test_complete!("callback_panic_is_swallowed_and_cell_restored");
    }

    #[test]
    fn enter_hook_panic_skips_body_but_fires_leave() {
        init_test("enter_hook_panic_skips_body_but_fires_leave");
        let log = Arc::new(EventLog::new());
        let leave_log = Arc::clone(&log);
        let zone = Zone::current().fork(
            Extensions::new()
                .on_enter(|_| panic!("enter failed"))
                .on_leave(move |_| leave_log.record("leave")),
        );
        let body_ran = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&body_ran);
        let result = zone.run(move || flag.store(true, Ordering::SeqCst));
        assert!(result.is_none());
        assert!(!body_ran.load(Ordering::SeqCst));
        assert_eq!(log.snapshot(), ["leave"]);
        crate::test_complete!("enter_hook_panic_skips_body_but_fires_leave");
    }

    #[test]
    fn leave_hook_panic_discards_the_result() {
        init_test("leave_hook_panic_discards_the_result");
        let zone = Zone::current().fork(Extensions::new().on_leave(|_| panic!("leave failed")));
        assert_eq!(zone.run(|| 7), None);

        let err = zone.try_run(|| 7).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::HookPanicked);
        crate::test_complete!("leave_hook_panic_discards_the_result");
    }

    #[test]
    fn try_run_classifies_callback_panics() {
        init_test("try_run_classifies_callback_panics");
        let zone = Zone::current().fork(Extensions::new());
        let err = zone.try_run::<_, ()>(|| panic!("kapow")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CallbackPanicked);
        assert_eq!(err.zone(), Some(zone.id()));
        assert_eq!(err.message(), Some("kapow"));
        crate::test_complete!("try_run_classifies_callback_panics");
    }

    #[test]
    fn try_run_classifies_enter_hook_panics() {
        init_test("try_run_classifies_enter_hook_panics");
        let zone = Zone::current().fork(Extensions::new().on_enter(|_| panic!("bad hook")));
        let err = zone.try_run(|| 1).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::HookPanicked);
        assert_eq!(err.message(), Some("bad hook"));
        crate::test_complete!("try_run_classifies_enter_hook_panics");
    }

    #[test]
    fn try_run_returns_the_value_on_success() {
        init_test("try_run_returns_the_value_on_success");
        let zone = Zone::current().fork(Extensions::new());
        assert_eq!(zone.try_run(|| "ok").unwrap(), "ok");
        crate::test_complete!("try_run_returns_the_value_on_success");
    }

    #[test]
    fn propagate_response_resumes_after_restore() {
        init_test("propagate_response_resumes_after_restore");
        let before = Zone::current().id();
        let log = Arc::new(EventLog::new());
        let leave_log = Arc::clone(&log);
        let zone = Zone::current().fork(
            Extensions::new()
                .panic_response(PanicResponse::Propagate)
                .on_leave(move |_| leave_log.record("leave")),
        );
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            let outcome: Option<()> = zone.run(|| panic!("escape"));
            outcome
        }));
        let raw = result.unwrap_err();
        assert_eq!(PanicPayload::from_raw(raw.as_ref()).message(), "escape");
        // Leave hook and restore both happened before the unwind resumed.
        assert_eq!(log.snapshot(), ["leave"]);
        assert_eq!(Zone::current().id(), before);
        crate::test_complete!("propagate_response_resumes_after_restore");
    }

    #[test]
    fn silent_response_swallows_without_propagating() {
        init_test("silent_response_swallows_without_propagating");
        let zone =
            Zone::current().fork(Extensions::new().panic_response(PanicResponse::Silent));
        let outcome: Option<()> = zone.run(|| panic!("quiet"));
        assert!(outcome.is_none());
        crate::test_complete!("silent_response_swallows_without_propagating");
    }

    #[test]
    fn panic_response_extension_is_inherited() {
        init_test("panic_response_extension_is_inherited");
        let parent =
            Zone::current().fork(Extensions::new().panic_response(PanicResponse::Propagate));
        let child = parent.fork(Extensions::new());
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            let outcome: Option<()> = child.run(|| panic!("inherited"));
            outcome
        }));
        assert!(result.is_err());
        crate::test_complete!("panic_response_extension_is_inherited");
    }

    #[test]
    fn unrecognized_panic_response_falls_back_to_default() {
        init_test("unrecognized_panic_response_falls_back_to_default");
        let zone =
            Zone::current().fork(Extensions::new().with_value(PANIC_RESPONSE, "sideways"));
        // Default response is log-and-swallow, so the panic must not escape.
        let outcome: Option<()> = zone.run(|| panic!("contained"));
        assert!(outcome.is_none());
        crate::test_complete!("unrecognized_panic_response_falls_back_to_default");
    }

    #[test]
    fn bind_forks_distinct_zones_per_bind() {
        init_test("bind_forks_distinct_zones_per_bind");
        let origin = Zone::current().fork(Extensions::new());
        let first = origin.bind(|| {});
        let second = origin.bind(|| {});
        assert_ne!(first.zone().id(), second.zone().id());
        assert!(first.zone().descends_from(&origin));
        assert!(second.zone().descends_from(&origin));
        crate::test_complete!("bind_forks_distinct_zones_per_bind");
    }

    #[test]
    fn bound_call_reenters_the_same_zone_each_time() {
        init_test("bound_call_reenters_the_same_zone_each_time");
        let observed = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&observed);
        let bound = Zone::current().bind(move || sink.lock().unwrap().push(Zone::current().id()));
        bound.call();
        bound.call();
        let seen = observed.lock().unwrap().clone();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0], bound.zone().id());
        assert_eq!(seen[1], bound.zone().id());
        crate::test_complete!("bound_call_reenters_the_same_zone_each_time");
    }

    #[test]
    fn try_call_surfaces_failures() {
        init_test("try_call_surfaces_failures");
        let bound = Zone::current().bind(|| panic!("bound boom"));
        let err = bound.try_call().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CallbackPanicked);
        assert_eq!(err.zone(), Some(bound.zone().id()));
        crate::test_complete!("try_call_surfaces_failures");
    }

    #[test]
    fn bound_callable_reenters_its_zone() {
        init_test("bound_callable_reenters_its_zone");
        let observed = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&observed);
        let origin = Zone::current().fork(Extensions::new());
        let callable = Callable::new(move |_args| {
            sink.lock().unwrap().push(Zone::current().id());
            None
        });
        let bound = origin.bind_callable(callable);
        bound.call(CallArgs::new());
        bound.call(CallArgs::new());
        let seen = observed.lock().unwrap().clone();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0], seen[1]);
        let bound_zone_id = seen[0];
        assert_ne!(bound_zone_id, origin.id());
        crate::test_complete!("bound_callable_reenters_its_zone");
    }

    #[test]
    fn run_callable_flattens_missing_results() {
        init_test("run_callable_flattens_missing_results");
        let zone = Zone::current().fork(Extensions::new());
        let some = Callable::new(|_| Some(Value::Uint(3)));
        let none = Callable::new(|_| None);
        assert_eq!(
            zone.run_callable(&some, CallArgs::new()),
            Some(Value::Uint(3))
        );
        assert_eq!(zone.run_callable(&none, CallArgs::new()), None);
        crate::test_complete!("run_callable_flattens_missing_results");
    }
}
