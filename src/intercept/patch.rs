//! Patching: rewiring host methods through the zone chain.

use crate::config;
use crate::intercept::args::{bind_args, Callable};
use crate::intercept::host::Host;
use crate::tracing_compat::{debug, warn};
use crate::zone::zone::Zone;

/// Patches the named methods of `host` so their callbacks are bound to
/// the zone that is current when the method is called.
///
/// For each name, two pieces are installed:
///
/// - a *delegate*, stored as a callable extension under the method name
///   on the zone that is current right now. The delegate binds callback
///   arguments with [`bind_args`] and then calls the original method;
/// - a *forwarder*, which replaces the host's entry. On every invocation
///   it re-resolves the delegate through the chain of the zone current
///   *at that moment* and calls it.
///
/// The indirection means a zone forked later can shadow the delegate
/// under the same name and see its own dispatch take effect, without the
/// host changing again.
///
/// Names that are already patched, or not installed at all, are skipped.
/// The skip on already-patched names is what makes `patch` idempotent:
/// calling it twice never stacks a forwarder on top of a forwarder. If a
/// forwarder fires while no zone on the active chain carries the
/// delegate (e.g. on a thread whose zones never patched), the call is
/// dropped with a warning and resolves to `None`.
pub fn patch(host: &Host, methods: &[&str]) {
    let zone = Zone::current();
    for &name in methods {
        if host.is_patched(name) {
            debug!(host = %host.name(), method = name, "method already patched; skipping");
            continue;
        }
        let Some(original) = host.method(name) else {
            debug!(host = %host.name(), method = name, "method not installed; skipping");
            continue;
        };

        let delegate = Callable::new(move |args| original.call(bind_args(args)));
        zone.set(name, delegate);

        let method_name = name.to_string();
        let forwarder = Callable::new(move |args| {
            let active = Zone::current();
            match active.callable(&method_name) {
                Some(delegate) => delegate.call(args),
                None => {
                    if config::get().warn_missing_delegate {
                        warn!(
                            method = %method_name,
                            zone = %active.id(),
                            "no delegate on active zone chain; dropping call"
                        );
                    }
                    None
                }
            }
        });
        host.replace_patched(name, forwarder);
        debug!(host = %host.name(), method = name, zone = %zone.id(), "method patched");
    }
}
