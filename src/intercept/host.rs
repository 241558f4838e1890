//! The host method registry.

use crate::error::{Error, ErrorKind, Result};
use crate::intercept::args::{CallArgs, Callable};
use crate::tracing_compat::{debug, trace};
use crate::types::Value;
use core::fmt;
use std::collections::BTreeMap;
use std::sync::RwLock;

/// A named registry of dynamically dispatched methods.
///
/// A host stands in for a facility that accepts callbacks: a timer
/// facility, an I/O completion source, and so on. Methods are installed
/// under names and dispatched by name through [`Host::call`]. The patch
/// layer swaps individual entries for zone-aware forwarders; the
/// `patched` flag on each entry is what keeps that swap idempotent.
///
/// Dispatch clones the callable out of the registry before invoking it,
/// so a method is free to call back into its own host.
pub struct Host {
    name: String,
    methods: RwLock<BTreeMap<String, HostEntry>>,
}

#[derive(Clone)]
struct HostEntry {
    method: Callable,
    patched: bool,
}

impl Host {
    /// Creates an empty host.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            methods: RwLock::new(BTreeMap::new()),
        }
    }

    /// Returns the host's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Installs `method` under `name`, replacing any existing entry.
    ///
    /// A replaced entry loses its `patched` flag; re-patching after a
    /// reinstall is the caller's responsibility.
    pub fn install(&self, name: impl Into<String>, method: Callable) {
        let name = name.into();
        let mut methods = self.methods.write().expect("methods lock poisoned");
        let replaced = methods
            .insert(
                name.clone(),
                HostEntry {
                    method,
                    patched: false,
                },
            )
            .is_some();
        drop(methods);
        if replaced {
            debug!(host = %self.name, method = %name, "method replaced");
        } else {
            trace!(host = %self.name, method = %name, "method installed");
        }
    }

    /// Returns the callable installed under `name`, if any.
    #[must_use]
    pub fn method(&self, name: &str) -> Option<Callable> {
        self.methods
            .read()
            .expect("methods lock poisoned")
            .get(name)
            .map(|entry| entry.method.clone())
    }

    /// Returns `true` if a method is installed under `name`.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.methods
            .read()
            .expect("methods lock poisoned")
            .contains_key(name)
    }

    /// Returns `true` if the entry under `name` has been patched.
    #[must_use]
    pub fn is_patched(&self, name: &str) -> bool {
        self.methods
            .read()
            .expect("methods lock poisoned")
            .get(name)
            .is_some_and(|entry| entry.patched)
    }

    /// Returns the installed method names, in sorted order.
    #[must_use]
    pub fn method_names(&self) -> Vec<String> {
        self.methods
            .read()
            .expect("methods lock poisoned")
            .keys()
            .cloned()
            .collect()
    }

    /// Dispatches the method under `name`.
    ///
    /// The callable is cloned out of the registry and invoked without the
    /// lock held, so methods may reenter the host (e.g. a callback that
    /// schedules another deferred call).
    pub fn call(&self, name: &str, args: CallArgs) -> Result<Option<Value>> {
        let Some(method) = self.method(name) else {
            return Err(Error::new(ErrorKind::MethodNotFound)
                .with_message(format!("host {:?} has no method {name:?}", self.name)));
        };
        trace!(host = %self.name, method = name, argc = args.len(), "method dispatched");
        Ok(method.call(args))
    }

    /// Swaps the entry under `name` for a patched forwarder. Returns
    /// `false` if no entry exists.
    pub(crate) fn replace_patched(&self, name: &str, method: Callable) -> bool {
        let mut methods = self.methods.write().expect("methods lock poisoned");
        match methods.get_mut(name) {
            Some(entry) => {
                entry.method = method;
                entry.patched = true;
                true
            }
            None => false,
        }
    }
}

impl fmt::Debug for Host {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let methods = self.methods.read().expect("methods lock poisoned");
        f.debug_struct("Host")
            .field("name", &self.name)
            .field("methods", &methods.len())
            .finish()
    }
}
