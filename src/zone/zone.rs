//! The zone node: forking, chain lookup, and local mutation.

use crate::intercept::Callable;
use crate::tracing_compat::{debug, trace};
use crate::types::{Value, ZoneId};
use crate::zone::current;
use crate::zone::extensions::{ExtValue, Extensions, Hook};
use core::fmt;
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

/// A node in the zone tree.
///
/// `Zone` is a cheap clone-able handle; clones share the same node.
/// Forking creates a child whose extension lookups fall back to this zone
/// and its ancestors, so a child inherits every extension it does not
/// override. Extension lookup is dynamic: a value set on a parent after a
/// child was forked is still visible to the child.
///
/// Zones are never re-parented and never removed from the tree; a zone
/// lives as long as any handle to it or to a descendant does.
///
/// # Example
///
/// ```
/// use zonal::{Extensions, Zone};
///
/// let parent = Zone::current().fork(Extensions::new().with_value("tenant", "acme"));
/// let child = parent.fork(Extensions::new());
/// let seen = child.value("tenant").and_then(|v| v.as_text().map(str::to_string));
/// assert_eq!(seen.as_deref(), Some("acme"));
/// ```
#[derive(Clone)]
pub struct Zone {
    inner: Arc<ZoneInner>,
}

struct ZoneInner {
    id: ZoneId,
    parent: Option<Zone>,
    extensions: RwLock<BTreeMap<String, ExtValue>>,
}

impl Zone {
    /// Creates a parentless zone. Each thread gets one as its root.
    pub(crate) fn new_root() -> Self {
        let zone = Self {
            inner: Arc::new(ZoneInner {
                id: ZoneId::next(),
                parent: None,
                extensions: RwLock::new(BTreeMap::new()),
            }),
        };
        trace!(zone = %zone.id(), "root zone created");
        zone
    }

    /// Returns the zone the current thread is executing in.
    #[must_use]
    pub fn current() -> Self {
        current::current()
    }

    /// Returns the current thread's root zone.
    #[must_use]
    pub fn root() -> Self {
        current::root()
    }

    /// Forks a child zone carrying the given extensions.
    ///
    /// The child gets a fresh process-wide id and this zone as its parent.
    /// Forking does not enter the child; pair it with [`Zone::run`].
    #[must_use]
    pub fn fork(&self, extensions: Extensions) -> Self {
        let child = Self {
            inner: Arc::new(ZoneInner {
                id: ZoneId::next(),
                parent: Some(self.clone()),
                extensions: RwLock::new(extensions.into_entries()),
            }),
        };
        debug!(parent = %self.id(), child = %child.id(), "zone forked");
        child
    }

    /// Returns this zone's id.
    #[must_use]
    pub fn id(&self) -> ZoneId {
        self.inner.id
    }

    /// Returns the parent zone, or `None` for a root.
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        self.inner.parent.clone()
    }

    /// Returns `true` if this zone has no parent.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.inner.parent.is_none()
    }

    /// Returns `true` if `ancestor` appears strictly above this zone in
    /// the parent chain.
    #[must_use]
    pub fn descends_from(&self, ancestor: &Self) -> bool {
        let mut next = self.inner.parent.clone();
        while let Some(zone) = next {
            if zone.id() == ancestor.id() {
                return true;
            }
            next = zone.inner.parent.clone();
        }
        false
    }

    /// Looks up an extension, falling back through the parent chain.
    ///
    /// The nearest zone that carries `name` wins, so a local slot shadows
    /// an inherited one. The slot is cloned out; holding the result does
    /// not lock the zone.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<ExtValue> {
        if let Some(value) = self.get_local(name) {
            return Some(value);
        }
        let mut next = self.inner.parent.clone();
        while let Some(zone) = next {
            if let Some(value) = zone.get_local(name) {
                return Some(value);
            }
            next = zone.inner.parent.clone();
        }
        None
    }

    /// Looks up an extension on this zone only, without chain fallback.
    #[must_use]
    pub fn get_local(&self, name: &str) -> Option<ExtValue> {
        self.inner
            .extensions
            .read()
            .expect("extensions lock poisoned")
            .get(name)
            .cloned()
    }

    /// Sets an extension on this zone.
    ///
    /// The slot becomes visible to this zone and, through chain fallback,
    /// to every descendant that does not shadow it. Hooks use this to
    /// stash bookkeeping on the zone they are fired for.
    pub fn set(&self, name: impl Into<String>, value: impl Into<ExtValue>) {
        let name = name.into();
        let value = value.into();
        trace!(zone = %self.id(), key = %name, slot = value.type_name(), "extension set");
        self.inner
            .extensions
            .write()
            .expect("extensions lock poisoned")
            .insert(name, value);
    }

    /// Looks up a data value through the chain.
    #[must_use]
    pub fn value(&self, name: &str) -> Option<Value> {
        self.get(name).and_then(ExtValue::into_value)
    }

    /// Looks up a callable through the chain.
    #[must_use]
    pub fn callable(&self, name: &str) -> Option<Callable> {
        self.get(name).and_then(ExtValue::into_callable)
    }

    /// Looks up a hook through the chain.
    pub(crate) fn hook(&self, name: &str) -> Option<Hook> {
        self.get(name).and_then(ExtValue::into_hook)
    }
}

impl fmt::Debug for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Zone")
            .field("id", &self.inner.id)
            .field("parent", &self.inner.parent.as_ref().map(Zone::id))
            .finish_non_exhaustive()
    }
}
