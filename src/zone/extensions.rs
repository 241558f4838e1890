//! Extension values and the fork-time extension builder.

use crate::config::PanicResponse;
use crate::intercept::Callable;
use crate::types::Value;
use crate::zone::zone::Zone;
use core::fmt;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Extension key under which the enter hook is stored.
pub const ON_ENTER: &str = "on_enter";

/// Extension key under which the leave hook is stored.
pub const ON_LEAVE: &str = "on_leave";

/// Extension key overriding the panic response for runs of this zone (and
/// its descendants, through inheritance).
///
/// The value is [`Value::Text`] holding one of `log`, `silent`,
/// `propagate`.
pub const PANIC_RESPONSE: &str = "panic_response";

/// A lifecycle hook fired when a zone is entered or left.
///
/// The hook receives the zone being run, which for an inherited hook is a
/// descendant of the zone the hook was registered on. Hooks commonly stash
/// bookkeeping on that zone with [`Zone::set`].
#[derive(Clone)]
pub struct Hook {
    inner: Arc<dyn Fn(&Zone) + Send + Sync>,
}

impl Hook {
    /// Wraps a closure as a hook.
    pub fn new(f: impl Fn(&Zone) + Send + Sync + 'static) -> Self {
        Self { inner: Arc::new(f) }
    }

    /// Invokes the hook for `zone`.
    pub fn call(&self, zone: &Zone) {
        (self.inner)(zone);
    }
}

impl fmt::Debug for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Hook(..)")
    }
}

/// A single extension slot on a zone.
#[derive(Debug, Clone)]
pub enum ExtValue {
    /// Plain data, readable through the chain with [`Zone::value`].
    Value(Value),
    /// A lifecycle hook, fired by the run protocol.
    Hook(Hook),
    /// A dynamic callable, e.g. a patch delegate.
    Callable(Callable),
}

impl ExtValue {
    /// Returns the data value if this slot holds one.
    #[must_use]
    pub const fn as_value(&self) -> Option<&Value> {
        match self {
            Self::Value(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the hook if this slot holds one.
    #[must_use]
    pub const fn as_hook(&self) -> Option<&Hook> {
        match self {
            Self::Hook(h) => Some(h),
            _ => None,
        }
    }

    /// Returns the callable if this slot holds one.
    #[must_use]
    pub const fn as_callable(&self) -> Option<&Callable> {
        match self {
            Self::Callable(c) => Some(c),
            _ => None,
        }
    }

    /// Consumes the slot, returning the data value if it holds one.
    #[must_use]
    pub fn into_value(self) -> Option<Value> {
        match self {
            Self::Value(v) => Some(v),
            _ => None,
        }
    }

    /// Consumes the slot, returning the hook if it holds one.
    #[must_use]
    pub fn into_hook(self) -> Option<Hook> {
        match self {
            Self::Hook(h) => Some(h),
            _ => None,
        }
    }

    /// Consumes the slot, returning the callable if it holds one.
    #[must_use]
    pub fn into_callable(self) -> Option<Callable> {
        match self {
            Self::Callable(c) => Some(c),
            _ => None,
        }
    }

    /// Returns the slot shape, for diagnostics.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Value(v) => v.type_name(),
            Self::Hook(_) => "hook",
            Self::Callable(_) => "callable",
        }
    }
}

impl From<Value> for ExtValue {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

impl From<Hook> for ExtValue {
    fn from(hook: Hook) -> Self {
        Self::Hook(hook)
    }
}

impl From<Callable> for ExtValue {
    fn from(callable: Callable) -> Self {
        Self::Callable(callable)
    }
}

/// Builder for the extensions a fork installs on the child zone.
///
/// # Example
///
/// ```
/// use zonal::{Extensions, Zone};
///
/// let child = Zone::current().fork(
///     Extensions::new()
///         .with_value("request_id", 17_u64)
///         .on_enter(|zone| zone.set("entered", zonal::Value::Bool(true))),
/// );
/// assert_eq!(child.value("request_id").and_then(|v| v.as_uint()), Some(17));
/// ```
#[derive(Debug, Default, Clone)]
pub struct Extensions {
    entries: BTreeMap<String, ExtValue>,
}

impl Extensions {
    /// Creates an empty extension set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts an arbitrary extension slot.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<ExtValue>) -> Self {
        self.entries.insert(name.into(), value.into());
        self
    }

    /// Inserts a plain data value.
    #[must_use]
    pub fn with_value(self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.with(name, ExtValue::Value(value.into()))
    }

    /// Inserts a dynamic callable.
    #[must_use]
    pub fn with_callable(self, name: impl Into<String>, callable: Callable) -> Self {
        self.with(name, ExtValue::Callable(callable))
    }

    /// Installs an enter hook under [`ON_ENTER`].
    #[must_use]
    pub fn on_enter(self, hook: impl Fn(&Zone) + Send + Sync + 'static) -> Self {
        self.with(ON_ENTER, ExtValue::Hook(Hook::new(hook)))
    }

    /// Installs a leave hook under [`ON_LEAVE`].
    #[must_use]
    pub fn on_leave(self, hook: impl Fn(&Zone) + Send + Sync + 'static) -> Self {
        self.with(ON_LEAVE, ExtValue::Hook(Hook::new(hook)))
    }

    /// Overrides the panic response for runs of the forked zone.
    #[must_use]
    pub fn panic_response(self, response: PanicResponse) -> Self {
        self.with_value(PANIC_RESPONSE, response.as_str())
    }

    /// Returns the number of slots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no slots have been added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn into_entries(self) -> BTreeMap<String, ExtValue> {
        self.entries
    }
}
