//! Error types for zone runs and host dispatch.
//!
//! The default run path swallows callback failures after logging them, so
//! most code never sees these types. They surface on the checked entry
//! points: [`Zone::try_run`](crate::zone::Zone::try_run) and
//! [`Host::call`](crate::intercept::Host::call).

use crate::types::ZoneId;
use core::fmt;

/// Classifies a failure observed by the dispatch layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The callback body panicked inside a zone run.
    CallbackPanicked,
    /// An enter or leave hook panicked during a zone run.
    HookPanicked,
    /// A host was asked to dispatch a method it does not have.
    MethodNotFound,
    /// A dynamic call carried arguments the receiver could not accept.
    InvalidArgument,
}

impl ErrorKind {
    /// Returns a short lowercase description of the kind.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::CallbackPanicked => "callback panicked",
            Self::HookPanicked => "hook panicked",
            Self::MethodNotFound => "method not found",
            Self::InvalidArgument => "invalid argument",
        }
    }

    /// Returns `true` if this kind records a caught panic.
    #[must_use]
    pub const fn is_panic(&self) -> bool {
        matches!(self, Self::CallbackPanicked | Self::HookPanicked)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An error from a zone run or a host dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Error {
    kind: ErrorKind,
    message: Option<String>,
    zone: Option<ZoneId>,
}

impl Error {
    /// Creates an error of the given kind with no message.
    #[must_use]
    pub const fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            message: None,
            zone: None,
        }
    }

    /// Attaches a human-readable message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Attaches the zone the failure was observed in.
    #[must_use]
    pub const fn with_zone(mut self, zone: ZoneId) -> Self {
        self.zone = Some(zone);
        self
    }

    /// Returns the error kind.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the attached message, if any.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Returns the zone the failure was observed in, if recorded.
    #[must_use]
    pub const fn zone(&self) -> Option<ZoneId> {
        self.zone
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if let Some(zone) = self.zone {
            write!(f, " in {zone}")?;
        }
        if let Some(message) = &self.message {
            write!(f, ": {message}")?;
        }
        Ok(())
    }
}

impl std::error::Error for Error {}

/// Result alias used by the checked dispatch entry points.
pub type Result<T> = std::result::Result<T, Error>;
