//! Captured panic payloads.

use core::fmt;
use std::any::Any;

/// Information about a panic caught at a zone boundary.
///
/// The raw payload from `catch_unwind` is an opaque `Box<dyn Any>`; this
/// type extracts the human-readable message when the payload is a string
/// (the common case for `panic!` with a literal or formatted message).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanicPayload {
    message: String,
}

impl PanicPayload {
    /// Creates a panic payload with the given message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Renders a raw `catch_unwind` payload.
    ///
    /// Downcasts `&str` and `String` payloads to their message; anything
    /// else becomes `"unknown panic"`.
    #[must_use]
    pub fn from_raw(payload: &(dyn Any + Send)) -> Self {
        if let Some(s) = payload.downcast_ref::<&str>() {
            Self::new(*s)
        } else if let Some(s) = payload.downcast_ref::<String>() {
            Self::new(s.clone())
        } else {
            Self::new("unknown panic")
        }
    }

    /// Returns the panic message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Consumes the payload and returns the message.
    #[must_use]
    pub fn into_message(self) -> String {
        self.message
    }
}

impl fmt::Display for PanicPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "panic: {}", self.message)
    }
}
