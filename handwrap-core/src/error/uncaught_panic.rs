//! Error type for panics caught while running a handler.

use std::any::Any;
use std::fmt::{Display, Formatter};
use std::ops::Deref;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::error_impl::impl_into_handwrap_error;

/// A panic that occurred while a handler was running.
///
/// Handlers are run with their panics caught, so a panicking handler ends up
/// in the error chain as an unclassified failure instead of tearing down the
/// host. The panic payload is kept for debugging purposes; it may contain
/// sensitive information and is never sent to clients.
///
/// # Examples
///
/// ```
/// use handwrap_core::error::UncaughtPanic;
///
/// let panic = UncaughtPanic::new(Box::new("something went wrong"));
/// assert_eq!(panic.message().as_deref(), Some("something went wrong"));
/// assert_eq!(panic.to_string(), "handler panicked: something went wrong");
/// ```
#[derive(Debug, Clone)]
pub struct UncaughtPanic {
    payload: Arc<Mutex<Box<dyn Any + Send + 'static>>>,
}
impl_into_handwrap_error!(UncaughtPanic, INTERNAL_SERVER_ERROR);

impl UncaughtPanic {
    /// Creates a new `UncaughtPanic` with the given panic payload.
    #[must_use]
    pub fn new(payload: Box<dyn Any + Send + 'static>) -> Self {
        Self {
            payload: Arc::new(Mutex::new(payload)),
        }
    }

    /// Returns a wrapper over the panic payload.
    #[must_use]
    pub fn payload(&self) -> UncaughtPanicPayload<'_> {
        let mutex_guard = self.payload.lock().unwrap_or_else(PoisonError::into_inner);
        UncaughtPanicPayload { mutex_guard }
    }

    /// Returns the panic message, if the payload is a string.
    #[must_use]
    pub fn message(&self) -> Option<String> {
        let payload = self.payload();
        if let Some(&message) = payload.downcast_ref::<&str>() {
            Some(message.to_owned())
        } else {
            payload.downcast_ref::<String>().cloned()
        }
    }
}

impl Display for UncaughtPanic {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.message() {
            Some(message) => write!(f, "handler panicked: {message}"),
            None => f.write_str("handler panicked"),
        }
    }
}

impl std::error::Error for UncaughtPanic {}

/// A wrapper around the panic payload that provides access to the original
/// panic data.
#[derive(Debug)]
pub struct UncaughtPanicPayload<'a> {
    mutex_guard: MutexGuard<'a, Box<dyn Any + Send + 'static>>,
}

impl Deref for UncaughtPanicPayload<'_> {
    type Target = Box<dyn Any + Send + 'static>;

    fn deref(&self) -> &Self::Target {
        &self.mutex_guard
    }
}
