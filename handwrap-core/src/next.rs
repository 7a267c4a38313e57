//! The proceed primitive.
//!
//! [`Next`] is how a handler hands control back to its host: either to
//! continue with the next stage ([`Next::proceed`]) or to enter the error
//! chain ([`Next::fail`]). Only the first signal of an invocation counts.

use std::sync::{Arc, OnceLock};

use tracing::warn;

use crate::Error;

/// The signal recorded by a [`Next`].
#[derive(Debug, Clone)]
pub enum Flow {
    /// Continue with the next stage.
    Proceed,
    /// Enter the error chain with the given error.
    Fail(Arc<Error>),
}

/// The "pass control to the next stage" primitive of one invocation.
///
/// All clones refer to the same slot, so the host can keep a clone and read
/// the signal after the handler finishes.
///
/// # Examples
///
/// ```
/// use handwrap_core::Error;
/// use handwrap_core::next::{Flow, Next};
///
/// let next = Next::new();
/// assert!(next.fail(Error::internal("boom")));
/// assert!(!next.proceed());
///
/// assert!(matches!(next.flow(), Some(Flow::Fail(_))));
/// ```
#[derive(Debug, Clone, Default)]
pub struct Next {
    flow: Arc<OnceLock<Flow>>,
}

impl Next {
    /// Creates a new, unsignalled `Next`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Continues with the next stage.
    ///
    /// Returns `false` if a signal had already been recorded, in which case
    /// this call has no effect.
    pub fn proceed(&self) -> bool {
        self.signal(Flow::Proceed)
    }

    /// Enters the error chain with `error`.
    ///
    /// Returns `false` if a signal had already been recorded, in which case
    /// this call has no effect.
    pub fn fail<E: Into<Error>>(&self, error: E) -> bool {
        self.signal(Flow::Fail(Arc::new(error.into())))
    }

    fn signal(&self, flow: Flow) -> bool {
        match self.flow.set(flow) {
            Ok(()) => true,
            Err(ignored) => {
                warn!(
                    ignored = ?ignored,
                    "next stage already signalled; ignoring the later signal"
                );
                false
            }
        }
    }

    /// Returns the recorded signal, if any.
    #[must_use]
    pub fn flow(&self) -> Option<&Flow> {
        self.flow.get()
    }

    /// Returns `true` if either signal has been recorded.
    #[must_use]
    pub fn is_signalled(&self) -> bool {
        self.flow.get().is_some()
    }

    /// Returns the forwarded error, if the recorded signal is a failure.
    #[must_use]
    pub fn error(&self) -> Option<&Arc<Error>> {
        match self.flow.get()? {
            Flow::Fail(error) => Some(error),
            Flow::Proceed => None,
        }
    }
}
