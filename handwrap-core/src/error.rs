//! Error types used throughout handwrap.
//!
//! [`HttpError`] is the classified failure: it carries an intentional status
//! code and a message that is safe to show to clients. [`Error`] is the
//! general error type that handlers return and that the proceed primitive
//! carries; it may or may not wrap an [`HttpError`].

pub mod backtrace;
pub(crate) mod error_impl;
mod http_error;
mod uncaught_panic;

pub use error_impl::{Error, impl_into_handwrap_error, is_http_error};
pub use http_error::{HttpError, Message, WireErrorBody};
pub use uncaught_panic::{UncaughtPanic, UncaughtPanicPayload};
