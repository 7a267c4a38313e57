//! Core types for handwrap.
//!
//! This crate provides the leaf building blocks that the
//! [handwrap](https://docs.rs/handwrap) crate is built on: the registered
//! status table, the [`HttpError`](error::HttpError) model and its wire
//! format, and the primitives a request handler receives from its host
//! (request body, response object, and the proceed primitive).
//!
//! Most applications should use the main `handwrap` crate rather than
//! depending on `handwrap-core` directly.

mod body;

pub mod error;
pub mod headers;
pub mod next;
pub mod reply;
pub mod request;
pub mod response;
pub mod status;

pub use body::Body;
pub use error::Error;

/// A type alias for an HTTP status code.
pub type StatusCode = http::StatusCode;

/// A type alias for a result that can return a [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
