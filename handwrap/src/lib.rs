//! handwrap turns request handlers into exactly one response action.
//!
//! A handler is any sync or async function taking a [`Request`], the
//! [`ResponseWriter`](response::ResponseWriter) of the current request and
//! the [`Next`](next::Next) proceed primitive. Wrapping it with
//! [`wrap_handler`] makes every outcome uniform:
//!
//! * a returned [`ApiRes`](reply::ApiRes) is written with its own status code
//!   and JSON payload,
//! * any other non-empty returned value is sent as the body,
//! * nothing (or the response object itself) means the handler already
//!   responded,
//! * an error, or a panic, is forwarded to the error chain through
//!   [`Next::fail`](next::Next::fail).
//!
//! At the end of the error chain, a [`GlobalErrorHandler`] translates
//! [`HttpError`](error::HttpError)s to their JSON wire body and every other
//! failure to a generic 500 response.
//!
//! [`ControllerView`] does the same for a whole set of methods of a
//! controller type at once.
//!
//! # Examples
//!
//! ```
//! use handwrap::next::Next;
//! use handwrap::reply::ApiRes;
//! use handwrap::request::Request;
//! use handwrap::response::ResponseWriter;
//! use handwrap::{Outcome, StatusCode, wrap_handler};
//! use serde_json::json;
//!
//! async fn create_user(
//!     _request: Request,
//!     _response: ResponseWriter,
//!     _next: Next,
//! ) -> handwrap::Result<ApiRes<serde_json::Value>> {
//!     Ok(ApiRes::created(json!({"id": 1})))
//! }
//!
//! # #[tokio::main]
//! # async fn main() {
//! let handler = wrap_handler(create_user);
//! let response = ResponseWriter::new();
//!
//! let outcome = handler
//!     .call(Request::default(), response.clone(), Next::new())
//!     .await;
//!
//! assert_eq!(outcome, Outcome::Responded);
//! assert_eq!(response.status(), StatusCode::CREATED);
//! # }
//! ```

#![warn(missing_docs, rustdoc::missing_crate_level_docs)]

extern crate self as handwrap;

pub mod config;
pub mod controller;
pub mod error_handler;
mod handler;
pub mod service;

pub use handwrap_core::{Body, Error, Result, StatusCode};
pub use handwrap_core::{error, headers, next, reply, request, response, status};
pub use http;

pub use crate::controller::{Controller, ControllerView, proxy_wrap};
pub use crate::error_handler::{GlobalErrorHandler, global_error_handler};
pub use crate::handler::{
    Asynchronous, Handler, Outcome, Synchronous, WrappedHandler, wrap_handler,
};
