//! HTTP request type.
//!
//! Request parsing belongs to the host; handlers receive a plain
//! [`http::Request`] with a buffered [`Body`].

use crate::Body;

/// HTTP request type.
pub type Request = http::Request<Body>;

/// HTTP request head type.
pub type RequestHead = http::request::Parts;
