//! HTTP response type and the response object handed to handlers.
//!
//! A handler receives a [`ResponseWriter`] for the request it handles. It can
//! write the response itself through it, or return a value and let the
//! handler wrapper write the response instead. Either way, a response can be
//! sent only once.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use http::header::{CONTENT_TYPE, SET_COOKIE};
use http::{HeaderMap, HeaderName, HeaderValue};
use serde::Serialize;
use thiserror::Error;

use crate::error::{HttpError, impl_into_handwrap_error};
use crate::headers::{JSON_CONTENT_TYPE, OCTET_STREAM_CONTENT_TYPE};
use crate::{Body, Result, StatusCode};

/// HTTP response type.
pub type Response = http::Response<Body>;

/// HTTP response head type.
pub type ResponseHead = http::response::Parts;

/// Returned when a response is written after it has already been sent.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Error)]
#[error("the response has already been sent")]
pub struct ResponseAlreadySent;
impl_into_handwrap_error!(ResponseAlreadySent);

/// Returned when a cookie name cannot be used in a `Set-Cookie` header.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid cookie name: {0:?}")]
pub struct InvalidCookie(String);
impl_into_handwrap_error!(InvalidCookie);

/// The response object of a single handler invocation.
///
/// This is a cheaply cloneable handle: all clones refer to the same
/// response. The status and headers can be changed until the response is
/// sent; sending it a second time fails with [`ResponseAlreadySent`].
///
/// # Examples
///
/// ```
/// use handwrap_core::StatusCode;
/// use handwrap_core::response::ResponseWriter;
///
/// let response = ResponseWriter::new();
/// response.set_status(StatusCode::ACCEPTED);
/// response.send("queued").unwrap();
///
/// assert!(response.is_sent());
/// assert!(response.send("again").is_err());
///
/// let response = response.take_response().unwrap();
/// assert_eq!(response.status(), StatusCode::ACCEPTED);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ResponseWriter {
    state: Arc<Mutex<ResponseState>>,
}

#[derive(Debug, Default)]
struct ResponseState {
    status: StatusCode,
    headers: HeaderMap,
    body: BodyState,
}

#[derive(Debug, Default)]
enum BodyState {
    #[default]
    Unsent,
    Sent(Body),
    Taken,
}

impl BodyState {
    fn is_sent(&self) -> bool {
        !matches!(self, Self::Unsent)
    }
}

impl ResponseWriter {
    /// Creates a new, unsent response with status 200 OK.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, ResponseState> {
        // the lock is never held across user code, so a poisoned lock still
        // holds a consistent state
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the status the response will be (or was) sent with.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.state().status
    }

    /// Sets the response status.
    pub fn set_status(&self, status: StatusCode) -> &Self {
        self.state().status = status;
        self
    }

    /// Returns a copy of the response headers.
    #[must_use]
    pub fn headers(&self) -> HeaderMap {
        self.state().headers.clone()
    }

    /// Sets a response header, replacing any previous values.
    ///
    /// # Errors
    ///
    /// Returns an error if the header name or value is invalid.
    pub fn set_header<K, V>(&self, key: K, value: V) -> Result<&Self>
    where
        K: TryInto<HeaderName>,
        K::Error: Into<http::Error>,
        V: TryInto<HeaderValue>,
        V::Error: Into<http::Error>,
    {
        let key = key.try_into().map_err(Into::<http::Error>::into)?;
        let value = value.try_into().map_err(Into::<http::Error>::into)?;
        self.state().headers.insert(key, value);
        Ok(self)
    }

    /// Appends a `Set-Cookie` header for `name=value` scoped to `/`.
    ///
    /// # Errors
    ///
    /// Returns an error if the cookie name is empty or contains characters
    /// that are not allowed in a cookie name, or if the value contains
    /// characters not allowed in a header.
    ///
    /// # Examples
    ///
    /// ```
    /// use handwrap_core::response::ResponseWriter;
    ///
    /// let response = ResponseWriter::new();
    /// response.set_cookie("session", "abc123").unwrap();
    ///
    /// assert_eq!(response.headers()["set-cookie"], "session=abc123; Path=/");
    /// assert!(response.set_cookie("bad;name", "x").is_err());
    /// ```
    pub fn set_cookie(&self, name: &str, value: &str) -> Result<&Self> {
        let valid_name = !name.is_empty()
            && name
                .bytes()
                .all(|b| b.is_ascii_graphic() && !b"()<>@,;:\\\"/[]?={}".contains(&b));
        if !valid_name {
            return Err(InvalidCookie(name.to_owned()).into());
        }

        let cookie = HeaderValue::try_from(format!("{name}={value}; Path=/"))
            .map_err(http::Error::from)?;
        self.state().headers.append(SET_COOKIE, cookie);
        Ok(self)
    }

    /// Returns `true` if the response has been sent.
    #[must_use]
    pub fn is_sent(&self) -> bool {
        self.state().body.is_sent()
    }

    /// Sends the response with the given body, keeping any content type
    /// header that was already set.
    ///
    /// # Errors
    ///
    /// Returns [`ResponseAlreadySent`] if the response was already sent.
    pub fn send<B: Into<Body>>(&self, body: B) -> Result<()> {
        let mut state = self.state();
        if state.body.is_sent() {
            return Err(ResponseAlreadySent.into());
        }
        state.body = BodyState::Sent(body.into());
        Ok(())
    }

    /// Sends the response with the given body and content type.
    ///
    /// # Errors
    ///
    /// Returns [`ResponseAlreadySent`] if the response was already sent.
    pub fn send_with_content_type<B: Into<Body>>(
        &self,
        content_type: HeaderValue,
        body: B,
    ) -> Result<()> {
        let mut state = self.state();
        if state.body.is_sent() {
            return Err(ResponseAlreadySent.into());
        }
        state.headers.insert(CONTENT_TYPE, content_type);
        state.body = BodyState::Sent(body.into());
        Ok(())
    }

    /// Serializes `value` to JSON and sends it as the response body.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails or the response was already
    /// sent.
    ///
    /// # Examples
    ///
    /// ```
    /// use handwrap_core::response::ResponseWriter;
    /// use serde_json::json;
    ///
    /// let response = ResponseWriter::new();
    /// response.write_json(&json!({"ok": true})).unwrap();
    ///
    /// let response = response.take_response().unwrap();
    /// assert_eq!(response.headers()["content-type"], "application/json");
    /// assert_eq!(response.body().as_bytes(), br#"{"ok":true}"#);
    /// ```
    pub fn write_json<T: Serialize + ?Sized>(&self, value: &T) -> Result<()> {
        let body = serde_json::to_vec(value)?;
        self.send_with_content_type(HeaderValue::from_static(JSON_CONTENT_TYPE), body)
    }

    /// Sends the contents of a file, guessing its content type from the
    /// file extension.
    ///
    /// # Errors
    ///
    /// Returns a `404 Not Found` [`HttpError`] if the file does not exist,
    /// any other I/O error as is, and [`ResponseAlreadySent`] if the
    /// response was already sent.
    pub async fn send_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if self.is_sent() {
            return Err(ResponseAlreadySent.into());
        }

        let contents = match tokio::fs::read(path).await {
            Ok(contents) => contents,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                return Err(HttpError::not_found(format!(
                    "file not found: {}",
                    path.display()
                ))
                .into());
            }
            Err(error) => return Err(crate::Error::internal(error)),
        };

        let content_type = mime_guess::from_path(path)
            .first()
            .and_then(|mime| HeaderValue::try_from(mime.essence_str()).ok())
            .unwrap_or_else(|| HeaderValue::from_static(OCTET_STREAM_CONTENT_TYPE));
        self.send_with_content_type(content_type, contents)
    }

    /// Takes the sent response out of this writer.
    ///
    /// Returns `None` if the response has not been sent, or has already been
    /// taken. The writer keeps reporting the response as sent afterwards.
    #[must_use]
    pub fn take_response(&self) -> Option<Response> {
        let mut state = self.state();
        let body = match std::mem::replace(&mut state.body, BodyState::Taken) {
            BodyState::Sent(body) => body,
            unsent_or_taken => {
                state.body = unsent_or_taken;
                return None;
            }
        };

        let mut response = Response::new(body);
        *response.status_mut() = state.status;
        *response.headers_mut() = std::mem::take(&mut state.headers);
        Some(response)
    }
}
