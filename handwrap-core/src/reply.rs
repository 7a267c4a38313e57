//! Handler return values.
//!
//! A handler tells its wrapper what to do with the response by the value it
//! returns. Every such value converts into a [`Reply`]: a structured result
//! with its own status code, a raw body to send as is, or nothing at all
//! because the handler already wrote the response itself.

use bytes::Bytes;
use http::HeaderValue;
use serde::Serialize;

use crate::headers::{
    HTML_CONTENT_TYPE, JSON_CONTENT_TYPE, OCTET_STREAM_CONTENT_TYPE, PLAIN_TEXT_CONTENT_TYPE,
};
use crate::response::ResponseWriter;
use crate::{Body, Error, Result, StatusCode};

/// The normalized result of a handler.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// A JSON payload with its own status code.
    Structured {
        /// The status to respond with.
        status: StatusCode,
        /// The JSON payload.
        payload: serde_json::Value,
    },
    /// A body to send with the current response status.
    Raw {
        /// The content type, if one could be inferred.
        content_type: Option<HeaderValue>,
        /// The body.
        body: Body,
    },
    /// The handler produced the response itself; nothing to do.
    Handled,
}

impl Reply {
    /// Creates a structured reply.
    #[must_use]
    pub fn structured(status: StatusCode, payload: serde_json::Value) -> Self {
        Self::Structured { status, payload }
    }

    /// Creates a structured reply from an [`ApiResult`].
    ///
    /// # Errors
    ///
    /// Returns an error if the result cannot be converted to JSON.
    pub fn from_api<A: ApiResult + ?Sized>(result: &A) -> Result<Self> {
        Ok(Self::structured(result.status(), result.to_json()?))
    }

    /// Creates a raw reply with a static content type.
    #[must_use]
    pub fn raw<B: Into<Body>>(content_type: &'static str, body: B) -> Self {
        Self::Raw {
            content_type: Some(HeaderValue::from_static(content_type)),
            body: body.into(),
        }
    }

    /// Returns `true` if this reply leaves the response untouched.
    #[must_use]
    pub fn is_handled(&self) -> bool {
        matches!(self, Self::Handled)
    }

    /// Writes this reply to `response`.
    ///
    /// Returns `false` for [`Reply::Handled`], which writes nothing.
    ///
    /// # Errors
    ///
    /// Returns an error if the response has already been sent or the payload
    /// cannot be serialized.
    pub fn write_to(self, response: &ResponseWriter) -> Result<bool> {
        match self {
            Self::Structured { status, payload } => {
                if response.is_sent() {
                    return Err(crate::response::ResponseAlreadySent.into());
                }
                response.set_status(status);
                response.write_json(&payload)?;
            }
            Self::Raw {
                content_type: Some(content_type),
                body,
            } => response.send_with_content_type(content_type, body)?,
            Self::Raw {
                content_type: None,
                body,
            } => response.send(body)?,
            Self::Handled => return Ok(false),
        }
        Ok(true)
    }
}

/// A value carrying its own status code and JSON payload.
///
/// This is what handlers return when they want typed, consistent responses.
pub trait ApiResult {
    /// The status to respond with.
    fn status(&self) -> StatusCode;

    /// The JSON payload.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload cannot be converted to JSON.
    fn to_json(&self) -> Result<serde_json::Value>;
}

/// A structured API result: a status code and a serializable payload.
///
/// # Examples
///
/// ```
/// use handwrap_core::StatusCode;
/// use handwrap_core::reply::{ApiRes, IntoReply, Reply};
/// use serde_json::json;
///
/// let reply = ApiRes::created(json!({"id": 1})).into_reply().unwrap();
/// assert_eq!(reply, Reply::structured(StatusCode::CREATED, json!({"id": 1})));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRes<T> {
    status: StatusCode,
    data: T,
}

impl<T> ApiRes<T> {
    /// Creates a result with the given status and payload.
    #[must_use]
    pub fn new(status: StatusCode, data: T) -> Self {
        Self { status, data }
    }

    /// Creates a `200 OK` result.
    #[must_use]
    pub fn ok(data: T) -> Self {
        Self::new(StatusCode::OK, data)
    }

    /// Creates a `201 Created` result.
    #[must_use]
    pub fn created(data: T) -> Self {
        Self::new(StatusCode::CREATED, data)
    }

    /// Returns the payload.
    #[must_use]
    pub fn data(&self) -> &T {
        &self.data
    }
}

impl<T: Serialize> ApiResult for ApiRes<T> {
    fn status(&self) -> StatusCode {
        self.status
    }

    fn to_json(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(&self.data)?)
    }
}

/// A JSON body, sent with the current response status.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Json<D>(pub D);

/// An HTML body, sent with the current response status.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Html(String);

impl Html {
    /// Creates a new HTML body.
    #[must_use]
    pub fn new<T: Into<String>>(html: T) -> Self {
        Self(html.into())
    }

    /// Returns the HTML as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Conversion of a handler's return value into a [`Reply`].
///
/// Empty strings and byte buffers, `()`, `None`, and JSON `null`, `false`,
/// `0` and `""` mean the handler has nothing to send and convert to
/// [`Reply::Handled`]. Returning the handler's own [`ResponseWriter`] means
/// the same.
pub trait IntoReply {
    /// Converts the value into a [`Reply`].
    ///
    /// # Errors
    ///
    /// Returns the handler's error for `Err` values, or an error if the
    /// value cannot be serialized.
    fn into_reply(self) -> Result<Reply>;
}

impl IntoReply for Reply {
    fn into_reply(self) -> Result<Reply> {
        Ok(self)
    }
}

impl IntoReply for () {
    fn into_reply(self) -> Result<Reply> {
        Ok(Reply::Handled)
    }
}

impl IntoReply for ResponseWriter {
    fn into_reply(self) -> Result<Reply> {
        Ok(Reply::Handled)
    }
}

impl<T: IntoReply> IntoReply for Option<T> {
    fn into_reply(self) -> Result<Reply> {
        self.map_or(Ok(Reply::Handled), IntoReply::into_reply)
    }
}

impl<R, E> IntoReply for std::result::Result<R, E>
where
    R: IntoReply,
    E: Into<Error>,
{
    fn into_reply(self) -> Result<Reply> {
        match self {
            Ok(value) => value.into_reply(),
            Err(error) => Err(error.into()),
        }
    }
}

impl<T: Serialize> IntoReply for ApiRes<T> {
    fn into_reply(self) -> Result<Reply> {
        Reply::from_api(&self)
    }
}

impl<D: Serialize> IntoReply for Json<D> {
    fn into_reply(self) -> Result<Reply> {
        let body = serde_json::to_vec(&self.0)?;
        Ok(Reply::raw(JSON_CONTENT_TYPE, body))
    }
}

impl IntoReply for serde_json::Value {
    fn into_reply(self) -> Result<Reply> {
        if is_falsy(&self) {
            return Ok(Reply::Handled);
        }
        Json(self).into_reply()
    }
}

#[expect(clippy::float_cmp, reason = "only an exact zero is falsy")]
fn is_falsy(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Null => true,
        serde_json::Value::Bool(value) => !value,
        serde_json::Value::Number(number) => {
            number.as_i64() == Some(0)
                || number.as_u64() == Some(0)
                || number.as_f64() == Some(0.0)
        }
        serde_json::Value::String(value) => value.is_empty(),
        serde_json::Value::Array(_) | serde_json::Value::Object(_) => false,
    }
}

impl IntoReply for Html {
    fn into_reply(self) -> Result<Reply> {
        Ok(non_empty(HTML_CONTENT_TYPE, self.0))
    }
}

macro_rules! impl_into_reply_for_type_and_mime {
    ($ty:ty, $mime:expr) => {
        impl IntoReply for $ty {
            fn into_reply(self) -> Result<Reply> {
                Ok(non_empty($mime, self))
            }
        }
    };
}

impl_into_reply_for_type_and_mime!(&'static str, PLAIN_TEXT_CONTENT_TYPE);
impl_into_reply_for_type_and_mime!(String, PLAIN_TEXT_CONTENT_TYPE);
impl_into_reply_for_type_and_mime!(&'static [u8], OCTET_STREAM_CONTENT_TYPE);
impl_into_reply_for_type_and_mime!(Vec<u8>, OCTET_STREAM_CONTENT_TYPE);
impl_into_reply_for_type_and_mime!(Bytes, OCTET_STREAM_CONTENT_TYPE);

fn non_empty<B: Into<Body>>(content_type: &'static str, body: B) -> Reply {
    let body = body.into();
    if body.is_empty() {
        Reply::Handled
    } else {
        Reply::Raw {
            content_type: Some(HeaderValue::from_static(content_type)),
            body,
        }
    }
}
