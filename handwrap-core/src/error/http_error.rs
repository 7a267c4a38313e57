use std::fmt::Display;

use derive_more::with_trait::Debug;
use serde::{Deserialize, Serialize};

use crate::StatusCode;
// Renamed so that thiserror does not treat the field specially
use crate::error::backtrace::{__handwrap_create_backtrace, Backtrace as HandwrapBacktrace};
use crate::status::name_for_status;

/// A request-level failure meant to reach the client as structured JSON.
///
/// An `HttpError` carries a status code, a message that is safe to show to
/// clients, and optionally a structured `detail` object. Its name is always
/// derived from the status code (see [`name_for_status`]).
///
/// # Examples
///
/// ```
/// use handwrap_core::StatusCode;
/// use handwrap_core::error::HttpError;
/// use serde_json::json;
///
/// let error = HttpError::not_found("user 42 does not exist")
///     .with_detail(json!({"id": 42}));
///
/// assert_eq!(error.status(), StatusCode::NOT_FOUND);
/// assert_eq!(error.name(), "NotFoundError");
/// assert_eq!(
///     serde_json::to_value(error.to_wire_body()).unwrap(),
///     json!({
///         "status": 404,
///         "error": "NotFoundError",
///         "message": "user 42 does not exist",
///         "detail": {"id": 42},
///     })
/// );
/// ```
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct HttpError {
    status: StatusCode,
    name: &'static str,
    message: Message,
    detail: Option<serde_json::Value>,
    #[debug(skip)]
    stack: HandwrapBacktrace,
}

impl HttpError {
    /// Creates a new error with the given message and status code.
    ///
    /// An empty message counts as no message at all, in which case the
    /// message becomes the error name.
    #[must_use]
    pub fn new<M: Into<Message>>(message: M, status: StatusCode) -> Self {
        let name = name_for_status(status.as_u16());
        let message = message.into();
        let message = if message.is_empty() {
            Message::Text(name.to_owned())
        } else {
            message
        };

        Self {
            status,
            name,
            message,
            detail: None,
            stack: __handwrap_create_backtrace(),
        }
    }

    /// Creates a new error without an explicit message; the message is the
    /// error name.
    ///
    /// # Examples
    ///
    /// ```
    /// use handwrap_core::StatusCode;
    /// use handwrap_core::error::HttpError;
    ///
    /// let error = HttpError::from_status(StatusCode::GONE);
    /// assert_eq!(error.to_string(), "GoneError");
    /// ```
    #[must_use]
    pub fn from_status(status: StatusCode) -> Self {
        Self::new(Message::default(), status)
    }

    /// Creates a new error from a raw status code.
    ///
    /// # Errors
    ///
    /// Returns an error if `status` is not a legal HTTP status code.
    ///
    /// # Examples
    ///
    /// ```
    /// use handwrap_core::error::HttpError;
    ///
    /// assert!(HttpError::try_new("too fast", 429).is_ok());
    /// assert!(HttpError::try_new("nonsense", 42).is_err());
    /// ```
    pub fn try_new<M: Into<Message>>(
        message: M,
        status: u16,
    ) -> Result<Self, http::status::InvalidStatusCode> {
        let status = StatusCode::from_u16(status)?;
        Ok(Self::new(message, status))
    }

    /// Attaches a structured detail object. A JSON `null` is treated as no
    /// detail.
    #[must_use]
    pub fn with_detail<D: Into<serde_json::Value>>(mut self, detail: D) -> Self {
        let detail = detail.into();
        self.detail = (!detail.is_null()).then_some(detail);
        self
    }

    /// Returns the status code of this error.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Returns the error name, e.g. `NotFoundError`.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Returns the message of this error.
    #[must_use]
    pub fn message(&self) -> &Message {
        &self.message
    }

    /// Returns the structured detail object, if any.
    #[must_use]
    pub fn detail(&self) -> Option<&serde_json::Value> {
        self.detail.as_ref()
    }

    /// Returns the stack captured when this error was created.
    #[must_use]
    pub fn backtrace(&self) -> &HandwrapBacktrace {
        &self.stack
    }

    /// Converts this error to the body sent to clients.
    #[must_use]
    pub fn to_wire_body(&self) -> WireErrorBody {
        WireErrorBody {
            status: self.status.as_u16(),
            error: self.name.to_owned(),
            message: self.message.clone(),
            detail: self.detail.clone(),
            stack: None,
        }
    }
}

macro_rules! http_error_constructors {
    ($($(#[$meta:meta])* $name:ident => $status:ident,)*) => {
        impl HttpError {
            $(
                $(#[$meta])*
                #[must_use]
                pub fn $name<M: Into<Message>>(message: M) -> Self {
                    Self::new(message, StatusCode::$status)
                }
            )*
        }
    };
}

http_error_constructors! {
    /// Creates a `400 Bad Request` error (`BadRequestError`).
    bad_request => BAD_REQUEST,
    /// Creates a `401 Unauthorized` error (`UnauthorizedError`).
    unauthorized => UNAUTHORIZED,
    /// Creates a `402 Payment Required` error (`PaymentRequiredError`).
    payment_required => PAYMENT_REQUIRED,
    /// Creates a `403 Forbidden` error (`ForbiddenError`).
    forbidden => FORBIDDEN,
    /// Creates a `404 Not Found` error (`NotFoundError`).
    not_found => NOT_FOUND,
    /// Creates a `409 Conflict` error (`ConflictError`).
    conflict => CONFLICT,
    /// Creates a `500 Internal Server Error` error (`InternalServerError`).
    internal_server_error => INTERNAL_SERVER_ERROR,
    /// Creates a `501 Not Implemented` error (`NotImplementedError`).
    not_implemented => NOT_IMPLEMENTED,
}

impl Default for HttpError {
    fn default() -> Self {
        Self::from_status(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

/// The message of an [`HttpError`]: a single string, or a list of strings
/// (e.g. one entry per invalid field of a form).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Message {
    /// A single message.
    Text(String),
    /// A list of messages.
    List(Vec<String>),
}

impl Message {
    /// Returns `true` if there is no message text at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Text(text) => text.is_empty(),
            Self::List(list) => list.is_empty(),
        }
    }
}

impl Default for Message {
    fn default() -> Self {
        Self::Text(String::new())
    }
}

impl Display for Message {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text(text) => f.write_str(text),
            Self::List(list) => f.write_str(&list.join(", ")),
        }
    }
}

impl From<&str> for Message {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for Message {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Vec<String>> for Message {
    fn from(value: Vec<String>) -> Self {
        Self::List(value)
    }
}

impl From<Vec<&str>> for Message {
    fn from(value: Vec<&str>) -> Self {
        Self::List(value.into_iter().map(str::to_owned).collect())
    }
}

impl<const N: usize> From<[&str; N]> for Message {
    fn from(value: [&str; N]) -> Self {
        Self::List(value.into_iter().map(str::to_owned).collect())
    }
}

/// The JSON body sent to clients describing a failure.
///
/// `detail` is omitted when absent; `stack` is only filled in for
/// unclassified failures when running in development mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireErrorBody {
    /// The HTTP status code.
    pub status: u16,
    /// The error name, e.g. `NotFoundError`.
    pub error: String,
    /// The message shown to the client.
    pub message: Message,
    /// Structured detail, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<serde_json::Value>,
    /// The originating stack, development mode only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn new_derives_name_from_status() {
        let error = HttpError::new("slow down", StatusCode::TOO_MANY_REQUESTS);

        assert_eq!(error.name(), "TooManyRequestsError");
        assert_eq!(error.message(), &Message::Text("slow down".to_owned()));
        assert_eq!(error.to_string(), "slow down");
    }

    #[test]
    fn default_is_internal_server_error() {
        let error = HttpError::default();

        assert_eq!(error.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(error.name(), "InternalServerError");
        assert_eq!(error.to_string(), "InternalServerError");
    }

    #[test]
    fn empty_message_defaults_to_name() {
        let error = HttpError::forbidden("");

        assert_eq!(error.message(), &Message::Text("ForbiddenError".to_owned()));
    }

    #[test]
    fn list_message_is_kept() {
        let error = HttpError::bad_request(["name is required", "age must be positive"]);

        assert_eq!(
            error.message(),
            &Message::List(vec![
                "name is required".to_owned(),
                "age must be positive".to_owned()
            ])
        );
        assert_eq!(
            error.to_string(),
            "name is required, age must be positive"
        );
        assert_eq!(
            serde_json::to_value(error.to_wire_body()).unwrap(),
            json!({
                "status": 400,
                "error": "BadRequestError",
                "message": ["name is required", "age must be positive"],
            })
        );
    }

    #[test]
    fn empty_list_defaults_to_name() {
        let error = HttpError::bad_request(Vec::<String>::new());

        assert_eq!(
            error.message(),
            &Message::Text("BadRequestError".to_owned())
        );
    }

    #[test]
    fn named_constructors() {
        let cases = [
            (HttpError::bad_request("x"), 400, "BadRequestError"),
            (HttpError::unauthorized("x"), 401, "UnauthorizedError"),
            (HttpError::payment_required("x"), 402, "PaymentRequiredError"),
            (HttpError::forbidden("x"), 403, "ForbiddenError"),
            (HttpError::not_found("x"), 404, "NotFoundError"),
            (HttpError::conflict("x"), 409, "ConflictError"),
            (HttpError::internal_server_error("x"), 500, "InternalServerError"),
            (HttpError::not_implemented("x"), 501, "NotImplementedError"),
        ];

        for (error, status, name) in cases {
            assert_eq!(error.status().as_u16(), status);
            assert_eq!(error.name(), name);
        }
    }

    #[test]
    fn unregistered_status_uses_generic_name() {
        let error = HttpError::try_new("custom", 499).unwrap();

        assert_eq!(error.name(), "HttpError");
        assert_eq!(error.to_wire_body().error, "HttpError");
    }

    #[test]
    fn non_error_status_uses_generic_name() {
        let error = HttpError::new("moved", StatusCode::MOVED_PERMANENTLY);

        assert_eq!(error.name(), "HttpError");
    }

    #[test]
    fn try_new_rejects_illegal_status() {
        assert!(HttpError::try_new("x", 99).is_err());
        assert!(HttpError::try_new("x", 1000).is_err());
    }

    #[test]
    fn wire_body_without_detail() {
        let body = HttpError::not_found("missing").to_wire_body();

        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({"status": 404, "error": "NotFoundError", "message": "missing"})
        );
    }

    #[test]
    fn wire_body_with_detail() {
        let body = HttpError::conflict("duplicate")
            .with_detail(json!({"field": "email"}))
            .to_wire_body();

        assert_eq!(body.detail, Some(json!({"field": "email"})));
        assert_eq!(
            serde_json::to_value(&body).unwrap()["detail"],
            json!({"field": "email"})
        );
    }

    #[test]
    fn null_detail_is_omitted() {
        let error = HttpError::conflict("duplicate").with_detail(serde_json::Value::Null);

        assert!(error.detail().is_none());
        let value = serde_json::to_value(error.to_wire_body()).unwrap();
        assert!(value.get("detail").is_none());
    }

    #[test]
    fn wire_body_deserializes() {
        let body: WireErrorBody = serde_json::from_value(json!({
            "status": 401,
            "error": "UnauthorizedError",
            "message": "log in first",
        }))
        .unwrap();

        assert_eq!(body, HttpError::unauthorized("log in first").to_wire_body());
    }
}
