//! The terminal error-to-response translator.
//!
//! [`GlobalErrorHandler`] sits at the end of the error chain. Classified
//! failures ([`HttpError`]s) are written with their own status code and wire
//! body. Anything else is reported as a generic `500 Internal Server Error`
//! that only reveals the original message and stack in development mode.

use std::fmt::Write as _;
use std::sync::Arc;

use derive_more::with_trait::Debug;
use http::HeaderValue;
use http::header::CONTENT_TYPE;
use tracing::{Level, debug, error, warn};

use crate::config::ErrorHandlerConfig;
use crate::error::{HttpError, Message, WireErrorBody};
use crate::headers::JSON_CONTENT_TYPE;
use crate::response::{Response, ResponseWriter};
use crate::status::name_for_status;
use crate::{Body, Error, Result, StatusCode};

/// The message sent for unclassified failures outside development mode.
pub const GENERIC_ERROR_MESSAGE: &str = "Something went wrong";

const FALLBACK_BODY: &str =
    r#"{"status":500,"error":"InternalServerError","message":"Something went wrong"}"#;

/// A callback invoked with every unclassified failure before it is
/// translated, typically to log it.
pub type ErrorWriter = Arc<dyn Fn(&Error) + Send + Sync>;

/// Translates errors that reach the end of the error chain into JSON
/// responses.
///
/// # Examples
///
/// ```
/// use handwrap::config::ErrorHandlerConfig;
/// use handwrap::error::HttpError;
/// use handwrap::{Error, GlobalErrorHandler, StatusCode};
///
/// let handler = GlobalErrorHandler::new(ErrorHandlerConfig::default());
///
/// let (status, body) = handler.wire_body(&HttpError::not_found("missing").into());
/// assert_eq!(status, StatusCode::NOT_FOUND);
/// assert_eq!(body.error, "NotFoundError");
///
/// let (status, body) = handler.wire_body(&Error::internal("secret connection string"));
/// assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
/// assert_eq!(body.message.to_string(), "Something went wrong");
/// assert!(body.stack.is_none());
/// ```
#[derive(Debug, Clone, Default)]
pub struct GlobalErrorHandler {
    config: ErrorHandlerConfig,
    #[debug("..")]
    write: Option<ErrorWriter>,
}

impl GlobalErrorHandler {
    /// Creates a new error handler without a writer.
    #[must_use]
    pub fn new(config: ErrorHandlerConfig) -> Self {
        Self {
            config,
            write: None,
        }
    }

    /// Sets the callback invoked with every unclassified failure.
    ///
    /// # Examples
    ///
    /// ```
    /// use handwrap::GlobalErrorHandler;
    /// use handwrap::config::ErrorHandlerConfig;
    /// use handwrap::error_handler::tracing_writer;
    ///
    /// let handler =
    ///     GlobalErrorHandler::new(ErrorHandlerConfig::default()).with_writer(tracing_writer());
    /// ```
    #[must_use]
    pub fn with_writer<F>(mut self, write: F) -> Self
    where
        F: Fn(&Error) + Send + Sync + 'static,
    {
        self.write = Some(Arc::new(write));
        self
    }

    /// Returns the configuration of this handler.
    #[must_use]
    pub fn config(&self) -> &ErrorHandlerConfig {
        &self.config
    }

    /// Computes the status code and wire body for `error`, without invoking
    /// the writer.
    #[must_use]
    pub fn wire_body(&self, error: &Error) -> (StatusCode, WireErrorBody) {
        if let Some(http_error) = error.as_http_error() {
            return (http_error.status(), http_error.to_wire_body());
        }

        let status = StatusCode::INTERNAL_SERVER_ERROR;
        let body = if self.config.is_dev {
            WireErrorBody {
                status: status.as_u16(),
                error: name_for_status(status.as_u16()).to_owned(),
                message: Message::from(error.to_string()),
                detail: None,
                stack: Some(stack_of(error)),
            }
        } else {
            HttpError::internal_server_error(GENERIC_ERROR_MESSAGE).to_wire_body()
        };
        (status, body)
    }

    fn translate(&self, error: &Error) -> (StatusCode, WireErrorBody) {
        if error.is_http_error() {
            debug!(error = %error, "translating classified error");
        } else if let Some(write) = &self.write {
            write(error);
        }

        self.wire_body(error)
    }

    /// Writes the wire body for `error` to `response`.
    ///
    /// If the response has already been sent, nothing is written and a
    /// warning is logged.
    ///
    /// # Errors
    ///
    /// Returns an error if the wire body cannot be written.
    pub fn handle(&self, error: &Error, response: &ResponseWriter) -> Result<()> {
        let (status, body) = self.translate(error);

        if response.is_sent() {
            warn!(
                status = status.as_u16(),
                error = %error,
                "response already sent; not writing the error response"
            );
            return Ok(());
        }

        response.set_status(status);
        response.write_json(&body)
    }

    /// Builds a complete response for `error`.
    #[must_use]
    pub fn to_response(&self, error: &Error) -> Response {
        let (status, body) = self.translate(error);

        let (status, body) = match serde_json::to_vec(&body) {
            Ok(body) => (status, Body::fixed(body)),
            Err(serialize_error) => {
                error!(
                    error = %serialize_error,
                    "failed to serialize the error response; sending a generic one"
                );
                (StatusCode::INTERNAL_SERVER_ERROR, Body::fixed(FALLBACK_BODY))
            }
        };

        let mut response = Response::new(body);
        *response.status_mut() = status;
        response
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));
        response
    }
}

fn stack_of(error: &Error) -> String {
    let mut stack = format!("Error: {error}");
    let backtrace = error.inner().backtrace().to_string();
    if !backtrace.is_empty() {
        let _ = write!(stack, "\n{backtrace}");
    }
    stack
}

/// Creates a [`GlobalErrorHandler`] for the given configuration.
#[must_use]
pub fn global_error_handler(config: ErrorHandlerConfig) -> GlobalErrorHandler {
    GlobalErrorHandler::new(config)
}

/// Returns an error writer that logs every unclassified failure with
/// [`tracing::error!`].
#[must_use]
pub fn tracing_writer() -> impl Fn(&Error) + Send + Sync + 'static {
    |error: &Error| {
        let span = tracing::span!(Level::ERROR, "unclassified_error", error_message = %error);
        let _enter = span.enter();
        error!(status = error.status_code().as_u16(), "Request failed with error!");
    }
}
