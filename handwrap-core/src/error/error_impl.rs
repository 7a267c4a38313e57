use std::error::Error as StdError;
use std::fmt::Display;
use std::ops::Deref;

use derive_more::with_trait::Debug;

use crate::StatusCode;
use crate::error::backtrace::{__handwrap_create_backtrace, Backtrace as HandwrapBacktrace};
use crate::error::http_error::HttpError;

/// An error raised while handling a request.
///
/// This is the error type handlers return and that the proceed primitive
/// carries to the error chain. It either wraps an [`HttpError`] (a
/// classified failure with an intentional status code) or any other error
/// (an unclassified failure, reported as 500 Internal Server Error).
pub struct Error {
    repr: Box<ErrorImpl>,
}

impl Error {
    /// Create a new error wrapping a custom error message or error type.
    ///
    /// The new error does not have a status code of its own. If in the
    /// chain of `Error` sources there is an error with a status code, it
    /// will be used instead. If not, 500 Internal Server Error is used.
    #[must_use]
    pub fn wrap<E>(error: E) -> Self
    where
        E: Into<Box<dyn StdError + Send + Sync + 'static>>,
    {
        Self {
            repr: Box::new(ErrorImpl {
                inner: error.into(),
                status_code: None,
                backtrace: __handwrap_create_backtrace(),
            }),
        }
    }

    /// Create a new error associated with 500 Internal Server Error.
    ///
    /// # Examples
    ///
    /// ```
    /// use handwrap_core::{Error, StatusCode};
    ///
    /// let error = Error::internal("database is down");
    /// assert_eq!(error.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    /// assert!(!error.is_http_error());
    /// ```
    #[must_use]
    pub fn internal<E>(error: E) -> Self
    where
        E: Into<Box<dyn StdError + Send + Sync + 'static>>,
    {
        Self::with_status(error, StatusCode::INTERNAL_SERVER_ERROR)
    }

    /// Create a new error with a specific HTTP status code.
    ///
    /// Note that this does not make the error a classified failure: only
    /// an [`HttpError`] is reported to clients verbatim. Use
    /// [`HttpError::new`] for failures whose message is safe to disclose.
    ///
    /// # Examples
    ///
    /// ```
    /// use handwrap_core::{Error, StatusCode};
    ///
    /// let error = Error::with_status("upstream timed out", StatusCode::GATEWAY_TIMEOUT);
    /// assert_eq!(error.status_code(), StatusCode::GATEWAY_TIMEOUT);
    /// ```
    #[must_use]
    pub fn with_status<E>(error: E, status_code: StatusCode) -> Self
    where
        E: Into<Box<dyn StdError + Send + Sync + 'static>>,
    {
        let error = Self {
            repr: Box::new(ErrorImpl {
                inner: error.into(),
                status_code: Some(status_code),
                backtrace: __handwrap_create_backtrace(),
            }),
        };
        Self::wrap(WithStatusCode(error))
    }

    /// Returns the HTTP status code associated with this error.
    ///
    /// The status of a wrapped [`HttpError`] takes precedence over the status
    /// recorded on the wrappers around it.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        if let Some(http_error) = self.as_http_error() {
            return http_error.status();
        }

        self.inner()
            .repr
            .status_code
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    /// Returns the stack captured when this error was created.
    #[must_use]
    pub fn backtrace(&self) -> &HandwrapBacktrace {
        &self.repr.backtrace
    }

    /// Returns a reference to inner `Error`, if `self` is wrapping a wrapper.
    /// Otherwise, it returns `self`.
    ///
    /// This is the first `Error` in the chain that has a status code
    /// associated with it, which is usually the error originally raised by
    /// the handler before anything wrapped it.
    #[must_use]
    pub fn inner(&self) -> &Self {
        let mut error: &dyn StdError = self;
        while let Some(inner) = error.source() {
            if let Some(error) = inner.downcast_ref::<Self>()
                && !error.is_wrapper()
            {
                return error;
            }
            error = inner;
        }
        self
    }

    /// Returns `true` if this error has been created with [`Error::wrap`],
    /// i.e. it does not have a status code of its own.
    #[must_use]
    pub fn is_wrapper(&self) -> bool {
        self.repr.status_code.is_none()
    }

    /// Returns the [`HttpError`] this error was constructed from, if any.
    ///
    /// # Examples
    ///
    /// ```
    /// use handwrap_core::Error;
    /// use handwrap_core::error::HttpError;
    ///
    /// let error = Error::from(HttpError::not_found("missing"));
    /// assert_eq!(error.as_http_error().unwrap().name(), "NotFoundError");
    ///
    /// let wrapped = Error::wrap(error);
    /// assert!(wrapped.as_http_error().is_some());
    /// ```
    #[must_use]
    pub fn as_http_error(&self) -> Option<&HttpError> {
        self.downcast_ref::<HttpError>()
    }

    /// Returns `true` if this error is a classified failure, i.e. it has
    /// been constructed from an [`HttpError`].
    #[must_use]
    pub fn is_http_error(&self) -> bool {
        self.as_http_error().is_some()
    }

    /// Returns the wrapped error of type `E`, looking through wrappers.
    #[must_use]
    pub fn downcast_ref<E: StdError + 'static>(&self) -> Option<&E> {
        self.inner()
            .repr
            .inner
            .downcast_ref::<E>()
            .or_else(|| self.repr.inner.downcast_ref::<E>())
    }
}

/// Returns `true` if `error` has been constructed from an [`HttpError`].
///
/// This is the capability test used to tell expected, already classified
/// failures apart from arbitrary ones.
#[must_use]
pub fn is_http_error(error: &Error) -> bool {
    error.is_http_error()
}

impl Debug for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Debug::fmt(&self.repr, f)
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.repr.inner, f)
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.repr.inner.source()
    }
}

impl Deref for Error {
    type Target = dyn StdError + Send + Sync;

    fn deref(&self) -> &Self::Target {
        &*self.repr.inner
    }
}

impl From<HttpError> for Error {
    fn from(error: HttpError) -> Self {
        let status_code = error.status();
        Self::with_status(error, status_code)
    }
}

#[derive(Debug)]
struct ErrorImpl {
    inner: Box<dyn StdError + Send + Sync>,
    status_code: Option<StatusCode>,
    #[debug(skip)]
    backtrace: HandwrapBacktrace,
}

/// Indicates that the inner `Error` has a status code associated with it.
///
/// This is important, as we need to have this `Error` to be returned
/// by `std::error::Error::source` to be able to extract the status code.
#[derive(Debug)]
struct WithStatusCode(Error);

impl Display for WithStatusCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl StdError for WithStatusCode {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        Some(&self.0)
    }
}

/// Implements `From<$error_ty> for handwrap_core::Error`, optionally with a
/// fixed status code.
#[macro_export]
macro_rules! impl_into_handwrap_error {
    ($error_ty:ty) => {
        impl From<$error_ty> for $crate::Error {
            fn from(err: $error_ty) -> Self {
                $crate::Error::internal(err)
            }
        }
    };
    ($error_ty:ty, $status_code:ident) => {
        impl From<$error_ty> for $crate::Error {
            fn from(err: $error_ty) -> Self {
                $crate::Error::with_status(err, $crate::StatusCode::$status_code)
            }
        }
    };
}
pub use impl_into_handwrap_error;

#[derive(Debug, thiserror::Error)]
#[error("failed to serialize JSON: {0}")]
struct SerializeJson(#[from] serde_json::Error);
impl_into_handwrap_error!(SerializeJson);
impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::from(SerializeJson(err))
    }
}

#[derive(Debug, thiserror::Error)]
#[error("failed to build response: {0}")]
struct BuildResponse(#[from] http::Error);
impl_into_handwrap_error!(BuildResponse);
impl From<http::Error> for Error {
    fn from(err: http::Error) -> Self {
        Error::from(BuildResponse(err))
    }
}

#[cfg(test)]
mod tests {
    use serde::ser::Error as _;

    use super::*;

    #[test]
    fn error_new() {
        let inner = std::io::Error::other("server error");
        let error = Error::wrap(inner);

        assert!(StdError::source(&error).is_none());
        assert_eq!(error.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn error_display() {
        let inner = std::io::Error::other("server error");
        let error = Error::internal(inner);

        assert_eq!(format!("{error}"), "server error");
    }

    #[test]
    fn error_with_status_propagation() {
        let error = Error::with_status("bad request", StatusCode::BAD_REQUEST);
        assert_eq!(error.status_code(), StatusCode::BAD_REQUEST);
        // wrapping again should not override the status code
        let wrapped = Error::wrap(error);

        assert_eq!(wrapped.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn error_inner_multiple_wrapped() {
        let error = Error::with_status("bad request", StatusCode::BAD_REQUEST);
        let wrapped = Error::wrap(error);
        let wrapped_twice = Error::wrap(wrapped);
        let wrapped_thrice = Error::wrap(wrapped_twice);

        assert_eq!(wrapped_thrice.to_string(), "bad request");
        assert_eq!(
            wrapped_thrice.inner().status_code(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn error_deref_to_inner() {
        let error = Error::internal("deref test");
        let msg = format!("{}", &*error);

        assert_eq!(msg, "deref test");
    }

    #[test]
    fn http_error_is_classified() {
        let error = Error::from(HttpError::forbidden("no access"));

        assert!(error.is_http_error());
        assert!(is_http_error(&error));
        assert_eq!(error.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(error.to_string(), "no access");
    }

    #[test]
    fn plain_error_is_not_classified() {
        let error = Error::with_status("teapot", StatusCode::IM_A_TEAPOT);

        assert!(!error.is_http_error());
        assert!(error.as_http_error().is_none());
    }

    #[test]
    fn http_error_survives_wrapping() {
        let error = Error::wrap(Error::wrap(Error::from(HttpError::conflict("taken"))));

        let http_error = error.as_http_error().unwrap();
        assert_eq!(http_error.status(), StatusCode::CONFLICT);
        assert_eq!(error.status_code(), StatusCode::CONFLICT);
    }

    #[test]
    fn http_error_wrapped_directly() {
        let error = Error::wrap(HttpError::bad_request("invalid"));

        assert!(error.is_http_error());
        assert_eq!(error.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn http_error_status_wins_over_wrapper_status() {
        let error = Error::internal(HttpError::payment_required("pay up"));

        assert!(error.is_http_error());
        assert_eq!(error.status_code(), StatusCode::PAYMENT_REQUIRED);
    }

    #[test]
    fn error_from_serde_json() {
        let error: Error = serde_json::Error::custom("bad value").into();

        assert!(error.to_string().contains("failed to serialize JSON"));
        assert!(!error.is_http_error());
    }
}
