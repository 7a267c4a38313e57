//! A [`tower::Service`] running a chain of wrapped handlers.
//!
//! [`HandlerService`] is the bridge to hosts built on `tower`: it runs its
//! stages in order on one shared response, moving to the next stage whenever
//! a handler calls [`Next::proceed`], and hands forwarded errors to a
//! [`GlobalErrorHandler`].
//!
//! # Examples
//!
//! ```
//! use handwrap::error::HttpError;
//! use handwrap::next::Next;
//! use handwrap::request::Request;
//! use handwrap::response::ResponseWriter;
//! use handwrap::service::HandlerService;
//! use handwrap::{StatusCode, wrap_handler};
//! use tower::ServiceExt;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let service = HandlerService::new(wrap_handler(
//!     |_: Request, _: ResponseWriter, _: Next| Err::<(), _>(HttpError::forbidden("no access")),
//! ));
//!
//! let response = service.oneshot(Request::default()).await.unwrap();
//! assert_eq!(response.status(), StatusCode::FORBIDDEN);
//! # }
//! ```

use std::convert::Infallible;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use derive_more::with_trait::Debug;
use tracing::{debug, warn};

use crate::Error;
use crate::error::HttpError;
use crate::error_handler::GlobalErrorHandler;
use crate::handler::WrappedHandler;
use crate::next::{Flow, Next};
use crate::request::Request;
use crate::response::{Response, ResponseWriter};

/// A service running wrapped handlers in order until one of them responds.
///
/// Each stage gets its own [`Next`] and shares the response with the other
/// stages:
/// * if the stage responds, the response is returned,
/// * if it calls [`Next::proceed`] without responding, the next stage runs
///   (a `404 Not Found` is returned after the last one),
/// * if it forwards an error, the error is translated by the
///   [`GlobalErrorHandler`].
#[derive(Debug, Clone)]
pub struct HandlerService {
    #[debug("{} stage(s)", stages.len())]
    stages: Arc<[WrappedHandler]>,
    error_handler: GlobalErrorHandler,
}

impl HandlerService {
    /// Creates a service with a single stage and the default error handler.
    #[must_use]
    pub fn new(handler: WrappedHandler) -> Self {
        Self::with_stages([handler])
    }

    /// Creates a service running `stages` in order.
    #[must_use]
    pub fn with_stages<I: IntoIterator<Item = WrappedHandler>>(stages: I) -> Self {
        Self {
            stages: stages.into_iter().collect(),
            error_handler: GlobalErrorHandler::default(),
        }
    }

    /// Sets the error handler translating forwarded errors.
    #[must_use]
    pub fn error_handler(mut self, error_handler: GlobalErrorHandler) -> Self {
        self.error_handler = error_handler;
        self
    }

    /// Runs the stages for `request` and returns the response.
    pub async fn run(&self, request: Request) -> Response {
        let response = ResponseWriter::new();

        for (index, stage) in self.stages.iter().enumerate() {
            let next = Next::new();
            let outcome = stage
                .call(copy_request(&request), response.clone(), next.clone())
                .await;
            debug!(stage = index, outcome = ?outcome, "handler stage finished");

            match next.flow() {
                Some(Flow::Fail(error)) => {
                    return self.respond_with_error(error, &response);
                }
                Some(Flow::Proceed) if !response.is_sent() => {}
                _ => {
                    if let Some(sent) = response.take_response() {
                        return sent;
                    }
                    warn!(
                        stage = index,
                        outcome = ?outcome,
                        "handler finished without responding or signalling the next stage"
                    );
                    return self.error_handler.to_response(&Error::internal(
                        "handler finished without responding",
                    ));
                }
            }
        }

        if let Some(sent) = response.take_response() {
            return sent;
        }
        debug!(path = %request.uri().path(), "no handler stage responded");
        let error = HttpError::not_found(format!("Not found: {}", request.uri().path()));
        self.error_handler.to_response(&error.into())
    }

    fn respond_with_error(&self, error: &Error, response: &ResponseWriter) -> Response {
        match response.take_response() {
            Some(sent) => {
                warn!(
                    error = %error,
                    "error forwarded after the response was sent; keeping the sent response"
                );
                sent
            }
            None => self.error_handler.to_response(error),
        }
    }
}

fn copy_request(request: &Request) -> Request {
    let mut copy = Request::new(request.body().clone());
    *copy.method_mut() = request.method().clone();
    *copy.uri_mut() = request.uri().clone();
    *copy.version_mut() = request.version();
    *copy.headers_mut() = request.headers().clone();
    *copy.extensions_mut() = request.extensions().clone();
    copy
}

impl tower::Service<Request> for HandlerService {
    type Response = Response;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: Request) -> Self::Future {
        let service = self.clone();
        Box::pin(async move { Ok(service.run(request).await) })
    }
}
