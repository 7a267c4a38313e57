//! Request handler traits and the handler wrapper.
//!
//! This module provides the [`Handler`] trait, implemented for every sync or
//! async function that takes a [`Request`], a [`ResponseWriter`] and a
//! [`Next`], and returns something that converts [into a
//! reply](IntoReply). [`wrap_handler`] turns such a function into a
//! [`WrappedHandler`], which maps each invocation to exactly one
//! [`Outcome`].

use std::future::Future;
use std::marker::PhantomData;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::Arc;

use derive_more::with_trait::Debug;
use futures_util::FutureExt;
use tracing::{debug, warn};

use crate::error::UncaughtPanic;
use crate::next::Next;
use crate::reply::{IntoReply, Reply};
use crate::request::Request;
use crate::response::ResponseWriter;
use crate::{Error, Result};

/// A function that handles a request.
///
/// You shouldn't usually need to implement this directly, as it is already
/// implemented for closures and functions that:
/// * take a [`Request`], a [`ResponseWriter`] and a [`Next`], in this order
/// * return a type that implements [`IntoReply`], either directly or as the
///   output of a `Send` future
/// * are `Clone + Send + Sync + 'static` (important if it's a closure)
///
/// The type parameter is either [`Asynchronous`] or [`Synchronous`] and only
/// tells the two implementations apart.
#[diagnostic::on_unimplemented(
    message = "`{Self}` is not a valid request handler",
    label = "not a valid request handler",
    note = "make sure the function takes `(Request, ResponseWriter, Next)`",
    note = "make sure the function returns a type that implements `IntoReply`, or a future of one",
    note = "make sure the returned future is `Send`"
)]
pub trait Handler<T>: Clone + Send + Sync + 'static {
    /// Runs the handler and converts its return value into a [`Reply`].
    ///
    /// # Errors
    ///
    /// Returns the error the handler returned, or an error if its return
    /// value could not be converted.
    fn invoke(
        &self,
        request: Request,
        response: ResponseWriter,
        next: Next,
    ) -> impl Future<Output = Result<Reply>> + Send;
}

/// Marks handlers that return a future.
#[derive(Debug, Copy, Clone)]
pub enum Asynchronous {}

/// Marks handlers that return their value directly.
#[derive(Debug, Copy, Clone)]
pub enum Synchronous {}

impl<Func, Fut, R> Handler<Asynchronous> for Func
where
    Func: Fn(Request, ResponseWriter, Next) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = R> + Send,
    R: IntoReply,
{
    async fn invoke(
        &self,
        request: Request,
        response: ResponseWriter,
        next: Next,
    ) -> Result<Reply> {
        self(request, response, next).await.into_reply()
    }
}

impl<Func, R> Handler<Synchronous> for Func
where
    Func: Fn(Request, ResponseWriter, Next) -> R + Clone + Send + Sync + 'static,
    R: IntoReply,
{
    async fn invoke(
        &self,
        request: Request,
        response: ResponseWriter,
        next: Next,
    ) -> Result<Reply> {
        self(request, response, next).into_reply()
    }
}

trait BoxHandler: Send + Sync {
    fn invoke(
        &self,
        request: Request,
        response: ResponseWriter,
        next: Next,
    ) -> Pin<Box<dyn Future<Output = Result<Reply>> + Send + '_>>;
}

struct Inner<T, H>(H, PhantomData<fn() -> T>);

impl<T, H: Handler<T>> BoxHandler for Inner<T, H> {
    fn invoke(
        &self,
        request: Request,
        response: ResponseWriter,
        next: Next,
    ) -> Pin<Box<dyn Future<Output = Result<Reply>> + Send + '_>> {
        Box::pin(self.0.invoke(request, response, next))
    }
}

/// What a [`WrappedHandler`] did with one invocation.
///
/// Exactly one of these happens per call: the wrapper never both writes a
/// response and forwards an error.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Outcome {
    /// The handler's return value was written to the response.
    Responded,
    /// The handler's error was forwarded to the next stage.
    Forwarded,
    /// Nothing was done; the handler took care of the response or of the
    /// next stage itself.
    Skipped,
}

/// A handler whose return values and errors are turned into a response
/// write or a forward to the next stage.
///
/// Created by [`wrap_handler`].
#[derive(Debug, Clone)]
pub struct WrappedHandler {
    #[debug("..")]
    handler: Arc<dyn BoxHandler>,
}

impl WrappedHandler {
    /// Wraps a handler. See [`wrap_handler`].
    #[must_use]
    pub fn new<T, H>(handler: H) -> Self
    where
        T: 'static,
        H: Handler<T>,
    {
        Self {
            handler: Arc::new(Inner(handler, PhantomData)),
        }
    }

    /// Invokes the handler and acts on its outcome.
    ///
    /// * If the handler returns an error or panics, the error is forwarded
    ///   with [`Next::fail`].
    /// * If it returns a [structured](Reply::Structured) or
    ///   [raw](Reply::Raw) reply, the reply is written to `response`.
    /// * If it returns [`Reply::Handled`] (or anything converting to it),
    ///   nothing happens.
    ///
    /// A reply is discarded with a warning instead of written when the
    /// handler already sent the response or already signalled `next`.
    pub async fn call(&self, request: Request, response: ResponseWriter, next: Next) -> Outcome {
        let invocation =
            AssertUnwindSafe(self.handler.invoke(request, response.clone(), next.clone()))
                .catch_unwind()
                .await;

        let result = match invocation {
            Ok(result) => result,
            Err(payload) => Err(Error::from(UncaughtPanic::new(payload))),
        };

        settle(result, &response, &next)
    }
}

fn settle(result: Result<Reply>, response: &ResponseWriter, next: &Next) -> Outcome {
    let reply = match result {
        Ok(reply) => reply,
        Err(error) => return forward(error, next),
    };

    if reply.is_handled() {
        return Outcome::Skipped;
    }
    if next.is_signalled() {
        warn!("handler returned a value after signalling the next stage; discarding it");
        return Outcome::Skipped;
    }
    if response.is_sent() {
        warn!("handler returned a value after sending the response; discarding it");
        return Outcome::Skipped;
    }

    match reply.write_to(response) {
        Ok(_) => Outcome::Responded,
        Err(error) => forward(error, next),
    }
}

fn forward(error: Error, next: &Next) -> Outcome {
    debug!(
        error = %error,
        classified = error.is_http_error(),
        "forwarding handler error to the next stage"
    );

    if next.fail(error) {
        Outcome::Forwarded
    } else {
        Outcome::Skipped
    }
}

/// Wraps a handler so that every invocation produces exactly one response
/// action.
///
/// Sync and async handlers are treated identically: a value returned
/// directly and the same value returned from a future produce the same
/// response.
///
/// # Examples
///
/// ```
/// use handwrap::error::HttpError;
/// use handwrap::next::Next;
/// use handwrap::request::Request;
/// use handwrap::response::ResponseWriter;
/// use handwrap::{Outcome, wrap_handler};
///
/// # #[tokio::main]
/// # async fn main() {
/// let handler = wrap_handler(|_request: Request, _response: ResponseWriter, _next: Next| {
///     Err::<String, _>(HttpError::not_found("missing"))
/// });
///
/// let next = Next::new();
/// let outcome = handler
///     .call(Request::default(), ResponseWriter::new(), next.clone())
///     .await;
///
/// assert_eq!(outcome, Outcome::Forwarded);
/// assert!(next.error().unwrap().is_http_error());
/// # }
/// ```
#[must_use]
pub fn wrap_handler<T, H>(handler: H) -> WrappedHandler
where
    T: 'static,
    H: Handler<T>,
{
    WrappedHandler::new(handler)
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tracing_test::traced_test;

    use super::*;
    use crate::error::HttpError;
    use crate::next::Flow;
    use crate::reply::{ApiRes, Json};
    use crate::{Body, StatusCode};

    async fn run(handler: &WrappedHandler) -> (Outcome, ResponseWriter, Next) {
        let response = ResponseWriter::new();
        let next = Next::new();
        let outcome = handler
            .call(Request::default(), response.clone(), next.clone())
            .await;
        (outcome, response, next)
    }

    fn body_json(response: &ResponseWriter) -> serde_json::Value {
        let response = response.take_response().unwrap();
        serde_json::from_slice(response.body().as_bytes()).unwrap()
    }

    #[tokio::test]
    async fn async_structured_reply() {
        async fn handler(
            _: Request,
            _: ResponseWriter,
            _: Next,
        ) -> Result<ApiRes<serde_json::Value>> {
            Ok(ApiRes::created(json!({"id": 1})))
        }

        let (outcome, response, next) = run(&wrap_handler(handler)).await;

        assert_eq!(outcome, Outcome::Responded);
        assert!(!next.is_signalled());
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(body_json(&response), json!({"id": 1}));
    }

    #[tokio::test]
    async fn sync_structured_reply() {
        fn handler(_: Request, _: ResponseWriter, _: Next) -> ApiRes<serde_json::Value> {
            ApiRes::created(json!({"id": 1}))
        }

        let (outcome, response, _) = run(&wrap_handler(handler)).await;

        assert_eq!(outcome, Outcome::Responded);
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(body_json(&response), json!({"id": 1}));
    }

    #[tokio::test]
    async fn raw_value_uses_current_status() {
        let handler = wrap_handler(|_: Request, response: ResponseWriter, _: Next| async move {
            response.set_status(StatusCode::ACCEPTED);
            Json(json!({"message": "hi"}))
        });

        let (outcome, response, _) = run(&handler).await;

        assert_eq!(outcome, Outcome::Responded);
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(body_json(&response), json!({"message": "hi"}));
    }

    #[tokio::test]
    async fn handler_wrote_response_itself() {
        let handler = wrap_handler(|_: Request, response: ResponseWriter, _: Next| {
            response.send("done")?;
            Ok::<_, Error>(response)
        });

        let (outcome, response, next) = run(&handler).await;

        assert_eq!(outcome, Outcome::Skipped);
        assert!(!next.is_signalled());
        let response = response.take_response().unwrap();
        assert_eq!(response.body(), &Body::fixed("done"));
    }

    #[tokio::test]
    async fn unit_return_is_skipped() {
        let handler = wrap_handler(|_: Request, _: ResponseWriter, _: Next| async {});

        let (outcome, response, next) = run(&handler).await;

        assert_eq!(outcome, Outcome::Skipped);
        assert!(!response.is_sent());
        assert!(!next.is_signalled());
    }

    #[tokio::test]
    async fn sync_error_is_forwarded() {
        let handler = wrap_handler(|_: Request, _: ResponseWriter, _: Next| {
            Err::<(), _>(HttpError::unauthorized("log in first"))
        });

        let (outcome, response, next) = run(&handler).await;

        assert_eq!(outcome, Outcome::Forwarded);
        assert!(!response.is_sent());
        let error = next.error().unwrap();
        assert_eq!(error.as_http_error().unwrap().name(), "UnauthorizedError");
    }

    #[tokio::test]
    async fn async_error_is_forwarded() {
        let handler = wrap_handler(|_: Request, _: ResponseWriter, _: Next| async {
            tokio::task::yield_now().await;
            Err::<String, _>(Error::internal("database is down"))
        });

        let (outcome, response, next) = run(&handler).await;

        assert_eq!(outcome, Outcome::Forwarded);
        assert!(!response.is_sent());
        assert_eq!(next.error().unwrap().to_string(), "database is down");
    }

    #[tokio::test]
    async fn sync_panic_is_forwarded() {
        let handler = wrap_handler(|_: Request, _: ResponseWriter, _: Next| -> String {
            panic!("sync boom");
        });

        let (outcome, response, next) = run(&handler).await;

        assert_eq!(outcome, Outcome::Forwarded);
        assert!(!response.is_sent());
        let error = next.error().unwrap();
        let panic = error.downcast_ref::<UncaughtPanic>().unwrap();
        assert_eq!(panic.message().as_deref(), Some("sync boom"));
    }

    #[tokio::test]
    async fn async_panic_is_forwarded() {
        let handler = wrap_handler(|_: Request, _: ResponseWriter, _: Next| async {
            tokio::task::yield_now().await;
            if true {
                panic!("async boom");
            }
            "unreachable"
        });

        let (outcome, _, next) = run(&handler).await;

        assert_eq!(outcome, Outcome::Forwarded);
        assert!(next.error().unwrap().downcast_ref::<UncaughtPanic>().is_some());
    }

    #[tokio::test]
    async fn handler_can_proceed() {
        let handler = wrap_handler(|_: Request, _: ResponseWriter, next: Next| {
            next.proceed();
        });

        let (outcome, response, next) = run(&handler).await;

        assert_eq!(outcome, Outcome::Skipped);
        assert!(!response.is_sent());
        assert!(matches!(next.flow(), Some(Flow::Proceed)));
    }

    #[tokio::test]
    #[traced_test]
    async fn value_after_send_is_discarded() {
        let handler = wrap_handler(|_: Request, response: ResponseWriter, _: Next| {
            response.send("first")?;
            Ok::<_, Error>("second")
        });

        let (outcome, response, next) = run(&handler).await;

        assert_eq!(outcome, Outcome::Skipped);
        assert!(!next.is_signalled());
        assert_eq!(
            response.take_response().unwrap().body(),
            &Body::fixed("first")
        );
        assert!(logs_contain("after sending the response"));
    }

    #[tokio::test]
    #[traced_test]
    async fn value_after_next_is_discarded() {
        let handler = wrap_handler(|_: Request, _: ResponseWriter, next: Next| {
            next.proceed();
            "ignored"
        });

        let (outcome, response, _) = run(&handler).await;

        assert_eq!(outcome, Outcome::Skipped);
        assert!(!response.is_sent());
        assert!(logs_contain("after signalling the next stage"));
    }

    #[tokio::test]
    async fn error_after_manual_fail_is_not_forwarded_twice() {
        let handler = wrap_handler(|_: Request, _: ResponseWriter, next: Next| {
            next.fail(HttpError::forbidden("first"));
            Err::<(), _>(Error::internal("second"))
        });

        let (outcome, _, next) = run(&handler).await;

        assert_eq!(outcome, Outcome::Skipped);
        assert_eq!(next.error().unwrap().to_string(), "first");
    }

    #[tokio::test]
    async fn sync_and_async_are_equivalent() {
        let sync = wrap_handler(|_: Request, _: ResponseWriter, _: Next| {
            Ok::<_, Error>(Json(json!({"same": true})))
        });
        let asynchronous = wrap_handler(|_: Request, _: ResponseWriter, _: Next| async {
            Ok::<_, Error>(Json(json!({"same": true})))
        });

        let (sync_outcome, sync_response, _) = run(&sync).await;
        let (async_outcome, async_response, _) = run(&asynchronous).await;

        assert_eq!(sync_outcome, async_outcome);
        let sync_response = sync_response.take_response().unwrap();
        let async_response = async_response.take_response().unwrap();
        assert_eq!(sync_response.status(), async_response.status());
        assert_eq!(sync_response.headers(), async_response.headers());
        assert_eq!(sync_response.body(), async_response.body());
    }

    #[tokio::test]
    async fn wrapped_handler_is_reusable() {
        let handler = wrap_handler(|_: Request, _: ResponseWriter, _: Next| "hello");

        for _ in 0..3 {
            let (outcome, response, _) = run(&handler).await;
            assert_eq!(outcome, Outcome::Responded);
            assert_eq!(
                response.take_response().unwrap().body(),
                &Body::fixed("hello")
            );
        }
    }
}
