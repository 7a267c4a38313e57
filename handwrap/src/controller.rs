//! Controllers whose handler methods are all wrapped at once.
//!
//! A [`Controller`] declares its handler methods by name in
//! [`Controller::methods`]. [`proxy_wrap`] (or [`ControllerView::construct`])
//! binds every declared method to one shared instance and passes it through
//! [`wrap_handler`](crate::wrap_handler), eagerly, when the view is created.
//! The resulting [`ControllerView`] is read-only: its methods cannot be
//! replaced afterwards.
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//!
//! use handwrap::controller::{Controller, Methods, OverrideNotAllowed};
//! use handwrap::next::Next;
//! use handwrap::reply::ApiRes;
//! use handwrap::request::Request;
//! use handwrap::response::ResponseWriter;
//! use handwrap::{Outcome, proxy_wrap};
//!
//! struct Greeter {
//!     greeting: String,
//! }
//!
//! impl Greeter {
//!     async fn greet(
//!         self: Arc<Self>,
//!         _request: Request,
//!         _response: ResponseWriter,
//!         _next: Next,
//!     ) -> ApiRes<String> {
//!         ApiRes::ok(self.greeting.clone())
//!     }
//! }
//!
//! impl Controller for Greeter {
//!     fn methods(methods: &mut Methods<Self>) -> Result<(), OverrideNotAllowed> {
//!         methods.add("greet", Self::greet)?;
//!         Ok(())
//!     }
//! }
//!
//! # #[tokio::main]
//! # async fn main() -> handwrap::Result<()> {
//! let view = proxy_wrap(Greeter {
//!     greeting: "hello".to_owned(),
//! })?;
//! assert_eq!(view.greeting, "hello");
//!
//! let outcome = view
//!     .handler("greet")?
//!     .call(Request::default(), ResponseWriter::new(), Next::new())
//!     .await;
//! assert_eq!(outcome, Outcome::Responded);
//! # Ok(())
//! # }
//! ```

use std::fmt::Formatter;
use std::future::Future;
use std::ops::Deref;
use std::sync::Arc;

use handwrap_core::error::impl_into_handwrap_error;
use indexmap::IndexMap;
use thiserror::Error;
use tracing::debug;

use crate::handler::{Asynchronous, Outcome, Synchronous, WrappedHandler};
use crate::next::Next;
use crate::reply::IntoReply;
use crate::request::Request;
use crate::response::ResponseWriter;

/// Returned when a controller method would be registered or replaced under
/// a name that is already taken.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("overriding is not allowed: `{name}`")]
pub struct OverrideNotAllowed {
    name: String,
}
impl_into_handwrap_error!(OverrideNotAllowed);

impl OverrideNotAllowed {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
        }
    }

    /// The name that could not be overridden.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Returned when a controller has no method with the requested name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown controller method: `{name}`")]
pub struct UnknownMethod {
    name: String,
}
impl_into_handwrap_error!(UnknownMethod, NOT_FOUND);

impl UnknownMethod {
    /// The name that was requested.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// A type whose handler methods can be wrapped as a whole.
///
/// Handler methods take the shared instance as an `Arc<Self>`, followed by
/// the usual handler arguments. They may be sync or async.
pub trait Controller: Send + Sync + Sized + 'static {
    /// Declares the handler methods of this controller.
    ///
    /// # Errors
    ///
    /// Returns [`OverrideNotAllowed`] if two methods are declared under the
    /// same name.
    fn methods(methods: &mut Methods<Self>) -> Result<(), OverrideNotAllowed>;
}

/// A controller method that can be bound to an instance.
///
/// Implemented for every function taking `(Arc<C>, Request, ResponseWriter,
/// Next)` and returning a value implementing [`IntoReply`], or a future of
/// one. The type parameter is either [`Asynchronous`] or [`Synchronous`].
#[diagnostic::on_unimplemented(
    message = "`{Self}` is not a valid controller method",
    label = "not a valid controller method",
    note = "make sure the function takes `(Arc<Self>, Request, ResponseWriter, Next)`",
    note = "make sure the function returns a type that implements `IntoReply`, or a future of one"
)]
pub trait ControllerMethod<C, T>: Clone + Send + Sync + 'static {
    /// Binds the method to `instance` and wraps it.
    fn bind(self, instance: Arc<C>) -> WrappedHandler;
}

impl<C, Func, Fut, R> ControllerMethod<C, Asynchronous> for Func
where
    C: Send + Sync + 'static,
    Func: Fn(Arc<C>, Request, ResponseWriter, Next) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = R> + Send,
    R: IntoReply,
{
    fn bind(self, instance: Arc<C>) -> WrappedHandler {
        WrappedHandler::new::<Asynchronous, _>(
            move |request: Request, response: ResponseWriter, next: Next| {
                self(Arc::clone(&instance), request, response, next)
            },
        )
    }
}

impl<C, Func, R> ControllerMethod<C, Synchronous> for Func
where
    C: Send + Sync + 'static,
    Func: Fn(Arc<C>, Request, ResponseWriter, Next) -> R + Clone + Send + Sync + 'static,
    R: IntoReply,
{
    fn bind(self, instance: Arc<C>) -> WrappedHandler {
        WrappedHandler::new::<Synchronous, _>(
            move |request: Request, response: ResponseWriter, next: Next| {
                self(Arc::clone(&instance), request, response, next)
            },
        )
    }
}

type Binder<C> = Box<dyn Fn(Arc<C>) -> WrappedHandler + Send + Sync>;

/// The handler methods declared by a [`Controller`], in declaration order.
pub struct Methods<C> {
    binders: IndexMap<&'static str, Binder<C>>,
}

impl<C: Send + Sync + 'static> Methods<C> {
    fn new() -> Self {
        Self {
            binders: IndexMap::new(),
        }
    }

    /// Declares a handler method under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`OverrideNotAllowed`] if a method has already been declared
    /// under `name`.
    pub fn add<T, M>(
        &mut self,
        name: &'static str,
        method: M,
    ) -> Result<&mut Self, OverrideNotAllowed>
    where
        T: 'static,
        M: ControllerMethod<C, T>,
    {
        if self.binders.contains_key(name) {
            return Err(OverrideNotAllowed::new(name));
        }
        self.binders
            .insert(name, Box::new(move |instance| method.clone().bind(instance)));
        Ok(self)
    }

    /// Returns the declared method names.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.binders.keys().copied()
    }
}

impl<C> std::fmt::Debug for Methods<C> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.binders.keys()).finish()
    }
}

/// A read-only view over a controller instance, with every declared method
/// bound to the instance and wrapped.
///
/// Non-method data of the instance is reachable through [`Deref`]; there is
/// no way to get mutable access to it or to replace a method.
pub struct ControllerView<C> {
    instance: Arc<C>,
    handlers: IndexMap<&'static str, WrappedHandler>,
}

impl<C: Controller> ControllerView<C> {
    /// Wraps an already built instance.
    ///
    /// # Errors
    ///
    /// Returns [`OverrideNotAllowed`] if the controller declares two methods
    /// under the same name.
    pub fn new(instance: C) -> Result<Self, OverrideNotAllowed> {
        Self::from_arc(Arc::new(instance))
    }

    /// Wraps a shared instance.
    ///
    /// # Errors
    ///
    /// Returns [`OverrideNotAllowed`] if the controller declares two methods
    /// under the same name.
    pub fn from_arc(instance: Arc<C>) -> Result<Self, OverrideNotAllowed> {
        let mut methods = Methods::new();
        C::methods(&mut methods)?;

        let handlers = methods
            .binders
            .iter()
            .map(|(&name, bind)| (name, bind(Arc::clone(&instance))))
            .collect::<IndexMap<_, _>>();
        debug!(
            controller = std::any::type_name::<C>(),
            methods = ?handlers.keys().collect::<Vec<_>>(),
            "wrapped controller methods"
        );

        Ok(Self { instance, handlers })
    }

    /// Builds a fresh instance from `args` and wraps it.
    ///
    /// # Errors
    ///
    /// Returns [`OverrideNotAllowed`] if the controller declares two methods
    /// under the same name.
    pub fn construct<A>(args: A) -> Result<Self, OverrideNotAllowed>
    where
        C: From<A>,
    {
        Self::new(C::from(args))
    }
}

impl<C> ControllerView<C> {
    /// Returns the wrapped method registered under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`UnknownMethod`] if the controller declares no such method.
    pub fn handler(&self, name: &str) -> Result<&WrappedHandler, UnknownMethod> {
        self.handlers.get(name).ok_or_else(|| UnknownMethod {
            name: name.to_owned(),
        })
    }

    /// Invokes the wrapped method registered under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`UnknownMethod`] if the controller declares no such method.
    pub async fn call(
        &self,
        name: &str,
        request: Request,
        response: ResponseWriter,
        next: Next,
    ) -> Result<Outcome, UnknownMethod> {
        let handler = self.handler(name)?;
        Ok(handler.call(request, response, next).await)
    }

    /// Returns the names of the wrapped methods, in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.handlers.keys().copied()
    }

    /// Returns the shared instance the methods are bound to.
    #[must_use]
    pub fn instance(&self) -> &Arc<C> {
        &self.instance
    }

    /// Attempts to replace a method of the view.
    ///
    /// Views are write-protected, so this always fails and leaves the view
    /// unchanged.
    ///
    /// # Errors
    ///
    /// Always returns [`OverrideNotAllowed`].
    pub fn override_method<T, M>(&self, name: &str, _method: M) -> Result<(), OverrideNotAllowed>
    where
        T: 'static,
        M: ControllerMethod<C, T>,
    {
        debug!(name, "rejected attempt to override a controller method");
        Err(OverrideNotAllowed::new(name))
    }
}

impl<C> Deref for ControllerView<C> {
    type Target = C;

    fn deref(&self) -> &C {
        &self.instance
    }
}

impl<C> Clone for ControllerView<C> {
    fn clone(&self) -> Self {
        Self {
            instance: Arc::clone(&self.instance),
            handlers: self.handlers.clone(),
        }
    }
}

impl<C> std::fmt::Debug for ControllerView<C> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControllerView")
            .field("controller", &std::any::type_name::<C>())
            .field("methods", &self.handlers.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

/// Wraps an already built controller instance.
///
/// See [`ControllerView::new`].
///
/// # Errors
///
/// Returns [`OverrideNotAllowed`] if the controller declares two methods
/// under the same name.
pub fn proxy_wrap<C: Controller>(instance: C) -> Result<ControllerView<C>, OverrideNotAllowed> {
    ControllerView::new(instance)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use serde_json::json;

    use super::*;
    use crate::error::HttpError;
    use crate::reply::{ApiRes, Json};
    use crate::{Error, StatusCode};

    struct Users {
        prefix: String,
        calls: AtomicUsize,
    }

    impl From<&str> for Users {
        fn from(prefix: &str) -> Self {
            Self {
                prefix: prefix.to_owned(),
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl Users {
        async fn show(
            self: Arc<Self>,
            _: Request,
            _: ResponseWriter,
            _: Next,
        ) -> ApiRes<serde_json::Value> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            ApiRes::ok(json!({"prefix": self.prefix}))
        }

        fn missing(
            self: Arc<Self>,
            _: Request,
            _: ResponseWriter,
            _: Next,
        ) -> Result<Json<()>, HttpError> {
            Err(HttpError::not_found(format!("{}: no such user", self.prefix)))
        }
    }

    impl Controller for Users {
        fn methods(methods: &mut Methods<Self>) -> Result<(), OverrideNotAllowed> {
            methods.add("show", Self::show)?.add("missing", Self::missing)?;
            Ok(())
        }
    }

    struct Duplicated;

    impl Controller for Duplicated {
        fn methods(methods: &mut Methods<Self>) -> Result<(), OverrideNotAllowed> {
            methods
                .add("index", |_: Arc<Self>, _: Request, _: ResponseWriter, _: Next| "a")?
                .add("index", |_: Arc<Self>, _: Request, _: ResponseWriter, _: Next| "b")?;
            Ok(())
        }
    }

    #[tokio::test]
    async fn construct_binds_methods() {
        let view = ControllerView::<Users>::construct("x").unwrap();
        let response = ResponseWriter::new();

        let outcome = view
            .call("show", Request::default(), response.clone(), Next::new())
            .await
            .unwrap();

        assert_eq!(outcome, Outcome::Responded);
        let response = response.take_response().unwrap();
        let body: serde_json::Value = serde_json::from_slice(response.body().as_bytes()).unwrap();
        assert_eq!(body, json!({"prefix": "x"}));
        assert_eq!(view.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn sync_method_error_is_forwarded() {
        let view = proxy_wrap(Users::from("y")).unwrap();
        let next = Next::new();

        let outcome = view
            .call("missing", Request::default(), ResponseWriter::new(), next.clone())
            .await
            .unwrap();

        assert_eq!(outcome, Outcome::Forwarded);
        let error = next.error().unwrap();
        assert_eq!(error.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(error.to_string(), "y: no such user");
    }

    #[test]
    fn names_in_declaration_order() {
        let view = proxy_wrap(Users::from("z")).unwrap();

        assert_eq!(view.names().collect::<Vec<_>>(), vec!["show", "missing"]);
    }

    #[test]
    fn properties_are_readable() {
        let view = proxy_wrap(Users::from("abc")).unwrap();

        assert_eq!(view.prefix, "abc");
    }

    #[test]
    fn unknown_method() {
        let view = proxy_wrap(Users::from("x")).unwrap();

        let error = view.handler("delete").unwrap_err();

        assert_eq!(error.name(), "delete");
        assert_eq!(Error::from(error).status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn duplicate_method_is_rejected() {
        let error = proxy_wrap(Duplicated).unwrap_err();

        assert_eq!(error.name(), "index");
        assert_eq!(error.to_string(), "overriding is not allowed: `index`");
    }

    #[tokio::test]
    async fn override_is_rejected_and_view_unchanged() {
        let view = proxy_wrap(Users::from("x")).unwrap();

        let result = view.override_method(
            "show",
            |_: Arc<Users>, _: Request, _: ResponseWriter, _: Next| "replaced",
        );
        assert!(result.is_err());
        let result = view.override_method(
            "brand_new",
            |_: Arc<Users>, _: Request, _: ResponseWriter, _: Next| "added",
        );
        assert!(result.is_err());

        assert_eq!(view.names().collect::<Vec<_>>(), vec!["show", "missing"]);
        let response = ResponseWriter::new();
        view.call("show", Request::default(), response.clone(), Next::new())
            .await
            .unwrap();
        let response = response.take_response().unwrap();
        assert_eq!(response.body().as_bytes(), br#"{"prefix":"x"}"#);
    }

    #[tokio::test]
    async fn clones_share_instance() {
        let view = proxy_wrap(Users::from("x")).unwrap();
        let clone = view.clone();

        clone
            .call("show", Request::default(), ResponseWriter::new(), Next::new())
            .await
            .unwrap();

        assert!(Arc::ptr_eq(view.instance(), clone.instance()));
        assert_eq!(view.calls.load(Ordering::SeqCst), 1);
    }
}
