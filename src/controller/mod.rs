//! Controllers and their route tables.
//!
//! A controller is a plain struct whose dependencies are resolved once,
//! during application assembly, and whose methods back HTTP routes. Instead
//! of ambient registration, controllers describe themselves explicitly:
//! [`Controller::assemble`] is the auto-wired constructor and
//! [`Controller::describe`] returns a [`ControllerDescriptor`] — a URL
//! prefix plus an ordered route table whose handlers capture the
//! constructed instance.
//!
//! ```no_run
//! use std::sync::Arc;
//! use axum::Json;
//! use gantry::{Controller, ControllerDescriptor, Resolver, Result};
//!
//! trait Greeter: Send + Sync {
//!     fn hello(&self) -> String;
//! }
//!
//! struct GreetingController {
//!     greeter: Arc<dyn Greeter>,
//! }
//!
//! impl Controller for GreetingController {
//!     fn assemble(resolver: &Resolver<'_>) -> Result<Self> {
//!         Ok(Self { greeter: resolver.resolve::<dyn Greeter>()? })
//!     }
//!
//!     fn describe(self: Arc<Self>) -> ControllerDescriptor {
//!         let hello = self.clone();
//!         ControllerDescriptor::new("/greetings")
//!             .get("", move |_req| {
//!                 let c = hello.clone();
//!                 async move { Json(c.greeter.hello()) }
//!             })
//!     }
//! }
//! ```

use std::future::Future;
use std::sync::Arc;

use axum::extract::Request;
use axum::response::{IntoResponse, Response};
use futures::future::BoxFuture;

use crate::errors::Result;
use crate::resolver::Resolver;

pub use axum::http::Method;

/// Type-erased route handler, bound to a constructed controller instance.
pub type RouteHandler = Arc<dyn Fn(Request) -> BoxFuture<'static, Response> + Send + Sync>;

/// One HTTP verb + sub-path + handler binding.
pub struct RouteDescriptor {
    /// HTTP verb the route answers to.
    pub verb: Method,
    /// Sub-path below the controller prefix; `""` denotes the prefix root.
    pub path: String,
    pub(crate) handler: RouteHandler,
}

/// A controller's URL prefix and ordered route table.
pub struct ControllerDescriptor {
    prefix: String,
    routes: Vec<RouteDescriptor>,
}

impl ControllerDescriptor {
    /// Start a descriptor rooted at `prefix` (e.g. `"/test"`).
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            routes: Vec::new(),
        }
    }

    /// Append a route. Declaration order is preserved; duplicate
    /// `(verb, path)` pairs are rejected later, at application assembly.
    pub fn route<F, Fut, R>(mut self, verb: Method, path: impl Into<String>, handler: F) -> Self
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: IntoResponse,
    {
        let handler: RouteHandler = Arc::new(move |req| {
            let fut = handler(req);
            Box::pin(async move { fut.await.into_response() })
        });
        self.routes.push(RouteDescriptor {
            verb,
            path: path.into(),
            handler,
        });
        self
    }

    /// Append a `GET` route.
    pub fn get<F, Fut, R>(self, path: impl Into<String>, handler: F) -> Self
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: IntoResponse,
    {
        self.route(Method::GET, path, handler)
    }

    /// Append a `POST` route.
    pub fn post<F, Fut, R>(self, path: impl Into<String>, handler: F) -> Self
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: IntoResponse,
    {
        self.route(Method::POST, path, handler)
    }

    /// Append a `PUT` route.
    pub fn put<F, Fut, R>(self, path: impl Into<String>, handler: F) -> Self
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: IntoResponse,
    {
        self.route(Method::PUT, path, handler)
    }

    /// Append a `DELETE` route.
    pub fn delete<F, Fut, R>(self, path: impl Into<String>, handler: F) -> Self
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: IntoResponse,
    {
        self.route(Method::DELETE, path, handler)
    }

    /// The controller's URL prefix.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// The route table, in declaration order.
    pub fn routes(&self) -> &[RouteDescriptor] {
        &self.routes
    }

    pub(crate) fn into_parts(self) -> (String, Vec<RouteDescriptor>) {
        (self.prefix, self.routes)
    }
}

/// A dependency-injected HTTP controller.
pub trait Controller: Send + Sync + 'static {
    /// Auto-wired constructor: resolve each dependency through `resolver`,
    /// in declared field order, and only then construct. A resolution
    /// failure aborts application assembly — no partially constructed
    /// controller is ever exposed.
    fn assemble(resolver: &Resolver<'_>) -> Result<Self>
    where
        Self: Sized;

    /// The route table; handlers capture clones of `self`.
    fn describe(self: Arc<Self>) -> ControllerDescriptor;
}

/// Join a controller prefix and a route sub-path into an absolute path.
///
/// `""` as the sub-path denotes the prefix root; a missing leading slash is
/// inserted; the empty result normalizes to `/`.
pub(crate) fn join_path(prefix: &str, sub: &str) -> String {
    let prefix = prefix.trim_end_matches('/');
    let mut full = String::new();
    if !prefix.is_empty() {
        if !prefix.starts_with('/') {
            full.push('/');
        }
        full.push_str(prefix);
    }
    if !sub.is_empty() {
        if !sub.starts_with('/') {
            full.push('/');
        }
        full.push_str(sub);
    }
    if full.is_empty() {
        full.push('/');
    }
    full
}
