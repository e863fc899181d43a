//! Error taxonomy for component registration and application assembly.
//!
//! Every variant here is raised synchronously while an application is being
//! wired together — during component registration or inside
//! [`App::configure`](crate::app::App::configure) — never while a request is
//! in flight. All are fatal to application construction and propagate to the
//! `configure` caller unmodified; none are retried. Errors raised inside a
//! handler body are not represented here: they pass through to axum's own
//! error path.

use axum::http::Method;
use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Fatal configuration errors.
#[derive(Debug, Error)]
pub enum Error {
    /// The same `(capability, name)` pair was registered twice.
    #[error("capability `{capability}` already registered (name: {name:?})")]
    DuplicateRegistration {
        /// Type name of the capability being registered.
        capability: &'static str,
        /// Registration name, if the registration was named.
        name: Option<String>,
    },

    /// No implementation exists for a required dependency.
    #[error("no implementation for capability `{capability}` ({wanted})")]
    UnresolvedCapability {
        /// Type name of the capability that was requested.
        capability: &'static str,
        /// What was looked up: the default registration, a named
        /// registration, or a container provider.
        wanted: String,
    },

    /// The same verb + path pair was registered twice on one application.
    #[error("route {verb} {path} registered twice")]
    DuplicateRoute {
        /// HTTP verb of the colliding route.
        verb: Method,
        /// Absolute path (prefix + sub-path) of the colliding route.
        path: String,
    },

    /// The HTTP verb has no corresponding route filter in axum.
    #[error("unsupported HTTP verb {verb} for route {path}")]
    UnsupportedVerb {
        /// The rejected verb.
        verb: Method,
        /// Absolute path of the route that used it.
        path: String,
    },

    /// The application builder was configured a second time.
    #[error("application already configured: {0}")]
    AlreadyConfigured(String),
}
