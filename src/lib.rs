//! # Gantry
//!
//! Controller routing and dependency-injection layer for axum services.
//!
//! Gantry turns plain structs into HTTP controllers. A [`Registry`] maps
//! capabilities — usually trait objects — to implementations with per-call
//! or singleton creation strategies; a [`Container`] carries named providers
//! constructed by the embedding application; and [`App::configure`]
//! assembles controllers against both, mounting their routes on an axum
//! router and spawning any background tasks alongside the server's
//! lifecycle.
//!
//! Wiring mistakes — a missing implementation, a duplicate registration or
//! route, a reconfigured builder — surface synchronously from registration
//! or [`App::configure`], never during request handling, so a misconfigured
//! application can never serve traffic.

pub mod app;
pub mod container;
pub mod controller;
pub mod errors;
pub mod registry;
pub mod resolver;

pub use app::{App, AppBuilder};
pub use container::Container;
pub use controller::{Controller, ControllerDescriptor, Method, RouteDescriptor, RouteHandler};
pub use errors::{Error, Result};
pub use registry::{Lifetime, Registry};
pub use resolver::Resolver;

/// Library version.
pub const VERSION: &str = "0.2.1";
