//! Dependency resolver used during application assembly.
//!
//! A [`Resolver`] borrows the effective [`Registry`] and the optional
//! attached [`Container`] for the duration of
//! [`App::configure`](crate::app::App::configure). Controllers receive it
//! in their auto-wired constructor and call one `resolve*` method per
//! dependency.
//!
//! The two sources never fall back to each other: a registry lookup fails
//! if the registry has no matching entry even when a container provider
//! could satisfy it, and an explicit provider lookup fails if the provider
//! is missing even when the registry holds a default — explicit wiring is
//! explicit, and always takes precedence for the parameter it is declared
//! on.

use std::sync::Arc;

use crate::container::Container;
use crate::errors::{Error, Result};
use crate::registry::Registry;

/// Borrowing façade over a registry and an optional dependency container.
pub struct Resolver<'a> {
    registry: &'a Registry,
    container: Option<&'a Container>,
}

impl<'a> Resolver<'a> {
    /// Build a resolver over `registry` and an optionally attached
    /// `container`.
    pub fn new(registry: &'a Registry, container: Option<&'a Container>) -> Self {
        Self { registry, container }
    }

    /// Resolve the default registry implementation of capability `C`.
    pub fn resolve<C>(&self) -> Result<Arc<C>>
    where
        C: ?Sized + Send + Sync + 'static,
    {
        self.registry.resolve::<C>()
    }

    /// Resolve the registry implementation of `C` registered under `name`.
    pub fn resolve_named<C>(&self, name: &str) -> Result<Arc<C>>
    where
        C: ?Sized + Send + Sync + 'static,
    {
        self.registry.resolve_named::<C>(name)
    }

    /// Resolve `C` through the attached container's provider `name`.
    ///
    /// Fails with [`Error::UnresolvedCapability`] when no container is
    /// attached or the container defines no such provider.
    pub fn resolve_provider<C>(&self, name: &str) -> Result<Arc<C>>
    where
        C: ?Sized + Send + Sync + 'static,
    {
        let container = self.container.ok_or_else(|| Error::UnresolvedCapability {
            capability: std::any::type_name::<C>(),
            wanted: format!("container provider {name:?} (no dependency container attached)"),
        })?;
        container.provide::<C>(name)
    }
}
