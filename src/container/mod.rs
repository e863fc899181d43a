//! Externally constructed dependency container.
//!
//! A [`Container`] is the declarative counterpart to the global
//! [`Registry`](crate::registry::Registry): the embedding application builds
//! one up-front as a bag of named, typed providers and hands it to the
//! application builder. Controllers wire a constructor parameter to one of
//! its providers explicitly, bypassing the registry for that parameter.
//!
//! Providers are declarative: re-adding the same `(capability, name)` key
//! replaces the previous provider (last wins), and merging two containers
//! overlays the later one's providers onto the earlier.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use crate::errors::{Error, Result};
use crate::registry::Lifetime;

type Component = Arc<dyn Any + Send + Sync>;
type ProviderFactory = Box<dyn Fn() -> Component + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ProviderKey {
    capability: TypeId,
    name: String,
}

struct Provider {
    capability: &'static str,
    lifetime: Lifetime,
    factory: ProviderFactory,
    singleton: OnceLock<Component>,
}

/// Bag of named, typed providers supplied by the embedding application.
#[derive(Default)]
pub struct Container {
    providers: HashMap<ProviderKey, Provider>,
}

impl Container {
    /// Create an empty container.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a per-call provider: `factory` runs on every [`Container::provide`].
    pub fn factory<C, F>(self, name: impl Into<String>, factory: F) -> Self
    where
        C: ?Sized + Send + Sync + 'static,
        F: Fn() -> Arc<C> + Send + Sync + 'static,
    {
        self.add::<C, F>(name.into(), Lifetime::PerCall, factory)
    }

    /// Add a singleton provider: `factory` runs once, on first provide.
    pub fn singleton<C, F>(self, name: impl Into<String>, factory: F) -> Self
    where
        C: ?Sized + Send + Sync + 'static,
        F: Fn() -> Arc<C> + Send + Sync + 'static,
    {
        self.add::<C, F>(name.into(), Lifetime::Singleton, factory)
    }

    fn add<C, F>(mut self, name: String, lifetime: Lifetime, factory: F) -> Self
    where
        C: ?Sized + Send + Sync + 'static,
        F: Fn() -> Arc<C> + Send + Sync + 'static,
    {
        let key = ProviderKey {
            capability: TypeId::of::<C>(),
            name,
        };
        let erased: ProviderFactory = Box::new(move || Arc::new(factory()) as Component);
        self.providers.insert(
            key,
            Provider {
                capability: std::any::type_name::<C>(),
                lifetime,
                factory: erased,
                singleton: OnceLock::new(),
            },
        );
        self
    }

    /// Construct or fetch the instance behind the provider `name` for
    /// capability `C`.
    pub fn provide<C>(&self, name: &str) -> Result<Arc<C>>
    where
        C: ?Sized + Send + Sync + 'static,
    {
        let capability = std::any::type_name::<C>();
        let unresolved = || Error::UnresolvedCapability {
            capability,
            wanted: format!("container provider {name:?}"),
        };

        let key = ProviderKey {
            capability: TypeId::of::<C>(),
            name: name.to_owned(),
        };
        let provider = self.providers.get(&key).ok_or_else(unresolved)?;

        let component = match provider.lifetime {
            Lifetime::PerCall => (provider.factory)(),
            Lifetime::Singleton => provider.singleton.get_or_init(|| (provider.factory)()).clone(),
        };

        tracing::trace!(capability = provider.capability, provider = name, "provider resolved");

        component
            .downcast_ref::<Arc<C>>()
            .cloned()
            .ok_or_else(unresolved)
    }

    /// Overlay `other`'s providers onto this container; keys defined by
    /// `other` replace the ones already present.
    pub(crate) fn merge(&mut self, other: Container) {
        self.providers.extend(other.providers);
    }

    /// Number of providers defined.
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// Whether the container defines no providers.
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}
