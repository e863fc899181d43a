//! Process-wide component registry.
//!
//! Maps a *capability* — any `'static` type, usually a trait object such as
//! `dyn Mailer` — plus an optional registration name to a concrete factory
//! and a creation strategy. Registration happens once, at startup, strictly
//! before any resolution; the registry is never mutated while requests are
//! being served.
//!
//! Binaries normally use the [`Registry::global`] singleton. Tests build a
//! scoped [`Registry::new`] per test and hand it to the application builder
//! so no state leaks between test runs.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use crate::errors::{Error, Result};

// ---------------------------------------------------------------------------
// Creation strategy
// ---------------------------------------------------------------------------

/// How instances of a registered component are produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifetime {
    /// The factory runs on every resolution; consecutive resolutions yield
    /// instances with distinct identity.
    PerCall,
    /// The factory runs once, on first resolution; every resolution hands
    /// out the same shared instance.
    Singleton,
}

// ---------------------------------------------------------------------------
// Type-erased storage
// ---------------------------------------------------------------------------

/// A resolved component, erased to `Any`. The concrete type inside is
/// always `Arc<C>` for the capability `C` the entry was registered under.
type Component = Arc<dyn Any + Send + Sync>;

type ComponentFactory = Box<dyn Fn() -> Component + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct RegistryKey {
    capability: TypeId,
    name: Option<String>,
}

struct Registration {
    capability: &'static str,
    lifetime: Lifetime,
    factory: ComponentFactory,
    singleton: OnceLock<Component>,
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Registry of capability → implementation bindings.
pub struct Registry {
    entries: RwLock<HashMap<RegistryKey, Registration>>,
}

impl Registry {
    /// Create an empty, scoped registry.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// The process-wide registry instance, created on first access.
    pub fn global() -> &'static Registry {
        static GLOBAL: OnceLock<Registry> = OnceLock::new();
        GLOBAL.get_or_init(Registry::new)
    }

    /// Register the default implementation for capability `C`.
    ///
    /// The factory is invoked per the given [`Lifetime`]. Fails with
    /// [`Error::DuplicateRegistration`] if `C` already has a default
    /// registration; re-registration never silently overwrites.
    pub fn register<C, F>(&self, lifetime: Lifetime, factory: F) -> Result<()>
    where
        C: ?Sized + Send + Sync + 'static,
        F: Fn() -> Arc<C> + Send + Sync + 'static,
    {
        self.insert::<C, F>(None, lifetime, factory)
    }

    /// Register an implementation for capability `C` under `name`.
    ///
    /// Named registrations are independent of the default one and of each
    /// other; only the exact `(capability, name)` pair collides.
    pub fn register_named<C, F>(
        &self,
        name: impl Into<String>,
        lifetime: Lifetime,
        factory: F,
    ) -> Result<()>
    where
        C: ?Sized + Send + Sync + 'static,
        F: Fn() -> Arc<C> + Send + Sync + 'static,
    {
        self.insert::<C, F>(Some(name.into()), lifetime, factory)
    }

    fn insert<C, F>(&self, name: Option<String>, lifetime: Lifetime, factory: F) -> Result<()>
    where
        C: ?Sized + Send + Sync + 'static,
        F: Fn() -> Arc<C> + Send + Sync + 'static,
    {
        let capability = std::any::type_name::<C>();
        let key = RegistryKey {
            capability: TypeId::of::<C>(),
            name,
        };

        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if entries.contains_key(&key) {
            return Err(Error::DuplicateRegistration {
                capability,
                name: key.name,
            });
        }

        tracing::debug!(capability, name = ?key.name, lifetime = ?lifetime, "component registered");

        let erased: ComponentFactory = Box::new(move || Arc::new(factory()) as Component);
        entries.insert(
            key,
            Registration {
                capability,
                lifetime,
                factory: erased,
                singleton: OnceLock::new(),
            },
        );
        Ok(())
    }

    /// Resolve the default implementation of capability `C`.
    pub fn resolve<C>(&self) -> Result<Arc<C>>
    where
        C: ?Sized + Send + Sync + 'static,
    {
        self.resolve_entry::<C>(None)
    }

    /// Resolve the implementation of capability `C` registered under `name`.
    pub fn resolve_named<C>(&self, name: &str) -> Result<Arc<C>>
    where
        C: ?Sized + Send + Sync + 'static,
    {
        self.resolve_entry::<C>(Some(name))
    }

    fn resolve_entry<C>(&self, name: Option<&str>) -> Result<Arc<C>>
    where
        C: ?Sized + Send + Sync + 'static,
    {
        let capability = std::any::type_name::<C>();
        let unresolved = || Error::UnresolvedCapability {
            capability,
            wanted: match name {
                Some(n) => format!("registration named {n:?}"),
                None => "default registration".to_string(),
            },
        };

        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        let key = RegistryKey {
            capability: TypeId::of::<C>(),
            name: name.map(str::to_owned),
        };
        let entry = entries.get(&key).ok_or_else(unresolved)?;

        let component = match entry.lifetime {
            Lifetime::PerCall => (entry.factory)(),
            Lifetime::Singleton => entry.singleton.get_or_init(|| (entry.factory)()).clone(),
        };

        tracing::trace!(capability = entry.capability, lifetime = ?entry.lifetime, "component resolved");

        // The entry is keyed by `TypeId::of::<C>()` and its factory was
        // erased from `Fn() -> Arc<C>`, so the downcast cannot fail.
        component
            .downcast_ref::<Arc<C>>()
            .cloned()
            .ok_or_else(unresolved)
    }

    /// Whether a registration exists for `C` under `name` (`None` = the
    /// default registration).
    pub fn contains<C>(&self, name: Option<&str>) -> bool
    where
        C: ?Sized + 'static,
    {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.contains_key(&RegistryKey {
            capability: TypeId::of::<C>(),
            name: name.map(str::to_owned),
        })
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
