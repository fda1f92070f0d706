//! Service resolution.
//!
//! The [`Container`] is the minimal resolution contract route bindings and
//! handlers rely on: services are registered at assembly time and resolved
//! by type or by name while dispatching.
//!
//! # Example
//!
//! ```rust
//! use switchyard_core::di::Container;
//! use std::sync::Arc;
//!
//! struct Catalog {
//!     titles: Vec<&'static str>,
//! }
//!
//! let mut container = Container::new();
//! container.register_named("catalog", Arc::new(Catalog { titles: vec!["Dune"] }));
//! container.alias("books", "catalog");
//!
//! let catalog: Arc<Catalog> = container.resolve_named("books").unwrap();
//! assert_eq!(catalog.titles, ["Dune"]);
//! ```

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Maximum alias hops before resolution gives up.
const MAX_ALIAS_DEPTH: usize = 16;

type AnyService = Arc<dyn Any + Send + Sync>;
type Factory = Arc<dyn Fn(&Container) -> AnyService + Send + Sync>;

/// Error when a dependency cannot be resolved.
#[derive(Debug, Clone, Error)]
#[error("failed to inject {type_name}{}: {reason}", key_suffix(.key))]
pub struct InjectionError {
    /// The type name that could not be resolved.
    pub type_name: &'static str,
    /// The registration name, for named lookups.
    pub key: Option<String>,
    /// The reason for the failure.
    pub reason: String,
}

impl InjectionError {
    /// A service that was never registered.
    #[must_use]
    pub fn not_registered<T>(key: Option<&str>) -> Self {
        Self {
            type_name: std::any::type_name::<T>(),
            key: key.map(ToString::to_string),
            reason: "service not registered".to_string(),
        }
    }

    /// A service registered under the name with a different type.
    #[must_use]
    pub fn type_mismatch<T>(key: &str) -> Self {
        Self {
            type_name: std::any::type_name::<T>(),
            key: Some(key.to_string()),
            reason: "registered with a different type".to_string(),
        }
    }
}

fn key_suffix(key: &Option<String>) -> String {
    key.as_deref()
        .map(|k| format!(" as `{k}`"))
        .unwrap_or_default()
}

#[derive(Clone)]
enum Provider {
    Instance(AnyService),
    Factory(Factory),
}

impl Provider {
    fn provide(&self, container: &Container) -> AnyService {
        match self {
            Self::Instance(service) => Arc::clone(service),
            Self::Factory(factory) => factory(container),
        }
    }
}

/// A dependency injection container.
///
/// Registrations are keyed either by type or by name. Names may be aliased
/// to other names. Factories build a fresh instance on every resolution and
/// may resolve their own dependencies from the container.
///
/// The container is `Send + Sync`; once assembled it is shared read-only.
#[derive(Default, Clone)]
pub struct Container {
    by_type: HashMap<TypeId, Provider>,
    by_name: HashMap<String, Provider>,
    aliases: HashMap<String, String>,
}

impl Container {
    /// Creates a new empty container.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a shared instance keyed by its type.
    pub fn register<T: Send + Sync + 'static>(&mut self, service: Arc<T>) {
        self.by_type
            .insert(TypeId::of::<T>(), Provider::Instance(service));
    }

    /// Registers a shared instance under `name`.
    pub fn register_named<T: Send + Sync + 'static>(
        &mut self,
        name: impl Into<String>,
        service: Arc<T>,
    ) {
        self.by_name
            .insert(name.into(), Provider::Instance(service));
    }

    /// Registers a factory keyed by the type it builds.
    pub fn factory<T, F>(&mut self, build: F)
    where
        T: Send + Sync + 'static,
        F: Fn(&Container) -> T + Send + Sync + 'static,
    {
        self.by_type
            .insert(TypeId::of::<T>(), Provider::Factory(erase(build)));
    }

    /// Registers a factory under `name`.
    pub fn factory_named<T, F>(&mut self, name: impl Into<String>, build: F)
    where
        T: Send + Sync + 'static,
        F: Fn(&Container) -> T + Send + Sync + 'static,
    {
        self.by_name
            .insert(name.into(), Provider::Factory(erase(build)));
    }

    /// Makes `alias` resolve to whatever `target` resolves to.
    pub fn alias(&mut self, alias: impl Into<String>, target: impl Into<String>) {
        self.aliases.insert(alias.into(), target.into());
    }

    /// Resolves a service by type.
    #[must_use]
    pub fn resolve<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.by_type
            .get(&TypeId::of::<T>())
            .and_then(|p| p.provide(self).downcast::<T>().ok())
    }

    /// Resolves a service by type or returns an error.
    ///
    /// # Errors
    ///
    /// Returns [`InjectionError`] if the service is not registered.
    pub fn resolve_required<T: Send + Sync + 'static>(&self) -> Result<Arc<T>, InjectionError> {
        self.resolve()
            .ok_or_else(|| InjectionError::not_registered::<T>(None))
    }

    /// Resolves a service by name, following aliases.
    #[must_use]
    pub fn resolve_named<T: Send + Sync + 'static>(&self, name: &str) -> Option<Arc<T>> {
        self.resolve_named_required(name).ok()
    }

    /// Resolves a service by name or returns an error.
    ///
    /// # Errors
    ///
    /// Returns [`InjectionError`] if nothing is registered under the name
    /// (after following aliases) or it holds another type.
    pub fn resolve_named_required<T: Send + Sync + 'static>(
        &self,
        name: &str,
    ) -> Result<Arc<T>, InjectionError> {
        let key = self.canonical_name(name);
        let provider = self
            .by_name
            .get(key)
            .ok_or_else(|| InjectionError::not_registered::<T>(Some(name)))?;
        provider
            .provide(self)
            .downcast::<T>()
            .map_err(|_| InjectionError::type_mismatch::<T>(name))
    }

    /// Follows aliases to the registration name.
    fn canonical_name<'a>(&'a self, name: &'a str) -> &'a str {
        let mut current = name;
        for _ in 0..MAX_ALIAS_DEPTH {
            match self.aliases.get(current) {
                Some(next) => current = next.as_str(),
                None => return current,
            }
        }
        current
    }

    /// Checks if a service is registered by type.
    #[must_use]
    pub fn contains<T: Send + Sync + 'static>(&self) -> bool {
        self.by_type.contains_key(&TypeId::of::<T>())
    }

    /// Checks if a name (or alias) is registered.
    #[must_use]
    pub fn contains_named(&self, name: &str) -> bool {
        self.by_name.contains_key(self.canonical_name(name))
    }

    /// Number of registrations, not counting aliases.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_type.len() + self.by_name.len()
    }

    /// Returns `true` if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn erase<T, F>(build: F) -> Factory
where
    T: Send + Sync + 'static,
    F: Fn(&Container) -> T + Send + Sync + 'static,
{
    Arc::new(move |container: &Container| -> AnyService { Arc::new(build(container)) })
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.by_name.keys().collect();
        names.sort();
        f.debug_struct("Container")
            .field("typed", &self.by_type.len())
            .field("named", &names)
            .field("aliases", &self.aliases.len())
            .finish()
    }
}
