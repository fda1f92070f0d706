//! Route parameter bindings.
//!
//! A binding turns the raw string captured for a parameter into a domain
//! value before the handler runs. Parameters without a binding reach the
//! handler as [`BoundValue::Raw`].
//!
//! A binding that finds nothing, or fails, stops the dispatch with
//! [`DispatchError::Binding`], which the error dispatcher sees as
//! `BindingError` (an `is-a NotFoundError`).

use indexmap::IndexMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use switchyard_core::di::Container;
use switchyard_core::{BoundParams, BoundValue, BoxFuture, DispatchError, DispatchResult, Params};

/// Outcome of a custom binding: `Ok(None)` means "no such entity".
pub type BindResult<T> = anyhow::Result<Option<T>>;

/// A type-erased custom binding.
pub trait Binder: Send + Sync + 'static {
    /// Resolves `raw` into a model, possibly using registered services.
    fn bind<'a>(
        &'a self,
        raw: &'a str,
        services: &'a Container,
    ) -> BoxFuture<'a, BindResult<BoundValue>>;
}

struct AsyncBinder<T, F> {
    func: F,
    _model: PhantomData<fn() -> T>,
}

impl<T, F> Binder for AsyncBinder<T, F>
where
    T: Send + Sync + 'static,
    F: for<'a> Fn(&'a str, &'a Container) -> BoxFuture<'a, BindResult<T>> + Send + Sync + 'static,
{
    fn bind<'a>(
        &'a self,
        raw: &'a str,
        services: &'a Container,
    ) -> BoxFuture<'a, BindResult<BoundValue>> {
        let fut = (self.func)(raw, services);
        Box::pin(async move {
            let model = fut.await?;
            Ok(model.map(|m| BoundValue::Model(Arc::new(m))))
        })
    }
}

struct LookupBinder<T, F> {
    func: F,
    _model: PhantomData<fn() -> T>,
}

impl<T, F> Binder for LookupBinder<T, F>
where
    T: Send + Sync + 'static,
    F: Fn(&str, &Container) -> Option<T> + Send + Sync + 'static,
{
    fn bind<'a>(
        &'a self,
        raw: &'a str,
        services: &'a Container,
    ) -> BoxFuture<'a, BindResult<BoundValue>> {
        let model = (self.func)(raw, services).map(|m| BoundValue::Model(Arc::new(m)));
        Box::pin(std::future::ready(Ok(model)))
    }
}

/// How one parameter is bound.
#[derive(Clone)]
pub enum ParamBinding {
    /// Parse as a signed 64-bit integer.
    Integer,
    /// Run a custom binder.
    Custom(Arc<dyn Binder>),
}

impl fmt::Debug for ParamBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer => f.write_str("Integer"),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

impl ParamBinding {
    /// An async binding.
    ///
    /// ```
    /// use switchyard::binding::ParamBinding;
    ///
    /// struct Book { id: u64 }
    ///
    /// let binding = ParamBinding::with(|raw, _services| {
    ///     Box::pin(async move {
    ///         let id: u64 = raw.parse()?;
    ///         Ok((id < 100).then_some(Book { id }))
    ///     })
    /// });
    /// # let _ = binding;
    /// ```
    pub fn with<T, F>(func: F) -> Self
    where
        T: Send + Sync + 'static,
        F: for<'a> Fn(&'a str, &'a Container) -> BoxFuture<'a, BindResult<T>>
            + Send
            + Sync
            + 'static,
    {
        Self::Custom(Arc::new(AsyncBinder {
            func,
            _model: PhantomData,
        }))
    }

    /// A synchronous lookup; `None` means "no such entity".
    pub fn lookup<T, F>(func: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(&str, &Container) -> Option<T> + Send + Sync + 'static,
    {
        Self::Custom(Arc::new(LookupBinder {
            func,
            _model: PhantomData,
        }))
    }

    async fn apply(&self, name: &str, raw: &str, services: &Container) -> DispatchResult<BoundValue> {
        match self {
            Self::Integer => raw
                .parse::<i64>()
                .map(BoundValue::Int)
                .map_err(|_| DispatchError::binding(name, raw, "expected an integer")),
            Self::Custom(binder) => match binder.bind(raw, services).await {
                Ok(Some(value)) => Ok(value),
                Ok(None) => Err(DispatchError::binding(name, raw, "no matching entity")),
                Err(err) => Err(DispatchError::binding(name, raw, format!("{err:#}"))),
            },
        }
    }
}

/// The bindings declared on one route.
#[derive(Debug, Clone, Default)]
pub struct BindingResolver {
    bindings: IndexMap<String, ParamBinding>,
}

impl BindingResolver {
    /// Creates a resolver from `(parameter, binding)` pairs.
    #[must_use]
    pub fn new(bindings: IndexMap<String, ParamBinding>) -> Self {
        Self { bindings }
    }

    /// Parameter names with a binding.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.bindings.keys().map(String::as_str)
    }

    /// Returns true if no parameter has a binding.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Binds every captured parameter.
    ///
    /// Bindings run in declaration order; the first failure stops the rest.
    /// A bound parameter that was not captured (an absent optional
    /// parameter) is skipped.
    pub async fn resolve(&self, raw: &Params, services: &Container) -> DispatchResult<BoundParams> {
        let mut bound = BoundParams::new();

        for (name, value) in raw {
            if !self.bindings.contains_key(name) {
                bound.insert(name, BoundValue::Raw(value.to_string()));
            }
        }

        for (name, binding) in &self.bindings {
            let Some(value) = raw.get(name) else {
                continue;
            };
            let resolved = binding.apply(name, value, services).await?;
            tracing::trace!(param = %name, "parameter bound");
            bound.insert(name.clone(), resolved);
        }

        Ok(bound)
    }
}
