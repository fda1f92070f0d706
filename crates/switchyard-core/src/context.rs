//! Per-event dispatch state.
//!
//! A [`DispatchContext`] is created for every inbound event and threaded
//! through matching, binding, the middleware pipeline, error handling and
//! rendering. It is owned by a single in-flight dispatch and never shared.

use crate::di::Container;
use crate::error::DispatchError;
use crate::event::{Event, EventId};
use http::StatusCode;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use switchyard_router::Params;
use tokio_util::sync::CancellationToken;

/// Where a dispatch currently is.
///
/// ```text
/// Idle -> Matching -> Binding -> Piping -> Rendering -> Done
///            \          |          /          ^
///             +---> ErrorHandling -----------+
/// ```
///
/// Any phase may jump to `Done` when the event is cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DispatchPhase {
    /// Not started.
    Idle,
    /// Resolving the route.
    Matching,
    /// Running parameter bindings.
    Binding,
    /// Running middleware and the handler.
    Piping,
    /// Running the selected error handler.
    ErrorHandling,
    /// Composing layouts around content.
    Rendering,
    /// Finished.
    Done,
}

impl DispatchPhase {
    /// Returns true if moving from `self` to `next` is a legal transition.
    #[must_use]
    pub const fn can_advance_to(self, next: Self) -> bool {
        use DispatchPhase::{Binding, Done, ErrorHandling, Idle, Matching, Piping, Rendering};

        matches!(
            (self, next),
            (Idle, Matching)
                | (Matching, Binding)
                | (Binding, Piping)
                | (Piping, Rendering)
                | (Matching | Binding | Piping, ErrorHandling)
                | (ErrorHandling, Rendering)
                | (_, Done)
        )
    }

    /// Lowercase label for logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Matching => "matching",
            Self::Binding => "binding",
            Self::Piping => "piping",
            Self::ErrorHandling => "error_handling",
            Self::Rendering => "rendering",
            Self::Done => "done",
        }
    }
}

/// The route an event matched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchedRoute {
    /// Route name, if it has one.
    pub name: Option<String>,
    /// Pattern source as declared.
    pub pattern: String,
}

impl MatchedRoute {
    /// Name if set, otherwise the pattern. Used as a metrics label.
    #[must_use]
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.pattern)
    }
}

/// A parameter value after bindings ran.
#[derive(Clone)]
pub enum BoundValue {
    /// No binding declared; the raw path segment.
    Raw(String),
    /// Coerced integer.
    Int(i64),
    /// An entity loaded by a custom binding.
    Model(Arc<dyn Any + Send + Sync>),
}

impl fmt::Debug for BoundValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Raw(value) => f.debug_tuple("Raw").field(value).finish(),
            Self::Int(value) => f.debug_tuple("Int").field(value).finish(),
            Self::Model(_) => f.write_str("Model(..)"),
        }
    }
}

/// Parameters after bindings ran, keyed by name.
///
/// ```
/// use switchyard_core::{BoundParams, BoundValue};
/// use std::sync::Arc;
///
/// struct Book { title: &'static str }
///
/// let mut params = BoundParams::new();
/// params.insert("slug", BoundValue::Raw("dune".into()));
/// params.insert("page", BoundValue::Int(3));
/// params.insert("book", BoundValue::Model(Arc::new(Book { title: "Dune" })));
///
/// assert_eq!(params.raw("slug"), Some("dune"));
/// assert_eq!(params.int("page"), Some(3));
/// assert_eq!(params.model::<Book>("book").unwrap().title, "Dune");
/// ```
#[derive(Debug, Clone, Default)]
pub struct BoundParams {
    values: HashMap<String, BoundValue>,
}

impl BoundParams {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a value.
    pub fn insert(&mut self, name: impl Into<String>, value: BoundValue) {
        self.values.insert(name.into(), value);
    }

    /// Returns the value bound under `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&BoundValue> {
        self.values.get(name)
    }

    /// Returns a raw value.
    #[must_use]
    pub fn raw(&self, name: &str) -> Option<&str> {
        match self.values.get(name)? {
            BoundValue::Raw(value) => Some(value.as_str()),
            _ => None,
        }
    }

    /// Returns an integer value.
    #[must_use]
    pub fn int(&self, name: &str) -> Option<i64> {
        match self.values.get(name)? {
            BoundValue::Int(value) => Some(*value),
            _ => None,
        }
    }

    /// Returns a bound model of type `T`.
    #[must_use]
    pub fn model<T: Send + Sync + 'static>(&self, name: &str) -> Option<Arc<T>> {
        match self.values.get(name)? {
            BoundValue::Model(model) => Arc::clone(model).downcast::<T>().ok(),
            _ => None,
        }
    }

    /// Number of bound parameters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if nothing is bound.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Per-event context that flows through the dispatch.
///
/// # Example
///
/// ```
/// use switchyard_core::{DispatchContext, DispatchPhase, Event};
/// use http::Method;
///
/// let mut ctx = DispatchContext::new(Event::http(Method::GET, "/books"));
/// assert_eq!(ctx.phase(), DispatchPhase::Idle);
///
/// ctx.enter(DispatchPhase::Matching);
/// assert_eq!(ctx.phase(), DispatchPhase::Matching);
/// ```
pub struct DispatchContext {
    event: Event,
    phase: DispatchPhase,
    route: Option<MatchedRoute>,
    raw_params: Params,
    bound: BoundParams,
    status: Option<StatusCode>,
    error: Option<Arc<DispatchError>>,
    layouts: Vec<String>,
    services: Arc<Container>,
    cancel: CancellationToken,
    started_at: Instant,
    extensions: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl DispatchContext {
    /// Creates a context with an empty service container.
    #[must_use]
    pub fn new(event: Event) -> Self {
        Self::with_services(event, Arc::new(Container::new()))
    }

    /// Creates a context sharing the application's services.
    #[must_use]
    pub fn with_services(event: Event, services: Arc<Container>) -> Self {
        Self {
            event,
            phase: DispatchPhase::Idle,
            route: None,
            raw_params: Params::new(),
            bound: BoundParams::new(),
            status: None,
            error: None,
            layouts: Vec::new(),
            services,
            cancel: CancellationToken::new(),
            started_at: Instant::now(),
            extensions: HashMap::new(),
        }
    }

    /// Uses `token` to observe cancellation.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// The event being dispatched.
    #[must_use]
    pub const fn event(&self) -> &Event {
        &self.event
    }

    /// Mutable access to the event, e.g. to normalize headers.
    pub fn event_mut(&mut self) -> &mut Event {
        &mut self.event
    }

    /// Shortcut for the event id.
    #[must_use]
    pub const fn event_id(&self) -> EventId {
        self.event.id()
    }

    /// Current phase.
    #[must_use]
    pub const fn phase(&self) -> DispatchPhase {
        self.phase
    }

    /// Moves to `next`.
    ///
    /// Illegal transitions are logged and still applied, so a misbehaving
    /// coordinator cannot wedge an event.
    pub fn enter(&mut self, next: DispatchPhase) {
        if !self.phase.can_advance_to(next) {
            tracing::warn!(
                event_id = %self.event.id(),
                from = self.phase.as_str(),
                to = next.as_str(),
                "unexpected dispatch phase transition"
            );
        }
        tracing::trace!(
            event_id = %self.event.id(),
            phase = next.as_str(),
            "dispatch phase"
        );
        self.phase = next;
    }

    /// The matched route, once matching succeeded.
    #[must_use]
    pub const fn route(&self) -> Option<&MatchedRoute> {
        self.route.as_ref()
    }

    /// Records the matched route and its raw parameters.
    pub fn set_route(&mut self, route: MatchedRoute, params: Params) {
        self.route = Some(route);
        self.raw_params = params;
    }

    /// Raw parameters captured by the path matcher.
    #[must_use]
    pub const fn raw_params(&self) -> &Params {
        &self.raw_params
    }

    /// Parameters after bindings ran.
    #[must_use]
    pub const fn params(&self) -> &BoundParams {
        &self.bound
    }

    /// Replaces the bound parameters.
    pub fn set_params(&mut self, bound: BoundParams) {
        self.bound = bound;
    }

    /// Shortcut for a raw parameter.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.raw_params.get(name)
    }

    /// Status chosen so far, if any.
    #[must_use]
    pub const fn status(&self) -> Option<StatusCode> {
        self.status
    }

    /// Overrides the status of the final response.
    pub fn set_status(&mut self, status: StatusCode) {
        self.status = Some(status);
    }

    /// The error being handled, during error handling.
    #[must_use]
    pub fn error(&self) -> Option<&DispatchError> {
        self.error.as_deref()
    }

    /// Records the error being handled.
    pub fn set_error(&mut self, error: Arc<DispatchError>) {
        self.error = Some(error);
    }

    /// Selected layout chain, innermost first.
    #[must_use]
    pub fn layouts(&self) -> &[String] {
        &self.layouts
    }

    /// Replaces the selected layout chain.
    pub fn set_layouts(&mut self, layouts: Vec<String>) {
        self.layouts = layouts;
    }

    /// Application services.
    #[must_use]
    pub fn services(&self) -> &Container {
        &self.services
    }

    /// Shared handle to application services.
    #[must_use]
    pub fn services_arc(&self) -> Arc<Container> {
        Arc::clone(&self.services)
    }

    /// Cancellation token for this event.
    #[must_use]
    pub const fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Returns true once the event has been cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Time since the context was created.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Stores a typed extension, replacing any previous value of that type.
    pub fn insert_extension<T: Send + Sync + 'static>(&mut self, value: T) {
        self.extensions.insert(TypeId::of::<T>(), Box::new(value));
    }

    /// Returns a typed extension.
    #[must_use]
    pub fn extension<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.extensions
            .get(&TypeId::of::<T>())
            .and_then(|v| v.downcast_ref::<T>())
    }

    /// Removes and returns a typed extension.
    pub fn remove_extension<T: Send + Sync + 'static>(&mut self) -> Option<T> {
        self.extensions
            .remove(&TypeId::of::<T>())
            .and_then(|v| v.downcast::<T>().ok())
            .map(|v| *v)
    }
}

impl fmt::Debug for DispatchContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchContext")
            .field("event_id", &self.event.id())
            .field("path", &self.event.path())
            .field("phase", &self.phase)
            .field("route", &self.route)
            .field("status", &self.status)
            .field("layouts", &self.layouts)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Method;

    fn ctx() -> DispatchContext {
        DispatchContext::new(Event::http(Method::GET, "/books/7"))
    }

    #[test]
    fn test_happy_path_transitions_are_legal() {
        let path = [
            DispatchPhase::Idle,
            DispatchPhase::Matching,
            DispatchPhase::Binding,
            DispatchPhase::Piping,
            DispatchPhase::Rendering,
            DispatchPhase::Done,
        ];
        for pair in path.windows(2) {
            assert!(pair[0].can_advance_to(pair[1]), "{:?} -> {:?}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_error_handling_reachable_from_failing_phases_only() {
        for phase in [
            DispatchPhase::Matching,
            DispatchPhase::Binding,
            DispatchPhase::Piping,
        ] {
            assert!(phase.can_advance_to(DispatchPhase::ErrorHandling));
        }
        assert!(!DispatchPhase::Idle.can_advance_to(DispatchPhase::ErrorHandling));
        assert!(!DispatchPhase::Rendering.can_advance_to(DispatchPhase::ErrorHandling));
        assert!(DispatchPhase::ErrorHandling.can_advance_to(DispatchPhase::Rendering));
    }

    #[test]
    fn test_cancellation_jumps_to_done_from_anywhere() {
        for phase in [
            DispatchPhase::Idle,
            DispatchPhase::Matching,
            DispatchPhase::Piping,
            DispatchPhase::ErrorHandling,
        ] {
            assert!(phase.can_advance_to(DispatchPhase::Done));
        }
    }

    #[test]
    fn test_no_skipping_forward() {
        assert!(!DispatchPhase::Idle.can_advance_to(DispatchPhase::Piping));
        assert!(!DispatchPhase::Matching.can_advance_to(DispatchPhase::Rendering));
    }

    #[test]
    fn test_route_and_params() {
        let mut ctx = ctx();
        let params: Params = [("id", "7")].into_iter().collect();
        ctx.set_route(
            MatchedRoute {
                name: Some("books.show".into()),
                pattern: "/books/:id".into(),
            },
            params,
        );
        assert_eq!(ctx.param("id"), Some("7"));
        assert_eq!(ctx.route().unwrap().label(), "books.show");
    }

    #[test]
    fn test_extensions() {
        #[derive(Debug, PartialEq)]
        struct Locale(&'static str);

        let mut ctx = ctx();
        ctx.insert_extension(Locale("en"));
        assert_eq!(ctx.extension::<Locale>(), Some(&Locale("en")));
        assert_eq!(ctx.remove_extension::<Locale>(), Some(Locale("en")));
        assert!(ctx.extension::<Locale>().is_none());
    }

    #[test]
    fn test_cancellation_token_is_shared() {
        let token = CancellationToken::new();
        let ctx = ctx().with_cancellation(token.clone());
        assert!(!ctx.is_cancelled());
        token.cancel();
        assert!(ctx.is_cancelled());
    }

    #[test]
    fn test_bound_params_type_checks() {
        let mut bound = BoundParams::new();
        bound.insert("id", BoundValue::Int(7));
        assert_eq!(bound.int("id"), Some(7));
        assert_eq!(bound.raw("id"), None);
        assert!(bound.model::<String>("id").is_none());
    }

    #[test]
    fn test_error_slot() {
        let mut ctx = ctx();
        assert!(ctx.error().is_none());
        ctx.set_error(Arc::new(DispatchError::Cancelled));
        assert_eq!(ctx.error().unwrap().type_name(), "CancelledError");
    }
}
