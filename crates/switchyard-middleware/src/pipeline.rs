//! Priority-ordered middleware pipeline.
//!
//! A [`Pipeline`] is built once per route at assembly time from the global
//! middleware list and the route's own entries:
//!
//! 1. global entries, then route entries, in declaration order
//! 2. stable sort by priority, lower first
//! 3. drop every entry whose [`Middleware::name`] was already seen
//!
//! ```text
//! global: [(10, A)]        route: [(5, B), (10, C), (20, A)]
//!              \                    /
//!     merged:  (10, A) (5, B) (10, C) (20, A)
//!     sorted:  (5, B) (10, A) (10, C) (20, A)
//!     deduped: B, A, C
//! ```

use crate::middleware::{AbortSlot, BoxedMiddleware, Middleware, Next};
use std::collections::HashSet;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::task::Poll;
use switchyard_core::{DispatchContext, DispatchResult, Handler, Response};

/// Default priority for entries declared without one.
pub const DEFAULT_PRIORITY: i32 = 100;

/// A middleware stage with its priority. Lower priorities run earlier.
#[derive(Clone)]
pub struct MiddlewareEntry {
    priority: i32,
    pipe: BoxedMiddleware,
}

impl MiddlewareEntry {
    /// Wraps a middleware with a priority.
    pub fn new<M: Middleware>(priority: i32, pipe: M) -> Self {
        Self {
            priority,
            pipe: Arc::new(pipe),
        }
    }

    /// Wraps an already shared middleware.
    #[must_use]
    pub fn shared(priority: i32, pipe: BoxedMiddleware) -> Self {
        Self { priority, pipe }
    }

    /// Priority.
    #[must_use]
    pub const fn priority(&self) -> i32 {
        self.priority
    }

    /// The stage's identity.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.pipe.name()
    }

    /// The stage.
    #[must_use]
    pub fn pipe(&self) -> &BoxedMiddleware {
        &self.pipe
    }
}

impl fmt::Debug for MiddlewareEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MiddlewareEntry")
            .field("priority", &self.priority)
            .field("name", &self.pipe.name())
            .finish()
    }
}

/// An ordered, immutable chain of middleware stages.
///
/// # Example
///
/// ```
/// use switchyard_middleware::{from_fn, MiddlewareEntry, Pipeline};
///
/// let pass = |name| from_fn(name, |ctx, next| Box::pin(async move { next.run(ctx).await }));
///
/// let pipeline = Pipeline::build(
///     &[MiddlewareEntry::new(10, pass("a"))],
///     &[MiddlewareEntry::new(5, pass("b")), MiddlewareEntry::new(10, pass("c"))],
/// );
/// assert_eq!(pipeline.stage_names(), vec!["b", "a", "c"]);
/// ```
#[derive(Clone, Default)]
pub struct Pipeline {
    stages: Vec<BoxedMiddleware>,
}

impl Pipeline {
    /// An empty pipeline; events go straight to the handler.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Merges, orders and deduplicates global and route entries.
    #[must_use]
    pub fn build(global: &[MiddlewareEntry], route: &[MiddlewareEntry]) -> Self {
        let mut merged: Vec<&MiddlewareEntry> = global.iter().chain(route).collect();
        merged.sort_by_key(|entry| entry.priority);

        let mut seen = HashSet::new();
        let stages = merged
            .into_iter()
            .filter(|entry| seen.insert(entry.name()))
            .map(|entry| Arc::clone(&entry.pipe))
            .collect();

        Self { stages }
    }

    /// Runs the chain and then `terminal`.
    ///
    /// The first stage (or the handler) to return an error aborts the
    /// chain: that error is returned unchanged and the stages still waiting
    /// on `next` are dropped without resuming.
    pub async fn run(
        &self,
        ctx: &mut DispatchContext,
        terminal: &dyn Handler,
    ) -> DispatchResult<Response> {
        let slot = AbortSlot::default();
        let mut chain = std::pin::pin!(Next::aborting(&self.stages, terminal, &slot).run(ctx));
        std::future::poll_fn(|cx| match chain.as_mut().poll(cx) {
            Poll::Ready(result) => Poll::Ready(result),
            // A failing step parks inside the same poll that raised it.
            Poll::Pending => slot.take().map_or(Poll::Pending, |err| Poll::Ready(Err(err))),
        })
        .await
    }

    /// Stage names in execution order.
    #[must_use]
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|stage| stage.name()).collect()
    }

    /// Number of stages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Returns true if there are no stages.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("stages", &self.stage_names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::from_fn;
    use http::Method;
    use switchyard_core::{sync_handler, BoxFuture, DispatchError, Event};

    struct Named(&'static str);

    impl Middleware for Named {
        fn name(&self) -> &'static str {
            self.0
        }

        fn process<'a>(
            &'a self,
            ctx: &'a mut DispatchContext,
            next: Next<'a>,
        ) -> BoxFuture<'a, DispatchResult<Response>> {
            Box::pin(async move {
                let mut response = next.run(ctx).await?;
                let body = format!("{}>{}", self.0, response.body());
                response.set_body(body);
                Ok(response)
            })
        }
    }

    fn entry(priority: i32, name: &'static str) -> MiddlewareEntry {
        MiddlewareEntry::new(priority, Named(name))
    }

    fn ctx() -> DispatchContext {
        DispatchContext::new(Event::http(Method::GET, "/"))
    }

    #[test]
    fn test_priority_is_stable() {
        let pipeline = Pipeline::build(&[], &[entry(10, "A"), entry(5, "B"), entry(10, "C")]);
        assert_eq!(pipeline.stage_names(), vec!["B", "A", "C"]);
    }

    #[test]
    fn test_global_precedes_route_on_equal_priority() {
        let pipeline = Pipeline::build(&[entry(0, "global")], &[entry(0, "route")]);
        assert_eq!(pipeline.stage_names(), vec!["global", "route"]);
    }

    #[test]
    fn test_dedupe_keeps_first_after_sorting() {
        let pipeline = Pipeline::build(
            &[entry(50, "auth")],
            &[entry(10, "auth"), entry(20, "csrf")],
        );
        assert_eq!(pipeline.stage_names(), vec!["auth", "csrf"]);
        assert_eq!(pipeline.len(), 2);
    }

    #[test]
    fn test_negative_priorities_run_first() {
        let pipeline = Pipeline::build(&[entry(DEFAULT_PRIORITY, "late")], &[entry(-5, "early")]);
        assert_eq!(pipeline.stage_names(), vec!["early", "late"]);
    }

    #[tokio::test]
    async fn test_run_wraps_handler_in_order() {
        let pipeline = Pipeline::build(&[entry(1, "outer")], &[entry(2, "inner")]);
        let handler = sync_handler(|_| Ok(Response::text("h")));

        let response = pipeline.run(&mut ctx(), &handler).await.unwrap();
        assert_eq!(response.body(), "outer>inner>h");
    }

    #[tokio::test]
    async fn test_error_aborts_remaining_stages() {
        let failing = from_fn("failing", |_ctx, _next| {
            Box::pin(async move { Err(DispatchError::raise("GateClosedError").build()) })
        });
        let pipeline = Pipeline::build(
            &[MiddlewareEntry::new(0, failing)],
            &[entry(1, "after")],
        );
        let handler = sync_handler(|_| panic!("handler must not run"));

        let err = pipeline.run(&mut ctx(), &handler).await.unwrap_err();
        assert_eq!(err.type_name(), "GateClosedError");
    }

    #[tokio::test]
    async fn test_empty_pipeline_calls_handler() {
        let pipeline = Pipeline::empty();
        assert!(pipeline.is_empty());
        let handler = sync_handler(|_| Ok(Response::text("direct")));
        let response = pipeline.run(&mut ctx(), &handler).await.unwrap();
        assert_eq!(response.body(), "direct");
    }
}
