//! Core middleware trait and types.
//!
//! This module defines the [`Middleware`] trait that every pipeline stage
//! implements. A stage sees the [`DispatchContext`] and a [`Next`]
//! continuation; it may call `next`, transform the result, short-circuit with
//! its own response, or fail with a [`DispatchError`] that aborts the rest of
//! the chain.
//!
//! # Example
//!
//! ```
//! use switchyard_core::{BoxFuture, DispatchContext, DispatchResult, Response};
//! use switchyard_middleware::{Middleware, Next};
//!
//! struct PoweredBy;
//!
//! impl Middleware for PoweredBy {
//!     fn name(&self) -> &'static str {
//!         "powered_by"
//!     }
//!
//!     fn process<'a>(
//!         &'a self,
//!         ctx: &'a mut DispatchContext,
//!         next: Next<'a>,
//!     ) -> BoxFuture<'a, DispatchResult<Response>> {
//!         Box::pin(async move {
//!             let response = next.run(ctx).await?;
//!             Ok(response.with_header(
//!                 http::header::SERVER,
//!                 http::HeaderValue::from_static("switchyard"),
//!             ))
//!         })
//!     }
//! }
//! ```

use parking_lot::Mutex;
use std::sync::Arc;
use switchyard_core::{BoxFuture, DispatchContext, DispatchError, DispatchResult, Handler, Response};

/// A shared, type-erased middleware stage.
pub type BoxedMiddleware = Arc<dyn Middleware>;

/// A pipeline stage.
///
/// # Invariants
///
/// - `next.run()` is called at most once; not calling it short-circuits
/// - Errors returned from `next` should be propagated, not swallowed
/// - Two stages with the same [`name`](Middleware::name) are the same pipe;
///   a pipeline keeps only the first after ordering
pub trait Middleware: Send + Sync + 'static {
    /// Identity of this stage, used for deduplication and logging.
    fn name(&self) -> &'static str;

    /// Processes the event.
    fn process<'a>(
        &'a self,
        ctx: &'a mut DispatchContext,
        next: Next<'a>,
    ) -> BoxFuture<'a, DispatchResult<Response>>;
}

impl<M: Middleware + ?Sized> Middleware for Arc<M> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut DispatchContext,
        next: Next<'a>,
    ) -> BoxFuture<'a, DispatchResult<Response>> {
        (**self).process(ctx, next)
    }
}

/// Holds the error that aborted a chain.
///
/// Once a step fails, [`Next::run`] parks its caller forever and leaves the
/// error here; the driving [`Pipeline`](crate::Pipeline) picks it up and
/// drops every suspended stage, so no code after an aborted `next` runs.
#[derive(Default)]
pub(crate) struct AbortSlot(Mutex<Option<DispatchError>>);

impl AbortSlot {
    fn raise(&self, err: DispatchError) {
        let mut slot = self.0.lock();
        if slot.is_none() {
            *slot = Some(err);
        }
    }

    pub(crate) fn take(&self) -> Option<DispatchError> {
        self.0.lock().take()
    }
}

/// Continuation that runs the rest of the chain.
///
/// Consumed by [`Next::run`], so it can only be invoked once.
pub struct Next<'a> {
    stages: &'a [BoxedMiddleware],
    terminal: &'a dyn Handler,
    abort: Option<&'a AbortSlot>,
}

impl<'a> Next<'a> {
    /// Creates a continuation over `stages` ending in `terminal`.
    ///
    /// Errors from a standalone continuation are returned to the caller.
    /// Run through [`Pipeline::run`](crate::Pipeline::run) to abort the
    /// whole chain instead.
    pub fn new(stages: &'a [BoxedMiddleware], terminal: &'a dyn Handler) -> Self {
        Self {
            stages,
            terminal,
            abort: None,
        }
    }

    pub(crate) fn aborting(
        stages: &'a [BoxedMiddleware],
        terminal: &'a dyn Handler,
        abort: &'a AbortSlot,
    ) -> Self {
        Self {
            stages,
            terminal,
            abort: Some(abort),
        }
    }

    /// Number of stages left before the handler.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.stages.len()
    }

    /// Invokes the next stage, or the handler at the end of the chain.
    ///
    /// Returns [`DispatchError::Cancelled`] without entering the next step
    /// once the event's cancellation token has fired.
    pub async fn run(self, ctx: &mut DispatchContext) -> DispatchResult<Response> {
        let result = if ctx.is_cancelled() {
            tracing::debug!(
                event_id = %ctx.event_id(),
                remaining = self.stages.len(),
                "dispatch cancelled inside pipeline"
            );
            Err(DispatchError::Cancelled)
        } else {
            match self.stages.split_first() {
                Some((stage, rest)) => {
                    tracing::trace!(stage = stage.name(), "entering middleware");
                    stage
                        .process(
                            ctx,
                            Next {
                                stages: rest,
                                terminal: self.terminal,
                                abort: self.abort,
                            },
                        )
                        .await
                }
                None => self.terminal.call(ctx).await,
            }
        };

        match (result, self.abort) {
            (Err(err), Some(slot)) => {
                if !err.is_cancelled() {
                    tracing::warn!(
                        error_type = err.type_name(),
                        error = %err,
                        remaining = self.stages.len(),
                        "chain aborted"
                    );
                }
                slot.raise(err);
                std::future::pending().await
            }
            (result, _) => result,
        }
    }
}

/// A middleware built from a closure.
///
/// See [`from_fn`].
pub struct FnMiddleware<F> {
    name: &'static str,
    func: F,
}

impl<F> FnMiddleware<F> {
    /// Creates a new function-based middleware.
    pub const fn new(name: &'static str, func: F) -> Self {
        Self { name, func }
    }
}

impl<F> Middleware for FnMiddleware<F>
where
    F: for<'a> Fn(&'a mut DispatchContext, Next<'a>) -> BoxFuture<'a, DispatchResult<Response>>
        + Send
        + Sync
        + 'static,
{
    fn name(&self) -> &'static str {
        self.name
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut DispatchContext,
        next: Next<'a>,
    ) -> BoxFuture<'a, DispatchResult<Response>> {
        (self.func)(ctx, next)
    }
}

/// Builds a middleware from a closure.
///
/// ```
/// use switchyard_core::DispatchError;
/// use switchyard_middleware::from_fn;
///
/// let require_admin = from_fn("require_admin", |ctx, next| {
///     Box::pin(async move {
///         if ctx.event().headers().contains_key("x-admin") {
///             next.run(ctx).await
///         } else {
///             Err(DispatchError::raise("ForbiddenError").build())
///         }
///     })
/// });
/// # let _ = require_admin;
/// ```
pub fn from_fn<F>(name: &'static str, func: F) -> FnMiddleware<F>
where
    F: for<'a> Fn(&'a mut DispatchContext, Next<'a>) -> BoxFuture<'a, DispatchResult<Response>>
        + Send
        + Sync
        + 'static,
{
    FnMiddleware::new(name, func)
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Method;
    use std::sync::Mutex;
    use switchyard_core::{sync_handler, Event};
    use tokio_util::sync::CancellationToken;

    struct Recorder {
        name: &'static str,
        log: Arc<Mutex<Vec<&'static str>>>,
    }

    impl Middleware for Recorder {
        fn name(&self) -> &'static str {
            self.name
        }

        fn process<'a>(
            &'a self,
            ctx: &'a mut DispatchContext,
            next: Next<'a>,
        ) -> BoxFuture<'a, DispatchResult<Response>> {
            Box::pin(async move {
                self.log.lock().unwrap().push(self.name);
                next.run(ctx).await
            })
        }
    }

    fn ctx() -> DispatchContext {
        DispatchContext::new(Event::http(Method::GET, "/"))
    }

    #[tokio::test]
    async fn test_terminal_next_calls_handler() {
        let handler = sync_handler(|_| Ok(Response::text("OK")));
        let next = Next::new(&[], &handler);
        assert_eq!(next.remaining(), 0);

        let response = next.run(&mut ctx()).await.unwrap();
        assert_eq!(response.body(), "OK");
    }

    #[tokio::test]
    async fn test_chain_runs_in_slice_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let stages: Vec<BoxedMiddleware> = vec![
            Arc::new(Recorder {
                name: "first",
                log: Arc::clone(&log),
            }),
            Arc::new(Recorder {
                name: "second",
                log: Arc::clone(&log),
            }),
        ];
        let handler = sync_handler(|_| Ok(Response::text("OK")));

        Next::new(&stages, &handler).run(&mut ctx()).await.unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["first", "second"]);
    }

    #[tokio::test]
    async fn test_cancelled_before_entering() {
        let token = CancellationToken::new();
        token.cancel();
        let mut ctx = ctx().with_cancellation(token);

        let handler = sync_handler(|_| Ok(Response::text("never")));
        let err = Next::new(&[], &handler).run(&mut ctx).await.unwrap_err();
        assert!(err.is_cancelled());
    }

    #[tokio::test]
    async fn test_from_fn_short_circuits() {
        let guard = from_fn("guard", |_ctx, _next| {
            Box::pin(async move { Ok(Response::text("blocked")) })
        });
        let stages: Vec<BoxedMiddleware> = vec![Arc::new(guard)];
        let handler = sync_handler(|_| Ok(Response::text("handler")));

        let response = Next::new(&stages, &handler).run(&mut ctx()).await.unwrap();
        assert_eq!(response.body(), "blocked");
    }
}
