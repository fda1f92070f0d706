//! Handler trait for event processing.
//!
//! Handlers are stateless: everything they need arrives through the
//! [`DispatchContext`]. Error handlers use the same trait and read the error
//! being handled from [`DispatchContext::error`].

use crate::context::DispatchContext;
use crate::error::DispatchResult;
use crate::response::Response;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// A boxed, sendable future.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A shared, type-erased handler.
pub type BoxedHandler = Arc<dyn Handler>;

/// Produces the response for a matched event.
///
/// # Example
///
/// ```
/// use switchyard_core::{BoxFuture, DispatchContext, DispatchResult, Handler, Response};
///
/// struct ShowBook;
///
/// impl Handler for ShowBook {
///     fn call<'a>(&'a self, ctx: &'a mut DispatchContext) -> BoxFuture<'a, DispatchResult<Response>> {
///         Box::pin(async move {
///             let id = ctx.param("id").unwrap_or("?");
///             Ok(Response::html(format!("<h1>Book {id}</h1>")))
///         })
///     }
/// }
/// ```
pub trait Handler: Send + Sync + 'static {
    /// Handles the event.
    fn call<'a>(&'a self, ctx: &'a mut DispatchContext) -> BoxFuture<'a, DispatchResult<Response>>;
}

/// A handler built from an async closure that borrows the context.
///
/// See [`handler_fn`].
pub struct FnHandler<F> {
    func: F,
}

impl<F> Handler for FnHandler<F>
where
    F: for<'a> Fn(&'a mut DispatchContext) -> BoxFuture<'a, DispatchResult<Response>>
        + Send
        + Sync
        + 'static,
{
    fn call<'a>(&'a self, ctx: &'a mut DispatchContext) -> BoxFuture<'a, DispatchResult<Response>> {
        (self.func)(ctx)
    }
}

/// Wraps an async closure as a handler.
///
/// ```
/// use switchyard_core::{handler_fn, Response};
///
/// let handler = handler_fn(|ctx| {
///     Box::pin(async move {
///         Ok(Response::text(format!("hello from {}", ctx.event().path())))
///     })
/// });
/// # let _ = handler;
/// ```
pub fn handler_fn<F>(func: F) -> FnHandler<F>
where
    F: for<'a> Fn(&'a mut DispatchContext) -> BoxFuture<'a, DispatchResult<Response>>
        + Send
        + Sync
        + 'static,
{
    FnHandler { func }
}

/// A handler built from a synchronous closure.
///
/// See [`sync_handler`].
pub struct SyncHandler<F> {
    func: F,
}

impl<F> Handler for SyncHandler<F>
where
    F: Fn(&mut DispatchContext) -> DispatchResult<Response> + Send + Sync + 'static,
{
    fn call<'a>(&'a self, ctx: &'a mut DispatchContext) -> BoxFuture<'a, DispatchResult<Response>> {
        let result = (self.func)(ctx);
        Box::pin(std::future::ready(result))
    }
}

/// Wraps a synchronous closure as a handler.
///
/// ```
/// use switchyard_core::{sync_handler, Response};
///
/// let about = sync_handler(|_ctx| Ok(Response::html("<p>About</p>")));
/// # let _ = about;
/// ```
pub fn sync_handler<F>(func: F) -> SyncHandler<F>
where
    F: Fn(&mut DispatchContext) -> DispatchResult<Response> + Send + Sync + 'static,
{
    SyncHandler { func }
}

impl<H: Handler + ?Sized> Handler for Arc<H> {
    fn call<'a>(&'a self, ctx: &'a mut DispatchContext) -> BoxFuture<'a, DispatchResult<Response>> {
        (**self).call(ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DispatchError;
    use crate::event::Event;
    use http::{Method, StatusCode};
    use switchyard_router::Params;

    fn ctx_for(path: &str) -> DispatchContext {
        DispatchContext::new(Event::http(Method::GET, path))
    }

    #[tokio::test]
    async fn test_handler_fn_reads_context() {
        let handler = handler_fn(|ctx| {
            Box::pin(async move {
                tokio::task::yield_now().await;
                Ok(Response::text(ctx.event().path().to_string()))
            })
        });
        let mut ctx = ctx_for("/shelves");
        let response = handler.call(&mut ctx).await.unwrap();
        assert_eq!(response.body(), "/shelves");
    }

    #[tokio::test]
    async fn test_handler_may_mutate_context() {
        let handler = sync_handler(|ctx| {
            ctx.set_status(StatusCode::CREATED);
            Ok(Response::no_content())
        });
        let mut ctx = ctx_for("/books");
        handler.call(&mut ctx).await.unwrap();
        assert_eq!(ctx.status(), Some(StatusCode::CREATED));
    }

    #[tokio::test]
    async fn test_handler_error_propagates() {
        let handler = sync_handler(|_| Err(DispatchError::raise("ShelfFullError").build()));
        let mut ctx = ctx_for("/shelves/1/books");
        let err = handler.call(&mut ctx).await.unwrap_err();
        assert_eq!(err.type_name(), "ShelfFullError");
    }

    #[tokio::test]
    async fn test_boxed_handler_via_arc() {
        let boxed: BoxedHandler = Arc::new(sync_handler(|ctx| {
            Ok(Response::text(ctx.param("id").unwrap_or_default().to_string()))
        }));
        let mut ctx = ctx_for("/books/9");
        ctx.set_route(
            crate::context::MatchedRoute {
                name: None,
                pattern: "/books/:id".into(),
            },
            [("id", "9")].into_iter().collect::<Params>(),
        );
        let response = boxed.call(&mut ctx).await.unwrap();
        assert_eq!(response.body(), "9");
    }
}
