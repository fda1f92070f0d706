//! End-to-end pipeline integration tests.
//!
//! These tests build pipelines from global and route entries the way the
//! application builder does, and check ordering, short-circuiting, error
//! propagation and cancellation across the whole chain.

use http::{Method, StatusCode};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use switchyard_core::{
    handler_fn, sync_handler, BoxFuture, DispatchContext, DispatchError, DispatchResult, Event,
    Response,
};
use switchyard_middleware::{
    from_fn,
    stages::{RequestIdMiddleware, TracingMiddleware, REQUEST_ID_HEADER},
    Middleware, MiddlewareEntry, Next, Pipeline,
};
use tokio_util::sync::CancellationToken;

type Log = Arc<Mutex<Vec<String>>>;

/// Records its name before and after the rest of the chain.
struct Tracer {
    name: &'static str,
    log: Log,
}

impl Middleware for Tracer {
    fn name(&self) -> &'static str {
        self.name
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut DispatchContext,
        next: Next<'a>,
    ) -> BoxFuture<'a, DispatchResult<Response>> {
        Box::pin(async move {
            self.log.lock().unwrap().push(format!("{}:in", self.name));
            let result = next.run(ctx).await;
            self.log.lock().unwrap().push(format!("{}:out", self.name));
            result
        })
    }
}

/// Fails without calling `next`.
struct Gate {
    log: Log,
}

impl Middleware for Gate {
    fn name(&self) -> &'static str {
        "gate"
    }

    fn process<'a>(
        &'a self,
        _ctx: &'a mut DispatchContext,
        _next: Next<'a>,
    ) -> BoxFuture<'a, DispatchResult<Response>> {
        Box::pin(async move {
            self.log.lock().unwrap().push("gate:in".to_string());
            Err(DispatchError::raise("AccessDeniedError")
                .extends("AuthError")
                .status(StatusCode::FORBIDDEN)
                .message("members only")
                .build())
        })
    }
}

fn traced(priority: i32, name: &'static str, log: &Log) -> MiddlewareEntry {
    MiddlewareEntry::new(
        priority,
        Tracer {
            name,
            log: Arc::clone(log),
        },
    )
}

fn recording_handler(log: &Log) -> impl switchyard_core::Handler {
    let log = Arc::clone(log);
    sync_handler(move |_| {
        log.lock().unwrap().push("handler".to_string());
        Ok(Response::text("done"))
    })
}

fn ctx(path: &str) -> DispatchContext {
    DispatchContext::new(Event::http(Method::GET, path))
}

fn entries(log: &Log) -> Vec<String> {
    log.lock().unwrap().clone()
}

#[tokio::test]
async fn test_equal_priorities_keep_declaration_order() {
    let log = Log::default();
    let pipeline = Pipeline::build(
        &[],
        &[traced(10, "A", &log), traced(5, "B", &log), traced(10, "C", &log)],
    );
    let handler = recording_handler(&log);

    pipeline.run(&mut ctx("/"), &handler).await.unwrap();

    assert_eq!(
        entries(&log),
        vec!["B:in", "A:in", "C:in", "handler", "C:out", "A:out", "B:out"]
    );
}

#[tokio::test]
async fn test_group_and_route_entries_merge() {
    let log = Log::default();
    // What a group with [(0, auth)] containing a route with [(0, audit), (-1, cors)] produces.
    let global = [traced(-10, "request", &log)];
    let route = [traced(0, "auth", &log), traced(0, "audit", &log), traced(-1, "cors", &log)];
    let pipeline = Pipeline::build(&global, &route);

    assert_eq!(pipeline.stage_names(), vec!["request", "cors", "auth", "audit"]);
}

#[tokio::test]
async fn test_stage_raising_before_next_stops_everything_downstream() {
    let log = Log::default();
    let pipeline = Pipeline::build(
        &[traced(0, "outer", &log)],
        &[
            MiddlewareEntry::new(
                5,
                Gate {
                    log: Arc::clone(&log),
                },
            ),
            traced(10, "inner", &log),
        ],
    );
    let handler = recording_handler(&log);

    let err = pipeline.run(&mut ctx("/members"), &handler).await.unwrap_err();

    assert_eq!(err.type_name(), "AccessDeniedError");
    assert_eq!(err.ancestry(), vec!["AuthError", "HandlerError"]);
    assert_eq!(err.status_hint(), StatusCode::FORBIDDEN);
    assert_eq!(entries(&log), vec!["outer:in", "gate:in"]);
}

#[tokio::test]
async fn test_handler_error_unwinds_through_stages() {
    let log = Log::default();
    let pipeline = Pipeline::build(&[traced(0, "outer", &log)], &[]);
    let handler = sync_handler(|_| Err(DispatchError::binding("id", "x", "not a number")));

    let err = pipeline.run(&mut ctx("/books/x"), &handler).await.unwrap_err();
    assert_eq!(err.type_name(), "BindingError");
    assert_eq!(entries(&log), vec!["outer:in"]);
}

#[tokio::test]
async fn test_outer_stage_cannot_recover_from_aborted_chain() {
    let log = Log::default();
    let recover_log = Arc::clone(&log);
    let recover = from_fn("recover", move |ctx, next| {
        let log = Arc::clone(&recover_log);
        Box::pin(async move {
            let result = next.run(ctx).await;
            log.lock().unwrap().push("recover:after-next".to_string());
            result.or_else(|_| Ok::<_, DispatchError>(Response::text("swallowed")))
        })
    });
    let pipeline = Pipeline::build(&[MiddlewareEntry::new(0, recover)], &[traced(1, "inner", &log)]);
    let handler = handler_fn(|_| {
        Box::pin(async move {
            tokio::time::sleep(Duration::from_millis(1)).await;
            Err::<Response, _>(DispatchError::raise("StorageError").message("disk full").build())
        })
    });

    let err = pipeline.run(&mut ctx("/upload"), &handler).await.unwrap_err();
    assert_eq!(err.type_name(), "StorageError");
    assert_eq!(entries(&log), vec!["inner:in"]);
}

#[tokio::test]
async fn test_short_circuit_response() {
    let log = Log::default();
    let cache = from_fn("cache", |_ctx, _next| {
        Box::pin(async move { Ok(Response::text("cached")) })
    });
    let pipeline = Pipeline::build(
        &[MiddlewareEntry::new(0, cache)],
        &[traced(1, "never", &log)],
    );
    let handler = recording_handler(&log);

    let response = pipeline.run(&mut ctx("/"), &handler).await.unwrap();
    assert_eq!(response.body(), "cached");
    assert!(entries(&log).is_empty());
}

#[tokio::test]
async fn test_cancellation_stops_before_next_stage() {
    let log = Log::default();
    let token = CancellationToken::new();
    let trigger = token.clone();

    let canceller = from_fn("canceller", move |ctx, next| {
        let trigger = trigger.clone();
        Box::pin(async move {
            trigger.cancel();
            next.run(ctx).await
        })
    });
    let pipeline = Pipeline::build(
        &[MiddlewareEntry::new(0, canceller)],
        &[traced(1, "after", &log)],
    );
    let handler = recording_handler(&log);
    let mut ctx = ctx("/slow").with_cancellation(token);

    let err = pipeline.run(&mut ctx, &handler).await.unwrap_err();
    assert!(err.is_cancelled());
    assert!(entries(&log).is_empty());
}

#[tokio::test]
async fn test_builtin_stages_together() {
    let pipeline = Pipeline::build(
        &[
            MiddlewareEntry::new(0, TracingMiddleware::new("e2e")),
            MiddlewareEntry::new(-10, RequestIdMiddleware::new()),
        ],
        &[],
    );
    assert_eq!(pipeline.stage_names(), vec!["request_id", "tracing"]);

    let handler = handler_fn(|ctx| {
        Box::pin(async move {
            tokio::time::sleep(Duration::from_millis(1)).await;
            Ok(Response::text(ctx.event().path().to_string()))
        })
    });
    let mut ctx = ctx("/shelves");
    let response = pipeline.run(&mut ctx, &handler).await.unwrap();

    assert_eq!(response.body(), "/shelves");
    assert_eq!(
        response.header(REQUEST_ID_HEADER),
        Some(ctx.event_id().to_string().as_str())
    );
}
