//! The dispatch coordinator.
//!
//! Turns one [`Event`] into exactly one [`Response`]:
//!
//! ```text
//! Idle ─► Matching ─► Binding ─► Piping ─► Rendering ─► Done
//!            │           │          │          ▲
//!            └───────────┴──────────┴─► ErrorHandling
//! ```
//!
//! - **Matching** runs the before-event hooks and resolves the route.
//!   No route is `RouteNotFoundError`; a path match with the wrong method
//!   is `MethodNotAllowedError`.
//! - **Binding** runs the route's parameter bindings.
//! - **Piping** runs the middleware pipeline and the handler.
//! - **ErrorHandling** picks an error mapping and runs its handler against
//!   the same context. An unmapped error, or an error handler that fails,
//!   produces the generic fallback and nothing else is attempted.
//! - **Rendering** wraps non-raw content in the chosen layout chain.
//! - **Done** stamps `x-request-id`, runs the after-response hooks and
//!   records metrics. Cancellation jumps straight here.

use crate::app::{App, Endpoint};
use bytes::Bytes;
use http::header::{HeaderValue, ALLOW};
use http::StatusCode;
use std::sync::Arc;
use switchyard_core::{
    DispatchContext, DispatchError, DispatchPhase, Event, MatchedRoute, Response,
};
use switchyard_middleware::stages::{incoming_request_id, stamp_request_id};
use switchyard_router::{allow_header, Resolution};
use switchyard_telemetry::metrics::{self, InFlightGuard, UNMATCHED_ROUTE};
use tokio_util::sync::CancellationToken;

/// Body of the generic fallback response.
pub const FALLBACK_BODY: &str = "internal server error";
/// Body of the response to a cancelled event.
pub const CANCELLED_BODY: &str = "event cancelled";

enum Outcome {
    Finished(Response),
    Cancelled,
    TimedOut,
}

impl App {
    /// Dispatches one event.
    ///
    /// Never fails: every error ends as a mapped response or the generic
    /// fallback.
    pub async fn dispatch(&self, event: Event) -> Response {
        self.dispatch_with_cancellation(event, CancellationToken::new())
            .await
    }

    /// Dispatches one event, stopping early when `token` is cancelled.
    ///
    /// A cancelled event answers `503 Service Unavailable` without running
    /// any further stage. After-response hooks still run.
    pub async fn dispatch_with_cancellation(
        &self,
        mut event: Event,
        token: CancellationToken,
    ) -> Response {
        let inner = &self.inner;
        let _in_flight = inner.settings.metrics.then(InFlightGuard::new);

        if inner.settings.trust_request_id {
            if let Some(id) = incoming_request_id(&event) {
                event.set_id(id);
            }
        }
        let mut ctx = DispatchContext::with_services(event, Arc::clone(&inner.services))
            .with_cancellation(token.clone());

        let mut response = match inner.lifecycle.ensure_ready(&inner.services).await {
            Ok(()) => {
                let outcome = {
                    let deadline = async {
                        match inner.settings.timeout {
                            Some(limit) => tokio::time::sleep(limit).await,
                            None => std::future::pending::<()>().await,
                        }
                    };
                    tokio::select! {
                        biased;
                        () = token.cancelled() => Outcome::Cancelled,
                        () = deadline => Outcome::TimedOut,
                        response = self.run_phases(&mut ctx) => Outcome::Finished(response),
                    }
                };
                match outcome {
                    Outcome::Finished(response) => response,
                    Outcome::TimedOut => {
                        tracing::warn!(
                            event_id = %ctx.event_id(),
                            phase = ctx.phase().as_str(),
                            "dispatch timed out"
                        );
                        token.cancel();
                        self.cancelled(&mut ctx)
                    }
                    Outcome::Cancelled => self.cancelled(&mut ctx),
                }
            }
            Err(e) => {
                tracing::error!(event_id = %ctx.event_id(), error = %e, "application is not ready");
                fallback()
            }
        };

        ctx.enter(DispatchPhase::Done);
        stamp_request_id(&mut response, ctx.event_id());
        ctx.set_status(response.status());
        inner.lifecycle.run_after(&ctx, &mut response).await;

        let route = ctx.route().map_or(UNMATCHED_ROUTE, MatchedRoute::label);
        if inner.settings.metrics {
            metrics::record_event(
                ctx.event().kind().as_str(),
                route,
                response.status().as_u16(),
                ctx.elapsed(),
            );
        }
        tracing::info!(
            event_id = %ctx.event_id(),
            kind = ctx.event().kind().as_str(),
            method = %ctx.event().method(),
            path = ctx.event().path(),
            route,
            status = response.status().as_u16(),
            duration_ms = ctx.elapsed().as_secs_f64() * 1000.0,
            "event dispatched"
        );
        response
    }

    /// Dispatches an `http::Request`, e.g. from a server integration.
    pub async fn dispatch_http(&self, request: http::Request<Bytes>) -> http::Response<String> {
        let (parts, body) = request.into_parts();
        let target = parts
            .uri
            .path_and_query()
            .map_or_else(|| parts.uri.path().to_string(), |pq| pq.as_str().to_string());
        let mut event = Event::http(parts.method, &target).with_body(body);
        *event.headers_mut() = parts.headers;
        self.dispatch(event).await.into_http()
    }

    async fn run_phases(&self, ctx: &mut DispatchContext) -> Response {
        let inner = &self.inner;

        ctx.enter(DispatchPhase::Matching);
        let before = inner.lifecycle.run_before(ctx).await;
        if let Err(err) = before {
            return self.handle_error(ctx, err, None).await;
        }

        let method = ctx.event().method().clone();
        let path = ctx.event().path().to_string();
        let matched = match inner.routes.resolve(&method, &path) {
            Resolution::Matched(matched) => matched,
            Resolution::MethodNotAllowed { allowed } => {
                let err = DispatchError::MethodNotAllowed {
                    method,
                    path,
                    allowed,
                };
                return self.handle_error(ctx, err, None).await;
            }
            Resolution::NotFound => {
                let err = DispatchError::RouteNotFound { method, path };
                return self.handle_error(ctx, err, None).await;
            }
        };

        let route = matched.route;
        let endpoint: &Endpoint = route.endpoint();
        ctx.set_route(
            MatchedRoute {
                name: route.name().map(ToString::to_string),
                pattern: route.pattern().source().to_string(),
            },
            matched.params,
        );

        ctx.enter(DispatchPhase::Binding);
        let bound = endpoint
            .bindings
            .resolve(ctx.raw_params(), ctx.services())
            .await;
        match bound {
            Ok(bound) => ctx.set_params(bound),
            Err(err) => return self.handle_error(ctx, err, Some(endpoint)).await,
        }

        ctx.enter(DispatchPhase::Piping);
        let result = endpoint.pipeline.run(ctx, endpoint.handler.as_ref()).await;
        match result {
            Ok(response) => self.render(ctx, response, endpoint.layout.as_deref()),
            Err(err) => self.handle_error(ctx, err, Some(endpoint)).await,
        }
    }

    async fn handle_error(
        &self,
        ctx: &mut DispatchContext,
        err: DispatchError,
        endpoint: Option<&Endpoint>,
    ) -> Response {
        if err.is_cancelled() {
            return self.cancelled(ctx);
        }

        ctx.enter(DispatchPhase::ErrorHandling);
        let err = Arc::new(err);
        ctx.set_error(Arc::clone(&err));
        let metrics_enabled = self.inner.settings.metrics;

        match self.inner.errors.dispatch(&err) {
            Ok(resolution) => {
                tracing::debug!(
                    event_id = %ctx.event_id(),
                    error_type = err.type_name(),
                    status = resolution.status.as_u16(),
                    "error mapped"
                );
                let handled = resolution.handler.call(ctx).await;
                match handled {
                    Ok(mut response) => {
                        if metrics_enabled {
                            metrics::record_error(err.type_name(), true);
                        }
                        if response.status() == StatusCode::OK {
                            *response.status_mut() = resolution.status;
                        }
                        stamp_allow(&err, &mut response);
                        let layout = resolution
                            .layout
                            .or_else(|| endpoint.and_then(|e| e.layout.as_deref()));
                        self.render(ctx, response, layout)
                    }
                    Err(handler_err) => {
                        tracing::error!(
                            event_id = %ctx.event_id(),
                            error_type = err.type_name(),
                            error = ?err,
                            handler_error = ?handler_err,
                            "error handler failed"
                        );
                        if metrics_enabled {
                            metrics::record_error(err.type_name(), false);
                        }
                        fallback()
                    }
                }
            }
            Err(unhandled) => {
                tracing::error!(
                    event_id = %ctx.event_id(),
                    error_type = err.type_name(),
                    error = ?err,
                    "{unhandled}"
                );
                if metrics_enabled {
                    metrics::record_error(err.type_name(), false);
                }
                fallback()
            }
        }
    }

    fn render(&self, ctx: &mut DispatchContext, mut response: Response, layout: Option<&str>) -> Response {
        ctx.enter(DispatchPhase::Rendering);
        if response.is_raw() {
            return response;
        }
        let layouts = &self.inner.layouts;
        let Some(name) = layout.or(self.inner.default_layout.as_deref()) else {
            return response;
        };

        if let Ok(chain) = layouts.chain(name) {
            ctx.set_layouts(chain.into_iter().map(ToString::to_string).collect());
        }
        match layouts.compose(name, response.body()) {
            Some(body) => response.set_body(body),
            None => tracing::warn!(layout = name, "layout vanished after assembly"),
        }
        response
    }

    fn cancelled(&self, ctx: &mut DispatchContext) -> Response {
        tracing::debug!(
            event_id = %ctx.event_id(),
            phase = ctx.phase().as_str(),
            "event cancelled"
        );
        if self.inner.settings.metrics {
            metrics::record_cancelled();
        }
        ctx.enter(DispatchPhase::Done);
        Response::text(CANCELLED_BODY)
            .with_status(StatusCode::SERVICE_UNAVAILABLE)
            .raw()
    }
}

/// Lists the allowed methods on a mapped method-not-allowed response.
fn stamp_allow(err: &DispatchError, response: &mut Response) {
    if let DispatchError::MethodNotAllowed { allowed, .. } = err {
        if !response.headers().contains_key(ALLOW) {
            if let Ok(value) = HeaderValue::from_str(&allow_header(allowed)) {
                response.headers_mut().insert(ALLOW, value);
            }
        }
    }
}

/// The generic response for errors nothing could handle.
fn fallback() -> Response {
    Response::text(FALLBACK_BODY)
        .with_status(StatusCode::INTERNAL_SERVER_ERROR)
        .raw()
}
