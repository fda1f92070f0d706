//! Request ID middleware.
//!
//! Every event already carries a UUID v7 [`EventId`]. This stage optionally
//! adopts an id supplied by a trusted caller in the `x-request-id` header,
//! and echoes the final id on the response so clients can correlate their
//! events with server logs.

use crate::middleware::{Middleware, Next};
use http::HeaderValue;
use switchyard_core::{BoxFuture, DispatchContext, DispatchResult, Event, EventId, Response};

/// The header name for request ID propagation.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Middleware that propagates event ids.
///
/// # Behavior
///
/// 1. If incoming ids are trusted and `x-request-id` holds a valid UUID,
///    the event adopts it
/// 2. The rest of the chain runs
/// 3. The event id is set as `x-request-id` on the response
#[derive(Debug, Clone, Default)]
pub struct RequestIdMiddleware {
    trust_incoming: bool,
}

impl RequestIdMiddleware {
    /// Creates a middleware that always keeps the generated id.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a middleware that adopts incoming `x-request-id` headers.
    ///
    /// Use this behind a proxy or for service-to-service traffic where
    /// the caller has already assigned an id.
    #[must_use]
    pub fn trust_incoming() -> Self {
        Self {
            trust_incoming: true,
        }
    }

    fn incoming_id(&self, ctx: &DispatchContext) -> Option<EventId> {
        if !self.trust_incoming {
            return None;
        }
        incoming_request_id(ctx.event())
    }
}

/// The valid UUID carried in an event's `x-request-id` header, if any.
#[must_use]
pub fn incoming_request_id(event: &Event) -> Option<EventId> {
    event
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(EventId::parse)
}

/// Sets `x-request-id` on `response` unless already present.
pub fn stamp_request_id(response: &mut Response, id: EventId) {
    if response.headers().contains_key(REQUEST_ID_HEADER) {
        return;
    }
    if let Ok(value) = HeaderValue::from_str(&id.to_string()) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
}

impl Middleware for RequestIdMiddleware {
    fn name(&self) -> &'static str {
        "request_id"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut DispatchContext,
        next: Next<'a>,
    ) -> BoxFuture<'a, DispatchResult<Response>> {
        Box::pin(async move {
            if let Some(id) = self.incoming_id(ctx) {
                ctx.event_mut().set_id(id);
            }
            let id = ctx.event_id();

            let mut response = next.run(ctx).await?;
            stamp_request_id(&mut response, id);
            Ok(response)
        })
    }
}
