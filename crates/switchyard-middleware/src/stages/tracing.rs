//! Tracing middleware.
//!
//! Wraps the rest of the chain in a `tracing` span and logs the outcome.
//! When an HTTP event carries a W3C `traceparent` header the upstream trace
//! id is recorded on the span and kept as a [`TraceInfo`] extension so
//! handlers can forward it.

use crate::middleware::{Middleware, Next};
use switchyard_core::{BoxFuture, DispatchContext, DispatchResult, Response};
use tracing::{field, Instrument};

/// The W3C Trace Context header.
pub const TRACEPARENT_HEADER: &str = "traceparent";

/// Middleware that instruments the chain with a span.
///
/// # Span fields
///
/// | Field      | Value                                 |
/// |------------|---------------------------------------|
/// | `service`  | configured service name               |
/// | `event_id` | the event's UUID v7                   |
/// | `kind`     | `http`, `cli` or `navigation`         |
/// | `method`   | dispatch method                       |
/// | `path`     | event path                            |
/// | `route`    | matched route name or pattern         |
/// | `trace_id` | upstream trace id, when propagated    |
/// | `status`   | response status, recorded on success  |
#[derive(Debug, Clone)]
pub struct TracingMiddleware {
    service_name: String,
}

impl TracingMiddleware {
    /// Creates a tracing middleware for `service_name`.
    #[must_use]
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
        }
    }
}

impl Default for TracingMiddleware {
    fn default() -> Self {
        Self::new("switchyard")
    }
}

impl Middleware for TracingMiddleware {
    fn name(&self) -> &'static str {
        "tracing"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut DispatchContext,
        next: Next<'a>,
    ) -> BoxFuture<'a, DispatchResult<Response>> {
        let parent = ctx
            .event()
            .headers()
            .get(TRACEPARENT_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(TraceInfo::parse);

        let span = tracing::info_span!(
            "dispatch",
            service = %self.service_name,
            event_id = %ctx.event_id(),
            kind = ctx.event().kind().as_str(),
            method = %ctx.event().method(),
            path = ctx.event().path(),
            route = ctx.route().map_or("", |r| r.label()),
            trace_id = field::Empty,
            status = field::Empty,
        );
        if let Some(info) = &parent {
            span.record("trace_id", info.trace_id.as_str());
        }

        Box::pin(
            async move {
                if let Some(info) = parent {
                    ctx.insert_extension(info);
                }

                // Failures abort the chain before this stage resumes and are
                // logged where they are raised, inside this span.
                let response = next.run(ctx).await?;
                tracing::Span::current().record("status", response.status().as_u16());
                tracing::debug!(
                    elapsed_ms = ctx.elapsed().as_secs_f64() * 1000.0,
                    "chain completed"
                );
                Ok(response)
            }
            .instrument(span),
        )
    }
}

/// Upstream trace context parsed from `traceparent`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceInfo {
    /// 32 hex characters.
    pub trace_id: String,
    /// 16 hex characters.
    pub parent_span_id: String,
    /// Whether the upstream sampled this trace.
    pub sampled: bool,
}

impl TraceInfo {
    /// Parses `{version}-{trace-id}-{parent-span-id}-{flags}`.
    ///
    /// Only version `00` is accepted.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        let mut parts = value.split('-');
        let (version, trace_id, span_id, flags) =
            (parts.next()?, parts.next()?, parts.next()?, parts.next()?);
        if parts.next().is_some() || version != "00" {
            return None;
        }
        let hex = |s: &str, len: usize| s.len() == len && s.chars().all(|c| c.is_ascii_hexdigit());
        if !hex(trace_id, 32) || !hex(span_id, 16) || !hex(flags, 2) {
            return None;
        }
        let flags = u8::from_str_radix(flags, 16).ok()?;
        Some(Self {
            trace_id: trace_id.to_string(),
            parent_span_id: span_id.to_string(),
            sampled: flags & 0x01 != 0,
        })
    }
}
