//! Dispatch metrics.
//!
//! Metrics are emitted through the `metrics` facade; the embedding
//! application installs whatever recorder (Prometheus, StatsD, ...) it
//! wants. Without a recorder every call is a no-op.
//!
//! # Standard Metrics
//!
//! | Metric | Type | Labels | Description |
//! |--------|------|--------|-------------|
//! | `switchyard_events_total` | Counter | `kind`, `route`, `status` | Dispatched events |
//! | `switchyard_dispatch_duration_seconds` | Histogram | `route` | Dispatch latency |
//! | `switchyard_in_flight_events` | Gauge | - | Events currently dispatching |
//! | `switchyard_errors_total` | Counter | `error_type`, `handled` | Errors reaching the dispatcher |
//! | `switchyard_cancelled_total` | Counter | - | Cancelled events |

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use std::time::Duration;

/// Counter of dispatched events.
pub const EVENTS_TOTAL: &str = "switchyard_events_total";
/// Histogram of dispatch latency.
pub const DISPATCH_DURATION: &str = "switchyard_dispatch_duration_seconds";
/// Gauge of events in flight.
pub const IN_FLIGHT: &str = "switchyard_in_flight_events";
/// Counter of errors reaching the dispatcher.
pub const ERRORS_TOTAL: &str = "switchyard_errors_total";
/// Counter of cancelled events.
pub const CANCELLED_TOTAL: &str = "switchyard_cancelled_total";

/// Route label for events that matched nothing.
pub const UNMATCHED_ROUTE: &str = "<unmatched>";

/// Registers descriptions for all standard metrics.
///
/// Call once after installing a recorder.
pub fn describe_metrics() {
    describe_counter!(EVENTS_TOTAL, "Total number of dispatched events");
    describe_histogram!(
        DISPATCH_DURATION,
        metrics::Unit::Seconds,
        "Event dispatch duration in seconds"
    );
    describe_gauge!(IN_FLIGHT, "Number of events currently being dispatched");
    describe_counter!(
        ERRORS_TOTAL,
        "Errors that reached the error dispatcher, by type and whether a mapping handled them"
    );
    describe_counter!(CANCELLED_TOTAL, "Events cancelled before completion");
}

/// Records a completed dispatch.
pub fn record_event(kind: &'static str, route: &str, status: u16, duration: Duration) {
    counter!(
        EVENTS_TOTAL,
        "kind" => kind,
        "route" => route.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    histogram!(DISPATCH_DURATION, "route" => route.to_string()).record(duration.as_secs_f64());
}

/// Records an error that reached the dispatcher.
pub fn record_error(error_type: &str, handled: bool) {
    counter!(
        ERRORS_TOTAL,
        "error_type" => error_type.to_string(),
        "handled" => if handled { "true" } else { "false" }
    )
    .increment(1);
}

/// Records a cancelled event.
pub fn record_cancelled() {
    counter!(CANCELLED_TOTAL).increment(1);
}

/// Guard that tracks one in-flight event.
///
/// Increments [`IN_FLIGHT`] on creation and decrements it on drop, so the
/// gauge stays correct when a dispatch future is dropped mid-flight.
#[derive(Debug)]
pub struct InFlightGuard {
    _private: (),
}

impl InFlightGuard {
    /// Increments the in-flight gauge.
    #[must_use]
    pub fn new() -> Self {
        gauge!(IN_FLIGHT).increment(1.0);
        Self { _private: () }
    }
}

impl Default for InFlightGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        gauge!(IN_FLIGHT).decrement(1.0);
    }
}
