//! Built-in middleware stages.
//!
//! | Stage                 | Name         | Purpose                                   |
//! |-----------------------|--------------|-------------------------------------------|
//! | [`RequestIdMiddleware`] | `request_id` | Propagate and echo `x-request-id`       |
//! | [`TracingMiddleware`]   | `tracing`    | Span around the chain, outcome logging  |
//!
//! Both are ordinary [`Middleware`](crate::Middleware) values: register them
//! with whatever priority the application needs.

pub mod request_id;
pub mod tracing;

pub use request_id::{incoming_request_id, stamp_request_id, RequestIdMiddleware, REQUEST_ID_HEADER};
pub use tracing::{TraceInfo, TracingMiddleware};
