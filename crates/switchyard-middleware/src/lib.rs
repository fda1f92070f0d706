//! # Switchyard Middleware
//!
//! Priority-ordered middleware pipelines for Switchyard routes.
//!
//! Each route gets its own [`Pipeline`], built once at assembly time from
//! the application's global entries and the route's own entries. Stages run
//! in ascending priority; equal priorities keep declaration order, and a
//! stage whose name already appeared earlier is dropped.
//!
//! ```text
//! Event → [p=-10 request_id] → [p=0 tracing] → [p=50 auth] → Handler
//!                                                              │
//! Response ← request_id ← tracing ← auth ←──────────────────────┘
//! ```
//!
//! Any stage may short-circuit with its own response or fail with a
//! `DispatchError`; a failure skips every later stage and the handler and
//! reaches the error dispatcher with its identity intact.
//!
//! ## Example
//!
//! ```
//! use switchyard_middleware::{MiddlewareEntry, Pipeline};
//! use switchyard_middleware::stages::{RequestIdMiddleware, TracingMiddleware};
//!
//! let global = [
//!     MiddlewareEntry::new(-10, RequestIdMiddleware::new()),
//!     MiddlewareEntry::new(0, TracingMiddleware::new("bookshelf")),
//! ];
//! let pipeline = Pipeline::build(&global, &[]);
//! assert_eq!(pipeline.stage_names(), vec!["request_id", "tracing"]);
//! ```

#![doc(html_root_url = "https://docs.rs/switchyard-middleware/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod middleware;
pub mod pipeline;
pub mod stages;

pub use middleware::{from_fn, BoxedMiddleware, FnMiddleware, Middleware, Next};
pub use pipeline::{MiddlewareEntry, Pipeline, DEFAULT_PRIORITY};
pub use switchyard_core::BoxFuture;
