//! # Switchyard Core
//!
//! Core types and traits shared by every Switchyard crate.
//!
//! - [`Event`] / [`EventId`] / [`EventKind`] - Inbound HTTP, CLI and navigation events
//! - [`DispatchContext`] - Per-event state carried through the dispatch
//! - [`DispatchError`] - Failures with a type name and ancestry for error dispatch
//! - [`Response`] - Handler output, wrapped by layouts unless raw
//! - [`Handler`] - Core handler trait
//! - [`di::Container`] - Service resolution by type or name

#![doc(html_root_url = "https://docs.rs/switchyard-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod context;
pub mod di;
mod error;
mod event;
mod handler;
mod response;

pub use context::{BoundParams, BoundValue, DispatchContext, DispatchPhase, MatchedRoute};
pub use error::{
    DispatchError, DispatchResult, ErrorDetail, ErrorEnvelope, ErrorIdentity, RaiseBuilder,
    RaisedError, HANDLER_ERROR,
};
pub use event::{Event, EventId, EventKind};
pub use handler::{handler_fn, sync_handler, BoxFuture, BoxedHandler, FnHandler, Handler, SyncHandler};
pub use response::{Response, APPLICATION_JSON, TEXT_HTML, TEXT_PLAIN};

pub use switchyard_router::Params;
