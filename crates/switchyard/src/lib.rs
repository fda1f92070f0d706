//! # Switchyard
//!
//! **Event routing, middleware and error dispatch for HTTP, CLI and
//! navigation events**
//!
//! Switchyard turns an inbound [`Event`] into exactly one [`Response`]:
//!
//! - 🧭 **Specificity-ordered routing**: literals beat parameters, regex
//!   constraints beat bare parameters, catch-alls come last
//! - 🔗 **Priority-ordered middleware**: global, group and route stages merged
//!   into one deterministic, short-circuitable pipeline per route
//! - 🎯 **Error dispatch by identity**: failures reach the most specific
//!   error mapping by type name, then ancestry, then `default`
//! - 🧱 **Composable layouts**: content nested through `{{outlet}}` chains
//! - 📊 **Observability**: `tracing` spans and logs, `metrics` counters
//!
//! ## Quick Start
//!
//! ```rust
//! use http::{Method, StatusCode};
//! use switchyard::prelude::*;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), AssemblyError> {
//! let app = App::builder()
//!     .layout(Layout::template("app", "<body>{{outlet}}</body>"))
//!     .default_layout("app")
//!     .route(
//!         RouteDef::get(r"/users/:id(\d+)", sync_handler(|ctx| {
//!             Ok(Response::html(format!("user {}", ctx.param("id").unwrap_or_default())))
//!         }))
//!         .name("users.show"),
//!     )
//!     .catch(
//!         ErrorMappingDef::on("NotFoundError", sync_handler(|_| Ok(Response::html("no such user"))))
//!             .status(StatusCode::NOT_FOUND),
//!     )
//!     .build()?;
//!
//! let response = app.dispatch(Event::http(Method::GET, "/users/42")).await;
//! assert_eq!(response.body(), "<body>user 42</body>");
//!
//! let response = app.dispatch(Event::http(Method::GET, "/users/abc")).await;
//! assert_eq!(response.status(), StatusCode::NOT_FOUND);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! Event → before hooks → RouteTable → bindings → Pipeline → Handler
//!                            │            │          │
//!                            └────────────┴──────────┴─► ErrorDispatcher → error handler
//!                                                                 │
//! Response ← after hooks ← x-request-id ← layouts ←───────────────┘
//! ```

#![doc(html_root_url = "https://docs.rs/switchyard/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod app;
pub mod binding;
pub mod catch;
mod coordinator;
mod error;
pub mod group;
pub mod layout;
pub mod lifecycle;

pub use app::{App, AppBuilder};
pub use catch::{ErrorDispatcher, ErrorMappingDef, ErrorResolution, MatchRank, UnhandledErrorKind};
pub use coordinator::{CANCELLED_BODY, FALLBACK_BODY};
pub use error::AssemblyError;
pub use group::{RouteDef, RouteGroup};
pub use layout::{Layout, LayoutRegistry, OUTLET};

// Re-export the member crates
pub use switchyard_config as config;
pub use switchyard_core as core;
pub use switchyard_middleware as middleware;
pub use switchyard_router as router;
pub use switchyard_telemetry as telemetry;

pub use switchyard_core::{DispatchContext, DispatchError, Event, Response};

/// Prelude module for convenient imports.
///
/// ```rust
/// use switchyard::prelude::*;
/// ```
pub mod prelude {
    pub use crate::binding::{BindResult, ParamBinding};
    pub use crate::lifecycle::{LifecycleError, LifecycleResult};
    pub use crate::{
        App, AppBuilder, AssemblyError, ErrorMappingDef, Layout, RouteDef, RouteGroup,
    };

    pub use switchyard_core::di::Container;
    pub use switchyard_core::{
        handler_fn, sync_handler, BoundValue, BoxFuture, DispatchContext, DispatchError,
        DispatchResult, ErrorIdentity, Event, EventId, EventKind, Handler, Response,
    };

    pub use switchyard_config::{ConfigLoader, ConfigStore, RuntimeMode, SwitchyardConfig};
    pub use switchyard_middleware::{from_fn, Middleware, MiddlewareEntry, Next};
    pub use switchyard_router::{MethodSet, Params};
}
