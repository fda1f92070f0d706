//! # Switchyard Test
//!
//! In-memory testing for Switchyard applications. Events are dispatched
//! straight into an [`App`](switchyard::App); there is no transport and no
//! port binding.
//!
//! ## Key Features
//!
//! - **Full dispatch**: hooks, routing, bindings, middleware, error mappings
//!   and layouts all run as they do in production
//! - **Every origin**: HTTP requests, browser navigations and CLI invocations
//! - **Fluent assertions**: status, headers, body text and JSON fields
//! - **Cancellation**: dispatch under a token the test controls
//!
//! ## Example
//!
//! ```
//! use http::StatusCode;
//! use serde_json::json;
//! use switchyard::prelude::*;
//! use switchyard_test::TestClient;
//!
//! # tokio_test::block_on(async {
//! let app = App::builder()
//!     .default_error_pages()
//!     .route(RouteDef::post("/shelves", sync_handler(|ctx| {
//!         let shelf: serde_json::Value = ctx
//!             .event()
//!             .json()
//!             .map_err(|e| DispatchError::internal("bad shelf", e))?;
//!         Ok(Response::json(&shelf)
//!             .map_err(|e| DispatchError::internal("encode", e))?
//!             .with_status(StatusCode::CREATED))
//!     })));
//! let client = TestClient::build(app).unwrap();
//!
//! client
//!     .post("/shelves")
//!     .json(&json!({"name": "sci-fi"}))
//!     .send()
//!     .await
//!     .assert_status(StatusCode::CREATED)
//!     .assert_json_field("name", &json!("sci-fi"));
//!
//! client
//!     .get("/nowhere")
//!     .send()
//!     .await
//!     .assert_status(StatusCode::NOT_FOUND)
//!     .assert_json_field("error.code", &json!("RouteNotFoundError"));
//! # });
//! ```

#![forbid(unsafe_code)]

mod client;
mod error;
mod request;
mod response;

pub use client::{TestClient, TestClientRequest};
pub use error::TestError;
pub use request::{Origin, TestRequest, TestRequestBuilder};
pub use response::TestResponse;
