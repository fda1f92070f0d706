//! Route modules, assembled into one application by [`crate::build_app`].

pub mod books;
pub mod errors;
pub mod layouts;
pub mod shelves;

use crate::state::Library;
use std::sync::Arc;
use switchyard::prelude::*;

/// The shared catalogue.
pub(crate) fn library(ctx: &DispatchContext) -> DispatchResult<Arc<Library>> {
    ctx.services()
        .resolve::<Library>()
        .ok_or_else(|| DispatchError::raise("LibraryMissingError").build())
}

/// Adds a response time header to every response.
pub(crate) fn timing() -> impl Middleware {
    from_fn("timing", |ctx, next| {
        Box::pin(async move {
            let mut response = next.run(ctx).await?;
            let micros = ctx.elapsed().as_micros().to_string();
            if let Ok(value) = http::HeaderValue::from_str(&micros) {
                response
                    .headers_mut()
                    .insert(http::header::HeaderName::from_static("x-response-time-us"), value);
            }
            Ok(response)
        })
    })
}
