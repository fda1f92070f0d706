//! Domain errors and the pages shown for them.

use http::StatusCode;
use switchyard::prelude::*;
use thiserror::Error;

/// Raised when a book id does not exist.
#[derive(Debug, Error)]
#[error("book {0} is not in the catalogue")]
pub struct BookNotFound(pub u64);

impl ErrorIdentity for BookNotFound {
    fn type_name(&self) -> &'static str {
        "BookNotFoundError"
    }

    fn ancestry(&self) -> &'static [&'static str] {
        &["NotFoundError"]
    }

    fn status(&self) -> Option<StatusCode> {
        Some(StatusCode::NOT_FOUND)
    }
}

/// Raised when a submitted book is unusable.
#[derive(Debug, Error)]
#[error("invalid book: {0}")]
pub struct InvalidBook(pub String);

impl ErrorIdentity for InvalidBook {
    fn type_name(&self) -> &'static str {
        "InvalidBookError"
    }

    fn ancestry(&self) -> &'static [&'static str] {
        &["ValidationError"]
    }

    fn status(&self) -> Option<StatusCode> {
        Some(StatusCode::UNPROCESSABLE_ENTITY)
    }
}

/// Raised by the API key stage.
#[derive(Debug, Error)]
#[error("a valid x-api-key header is required")]
pub struct Unauthorized;

impl ErrorIdentity for Unauthorized {
    fn type_name(&self) -> &'static str {
        "UnauthorizedError"
    }

    fn status(&self) -> Option<StatusCode> {
        Some(StatusCode::UNAUTHORIZED)
    }
}

fn message(ctx: &DispatchContext) -> String {
    ctx.error()
        .map_or_else(|| "unknown error".to_string(), DispatchError::public_message)
}

/// Error mappings, most specific first for readability; selection does not
/// depend on this order.
pub fn mappings() -> Vec<ErrorMappingDef> {
    vec![
        ErrorMappingDef::on(
            "NotFoundError",
            sync_handler(|ctx| {
                Ok(Response::html(format!(
                    "<h1>Not found</h1><p>{}</p>",
                    message(ctx)
                )))
            }),
        )
        .status(StatusCode::NOT_FOUND),
        ErrorMappingDef::on(
            "ValidationError",
            sync_handler(|ctx| {
                let envelope = ctx
                    .error()
                    .map(|e| e.to_envelope(Some(&ctx.event_id().to_string())));
                Response::json(&envelope).map_err(|e| DispatchError::internal("encode envelope", e))
            }),
        ),
        ErrorMappingDef::on_any(
            ["UnauthorizedError", "MethodNotAllowedError"],
            sync_handler(|ctx| Ok(Response::text(message(ctx)).raw())),
        ),
        ErrorMappingDef::on_default(sync_handler(|_| {
            Ok(Response::html("<h1>Something went wrong</h1>"))
        }))
        .layout("site"),
    ]
}
