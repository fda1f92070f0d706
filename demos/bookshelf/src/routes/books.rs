//! Catalogue routes.
//!
//! | Method | Path           | Name          |
//! |--------|----------------|---------------|
//! | GET    | /books         | books.index   |
//! | GET    | /books/:id     | books.show    |
//! | POST   | /books         | books.create  |
//! | DELETE | /books/:id     | books.delete  |
//! | GET    | /api/books/:id | api.books.show |

use super::errors::{BookNotFound, InvalidBook, Unauthorized};
use super::library;
use crate::state::{Book, Library, NewBook};
use http::StatusCode;
use switchyard::prelude::*;

/// Looks up `:id` in the catalogue before the handler runs.
fn book_binding() -> ParamBinding {
    ParamBinding::lookup(|raw, services| {
        let id = raw.parse().ok()?;
        services.resolve::<Library>()?.book(id)
    })
}

fn bound_book(ctx: &DispatchContext) -> DispatchResult<std::sync::Arc<Book>> {
    ctx.params()
        .model::<Book>("id")
        .ok_or_else(|| DispatchError::binding("id", ctx.param("id").unwrap_or_default(), "not bound"))
}

/// Rejects requests whose `x-api-key` differs from the configured key.
fn require_api_key() -> impl Middleware {
    from_fn("api_key", |ctx, next| {
        Box::pin(async move {
            let expected: Option<String> = ctx
                .services()
                .resolve::<ConfigStore>()
                .and_then(|config| config.get_as("api_key").ok().flatten());
            let given = ctx
                .event()
                .headers()
                .get("x-api-key")
                .and_then(|v| v.to_str().ok());
            let authorized = matches!((expected.as_deref(), given), (Some(e), Some(g)) if e == g);
            if !authorized {
                return Err(Unauthorized.into());
            }
            next.run(ctx).await
        })
    })
}

fn index() -> impl Handler {
    sync_handler(|ctx| {
        let library = library(ctx)?;
        let shelf = ctx.event().query_param("shelf");
        let items: String = library
            .books(shelf)
            .iter()
            .map(|b| format!("<li><a href=\"/books/{}\">{}</a> by {}</li>", b.id, b.title, b.author))
            .collect();
        Ok(Response::html(format!("<h1>Books</h1><ul>{items}</ul>")))
    })
}

fn show() -> impl Handler {
    sync_handler(|ctx| {
        let book = bound_book(ctx)?;
        Ok(Response::html(format!(
            "<h1>{}</h1><p>{} &middot; shelf {}</p>",
            book.title, book.author, book.shelf
        )))
    })
}

fn show_json() -> impl Handler {
    sync_handler(|ctx| {
        let book = bound_book(ctx)?;
        Response::json(&*book).map_err(|e| DispatchError::internal("encode book", e))
    })
}

fn create() -> impl Handler {
    sync_handler(|ctx| {
        let new: NewBook = ctx
            .event()
            .json()
            .map_err(|e| InvalidBook(e.to_string()))?;
        if new.title.trim().is_empty() {
            return Err(InvalidBook("title must not be empty".to_string()).into());
        }
        let book = library(ctx)?.add(new);
        tracing::info!(book_id = book.id, title = %book.title, "book catalogued");
        Ok(Response::json(&book)
            .map_err(|e| DispatchError::internal("encode book", e))?
            .with_status(StatusCode::CREATED))
    })
}

fn delete() -> impl Handler {
    sync_handler(|ctx| {
        let id = ctx.params().int("id").unwrap_or_default();
        let id = u64::try_from(id).map_err(|_| BookNotFound(0))?;
        library(ctx)?.remove(id).ok_or(BookNotFound(id))?;
        Ok(Response::no_content())
    })
}

pub fn group() -> RouteGroup {
    RouteGroup::new("/books")
        .name_prefix("books.")
        .layout("catalogue")
        .route(RouteDef::get("/", index()).name("index"))
        .route(
            RouteDef::get(r"/:id(\d+)", show())
                .name("show")
                .bind("id", book_binding()),
        )
        .route(
            RouteDef::post("/", create())
                .name("create")
                .middleware(0, require_api_key()),
        )
        .route(
            RouteDef::delete(r"/:id(\d+)", delete())
                .name("delete")
                .bind("id", ParamBinding::Integer)
                .middleware(0, require_api_key()),
        )
}

pub fn api_group() -> RouteGroup {
    RouteGroup::new("/api")
        .name_prefix("api.")
        .route(
            RouteDef::get("/books/:id", show_json())
                .name("books.show")
                .rule("id", r"\d+")
                .bind("id", book_binding()),
        )
}
