//! Shelf routes, also reachable from the command line:
//!
//! ```text
//! bookshelf shelves
//! bookshelf shelves sci-fi
//! ```

use super::library;
use switchyard::prelude::*;

fn list() -> impl Handler {
    sync_handler(|ctx| {
        let shelves = library(ctx)?.shelves();
        let lines: Vec<String> = shelves
            .iter()
            .map(|(name, count)| format!("{name} ({count})"))
            .collect();
        Ok(Response::text(lines.join("\n")))
    })
}

fn show() -> impl Handler {
    sync_handler(|ctx| {
        let shelf = ctx.param("shelf").unwrap_or_default().to_string();
        let books = library(ctx)?.books(Some(&shelf));
        if books.is_empty() {
            return Err(DispatchError::raise("ShelfNotFoundError")
                .extends("NotFoundError")
                .message(format!("no shelf named {shelf}"))
                .build());
        }
        let lines: Vec<String> = books
            .iter()
            .map(|b| format!("#{} {} - {}", b.id, b.title, b.author))
            .collect();
        Ok(Response::text(lines.join("\n")))
    })
}

pub fn group() -> RouteGroup {
    RouteGroup::new("/shelves")
        .name_prefix("shelves.")
        .layout("plain")
        .route(RouteDef::get("/", list()).name("index"))
        .route(RouteDef::get("/:shelf([a-z-]+)", show()).name("show"))
}
