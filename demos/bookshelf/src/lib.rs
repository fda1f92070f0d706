//! # Bookshelf
//!
//! A small catalogue application assembled from several route modules.
//! The same [`App`] answers HTTP-style events, browser navigations and
//! command-line invocations.

pub mod routes;
pub mod state;

use state::Library;
use std::sync::Arc;
use switchyard::prelude::*;
use tracing::info;

/// Assembles the application from loaded configuration.
///
/// # Errors
///
/// Returns [`AssemblyError`] if any route, layout or mapping is invalid.
pub fn build_app(config: &SwitchyardConfig) -> Result<App, AssemblyError> {
    let library = Arc::new(Library::new());

    let mut builder = AppBuilder::from_config(config)?
        .configure_services(|services| services.register(Arc::clone(&library)))
        .once_before_ready(|services| async move {
            if let Some(library) = services.resolve::<Library>() {
                library.seed();
                info!(books = library.books(None).len(), "catalogue seeded");
            }
            Ok(())
        })
        .middleware(0, routes::timing())
        .group(routes::books::group())
        .group(routes::books::api_group())
        .group(routes::shelves::group())
        .route(RouteDef::get("/", sync_handler(|ctx| {
            let title: String = ctx
                .services()
                .resolve::<ConfigStore>()
                .and_then(|config| config.get_as("title").ok().flatten())
                .unwrap_or_else(|| "Bookshelf".to_string());
            Ok(Response::html(format!("<h1>{title}</h1>")))
        })).name("home"));

    for layout in routes::layouts::layouts() {
        builder = builder.layout(layout);
    }
    for mapping in routes::errors::mappings() {
        builder = builder.catch(mapping);
    }
    builder.build()
}
