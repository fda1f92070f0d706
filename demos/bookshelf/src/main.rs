//! # Bookshelf
//!
//! ```bash
//! # one-shot CLI event
//! cargo run -p bookshelf -- shelves sci-fi
//!
//! # interactive: one event per line, e.g. `GET /books/1` or `shelves`
//! cargo run -p bookshelf
//! ```
//!
//! Configuration comes from `bookshelf.toml` (optional) with `BOOKSHELF__*`
//! environment overrides.

use anyhow::Context;
use bookshelf::build_app;
use http::Method;
use switchyard::prelude::*;
use switchyard::telemetry::init_telemetry;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ConfigLoader::new()
        .with_optional_file("bookshelf.toml")?
        .with_env_prefix("BOOKSHELF")
        .with_dotenv()
        .load()
        .context("loading configuration")?;
    init_telemetry(&config.telemetry()).context("initializing telemetry")?;

    let app = build_app(&config).context("assembling routes")?;
    app.ready().await.context("running startup hooks")?;
    info!(routes = app.route_count(), mode = app.mode().as_str(), "bookshelf ready");

    let args: Vec<String> = std::env::args().skip(1).collect();
    if !args.is_empty() {
        let response = app.dispatch(Event::cli(&args)).await;
        print!("{}", response.body());
        if !response.status().is_success() {
            std::process::exit(1);
        }
        return Ok(());
    }

    for line in app.describe_routes() {
        println!("  {line}");
    }
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let Some(event) = parse_line(line.trim()) else {
            continue;
        };
        let response = app.dispatch(event).await;
        println!("{} {}", response.status().as_u16(), response.body());
    }
    Ok(())
}

/// `METHOD /path` becomes an HTTP event, `/path` a navigation, anything
/// else a CLI invocation.
fn parse_line(line: &str) -> Option<Event> {
    if line.is_empty() {
        return None;
    }
    if line.starts_with('/') {
        return Some(Event::navigation(line));
    }
    let mut words = line.split_whitespace();
    let first = words.next()?;
    if let Some(target) = words.clone().next().filter(|t| t.starts_with('/')) {
        match first.parse::<Method>() {
            Ok(method) => return Some(Event::http(method, target)),
            Err(_) => warn!(method = first, "unknown method, treating line as CLI"),
        }
    }
    Some(Event::cli(line.split_whitespace()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use switchyard::core::EventKind;

    #[test]
    fn lines_become_events() {
        let event = parse_line("POST /books").unwrap();
        assert_eq!(event.kind(), EventKind::Http);
        assert_eq!(event.method(), &Method::POST);

        assert_eq!(parse_line("/shelves").unwrap().kind(), EventKind::Navigation);

        let cli = parse_line("shelves sci-fi").unwrap();
        assert_eq!(cli.kind(), EventKind::Cli);
        assert_eq!(cli.path(), "/shelves/sci-fi");

        assert!(parse_line("").is_none());
    }
}
