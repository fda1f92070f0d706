//! Path matching and route tables for Switchyard.
//!
//! This crate is the leaf of the dispatch engine. It knows nothing about
//! handlers or middleware; routes carry an opaque endpoint payload `E`.
//!
//! - [`CompiledPattern`] compiles a pattern with literals, named parameters,
//!   regex constraints, optional trailing parameters with defaults and
//!   catch-alls, and matches request paths against it.
//! - [`RouteTable`] orders routes by specificity and resolves a method and
//!   path to the first matching route, distinguishing "not found" from
//!   "method not allowed".
//!
//! # Example
//!
//! ```rust
//! use switchyard_router::{CompiledPattern, MethodSet, Resolution, Route, RouteTable};
//! use http::Method;
//!
//! let mut table = RouteTable::new();
//! let pattern = CompiledPattern::compile(r"/users/:id(\d+)").unwrap();
//! table.register(Route::new(MethodSet::get(), pattern, "users.show")).unwrap();
//!
//! match table.resolve(&Method::GET, "/users/42") {
//!     Resolution::Matched(m) => assert_eq!(m.params.get("id"), Some("42")),
//!     _ => unreachable!(),
//! }
//!
//! assert!(matches!(table.resolve(&Method::GET, "/users/abc"), Resolution::NotFound));
//! ```
//!
//! # Candidate order
//!
//! ```text
//!   /users/me            literals=2                 ─┐
//!   /users/:id(\d+)      literals=1 constrained=1    │ tried top to bottom,
//!   /users/:id           literals=1                  │ first match whose method
//!   /users/*rest         literals=1 catch-all       ─┘ set accepts the event wins
//! ```

#![doc(html_root_url = "https://docs.rs/switchyard-router/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod error;
mod methods;
mod params;
pub mod pattern;
mod table;

pub use error::{PatternError, RouteError};
pub use methods::{allow_header, MethodSet};
pub use params::Params;
pub use pattern::{CompiledPattern, Specificity};
pub use table::{Resolution, Route, RouteMatch, RouteTable};

/// Joins a group prefix and a child pattern with exactly one `/` between them.
///
/// ```rust
/// use switchyard_router::join_paths;
///
/// assert_eq!(join_paths("/admin/", "/users"), "/admin/users");
/// assert_eq!(join_paths("/admin", ""), "/admin");
/// assert_eq!(join_paths("", "users"), "/users");
/// ```
#[must_use]
pub fn join_paths(prefix: &str, path: &str) -> String {
    let prefix = prefix.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    match (prefix.is_empty(), path.is_empty()) {
        (true, true) => "/".to_string(),
        (true, false) => format!("/{path}"),
        (false, true) => {
            if prefix.starts_with('/') {
                prefix.to_string()
            } else {
                format!("/{prefix}")
            }
        }
        (false, false) => {
            let lead = if prefix.starts_with('/') { "" } else { "/" };
            format!("{lead}{prefix}/{path}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Method;

    fn table(patterns: &[(&'static str, MethodSet)]) -> RouteTable<&'static str> {
        let mut table = RouteTable::new();
        for (pattern, methods) in patterns {
            table
                .register(Route::new(
                    methods.clone(),
                    CompiledPattern::compile(pattern).unwrap(),
                    *pattern,
                ))
                .unwrap();
        }
        table
    }

    #[test]
    fn test_constraint_failure_is_not_found_even_with_unconstrained_sibling_elsewhere() {
        let t = table(&[(r"/users/:id(\d+)", MethodSet::get())]);
        assert!(matches!(
            t.resolve(&Method::GET, "/users/abc"),
            Resolution::NotFound
        ));

        let m = t.resolve(&Method::GET, "/users/42").matched().unwrap();
        assert_eq!(m.params.get("id"), Some("42"));
        assert_eq!(m.params.len(), 1);
    }

    #[test]
    fn test_constraint_violation_falls_to_unconstrained_alternative() {
        let t = table(&[
            (r"/users/:id(\d+)", MethodSet::get()),
            ("/users/:name", MethodSet::get()),
        ]);

        let m = t.resolve(&Method::GET, "/users/abc").matched().unwrap();
        assert_eq!(*m.route.endpoint(), "/users/:name");

        let m = t.resolve(&Method::GET, "/users/7").matched().unwrap();
        assert_eq!(*m.route.endpoint(), r"/users/:id(\d+)");
    }

    #[test]
    fn test_any_method_route() {
        let t = table(&[("/webhooks/*rest", MethodSet::any())]);
        for method in [Method::GET, Method::POST, Method::PATCH] {
            assert!(t.resolve(&method, "/webhooks/github/push").matched().is_some());
        }
    }

    #[test]
    fn test_nested_parameters() {
        let t = table(&[("/orgs/{org}/repos/{repo}/issues/:number(\\d+)", MethodSet::get())]);
        let m = t
            .resolve(&Method::GET, "/orgs/acme/repos/anvil/issues/17")
            .matched()
            .unwrap();
        assert_eq!(m.params.get("org"), Some("acme"));
        assert_eq!(m.params.get("repo"), Some("anvil"));
        assert_eq!(m.params.get("number"), Some("17"));
    }

    #[test]
    fn test_join_paths() {
        assert_eq!(join_paths("/", "/"), "/");
        assert_eq!(join_paths("api", "v1"), "/api/v1");
        assert_eq!(join_paths("/api/", "/:id"), "/api/:id");
    }
}
