//! The ordered route table.
//!
//! Routes are kept sorted by [`Specificity`](crate::pattern::Specificity),
//! most specific first, with declaration order breaking ties. Resolution walks
//! the candidates in that order and returns the first one whose pattern
//! matches and whose method set accepts the event's method.

use http::Method;

use crate::error::RouteError;
use crate::methods::MethodSet;
use crate::params::Params;
use crate::pattern::CompiledPattern;

/// A registered route carrying an endpoint payload `E`.
#[derive(Debug, Clone)]
pub struct Route<E> {
    methods: MethodSet,
    pattern: CompiledPattern,
    name: Option<String>,
    endpoint: E,
    seq: usize,
}

impl<E> Route<E> {
    /// Creates an unnamed route.
    pub fn new(methods: impl Into<MethodSet>, pattern: CompiledPattern, endpoint: E) -> Self {
        Self {
            methods: methods.into(),
            pattern,
            name: None,
            endpoint,
            seq: 0,
        }
    }

    /// Sets the route name.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Methods this route answers to.
    pub fn methods(&self) -> &MethodSet {
        &self.methods
    }

    /// The compiled pattern.
    pub fn pattern(&self) -> &CompiledPattern {
        &self.pattern
    }

    /// The route name, if one was given.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// The endpoint payload.
    pub fn endpoint(&self) -> &E {
        &self.endpoint
    }

    /// Position in declaration order.
    pub fn declaration_index(&self) -> usize {
        self.seq
    }

    /// A short label for logs: the name if present, else the pattern.
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or_else(|| self.pattern.source())
    }
}

/// A successful lookup.
#[derive(Debug)]
pub struct RouteMatch<'a, E> {
    /// The matched route.
    pub route: &'a Route<E>,
    /// Raw parameters captured from the path.
    pub params: Params,
}

/// Outcome of [`RouteTable::resolve`].
#[derive(Debug)]
pub enum Resolution<'a, E> {
    /// A route accepted both the path and the method.
    Matched(RouteMatch<'a, E>),
    /// At least one route matched the path, but none accepts the method.
    MethodNotAllowed {
        /// Methods accepted by the routes that matched the path.
        allowed: Vec<Method>,
    },
    /// No route matched the path.
    NotFound,
}

impl<'a, E> Resolution<'a, E> {
    /// Returns the match, discarding the failure detail.
    pub fn matched(self) -> Option<RouteMatch<'a, E>> {
        match self {
            Self::Matched(m) => Some(m),
            _ => None,
        }
    }
}

/// Routes indexed by specificity and declaration order.
///
/// # Example
///
/// ```rust
/// use switchyard_router::{CompiledPattern, MethodSet, Resolution, Route, RouteTable};
/// use http::Method;
///
/// let mut table = RouteTable::new();
/// table
///     .register(Route::new(MethodSet::get(), CompiledPattern::compile("/users/:id").unwrap(), "show"))
///     .unwrap();
/// table
///     .register(Route::new(MethodSet::get(), CompiledPattern::compile("/users/me").unwrap(), "me"))
///     .unwrap();
///
/// let m = table.resolve(&Method::GET, "/users/me").matched().unwrap();
/// assert_eq!(*m.route.endpoint(), "me");
///
/// assert!(matches!(
///     table.resolve(&Method::POST, "/users/9"),
///     Resolution::MethodNotAllowed { .. }
/// ));
/// ```
#[derive(Debug, Clone)]
pub struct RouteTable<E> {
    routes: Vec<Route<E>>,
    next_seq: usize,
}

impl<E> Default for RouteTable<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> RouteTable<E> {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self {
            routes: Vec::new(),
            next_seq: 0,
        }
    }

    /// Registers a route.
    ///
    /// Fails with [`RouteError::Duplicate`] when an existing route shares a
    /// method, the canonical pattern and the name.
    pub fn register(&mut self, mut route: Route<E>) -> Result<&Route<E>, RouteError> {
        for existing in &self.routes {
            if existing.pattern.canonical() != route.pattern.canonical()
                || existing.name != route.name
            {
                continue;
            }
            if let Some(method) = existing.methods.shared_with(&route.methods) {
                return Err(RouteError::Duplicate {
                    method,
                    pattern: route.pattern.canonical().to_string(),
                    name: route.name.clone(),
                });
            }
        }

        route.seq = self.next_seq;
        self.next_seq += 1;

        let key = route.pattern.specificity();
        let pos = self
            .routes
            .partition_point(|r| r.pattern.specificity() >= key);
        self.routes.insert(pos, route);
        Ok(&self.routes[pos])
    }

    /// Resolves a method and path to a route.
    pub fn resolve(&self, method: &Method, path: &str) -> Resolution<'_, E> {
        let mut allowed: Vec<Method> = Vec::new();

        for route in &self.routes {
            let Some(params) = route.pattern.match_path(path) else {
                continue;
            };
            if route.methods.contains(method) {
                return Resolution::Matched(RouteMatch { route, params });
            }
            for m in route.methods.iter() {
                if !allowed.contains(m) {
                    allowed.push(m.clone());
                }
            }
        }

        if allowed.is_empty() {
            Resolution::NotFound
        } else {
            Resolution::MethodNotAllowed { allowed }
        }
    }

    /// Finds a route by name.
    pub fn by_name(&self, name: &str) -> Option<&Route<E>> {
        self.routes.iter().find(|r| r.name() == Some(name))
    }

    /// Renders the path of the named route from parameter values.
    pub fn url_for(&self, name: &str, params: &Params) -> Result<String, RouteError> {
        let route = self
            .by_name(name)
            .ok_or_else(|| RouteError::UnknownName(name.to_string()))?;
        Ok(route.pattern.build(params)?)
    }

    /// Iterates over routes in candidate order.
    pub fn iter(&self) -> impl Iterator<Item = &Route<E>> {
        self.routes.iter()
    }

    /// Number of registered routes.
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Returns true if no routes are registered.
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn route(methods: MethodSet, pattern: &str, endpoint: &'static str) -> Route<&'static str> {
        Route::new(methods, CompiledPattern::compile(pattern).unwrap(), endpoint)
    }

    fn resolved<'a>(table: &'a RouteTable<&'static str>, method: &Method, path: &str) -> Option<&'a str> {
        table
            .resolve(method, path)
            .matched()
            .map(|m| *m.route.endpoint())
    }

    #[test]
    fn test_empty_table() {
        let table: RouteTable<()> = RouteTable::new();
        assert!(table.is_empty());
        assert!(matches!(
            table.resolve(&Method::GET, "/"),
            Resolution::NotFound
        ));
    }

    #[test]
    fn test_literal_beats_parameter_regardless_of_order() {
        let mut table = RouteTable::new();
        table.register(route(MethodSet::get(), "/users/:id", "show")).unwrap();
        table.register(route(MethodSet::get(), "/users/me", "me")).unwrap();

        assert_eq!(resolved(&table, &Method::GET, "/users/me"), Some("me"));
        assert_eq!(resolved(&table, &Method::GET, "/users/12"), Some("show"));
    }

    #[test]
    fn test_longer_literal_prefix_wins() {
        let mut table = RouteTable::new();
        table.register(route(MethodSet::get(), "/:section/:page", "generic")).unwrap();
        table.register(route(MethodSet::get(), "/docs/:page", "docs")).unwrap();
        table.register(route(MethodSet::get(), "/docs/api/:page?", "api")).unwrap();

        assert_eq!(resolved(&table, &Method::GET, "/docs/api"), Some("api"));
        assert_eq!(resolved(&table, &Method::GET, "/docs/intro"), Some("docs"));
        assert_eq!(resolved(&table, &Method::GET, "/blog/intro"), Some("generic"));
    }

    #[test]
    fn test_constrained_before_unconstrained() {
        let mut table = RouteTable::new();
        table.register(route(MethodSet::get(), "/items/:slug", "by_slug")).unwrap();
        table.register(route(MethodSet::get(), r"/items/:id(\d+)", "by_id")).unwrap();

        assert_eq!(resolved(&table, &Method::GET, "/items/42"), Some("by_id"));
        assert_eq!(resolved(&table, &Method::GET, "/items/blue-mug"), Some("by_slug"));
    }

    #[test]
    fn test_declaration_order_breaks_ties() {
        let mut table = RouteTable::new();
        table.register(route(MethodSet::get(), "/p/:a", "first")).unwrap();
        table.register(route(MethodSet::get(), "/p/:b", "second")).unwrap();

        assert_eq!(resolved(&table, &Method::GET, "/p/x"), Some("first"));
        let order: Vec<_> = table.iter().map(Route::declaration_index).collect();
        assert_eq!(order, vec![0, 1]);
    }

    #[test]
    fn test_method_selects_among_same_path() {
        let mut table = RouteTable::new();
        table.register(route(MethodSet::get(), "/users", "list")).unwrap();
        table.register(route(MethodSet::post(), "/users", "create")).unwrap();

        assert_eq!(resolved(&table, &Method::GET, "/users"), Some("list"));
        assert_eq!(resolved(&table, &Method::POST, "/users"), Some("create"));
    }

    #[test]
    fn test_method_not_allowed_reports_allowed_methods() {
        let mut table = RouteTable::new();
        table.register(route(MethodSet::get(), "/users", "list")).unwrap();
        table.register(route(MethodSet::post(), "/users", "create")).unwrap();

        match table.resolve(&Method::DELETE, "/users") {
            Resolution::MethodNotAllowed { allowed } => {
                assert_eq!(allowed, vec![Method::GET, Method::POST]);
            }
            other => panic!("expected MethodNotAllowed, got {other:?}"),
        }
    }

    #[test]
    fn test_method_not_allowed_falls_through_to_later_candidate() {
        let mut table = RouteTable::new();
        table.register(route(MethodSet::post(), "/users/me", "update_me")).unwrap();
        table.register(route(MethodSet::get(), "/users/:id", "show")).unwrap();

        assert_eq!(resolved(&table, &Method::GET, "/users/me"), Some("show"));
    }

    #[test]
    fn test_duplicate_rejected() {
        let mut table = RouteTable::new();
        table.register(route(MethodSet::get(), "/users/:id", "a")).unwrap();

        let err = table
            .register(route(MethodSet::get().with(Method::HEAD), "/users/{id}", "b"))
            .unwrap_err();
        assert!(matches!(err, RouteError::Duplicate { method, .. } if method == Method::GET));
    }

    #[test]
    fn test_same_pattern_different_method_allowed() {
        let mut table = RouteTable::new();
        table.register(route(MethodSet::get(), "/users/:id", "a")).unwrap();
        table.register(route(MethodSet::put(), "/users/:id", "b")).unwrap();
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_same_pattern_different_name_allowed() {
        let mut table = RouteTable::new();
        table
            .register(route(MethodSet::get(), "/users/:id", "a").named("users.show"))
            .unwrap();
        table
            .register(route(MethodSet::get(), "/users/:id", "b").named("users.card"))
            .unwrap();
        assert_eq!(table.len(), 2);

        assert!(table
            .register(route(MethodSet::get(), "/users/:id", "c").named("users.show"))
            .is_err());
    }

    #[test]
    fn test_url_for() {
        let mut table = RouteTable::new();
        table
            .register(route(MethodSet::get(), r"/users/:id(\d+)", "show").named("users.show"))
            .unwrap();

        let params: Params = [("id", "5")].into_iter().collect();
        assert_eq!(table.url_for("users.show", &params).unwrap(), "/users/5");
        assert!(matches!(
            table.url_for("nope", &params),
            Err(RouteError::UnknownName(_))
        ));
    }

    #[test]
    fn test_label_prefers_name() {
        let r = route(MethodSet::get(), "/a", "x");
        assert_eq!(r.label(), "/a");
        assert_eq!(r.named("home").label(), "home");
    }
}
