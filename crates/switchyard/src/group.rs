//! Route and group declarations.
//!
//! A [`RouteDef`] describes one route before assembly. A [`RouteGroup`]
//! nests routes and other groups under a shared path prefix, name prefix,
//! middleware list and layout:
//!
//! ```text
//! group "/admin"  name "admin."  middleware [auth]  layout "admin"
//! ├── GET  /        -> admin.home        [auth]
//! └── group "/users" name "users."  middleware [audit]
//!     └── GET /:id  -> admin.users.show   [auth, audit]
//! ```
//!
//! Flattening keeps declaration order. Parent middleware is listed ahead
//! of child middleware, so at equal priority the parent's stage runs first.

use crate::binding::ParamBinding;
use indexmap::IndexMap;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use switchyard_core::{BoxedHandler, Handler};
use switchyard_middleware::{Middleware, MiddlewareEntry};
use switchyard_router::{join_paths, MethodSet};

/// Declaration of one route.
///
/// ```
/// use switchyard::binding::ParamBinding;
/// use switchyard::RouteDef;
/// use switchyard_core::{sync_handler, Response};
///
/// let show = RouteDef::get("/books/:id", sync_handler(|ctx| {
///     let id = ctx.params().int("id").unwrap_or_default();
///     Ok(Response::html(format!("<h1>Book {id}</h1>")))
/// }))
/// .name("books.show")
/// .rule("id", r"\d+")
/// .bind("id", ParamBinding::Integer)
/// .layout("app");
/// assert_eq!(show.pattern(), "/books/:id");
/// ```
#[must_use]
pub struct RouteDef {
    pub(crate) methods: MethodSet,
    pub(crate) pattern: String,
    pub(crate) handler: BoxedHandler,
    pub(crate) name: Option<String>,
    pub(crate) rules: HashMap<String, String>,
    pub(crate) bindings: IndexMap<String, ParamBinding>,
    pub(crate) middleware: Vec<MiddlewareEntry>,
    pub(crate) layout: Option<String>,
}

impl RouteDef {
    /// A route for `methods` at `pattern`.
    pub fn new(methods: impl Into<MethodSet>, pattern: impl Into<String>, handler: impl Handler) -> Self {
        Self {
            methods: methods.into(),
            pattern: pattern.into(),
            handler: Arc::new(handler),
            name: None,
            rules: HashMap::new(),
            bindings: IndexMap::new(),
            middleware: Vec::new(),
            layout: None,
        }
    }

    /// A `GET` route.
    pub fn get(pattern: impl Into<String>, handler: impl Handler) -> Self {
        Self::new(MethodSet::get(), pattern, handler)
    }

    /// A `POST` route.
    pub fn post(pattern: impl Into<String>, handler: impl Handler) -> Self {
        Self::new(MethodSet::post(), pattern, handler)
    }

    /// A `PUT` route.
    pub fn put(pattern: impl Into<String>, handler: impl Handler) -> Self {
        Self::new(MethodSet::put(), pattern, handler)
    }

    /// A `PATCH` route.
    pub fn patch(pattern: impl Into<String>, handler: impl Handler) -> Self {
        Self::new(MethodSet::patch(), pattern, handler)
    }

    /// A `DELETE` route.
    pub fn delete(pattern: impl Into<String>, handler: impl Handler) -> Self {
        Self::new(MethodSet::delete(), pattern, handler)
    }

    /// A route accepting every method.
    pub fn any(pattern: impl Into<String>, handler: impl Handler) -> Self {
        Self::new(MethodSet::any(), pattern, handler)
    }

    /// Names the route for reverse routing.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Constrains `param` with a regex, overriding any inline constraint.
    pub fn rule(mut self, param: impl Into<String>, regex: impl Into<String>) -> Self {
        self.rules.insert(param.into(), regex.into());
        self
    }

    /// Binds `param` before the handler runs.
    pub fn bind(mut self, param: impl Into<String>, binding: ParamBinding) -> Self {
        self.bindings.insert(param.into(), binding);
        self
    }

    /// Adds a route middleware stage.
    pub fn middleware<M: Middleware>(self, priority: i32, pipe: M) -> Self {
        self.middleware_entry(MiddlewareEntry::new(priority, pipe))
    }

    /// Adds a prepared middleware entry, e.g. one shared between routes.
    pub fn middleware_entry(mut self, entry: MiddlewareEntry) -> Self {
        self.middleware.push(entry);
        self
    }

    /// Renders the route's content inside `layout`.
    pub fn layout(mut self, layout: impl Into<String>) -> Self {
        self.layout = Some(layout.into());
        self
    }

    /// Pattern as declared (before any group prefix).
    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Route name, if set.
    #[must_use]
    pub fn route_name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

impl fmt::Debug for RouteDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteDef")
            .field("methods", &self.methods)
            .field("pattern", &self.pattern)
            .field("name", &self.name)
            .field("rules", &self.rules)
            .field("bindings", &self.bindings)
            .field("middleware", &self.middleware.len())
            .field("layout", &self.layout)
            .finish_non_exhaustive()
    }
}

enum GroupItem {
    Route(RouteDef),
    Group(RouteGroup),
}

/// Routes sharing a prefix, middleware and layout.
#[must_use]
pub struct RouteGroup {
    prefix: String,
    name_prefix: String,
    middleware: Vec<MiddlewareEntry>,
    layout: Option<String>,
    items: Vec<GroupItem>,
}

impl RouteGroup {
    /// A group under `prefix`.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            name_prefix: String::new(),
            middleware: Vec::new(),
            layout: None,
            items: Vec::new(),
        }
    }

    /// Prepends `prefix` to the names of named routes in the group.
    pub fn name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.name_prefix = prefix.into();
        self
    }

    /// Adds a middleware stage to every route in the group.
    pub fn middleware<M: Middleware>(mut self, priority: i32, pipe: M) -> Self {
        self.middleware.push(MiddlewareEntry::new(priority, pipe));
        self
    }

    /// Layout for routes that do not name their own.
    pub fn layout(mut self, layout: impl Into<String>) -> Self {
        self.layout = Some(layout.into());
        self
    }

    /// Adds a route.
    pub fn route(mut self, route: RouteDef) -> Self {
        self.items.push(GroupItem::Route(route));
        self
    }

    /// Nests a group.
    pub fn group(mut self, group: RouteGroup) -> Self {
        self.items.push(GroupItem::Group(group));
        self
    }

    /// Turns the group into plain route declarations.
    pub(crate) fn flatten(self) -> Vec<RouteDef> {
        let mut out = Vec::new();
        self.flatten_into(&Scope::default(), &mut out);
        out
    }

    fn flatten_into(self, parent: &Scope, out: &mut Vec<RouteDef>) {
        let mut middleware = parent.middleware.clone();
        middleware.extend(self.middleware);
        let scope = Scope {
            prefix: join_paths(&parent.prefix, &self.prefix),
            name_prefix: format!("{}{}", parent.name_prefix, self.name_prefix),
            middleware,
            layout: self.layout.or_else(|| parent.layout.clone()),
        };

        for item in self.items {
            match item {
                GroupItem::Route(route) => out.push(scope.apply(route)),
                GroupItem::Group(group) => group.flatten_into(&scope, out),
            }
        }
    }
}

impl fmt::Debug for RouteGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteGroup")
            .field("prefix", &self.prefix)
            .field("name_prefix", &self.name_prefix)
            .field("middleware", &self.middleware.len())
            .field("layout", &self.layout)
            .field("items", &self.items.len())
            .finish()
    }
}

#[derive(Default)]
struct Scope {
    prefix: String,
    name_prefix: String,
    middleware: Vec<MiddlewareEntry>,
    layout: Option<String>,
}

impl Scope {
    fn apply(&self, mut route: RouteDef) -> RouteDef {
        route.pattern = join_paths(&self.prefix, &route.pattern);
        route.name = route.name.map(|name| format!("{}{name}", self.name_prefix));
        let mut middleware = self.middleware.clone();
        middleware.append(&mut route.middleware);
        route.middleware = middleware;
        if route.layout.is_none() {
            route.layout.clone_from(&self.layout);
        }
        route
    }
}
