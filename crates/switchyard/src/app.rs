//! Application assembly.
//!
//! [`AppBuilder`] collects routes, groups, middleware, error mappings,
//! layouts, services and hooks from any number of modules, validates them
//! in one pass and freezes them into an [`App`]. Nothing about an `App`
//! changes after [`AppBuilder::build`]; it is cheap to clone and safe to
//! share across tasks.
//!
//! # Assembly checks
//!
//! | Check                                      | Error                                   |
//! |--------------------------------------------|-----------------------------------------|
//! | pattern or rule does not compile           | [`AssemblyError::Pattern`]              |
//! | same methods, pattern and name twice       | [`AssemblyError::Route`]                |
//! | binding for a parameter the path lacks     | [`AssemblyError::UnknownBindingParam`]  |
//! | layout name that is not registered         | [`AssemblyError::UnknownLayout`]        |
//! | layout nesting that loops                  | [`AssemblyError::LayoutCycle`]          |
//! | error mapping with no names                | [`AssemblyError::EmptyMapping`]         |

use crate::binding::BindingResolver;
use crate::catch::{default_error_pages, ErrorDispatcher, ErrorMappingDef};
use crate::error::AssemblyError;
use crate::group::{RouteDef, RouteGroup};
use crate::layout::{Layout, LayoutRegistry};
use crate::lifecycle::{Lifecycle, LifecycleResult};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use switchyard_config::{ConfigStore, RuntimeMode, SwitchyardConfig};
use switchyard_core::di::Container;
use switchyard_core::{BoxFuture, BoxedHandler, DispatchContext, DispatchResult, Response};
use switchyard_middleware::stages::{RequestIdMiddleware, TracingMiddleware};
use switchyard_middleware::{Middleware, MiddlewareEntry, Pipeline};
use switchyard_router::{CompiledPattern, Params, Route, RouteError, RouteTable};

/// Priority of the built-in request id stage.
pub const REQUEST_ID_PRIORITY: i32 = -1000;
/// Priority of the built-in tracing stage.
pub const TRACING_PRIORITY: i32 = -900;

/// What a route resolves to once assembled.
pub(crate) struct Endpoint {
    pub(crate) handler: BoxedHandler,
    pub(crate) pipeline: Pipeline,
    pub(crate) bindings: BindingResolver,
    pub(crate) layout: Option<String>,
}

#[derive(Debug, Clone)]
pub(crate) struct Settings {
    pub(crate) service_name: String,
    pub(crate) timeout: Option<Duration>,
    pub(crate) trust_request_id: bool,
    pub(crate) metrics: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            service_name: "switchyard".to_string(),
            timeout: None,
            trust_request_id: false,
            metrics: true,
        }
    }
}

pub(crate) struct AppInner {
    pub(crate) routes: RouteTable<Endpoint>,
    pub(crate) errors: ErrorDispatcher,
    pub(crate) layouts: LayoutRegistry,
    pub(crate) default_layout: Option<String>,
    pub(crate) services: Arc<Container>,
    pub(crate) config: Arc<ConfigStore>,
    pub(crate) lifecycle: Lifecycle,
    pub(crate) settings: Settings,
}

/// An assembled, immutable application.
///
/// Dispatch events with [`App::dispatch`].
#[derive(Clone)]
pub struct App {
    pub(crate) inner: Arc<AppInner>,
}

impl App {
    /// Starts assembling an application.
    #[must_use]
    pub fn builder() -> AppBuilder {
        AppBuilder::new()
    }

    /// Builds the path for the route named `name`.
    ///
    /// # Errors
    ///
    /// Returns [`RouteError::UnknownName`] for an unknown name, or a
    /// pattern error if a required parameter is missing.
    pub fn url_for(&self, name: &str, params: &Params) -> Result<String, RouteError> {
        self.inner.routes.url_for(name, params)
    }

    /// Runs the ready hooks if they have not run yet.
    ///
    /// [`dispatch`](Self::dispatch) calls this itself; call it directly to
    /// fail fast at startup.
    ///
    /// # Errors
    ///
    /// Returns the first ready hook failure.
    pub async fn ready(&self) -> LifecycleResult {
        self.inner.lifecycle.ensure_ready(&self.inner.services).await
    }

    /// Number of routes.
    #[must_use]
    pub fn route_count(&self) -> usize {
        self.inner.routes.len()
    }

    /// `METHODS pattern (name)` for every route, in match order.
    #[must_use]
    pub fn describe_routes(&self) -> Vec<String> {
        self.inner
            .routes
            .iter()
            .map(|route| {
                let methods: Vec<&str> = route.methods().iter().map(http::Method::as_str).collect();
                let methods = if route.methods().is_any() {
                    "*".to_string()
                } else {
                    methods.join("|")
                };
                match route.name() {
                    Some(name) => format!("{methods} {} ({name})", route.pattern().source()),
                    None => format!("{methods} {}", route.pattern().source()),
                }
            })
            .collect()
    }

    /// Middleware stage names for the route named `name`.
    #[must_use]
    pub fn stage_names(&self, name: &str) -> Option<Vec<&'static str>> {
        self.inner
            .routes
            .by_name(name)
            .map(|route| route.endpoint().pipeline.stage_names())
    }

    /// Registered services.
    #[must_use]
    pub fn services(&self) -> &Arc<Container> {
        &self.inner.services
    }

    /// Configuration store shared with handlers.
    #[must_use]
    pub fn config(&self) -> &ConfigStore {
        &self.inner.config
    }

    /// Runtime mode of the configuration store.
    #[must_use]
    pub fn mode(&self) -> RuntimeMode {
        self.inner.config.mode()
    }

    /// Service name used in logs and spans.
    #[must_use]
    pub fn service_name(&self) -> &str {
        &self.inner.settings.service_name
    }
}

impl fmt::Debug for App {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("App")
            .field("service_name", &self.inner.settings.service_name)
            .field("routes", &self.inner.routes.len())
            .field("error_mappings", &self.inner.errors.len())
            .field("layouts", &self.inner.layouts.len())
            .field("default_layout", &self.inner.default_layout)
            .field("services", &self.inner.services.len())
            .field("lifecycle", &self.inner.lifecycle)
            .finish()
    }
}

/// Collects declarations and builds an [`App`].
///
/// # Example
///
/// ```
/// use http::StatusCode;
/// use switchyard::prelude::*;
///
/// let app = App::builder()
///     .service_name("bookshelf")
///     .layout(Layout::template("app", "<main>{{outlet}}</main>"))
///     .default_layout("app")
///     .route(RouteDef::get("/books/:id(\\d+)", sync_handler(|ctx| {
///         Ok(Response::html(format!("book {}", ctx.param("id").unwrap_or_default())))
///     })).name("books.show"))
///     .catch(
///         ErrorMappingDef::on("NotFoundError", sync_handler(|_| Ok(Response::html("missing"))))
///             .status(StatusCode::NOT_FOUND),
///     )
///     .build()
///     .unwrap();
///
/// assert_eq!(app.route_count(), 1);
/// ```
#[must_use]
pub struct AppBuilder {
    routes: Vec<RouteDef>,
    middleware: Vec<MiddlewareEntry>,
    errors: Vec<ErrorMappingDef>,
    layouts: Vec<Layout>,
    default_layout: Option<String>,
    services: Container,
    config: Option<ConfigStore>,
    lifecycle: Lifecycle,
    settings: Settings,
    default_stages: bool,
    default_error_pages: bool,
}

impl Default for AppBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl AppBuilder {
    /// An empty builder with the built-in request id and tracing stages.
    pub fn new() -> Self {
        Self {
            routes: Vec::new(),
            middleware: Vec::new(),
            errors: Vec::new(),
            layouts: Vec::new(),
            default_layout: None,
            services: Container::new(),
            config: None,
            lifecycle: Lifecycle::new(),
            settings: Settings::default(),
            default_stages: true,
            default_error_pages: false,
        }
    }

    /// A builder seeded from loaded configuration.
    ///
    /// Takes the service name, default layout, timeout, request id trust
    /// and metrics switch from `config`, and builds the configuration
    /// store from it.
    ///
    /// # Errors
    ///
    /// Returns [`AssemblyError::Config`] if the store cannot be built.
    pub fn from_config(config: &SwitchyardConfig) -> Result<Self, AssemblyError> {
        let dispatch = &config.dispatch;
        let mut builder = Self::new()
            .service_name(dispatch.service_name.clone())
            .trust_request_id(dispatch.trust_request_id)
            .metrics(config.metrics.enabled)
            .config_store(config.to_store()?);
        if let Some(ms) = dispatch.timeout_ms {
            builder = builder.timeout(Duration::from_millis(ms));
        }
        if let Some(layout) = &dispatch.default_layout {
            builder = builder.default_layout(layout.clone());
        }
        Ok(builder)
    }

    /// Adds a route.
    pub fn route(mut self, route: RouteDef) -> Self {
        self.routes.push(route);
        self
    }

    /// Adds every route of a group.
    pub fn group(mut self, group: RouteGroup) -> Self {
        self.routes.extend(group.flatten());
        self
    }

    /// Adds a global middleware stage, applied to every route.
    pub fn middleware<M: Middleware>(self, priority: i32, pipe: M) -> Self {
        self.middleware_entry(MiddlewareEntry::new(priority, pipe))
    }

    /// Adds a prepared global middleware entry.
    pub fn middleware_entry(mut self, entry: MiddlewareEntry) -> Self {
        self.middleware.push(entry);
        self
    }

    /// Adds an error mapping.
    pub fn catch(mut self, mapping: ErrorMappingDef) -> Self {
        self.errors.push(mapping);
        self
    }

    /// Registers a layout.
    pub fn layout(mut self, layout: Layout) -> Self {
        self.layouts.push(layout);
        self
    }

    /// Layout for routes and error mappings that do not name one.
    pub fn default_layout(mut self, name: impl Into<String>) -> Self {
        self.default_layout = Some(name.into());
        self
    }

    /// Registers a service by type.
    pub fn service<T: Send + Sync + 'static>(mut self, service: T) -> Self {
        self.services.register(Arc::new(service));
        self
    }

    /// Registers a service under a name.
    pub fn named_service<T: Send + Sync + 'static>(mut self, name: impl Into<String>, service: T) -> Self {
        self.services.register_named(name, Arc::new(service));
        self
    }

    /// Gives direct access to the container, e.g. for factories and aliases.
    pub fn configure_services(mut self, configure: impl FnOnce(&mut Container)) -> Self {
        configure(&mut self.services);
        self
    }

    /// Uses `store` as the application's configuration store.
    pub fn config_store(mut self, store: ConfigStore) -> Self {
        self.config = Some(store);
        self
    }

    /// Service name used by the tracing stage and logs.
    pub fn service_name(mut self, name: impl Into<String>) -> Self {
        self.settings.service_name = name.into();
        self
    }

    /// Cancels events that run longer than `timeout`.
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.settings.timeout = Some(timeout);
        self
    }

    /// Adopts a valid incoming `x-request-id` as the event id.
    pub const fn trust_request_id(mut self, trust: bool) -> Self {
        self.settings.trust_request_id = trust;
        self
    }

    /// Switches dispatch metrics on or off.
    pub const fn metrics(mut self, enabled: bool) -> Self {
        self.settings.metrics = enabled;
        self
    }

    /// Leaves out the built-in request id and tracing stages.
    pub const fn without_default_stages(mut self) -> Self {
        self.default_stages = false;
        self
    }

    /// Registers JSON error pages for unmatched paths and methods.
    ///
    /// They are registered ahead of every other mapping, so application
    /// mappings of the same rank take precedence.
    pub const fn default_error_pages(mut self) -> Self {
        self.default_error_pages = true;
        self
    }

    /// Registers a hook that runs once before the first event.
    pub fn once_before_ready<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(Arc<Container>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = LifecycleResult> + Send + 'static,
    {
        self.lifecycle = self.lifecycle.once_before_ready(hook);
        self
    }

    /// Registers a hook that runs at the start of every event.
    pub fn before_each_event<F>(mut self, hook: F) -> Self
    where
        F: for<'a> Fn(&'a mut DispatchContext) -> BoxFuture<'a, DispatchResult<()>>
            + Send
            + Sync
            + 'static,
    {
        self.lifecycle = self.lifecycle.before_each_event(hook);
        self
    }

    /// Registers a hook that runs after every response.
    pub fn after_each_response<F>(mut self, hook: F) -> Self
    where
        F: for<'a> Fn(&'a DispatchContext, &'a mut Response) -> BoxFuture<'a, LifecycleResult>
            + Send
            + Sync
            + 'static,
    {
        self.lifecycle = self.lifecycle.after_each_response(hook);
        self
    }

    /// Validates every declaration and freezes the application.
    ///
    /// # Errors
    ///
    /// Returns the first [`AssemblyError`] found.
    pub fn build(self) -> Result<App, AssemblyError> {
        let layouts = LayoutRegistry::new(self.layouts)?;
        if let Some(name) = &self.default_layout {
            layouts.require(name, || "the default layout".to_string())?;
        }

        let mut global = Vec::with_capacity(self.middleware.len() + 2);
        if self.default_stages {
            global.push(MiddlewareEntry::new(
                REQUEST_ID_PRIORITY,
                RequestIdMiddleware::new(),
            ));
            global.push(MiddlewareEntry::new(
                TRACING_PRIORITY,
                TracingMiddleware::new(self.settings.service_name.clone()),
            ));
        }
        global.extend(self.middleware);

        let mut mappings = if self.default_error_pages {
            default_error_pages()
        } else {
            Vec::new()
        };
        mappings.extend(self.errors);
        let errors = ErrorDispatcher::new(mappings)?;
        for (layout, referrer) in errors.layouts() {
            layouts.require(layout, || referrer)?;
        }

        let mut routes = RouteTable::new();
        for def in self.routes {
            let RouteDef {
                methods,
                pattern: source,
                handler,
                name,
                rules,
                bindings,
                middleware,
                layout,
            } = def;

            let pattern = CompiledPattern::compile_with_rules(&source, &rules)?;
            if let Some(param) = bindings
                .keys()
                .find(|param| !pattern.param_names().any(|p| p == param.as_str()))
            {
                return Err(AssemblyError::UnknownBindingParam {
                    route: source,
                    param: param.clone(),
                });
            }
            if let Some(layout) = &layout {
                layouts.require(layout, || format!("route `{source}`"))?;
            }

            let endpoint = Endpoint {
                handler,
                pipeline: Pipeline::build(&global, &middleware),
                bindings: BindingResolver::new(bindings),
                layout,
            };
            let mut route = Route::new(methods, pattern, endpoint);
            if let Some(name) = name {
                route = route.named(name);
            }
            let registered = routes.register(route)?;
            tracing::debug!(
                route = registered.label(),
                stages = ?registered.endpoint().pipeline.stage_names(),
                "route registered"
            );
        }

        let config = Arc::new(
            self.config
                .unwrap_or_else(|| ConfigStore::new(RuntimeMode::default())),
        );
        let mut services = self.services;
        services.register(Arc::clone(&config));

        tracing::info!(
            service = %self.settings.service_name,
            routes = routes.len(),
            error_mappings = errors.len(),
            layouts = layouts.len(),
            mode = config.mode().as_str(),
            "application assembled"
        );

        Ok(App {
            inner: Arc::new(AppInner {
                routes,
                errors,
                layouts,
                default_layout: self.default_layout,
                services: Arc::new(services),
                config,
                lifecycle: self.lifecycle,
                settings: self.settings,
            }),
        })
    }
}

impl fmt::Debug for AppBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppBuilder")
            .field("routes", &self.routes.len())
            .field("middleware", &self.middleware.len())
            .field("errors", &self.errors.len())
            .field("layouts", &self.layouts.len())
            .field("default_layout", &self.default_layout)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}
