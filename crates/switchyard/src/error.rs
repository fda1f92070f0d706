//! Assembly-time errors.

use switchyard_config::ConfigError;
use switchyard_router::{PatternError, RouteError};
use thiserror::Error;

/// The application could not be assembled.
///
/// Every variant aborts [`AppBuilder::build`](crate::AppBuilder::build);
/// none of them can happen while events are being dispatched.
#[derive(Debug, Error)]
pub enum AssemblyError {
    /// A route pattern or rule failed to compile.
    #[error(transparent)]
    Pattern(#[from] PatternError),

    /// A route collides with an existing one.
    #[error(transparent)]
    Route(#[from] RouteError),

    /// A binding names a parameter the pattern does not declare.
    #[error("route `{route}` binds unknown parameter `{param}`")]
    UnknownBindingParam {
        /// Route pattern.
        route: String,
        /// Parameter named by the binding.
        param: String,
    },

    /// A layout reference does not resolve.
    #[error("unknown layout `{layout}` referenced by {referrer}")]
    UnknownLayout {
        /// The missing layout.
        layout: String,
        /// What referenced it.
        referrer: String,
    },

    /// Two layouts share a name.
    #[error("layout `{0}` is registered more than once")]
    DuplicateLayout(String),

    /// A template layout has no outlet marker.
    #[error("layout `{0}` has no {{{{outlet}}}} marker")]
    MissingOutlet(String),

    /// Layout nesting loops back on itself.
    #[error("layout cycle: {}", .0.join(" -> "))]
    LayoutCycle(Vec<String>),

    /// An error mapping lists no error types.
    #[error("error mapping #{0} names no error types")]
    EmptyMapping(usize),

    /// Configuration could not be turned into a store.
    #[error(transparent)]
    Config(#[from] ConfigError),
}
