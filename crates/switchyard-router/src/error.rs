//! Assembly-time errors raised while compiling patterns and registering routes.

use http::Method;
use thiserror::Error;

/// A route pattern could not be compiled (or rendered back into a path).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternError {
    /// A parameter or catch-all segment has no name.
    #[error("pattern `{pattern}`: parameter name is empty")]
    EmptyName {
        /// The offending pattern.
        pattern: String,
    },

    /// A segment could not be parsed.
    #[error("pattern `{pattern}`: malformed segment `{segment}`")]
    MalformedSegment {
        /// The offending pattern.
        pattern: String,
        /// The raw segment text.
        segment: String,
    },

    /// The same parameter name appears twice.
    #[error("pattern `{pattern}`: duplicate parameter `{name}`")]
    DuplicateParam {
        /// The offending pattern.
        pattern: String,
        /// The repeated name.
        name: String,
    },

    /// A default value was given to a parameter that is followed by required segments.
    #[error("pattern `{pattern}`: default value on non-trailing parameter `{name}`")]
    DefaultNotTrailing {
        /// The offending pattern.
        pattern: String,
        /// The parameter carrying the default.
        name: String,
    },

    /// A literal or required parameter follows an optional parameter.
    #[error("pattern `{pattern}`: required segment `{segment}` follows an optional parameter")]
    RequiredAfterOptional {
        /// The offending pattern.
        pattern: String,
        /// The required segment.
        segment: String,
    },

    /// A catch-all segment is not the last segment.
    #[error("pattern `{pattern}`: catch-all `*{name}` must be the last segment")]
    CatchAllNotLast {
        /// The offending pattern.
        pattern: String,
        /// The catch-all name.
        name: String,
    },

    /// A regex constraint failed to compile.
    #[error("pattern `{pattern}`: invalid constraint for `{name}`: {reason}")]
    InvalidConstraint {
        /// The offending pattern.
        pattern: String,
        /// The constrained parameter.
        name: String,
        /// Regex compiler message.
        reason: String,
    },

    /// A parameter's default value fails the parameter's own constraint.
    #[error("pattern `{pattern}`: default `{value}` for `{name}` violates its constraint")]
    DefaultViolatesConstraint {
        /// The offending pattern.
        pattern: String,
        /// The parameter.
        name: String,
        /// The default as written.
        value: String,
    },

    /// A rule override names a parameter the pattern does not declare.
    #[error("pattern `{pattern}`: rule given for unknown parameter `{name}`")]
    UnknownRule {
        /// The offending pattern.
        pattern: String,
        /// The unknown name.
        name: String,
    },

    /// Building a path failed because a required parameter was not supplied.
    #[error("pattern `{pattern}`: missing value for parameter `{name}`")]
    MissingParam {
        /// The pattern being rendered.
        pattern: String,
        /// The missing parameter.
        name: String,
    },

    /// Building a path failed because a value violates the parameter's constraint.
    #[error("pattern `{pattern}`: value `{value}` violates constraint on `{name}`")]
    ConstraintViolation {
        /// The pattern being rendered.
        pattern: String,
        /// The constrained parameter.
        name: String,
        /// The rejected value.
        value: String,
    },
}

/// A route could not be registered or looked up.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    /// A route with the same method, pattern and name already exists.
    #[error("duplicate route {method} {pattern}{}", name.as_deref().map(|n| format!(" ({n})")).unwrap_or_default())]
    Duplicate {
        /// First method shared by both routes.
        method: Method,
        /// Canonical pattern text.
        pattern: String,
        /// Route name, if any.
        name: Option<String>,
    },

    /// No route carries the requested name.
    #[error("no route named `{0}`")]
    UnknownName(String),

    /// The route's pattern failed to compile or render.
    #[error(transparent)]
    Pattern(#[from] PatternError),
}
