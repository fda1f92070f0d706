//! Error types raised while dispatching an event.
//!
//! Every failure during matching, binding or the middleware pipeline is a
//! [`DispatchError`]. Errors carry an *identity*: a concrete type name plus an
//! ordered ancestry list, which the error dispatcher uses to pick the most
//! specific registered handler.
//!
//! | Variant             | Type name               | Ancestry                      |
//! |---------------------|-------------------------|-------------------------------|
//! | `RouteNotFound`     | `RouteNotFoundError`    | `NotFoundError`, `HttpError`  |
//! | `MethodNotAllowed`  | `MethodNotAllowedError` | `HttpError`                   |
//! | `Binding`           | `BindingError`          | `NotFoundError`               |
//! | `Handler`           | as raised               | as raised, then `HandlerError`|
//! | `Cancelled`         | `CancelledError`        | none                          |
//!
//! # Example
//!
//! ```
//! use switchyard_core::DispatchError;
//!
//! let err = DispatchError::raise("UserNotFoundError")
//!     .extends("NotFoundError")
//!     .message("no user with id 7")
//!     .build();
//!
//! assert_eq!(err.type_name(), "UserNotFoundError");
//! assert!(err.is_a("NotFoundError"));
//! assert!(err.is_a("HandlerError"));
//! ```

use http::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use thiserror::Error;

/// Result type alias using [`DispatchError`].
pub type DispatchResult<T> = Result<T, DispatchError>;

/// Ancestor shared by every error raised from a handler or middleware.
pub const HANDLER_ERROR: &str = "HandlerError";

/// Domain errors that carry their own dispatch identity.
///
/// Implementing this trait lets handlers use `?` on their own error types:
/// the blanket `From` impl turns them into [`DispatchError::Handler`] with the
/// declared name and ancestry.
///
/// ```
/// use switchyard_core::{DispatchError, ErrorIdentity};
///
/// #[derive(Debug, thiserror::Error)]
/// #[error("book {0} does not exist")]
/// struct BookMissing(u64);
///
/// impl ErrorIdentity for BookMissing {
///     fn type_name(&self) -> &'static str {
///         "BookMissingError"
///     }
///
///     fn ancestry(&self) -> &'static [&'static str] {
///         &["NotFoundError"]
///     }
/// }
///
/// let err: DispatchError = BookMissing(3).into();
/// assert_eq!(err.type_name(), "BookMissingError");
/// assert_eq!(err.to_string(), "book 3 does not exist");
/// ```
pub trait ErrorIdentity: std::error::Error + Send + Sync + 'static {
    /// Concrete type name used for exact matches.
    fn type_name(&self) -> &'static str;

    /// Ancestor names, nearest first.
    fn ancestry(&self) -> &'static [&'static str] {
        &[]
    }

    /// Preferred status when a mapping does not set one.
    fn status(&self) -> Option<StatusCode> {
        None
    }
}

/// An error raised by a handler or middleware stage.
#[derive(Debug)]
pub struct RaisedError {
    name: Cow<'static, str>,
    ancestry: Vec<Cow<'static, str>>,
    message: String,
    status: Option<StatusCode>,
    source: Option<anyhow::Error>,
}

impl RaisedError {
    /// Concrete type name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared ancestry, nearest first, without the implicit `HandlerError`.
    pub fn declared_ancestry(&self) -> impl Iterator<Item = &str> {
        self.ancestry.iter().map(AsRef::as_ref)
    }

    /// Human-readable message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Status suggested by the raiser.
    #[must_use]
    pub const fn status(&self) -> Option<StatusCode> {
        self.status
    }

    /// Underlying cause, if any. Never rendered to clients.
    #[must_use]
    pub fn cause(&self) -> Option<&anyhow::Error> {
        self.source.as_ref()
    }
}

/// Builder returned by [`DispatchError::raise`].
#[derive(Debug)]
#[must_use]
pub struct RaiseBuilder {
    inner: RaisedError,
}

impl RaiseBuilder {
    /// Appends an ancestor name. Earlier calls are nearer ancestors.
    pub fn extends(mut self, ancestor: impl Into<Cow<'static, str>>) -> Self {
        self.inner.ancestry.push(ancestor.into());
        self
    }

    /// Sets the message.
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.inner.message = message.into();
        self
    }

    /// Suggests a status code.
    pub fn status(mut self, status: StatusCode) -> Self {
        self.inner.status = Some(status);
        self
    }

    /// Attaches an underlying cause.
    pub fn source(mut self, source: impl Into<anyhow::Error>) -> Self {
        self.inner.source = Some(source.into());
        self
    }

    /// Finishes the error.
    pub fn build(self) -> DispatchError {
        DispatchError::Handler(self.inner)
    }
}

/// Every failure that can happen while dispatching one event.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// No route pattern matched the path, or a constraint rejected it.
    #[error("no route matches {method} {path}")]
    RouteNotFound {
        /// Event method.
        method: Method,
        /// Event path.
        path: String,
    },

    /// The path matched, but no matching route accepts the method.
    #[error("method {method} is not allowed for {path}")]
    MethodNotAllowed {
        /// Event method.
        method: Method,
        /// Event path.
        path: String,
        /// Methods accepted by the routes that matched the path.
        allowed: Vec<Method>,
    },

    /// A route binding rejected a parameter value.
    #[error("could not bind parameter `{param}` from {value:?}: {reason}")]
    Binding {
        /// Parameter name.
        param: String,
        /// Raw value from the path.
        value: String,
        /// Why the binding failed.
        reason: String,
    },

    /// Raised by a handler or middleware stage.
    #[error("{}", .0.message)]
    Handler(RaisedError),

    /// The event was cancelled before it finished.
    #[error("dispatch cancelled")]
    Cancelled,
}

impl DispatchError {
    /// Starts building a named error.
    pub fn raise(name: impl Into<Cow<'static, str>>) -> RaiseBuilder {
        let name = name.into();
        RaiseBuilder {
            inner: RaisedError {
                message: name.to_string(),
                name,
                ancestry: Vec::new(),
                status: None,
                source: None,
            },
        }
    }

    /// An unexpected failure with a hidden cause.
    ///
    /// The identity is `InternalError`; only `message` is ever shown.
    pub fn internal(message: impl Into<String>, source: impl Into<anyhow::Error>) -> Self {
        Self::raise("InternalError")
            .message(message)
            .status(StatusCode::INTERNAL_SERVER_ERROR)
            .source(source)
            .build()
    }

    /// Creates a binding failure.
    pub fn binding(
        param: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::Binding {
            param: param.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Concrete type name used for exact matches.
    #[must_use]
    pub fn type_name(&self) -> &str {
        match self {
            Self::RouteNotFound { .. } => "RouteNotFoundError",
            Self::MethodNotAllowed { .. } => "MethodNotAllowedError",
            Self::Binding { .. } => "BindingError",
            Self::Handler(raised) => raised.name(),
            Self::Cancelled => "CancelledError",
        }
    }

    /// Ancestor names, nearest first.
    #[must_use]
    pub fn ancestry(&self) -> Vec<&str> {
        match self {
            Self::RouteNotFound { .. } => vec!["NotFoundError", "HttpError"],
            Self::MethodNotAllowed { .. } => vec!["HttpError"],
            Self::Binding { .. } => vec!["NotFoundError"],
            Self::Handler(raised) => raised
                .declared_ancestry()
                .chain(std::iter::once(HANDLER_ERROR))
                .collect(),
            Self::Cancelled => Vec::new(),
        }
    }

    /// Returns true if `name` is the type name or one of its ancestors.
    #[must_use]
    pub fn is_a(&self, name: &str) -> bool {
        self.type_name() == name || self.ancestry().contains(&name)
    }

    /// Status used when the chosen mapping does not set one.
    #[must_use]
    pub fn status_hint(&self) -> StatusCode {
        match self {
            Self::RouteNotFound { .. } | Self::Binding { .. } => StatusCode::NOT_FOUND,
            Self::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            Self::Handler(raised) => raised.status.unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            Self::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Message that is safe to show to a client.
    ///
    /// Internal causes are never included.
    #[must_use]
    pub fn public_message(&self) -> String {
        match self {
            Self::Binding { param, .. } => format!("no resource for `{param}`"),
            Self::Handler(raised) if raised.source.is_some() => "internal error".to_string(),
            other => other.to_string(),
        }
    }

    /// Returns true for [`DispatchError::Cancelled`].
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Converts this error to a serializable envelope.
    #[must_use]
    pub fn to_envelope(&self, request_id: Option<&str>) -> ErrorEnvelope {
        ErrorEnvelope {
            error: ErrorDetail {
                code: self.type_name().to_string(),
                message: self.public_message(),
                status: self.status_hint().as_u16(),
                details: self.details(),
            },
            request_id: request_id.map(ToString::to_string),
        }
    }

    fn details(&self) -> Option<serde_json::Value> {
        match self {
            Self::MethodNotAllowed { allowed, .. } => Some(serde_json::json!({
                "allowed": allowed.iter().map(Method::as_str).collect::<Vec<_>>()
            })),
            Self::Binding { param, .. } => Some(serde_json::json!({ "param": param })),
            _ => None,
        }
    }
}

impl<E: ErrorIdentity> From<E> for DispatchError {
    fn from(err: E) -> Self {
        let mut builder = Self::raise(err.type_name()).message(err.to_string());
        for ancestor in err.ancestry() {
            builder = builder.extends(*ancestor);
        }
        if let Some(status) = err.status() {
            builder = builder.status(status);
        }
        builder.build()
    }
}

/// Serializable error body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    /// Error details.
    pub error: ErrorDetail,
    /// Correlating event id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

/// The `error` object inside an [`ErrorEnvelope`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Concrete error type name.
    pub code: String,
    /// Client-safe message.
    pub message: String,
    /// Suggested status code.
    pub status: u16,
    /// Extra structured detail.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Error)]
    #[error("user {0} missing")]
    struct UserMissing(u32);

    impl ErrorIdentity for UserMissing {
        fn type_name(&self) -> &'static str {
            "UserNotFoundError"
        }

        fn ancestry(&self) -> &'static [&'static str] {
            &["NotFoundError", "DomainError"]
        }

        fn status(&self) -> Option<StatusCode> {
            Some(StatusCode::NOT_FOUND)
        }
    }

    #[test]
    fn test_builtin_identities() {
        let not_found = DispatchError::RouteNotFound {
            method: Method::GET,
            path: "/x".into(),
        };
        assert_eq!(not_found.type_name(), "RouteNotFoundError");
        assert_eq!(not_found.ancestry(), vec!["NotFoundError", "HttpError"]);
        assert_eq!(not_found.status_hint(), StatusCode::NOT_FOUND);

        let binding = DispatchError::binding("id", "999", "no such book");
        assert_eq!(binding.type_name(), "BindingError");
        assert!(binding.is_a("NotFoundError"));
        assert!(!binding.is_a("HttpError"));

        let cancelled = DispatchError::Cancelled;
        assert!(cancelled.ancestry().is_empty());
        assert!(cancelled.is_cancelled());
    }

    #[test]
    fn test_raised_identity_keeps_order_and_handler_root() {
        let err = DispatchError::raise("QuotaError")
            .extends("LimitError")
            .extends("ClientError")
            .build();
        assert_eq!(err.ancestry(), vec!["LimitError", "ClientError", HANDLER_ERROR]);
        assert_eq!(err.to_string(), "QuotaError");
        assert_eq!(err.status_hint(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_from_error_identity() {
        let err: DispatchError = UserMissing(7).into();
        assert_eq!(err.type_name(), "UserNotFoundError");
        assert_eq!(
            err.ancestry(),
            vec!["NotFoundError", "DomainError", HANDLER_ERROR]
        );
        assert_eq!(err.status_hint(), StatusCode::NOT_FOUND);
        assert_eq!(err.to_string(), "user 7 missing");
        assert_eq!(err.public_message(), "user 7 missing");
    }

    #[test]
    fn test_question_mark_conversion() {
        fn lookup(id: u32) -> DispatchResult<()> {
            Err(UserMissing(id))?
        }
        let err = lookup(3).unwrap_err();
        assert!(err.is_a("UserNotFoundError"));
    }

    #[test]
    fn test_internal_hides_cause() {
        let err = DispatchError::internal(
            "database unavailable",
            std::io::Error::other("connection refused on 10.0.0.3"),
        );
        assert_eq!(err.type_name(), "InternalError");
        assert_eq!(err.public_message(), "internal error");
        let DispatchError::Handler(raised) = &err else {
            panic!("expected handler error");
        };
        assert!(raised.cause().is_some());
    }

    #[test]
    fn test_envelope() {
        let err = DispatchError::MethodNotAllowed {
            method: Method::DELETE,
            path: "/books".into(),
            allowed: vec![Method::GET, Method::POST],
        };
        let envelope = err.to_envelope(Some("evt-1"));
        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(json["error"]["code"], "MethodNotAllowedError");
        assert_eq!(json["error"]["status"], 405);
        assert_eq!(json["error"]["details"]["allowed"][1], "POST");
        assert_eq!(json["request_id"], "evt-1");
    }

    #[test]
    fn test_binding_public_message_omits_value() {
        let err = DispatchError::binding("id", "secret-token", "lookup failed");
        assert!(!err.public_message().contains("secret-token"));
    }
}
