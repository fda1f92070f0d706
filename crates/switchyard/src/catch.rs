//! Error mappings and the error dispatcher.
//!
//! An error mapping routes failures to an error handler by name. A mapping
//! names one error type, a set of them, or the `default` wildcard. When an
//! event fails, [`ErrorDispatcher::dispatch`] picks the most specific
//! mapping for the error's identity:
//!
//! | Rank | Match                                         |
//! |------|-----------------------------------------------|
//! | 1    | concrete type name in a single-type mapping   |
//! | 2    | concrete type name in a multi-type set        |
//! | 3    | ancestor name, nearest ancestor first         |
//! | 4    | `default`                                     |
//!
//! Within the ancestor rank a single-type mapping beats a set at the same
//! depth. Ties go to the mapping registered last, so application mappings
//! override the framework's default error pages.
//!
//! Dispatching is a two-state machine: it starts in *Routing*, scanning the
//! mappings, and ends either *Resolved* with an [`ErrorResolution`] or
//! with an [`UnhandledErrorKind`], after which the coordinator emits the
//! generic fallback and stops.

use crate::error::AssemblyError;
use http::StatusCode;
use std::cmp::Reverse;
use std::fmt;
use std::sync::Arc;
use switchyard_core::{
    sync_handler, BoxedHandler, DispatchContext, DispatchError, DispatchResult, Handler, Response,
};
use thiserror::Error;

/// Name of the wildcard mapping.
pub const DEFAULT_MAPPING: &str = "default";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Matcher {
    Single(String),
    Set(Vec<String>),
    Default,
}

impl Matcher {
    fn rank(&self, type_name: &str, ancestry: &[&str]) -> Option<MatchRank> {
        let depth_of = |name: &str| ancestry.iter().position(|a| *a == name);
        match self {
            Self::Default => Some(MatchRank::Default),
            Self::Single(name) if name == type_name => Some(MatchRank::Exact { in_set: false }),
            Self::Single(name) => depth_of(name).map(|depth| MatchRank::Ancestor {
                depth,
                in_set: false,
            }),
            Self::Set(names) => {
                if names.iter().any(|n| n == type_name) {
                    return Some(MatchRank::Exact { in_set: true });
                }
                names
                    .iter()
                    .filter_map(|n| depth_of(n))
                    .min()
                    .map(|depth| MatchRank::Ancestor {
                        depth,
                        in_set: true,
                    })
                    .or_else(|| {
                        names
                            .iter()
                            .any(|n| n == DEFAULT_MAPPING)
                            .then_some(MatchRank::Default)
                    })
            }
        }
    }
}

impl fmt::Display for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Single(name) => f.write_str(name),
            Self::Set(names) => write!(f, "{{{}}}", names.join(", ")),
            Self::Default => f.write_str(DEFAULT_MAPPING),
        }
    }
}

/// How closely a mapping matched. Smaller is more specific.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MatchRank {
    /// The mapping names the error's concrete type.
    Exact {
        /// Whether the name came from a multi-type set.
        in_set: bool,
    },
    /// The mapping names one of the error's ancestors.
    Ancestor {
        /// Position in the ancestry, nearest first.
        depth: usize,
        /// Whether the name came from a multi-type set.
        in_set: bool,
    },
    /// The wildcard.
    Default,
}

/// Declaration of one error mapping.
///
/// ```
/// use http::StatusCode;
/// use switchyard::catch::ErrorMappingDef;
/// use switchyard_core::{sync_handler, Response};
///
/// let not_found = ErrorMappingDef::on(
///     "NotFoundError",
///     sync_handler(|_| Ok(Response::html("<h1>Not found</h1>"))),
/// )
/// .status(StatusCode::NOT_FOUND)
/// .layout("errors");
/// # let _ = not_found;
/// ```
#[must_use]
pub struct ErrorMappingDef {
    matcher: Matcher,
    handler: BoxedHandler,
    status: Option<StatusCode>,
    layout: Option<String>,
}

impl ErrorMappingDef {
    /// Maps one error type (or ancestor) name.
    ///
    /// `on("default")` is the same as [`on_default`](Self::on_default).
    pub fn on(name: impl Into<String>, handler: impl Handler) -> Self {
        let name = name.into();
        let matcher = if name == DEFAULT_MAPPING {
            Matcher::Default
        } else {
            Matcher::Single(name)
        };
        Self::with_matcher(matcher, Arc::new(handler))
    }

    /// Maps a set of names to one handler.
    pub fn on_any<I, S>(names: I, handler: impl Handler) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut names: Vec<String> = names.into_iter().map(Into::into).collect();
        let matcher = match names.len() {
            1 if names[0] == DEFAULT_MAPPING => Matcher::Default,
            1 => Matcher::Single(names.remove(0)),
            _ => Matcher::Set(names),
        };
        Self::with_matcher(matcher, Arc::new(handler))
    }

    /// Maps every error no other mapping handles.
    pub fn on_default(handler: impl Handler) -> Self {
        Self::with_matcher(Matcher::Default, Arc::new(handler))
    }

    fn with_matcher(matcher: Matcher, handler: BoxedHandler) -> Self {
        Self {
            matcher,
            handler,
            status: None,
            layout: None,
        }
    }

    /// Status for the response. Without it the error's own status is used.
    pub const fn status(mut self, status: StatusCode) -> Self {
        self.status = Some(status);
        self
    }

    /// Layout to render the handler's content in.
    pub fn layout(mut self, name: impl Into<String>) -> Self {
        self.layout = Some(name.into());
        self
    }

    /// The layout name, if set.
    #[must_use]
    pub fn layout_name(&self) -> Option<&str> {
        self.layout.as_deref()
    }
}

impl fmt::Debug for ErrorMappingDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorMappingDef")
            .field("matcher", &self.matcher.to_string())
            .field("status", &self.status)
            .field("layout", &self.layout)
            .finish_non_exhaustive()
    }
}

struct ErrorMapping {
    matcher: Matcher,
    handler: BoxedHandler,
    status: Option<StatusCode>,
    layout: Option<String>,
    sequence: usize,
}

/// The handler chosen for an error.
#[derive(Clone)]
pub struct ErrorResolution<'a> {
    /// Handler to run against the failed event's context.
    pub handler: &'a BoxedHandler,
    /// Response status.
    pub status: StatusCode,
    /// Layout from the mapping, if any.
    pub layout: Option<&'a str>,
    /// How the mapping matched.
    pub rank: MatchRank,
    /// Registration index of the mapping.
    pub sequence: usize,
}

impl fmt::Debug for ErrorResolution<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorResolution")
            .field("status", &self.status)
            .field("layout", &self.layout)
            .field("rank", &self.rank)
            .field("sequence", &self.sequence)
            .finish_non_exhaustive()
    }
}

/// No mapping, not even `default`, handles an error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("no error mapping handles `{type_name}` (ancestry: [{}])", .ancestry.join(", "))]
pub struct UnhandledErrorKind {
    /// Concrete type name of the error.
    pub type_name: String,
    /// Its ancestry, nearest first.
    pub ancestry: Vec<String>,
}

/// Immutable set of error mappings.
#[derive(Default)]
pub struct ErrorDispatcher {
    mappings: Vec<ErrorMapping>,
}

impl ErrorDispatcher {
    /// Indexes `defs` in registration order.
    ///
    /// # Errors
    ///
    /// Returns [`AssemblyError::EmptyMapping`] for a set with no names.
    pub fn new(defs: Vec<ErrorMappingDef>) -> Result<Self, AssemblyError> {
        let mappings = defs
            .into_iter()
            .enumerate()
            .map(|(sequence, def)| {
                if matches!(&def.matcher, Matcher::Set(names) if names.is_empty()) {
                    return Err(AssemblyError::EmptyMapping(sequence));
                }
                Ok(ErrorMapping {
                    matcher: def.matcher,
                    handler: def.handler,
                    status: def.status,
                    layout: def.layout,
                    sequence,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { mappings })
    }

    /// Number of mappings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    /// Returns true if there are no mappings.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }

    /// Layouts referenced by mappings, with a description of each mapping.
    pub fn layouts(&self) -> impl Iterator<Item = (&str, String)> {
        self.mappings.iter().filter_map(|m| {
            m.layout
                .as_deref()
                .map(|layout| (layout, format!("error mapping `{}`", m.matcher)))
        })
    }

    /// Picks the mapping for `error`.
    ///
    /// # Errors
    ///
    /// Returns [`UnhandledErrorKind`] when nothing matches.
    pub fn dispatch(&self, error: &DispatchError) -> Result<ErrorResolution<'_>, UnhandledErrorKind> {
        let type_name = error.type_name();
        let ancestry = error.ancestry();
        tracing::trace!(state = "routing", error_type = type_name, "dispatching error");

        let chosen = self
            .mappings
            .iter()
            .filter_map(|m| m.matcher.rank(type_name, &ancestry).map(|rank| (rank, m)))
            .min_by_key(|(rank, m)| (*rank, Reverse(m.sequence)));

        let Some((rank, mapping)) = chosen else {
            return Err(UnhandledErrorKind {
                type_name: type_name.to_string(),
                ancestry: ancestry.iter().map(ToString::to_string).collect(),
            });
        };

        tracing::trace!(
            state = "resolved",
            error_type = type_name,
            mapping = %mapping.matcher,
            ?rank,
            "error mapping selected"
        );
        Ok(ErrorResolution {
            handler: &mapping.handler,
            status: mapping.status.unwrap_or_else(|| error.status_hint()),
            layout: mapping.layout.as_deref(),
            rank,
            sequence: mapping.sequence,
        })
    }
}

impl fmt::Debug for ErrorDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.mappings.iter().map(|m| m.matcher.to_string()))
            .finish()
    }
}

/// The framework's error pages for unmatched paths and methods.
///
/// Both render the error as a JSON envelope carrying the event id.
/// Registered ahead of application mappings, so any application mapping at
/// the same rank replaces them.
#[must_use]
pub fn default_error_pages() -> Vec<ErrorMappingDef> {
    vec![
        ErrorMappingDef::on("NotFoundError", sync_handler(envelope_page)),
        ErrorMappingDef::on("MethodNotAllowedError", sync_handler(envelope_page)),
    ]
}

fn envelope_page(ctx: &mut DispatchContext) -> DispatchResult<Response> {
    let request_id = ctx.event_id().to_string();
    let Some(error) = ctx.error() else {
        return Ok(Response::new(StatusCode::INTERNAL_SERVER_ERROR, "").raw());
    };
    let envelope = error.to_envelope(Some(&request_id));
    let status = error.status_hint();
    let response = Response::json(&envelope)
        .map_err(|e| DispatchError::internal("could not encode the error envelope", e))?;
    Ok(response.with_status(status))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop() -> impl Handler {
        sync_handler(|_| Ok(Response::text("")))
    }

    fn user_not_found() -> DispatchError {
        DispatchError::raise("UserNotFoundError")
            .extends("NotFoundError")
            .build()
    }

    fn dispatcher(defs: Vec<ErrorMappingDef>) -> ErrorDispatcher {
        ErrorDispatcher::new(defs).unwrap()
    }

    #[test]
    fn test_ancestor_beats_default() {
        let d = dispatcher(vec![
            ErrorMappingDef::on("NotFoundError", noop()).status(StatusCode::NOT_FOUND),
            ErrorMappingDef::on_default(noop()),
        ]);
        let resolved = d.dispatch(&user_not_found()).unwrap();
        assert_eq!(resolved.sequence, 0);
        assert_eq!(resolved.status, StatusCode::NOT_FOUND);
        assert_eq!(
            resolved.rank,
            MatchRank::Ancestor {
                depth: 0,
                in_set: false
            }
        );
    }

    #[test]
    fn test_rank_order() {
        let d = dispatcher(vec![
            ErrorMappingDef::on_default(noop()),
            ErrorMappingDef::on("HandlerError", noop()),
            ErrorMappingDef::on("NotFoundError", noop()),
            ErrorMappingDef::on_any(["UserNotFoundError", "BookNotFoundError"], noop()),
            ErrorMappingDef::on("UserNotFoundError", noop()),
        ]);
        assert_eq!(d.dispatch(&user_not_found()).unwrap().sequence, 4);

        let d = dispatcher(vec![
            ErrorMappingDef::on_any(["UserNotFoundError", "BookNotFoundError"], noop()),
            ErrorMappingDef::on("NotFoundError", noop()),
        ]);
        let resolved = d.dispatch(&user_not_found()).unwrap();
        assert_eq!(resolved.sequence, 0);
        assert_eq!(resolved.rank, MatchRank::Exact { in_set: true });
    }

    #[test]
    fn test_nearer_ancestor_wins() {
        let err = DispatchError::raise("AccessDeniedError")
            .extends("AuthError")
            .build();
        let d = dispatcher(vec![
            ErrorMappingDef::on("AuthError", noop()),
            ErrorMappingDef::on("HandlerError", noop()),
        ]);
        assert_eq!(d.dispatch(&err).unwrap().sequence, 0);
    }

    #[test]
    fn test_single_beats_set_at_same_depth() {
        let d = dispatcher(vec![
            ErrorMappingDef::on("NotFoundError", noop()),
            ErrorMappingDef::on_any(["NotFoundError", "AuthError"], noop()),
        ]);
        assert_eq!(d.dispatch(&user_not_found()).unwrap().sequence, 0);
    }

    #[test]
    fn test_last_registration_wins_ties() {
        let d = dispatcher(vec![
            ErrorMappingDef::on("BindingError", noop()).status(StatusCode::GONE),
            ErrorMappingDef::on("BindingError", noop()),
        ]);
        let err = DispatchError::binding("id", "999", "no matching entity");
        let resolved = d.dispatch(&err).unwrap();
        assert_eq!(resolved.sequence, 1);
        assert_eq!(resolved.status, StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_unhandled() {
        let d = dispatcher(vec![ErrorMappingDef::on("AuthError", noop())]);
        let err = d.dispatch(&user_not_found()).unwrap_err();
        assert_eq!(err.type_name, "UserNotFoundError");
        assert_eq!(err.ancestry, vec!["NotFoundError", "HandlerError"]);
        assert!(err.to_string().contains("UserNotFoundError"));

        assert!(ErrorDispatcher::default()
            .dispatch(&DispatchError::Cancelled)
            .is_err());
    }

    #[test]
    fn test_default_spellings() {
        let err = DispatchError::Cancelled;
        for def in [
            ErrorMappingDef::on("default", noop()),
            ErrorMappingDef::on_any(["default"], noop()),
            ErrorMappingDef::on_any(["AuthError", "default"], noop()),
        ] {
            let d = dispatcher(vec![def]);
            assert_eq!(d.dispatch(&err).unwrap().rank, MatchRank::Default);
        }
    }

    #[test]
    fn test_empty_set_rejected() {
        let defs = vec![
            ErrorMappingDef::on_default(noop()),
            ErrorMappingDef::on_any(Vec::<String>::new(), noop()),
        ];
        assert!(matches!(
            ErrorDispatcher::new(defs),
            Err(AssemblyError::EmptyMapping(1))
        ));
    }

    #[test]
    fn test_layouts_listed() {
        let d = dispatcher(vec![
            ErrorMappingDef::on("NotFoundError", noop()).layout("errors"),
            ErrorMappingDef::on_default(noop()),
        ]);
        let layouts: Vec<_> = d.layouts().collect();
        assert_eq!(layouts.len(), 1);
        assert_eq!(layouts[0].0, "errors");
        assert_eq!(layouts[0].1, "error mapping `NotFoundError`");
    }

    #[tokio::test]
    async fn test_default_error_page_renders_envelope() {
        use http::Method;
        use switchyard_core::Event;

        let d = dispatcher(default_error_pages());
        let err = DispatchError::MethodNotAllowed {
            method: Method::DELETE,
            path: "/books".into(),
            allowed: vec![Method::GET, Method::POST],
        };
        let resolved = d.dispatch(&err).unwrap();
        assert_eq!(resolved.status, StatusCode::METHOD_NOT_ALLOWED);

        let mut ctx = DispatchContext::new(Event::http(Method::DELETE, "/books"));
        ctx.set_error(Arc::new(err));
        let response = resolved.handler.call(&mut ctx).await.unwrap();
        assert!(response.is_raw());
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);

        let body: serde_json::Value = serde_json::from_str(response.body()).unwrap();
        assert_eq!(body["error"]["code"], "MethodNotAllowedError");
        assert_eq!(body["error"]["details"]["allowed"][1], "POST");
        assert_eq!(body["request_id"], ctx.event_id().to_string());
    }
}
