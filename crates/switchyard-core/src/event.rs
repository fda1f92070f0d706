//! Inbound events.
//!
//! An [`Event`] is anything the engine can route: an HTTP request, a CLI
//! invocation or a browser navigation. CLI and navigation events are
//! dispatched with the `GET` method so page routes serve all three kinds.

use bytes::Bytes;
use http::header::{HeaderName, HeaderValue};
use http::{HeaderMap, Method};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A unique identifier for each event, using UUID v7.
///
/// ```
/// use switchyard_core::EventId;
///
/// let a = EventId::new();
/// let b = EventId::new();
/// assert_ne!(a, b);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(Uuid);

impl EventId {
    /// Creates a new time-ordered id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Parses an id received from a client, e.g. an `x-request-id` header.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        Uuid::parse_str(value).ok().map(Self)
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for EventId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// Where an event came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// An HTTP request.
    Http,
    /// A command-line invocation.
    Cli,
    /// A client-side page navigation.
    Navigation,
}

impl EventKind {
    /// Lowercase label for logs and metrics.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Cli => "cli",
            Self::Navigation => "navigation",
        }
    }
}

/// An inbound event to be dispatched.
///
/// # Example
///
/// ```
/// use switchyard_core::{Event, EventKind};
/// use http::Method;
///
/// let event = Event::http(Method::GET, "/books/7?format=json");
/// assert_eq!(event.path(), "/books/7");
/// assert_eq!(event.query_param("format"), Some("json"));
///
/// let cli = Event::cli(["books", "show", "7", "--format=json"]);
/// assert_eq!(cli.kind(), EventKind::Cli);
/// assert_eq!(cli.method(), &Method::GET);
/// assert_eq!(cli.path(), "/books/show/7");
/// assert_eq!(cli.query_param("format"), Some("json"));
/// ```
#[derive(Debug, Clone)]
pub struct Event {
    id: EventId,
    kind: EventKind,
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    headers: HeaderMap,
    body: Bytes,
}

impl Event {
    fn with_target(kind: EventKind, method: Method, target: &str) -> Self {
        let (path, query) = match target.split_once('?') {
            Some((path, query)) => (path, parse_query(query)),
            None => (target, Vec::new()),
        };
        let path = if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{path}")
        };
        Self {
            id: EventId::new(),
            kind,
            method,
            path,
            query,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    /// An HTTP request for `target` (path plus optional `?query`).
    #[must_use]
    pub fn http(method: Method, target: &str) -> Self {
        Self::with_target(EventKind::Http, method, target)
    }

    /// A browser navigation to `target`.
    #[must_use]
    pub fn navigation(target: &str) -> Self {
        Self::with_target(EventKind::Navigation, Method::GET, target)
    }

    /// A CLI invocation.
    ///
    /// Positional arguments become path segments; `--key=value` and bare
    /// `--flag` arguments become query parameters. Each argument is
    /// percent-encoded into exactly one segment, so `/` or `?` inside an
    /// argument reaches the route parameter intact.
    #[must_use]
    pub fn cli<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut segments: Vec<String> = Vec::new();
        let mut query = Vec::new();
        for arg in args {
            let arg = arg.as_ref();
            match arg.strip_prefix("--") {
                Some(flag) => match flag.split_once('=') {
                    Some((key, value)) => query.push((key.to_string(), value.to_string())),
                    None => query.push((flag.to_string(), "true".to_string())),
                },
                None if arg.is_empty() => {}
                None => segments.push(urlencoding::encode(arg).into_owned()),
            }
        }
        Self {
            id: EventId::new(),
            kind: EventKind::Cli,
            method: Method::GET,
            path: format!("/{}", segments.join("/")),
            query,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    /// Replaces the event id.
    #[must_use]
    pub fn with_id(mut self, id: EventId) -> Self {
        self.id = id;
        self
    }

    /// Adopts an id assigned upstream.
    pub fn set_id(&mut self, id: EventId) {
        self.id = id;
    }

    /// Adds a header.
    #[must_use]
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    /// Sets the body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Event id.
    #[must_use]
    pub const fn id(&self) -> EventId {
        self.id
    }

    /// Event kind.
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        self.kind
    }

    /// Dispatch method.
    #[must_use]
    pub const fn method(&self) -> &Method {
        &self.method
    }

    /// Path without the query string, as received (still percent-encoded).
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// First value of a query parameter.
    #[must_use]
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// All query parameters in order.
    pub fn query(&self) -> impl Iterator<Item = (&str, &str)> {
        self.query.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Headers.
    #[must_use]
    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Mutable headers.
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Body bytes.
    #[must_use]
    pub const fn body(&self) -> &Bytes {
        &self.body
    }

    /// Deserializes a JSON body.
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error if the body is not valid JSON for `T`.
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_slice(&self.body)
    }
}

/// Decodes `application/x-www-form-urlencoded` pairs (`%XX` and `+`).
fn parse_query(query: &str) -> Vec<(String, String)> {
    serde_urlencoded::from_str(query).unwrap_or_else(|err| {
        tracing::debug!(query, error = %err, "ignoring undecodable query string");
        Vec::new()
    })
}
