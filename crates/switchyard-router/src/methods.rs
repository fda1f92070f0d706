//! The set of methods a route answers to.
//!
//! HTTP events carry their own method. CLI invocations and browser
//! navigations are dispatched as `GET`, so a page route declared with
//! [`MethodSet::get`] serves all three event kinds.

use http::Method;
use smallvec::SmallVec;

/// Methods accepted by a single route.
///
/// # Example
///
/// ```rust
/// use switchyard_router::MethodSet;
/// use http::Method;
///
/// let methods = MethodSet::get().with(Method::HEAD);
/// assert!(methods.contains(&Method::GET));
/// assert!(methods.contains(&Method::HEAD));
/// assert!(!methods.contains(&Method::POST));
///
/// assert!(MethodSet::any().contains(&Method::DELETE));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MethodSet {
    methods: SmallVec<[Method; 2]>,
    any: bool,
}

impl MethodSet {
    /// Creates an empty set. A route with an empty set never matches.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A set accepting every method.
    #[must_use]
    pub fn any() -> Self {
        Self {
            methods: SmallVec::new(),
            any: true,
        }
    }

    /// A set with exactly one method.
    #[must_use]
    pub fn single(method: Method) -> Self {
        Self::new().with(method)
    }

    /// `GET` only.
    #[must_use]
    pub fn get() -> Self {
        Self::single(Method::GET)
    }

    /// `POST` only.
    #[must_use]
    pub fn post() -> Self {
        Self::single(Method::POST)
    }

    /// `PUT` only.
    #[must_use]
    pub fn put() -> Self {
        Self::single(Method::PUT)
    }

    /// `PATCH` only.
    #[must_use]
    pub fn patch() -> Self {
        Self::single(Method::PATCH)
    }

    /// `DELETE` only.
    #[must_use]
    pub fn delete() -> Self {
        Self::single(Method::DELETE)
    }

    /// Adds a method to the set.
    #[must_use]
    pub fn with(mut self, method: Method) -> Self {
        if !self.methods.contains(&method) {
            self.methods.push(method);
        }
        self
    }

    /// Returns true if the set accepts `method`.
    #[must_use]
    pub fn contains(&self, method: &Method) -> bool {
        self.any || self.methods.contains(method)
    }

    /// Returns true if this set accepts every method.
    #[must_use]
    pub fn is_any(&self) -> bool {
        self.any
    }

    /// Returns true if no method is accepted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        !self.any && self.methods.is_empty()
    }

    /// Returns the first method accepted by both sets, if any.
    ///
    /// Two wildcard sets share `GET` for reporting purposes.
    #[must_use]
    pub fn shared_with(&self, other: &Self) -> Option<Method> {
        match (self.any, other.any) {
            (true, true) => Some(Method::GET),
            (true, false) => other.methods.first().cloned(),
            (false, true) => self.methods.first().cloned(),
            (false, false) => self
                .methods
                .iter()
                .find(|m| other.methods.contains(m))
                .cloned(),
        }
    }

    /// Iterates over the explicit methods (empty for wildcard sets).
    pub fn iter(&self) -> impl Iterator<Item = &Method> {
        self.methods.iter()
    }
}

impl FromIterator<Method> for MethodSet {
    fn from_iter<I: IntoIterator<Item = Method>>(iter: I) -> Self {
        iter.into_iter().fold(Self::new(), Self::with)
    }
}

impl From<Method> for MethodSet {
    fn from(method: Method) -> Self {
        Self::single(method)
    }
}

/// Renders an `Allow` header value from a list of methods.
#[must_use]
pub fn allow_header(methods: &[Method]) -> String {
    methods
        .iter()
        .map(Method::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}
