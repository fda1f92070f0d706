//! Test event building.

use crate::error::TestError;
use bytes::Bytes;
use http::{header, HeaderMap, HeaderName, HeaderValue, Method};
use serde::Serialize;
use switchyard_core::Event;

/// Where a test event comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Origin {
    /// An HTTP request with the given method.
    Http(Method),
    /// A browser navigation.
    Navigation,
    /// A CLI invocation with its arguments.
    Cli(Vec<String>),
}

/// A fully built test event description.
#[derive(Debug, Clone)]
pub struct TestRequest {
    /// Event origin
    pub origin: Origin,
    /// Target path with optional query; empty for CLI events
    pub target: String,
    /// Headers
    pub headers: HeaderMap,
    /// Body
    pub body: Bytes,
}

impl TestRequest {
    /// Creates a `GET` request.
    pub fn get(target: impl AsRef<str>) -> TestRequestBuilder {
        TestRequestBuilder::new(Origin::Http(Method::GET), target)
    }

    /// Creates a `POST` request.
    pub fn post(target: impl AsRef<str>) -> TestRequestBuilder {
        TestRequestBuilder::new(Origin::Http(Method::POST), target)
    }

    /// Creates a `PUT` request.
    pub fn put(target: impl AsRef<str>) -> TestRequestBuilder {
        TestRequestBuilder::new(Origin::Http(Method::PUT), target)
    }

    /// Creates a `PATCH` request.
    pub fn patch(target: impl AsRef<str>) -> TestRequestBuilder {
        TestRequestBuilder::new(Origin::Http(Method::PATCH), target)
    }

    /// Creates a `DELETE` request.
    pub fn delete(target: impl AsRef<str>) -> TestRequestBuilder {
        TestRequestBuilder::new(Origin::Http(Method::DELETE), target)
    }

    /// Creates a browser navigation.
    pub fn navigate(target: impl AsRef<str>) -> TestRequestBuilder {
        TestRequestBuilder::new(Origin::Navigation, target)
    }

    /// Creates a CLI invocation.
    pub fn cli<I, S>(args: I) -> TestRequestBuilder
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let args = args.into_iter().map(|a| a.as_ref().to_string()).collect();
        TestRequestBuilder::new(Origin::Cli(args), "")
    }

    /// Converts the description into a dispatchable [`Event`].
    #[must_use]
    pub fn into_event(self) -> Event {
        let event = match self.origin {
            Origin::Http(method) => Event::http(method, &self.target),
            Origin::Navigation => Event::navigation(&self.target),
            Origin::Cli(args) => Event::cli(args),
        };
        let mut event = event.with_body(self.body);
        event.headers_mut().extend(self.headers);
        event
    }
}

/// Builder for test events.
///
/// Invalid headers or bodies do not panic while building; the first
/// problem is reported by [`build`](Self::build).
#[must_use]
#[derive(Debug)]
pub struct TestRequestBuilder {
    origin: Origin,
    target: String,
    headers: HeaderMap,
    body: Option<Bytes>,
    error: Option<TestError>,
}

impl TestRequestBuilder {
    /// Creates a builder.
    pub fn new(origin: Origin, target: impl AsRef<str>) -> Self {
        Self {
            origin,
            target: target.as_ref().to_string(),
            headers: HeaderMap::new(),
            body: None,
            error: None,
        }
    }

    /// Sets a header.
    ///
    /// ```
    /// use switchyard_test::TestRequest;
    ///
    /// let request = TestRequest::get("/books")
    ///     .header("X-Request-Id", "0190b5d2-6f3c-7cc0-8a4e-35c1b0f1a2b3")
    ///     .build()
    ///     .unwrap();
    /// assert!(request.headers.contains_key("x-request-id"));
    /// ```
    pub fn header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        let name = HeaderName::try_from(name.as_ref());
        let value = HeaderValue::try_from(value.as_ref());
        match (name, value) {
            (Ok(name), Ok(value)) => {
                self.headers.insert(name, value);
            }
            (Err(e), _) => self.fail(TestError::InvalidHeader(e.to_string())),
            (_, Err(e)) => self.fail(TestError::InvalidHeader(e.to_string())),
        }
        self
    }

    /// Sets a typed header.
    pub fn header_typed(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Sets the `Content-Type` header.
    pub fn content_type(self, content_type: impl AsRef<str>) -> Self {
        self.header(header::CONTENT_TYPE.as_str(), content_type)
    }

    /// Sets the `Authorization` header to a bearer token.
    pub fn bearer_token(self, token: impl AsRef<str>) -> Self {
        self.header(
            header::AUTHORIZATION.as_str(),
            format!("Bearer {}", token.as_ref()),
        )
    }

    /// Sets the raw body.
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Sets a JSON body and the matching `Content-Type`.
    pub fn json<T: Serialize + ?Sized>(mut self, value: &T) -> Self {
        match serde_json::to_vec(value) {
            Ok(bytes) => self.body = Some(Bytes::from(bytes)),
            Err(e) => self.fail(e.into()),
        }
        self.content_type("application/json")
    }

    fn fail(&mut self, error: TestError) {
        if self.error.is_none() {
            self.error = Some(error);
        }
    }

    /// Builds the request.
    pub fn build(self) -> Result<TestRequest, TestError> {
        if let Some(error) = self.error {
            return Err(error);
        }
        let needs_target = !matches!(self.origin, Origin::Cli(_));
        if needs_target && self.target.trim().is_empty() {
            return Err(TestError::InvalidTarget("target is empty".to_string()));
        }
        Ok(TestRequest {
            origin: self.origin,
            target: self.target,
            headers: self.headers,
            body: self.body.unwrap_or_default(),
        })
    }
}
