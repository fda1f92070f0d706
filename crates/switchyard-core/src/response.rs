//! Dispatch responses.
//!
//! A [`Response`] is what every handler, error handler and middleware stage
//! produces. The body is text so layouts can wrap it; responses marked
//! [`Response::is_raw`] (JSON, redirects) skip layout composition.

use http::header::{self, HeaderName, HeaderValue};
use http::{HeaderMap, StatusCode};
use serde::Serialize;

/// Content type for HTML pages.
pub const TEXT_HTML: &str = "text/html; charset=utf-8";
/// Content type for plain text.
pub const TEXT_PLAIN: &str = "text/plain; charset=utf-8";
/// Content type for JSON.
pub const APPLICATION_JSON: &str = "application/json";

/// The outcome of dispatching one event.
///
/// # Example
///
/// ```
/// use switchyard_core::Response;
/// use http::StatusCode;
///
/// let page = Response::html("<h1>Shelves</h1>");
/// assert_eq!(page.status(), StatusCode::OK);
/// assert!(!page.is_raw());
///
/// let api = Response::json(&serde_json::json!({"id": 7})).unwrap();
/// assert!(api.is_raw());
/// assert_eq!(api.body(), r#"{"id":7}"#);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    body: String,
    raw: bool,
}

impl Default for Response {
    fn default() -> Self {
        Self::new(StatusCode::OK, String::new())
    }
}

impl Response {
    /// A response with the given status and body and no content type.
    #[must_use]
    pub fn new(status: StatusCode, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
            raw: false,
        }
    }

    /// `200 OK` with an HTML body.
    #[must_use]
    pub fn html(body: impl Into<String>) -> Self {
        Self::new(StatusCode::OK, body).with_content_type(TEXT_HTML)
    }

    /// `200 OK` with a plain-text body.
    #[must_use]
    pub fn text(body: impl Into<String>) -> Self {
        Self::new(StatusCode::OK, body).with_content_type(TEXT_PLAIN)
    }

    /// `200 OK` with a JSON body. Never wrapped in a layout.
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error if `value` cannot be serialized.
    pub fn json<T: Serialize + ?Sized>(value: &T) -> serde_json::Result<Self> {
        let body = serde_json::to_string(value)?;
        Ok(Self::new(StatusCode::OK, body)
            .with_content_type(APPLICATION_JSON)
            .raw())
    }

    /// `204 No Content`.
    #[must_use]
    pub fn no_content() -> Self {
        Self::new(StatusCode::NO_CONTENT, String::new()).raw()
    }

    /// `303 See Other` to `location`.
    #[must_use]
    pub fn redirect(location: &str) -> Self {
        let mut response = Self::new(StatusCode::SEE_OTHER, String::new()).raw();
        if let Ok(value) = HeaderValue::from_str(location) {
            response.headers.insert(header::LOCATION, value);
        }
        response
    }

    /// Sets the status.
    #[must_use]
    pub const fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    /// Sets a header, replacing previous values.
    #[must_use]
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    fn with_content_type(self, content_type: &'static str) -> Self {
        self.with_header(
            header::CONTENT_TYPE,
            HeaderValue::from_static(content_type),
        )
    }

    /// Marks the response as final content that layouts must not wrap.
    #[must_use]
    pub const fn raw(mut self) -> Self {
        self.raw = true;
        self
    }

    /// Status code.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Mutable status code.
    pub fn status_mut(&mut self) -> &mut StatusCode {
        &mut self.status
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

    /// Header value as a string, if present and valid UTF-8.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Body text.
    #[must_use]
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Replaces the body.
    pub fn set_body(&mut self, body: impl Into<String>) {
        self.body = body.into();
    }

    /// Takes the body, leaving it empty.
    pub fn take_body(&mut self) -> String {
        std::mem::take(&mut self.body)
    }

    /// Returns true if layouts must not wrap this response.
    #[must_use]
    pub const fn is_raw(&self) -> bool {
        self.raw
    }

    /// Converts into an `http::Response` for embedding in a server.
    #[must_use]
    pub fn into_http(self) -> http::Response<String> {
        let mut response = http::Response::new(self.body);
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_types() {
        assert_eq!(Response::html("x").header("content-type"), Some(TEXT_HTML));
        assert_eq!(Response::text("x").header("content-type"), Some(TEXT_PLAIN));
        assert_eq!(
            Response::json(&[1, 2]).unwrap().header("content-type"),
            Some(APPLICATION_JSON)
        );
    }

    #[test]
    fn test_redirect() {
        let response = Response::redirect("/books/7");
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.header("location"), Some("/books/7"));
        assert!(response.is_raw());
    }

    #[test]
    fn test_take_body() {
        let mut response = Response::html("<p>hi</p>");
        assert_eq!(response.take_body(), "<p>hi</p>");
        assert_eq!(response.body(), "");
    }

    #[test]
    fn test_into_http() {
        let response = Response::text("gone").with_status(StatusCode::GONE);
        let http = response.into_http();
        assert_eq!(http.status(), StatusCode::GONE);
        assert_eq!(http.body(), "gone");
        assert!(http.headers().contains_key(header::CONTENT_TYPE));
    }
}
