//! In-memory test client.

use crate::error::TestError;
use crate::request::{Origin, TestRequest, TestRequestBuilder};
use crate::response::TestResponse;
use bytes::Bytes;
use http::Method;
use serde::Serialize;
use switchyard::{App, AppBuilder};
use tokio_util::sync::CancellationToken;

/// Drives events through an [`App`] without a transport.
///
/// Every event runs the full dispatch: lifecycle hooks, routing, bindings,
/// middleware, error mappings and layouts.
///
/// # Example
///
/// ```
/// use switchyard::prelude::*;
/// use switchyard_test::TestClient;
///
/// # tokio_test::block_on(async {
/// let client = TestClient::build(
///     App::builder().route(RouteDef::get("/books/:id", sync_handler(|ctx| {
///         Ok(Response::text(format!("book {}", ctx.param("id").unwrap_or_default())))
///     }))),
/// )
/// .unwrap();
///
/// client
///     .get("/books/7")
///     .send()
///     .await
///     .assert_success()
///     .assert_body_eq("book 7");
/// # });
/// ```
#[must_use]
#[derive(Debug, Clone)]
pub struct TestClient {
    app: App,
    default_headers: Vec<(String, String)>,
}

impl TestClient {
    /// Wraps an assembled application.
    pub fn new(app: App) -> Self {
        Self {
            app,
            default_headers: Vec::new(),
        }
    }

    /// Assembles `builder` and wraps the result.
    pub fn build(builder: AppBuilder) -> Result<Self, TestError> {
        Ok(Self::new(builder.build()?))
    }

    /// Adds a header sent with every event.
    pub fn with_default_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.push((name.into(), value.into()));
        self
    }

    /// The wrapped application.
    #[must_use]
    pub fn app(&self) -> &App {
        &self.app
    }

    /// A `GET` request.
    pub fn get(&self, target: impl AsRef<str>) -> TestClientRequest<'_> {
        TestClientRequest::new(self, TestRequest::get(target))
    }

    /// A `POST` request.
    pub fn post(&self, target: impl AsRef<str>) -> TestClientRequest<'_> {
        TestClientRequest::new(self, TestRequest::post(target))
    }

    /// A `PUT` request.
    pub fn put(&self, target: impl AsRef<str>) -> TestClientRequest<'_> {
        TestClientRequest::new(self, TestRequest::put(target))
    }

    /// A `PATCH` request.
    pub fn patch(&self, target: impl AsRef<str>) -> TestClientRequest<'_> {
        TestClientRequest::new(self, TestRequest::patch(target))
    }

    /// A `DELETE` request.
    pub fn delete(&self, target: impl AsRef<str>) -> TestClientRequest<'_> {
        TestClientRequest::new(self, TestRequest::delete(target))
    }

    /// A request with any method.
    pub fn request(&self, method: Method, target: impl AsRef<str>) -> TestClientRequest<'_> {
        TestClientRequest::new(self, TestRequestBuilder::new(Origin::Http(method), target))
    }

    /// A browser navigation.
    pub fn navigate(&self, target: impl AsRef<str>) -> TestClientRequest<'_> {
        TestClientRequest::new(self, TestRequest::navigate(target))
    }

    /// A CLI invocation.
    pub fn cli<I, S>(&self, args: I) -> TestClientRequest<'_>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        TestClientRequest::new(self, TestRequest::cli(args))
    }

    async fn dispatch(
        &self,
        request: TestRequest,
        token: Option<CancellationToken>,
    ) -> TestResponse {
        let event = request.into_event();
        let response = match token {
            Some(token) => self.app.dispatch_with_cancellation(event, token).await,
            None => self.app.dispatch(event).await,
        };
        TestResponse::from_response(&response)
    }
}

/// A request bound to a [`TestClient`].
#[must_use]
pub struct TestClientRequest<'a> {
    client: &'a TestClient,
    builder: TestRequestBuilder,
    token: Option<CancellationToken>,
}

impl<'a> TestClientRequest<'a> {
    fn new(client: &'a TestClient, mut builder: TestRequestBuilder) -> Self {
        for (name, value) in &client.default_headers {
            builder = builder.header(name, value);
        }
        Self {
            client,
            builder,
            token: None,
        }
    }

    /// Sets a header.
    pub fn header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        self.builder = self.builder.header(name, value);
        self
    }

    /// Sets the `Authorization` header to a bearer token.
    pub fn bearer_token(mut self, token: impl AsRef<str>) -> Self {
        self.builder = self.builder.bearer_token(token);
        self
    }

    /// Sets the raw body.
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.builder = self.builder.body(body);
        self
    }

    /// Sets a JSON body.
    pub fn json<T: Serialize + ?Sized>(mut self, value: &T) -> Self {
        self.builder = self.builder.json(value);
        self
    }

    /// Dispatches under `token`, so the test can cancel mid-flight.
    pub fn cancellation(mut self, token: CancellationToken) -> Self {
        self.token = Some(token);
        self
    }

    /// Dispatches the event.
    ///
    /// # Panics
    ///
    /// Panics if the request could not be built; use
    /// [`try_send`](Self::try_send) to handle that case.
    pub async fn send(self) -> TestResponse {
        match self.try_send().await {
            Ok(response) => response,
            Err(e) => panic!("test request could not be built: {e}"),
        }
    }

    /// Dispatches the event, reporting build problems as errors.
    pub async fn try_send(self) -> Result<TestResponse, TestError> {
        let request = self.builder.build()?;
        Ok(self.client.dispatch(request, self.token).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::StatusCode;
    use serde_json::json;
    use std::time::Duration;
    use switchyard::prelude::*;

    fn echo_app() -> AppBuilder {
        App::builder()
            .route(RouteDef::any("/echo/*rest", sync_handler(|ctx| {
                let event = ctx.event();
                let auth = event
                    .headers()
                    .get("authorization")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("none");
                Response::json(&json!({
                    "kind": event.kind().as_str(),
                    "method": event.method().as_str(),
                    "path": event.path(),
                    "auth": auth,
                    "body": String::from_utf8_lossy(event.body()),
                }))
                .map_err(|e| DispatchError::internal("encode echo", e))
            })))
    }

    #[tokio::test]
    async fn test_methods_and_bodies() {
        let client = TestClient::build(echo_app()).unwrap();

        for (method, name) in [
            (Method::GET, "GET"),
            (Method::POST, "POST"),
            (Method::PUT, "PUT"),
            (Method::PATCH, "PATCH"),
            (Method::DELETE, "DELETE"),
        ] {
            client
                .request(method, "/echo/a/b")
                .send()
                .await
                .assert_success()
                .assert_json_field("method", &json!(name))
                .assert_json_field("path", &json!("/echo/a/b"));
        }

        client
            .post("/echo/books")
            .json(&json!({"title": "Dune"}))
            .send()
            .await
            .assert_json_field("body", &json!(r#"{"title":"Dune"}"#));
    }

    #[tokio::test]
    async fn test_default_headers_and_origins() {
        let client = TestClient::build(echo_app())
            .unwrap()
            .with_default_header("Authorization", "Bearer shelf");

        client
            .navigate("/echo/home")
            .send()
            .await
            .assert_json_field("kind", &json!("navigation"))
            .assert_json_field("auth", &json!("Bearer shelf"));

        client
            .cli(["echo", "status"])
            .send()
            .await
            .assert_json_field("kind", &json!("cli"))
            .assert_json_field("path", &json!("/echo/status"));
    }

    #[tokio::test]
    async fn test_try_send_reports_bad_headers() {
        let client = TestClient::build(echo_app()).unwrap();
        let err = client
            .get("/echo/x")
            .header("not a header", "v")
            .try_send()
            .await
            .unwrap_err();
        assert!(matches!(err, TestError::InvalidHeader(_)));
    }

    #[tokio::test]
    async fn test_build_surfaces_assembly_errors() {
        let builder = App::builder()
            .route(RouteDef::get("/a", sync_handler(|_| Ok(Response::text("1")))))
            .route(RouteDef::get("/a", sync_handler(|_| Ok(Response::text("2")))));
        assert!(matches!(
            TestClient::build(builder),
            Err(TestError::Assembly(_))
        ));
    }

    #[tokio::test]
    async fn test_cancelled_dispatch() {
        let client = TestClient::build(App::builder().route(RouteDef::get(
            "/slow",
            handler_fn(|_| {
                Box::pin(async {
                    tokio::time::sleep(Duration::from_secs(60)).await;
                    Ok(Response::text("late"))
                })
            }),
        )))
        .unwrap();

        let token = CancellationToken::new();
        token.cancel();
        client
            .get("/slow")
            .cancellation(token)
            .send()
            .await
            .assert_status(StatusCode::SERVICE_UNAVAILABLE)
            .assert_body_eq(switchyard::CANCELLED_BODY);
    }
}
