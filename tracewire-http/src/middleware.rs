//! Request-tracing middleware for axum.

use std::sync::Arc;

use axum::extract::{Extension, MatchedPath, Request};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::Response;
use opentelemetry::global::{self, BoxedTracer};
use opentelemetry::propagation::TextMapPropagator;
use opentelemetry::trace::{
    FutureExt, SpanKind, Status, TraceContextExt, Tracer, TracerProvider,
};
use opentelemetry::{Context, KeyValue};
use opentelemetry_http::HeaderExtractor;
use opentelemetry_sdk::propagation::TraceContextPropagator;
use serde::{Deserialize, Serialize};
use url::Url;

use tracewire_core::attributes::http as attrs;

/// Instrumentation scope name for server spans.
pub const SCOPE_NAME: &str = "tracewire-http";

/// Middleware configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HttpTraceConfig {
    /// When a matched route is present, rewrite the recorded URL's path to
    /// the route template so dynamic segments (`/users/42`) are not
    /// recorded verbatim.
    #[serde(default)]
    pub enable_route_parameter_obfuscation: bool,
}

/// Shared state for [`trace_middleware`], installed as an axum `Extension`.
#[derive(Clone)]
pub struct HttpTraceLayer {
    tracer: Arc<BoxedTracer>,
    propagator: Arc<dyn TextMapPropagator + Send + Sync>,
    config: HttpTraceConfig,
}

impl HttpTraceLayer {
    /// Build a layer against the globally installed tracer provider.
    #[must_use]
    pub fn new(config: HttpTraceConfig) -> Self {
        Self::with_tracer(global::tracer(SCOPE_NAME), config)
    }

    /// Build a layer with an explicit tracer.
    #[must_use]
    pub fn with_tracer(tracer: BoxedTracer, config: HttpTraceConfig) -> Self {
        Self {
            tracer: Arc::new(tracer),
            propagator: Arc::new(TraceContextPropagator::new()),
            config,
        }
    }

    /// Build a layer against a specific tracer provider.
    #[must_use]
    pub fn with_provider<P>(provider: &P, config: HttpTraceConfig) -> Self
    where
        P: TracerProvider,
        P::Tracer: Send + Sync + 'static,
        <P::Tracer as Tracer>::Span: Send + Sync + 'static,
    {
        Self::with_tracer(
            BoxedTracer::new(Box::new(provider.tracer(SCOPE_NAME))),
            config,
        )
    }

    /// Replace the context-extraction strategy (default: W3C tracecontext).
    #[must_use]
    pub fn with_propagator(
        mut self,
        propagator: impl TextMapPropagator + Send + Sync + 'static,
    ) -> Self {
        self.propagator = Arc::new(propagator);
        self
    }
}

/// Wrap request handling in a server span.
///
/// The span starts before the downstream handler and is named after the raw
/// path; once the handler returns, it is renamed to the matched route (when
/// axum exposes one) and annotated with route, URL, and status attributes.
/// The response passes through unchanged.
pub async fn trace_middleware(
    Extension(layer): Extension<HttpTraceLayer>,
    request: Request,
    next: Next,
) -> Response {
    let parent_cx = layer
        .propagator
        .extract(&HeaderExtractor(request.headers()));

    let method = request.method().clone();
    let target = request.uri().to_string();
    let path = request.uri().path().to_string();
    let matched_route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|matched| matched.as_str().to_string());

    let span = layer
        .tracer
        .span_builder(path)
        .with_kind(SpanKind::Server)
        .with_attributes([
            KeyValue::new(attrs::HTTP_METHOD, method.to_string()),
            KeyValue::new(attrs::HTTP_URL, target.clone()),
        ])
        .start_with_context(&*layer.tracer, &parent_cx);
    let cx = parent_cx.with_span(span);

    // Ends the span marked as an error if the request future is dropped or
    // the handler panics before we finish it below.
    let guard = ServerSpanGuard::new(cx.clone());

    let response = next.run(request).with_context(cx.clone()).await;

    let span = cx.span();
    if let Some(route) = &matched_route {
        let route_label = format!("{method} {route}");
        if let Some(route_token) = route_label.split_whitespace().last() {
            span.set_attribute(KeyValue::new(attrs::HTTP_ROUTE, route_token.to_string()));
        }
        span.update_name(route_label);

        if layer.config.enable_route_parameter_obfuscation {
            span.set_attribute(KeyValue::new(
                attrs::HTTP_URL,
                obfuscate_url_path(&target, route),
            ));
        }
    }
    span.set_attribute(KeyValue::new(
        attrs::HTTP_STATUS_CODE,
        i64::from(response.status().as_u16()),
    ));
    span.set_status(status_from_http(response.status()));
    guard.finish();

    response
}

/// Map an HTTP status to a span status: error for 5xx, unset otherwise.
fn status_from_http(status: StatusCode) -> Status {
    if status.is_server_error() {
        Status::error(status.canonical_reason().unwrap_or("server error"))
    } else {
        Status::Unset
    }
}

/// Replace the path component of a recorded URL with the route template,
/// preserving scheme, host, and query. Origin-form request targets (no
/// scheme/host) keep their query string.
fn obfuscate_url_path(url: &str, route: &str) -> String {
    match Url::parse(url) {
        Ok(mut parsed) => {
            parsed.set_path(route);
            parsed.to_string()
        }
        Err(_) => match url.split_once('?') {
            Some((_, query)) => format!("{route}?{query}"),
            None => route.to_string(),
        },
    }
}

struct ServerSpanGuard {
    cx: Context,
    finished: bool,
}

impl ServerSpanGuard {
    fn new(cx: Context) -> Self {
        Self {
            cx,
            finished: false,
        }
    }

    fn finish(mut self) {
        self.cx.span().end();
        self.finished = true;
    }
}

impl Drop for ServerSpanGuard {
    fn drop(&mut self) {
        if !self.finished {
            tracing::debug!("request span dropped before completing; ending as error");
            let span = self.cx.span();
            span.set_status(Status::error("request handling did not complete"));
            span.end();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderName, HeaderValue};
    use axum::routing::get;
    use axum::{Router, middleware};
    use axum_test::TestServer;
    use opentelemetry::Value;
    use opentelemetry::trace::{SpanId, TraceId};
    use opentelemetry_sdk::export::trace::SpanData;
    use opentelemetry_sdk::testing::trace::InMemorySpanExporter;
    use opentelemetry_sdk::trace::TracerProvider as SdkTracerProvider;

    fn test_layer(config: HttpTraceConfig) -> (InMemorySpanExporter, HttpTraceLayer) {
        let exporter = InMemorySpanExporter::default();
        let provider = SdkTracerProvider::builder()
            .with_simple_exporter(exporter.clone())
            .build();
        (exporter.clone(), HttpTraceLayer::with_provider(&provider, config))
    }

    fn traced_router(layer: HttpTraceLayer) -> Router {
        Router::new()
            .route("/users/:id", get(|| async { "user" }))
            .route("/boom", get(|| async { StatusCode::SERVICE_UNAVAILABLE }))
            .layer(middleware::from_fn(trace_middleware))
            .layer(Extension(layer))
    }

    // The SDK appends on set_attribute, so the last occurrence of a key is
    // the effective value.
    fn attr<'a>(span: &'a SpanData, key: &str) -> Option<&'a Value> {
        span.attributes
            .iter()
            .rev()
            .find(|kv| kv.key.as_str() == key)
            .map(|kv| &kv.value)
    }

    #[tokio::test]
    async fn request_produces_a_server_span_named_after_the_route() {
        let (exporter, layer) = test_layer(HttpTraceConfig::default());
        let server = TestServer::new(traced_router(layer)).unwrap();

        server.get("/users/42").await.assert_status_ok();

        let spans = exporter.get_finished_spans().unwrap();
        assert_eq!(spans.len(), 1);
        let span = &spans[0];

        assert_eq!(span.name, "GET /users/:id");
        assert_eq!(span.span_kind, SpanKind::Server);
        assert_eq!(attr(span, "http.method").unwrap().as_str(), "GET");
        assert_eq!(attr(span, "http.route").unwrap().as_str(), "/users/:id");
        assert_eq!(attr(span, "http.url").unwrap().as_str(), "/users/42");
        assert_eq!(
            attr(span, "http.status_code").unwrap(),
            &Value::I64(200)
        );
        assert_eq!(span.status, Status::Unset);
    }

    #[tokio::test]
    async fn obfuscation_rewrites_the_recorded_url_path() {
        let (exporter, layer) = test_layer(HttpTraceConfig {
            enable_route_parameter_obfuscation: true,
        });
        let server = TestServer::new(traced_router(layer)).unwrap();

        server.get("/users/42").await.assert_status_ok();

        let spans = exporter.get_finished_spans().unwrap();
        let span = &spans[0];
        assert_eq!(span.name, "GET /users/:id");
        assert_eq!(attr(span, "http.url").unwrap().as_str(), "/users/:id");
        assert_eq!(attr(span, "http.route").unwrap().as_str(), "/users/:id");
    }

    #[tokio::test]
    async fn server_errors_mark_the_span_status() {
        let (exporter, layer) = test_layer(HttpTraceConfig::default());
        let server = TestServer::new(traced_router(layer)).unwrap();

        let response = server.get("/boom").await;
        response.assert_status(StatusCode::SERVICE_UNAVAILABLE);

        let spans = exporter.get_finished_spans().unwrap();
        let span = &spans[0];
        assert_eq!(
            attr(span, "http.status_code").unwrap(),
            &Value::I64(503)
        );
        assert!(matches!(span.status, Status::Error { .. }));
    }

    #[tokio::test]
    async fn client_errors_leave_the_span_status_unset() {
        let (exporter, layer) = test_layer(HttpTraceConfig::default());
        let server = TestServer::new(traced_router(layer)).unwrap();

        let response = server.get("/missing").await;
        response.assert_status(StatusCode::NOT_FOUND);

        let spans = exporter.get_finished_spans().unwrap();
        let span = &spans[0];
        // No matched route: the span keeps the raw-path name.
        assert_eq!(span.name, "/missing");
        assert!(attr(span, "http.route").is_none());
        assert_eq!(span.status, Status::Unset);
    }

    #[tokio::test]
    async fn propagated_context_parents_the_server_span() {
        let (exporter, layer) = test_layer(HttpTraceConfig::default());
        let server = TestServer::new(traced_router(layer)).unwrap();

        server
            .get("/users/42")
            .add_header(
                HeaderName::from_static("traceparent"),
                HeaderValue::from_static(
                    "00-0af7651916cd43dd8448eb211c80319c-b7ad6b7169203331-01",
                ),
            )
            .await
            .assert_status_ok();

        let spans = exporter.get_finished_spans().unwrap();
        let span = &spans[0];
        assert_eq!(
            span.span_context.trace_id(),
            TraceId::from_hex("0af7651916cd43dd8448eb211c80319c").unwrap()
        );
        assert_eq!(
            span.parent_span_id,
            SpanId::from_hex("b7ad6b7169203331").unwrap()
        );
    }

    #[tokio::test]
    async fn dropped_request_still_ends_the_span_as_an_error() {
        let (exporter, layer) = test_layer(HttpTraceConfig::default());

        let span = layer
            .tracer
            .span_builder("GET /slow")
            .with_kind(SpanKind::Server)
            .start_with_context(&*layer.tracer, &Context::new());
        let guard = ServerSpanGuard::new(Context::new().with_span(span));
        drop(guard);

        let spans = exporter.get_finished_spans().unwrap();
        assert_eq!(spans.len(), 1);
        assert!(matches!(spans[0].status, Status::Error { .. }));
    }

    #[test]
    fn obfuscate_preserves_scheme_host_and_query() {
        assert_eq!(
            obfuscate_url_path("http://example.com/users/42?page=2", "/users/:id"),
            "http://example.com/users/:id?page=2"
        );
    }

    #[test]
    fn obfuscate_handles_origin_form_targets() {
        assert_eq!(obfuscate_url_path("/users/42", "/users/:id"), "/users/:id");
        assert_eq!(
            obfuscate_url_path("/users/42?x=1", "/users/:id"),
            "/users/:id?x=1"
        );
    }
}
