//! axum middleware that wraps request handling in an OpenTelemetry server
//! span.
//!
//! Each request gets a `SpanKind::Server` span parented under any trace
//! context propagated in the request headers. After the handler runs, the
//! span is renamed to the matched route, annotated with route and status
//! attributes, and finished exactly once on every exit path.

pub mod middleware;

pub use middleware::{HttpTraceConfig, HttpTraceLayer, trace_middleware};
