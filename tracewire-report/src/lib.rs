//! Test-runner instrumentation that mirrors suite, group, and example
//! lifecycle events as nested OpenTelemetry spans.
//!
//! A host test runner drives a [`SpanReporter`] through the
//! [`LifecycleObserver`] callbacks. Every start event opens a span and makes
//! it the ambient context; every matching finish event closes the most
//! recently opened span, so span nesting mirrors the runner's call nesting.

pub mod example;
pub mod reporter;
pub mod stack;

pub use example::{ExampleFailure, ExampleInfo, ExampleResult, ExampleStatus, FailureKind};
pub use reporter::{LifecycleObserver, SpanReporter};
pub use stack::SpanStack;
