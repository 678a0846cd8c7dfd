//! The span-emitting test reporter.

use opentelemetry::Context;
use opentelemetry::KeyValue;
use opentelemetry::global::{self, BoxedTracer};
use opentelemetry::trace::{TraceContextExt, Tracer, TracerProvider};

use tracewire_core::Clock;
use tracewire_core::attributes::test as attrs;

use crate::example::{ExampleInfo, ExampleResult, FailureKind};
use crate::stack::SpanStack;

/// Instrumentation scope name for reporter spans.
pub const SCOPE_NAME: &str = "tracewire-report";

/// Default name for the root suite span.
pub const DEFAULT_SUITE_NAME: &str = "test suite";

/// The lifecycle callbacks a host test runner drives.
///
/// The host must deliver well-nested start/finish pairs: every start's
/// matching finish arrives after all descendant pairs. The reporter does
/// not validate this and will close the wrong span if the host violates
/// it.
pub trait LifecycleObserver {
    fn on_suite_start(&mut self);
    fn on_suite_stop(&mut self);
    fn on_group_start(&mut self, description: &str);
    fn on_group_finish(&mut self);
    fn on_example_start(&mut self, example: &ExampleInfo);
    fn on_example_finish(&mut self, result: &ExampleResult);
}

/// Emits one span per suite, group, and example, nested to mirror the
/// runner's call nesting.
///
/// Spans are stamped with times from the injected [`Clock`], so a fixed
/// clock yields fully deterministic span data in tests.
pub struct SpanReporter<T: Tracer = BoxedTracer>
where
    T::Span: Send + Sync + 'static,
{
    tracer: T,
    suite_name: String,
    clock: Clock,
    stack: SpanStack,
}

impl SpanReporter<BoxedTracer> {
    /// Build a reporter against the globally installed tracer provider.
    #[must_use]
    pub fn from_global(clock: Clock) -> Self {
        Self::new(global::tracer(SCOPE_NAME), clock)
    }
}

impl<T: Tracer> SpanReporter<T>
where
    T::Span: Send + Sync + 'static,
{
    pub fn new(tracer: T, clock: Clock) -> Self {
        Self {
            tracer,
            suite_name: DEFAULT_SUITE_NAME.to_string(),
            clock,
            stack: SpanStack::new(),
        }
    }

    /// Override the root span's name.
    #[must_use]
    pub fn with_suite_name(mut self, suite_name: impl Into<String>) -> Self {
        self.suite_name = suite_name.into();
        self
    }

    /// Number of currently open scopes.
    #[must_use]
    pub fn open_scopes(&self) -> usize {
        self.stack.depth()
    }

    fn start_scope(&mut self, name: String, attributes: Vec<KeyValue>) {
        let span = self
            .tracer
            .span_builder(name)
            .with_start_time(self.clock.now())
            .with_attributes(attributes)
            .start(&self.tracer);
        self.stack.push(Context::current_with_span(span));
    }
}

impl<T: Tracer> LifecycleObserver for SpanReporter<T>
where
    T::Span: Send + Sync + 'static,
{
    fn on_suite_start(&mut self) {
        self.start_scope(self.suite_name.clone(), Vec::new());
    }

    fn on_suite_stop(&mut self) {
        self.stack.pop_and_finalize(self.clock.now(), |_| {});
    }

    fn on_group_start(&mut self, description: &str) {
        self.start_scope(description.to_string(), Vec::new());
    }

    fn on_group_finish(&mut self) {
        self.stack.pop_and_finalize(self.clock.now(), |_| {});
    }

    fn on_example_start(&mut self, example: &ExampleInfo) {
        let mut attributes = vec![
            KeyValue::new(attrs::LOCATION, example.location.clone()),
            KeyValue::new(attrs::FULL_DESCRIPTION, example.full_description.clone()),
        ];
        if let Some(described_class) = &example.described_class {
            attributes.push(KeyValue::new(attrs::DESCRIBED_CLASS, described_class.clone()));
        }
        self.start_scope(example.description.clone(), attributes);
    }

    fn on_example_finish(&mut self, result: &ExampleResult) {
        self.stack.pop_and_finalize(self.clock.now(), |span| {
            span.set_attribute(KeyValue::new(attrs::RESULT, result.status.as_str()));

            if let Some(failure) = &result.exception {
                span.record_error(failure);
                if failure.kind == FailureKind::Assertion {
                    span.set_attribute(KeyValue::new(attrs::MESSAGE, failure.message.clone()));
                }
            }
        });
    }
}

/// Install a reporter against the given tracer provider.
///
/// This is the explicit registration call a host performs; the returned
/// reporter is then driven through [`LifecycleObserver`].
pub fn register<P>(provider: &P, clock: Clock) -> SpanReporter<P::Tracer>
where
    P: TracerProvider,
    <P::Tracer as Tracer>::Span: Send + Sync + 'static,
{
    SpanReporter::new(provider.tracer(SCOPE_NAME), clock)
}
