//! Tracer pipeline setup.
//!
//! This module wires the OpenTelemetry tracer provider into the `tracing`
//! subscriber stack. Resource attributes describing the runtime environment
//! (for example the detectors in `tracewire-aws`) are passed in by the
//! caller and attached to every exported span.

use opentelemetry::trace::TracerProvider as _;
use opentelemetry_sdk::Resource;
use opentelemetry_sdk::trace::{Sampler, TracerProvider};
use serde::{Deserialize, Serialize};
use tracing_subscriber::Registry;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Configuration for the tracer pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TracerConfig {
    /// Service name for spans.
    pub service_name: String,
    /// Service version for spans.
    pub service_version: String,
    /// Sample rate (0.0 to 1.0), applied parent-based.
    pub sample_rate: f64,
}

impl Default for TracerConfig {
    fn default() -> Self {
        Self {
            service_name: "tracewire".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            sample_rate: 1.0,
        }
    }
}

/// Error type for tracer initialization.
#[derive(Debug, thiserror::Error)]
pub enum TracerError {
    /// Failed to set global subscriber.
    #[error("failed to set global subscriber: {0}")]
    SetGlobalSubscriber(#[from] tracing_subscriber::util::TryInitError),
}

/// Guard that shuts down tracing when dropped.
///
/// Holds the OpenTelemetry tracer provider and flushes pending spans on
/// drop.
pub struct TracingGuard {
    provider: Option<TracerProvider>,
}

impl TracingGuard {
    /// Shutdown the tracer and flush pending spans.
    pub fn shutdown(&mut self) {
        if let Some(provider) = self.provider.take()
            && let Err(e) = provider.shutdown()
        {
            tracing::warn!("failed to shutdown tracer provider: {e}");
        }
    }
}

impl Drop for TracingGuard {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Initialize the global tracing subscriber with OpenTelemetry.
///
/// `resource` carries the static attributes describing this process (see
/// the `tracewire-aws` detectors). Returns a guard that must be kept alive
/// for the duration of the program; dropping it shuts tracing down and
/// flushes pending spans.
///
/// # Errors
///
/// Returns an error if the global subscriber has already been set.
pub fn init_tracing(config: TracerConfig, resource: Resource) -> Result<TracingGuard, TracerError> {
    let sampler = Sampler::ParentBased(Box::new(Sampler::TraceIdRatioBased(config.sample_rate)));

    let provider = TracerProvider::builder()
        .with_simple_exporter(opentelemetry_stdout::SpanExporter::default())
        .with_sampler(sampler)
        .with_resource(resource)
        .build();

    let tracer = provider.tracer(config.service_name.clone());
    let otel_layer = tracing_opentelemetry::layer().with_tracer(tracer);

    let subscriber = Registry::default()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(otel_layer);

    subscriber.try_init()?;

    Ok(TracingGuard {
        provider: Some(provider),
    })
}
