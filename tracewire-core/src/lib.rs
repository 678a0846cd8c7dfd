//! Shared observability plumbing for the tracewire instrumentation shims.
//!
//! This crate provides:
//! - An injectable [`Clock`] so instrumentation timestamps are testable
//! - Standard span attribute names used across the shims
//! - Tracer pipeline initialization with OpenTelemetry export

pub mod attributes;
pub mod clock;
pub mod init;

pub use clock::Clock;
pub use init::{TracerConfig, TracerError, TracingGuard, init_tracing};
