//! AWS environment resource detectors.
//!
//! Each detector inspects process environment variables (and, for ECS, the
//! container's cgroup file) and returns a `Resource` describing the managed
//! runtime the process is executing in. Outside the target environment a
//! detector returns an empty `Resource`; that is the normal path, not an
//! error.

pub mod ecs;
pub mod lambda;

pub use ecs::EcsResourceDetector;
pub use lambda::LambdaResourceDetector;
