//! Metadata the host test runner supplies with lifecycle events.

use std::error::Error;
use std::fmt;

/// Static description of a single test example, available when it starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExampleInfo {
    /// Short description, used as the span name.
    pub description: String,
    /// Description including all enclosing group descriptions.
    pub full_description: String,
    /// Source location, e.g. `spec/math_spec.rb:10`.
    pub location: String,
    /// The class or type under test, when the runner knows one.
    pub described_class: Option<String>,
}

impl ExampleInfo {
    pub fn new(
        description: impl Into<String>,
        full_description: impl Into<String>,
        location: impl Into<String>,
    ) -> Self {
        Self {
            description: description.into(),
            full_description: full_description.into(),
            location: location.into(),
            described_class: None,
        }
    }

    #[must_use]
    pub fn with_described_class(mut self, described_class: impl Into<String>) -> Self {
        self.described_class = Some(described_class.into());
        self
    }
}

/// Outcome of an example.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExampleStatus {
    Passed,
    Failed,
    Pending,
}

impl ExampleStatus {
    /// The status string recorded as the span's `result` attribute.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Passed => "passed",
            Self::Failed => "failed",
            Self::Pending => "pending",
        }
    }
}

impl fmt::Display for ExampleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How an example failed.
///
/// Assertion failures carry a human-readable expectation message that is
/// worth surfacing as a span attribute; other errors are only recorded as
/// exception events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// An expectation/assertion was not met.
    Assertion,
    /// Any other error raised while running the example.
    Error,
}

/// The exception attached to a failed example.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExampleFailure {
    pub message: String,
    pub kind: FailureKind,
}

impl ExampleFailure {
    pub fn assertion(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind: FailureKind::Assertion,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind: FailureKind::Error,
        }
    }
}

impl fmt::Display for ExampleFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl Error for ExampleFailure {}

/// Execution result the runner reports when an example finishes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExampleResult {
    pub status: ExampleStatus,
    pub exception: Option<ExampleFailure>,
}

impl ExampleResult {
    #[must_use]
    pub fn passed() -> Self {
        Self {
            status: ExampleStatus::Passed,
            exception: None,
        }
    }

    #[must_use]
    pub fn pending() -> Self {
        Self {
            status: ExampleStatus::Pending,
            exception: None,
        }
    }

    #[must_use]
    pub fn failed(exception: ExampleFailure) -> Self {
        Self {
            status: ExampleStatus::Failed,
            exception: Some(exception),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_strings_match_runner_vocabulary() {
        assert_eq!(ExampleStatus::Passed.as_str(), "passed");
        assert_eq!(ExampleStatus::Failed.as_str(), "failed");
        assert_eq!(ExampleStatus::Pending.as_str(), "pending");
    }

    #[test]
    fn failure_is_a_std_error() {
        let failure = ExampleFailure::assertion("expected 1 to eq 2");
        let err: &dyn Error = &failure;
        assert_eq!(err.to_string(), "expected 1 to eq 2");
    }

    #[test]
    fn failed_result_carries_the_exception() {
        let result = ExampleResult::failed(ExampleFailure::error("boom"));
        assert_eq!(result.status, ExampleStatus::Failed);
        assert_eq!(result.exception.unwrap().kind, FailureKind::Error);
    }

    #[test]
    fn example_info_builder_sets_described_class() {
        let info = ExampleInfo::new("adds numbers", "Calculator adds numbers", "spec/math.rs:10")
            .with_described_class("Calculator");
        assert_eq!(info.described_class.as_deref(), Some("Calculator"));
    }
}
