//! Lambda resource detection.

use std::time::Duration;

use opentelemetry::KeyValue;
use opentelemetry_sdk::Resource;
use opentelemetry_sdk::resource::ResourceDetector;
use opentelemetry_semantic_conventions::attribute as semconv;

const FUNCTION_NAME: &str = "AWS_LAMBDA_FUNCTION_NAME";
const FUNCTION_VERSION: &str = "AWS_LAMBDA_FUNCTION_VERSION";

/// Detects whether the process runs inside an AWS Lambda function and, if
/// so, describes it. Presence is decided by the function-name environment
/// variable.
#[derive(Debug, Clone, Copy, Default)]
pub struct LambdaResourceDetector;

impl LambdaResourceDetector {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn resource_attributes(env: &impl Fn(&str) -> Option<String>) -> Vec<KeyValue> {
        let Some(function_name) = env(FUNCTION_NAME) else {
            return Vec::new();
        };

        let mut attributes = vec![
            KeyValue::new(semconv::CLOUD_PROVIDER, "aws"),
            KeyValue::new(semconv::CLOUD_PLATFORM, "aws_lambda"),
            KeyValue::new(semconv::FAAS_NAME, function_name),
            KeyValue::new(
                semconv::FAAS_VERSION,
                env(FUNCTION_VERSION).unwrap_or_default(),
            ),
        ];

        attributes.retain(|kv| !kv.value.as_str().is_empty());
        attributes
    }
}

impl ResourceDetector for LambdaResourceDetector {
    fn detect(&self, _timeout: Duration) -> Resource {
        Resource::new(Self::resource_attributes(&|key| std::env::var(key).ok()))
    }
}
