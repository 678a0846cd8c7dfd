//! ECS resource detection.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::time::Duration;

use opentelemetry::KeyValue;
use opentelemetry_sdk::Resource;
use opentelemetry_sdk::resource::ResourceDetector;
use opentelemetry_semantic_conventions::attribute as semconv;

const METADATA_URI_V4: &str = "ECS_CONTAINER_METADATA_URI_V4";
const METADATA_URI: &str = "ECS_CONTAINER_METADATA_URI";

const CONTAINER_ID_LENGTH: usize = 64;
const DEFAULT_CGROUP_PATH: &str = "/proc/self/cgroup";

/// Detects whether the process runs in an AWS ECS container and, if so,
/// describes it.
///
/// Presence is decided by the ECS metadata-URI environment variables; the
/// container ID is pulled from the cgroup file using the trailing-64-chars
/// heuristic of the upstream detectors.
#[derive(Debug, Clone)]
pub struct EcsResourceDetector {
    cgroup_path: PathBuf,
}

impl EcsResourceDetector {
    #[must_use]
    pub fn new() -> Self {
        Self {
            cgroup_path: PathBuf::from(DEFAULT_CGROUP_PATH),
        }
    }

    /// Read the container ID from an alternative cgroup file.
    #[must_use]
    pub fn with_cgroup_path(path: impl Into<PathBuf>) -> Self {
        Self {
            cgroup_path: path.into(),
        }
    }

    fn resource_attributes(
        &self,
        env: &impl Fn(&str) -> Option<String>,
        container_name: Option<String>,
    ) -> Vec<KeyValue> {
        if env(METADATA_URI_V4).is_none() && env(METADATA_URI).is_none() {
            return Vec::new();
        }

        let mut attributes = vec![
            KeyValue::new(semconv::CLOUD_PROVIDER, "aws"),
            KeyValue::new(semconv::CLOUD_PLATFORM, "aws_ecs"),
            KeyValue::new(
                semconv::CONTAINER_NAME,
                container_name.unwrap_or_default(),
            ),
        ];
        match container_id(&self.cgroup_path) {
            Some(id) => attributes.push(KeyValue::new(semconv::CONTAINER_ID, id)),
            None => tracing::debug!(
                path = %self.cgroup_path.display(),
                "no container id found in cgroup file"
            ),
        }

        attributes.retain(|kv| !kv.value.as_str().is_empty());
        attributes
    }
}

impl Default for EcsResourceDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceDetector for EcsResourceDetector {
    fn detect(&self, _timeout: Duration) -> Resource {
        let container_name = hostname::get()
            .ok()
            .map(|name| name.to_string_lossy().into_owned());
        Resource::new(self.resource_attributes(&|key| std::env::var(key).ok(), container_name))
    }
}

/// Extract the container ID from a cgroup file: the trailing 64 characters
/// of the first line longer than 64 characters. A missing or unreadable
/// file yields `None`, never an error.
fn container_id(cgroup_path: &Path) -> Option<String> {
    let file = File::open(cgroup_path).ok()?;
    for line in BufReader::new(file).lines() {
        let line = line.ok()?;
        if line.len() > CONTAINER_ID_LENGTH {
            return line
                .get(line.len() - CONTAINER_ID_LENGTH..)
                .map(str::to_string);
        }
    }
    None
}
