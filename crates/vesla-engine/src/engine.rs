use std::collections::BTreeMap;

use crate::error::EngineError;

/// Abstraction over the container engine for testability.
///
/// Production code uses [`DockerEngine`](crate::docker::DockerEngine), tests
/// use mockall-generated mocks or in-memory fakes. Operations addressing a
/// missing container or network return [`EngineError::NotFound`].
#[allow(async_fn_in_trait)]
pub trait ContainerEngine: Send + Sync {
    /// Engine version string, used as a reachability check.
    async fn version(&self) -> Result<String, EngineError>;

    /// Build an image from an uncompressed tar context and tag it.
    ///
    /// Returns the image id. Intermediate containers are removed.
    async fn build_image(
        &self,
        tag: &str,
        labels: &BTreeMap<String, String>,
        context: Vec<u8>,
    ) -> Result<String, EngineError>;

    /// Remove dangling images. Returns how many were deleted.
    async fn prune_dangling_images(&self) -> Result<usize, EngineError>;

    async fn network_exists(&self, name: &str) -> Result<bool, EngineError>;

    async fn create_network(&self, name: &str) -> Result<(), EngineError>;

    /// Create (but do not start) a container. Returns the container id.
    async fn create_container(&self, spec: &ContainerSpec) -> Result<String, EngineError>;

    async fn start_container(&self, name: &str) -> Result<(), EngineError>;

    /// Stop with a grace period. Stopping a stopped container succeeds.
    async fn stop_container(&self, name: &str, timeout_secs: u64) -> Result<(), EngineError>;

    async fn remove_container(&self, name: &str) -> Result<(), EngineError>;

    /// `None` when no container has this name.
    async fn inspect_container(&self, name: &str) -> Result<Option<ContainerInfo>, EngineError>;

    /// Last `tail` lines of combined stdout/stderr, timestamp-prefixed.
    async fn container_logs(&self, name: &str, tail: usize) -> Result<String, EngineError>;

    /// All containers (running or not) carrying `label` (`key=value`).
    async fn list_containers(&self, label: &str) -> Result<Vec<ContainerInfo>, EngineError>;
}

/// Everything needed to create an app container.
#[derive(Debug, Clone, PartialEq)]
pub struct ContainerSpec {
    pub name: String,
    pub image: String,
    pub env: BTreeMap<String, String>,
    pub labels: BTreeMap<String, String>,
    /// Memory limit in bytes.
    pub memory: Option<i64>,
    /// CPU quota in units of 1e-9 CPUs.
    pub nano_cpus: i64,
    pub network: String,
}

/// Engine-side view of a container.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContainerInfo {
    pub id: String,
    pub name: String,
    pub state: String,
    pub image: String,
    pub created: String,
    /// Published ports, e.g. `5000/tcp` or `0.0.0.0:8080->5000/tcp`.
    pub ports: Vec<String>,
    pub labels: BTreeMap<String, String>,
}

impl ContainerInfo {
    pub fn is_running(&self) -> bool {
        self.state == "running"
    }

    /// First 12 characters of the id, as shown by `docker ps`.
    pub fn short_id(&self) -> &str {
        short_id(&self.id)
    }
}

pub fn short_id(id: &str) -> &str {
    let id = id.strip_prefix("sha256:").unwrap_or(id);
    id.get(..12).unwrap_or(id)
}
