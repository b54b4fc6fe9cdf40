//! In-memory [`ContainerEngine`] and tarball helpers for tests in this
//! crate and in crates built on it.
//!
//! Gated by `#[cfg(any(test, feature = "test-utils"))]`.

use std::collections::{BTreeMap, BTreeSet};
use std::io::Read;
use std::sync::Mutex;
use std::time::Duration;

use flate2::Compression;
use flate2::write::GzEncoder;
use crate::{ContainerEngine, ContainerInfo, ContainerSpec, EngineError};

/// In-memory engine that behaves like a single Docker host.
#[derive(Default)]
pub struct FakeEngine {
    pub state: Mutex<FakeState>,
    /// Simulated build duration.
    pub build_delay: Option<Duration>,
    /// Build failure message to report instead of an image id.
    pub build_failure: Option<String>,
}

#[derive(Default)]
pub struct FakeState {
    pub containers: BTreeMap<String, ContainerInfo>,
    pub networks: BTreeSet<String>,
    pub images: BTreeMap<String, String>,
    pub builds: Vec<BuildCall>,
    pub created: Vec<ContainerSpec>,
    pub pruned: usize,
    next_id: u32,
}

#[derive(Debug, Clone)]
pub struct BuildCall {
    pub tag: String,
    pub labels: BTreeMap<String, String>,
    pub files: BTreeMap<String, String>,
}

impl FakeEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_network(name: &str) -> Self {
        let engine = Self::default();
        engine.state.lock().unwrap().networks.insert(name.to_owned());
        engine
    }

    pub fn containers(&self) -> BTreeMap<String, ContainerInfo> {
        self.state.lock().unwrap().containers.clone()
    }

    pub fn insert_container(&self, name: &str, image: &str, state: &str) {
        let mut s = self.state.lock().unwrap();
        let id = s.fresh_id();
        s.containers.insert(
            name.to_owned(),
            ContainerInfo {
                id,
                name: name.to_owned(),
                state: state.to_owned(),
                image: image.to_owned(),
                created: "2026-01-01T00:00:00Z".to_owned(),
                ..Default::default()
            },
        );
    }
}

impl FakeState {
    fn fresh_id(&mut self) -> String {
        self.next_id += 1;
        format!("{:064x}", self.next_id)
    }
}

fn not_found(resource: &str) -> EngineError {
    EngineError::NotFound {
        resource: resource.to_owned(),
    }
}

impl ContainerEngine for FakeEngine {
    async fn version(&self) -> Result<String, EngineError> {
        Ok("27.0.0-fake".to_owned())
    }

    async fn build_image(
        &self,
        tag: &str,
        labels: &BTreeMap<String, String>,
        context: Vec<u8>,
    ) -> Result<String, EngineError> {
        if let Some(delay) = self.build_delay {
            tokio::time::sleep(delay).await;
        }
        let mut s = self.state.lock().unwrap();
        s.builds.push(BuildCall {
            tag: tag.to_owned(),
            labels: labels.clone(),
            files: read_tar(&context),
        });
        if let Some(message) = &self.build_failure {
            return Err(EngineError::BuildFailed {
                message: message.clone(),
            });
        }
        let id = format!("sha256:{}", s.fresh_id());
        s.images.insert(tag.to_owned(), id.clone());
        Ok(id)
    }

    async fn prune_dangling_images(&self) -> Result<usize, EngineError> {
        self.state.lock().unwrap().pruned += 1;
        Ok(0)
    }

    async fn network_exists(&self, name: &str) -> Result<bool, EngineError> {
        Ok(self.state.lock().unwrap().networks.contains(name))
    }

    async fn create_network(&self, name: &str) -> Result<(), EngineError> {
        self.state.lock().unwrap().networks.insert(name.to_owned());
        Ok(())
    }

    async fn create_container(&self, spec: &ContainerSpec) -> Result<String, EngineError> {
        let mut s = self.state.lock().unwrap();
        if s.containers.contains_key(&spec.name) {
            return Err(EngineError::Api {
                operation: "create container",
                message: format!("Conflict. The container name \"/{}\" is already in use", spec.name),
            });
        }
        if !s.networks.contains(&spec.network) {
            return Err(not_found(&spec.network));
        }
        let id = s.fresh_id();
        s.containers.insert(
            spec.name.clone(),
            ContainerInfo {
                id: id.clone(),
                name: spec.name.clone(),
                state: "created".to_owned(),
                image: spec.image.clone(),
                created: "2026-01-01T00:00:00Z".to_owned(),
                ports: vec![format!("{}/tcp", spec.env.get("PORT").cloned().unwrap_or_default())],
                labels: spec.labels.clone(),
            },
        );
        s.created.push(spec.clone());
        Ok(id)
    }

    async fn start_container(&self, name: &str) -> Result<(), EngineError> {
        let mut s = self.state.lock().unwrap();
        let container = s.containers.get_mut(name).ok_or_else(|| not_found(name))?;
        container.state = "running".to_owned();
        Ok(())
    }

    async fn stop_container(&self, name: &str, _timeout_secs: u64) -> Result<(), EngineError> {
        let mut s = self.state.lock().unwrap();
        let container = s.containers.get_mut(name).ok_or_else(|| not_found(name))?;
        container.state = "exited".to_owned();
        Ok(())
    }

    async fn remove_container(&self, name: &str) -> Result<(), EngineError> {
        let mut s = self.state.lock().unwrap();
        s.containers
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| not_found(name))
    }

    async fn inspect_container(&self, name: &str) -> Result<Option<ContainerInfo>, EngineError> {
        Ok(self.state.lock().unwrap().containers.get(name).cloned())
    }

    async fn container_logs(&self, name: &str, tail: usize) -> Result<String, EngineError> {
        let s = self.state.lock().unwrap();
        if !s.containers.contains_key(name) {
            return Err(not_found(name));
        }
        Ok((1..=tail.min(3))
            .map(|i| format!("2026-01-01T00:00:0{i}Z line {i}\n"))
            .collect())
    }

    async fn list_containers(&self, label: &str) -> Result<Vec<ContainerInfo>, EngineError> {
        let (key, value) = label.split_once('=').unwrap_or((label, ""));
        Ok(self
            .state
            .lock()
            .unwrap()
            .containers
            .values()
            .filter(|c| c.labels.get(key).is_some_and(|v| v == value))
            .cloned()
            .collect())
    }
}

/// Files in an uncompressed tar, keyed by path.
pub fn read_tar(bytes: &[u8]) -> BTreeMap<String, String> {
    let mut archive = tar::Archive::new(bytes);
    let mut files = BTreeMap::new();
    for entry in archive.entries().unwrap() {
        let mut entry = entry.unwrap();
        if !entry.header().entry_type().is_file() {
            continue;
        }
        let path = entry.path().unwrap().to_string_lossy().into_owned();
        let mut content = String::new();
        entry.read_to_string(&mut content).unwrap();
        files.insert(path.trim_start_matches("./").to_owned(), content);
    }
    files
}

/// Write a gzip tarball with the given files and return its path.
pub fn write_tarball(dir: &std::path::Path, files: &[(&str, &str)]) -> std::path::PathBuf {
    let encoder = GzEncoder::new(Vec::new(), Compression::default());
    let mut builder = tar::Builder::new(encoder);
    for (path, content) in files {
        let mut header = tar::Header::new_gnu();
        header.set_size(content.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_data(&mut header, path, content.as_bytes())
            .unwrap();
    }
    let bytes = builder.into_inner().unwrap().finish().unwrap();
    let path = dir.join("app.tar.gz");
    std::fs::write(&path, bytes).unwrap();
    path
}
