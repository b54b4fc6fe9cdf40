use std::collections::{BTreeMap, HashMap};

use bollard::Docker;
use bollard::models::{
    BuildInfo, ContainerCreateBody, ContainerInspectResponse, ContainerSummary, HostConfig,
    NetworkCreateRequest, PortMap, RestartPolicy, RestartPolicyNameEnum,
};
use bollard::query_parameters::{
    BuildImageOptionsBuilder, CreateContainerOptionsBuilder, InspectContainerOptions,
    InspectNetworkOptions, ListContainersOptionsBuilder, LogsOptionsBuilder,
    PruneImagesOptionsBuilder, RemoveContainerOptionsBuilder, StartContainerOptions,
    StopContainerOptionsBuilder,
};
use futures::StreamExt;

use crate::engine::{ContainerEngine, ContainerInfo, ContainerSpec};
use crate::error::EngineError;

/// [`ContainerEngine`] backed by the local Docker daemon.
#[derive(Clone)]
pub struct DockerEngine {
    client: Docker,
}

impl DockerEngine {
    /// Connect using `DOCKER_HOST` or the platform's default socket.
    pub fn connect() -> Result<Self, EngineError> {
        let client =
            Docker::connect_with_local_defaults().map_err(|e| EngineError::Connect { source: e })?;
        Ok(Self { client })
    }

    pub fn with_client(client: Docker) -> Self {
        Self { client }
    }
}

impl ContainerEngine for DockerEngine {
    async fn version(&self) -> Result<String, EngineError> {
        let version = self
            .client
            .version()
            .await
            .map_err(|e| EngineError::Connect { source: e })?;
        Ok(version.version.unwrap_or_else(|| "unknown".to_owned()))
    }

    async fn build_image(
        &self,
        tag: &str,
        labels: &BTreeMap<String, String>,
        context: Vec<u8>,
    ) -> Result<String, EngineError> {
        let labels: HashMap<String, String> = labels.clone().into_iter().collect();
        let options = BuildImageOptionsBuilder::new()
            .t(tag)
            .rm(true)
            .forcerm(true)
            .labels(&labels)
            .build();

        let mut stream =
            self.client
                .build_image(options, None, Some(bollard::body_full(bytes::Bytes::from(context))));

        let mut image_id = None;
        while let Some(result) = stream.next().await {
            match result {
                Ok(info) => {
                    if let Some(message) = process_build_info(info, &mut image_id) {
                        return Err(EngineError::BuildFailed { message });
                    }
                }
                Err(err) => {
                    tracing::error!("{err}");
                    return Err(EngineError::BuildFailed {
                        message: err.to_string(),
                    });
                }
            }
        }

        image_id.ok_or_else(|| EngineError::BuildFailed {
            message: format!("engine reported no image id for {tag}"),
        })
    }

    async fn prune_dangling_images(&self) -> Result<usize, EngineError> {
        let options = PruneImagesOptionsBuilder::new()
            .filters(&[("dangling", vec!["true"])].into())
            .build();
        let response = self
            .client
            .prune_images(Some(options))
            .await
            .map_err(|e| EngineError::from_bollard("prune images", "images", e))?;

        let deleted = response.images_deleted.map(|v| v.len()).unwrap_or(0);
        if deleted > 0 {
            let mb = response.space_reclaimed.unwrap_or_default() as f32 / 1024.0 / 1024.0;
            tracing::info!("pruned {deleted} dangling images, reclaimed {mb:.2} MB");
        }
        Ok(deleted)
    }

    async fn network_exists(&self, name: &str) -> Result<bool, EngineError> {
        match self
            .client
            .inspect_network(name, None::<InspectNetworkOptions>)
            .await
        {
            Ok(_) => Ok(true),
            Err(bollard::errors::Error::DockerResponseServerError {
                status_code: 404, ..
            }) => Ok(false),
            Err(err) => Err(EngineError::from_bollard("inspect network", name, err)),
        }
    }

    async fn create_network(&self, name: &str) -> Result<(), EngineError> {
        let request = NetworkCreateRequest {
            name: name.to_owned(),
            driver: Some("bridge".to_owned()),
            ..Default::default()
        };
        self.client
            .create_network(request)
            .await
            .map_err(|e| EngineError::from_bollard("create network", name, e))?;
        Ok(())
    }

    async fn create_container(&self, spec: &ContainerSpec) -> Result<String, EngineError> {
        let body = ContainerCreateBody {
            image: Some(spec.image.clone()),
            env: Some(spec.env.iter().map(|(k, v)| format!("{k}={v}")).collect()),
            labels: Some(spec.labels.clone().into_iter().collect()),
            host_config: Some(HostConfig {
                memory: spec.memory,
                nano_cpus: Some(spec.nano_cpus),
                network_mode: Some(spec.network.clone()),
                restart_policy: Some(RestartPolicy {
                    name: Some(RestartPolicyNameEnum::UNLESS_STOPPED),
                    ..Default::default()
                }),
                ..Default::default()
            }),
            ..Default::default()
        };
        let options = CreateContainerOptionsBuilder::new().name(&spec.name).build();

        let response = self
            .client
            .create_container(Some(options), body)
            .await
            .map_err(|e| EngineError::from_bollard("create container", &spec.image, e))?;

        for warning in &response.warnings {
            tracing::warn!("{}: {warning}", spec.name);
        }
        Ok(response.id)
    }

    async fn start_container(&self, name: &str) -> Result<(), EngineError> {
        self.client
            .start_container(name, None::<StartContainerOptions>)
            .await
            .map_err(|e| EngineError::from_bollard("start container", name, e))
    }

    async fn stop_container(&self, name: &str, timeout_secs: u64) -> Result<(), EngineError> {
        let grace = i32::try_from(timeout_secs).unwrap_or(i32::MAX);
        let options = StopContainerOptionsBuilder::new().t(grace).build();
        match self.client.stop_container(name, Some(options)).await {
            Ok(()) => Ok(()),
            // 304: already stopped
            Err(bollard::errors::Error::DockerResponseServerError {
                status_code: 304, ..
            }) => Ok(()),
            Err(err) => Err(EngineError::from_bollard("stop container", name, err)),
        }
    }

    async fn remove_container(&self, name: &str) -> Result<(), EngineError> {
        let options = RemoveContainerOptionsBuilder::new().force(true).build();
        self.client
            .remove_container(name, Some(options))
            .await
            .map_err(|e| EngineError::from_bollard("remove container", name, e))
    }

    async fn inspect_container(&self, name: &str) -> Result<Option<ContainerInfo>, EngineError> {
        match self
            .client
            .inspect_container(name, None::<InspectContainerOptions>)
            .await
        {
            Ok(response) => Ok(Some(info_from_inspect(response))),
            Err(bollard::errors::Error::DockerResponseServerError {
                status_code: 404, ..
            }) => Ok(None),
            Err(err) => Err(EngineError::from_bollard("inspect container", name, err)),
        }
    }

    async fn container_logs(&self, name: &str, tail: usize) -> Result<String, EngineError> {
        let options = LogsOptionsBuilder::new()
            .stdout(true)
            .stderr(true)
            .timestamps(true)
            .tail(&tail.to_string())
            .build();

        let mut stream = self.client.logs(name, Some(options));
        let mut output = String::new();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| EngineError::from_bollard("read logs", name, e))?;
            output.push_str(&String::from_utf8_lossy(&chunk.into_bytes()));
        }
        Ok(output)
    }

    async fn list_containers(&self, label: &str) -> Result<Vec<ContainerInfo>, EngineError> {
        let options = ListContainersOptionsBuilder::new()
            .all(true)
            .filters(&[("label", vec![label])].into())
            .build();
        let containers = self
            .client
            .list_containers(Some(options))
            .await
            .map_err(|e| EngineError::from_bollard("list containers", label, e))?;

        Ok(containers.into_iter().map(info_from_summary).collect())
    }
}

/// Log one build progress message. Returns the error message if the build failed.
fn process_build_info(info: BuildInfo, image_id: &mut Option<String>) -> Option<String> {
    if let Some(id) = info.aux.and_then(|aux| aux.id) {
        *image_id = Some(id);
    }
    if let Some(stream) = info.stream {
        for line in stream.lines().filter(|l| !l.trim().is_empty()) {
            tracing::debug!("{line}");
        }
    }
    if let Some(message) = info.error_detail.and_then(|e| e.message) {
        tracing::error!("{message}");
        return Some(message);
    }
    None
}

fn info_from_inspect(response: ContainerInspectResponse) -> ContainerInfo {
    let config = response.config.unwrap_or_default();
    ContainerInfo {
        id: response.id.unwrap_or_default(),
        name: response
            .name
            .map(|n| n.trim_start_matches('/').to_owned())
            .unwrap_or_default(),
        state: response
            .state
            .and_then(|s| s.status)
            .map(|s| s.to_string())
            .unwrap_or_default(),
        image: config.image.unwrap_or_default(),
        created: response.created.map(|c| c.to_string()).unwrap_or_default(),
        ports: response
            .network_settings
            .and_then(|n| n.ports)
            .map(format_ports)
            .unwrap_or_default(),
        labels: config.labels.unwrap_or_default().into_iter().collect(),
    }
}

fn info_from_summary(summary: ContainerSummary) -> ContainerInfo {
    ContainerInfo {
        id: summary.id.unwrap_or_default(),
        name: summary
            .names
            .and_then(|names| names.into_iter().next())
            .map(|n| n.trim_start_matches('/').to_owned())
            .unwrap_or_default(),
        state: summary.state.map(|s| s.to_string()).unwrap_or_default(),
        image: summary.image.unwrap_or_default(),
        created: summary.created.map(|c| c.to_string()).unwrap_or_default(),
        ports: Vec::new(),
        labels: summary.labels.unwrap_or_default().into_iter().collect(),
    }
}

fn format_ports(ports: PortMap) -> Vec<String> {
    let mut formatted: Vec<String> = ports
        .into_iter()
        .flat_map(|(container_port, bindings)| {
            let bindings = bindings.unwrap_or_default();
            if bindings.is_empty() {
                return vec![container_port];
            }
            bindings
                .into_iter()
                .map(|b| {
                    format!(
                        "{}:{}->{container_port}",
                        b.host_ip.unwrap_or_default(),
                        b.host_port.unwrap_or_default()
                    )
                })
                .collect()
        })
        .collect();
    formatted.sort();
    formatted
}

#[cfg(test)]
mod tests {
    use bollard::models::PortBinding;

    use super::*;

    #[test]
    fn format_ports_lists_exposed_and_published() {
        let ports: PortMap = [
            ("5000/tcp".to_owned(), None),
            (
                "8080/tcp".to_owned(),
                Some(vec![PortBinding {
                    host_ip: Some("0.0.0.0".to_owned()),
                    host_port: Some("18080".to_owned()),
                }]),
            ),
        ]
        .into();

        assert_eq!(
            format_ports(ports),
            vec!["0.0.0.0:18080->8080/tcp", "5000/tcp"]
        );
    }

    #[test]
    fn build_info_error_is_reported() {
        let mut image_id = None;
        let info = BuildInfo {
            stream: Some("Step 1/4 : FROM python:3.11-slim\n".to_owned()),
            ..Default::default()
        };
        assert!(process_build_info(info, &mut image_id).is_none());

        let info = BuildInfo {
            error_detail: Some(bollard::models::ErrorDetail {
                message: Some("npm ERR! missing script: build".to_owned()),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert_eq!(
            process_build_info(info, &mut image_id).as_deref(),
            Some("npm ERR! missing script: build")
        );
        assert!(image_id.is_none());
    }
}
