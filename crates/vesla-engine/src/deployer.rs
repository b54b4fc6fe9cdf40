use vesla_core::{DockerConfig, Manifest, ProxyConfig};

use crate::engine::{ContainerEngine, ContainerInfo, ContainerSpec, short_id};
use crate::error::EngineError;
use crate::labels::{self, APP_LABEL, DOMAIN_LABEL};

/// Default number of log lines returned by [`ContainerDeployer::logs`].
pub const DEFAULT_LOG_TAIL: usize = 100;

/// Runs app containers: one container per app, named after the app.
pub struct ContainerDeployer<'a, E: ContainerEngine> {
    engine: &'a E,
    docker: &'a DockerConfig,
    proxy: &'a ProxyConfig,
}

impl<'a, E: ContainerEngine> ContainerDeployer<'a, E> {
    pub fn new(engine: &'a E, docker: &'a DockerConfig, proxy: &'a ProxyConfig) -> Self {
        Self {
            engine,
            docker,
            proxy,
        }
    }

    // ── Deploy ──

    /// Replace whatever runs under `app` with a fresh container from `image`.
    ///
    /// Returns the new container id.
    pub async fn deploy(
        &self,
        app: &str,
        image: &str,
        manifest: &Manifest,
    ) -> Result<String, DeploymentError> {
        let domain = manifest
            .domain
            .as_deref()
            .ok_or_else(|| DeploymentError::MissingDomain(app.to_owned()))?;

        self.ensure_network().await?;
        self.replace_existing(app).await;

        let spec = ContainerSpec {
            name: app.to_owned(),
            image: image.to_owned(),
            env: manifest.container_env(),
            labels: labels::deployment_labels(app, domain, manifest, self.proxy),
            memory: manifest.memory_bytes(),
            nano_cpus: manifest.nano_cpus(),
            network: self.docker.network.clone(),
        };

        tracing::info!("deploying container for {app}");
        let id = self
            .engine
            .create_container(&spec)
            .await
            .map_err(|e| DeploymentError::Create {
                app: app.to_owned(),
                source: e,
            })?;

        self.engine
            .start_container(app)
            .await
            .map_err(|e| DeploymentError::Start {
                app: app.to_owned(),
                source: e,
            })?;

        tracing::info!("deployed container {} for {app}", short_id(&id));
        tracing::info!("app accessible at https://{domain}");
        Ok(id)
    }

    /// Create the shared application network if it does not exist yet.
    pub async fn ensure_network(&self) -> Result<(), DeploymentError> {
        let network = &self.docker.network;
        let exists = self
            .engine
            .network_exists(network)
            .await
            .map_err(|e| DeploymentError::Network {
                name: network.clone(),
                source: e,
            })?;

        if !exists {
            tracing::info!("creating network {network}");
            self.engine
                .create_network(network)
                .await
                .map_err(|e| DeploymentError::Network {
                    name: network.clone(),
                    source: e,
                })?;
        }
        Ok(())
    }

    /// Stop and remove the previous container. Missing is fine; anything
    /// else is logged and the deploy continues.
    async fn replace_existing(&self, app: &str) {
        match self.engine.stop_container(app, self.docker.stop_timeout).await {
            Ok(()) => tracing::info!("stopped existing container: {app}"),
            Err(e) if e.is_not_found() => {
                tracing::debug!("no existing container found for {app}");
                return;
            }
            Err(e) => tracing::warn!("error stopping existing container {app}: {e}"),
        }

        match self.engine.remove_container(app).await {
            Ok(()) => tracing::info!("removed existing container: {app}"),
            Err(e) if e.is_not_found() => {}
            Err(e) => tracing::warn!("error removing existing container {app}: {e}"),
        }
    }

    // ── Read / lifecycle ──

    pub async fn status(&self, app: &str) -> Result<Option<AppStatus>, DeploymentError> {
        let info = self
            .engine
            .inspect_container(app)
            .await
            .map_err(|e| DeploymentError::Engine { source: e })?;
        Ok(info.map(AppStatus::from))
    }

    /// Timestamped log tail, or `None` if the app has no container.
    pub async fn logs(&self, app: &str, tail: usize) -> Result<Option<String>, DeploymentError> {
        match self.engine.container_logs(app, tail).await {
            Ok(logs) => Ok(Some(logs)),
            Err(e) if e.is_not_found() => {
                tracing::warn!("container not found: {app}");
                Ok(None)
            }
            Err(e) => Err(DeploymentError::Engine { source: e }),
        }
    }

    /// Returns `false` if the app has no container.
    pub async fn stop(&self, app: &str) -> Result<bool, DeploymentError> {
        tracing::info!("stopping container: {app}");
        match self.engine.stop_container(app, self.docker.stop_timeout).await {
            Ok(()) => Ok(true),
            Err(e) if e.is_not_found() => {
                tracing::warn!("container not found: {app}");
                Ok(false)
            }
            Err(e) => Err(DeploymentError::Engine { source: e }),
        }
    }

    /// Stop (if running) and remove. Returns `false` if the app has no container.
    pub async fn remove(&self, app: &str) -> Result<bool, DeploymentError> {
        let Some(info) = self
            .engine
            .inspect_container(app)
            .await
            .map_err(|e| DeploymentError::Engine { source: e })?
        else {
            tracing::warn!("container not found: {app}");
            return Ok(false);
        };

        tracing::info!("removing container: {app}");
        if info.is_running() {
            self.engine
                .stop_container(app, self.docker.stop_timeout)
                .await
                .map_err(|e| DeploymentError::Engine { source: e })?;
        }

        match self.engine.remove_container(app).await {
            Ok(()) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(DeploymentError::Engine { source: e }),
        }
    }

    /// Every vesla-managed container, running or not.
    pub async fn list_apps(&self) -> Result<Vec<AppSummary>, DeploymentError> {
        let containers = self
            .engine
            .list_containers(&labels::managed_filter())
            .await
            .map_err(|e| DeploymentError::Engine { source: e })?;

        let mut apps: Vec<AppSummary> = containers.into_iter().map(AppSummary::from).collect();
        apps.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(apps)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppStatus {
    pub id: String,
    pub state: String,
    pub image: String,
    pub created: String,
    pub ports: Vec<String>,
}

impl From<ContainerInfo> for AppStatus {
    fn from(info: ContainerInfo) -> Self {
        Self {
            id: info.short_id().to_owned(),
            state: info.state,
            image: info.image,
            created: info.created,
            ports: info.ports,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppSummary {
    pub name: String,
    pub domain: String,
    pub state: String,
    pub id: String,
    pub image: String,
    pub created: String,
}

impl From<ContainerInfo> for AppSummary {
    fn from(info: ContainerInfo) -> Self {
        let id = info.short_id().to_owned();
        let mut labels = info.labels;
        Self {
            name: labels.remove(APP_LABEL).unwrap_or(info.name),
            domain: labels
                .remove(DOMAIN_LABEL)
                .unwrap_or_else(|| "N/A".to_owned()),
            state: info.state,
            id,
            image: info.image,
            created: info.created,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DeploymentError {
    #[error("no domain specified for {0}")]
    MissingDomain(String),

    #[error("failed to prepare network {name}")]
    Network { name: String, source: EngineError },

    #[error("failed to create container for {app}")]
    Create { app: String, source: EngineError },

    #[error("failed to start container for {app}")]
    Start { app: String, source: EngineError },

    #[error("container engine error")]
    Engine { source: EngineError },
}
