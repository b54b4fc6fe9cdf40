//! The deployment pipeline: validate → build → DNS → replace-deploy.

use std::collections::HashMap;
use std::net::IpAddr;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{OnceCell, OwnedMutexGuard};
use vesla_core::{Manifest, VeslaConfig, parse_domain};
use vesla_dns::{DnsError, DnsRegistrar};
use vesla_engine::labels::DOMAIN_LABEL;
use vesla_engine::{
    AppStatus, AppSummary, BuildError, BuiltImage, ContainerDeployer, ContainerEngine,
    DeploymentError, ImageBuilder,
};

/// Per-app mutual exclusion.
///
/// Deploys and destroys of the same app run one at a time; different apps
/// never wait on each other. Entries nobody holds or waits on are dropped
/// on the next acquire.
#[derive(Default)]
pub struct AppLocks {
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl AppLocks {
    pub async fn acquire(&self, app: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            // Held guards and queued waiters each own a clone.
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            Arc::clone(locks.entry(app.to_owned()).or_default())
        };
        lock.lock_owned().await
    }

    #[cfg(test)]
    fn tracked(&self) -> Vec<String> {
        let locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        let mut apps: Vec<_> = locks.keys().cloned().collect();
        apps.sort();
        apps
    }
}

/// What happened to the app's DNS record during a deploy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DnsOutcome {
    Registered { ip: IpAddr },
    /// DNS disabled in config, or no registrar configured.
    Skipped,
    /// Registration was attempted and failed; the deploy went ahead.
    Failed,
}

#[derive(Debug, Clone)]
pub struct DeployOutcome {
    pub app: String,
    /// `https://<domain>`
    pub url: String,
    /// 12-character container id.
    pub container_id: String,
    pub image: BuiltImage,
    pub dns: DnsOutcome,
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Invalid(#[from] vesla_core::Error),

    #[error("build failed: {0}")]
    Build(#[from] BuildError),

    #[error("deployment failed: {0}")]
    Deploy(#[from] DeploymentError),
}

/// Ties the image builder, the DNS registrar and the container deployer
/// together around one engine client.
pub struct Pipeline<E: ContainerEngine, D: DnsRegistrar> {
    engine: E,
    dns: Option<D>,
    config: VeslaConfig,
    locks: AppLocks,
    public_ip: OnceCell<IpAddr>,
}

impl<E: ContainerEngine, D: DnsRegistrar> Pipeline<E, D> {
    /// `dns: None` deploys without touching DNS.
    pub fn new(engine: E, dns: Option<D>, config: VeslaConfig) -> Self {
        Self {
            engine,
            dns,
            config,
            locks: AppLocks::default(),
            public_ip: OnceCell::new(),
        }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn config(&self) -> &VeslaConfig {
        &self.config
    }

    fn deployer(&self) -> ContainerDeployer<'_, E> {
        ContainerDeployer::new(&self.engine, &self.config.docker, &self.config.proxy)
    }

    fn builder(&self) -> ImageBuilder<'_, E> {
        ImageBuilder::new(
            &self.engine,
            self.config.build_work_dir(),
            std::time::Duration::from_secs(self.config.build.max_build_time),
        )
    }

    /// Deploy `tarball` (gzip) under the app and domain named in `manifest`.
    ///
    /// Nothing is built and no DNS call is made for an invalid manifest.
    pub async fn deploy(
        &self,
        manifest: &Manifest,
        tarball: &Path,
    ) -> Result<DeployOutcome, PipelineError> {
        manifest.validate(&self.config.server.allowed_domains)?;
        let app = manifest.app.as_str();
        let domain = manifest
            .domain
            .as_deref()
            .ok_or(vesla_core::Error::MissingField("domain"))?;

        let _guard = self.locks.acquire(app).await;
        tracing::info!("starting deployment for {app} at {domain}");

        let builder = self.builder();
        let image = builder.build(app, tarball, manifest).await?;

        let dns = self.register_dns(domain).await;

        let container_id = self.deployer().deploy(app, &image.tag, manifest).await?;
        builder.cleanup_old_images(app).await;

        tracing::info!("successfully deployed {app} at https://{domain}");
        Ok(DeployOutcome {
            app: app.to_owned(),
            url: format!("https://{domain}"),
            container_id: vesla_engine::engine::short_id(&container_id).to_owned(),
            image,
            dns,
        })
    }

    pub async fn status(&self, app: &str) -> Result<Option<AppStatus>, PipelineError> {
        Ok(self.deployer().status(app).await?)
    }

    pub async fn logs(&self, app: &str, tail: usize) -> Result<Option<String>, PipelineError> {
        Ok(self.deployer().logs(app, tail).await?)
    }

    pub async fn apps(&self) -> Result<Vec<AppSummary>, PipelineError> {
        Ok(self.deployer().list_apps().await?)
    }

    /// Stop and remove the app's container. `release_dns` also deletes the
    /// record for the domain the container was deployed under.
    ///
    /// Returns `false` if the app has no container.
    pub async fn destroy(&self, app: &str, release_dns: bool) -> Result<bool, PipelineError> {
        let _guard = self.locks.acquire(app).await;

        let domain = if release_dns {
            self.engine
                .inspect_container(app)
                .await
                .map_err(|e| DeploymentError::Engine { source: e })?
                .and_then(|info| info.labels.get(DOMAIN_LABEL).cloned())
        } else {
            None
        };

        let removed = self.deployer().remove(app).await?;
        if removed {
            tracing::info!("successfully deleted app: {app}");
            if let Some(domain) = domain {
                self.release_dns(&domain).await;
            }
        }
        Ok(removed)
    }

    /// Wait until `fqdn` resolves to `ip`, within the configured attempts.
    pub async fn verify_dns(&self, fqdn: &str, ip: IpAddr) -> bool {
        vesla_dns::verify_propagation(fqdn, ip, self.config.dns.propagation_attempts).await
    }

    async fn public_ip(&self) -> Result<IpAddr, DnsError> {
        self.public_ip
            .get_or_try_init(|| vesla_dns::resolve_public_ip(self.config.server.public_ip))
            .await
            .copied()
    }

    async fn register_dns(&self, domain: &str) -> DnsOutcome {
        if !self.config.dns.enabled {
            tracing::debug!("DNS disabled, skipping record for {domain}");
            return DnsOutcome::Skipped;
        }
        let Some(dns) = &self.dns else {
            tracing::warn!("no DNS registrar configured, skipping record for {domain}");
            return DnsOutcome::Skipped;
        };
        let Some((subdomain, base)) = parse_domain(domain) else {
            tracing::warn!("cannot split {domain} into subdomain and base domain");
            return DnsOutcome::Failed;
        };

        let ip = match self.public_ip().await {
            Ok(ip) => ip,
            Err(e) => {
                tracing::warn!("could not determine public IP, skipping DNS for {domain}: {e}");
                return DnsOutcome::Failed;
            }
        };

        tracing::info!("creating DNS record for {domain}");
        match dns.create_or_update_record(subdomain, base, ip).await {
            Ok(()) => DnsOutcome::Registered { ip },
            Err(e) => {
                tracing::warn!("failed to create DNS record for {domain}, continuing anyway: {e}");
                DnsOutcome::Failed
            }
        }
    }

    async fn release_dns(&self, domain: &str) {
        let Some(dns) = &self.dns else {
            tracing::warn!("no DNS registrar configured, leaving record for {domain}");
            return;
        };
        let Some((subdomain, base)) = parse_domain(domain) else {
            return;
        };
        match dns.delete_record(subdomain, base).await {
            Ok(true) => tracing::info!("released DNS record for {domain}"),
            Ok(false) => {}
            Err(e) => tracing::warn!("failed to delete DNS record for {domain}: {e}"),
        }
    }
}
