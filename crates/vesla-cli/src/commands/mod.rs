mod apps;
mod deploy;
mod destroy;
mod detect;
mod doctor;
mod eject;
mod init;
mod logs;
mod status;

use std::path::Path;

use vesla::VeslaConfig;
use vesla::dns::DigitalOceanDns;
use vesla::engine::DockerEngine;
use vesla::pipeline::Pipeline;

/// Manifest file name inside an app directory.
pub(crate) const MANIFEST_FILE: &str = "vesla.yaml";

pub(crate) type HostPipeline = Pipeline<DockerEngine, DigitalOceanDns>;

pub(crate) fn host_pipeline(config_dir: &Path) -> anyhow::Result<HostPipeline> {
    pipeline_for(VeslaConfig::load(config_dir)?)
}

/// Pipeline against the local Docker daemon. DNS is wired up only when the
/// API token is set.
pub(crate) fn pipeline_for(config: VeslaConfig) -> anyhow::Result<HostPipeline> {
    let engine = DockerEngine::connect()?;
    let dns = DigitalOceanDns::from_env(config.dns.ttl)?;
    if dns.is_none() && config.dns.enabled {
        tracing::warn!(
            "{} not set, deploys will skip DNS registration",
            vesla::dns::TOKEN_ENV
        );
    }
    Ok(Pipeline::new(engine, dns, config))
}

pub use apps::apps;
pub use deploy::deploy;
pub use destroy::destroy;
pub use detect::detect;
pub use doctor::doctor;
pub use eject::eject;
pub use init::init;
pub use logs::logs;
pub use status::status;
