//! Minimal self-hosted PaaS: hand it a source tarball and a `vesla.yaml`,
//! get back a container serving HTTPS behind Traefik.
//!
//! This is the unified facade crate that re-exports all Vesla sub-crates
//! and adds the deployment [`Pipeline`](pipeline::Pipeline) on top.
//!
//! # Feature flags
//!
//! | Feature | Default | Crate | Description |
//! |---------|---------|-------|-------------|
//! | `core` | yes | `vesla-core` | Manifest, host configuration, shared errors |
//! | `build` | yes | `vesla-build` | Runtime detection, Dockerfile synthesis, build contexts |
//! | `engine` | yes | `vesla-engine` | Docker engine, image builds, proxy labels, replace-deploys |
//! | `dns` | yes | `vesla-dns` | DNS registration and propagation checks |
//! | `pipeline` | yes | | [`pipeline::Pipeline`], requires `engine` and `dns` |
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::path::Path;
//! use vesla::{Manifest, VeslaConfig};
//! use vesla::dns::DigitalOceanDns;
//! use vesla::engine::DockerEngine;
//! use vesla::pipeline::Pipeline;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = VeslaConfig::load(Path::new("/etc/vesla"))?;
//! let dns = DigitalOceanDns::from_env(config.dns.ttl)?;
//! let pipeline = Pipeline::new(DockerEngine::connect()?, dns, config);
//!
//! let manifest = Manifest::load(Path::new("blog/vesla.yaml"))?;
//! let outcome = pipeline.deploy(&manifest, Path::new("blog.tar.gz")).await?;
//! println!("{} ({})", outcome.url, outcome.container_id);
//! # Ok(())
//! # }
//! ```

// Core types flattened into root namespace for convenience.
#[cfg(feature = "core")]
pub use vesla_core::*;

/// Runtime detection, Dockerfile synthesis, build contexts, and eject.
#[cfg(feature = "build")]
pub mod build {
    pub use vesla_build::*;
}

/// Container engine operations: image builds, labels, and deploys.
#[cfg(feature = "engine")]
pub mod engine {
    pub use vesla_engine::*;
}

/// DNS record registration for deployed apps.
#[cfg(feature = "dns")]
pub mod dns {
    pub use vesla_dns::*;
}

#[cfg(feature = "pipeline")]
pub mod pipeline;

#[cfg(feature = "pipeline")]
pub use pipeline::{DeployOutcome, DnsOutcome, Pipeline, PipelineError};
