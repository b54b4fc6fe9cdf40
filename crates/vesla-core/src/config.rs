use std::net::IpAddr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// File name of the host configuration inside the config directory.
pub const CONFIG_FILE: &str = "vesla.toml";

/// vesla.toml configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VeslaConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub build: BuildConfig,
    #[serde(default)]
    pub docker: DockerConfig,
    #[serde(default)]
    pub proxy: ProxyConfig,
    #[serde(default)]
    pub dns: DnsConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Base domains apps are allowed to deploy under
    #[serde(default)]
    pub allowed_domains: Vec<String>,
    /// Public IP the DNS records point at (discovered when unset)
    #[serde(default)]
    pub public_ip: Option<IpAddr>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Hard limit for a single image build, in seconds
    #[serde(default = "default_max_build_time")]
    pub max_build_time: u64,
    /// Parent directory for per-build temp directories (system temp dir when unset)
    #[serde(default)]
    pub work_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DockerConfig {
    /// Shared network every app container joins
    #[serde(default = "default_network")]
    pub network: String,
    /// Grace period before a stopping container is killed, in seconds
    #[serde(default = "default_stop_timeout")]
    pub stop_timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyConfig {
    /// Reverse-proxy entrypoint serving TLS traffic
    #[serde(default = "default_entrypoint")]
    pub entrypoint: String,
    /// Certificate resolver configured in the reverse proxy
    #[serde(default = "default_cert_resolver")]
    pub cert_resolver: String,
    /// Interval between proxy health checks when an app declares one
    #[serde(default = "default_healthcheck_interval")]
    pub healthcheck_interval: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DnsConfig {
    /// Register an A record for each deployed app
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Record TTL in seconds
    #[serde(default = "default_ttl")]
    pub ttl: u32,
    /// Resolution attempts when verifying propagation
    #[serde(default = "default_propagation_attempts")]
    pub propagation_attempts: u32,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            max_build_time: default_max_build_time(),
            work_dir: None,
        }
    }
}

impl Default for DockerConfig {
    fn default() -> Self {
        Self {
            network: default_network(),
            stop_timeout: default_stop_timeout(),
        }
    }
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            entrypoint: default_entrypoint(),
            cert_resolver: default_cert_resolver(),
            healthcheck_interval: default_healthcheck_interval(),
        }
    }
}

impl Default for DnsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl: default_ttl(),
            propagation_attempts: default_propagation_attempts(),
        }
    }
}

impl VeslaConfig {
    /// Load from vesla.toml in the given directory, or return defaults if not found.
    pub fn load(config_dir: &Path) -> crate::Result<Self> {
        let config_path = config_dir.join(CONFIG_FILE);
        if config_path.exists() {
            let content =
                std::fs::read_to_string(&config_path).map_err(|e| crate::Error::ConfigLoad {
                    path: config_path.clone(),
                    source: e,
                })?;
            toml::from_str(&content).map_err(|e| crate::Error::ConfigParse {
                path: config_path,
                source: e,
            })
        } else {
            tracing::debug!("no {CONFIG_FILE} in {}, using defaults", config_dir.display());
            Ok(Self::default())
        }
    }

    /// Directory that per-build temp directories are created in.
    pub fn build_work_dir(&self) -> PathBuf {
        self.build
            .work_dir
            .clone()
            .unwrap_or_else(std::env::temp_dir)
    }
}

fn default_max_build_time() -> u64 {
    600
}

fn default_network() -> String {
    "vesla".to_owned()
}

fn default_stop_timeout() -> u64 {
    10
}

fn default_entrypoint() -> String {
    "websecure".to_owned()
}

fn default_cert_resolver() -> String {
    "digitalocean".to_owned()
}

fn default_healthcheck_interval() -> String {
    "30s".to_owned()
}

fn default_true() -> bool {
    true
}

fn default_ttl() -> u32 {
    300
}

fn default_propagation_attempts() -> u32 {
    10
}
