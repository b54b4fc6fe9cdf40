use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to load config from {path}")]
    ConfigLoad {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config at {path}")]
    ConfigParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    // ── Manifest ──
    #[error("failed to read manifest from {path}")]
    ManifestLoad {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid manifest: {source}")]
    ManifestParse { source: serde_yaml::Error },

    #[error("missing required field: '{0}'")]
    MissingField(&'static str),

    #[error("app name {0:?} must contain only letters, numbers, hyphens, and underscores")]
    InvalidAppName(String),

    #[error(
        "domain {domain:?} must use one of the allowed base domains: {}",
        format_allowed(allowed)
    )]
    DomainNotAllowed {
        domain: String,
        allowed: Vec<String>,
    },

    #[error("invalid memory limit {0:?}: expected a size like \"512m\" or \"1g\"")]
    InvalidMemory(String),

    #[error("invalid cpu limit {0}: must be greater than zero")]
    InvalidCpus(f64),

    #[error("invalid PORT {0:?}: must be a number between 1 and 65535")]
    InvalidPort(String),

    #[error("invalid health_check {0:?}: must be a URL path starting with '/'")]
    InvalidHealthCheck(String),
}

fn format_allowed(allowed: &[String]) -> String {
    if allowed.is_empty() {
        "(none configured)".to_owned()
    } else {
        allowed.join(", ")
    }
}
