//! The per-app deployment manifest (`vesla.yaml`).
//!
//! ```yaml
//! app: blog
//! domain: blog.vesla-app.site
//! env:
//!   PORT: 8080
//!   NODE_ENV: production
//! resources:
//!   memory: 256m
//!   cpus: 0.25
//! health_check: /health
//! ```
//!
//! Only `app` and `domain` are required. Everything that reads an optional
//! field goes through an accessor here so defaults are applied in one place.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};

use crate::{Error, Result};

/// Port injected as `PORT` when the manifest does not set one.
pub const DEFAULT_PORT: &str = "5000";
/// Memory limit applied when `resources.memory` is absent.
pub const DEFAULT_MEMORY: &str = "512m";
/// CPU limit applied when `resources.cpus` is absent.
pub const DEFAULT_CPUS: f64 = 0.5;

/// Parsed `vesla.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    /// App identifier; also the container name and image repository.
    #[serde(default)]
    pub app: String,
    /// Fully-qualified domain the app is served on.
    #[serde(default)]
    pub domain: Option<String>,
    /// Environment passed to the container. Scalar YAML values are stringified.
    #[serde(default, deserialize_with = "deserialize_env")]
    pub env: BTreeMap<String, String>,
    #[serde(default)]
    pub resources: Resources,
    /// URL path the reverse proxy polls.
    #[serde(default)]
    pub health_check: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Resources {
    /// Memory limit such as `512m` or `1g`
    #[serde(default)]
    pub memory: Option<String>,
    /// Fractional CPU count
    #[serde(default)]
    pub cpus: Option<f64>,
}

impl Manifest {
    /// Parse a manifest document.
    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).map_err(|e| Error::ManifestParse { source: e })
    }

    /// Read and parse a manifest file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::ManifestLoad {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_yaml(&content)
    }

    /// Check the manifest against the host's allow-listed base domains.
    ///
    /// This runs before any build or DNS work so a rejected manifest has no
    /// side effects.
    pub fn validate(&self, allowed_domains: &[String]) -> Result<()> {
        if self.app.is_empty() {
            return Err(Error::MissingField("app"));
        }
        if !is_valid_app_name(&self.app) {
            return Err(Error::InvalidAppName(self.app.clone()));
        }

        let domain = self.domain.as_deref().ok_or(Error::MissingField("domain"))?;
        let allowed = parse_domain(domain).is_some_and(|(_, base)| {
            allowed_domains
                .iter()
                .any(|candidate| candidate.eq_ignore_ascii_case(base))
        });
        if !allowed {
            return Err(Error::DomainNotAllowed {
                domain: domain.to_owned(),
                allowed: allowed_domains.to_vec(),
            });
        }

        if let Some(port) = self.env.get("PORT")
            && !port.parse::<u16>().is_ok_and(|p| p > 0)
        {
            return Err(Error::InvalidPort(port.clone()));
        }

        if let Some(memory) = &self.resources.memory {
            parse_memory(memory).ok_or_else(|| Error::InvalidMemory(memory.clone()))?;
        }

        if let Some(cpus) = self.resources.cpus
            && !(cpus.is_finite() && cpus > 0.0)
        {
            return Err(Error::InvalidCpus(cpus));
        }

        if let Some(path) = &self.health_check
            && !path.starts_with('/')
        {
            return Err(Error::InvalidHealthCheck(path.clone()));
        }

        Ok(())
    }

    /// The port the app listens on (`env.PORT`, default `5000`).
    pub fn port(&self) -> &str {
        self.env
            .get("PORT")
            .map(String::as_str)
            .unwrap_or(DEFAULT_PORT)
    }

    /// Container environment with `PORT` guaranteed to be present.
    pub fn container_env(&self) -> BTreeMap<String, String> {
        let mut env = self.env.clone();
        env.entry("PORT".to_owned())
            .or_insert_with(|| DEFAULT_PORT.to_owned());
        env
    }

    /// Memory limit in bytes, or `None` if `resources.memory` is malformed.
    pub fn memory_bytes(&self) -> Option<i64> {
        parse_memory(self.resources.memory.as_deref().unwrap_or(DEFAULT_MEMORY))
    }

    /// CPU limit in units of 10⁻⁹ CPUs, as container engines expect.
    pub fn nano_cpus(&self) -> i64 {
        let cpus = self.resources.cpus.unwrap_or(DEFAULT_CPUS);
        (cpus * 1e9).round() as i64
    }
}

/// Split `myapp.vesla-app.site` into `("myapp", "vesla-app.site")`.
///
/// Returns `None` when either side of the first dot is empty.
pub fn parse_domain(fqdn: &str) -> Option<(&str, &str)> {
    let (sub, base) = fqdn.split_once('.')?;
    if sub.is_empty() || base.is_empty() {
        return None;
    }
    Some((sub, base))
}

fn is_valid_app_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Parse a container-engine memory string (`512m`, `1g`, `1.5gb`, `1048576`) into bytes.
pub(crate) fn parse_memory(value: &str) -> Option<i64> {
    let lower = value.trim().to_ascii_lowercase();
    let split = lower
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(lower.len());
    let (number, unit) = lower.split_at(split);

    let multiplier: f64 = match unit {
        "" | "b" => 1.0,
        "k" | "kb" => 1024.0,
        "m" | "mb" => 1024.0 * 1024.0,
        "g" | "gb" => 1024.0 * 1024.0 * 1024.0,
        _ => return None,
    };

    let amount: f64 = number.parse().ok()?;
    let bytes = (amount * multiplier).round();
    if bytes < 1.0 || bytes > i64::MAX as f64 {
        return None;
    }
    Some(bytes as i64)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum EnvValue {
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

fn deserialize_env<'de, D>(deserializer: D) -> std::result::Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<BTreeMap<String, EnvValue>> = Option::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .map(|(key, value)| {
            let value = match value {
                EnvValue::String(s) => s,
                EnvValue::Int(i) => i.to_string(),
                EnvValue::Float(f) => f.to_string(),
                EnvValue::Bool(b) => b.to_string(),
            };
            (key, value)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_memory_units() {
        assert_eq!(parse_memory("512m"), Some(512 * 1024 * 1024));
        assert_eq!(parse_memory("1g"), Some(1024 * 1024 * 1024));
        assert_eq!(parse_memory("1GB"), Some(1024 * 1024 * 1024));
        assert_eq!(parse_memory("64k"), Some(64 * 1024));
        assert_eq!(parse_memory("1048576"), Some(1_048_576));
        assert_eq!(parse_memory("1.5g"), Some(1_610_612_736));
    }

    #[test]
    fn parse_memory_rejects_garbage() {
        assert_eq!(parse_memory(""), None);
        assert_eq!(parse_memory("m"), None);
        assert_eq!(parse_memory("512x"), None);
        assert_eq!(parse_memory("0m"), None);
        assert_eq!(parse_memory("-5m"), None);
    }

    #[test]
    fn parse_domain_splits_at_first_dot() {
        assert_eq!(
            parse_domain("myapp.vesla-app.site"),
            Some(("myapp", "vesla-app.site"))
        );
        assert_eq!(parse_domain("localhost"), None);
        assert_eq!(parse_domain(".vesla-app.site"), None);
        assert_eq!(parse_domain("myapp."), None);
    }

    #[test]
    fn app_name_charset() {
        assert!(is_valid_app_name("my_app-2"));
        assert!(!is_valid_app_name("my app"));
        assert!(!is_valid_app_name("app.name"));
        assert!(!is_valid_app_name(""));
    }
}
