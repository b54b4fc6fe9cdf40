//! Core types and configuration for Vesla.
//!
//! This crate defines the host configuration schema ([`VeslaConfig`], read
//! from `vesla.toml`), the per-app deployment manifest ([`Manifest`], read
//! from `vesla.yaml`), and the shared error type.

pub mod config;
pub mod error;
pub mod manifest;

pub use config::{BuildConfig, DnsConfig, DockerConfig, ProxyConfig, ServerConfig, VeslaConfig};
pub use error::{Error, Result};
pub use manifest::{DEFAULT_CPUS, DEFAULT_MEMORY, DEFAULT_PORT, Manifest, Resources, parse_domain};
