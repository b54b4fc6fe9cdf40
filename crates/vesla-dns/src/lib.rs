//! DNS registration for deployed apps.
//!
//! After a successful build the pipeline points `<app>.<base domain>` at the
//! host's public IP through a [`DnsRegistrar`]. Registration is best-effort:
//! callers log failures and keep deploying.

pub mod digitalocean;
pub mod error;
pub mod propagation;
pub mod public_ip;

use std::net::IpAddr;

pub use digitalocean::{DigitalOceanDns, TOKEN_ENV};
pub use error::DnsError;
pub use propagation::verify_propagation;
pub use public_ip::resolve_public_ip;

/// A DNS provider that can point a subdomain at an IP address.
#[allow(async_fn_in_trait)]
pub trait DnsRegistrar: Send + Sync {
    /// Create the record, or update it in place if it already exists.
    async fn create_or_update_record(
        &self,
        subdomain: &str,
        domain: &str,
        ip: IpAddr,
    ) -> Result<(), DnsError>;

    /// Returns `false` when there was no record to delete.
    async fn delete_record(&self, subdomain: &str, domain: &str) -> Result<bool, DnsError>;
}
