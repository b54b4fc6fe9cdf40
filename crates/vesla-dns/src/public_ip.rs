use std::net::IpAddr;
use std::time::Duration;

use crate::error::DnsError;

pub const IPIFY_URL: &str = "https://api.ipify.org";

const LOOKUP_TIMEOUT: Duration = Duration::from_secs(5);

/// The configured public IP, or one discovered via [`IPIFY_URL`].
pub async fn resolve_public_ip(configured: Option<IpAddr>) -> Result<IpAddr, DnsError> {
    match configured {
        Some(ip) => Ok(ip),
        None => discover_public_ip(IPIFY_URL).await,
    }
}

/// Ask an echo service (plain-text body) for this host's public address.
pub async fn discover_public_ip(url: &str) -> Result<IpAddr, DnsError> {
    let client = reqwest::Client::builder()
        .timeout(LOOKUP_TIMEOUT)
        .build()
        .map_err(|e| DnsError::PublicIp { source: e })?;

    let body = client
        .get(url)
        .send()
        .await
        .and_then(|r| r.error_for_status())
        .map_err(|e| DnsError::PublicIp { source: e })?
        .text()
        .await
        .map_err(|e| DnsError::PublicIp { source: e })?;

    let trimmed = body.trim();
    let ip = trimmed
        .parse()
        .map_err(|_| DnsError::InvalidIp(trimmed.to_owned()))?;
    tracing::debug!("discovered public IP {ip}");
    Ok(ip)
}
