use std::future::Future;
use std::net::IpAddr;
use std::time::Duration;

/// Fixed wait between resolution attempts.
pub const PROPAGATION_BACKOFF: Duration = Duration::from_secs(5);

/// Resolve `fqdn` until it returns `expected`, at most `max_attempts` times.
pub async fn verify_propagation(fqdn: &str, expected: IpAddr, max_attempts: u32) -> bool {
    verify_with(fqdn, expected, max_attempts, PROPAGATION_BACKOFF, resolve).await
}

async fn resolve(fqdn: String) -> std::io::Result<Vec<IpAddr>> {
    let addrs = tokio::net::lookup_host((fqdn.as_str(), 0)).await?;
    Ok(addrs.map(|a| a.ip()).collect())
}

/// [`verify_propagation`] with an injectable resolver and backoff.
pub async fn verify_with<F, Fut>(
    fqdn: &str,
    expected: IpAddr,
    max_attempts: u32,
    backoff: Duration,
    mut resolver: F,
) -> bool
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = std::io::Result<Vec<IpAddr>>>,
{
    for attempt in 1..=max_attempts {
        match resolver(fqdn.to_owned()).await {
            Ok(ips) if ips.contains(&expected) => {
                tracing::info!("DNS propagated: {fqdn} -> {expected}");
                return true;
            }
            Ok(ips) => tracing::warn!("DNS mismatch: {fqdn} resolves to {ips:?}, expected {expected}"),
            Err(e) => tracing::debug!(
                "DNS not yet propagated for {fqdn} ({e}), attempt {attempt}/{max_attempts}"
            ),
        }

        if attempt < max_attempts {
            tokio::time::sleep(backoff).await;
        }
    }

    tracing::error!("DNS propagation check failed for {fqdn}");
    false
}
