use std::collections::BTreeMap;

use vesla_core::{Manifest, ProxyConfig};

/// Marks a container as owned by vesla.
pub const MANAGED_LABEL: &str = "vesla.managed";
pub const APP_LABEL: &str = "vesla.app";
pub const DOMAIN_LABEL: &str = "vesla.domain";

/// Label filter selecting every vesla-managed container.
pub fn managed_filter() -> String {
    format!("{MANAGED_LABEL}=true")
}

/// Reverse-proxy routing labels plus ownership metadata for an app container.
///
/// Traefik reads the `traefik.*` keys: an HTTPS router matching the app's
/// host, TLS via the configured certificate resolver, and the backend port
/// taken from the manifest's `PORT`. Health-check keys are only emitted when
/// the manifest declares `health_check`.
pub fn deployment_labels(
    app: &str,
    domain: &str,
    manifest: &Manifest,
    proxy: &ProxyConfig,
) -> BTreeMap<String, String> {
    let router = format!("traefik.http.routers.{app}");
    let service = format!("traefik.http.services.{app}.loadbalancer");

    let mut labels = BTreeMap::from([
        ("traefik.enable".to_owned(), "true".to_owned()),
        (format!("{router}.rule"), format!("Host(`{domain}`)")),
        (format!("{router}.entrypoints"), proxy.entrypoint.clone()),
        (format!("{router}.tls"), "true".to_owned()),
        (
            format!("{router}.tls.certresolver"),
            proxy.cert_resolver.clone(),
        ),
        (
            format!("{service}.server.port"),
            manifest.port().to_owned(),
        ),
        (MANAGED_LABEL.to_owned(), "true".to_owned()),
        (APP_LABEL.to_owned(), app.to_owned()),
        (DOMAIN_LABEL.to_owned(), domain.to_owned()),
    ]);

    if let Some(path) = &manifest.health_check {
        labels.insert(format!("{service}.healthcheck.path"), path.clone());
        labels.insert(
            format!("{service}.healthcheck.interval"),
            proxy.healthcheck_interval.clone(),
        );
    }

    labels
}
