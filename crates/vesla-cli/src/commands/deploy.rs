use std::io::Write;
use std::path::Path;

use vesla::{DnsOutcome, Manifest, VeslaConfig};

use super::MANIFEST_FILE;

/// Pack the app directory and run it through the deploy pipeline.
pub async fn deploy(
    config_dir: &Path,
    app_dir: &Path,
    wait_dns: bool,
    json: bool,
) -> anyhow::Result<()> {
    let manifest = Manifest::load(&app_dir.join(MANIFEST_FILE))?;
    let config = VeslaConfig::load(config_dir)?;

    // Fail on a bad manifest before touching Docker or packing
    manifest.validate(&config.server.allowed_domains)?;
    let pipeline = super::pipeline_for(config)?;

    if !json {
        println!("Packing {}...", app_dir.display());
    }
    let tarball = vesla::build::pack_source(app_dir)?;
    let mut upload = tempfile::Builder::new()
        .prefix("vesla-upload-")
        .suffix(".tar.gz")
        .tempfile()?;
    upload.write_all(&tarball)?;
    upload.flush()?;

    if !json {
        println!("Deploying {}...", manifest.app);
    }
    let outcome = pipeline.deploy(&manifest, upload.path()).await?;

    if json {
        let body = serde_json::json!({
            "status": "success",
            "app": outcome.app,
            "url": outcome.url,
            "container_id": outcome.container_id,
            "runtime": outcome.image.runtime.to_string(),
            "build_time": (outcome.image.elapsed.as_secs_f64() * 100.0).round() / 100.0,
            "dns_registered": matches!(outcome.dns, DnsOutcome::Registered { .. }),
        });
        println!("{}", serde_json::to_string_pretty(&body)?);
    } else {
        println!();
        println!("Deployed: {}", outcome.url);
        println!("  container  {}", outcome.container_id);
        println!("  runtime    {}", outcome.image.runtime);
        println!("  build time {:.2}s", outcome.image.elapsed.as_secs_f64());
        match outcome.dns {
            DnsOutcome::Registered { ip } => println!("  dns        -> {ip}"),
            DnsOutcome::Skipped => println!("  dns        skipped"),
            DnsOutcome::Failed => println!("  dns        failed (see log)"),
        }
    }

    if wait_dns {
        if let DnsOutcome::Registered { ip } = outcome.dns {
            let fqdn = outcome.url.trim_start_matches("https://");
            if !json {
                println!("Waiting for {fqdn} to resolve to {ip}...");
            }
            if !pipeline.verify_dns(fqdn, ip).await {
                anyhow::bail!("{fqdn} does not resolve to {ip} yet; the app is deployed, DNS may need more time");
            }
        } else if !json {
            println!("No DNS record was registered, nothing to wait for");
        }
    }

    Ok(())
}
