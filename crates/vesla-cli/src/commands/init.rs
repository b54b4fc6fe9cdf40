use std::path::Path;

use vesla::config::CONFIG_FILE;

use super::MANIFEST_FILE;

const VESLA_TOML: &str = r#"[server]
# Base domains apps may deploy under
allowed_domains = ["vesla-app.site"]
# public_ip = "203.0.113.7"

[build]
# max_build_time = 600
# work_dir = "/var/tmp"

[docker]
# network = "vesla"
# stop_timeout = 10

[proxy]
# entrypoint = "websecure"
# cert_resolver = "digitalocean"
# healthcheck_interval = "30s"

[dns]
# enabled = true
# ttl = 300
# propagation_attempts = 10
"#;

const VESLA_YAML: &str = r#"app: myapp
domain: myapp.vesla-app.site
env:
  PORT: "5000"
# resources:
#   memory: 512m
#   cpus: 1.0
# health_check: /health
"#;

/// Write a starter host config and app manifest, skipping existing files.
pub fn init(config_dir: &Path) -> anyhow::Result<()> {
    let mut created = Vec::new();

    for (path, content) in [
        (config_dir.join(CONFIG_FILE), VESLA_TOML),
        (Path::new(".").join(MANIFEST_FILE), VESLA_YAML),
    ] {
        if path.exists() {
            eprintln!("{} already exists, skipping", path.display());
            continue;
        }
        std::fs::write(&path, content)?;
        created.push(path);
    }

    if created.is_empty() {
        println!("Nothing to create, already initialized.");
    } else {
        for f in &created {
            println!("Created {}", f.display());
        }
    }

    println!();
    println!("Next steps:");
    println!();
    println!("  1. Set allowed_domains in {CONFIG_FILE}");
    println!();
    println!("  2. Put the DNS API token in .env:");
    println!("     {}=your-token", vesla::dns::TOKEN_ENV);
    println!();
    println!("  3. Edit {MANIFEST_FILE} and deploy:");
    println!("     vesla deploy");

    Ok(())
}
