use std::io::Write;
use std::path::Path;

/// Stop and remove an app's container, optionally releasing its DNS record.
pub async fn destroy(
    config_dir: &Path,
    app: &str,
    skip_confirm: bool,
    release_dns: bool,
) -> anyhow::Result<()> {
    if !skip_confirm {
        println!("This will delete:");
        println!("  - container '{app}'");
        if release_dns {
            println!("  - the DNS record for its domain");
        }
        println!();
        print!("Are you sure? [y/N] ");
        std::io::stdout().flush()?;

        let mut input = String::new();
        std::io::stdin().read_line(&mut input)?;

        if !matches!(input.trim(), "y" | "Y" | "yes" | "YES") {
            println!("Aborted.");
            return Ok(());
        }
    }

    let pipeline = super::host_pipeline(config_dir)?;
    if !pipeline.destroy(app, release_dns).await? {
        anyhow::bail!("app not found: {app}");
    }

    println!("App {app} deleted");
    Ok(())
}
