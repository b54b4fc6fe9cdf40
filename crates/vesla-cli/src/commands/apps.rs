use std::path::Path;

pub async fn apps(config_dir: &Path, json: bool) -> anyhow::Result<()> {
    let pipeline = super::host_pipeline(config_dir)?;
    let apps = pipeline.apps().await?;

    if json {
        let body: Vec<_> = apps
            .iter()
            .map(|a| {
                serde_json::json!({
                    "name": a.name,
                    "domain": a.domain,
                    "status": a.state,
                    "id": a.id,
                    "image": a.image,
                    "created": a.created,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&body)?);
        return Ok(());
    }

    if apps.is_empty() {
        println!("No apps deployed.");
        return Ok(());
    }

    let name_width = apps.iter().map(|a| a.name.len()).max().unwrap_or(4).max(4);
    let domain_width = apps.iter().map(|a| a.domain.len()).max().unwrap_or(6).max(6);
    println!(
        "{:name_width$}  {:domain_width$}  {:9}  {:12}  IMAGE",
        "NAME", "DOMAIN", "STATE", "ID"
    );
    for app in &apps {
        println!(
            "{:name_width$}  {:domain_width$}  {:9}  {:12}  {}",
            app.name, app.domain, app.state, app.id, app.image
        );
    }
    Ok(())
}
