use std::path::Path;

pub async fn status(config_dir: &Path, app: &str, json: bool) -> anyhow::Result<()> {
    let pipeline = super::host_pipeline(config_dir)?;
    let Some(status) = pipeline.status(app).await? else {
        anyhow::bail!("app not found: {app}");
    };

    if json {
        let body = serde_json::json!({
            "status": "success",
            "app": app,
            "container": {
                "id": status.id,
                "status": status.state,
                "image": status.image,
                "created": status.created,
                "ports": status.ports,
            },
        });
        println!("{}", serde_json::to_string_pretty(&body)?);
        return Ok(());
    }

    println!("{app}");
    println!("  id       {}", status.id);
    println!("  state    {}", status.state);
    println!("  image    {}", status.image);
    println!("  created  {}", status.created);
    if !status.ports.is_empty() {
        println!("  ports    {}", status.ports.join(", "));
    }
    Ok(())
}
