use std::path::Path;

use vesla::build::{DockerfileGenerator, RuntimeKind};

pub fn eject(app_dir: &Path, runtime: Option<RuntimeKind>) -> anyhow::Result<()> {
    let manifest = super::detect::load_manifest_or_default(app_dir)?;
    let kind = runtime.unwrap_or_else(|| vesla::build::detect(app_dir));

    let dockerfile = DockerfileGenerator::new(kind, app_dir, &manifest).render()?;
    let path = vesla::build::eject(app_dir, &dockerfile)?;

    println!("Ejected {kind} recipe to {}", path.display());
    println!("You can now edit it directly. vesla deploy will use this file.");
    Ok(())
}
