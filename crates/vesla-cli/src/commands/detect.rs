use std::path::Path;

use vesla::Manifest;
use vesla::build::{DockerfileGenerator, RuntimeKind};

use super::MANIFEST_FILE;

/// The app's manifest, or defaults when the directory has none yet.
pub(crate) fn load_manifest_or_default(app_dir: &Path) -> anyhow::Result<Manifest> {
    let path = app_dir.join(MANIFEST_FILE);
    if path.exists() {
        Ok(Manifest::load(&path)?)
    } else {
        Ok(Manifest::default())
    }
}

pub fn detect(app_dir: &Path, runtime: Option<RuntimeKind>) -> anyhow::Result<()> {
    let manifest = load_manifest_or_default(app_dir)?;
    let kind = runtime.unwrap_or_else(|| vesla::build::detect(app_dir));

    println!("Runtime: {kind}");
    match kind {
        RuntimeKind::Dockerfile => {
            println!("The app's own Dockerfile will be used as-is.");
        }
        RuntimeKind::Unknown => {
            anyhow::bail!(
                "could not detect a runtime in {}; add a Dockerfile or a supported project file",
                app_dir.display()
            );
        }
        _ => {
            let dockerfile = DockerfileGenerator::new(kind, app_dir, &manifest).render()?;
            println!();
            print!("{dockerfile}");
        }
    }
    Ok(())
}
