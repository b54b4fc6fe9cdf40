use std::path::{Path, PathBuf};

/// Write the generated Dockerfile into the app directory.
///
/// Once ejected, detection picks the app up as a custom Dockerfile build and
/// the user owns the recipe from then on.
pub fn eject(app_dir: &Path, dockerfile_content: &str) -> Result<PathBuf, EjectError> {
    let dockerfile_path = app_dir.join("Dockerfile");
    if dockerfile_path.exists() {
        return Err(EjectError::AlreadyEjected(dockerfile_path));
    }

    std::fs::write(&dockerfile_path, dockerfile_content).map_err(|e| EjectError::Write {
        path: dockerfile_path.clone(),
        source: e,
    })?;

    Ok(dockerfile_path)
}

#[derive(Debug, thiserror::Error)]
pub enum EjectError {
    #[error("Dockerfile already exists at {0}: edit it directly or delete it to re-eject")]
    AlreadyEjected(PathBuf),
    #[error("failed to write {path}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}
