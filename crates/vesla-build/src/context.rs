use std::io::Read;
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use tempfile::TempDir;

/// Extracted application source, ready to be sent to the image builder.
///
/// The backing directory lives under the configured work dir and is removed
/// when the context is dropped, whether the build succeeded or not.
#[derive(Debug)]
pub struct BuildContext {
    dir: TempDir,
    root: PathBuf,
}

impl BuildContext {
    /// Unpack a gzip-compressed tarball into a fresh directory.
    ///
    /// A tarball whose only top-level entry is a directory (the shape
    /// `tar czf app.tgz app/` produces) is unwrapped so the context root is
    /// that directory.
    pub fn extract(app: &str, tarball: &[u8], work_dir: &Path) -> Result<Self, ContextError> {
        std::fs::create_dir_all(work_dir).map_err(|e| ContextError::CreateDir {
            path: work_dir.to_path_buf(),
            source: e,
        })?;

        let dir = tempfile::Builder::new()
            .prefix(&format!("vesla-build-{app}-"))
            .tempdir_in(work_dir)
            .map_err(|e| ContextError::CreateDir {
                path: work_dir.to_path_buf(),
                source: e,
            })?;

        let mut archive = tar::Archive::new(GzDecoder::new(tarball));
        archive.set_preserve_permissions(true);
        archive
            .unpack(dir.path())
            .map_err(|e| ContextError::Extract { source: e })?;

        let root = single_top_level_dir(dir.path()).unwrap_or_else(|| dir.path().to_path_buf());
        if is_empty_dir(&root) {
            return Err(ContextError::Empty);
        }

        tracing::debug!("extracted build context to {}", root.display());
        Ok(Self { dir, root })
    }

    /// Root of the application source.
    pub fn path(&self) -> &Path {
        &self.root
    }

    pub fn has_dockerfile(&self) -> bool {
        self.root.join("Dockerfile").is_file()
    }

    /// Write a generated Dockerfile into the context root.
    pub fn write_dockerfile(&self, content: &str) -> Result<PathBuf, ContextError> {
        let path = self.root.join("Dockerfile");
        std::fs::write(&path, content).map_err(|e| ContextError::WriteDockerfile {
            path: path.clone(),
            source: e,
        })?;
        Ok(path)
    }

    /// Re-pack the context as an uncompressed tar for the image builder.
    pub fn archive(&self) -> Result<Vec<u8>, ContextError> {
        let pack = || -> std::io::Result<Vec<u8>> {
            let mut builder = tar::Builder::new(Vec::new());
            builder.follow_symlinks(false);
            for entry in std::fs::read_dir(&self.root)? {
                let entry = entry?;
                let name = entry.file_name();
                if entry.file_type()?.is_dir() {
                    builder.append_dir_all(&name, entry.path())?;
                } else {
                    builder.append_path_with_name(entry.path(), &name)?;
                }
            }
            builder.into_inner()
        };
        pack().map_err(|e| ContextError::Archive { source: e })
    }

    /// Directory that is removed on drop. Exposed for cleanup assertions.
    pub fn scratch_dir(&self) -> &Path {
        self.dir.path()
    }
}

fn single_top_level_dir(dir: &Path) -> Option<PathBuf> {
    let mut entries = std::fs::read_dir(dir).ok()?.filter_map(|e| e.ok());
    let first = entries.next()?;
    if entries.next().is_some() {
        return None;
    }
    let path = first.path();
    path.is_dir().then_some(path)
}

fn is_empty_dir(dir: &Path) -> bool {
    std::fs::read_dir(dir)
        .map(|mut entries| entries.next().is_none())
        .unwrap_or(true)
}

/// Read a tarball from disk, used by the CLI before handing bytes to the pipeline.
pub fn read_tarball(path: &Path) -> Result<Vec<u8>, ContextError> {
    let mut bytes = Vec::new();
    std::fs::File::open(path)
        .and_then(|mut f| f.read_to_end(&mut bytes))
        .map_err(|e| ContextError::ReadTarball {
            path: path.to_path_buf(),
            source: e,
        })?;
    Ok(bytes)
}

#[derive(Debug, thiserror::Error)]
pub enum ContextError {
    #[error("failed to create build directory under {path}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to read tarball {path}")]
    ReadTarball {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to extract tarball")]
    Extract { source: std::io::Error },
    #[error("tarball contains no files")]
    Empty,
    #[error("failed to write Dockerfile at {path}")]
    WriteDockerfile {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to archive build context")]
    Archive { source: std::io::Error },
}
