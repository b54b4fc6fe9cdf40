use std::path::{Path, PathBuf};
use std::process::Command;

use flate2::Compression;
use flate2::write::GzEncoder;

/// Paths vesla never ships, regardless of .gitignore content.
const VESLA_EXCLUDES: &[&str] = &[".git", ".vesla", ".env"];

/// Pack an app directory into the gzip tarball the pipeline deploys.
///
/// Inside a git work tree the file list comes from `git ls-files`, so
/// `.gitignore` is respected. Outside one, the directory is walked.
pub fn pack_source(app_dir: &Path) -> Result<Vec<u8>, BundleError> {
    let files = match git_ls_files(app_dir) {
        Ok(files) => files,
        Err(e @ (BundleError::GitFailed { .. } | BundleError::GitCommand { .. })) => {
            tracing::debug!("not using git file list ({e}), walking directory");
            walk(app_dir, Path::new(""))?
        }
        Err(e) => return Err(e),
    };

    let encoder = GzEncoder::new(Vec::new(), Compression::default());
    let mut builder = tar::Builder::new(encoder);
    let mut packed = 0usize;

    for relative_path in &files {
        if is_excluded(relative_path) {
            continue;
        }
        let src = app_dir.join(relative_path);
        // git lists deleted-but-tracked files until the deletion is staged
        if !src.is_file() {
            continue;
        }
        builder
            .append_path_with_name(&src, relative_path)
            .map_err(|e| BundleError::Append { path: src, source: e })?;
        packed += 1;
    }

    let bytes = builder
        .into_inner()
        .and_then(|encoder| encoder.finish())
        .map_err(|e| BundleError::Finish { source: e })?;

    tracing::debug!("packed {packed} files from {}", app_dir.display());
    Ok(bytes)
}

fn is_excluded(relative_path: &Path) -> bool {
    relative_path
        .components()
        .next()
        .is_some_and(|first| VESLA_EXCLUDES.iter().any(|ex| first.as_os_str() == *ex))
}

/// Tracked files plus untracked files that are not ignored.
fn git_ls_files(app_dir: &Path) -> Result<Vec<PathBuf>, BundleError> {
    let output = Command::new("git")
        .args(["ls-files", "--cached", "--others", "--exclude-standard"])
        .current_dir(app_dir)
        .output()
        .map_err(|e| BundleError::GitCommand {
            detail: "failed to execute git ls-files".to_owned(),
            source: e,
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(BundleError::GitFailed {
            detail: format!(
                "git ls-files exited with {}: {}",
                output.status,
                stderr.trim()
            ),
        });
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    Ok(stdout
        .lines()
        .filter(|line| !line.is_empty())
        .map(PathBuf::from)
        .collect())
}

fn walk(root: &Path, relative: &Path) -> Result<Vec<PathBuf>, BundleError> {
    let dir = root.join(relative);
    let entries = std::fs::read_dir(&dir).map_err(|e| BundleError::ReadDir {
        path: dir.clone(),
        source: e,
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| BundleError::ReadDir {
            path: dir.clone(),
            source: e,
        })?;
        let path = relative.join(entry.file_name());
        if is_excluded(&path) {
            continue;
        }
        let file_type = entry.file_type().map_err(|e| BundleError::ReadDir {
            path: entry.path(),
            source: e,
        })?;
        if file_type.is_dir() {
            files.extend(walk(root, &path)?);
        } else if file_type.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

#[derive(Debug, thiserror::Error)]
pub enum BundleError {
    #[error("failed to read directory {path}")]
    ReadDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to add {path} to the source tarball")]
    Append {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to finish the source tarball")]
    Finish { source: std::io::Error },
    #[error("git command failed: {detail}")]
    GitCommand {
        detail: String,
        source: std::io::Error,
    },
    #[error("git failed: {detail}")]
    GitFailed { detail: String },
}
