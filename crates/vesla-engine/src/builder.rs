use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use vesla_build::{BuildContext, ContextError, DockerfileGenerator, RecipeError, RuntimeKind};
use vesla_core::Manifest;

use crate::engine::ContainerEngine;
use crate::error::EngineError;
use crate::labels::APP_LABEL;

/// Result of a successful image build.
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltImage {
    pub image_id: String,
    /// `<app>:latest`
    pub tag: String,
    pub runtime: RuntimeKind,
    pub elapsed: Duration,
}

/// Turns an app tarball into a tagged image.
///
/// Each build gets its own context directory under `work_dir`, which is
/// removed when the build returns, including on failure and timeout.
pub struct ImageBuilder<'a, E: ContainerEngine> {
    engine: &'a E,
    work_dir: PathBuf,
    max_build_time: Duration,
}

impl<'a, E: ContainerEngine> ImageBuilder<'a, E> {
    pub fn new(engine: &'a E, work_dir: PathBuf, max_build_time: Duration) -> Self {
        Self {
            engine,
            work_dir,
            max_build_time,
        }
    }

    pub async fn build(
        &self,
        app: &str,
        tarball: &Path,
        manifest: &Manifest,
    ) -> Result<BuiltImage, BuildError> {
        let started = Instant::now();

        let prepared = {
            let app = app.to_owned();
            let tarball = tarball.to_path_buf();
            let work_dir = self.work_dir.clone();
            let manifest = manifest.clone();
            tokio::task::spawn_blocking(move || prepare(&app, &tarball, &work_dir, &manifest))
                .await
                .map_err(|e| BuildError::Task { source: e })??
        };

        let tag = format!("{app}:latest");
        let labels = BTreeMap::from([(APP_LABEL.to_owned(), app.to_owned())]);
        tracing::info!("building image {tag} ({} runtime)", prepared.runtime);

        let outcome = tokio::time::timeout(
            self.max_build_time,
            self.engine.build_image(&tag, &labels, prepared.archive),
        )
        .await;

        // Context directory goes away here whatever the outcome.
        drop(prepared.context);

        let image_id = match outcome {
            Err(_) => {
                return Err(BuildError::Timeout {
                    app: app.to_owned(),
                    seconds: self.max_build_time.as_secs(),
                });
            }
            Ok(result) => result.map_err(|e| BuildError::Engine { source: e })?,
        };

        let elapsed = started.elapsed();
        tracing::info!(
            "built {tag} ({}) in {:.1}s",
            crate::engine::short_id(&image_id),
            elapsed.as_secs_f64()
        );

        Ok(BuiltImage {
            image_id,
            tag,
            runtime: prepared.runtime,
            elapsed,
        })
    }

    /// Prune dangling images left behind by rebuilds. Failures are only logged.
    pub async fn cleanup_old_images(&self, app: &str) {
        match self.engine.prune_dangling_images().await {
            Ok(count) => tracing::debug!("cleaned up {count} dangling images after {app}"),
            Err(e) => tracing::warn!("failed to clean up old images for {app}: {e}"),
        }
    }
}

struct Prepared {
    context: BuildContext,
    runtime: RuntimeKind,
    archive: Vec<u8>,
}

/// Extract, detect, and inject the recipe. Runs on the blocking pool.
fn prepare(
    app: &str,
    tarball: &Path,
    work_dir: &Path,
    manifest: &Manifest,
) -> Result<Prepared, BuildError> {
    let bytes = vesla_build::context::read_tarball(tarball)
        .map_err(|e| BuildError::Context { source: e })?;
    let context = BuildContext::extract(app, &bytes, work_dir)
        .map_err(|e| BuildError::Context { source: e })?;

    let runtime = vesla_build::detect(context.path());
    match runtime {
        RuntimeKind::Unknown => return Err(BuildError::UnknownRuntime),
        RuntimeKind::Dockerfile => tracing::info!("using the app's own Dockerfile"),
        kind => {
            let recipe = DockerfileGenerator::new(kind, context.path(), manifest)
                .render()
                .map_err(|e| BuildError::Recipe { source: e })?;
            context
                .write_dockerfile(&recipe)
                .map_err(|e| BuildError::Context { source: e })?;
            tracing::debug!("generated Dockerfile for {kind}");
        }
    }

    let archive = context
        .archive()
        .map_err(|e| BuildError::Context { source: e })?;

    Ok(Prepared {
        context,
        runtime,
        archive,
    })
}

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("invalid build context")]
    Context { source: ContextError },

    #[error(
        "could not detect runtime: add a Dockerfile or one of the supported marker files"
    )]
    UnknownRuntime,

    #[error("failed to generate Dockerfile")]
    Recipe { source: RecipeError },

    #[error("image build failed")]
    Engine { source: EngineError },

    #[error("build for {app} exceeded {seconds}s")]
    Timeout { app: String, seconds: u64 },

    #[error("build task panicked")]
    Task { source: tokio::task::JoinError },
}
