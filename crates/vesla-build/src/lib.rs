//! Runtime detection, Dockerfile synthesis, and build contexts for vesla.
//!
//! # Build flow
//!
//! ```text
//! vesla deploy <dir>
//!   0. Pack       ── pack_source(dir) → gzip tarball
//!   1. Extract    ── BuildContext::extract(tarball) → temp dir
//!   2. Detect     ── detect(dir) → RuntimeKind
//!   3. Dockerfile ── user's own, or DockerfileGenerator::render()
//!   4. Archive    ── BuildContext::archive() → image builder
//! ```
//!
//! # Detection
//!
//! Marker files are checked in [`DETECTION_ORDER`]. A `Dockerfile` in the
//! context root always wins, so ejecting a generated recipe switches the app
//! to a custom build.

pub mod bundle;
pub mod context;
pub mod detect;
pub mod dockerfile;
pub mod eject;
pub mod entrypoint;

pub use bundle::{BundleError, pack_source};
pub use context::{BuildContext, ContextError};
pub use detect::{DETECTION_ORDER, RuntimeKind, detect};
pub use dockerfile::{DockerfileGenerator, RecipeError};
pub use eject::{EjectError, eject};
