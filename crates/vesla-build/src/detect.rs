use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Language/framework ecosystem of an app's source tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuntimeKind {
    /// The app ships its own `Dockerfile`, used verbatim.
    Dockerfile,
    Python,
    Node,
    Go,
    Rust,
    Ruby,
    Php,
    JavaMaven,
    JavaGradle,
    DotNet,
    /// Plain `index.html` site served by a web server.
    Static,
    Unknown,
}

/// A file whose presence identifies a runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    /// Exact file name in the context root.
    File(&'static str),
    /// Any file in the context root with this extension.
    Extension(&'static str),
}

/// Detection priority. A user `Dockerfile` always wins; `index.html` is the
/// last resort since most web apps also ship one.
pub const DETECTION_ORDER: [RuntimeKind; 11] = [
    RuntimeKind::Dockerfile,
    RuntimeKind::Go,
    RuntimeKind::Rust,
    RuntimeKind::Python,
    RuntimeKind::Node,
    RuntimeKind::Ruby,
    RuntimeKind::Php,
    RuntimeKind::JavaMaven,
    RuntimeKind::JavaGradle,
    RuntimeKind::DotNet,
    RuntimeKind::Static,
];

impl RuntimeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dockerfile => "dockerfile",
            Self::Python => "python",
            Self::Node => "node",
            Self::Go => "go",
            Self::Rust => "rust",
            Self::Ruby => "ruby",
            Self::Php => "php",
            Self::JavaMaven => "java-maven",
            Self::JavaGradle => "java-gradle",
            Self::DotNet => "dotnet",
            Self::Static => "static",
            Self::Unknown => "unknown",
        }
    }

    /// Marker files for this kind. `Unknown` has none.
    pub fn markers(&self) -> &'static [Marker] {
        use Marker::{Extension, File};

        match self {
            Self::Dockerfile => &[File("Dockerfile")],
            Self::Go => &[File("go.mod"), File("main.go")],
            Self::Rust => &[File("Cargo.toml")],
            Self::Python => &[
                File("requirements.txt"),
                File("pyproject.toml"),
                File("Pipfile"),
                File("setup.py"),
            ],
            Self::Node => &[File("package.json")],
            Self::Ruby => &[File("Gemfile"), File("config.ru")],
            Self::Php => &[File("composer.json"), File("index.php")],
            Self::JavaMaven => &[File("pom.xml")],
            Self::JavaGradle => &[File("build.gradle"), File("build.gradle.kts")],
            Self::DotNet => &[Extension("csproj"), Extension("fsproj"), Extension("vbproj")],
            Self::Static => &[File("index.html")],
            Self::Unknown => &[],
        }
    }

    /// Whether the build runs in a separate toolchain stage.
    pub fn is_compiled(&self) -> bool {
        matches!(
            self,
            Self::Go | Self::Rust | Self::JavaMaven | Self::JavaGradle | Self::DotNet
        )
    }
}

impl fmt::Display for RuntimeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RuntimeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DETECTION_ORDER
            .iter()
            .chain(std::iter::once(&RuntimeKind::Unknown))
            .find(|kind| kind.as_str() == s)
            .copied()
            .ok_or_else(|| format!("unknown runtime kind: {s}"))
    }
}

/// Classify a build context by the marker files in its root.
///
/// Only checks for file existence; the first kind in [`DETECTION_ORDER`]
/// with a present marker wins.
pub fn detect(dir: &Path) -> RuntimeKind {
    let kind = DETECTION_ORDER
        .iter()
        .copied()
        .find(|kind| kind.markers().iter().any(|m| marker_present(dir, m)))
        .unwrap_or(RuntimeKind::Unknown);

    match kind {
        RuntimeKind::Dockerfile => tracing::info!("found Dockerfile, using custom build"),
        RuntimeKind::Unknown => tracing::warn!("could not detect runtime in {}", dir.display()),
        other => tracing::info!("detected {other} runtime"),
    }

    kind
}

fn marker_present(dir: &Path, marker: &Marker) -> bool {
    match marker {
        Marker::File(name) => dir.join(name).is_file(),
        Marker::Extension(ext) => has_file_with_extension(dir, ext),
    }
}

pub(crate) fn has_file_with_extension(dir: &Path, ext: &str) -> bool {
    first_file_with_extension(dir, ext).is_some()
}

/// First file (sorted by name) in `dir` with the given extension.
pub(crate) fn first_file_with_extension(dir: &Path, ext: &str) -> Option<String> {
    let entries = std::fs::read_dir(dir).ok()?;
    let mut names: Vec<String> = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_file())
        .filter(|entry| entry.path().extension().is_some_and(|e| e == ext))
        .filter_map(|entry| entry.file_name().into_string().ok())
        .collect();
    names.sort();
    names.into_iter().next()
}
