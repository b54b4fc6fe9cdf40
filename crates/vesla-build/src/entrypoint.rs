//! Start-command detection for generated recipes.
//!
//! Each function inspects the build context and returns the argv the
//! container should run. Only file presence is checked, except for
//! `package.json` (start script) and `Cargo.toml` (binary name).

use std::path::Path;

use serde::Deserialize;

use crate::detect::first_file_with_extension;

/// Start command for a Python app.
pub fn python(dir: &Path, port: &str) -> Vec<String> {
    let bind = format!("0.0.0.0:{port}");
    if dir.join("app.py").exists() {
        argv(["python", "app.py"])
    } else if dir.join("main.py").exists() {
        argv(["python", "main.py"])
    } else if dir.join("wsgi.py").exists() {
        argv(["gunicorn", "--bind", bind.as_str(), "wsgi:app"])
    } else if dir.join("manage.py").exists() {
        argv(["python", "manage.py", "runserver", bind.as_str()])
    } else {
        argv(["python", "app.py"])
    }
}

/// Whether the Python start command needs gunicorn installed.
pub fn python_needs_gunicorn(dir: &Path) -> bool {
    !dir.join("app.py").exists() && !dir.join("main.py").exists() && dir.join("wsgi.py").exists()
}

#[derive(Deserialize)]
struct PackageJson {
    #[serde(default)]
    scripts: std::collections::HashMap<String, String>,
}

/// Start command for a Node app: a declared `start` script wins, then the
/// conventional entry files.
pub fn node(dir: &Path) -> Vec<String> {
    if has_start_script(dir) {
        return argv(["npm", "start"]);
    }
    for entry in ["index.js", "server.js", "app.js"] {
        if dir.join(entry).exists() {
            return argv(["node", entry]);
        }
    }
    argv(["npm", "start"])
}

fn has_start_script(dir: &Path) -> bool {
    let path = dir.join("package.json");
    let content = match std::fs::read_to_string(&path) {
        Ok(content) => content,
        Err(e) => {
            tracing::warn!("could not read {}: {e}", path.display());
            return false;
        }
    };
    match serde_json::from_str::<PackageJson>(&content) {
        Ok(package) => package.scripts.contains_key("start"),
        Err(e) => {
            tracing::warn!("could not parse package.json: {e}");
            false
        }
    }
}

/// Start command for a Ruby app (Rack, Rails, or Sinatra).
pub fn ruby(dir: &Path, port: &str) -> Vec<String> {
    if dir.join("config.ru").exists() {
        argv(["bundle", "exec", "rackup", "-o", "0.0.0.0", "-p", port])
    } else if dir.join("config").join("environment.rb").exists() {
        argv(["bundle", "exec", "rails", "server", "-b", "0.0.0.0", "-p", port])
    } else {
        argv(["bundle", "exec", "ruby", "app.rb", "-o", "0.0.0.0", "-p", port])
    }
}

/// Document root for PHP's built-in server.
pub fn php_docroot(dir: &Path) -> &'static str {
    if dir.join("public").join("index.php").exists() {
        "public"
    } else {
        "."
    }
}

#[derive(Deserialize)]
struct CargoToml {
    package: Option<PackageSection>,
    bin: Option<Vec<BinSection>>,
}

#[derive(Deserialize)]
struct PackageSection {
    name: Option<String>,
}

#[derive(Deserialize)]
struct BinSection {
    name: Option<String>,
}

/// Binary to build for a Rust app: first `[[bin]]` entry, or the package name.
///
/// Falls back to `app` when `Cargo.toml` cannot be read or names nothing.
pub fn rust_binary(dir: &Path) -> String {
    let path = dir.join("Cargo.toml");
    let parsed = std::fs::read_to_string(&path)
        .map_err(|e| e.to_string())
        .and_then(|content| toml::from_str::<CargoToml>(&content).map_err(|e| e.to_string()));

    let parsed = match parsed {
        Ok(parsed) => parsed,
        Err(e) => {
            tracing::warn!("could not parse {}: {e}", path.display());
            return "app".to_owned();
        }
    };

    let package_name = parsed.package.and_then(|p| p.name);
    parsed
        .bin
        .and_then(|bins| bins.into_iter().next())
        .and_then(|b| b.name)
        .or(package_name)
        .unwrap_or_else(|| "app".to_owned())
}

/// The .NET project file to publish, if any.
pub fn dotnet_project(dir: &Path) -> Option<String> {
    ["csproj", "fsproj", "vbproj"]
        .iter()
        .find_map(|ext| first_file_with_extension(dir, ext))
}

fn argv<const N: usize>(a: [&str; N]) -> Vec<String> {
    a.iter().map(|s| (*s).to_owned()).collect()
}
