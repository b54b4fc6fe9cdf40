use std::path::Path;
use std::process::Command;

use flate2::Compression;
use flate2::write::GzEncoder;
use proptest::prelude::*;
use tempfile::TempDir;
use vesla_build::bundle::pack_source;
use vesla_build::context::{BuildContext, ContextError};
use vesla_build::detect::Marker;
use vesla_build::dockerfile::{DockerfileGenerator, RecipeError};
use vesla_build::eject::{EjectError, eject};
use vesla_build::{DETECTION_ORDER, RuntimeKind, detect};
use vesla_core::Manifest;

fn write(dir: &Path, name: &str, content: &str) {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, content).unwrap();
}

fn manifest(port: Option<&str>) -> Manifest {
    let mut manifest = Manifest {
        app: "blog".to_owned(),
        domain: Some("blog.vesla-app.site".to_owned()),
        ..Default::default()
    };
    if let Some(port) = port {
        manifest.env.insert("PORT".to_owned(), port.to_owned());
    }
    manifest
}

/// Minimal source tree that detects as `kind`.
fn fixture(kind: RuntimeKind) -> TempDir {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    match kind {
        RuntimeKind::Dockerfile => write(dir, "Dockerfile", "FROM scratch\n"),
        RuntimeKind::Python => {
            write(dir, "requirements.txt", "flask\n");
            write(dir, "app.py", "");
        }
        RuntimeKind::Node => {
            write(dir, "package.json", r#"{"name": "web"}"#);
            write(dir, "index.js", "");
        }
        RuntimeKind::Go => {
            write(dir, "go.mod", "module web\n");
            write(dir, "main.go", "package main\n");
        }
        RuntimeKind::Rust => {
            write(dir, "Cargo.toml", "[package]\nname = \"web\"\n");
            write(dir, "src/main.rs", "fn main() {}\n");
        }
        RuntimeKind::Ruby => {
            write(dir, "Gemfile", "source 'https://rubygems.org'\n");
            write(dir, "config.ru", "");
        }
        RuntimeKind::Php => write(dir, "index.php", "<?php echo 'hi';"),
        RuntimeKind::JavaMaven => write(dir, "pom.xml", "<project/>"),
        RuntimeKind::JavaGradle => write(dir, "build.gradle", ""),
        RuntimeKind::DotNet => write(dir, "Web.csproj", "<Project/>"),
        RuntimeKind::Static => write(dir, "index.html", "<h1>hi</h1>"),
        RuntimeKind::Unknown => write(dir, "README.md", "nothing here"),
    }
    tmp
}

fn render(kind: RuntimeKind, dir: &Path, manifest: &Manifest) -> String {
    DockerfileGenerator::new(kind, dir, manifest).render().unwrap()
}

fn gzip_tar(files: &[(&str, &str)]) -> Vec<u8> {
    let encoder = GzEncoder::new(Vec::new(), Compression::default());
    let mut builder = tar::Builder::new(encoder);
    for (path, content) in files {
        let mut header = tar::Header::new_gnu();
        header.set_size(content.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_data(&mut header, path, content.as_bytes())
            .unwrap();
    }
    builder.into_inner().unwrap().finish().unwrap()
}

// ── Detection ──

#[test]
fn detects_every_fixture() {
    for kind in DETECTION_ORDER {
        let tmp = fixture(kind);
        assert_eq!(detect(tmp.path()), kind, "fixture for {kind}");
    }
}

#[test]
fn detects_unknown_without_markers() {
    let tmp = fixture(RuntimeKind::Unknown);
    assert_eq!(detect(tmp.path()), RuntimeKind::Unknown);
}

#[test]
fn user_dockerfile_beats_package_json() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "Dockerfile", "FROM node:20\n");
    write(tmp.path(), "package.json", "{}");
    assert_eq!(detect(tmp.path()), RuntimeKind::Dockerfile);
}

#[test]
fn runtime_markers_beat_index_html() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "index.html", "");
    write(tmp.path(), "package.json", "{}");
    assert_eq!(detect(tmp.path()), RuntimeKind::Node);
}

#[test]
fn go_beats_node_when_both_present() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "package.json", "{}");
    write(tmp.path(), "go.mod", "module x\n");
    assert_eq!(detect(tmp.path()), RuntimeKind::Go);
}

#[test]
fn markers_in_subdirectories_are_ignored() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "frontend/package.json", "{}");
    assert_eq!(detect(tmp.path()), RuntimeKind::Unknown);
}

#[test]
fn directory_named_like_marker_is_ignored() {
    let tmp = TempDir::new().unwrap();
    std::fs::create_dir(tmp.path().join("Dockerfile")).unwrap();
    write(tmp.path(), "index.html", "");
    assert_eq!(detect(tmp.path()), RuntimeKind::Static);
}

proptest! {
    /// Any subset of marker files detects as the highest-priority kind present.
    #[test]
    fn detection_follows_priority_for_any_marker_subset(
        present in proptest::sample::subsequence(DETECTION_ORDER.to_vec(), 0..=DETECTION_ORDER.len())
    ) {
        let tmp = TempDir::new().unwrap();
        for kind in &present {
            let marker = match kind.markers()[0] {
                Marker::File(name) => name.to_owned(),
                Marker::Extension(ext) => format!("app.{ext}"),
            };
            write(tmp.path(), &marker, "");
        }

        let expected = present.first().copied().unwrap_or(RuntimeKind::Unknown);
        prop_assert_eq!(detect(tmp.path()), expected);
    }
}

// ── Dockerfile generation ──

#[test]
fn every_template_exposes_manifest_port() {
    for kind in DETECTION_ORDER {
        if kind == RuntimeKind::Dockerfile {
            continue;
        }
        let tmp = fixture(kind);
        let output = render(kind, tmp.path(), &manifest(Some("8123")));
        assert!(output.contains("EXPOSE 8123"), "{kind} recipe:\n{output}");
        assert!(!output.contains("EXPOSE 5000"), "{kind} recipe:\n{output}");
    }
}

#[test]
fn every_template_defaults_to_port_5000() {
    for kind in DETECTION_ORDER {
        if kind == RuntimeKind::Dockerfile {
            continue;
        }
        let tmp = fixture(kind);
        let output = render(kind, tmp.path(), &manifest(None));
        assert!(output.contains("EXPOSE 5000"), "{kind} recipe:\n{output}");
    }
}

#[test]
fn every_template_runs_as_non_root() {
    for kind in DETECTION_ORDER {
        if kind == RuntimeKind::Dockerfile {
            continue;
        }
        let tmp = fixture(kind);
        let output = render(kind, tmp.path(), &manifest(None));
        let last_user = output
            .lines()
            .filter(|line| line.starts_with("USER "))
            .last()
            .unwrap_or_else(|| panic!("{kind} recipe has no USER line"));
        assert_ne!(last_user, "USER root", "{kind}");
    }
}

#[test]
fn compiled_runtimes_use_multi_stage_builds() {
    for kind in DETECTION_ORDER.into_iter().filter(RuntimeKind::is_compiled) {
        let tmp = fixture(kind);
        let output = render(kind, tmp.path(), &manifest(None));
        assert!(output.contains("AS builder"), "{kind}");
        assert!(output.contains("COPY --from=builder"), "{kind}");
    }
}

#[test]
fn no_template_for_dockerfile_or_unknown() {
    let tmp = TempDir::new().unwrap();
    let manifest = manifest(None);
    for kind in [RuntimeKind::Dockerfile, RuntimeKind::Unknown] {
        let result = DockerfileGenerator::new(kind, tmp.path(), &manifest).render();
        assert!(matches!(result, Err(RecipeError::NoTemplate(k)) if k == kind));
    }
}

#[test]
fn python_requirements_installed_before_copy() {
    let tmp = fixture(RuntimeKind::Python);
    let output = render(RuntimeKind::Python, tmp.path(), &manifest(None));

    let install = output.find("pip install --no-cache-dir -r requirements.txt").unwrap();
    let copy_all = output.find("COPY . .").unwrap();
    assert!(install < copy_all);
    assert!(output.contains(r#"CMD ["python", "app.py"]"#));
}

#[test]
fn python_pyproject_installs_package_after_copy() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "pyproject.toml", "[project]\nname = \"x\"\n");
    write(tmp.path(), "main.py", "");
    let output = render(RuntimeKind::Python, tmp.path(), &manifest(None));

    let copy_all = output.find("COPY . .").unwrap();
    let install = output.find("pip install --no-cache-dir .").unwrap();
    assert!(copy_all < install);
    assert!(output.contains(r#"CMD ["python", "main.py"]"#));
}

#[test]
fn python_wsgi_installs_gunicorn() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "requirements.txt", "django\n");
    write(tmp.path(), "wsgi.py", "");
    let output = render(RuntimeKind::Python, tmp.path(), &manifest(Some("8000")));

    assert!(output.contains("pip install --no-cache-dir gunicorn"));
    assert!(output.contains(r#"CMD ["gunicorn", "--bind", "0.0.0.0:8000", "wsgi:app"]"#));
}

#[test]
fn python_pipfile_lock_enables_deploy() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "Pipfile", "");
    write(tmp.path(), "Pipfile.lock", "{}");
    let output = render(RuntimeKind::Python, tmp.path(), &manifest(None));
    assert!(output.contains("pipenv install --system --deploy"));
}

#[test]
fn node_uses_npm_ci_with_lockfile() {
    let tmp = fixture(RuntimeKind::Node);
    let without_lock = render(RuntimeKind::Node, tmp.path(), &manifest(None));
    assert!(without_lock.contains("RUN npm install --omit=dev"));

    write(tmp.path(), "package-lock.json", "{}");
    let with_lock = render(RuntimeKind::Node, tmp.path(), &manifest(None));
    assert!(with_lock.contains("RUN npm ci --omit=dev"));
    assert!(with_lock.contains(r#"CMD ["node", "index.js"]"#));
    assert!(with_lock.contains("USER node"));
}

#[test]
fn go_without_module_initialises_one() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "main.go", "package main\n");
    let output = render(RuntimeKind::Go, tmp.path(), &manifest(None));
    assert!(output.contains("go mod init app"));
    assert!(!output.contains("go mod download"));
}

#[test]
fn rust_builds_named_binary_with_cargo_chef() {
    let tmp = TempDir::new().unwrap();
    write(
        tmp.path(),
        "Cargo.toml",
        "[package]\nname = \"api\"\n\n[[bin]]\nname = \"api-server\"\n",
    );
    let output = render(RuntimeKind::Rust, tmp.path(), &manifest(None));

    // Edition 2024 needs a 1.85+ toolchain
    assert!(output.contains("FROM rust:1.85-bookworm AS chef"));
    assert!(output.contains("Stage 1: Planner"));
    assert!(output.contains("Stage 4: Runtime"));
    assert!(output.contains("cargo chef cook --release"));
    assert!(output.contains("cargo build --release --bin api-server"));
    assert!(output.contains("/app/target/release/api-server"));
}

#[test]
fn ruby_without_gemfile_bundles_rack() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "config.ru", "");
    let output = render(RuntimeKind::Ruby, tmp.path(), &manifest(Some("9292")));
    assert!(output.contains("gem 'rackup'"));
    assert!(output.contains(r#""rackup", "-o", "0.0.0.0", "-p", "9292""#));
}

#[test]
fn php_composer_and_public_docroot() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "composer.json", "{}");
    write(tmp.path(), "public/index.php", "");
    let output = render(RuntimeKind::Php, tmp.path(), &manifest(Some("8080")));

    assert!(output.contains("composer install --no-dev"));
    assert!(output.contains(r#"CMD ["php", "-S", "0.0.0.0:8080", "-t", "public"]"#));
}

#[test]
fn php_without_composer_skips_install() {
    let tmp = fixture(RuntimeKind::Php);
    let output = render(RuntimeKind::Php, tmp.path(), &manifest(None));
    assert!(!output.contains("composer"));
    assert!(output.contains(r#""-t", ".""#));
}

#[test]
fn dotnet_publishes_detected_project() {
    let tmp = fixture(RuntimeKind::DotNet);
    let output = render(RuntimeKind::DotNet, tmp.path(), &manifest(Some("8080")));
    assert!(output.contains("COPY Web.csproj ./"));
    assert!(output.contains("ASPNETCORE_URLS=http://+:8080"));
    assert!(output.contains(r#"ENTRYPOINT ["dotnet", "app.dll"]"#));
}

#[test]
fn static_site_listens_on_manifest_port() {
    let tmp = fixture(RuntimeKind::Static);
    let output = render(RuntimeKind::Static, tmp.path(), &manifest(Some("8081")));
    assert!(output.contains("listen 8081;"));
    assert!(output.contains("COPY . /usr/share/nginx/html"));
}

#[test]
fn static_site_prefers_shipped_nginx_conf() {
    let tmp = fixture(RuntimeKind::Static);
    write(tmp.path(), "nginx.conf", "server { listen 5000; }");
    let output = render(RuntimeKind::Static, tmp.path(), &manifest(None));
    assert!(output.contains("COPY nginx.conf /etc/nginx/conf.d/default.conf"));
    assert!(!output.contains("printf"));
}

#[test]
fn recipe_is_deterministic() {
    let tmp = fixture(RuntimeKind::Python);
    let manifest = manifest(Some("7000"));
    assert_eq!(
        render(RuntimeKind::Python, tmp.path(), &manifest),
        render(RuntimeKind::Python, tmp.path(), &manifest)
    );
}

// ── Build context ──

#[test]
fn blog_tarball_detects_python_and_exposes_5000() {
    let work = TempDir::new().unwrap();
    let tarball = gzip_tar(&[
        ("requirements.txt", "flask\n"),
        ("app.py", "print('hi')\n"),
    ]);

    let context = BuildContext::extract("blog", &tarball, work.path()).unwrap();
    assert!(!context.has_dockerfile());
    assert_eq!(detect(context.path()), RuntimeKind::Python);

    let manifest = manifest(None);
    let recipe = render(RuntimeKind::Python, context.path(), &manifest);
    assert!(recipe.contains("EXPOSE 5000"));
}

#[test]
fn extract_unwraps_single_top_level_dir() {
    let work = TempDir::new().unwrap();
    let tarball = gzip_tar(&[("blog/app.py", ""), ("blog/requirements.txt", "")]);

    let context = BuildContext::extract("blog", &tarball, work.path()).unwrap();
    assert!(context.path().join("app.py").is_file());
    assert!(context.path().ends_with("blog"));
}

#[test]
fn extract_keeps_root_with_several_entries() {
    let work = TempDir::new().unwrap();
    let tarball = gzip_tar(&[("src/main.go", ""), ("go.mod", "")]);

    let context = BuildContext::extract("api", &tarball, work.path()).unwrap();
    assert!(context.path().join("go.mod").is_file());
    assert_eq!(detect(context.path()), RuntimeKind::Go);
}

#[test]
fn extract_uses_prefixed_dir_in_work_dir() {
    let work = TempDir::new().unwrap();
    let tarball = gzip_tar(&[("index.html", "")]);

    let context = BuildContext::extract("site", &tarball, work.path()).unwrap();
    let scratch = context.scratch_dir();
    assert_eq!(scratch.parent().unwrap(), work.path());
    let name = scratch.file_name().unwrap().to_string_lossy();
    assert!(name.starts_with("vesla-build-site-"));
}

#[test]
fn context_is_removed_on_drop() {
    let work = TempDir::new().unwrap();
    let tarball = gzip_tar(&[("index.html", "")]);

    let scratch = {
        let context = BuildContext::extract("site", &tarball, work.path()).unwrap();
        context.scratch_dir().to_path_buf()
    };
    assert!(!scratch.exists());
    assert_eq!(std::fs::read_dir(work.path()).unwrap().count(), 0);
}

#[test]
fn extract_rejects_corrupt_tarball() {
    let work = TempDir::new().unwrap();
    let result = BuildContext::extract("x", b"definitely not gzip", work.path());
    assert!(matches!(result, Err(ContextError::Extract { .. })));
}

#[test]
fn extract_never_writes_outside_its_directory() {
    // tar::Builder refuses `..` paths, so write the raw header name
    let encoder = GzEncoder::new(Vec::new(), Compression::default());
    let mut builder = tar::Builder::new(encoder);
    for (path, content) in [
        ("index.html", "<h1>hi</h1>"),
        ("../escape.txt", "one level up"),
        ("../../outer.txt", "two levels up"),
    ] {
        let mut header = tar::Header::new_gnu();
        let name = &mut header.as_gnu_mut().unwrap().name;
        name[..path.len()].copy_from_slice(path.as_bytes());
        header.set_size(content.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append(&header, content.as_bytes()).unwrap();
    }
    let tarball = builder.into_inner().unwrap().finish().unwrap();

    let outer = TempDir::new().unwrap();
    let work = outer.path().join("work");
    let context = BuildContext::extract("site", &tarball, &work).unwrap();

    assert!(context.path().join("index.html").is_file());
    assert!(!work.join("escape.txt").exists());
    assert!(!outer.path().join("outer.txt").exists());
    assert!(!outer.path().join("escape.txt").exists());
}

#[test]
fn extract_rejects_empty_tarball() {
    let work = TempDir::new().unwrap();
    let result = BuildContext::extract("x", &gzip_tar(&[]), work.path());
    assert!(matches!(result, Err(ContextError::Empty)));
}

#[test]
fn write_dockerfile_then_archive() {
    let work = TempDir::new().unwrap();
    let tarball = gzip_tar(&[("index.html", "<h1>hi</h1>")]);
    let context = BuildContext::extract("site", &tarball, work.path()).unwrap();

    context.write_dockerfile("FROM nginx\n").unwrap();
    assert!(context.has_dockerfile());

    let archive = context.archive().unwrap();
    let mut names: Vec<String> = tar::Archive::new(archive.as_slice())
        .entries()
        .unwrap()
        .map(|e| e.unwrap().path().unwrap().to_string_lossy().into_owned())
        .filter(|p| p != "./" && p != ".")
        .map(|p| p.trim_start_matches("./").to_owned())
        .collect();
    names.sort();
    assert_eq!(names, vec!["Dockerfile", "index.html"]);
}

// ── Eject ──

#[test]
fn eject_writes_dockerfile_and_switches_detection() {
    let tmp = fixture(RuntimeKind::Node);
    let recipe = render(RuntimeKind::Node, tmp.path(), &manifest(None));

    let path = eject(tmp.path(), &recipe).unwrap();
    assert_eq!(std::fs::read_to_string(path).unwrap(), recipe);
    assert_eq!(detect(tmp.path()), RuntimeKind::Dockerfile);
}

#[test]
fn eject_twice_fails() {
    let tmp = fixture(RuntimeKind::Static);
    eject(tmp.path(), "FROM nginx\n").unwrap();
    let result = eject(tmp.path(), "FROM nginx\n");
    assert!(matches!(result, Err(EjectError::AlreadyEjected(_))));
}

// ── Bundle ──

fn git(dir: &Path, args: &[&str]) {
    Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .unwrap();
}

fn context_files(context: &BuildContext) -> Vec<String> {
    let mut names = Vec::new();
    let mut stack = vec![context.path().to_path_buf()];
    while let Some(dir) = stack.pop() {
        for entry in std::fs::read_dir(dir).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                stack.push(path);
            } else {
                let rel = path.strip_prefix(context.path()).unwrap();
                names.push(rel.to_string_lossy().into_owned());
            }
        }
    }
    names.sort();
    names
}

#[test]
fn pack_plain_directory_skips_vesla_excludes() {
    let tmp = fixture(RuntimeKind::Node);
    write(tmp.path(), "lib/util.js", "");
    write(tmp.path(), ".env", "SECRET=1");
    write(tmp.path(), ".git/HEAD", "ref: refs/heads/main");

    let tarball = pack_source(tmp.path()).unwrap();
    let work = TempDir::new().unwrap();
    let context = BuildContext::extract("web", &tarball, work.path()).unwrap();

    assert_eq!(
        context_files(&context),
        vec!["index.js", "lib/util.js", "package.json"]
    );
    assert_eq!(detect(context.path()), RuntimeKind::Node);
}

#[test]
fn pack_git_project_respects_gitignore() {
    let tmp = fixture(RuntimeKind::Python);
    git(tmp.path(), &["init"]);
    write(tmp.path(), ".gitignore", "venv/\n");
    write(tmp.path(), "venv/bin/python", "");

    let tarball = pack_source(tmp.path()).unwrap();
    let work = TempDir::new().unwrap();
    let context = BuildContext::extract("api", &tarball, work.path()).unwrap();

    let files = context_files(&context);
    assert!(files.contains(&"app.py".to_owned()));
    assert!(files.contains(&"requirements.txt".to_owned()));
    assert!(!files.iter().any(|f| f.starts_with("venv")));
}
