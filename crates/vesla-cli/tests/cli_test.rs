use std::path::Path;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use tempfile::TempDir;

fn vesla() -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("vesla");
    cmd.env_remove("VESLA_DO_TOKEN").env("RUST_LOG", "warn");
    cmd
}

fn write(dir: &Path, name: &str, content: &str) {
    std::fs::write(dir.join(name), content).unwrap();
}

fn node_app() -> TempDir {
    let tmp = TempDir::new().unwrap();
    write(
        tmp.path(),
        "package.json",
        r#"{"scripts": {"start": "node server.js"}}"#,
    );
    write(
        tmp.path(),
        "vesla.yaml",
        "app: blog\ndomain: blog.example.site\nenv:\n  PORT: \"8080\"\n",
    );
    tmp
}

// ── Help / Version ──

#[test]
fn shows_help() {
    vesla()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Docker and Traefik"));
}

#[test]
fn shows_version() {
    vesla()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("vesla"));
}

// ── Detect ──

#[test]
fn detect_prints_runtime_and_recipe() {
    let app = node_app();

    vesla()
        .arg("detect")
        .arg(app.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Runtime: node"))
        .stdout(predicate::str::contains(r#"CMD ["npm", "start"]"#))
        .stdout(predicate::str::contains("EXPOSE 8080"));
}

#[test]
fn detect_without_manifest_uses_default_port() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "requirements.txt", "flask\n");
    write(tmp.path(), "app.py", "");

    vesla()
        .arg("detect")
        .arg(tmp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Runtime: python"))
        .stdout(predicate::str::contains("EXPOSE 5000"));
}

#[test]
fn detect_reports_own_dockerfile() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "Dockerfile", "FROM scratch\n");
    write(tmp.path(), "package.json", "{}");

    vesla()
        .arg("detect")
        .arg(tmp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Runtime: dockerfile"));
}

#[test]
fn detect_fails_on_unknown_runtime() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "notes.txt", "hello");

    vesla()
        .arg("detect")
        .arg(tmp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("could not detect a runtime"));
}

#[test]
fn detect_runtime_override_renders_that_recipe() {
    let app = node_app();

    vesla()
        .args(["detect", "--runtime", "static"])
        .arg(app.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Runtime: static"))
        .stdout(predicate::str::contains("nginx"));
}

#[test]
fn detect_rejects_unknown_runtime_name() {
    vesla()
        .args(["detect", "--runtime", "cobol"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown runtime kind: cobol"));
}

// ── Eject ──

#[test]
fn eject_writes_dockerfile_into_app_dir() {
    let app = node_app();

    vesla()
        .arg("eject")
        .arg(app.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Ejected node recipe"));

    let dockerfile = std::fs::read_to_string(app.path().join("Dockerfile")).unwrap();
    assert!(dockerfile.contains("EXPOSE 8080"));

    // Ejected apps now detect as custom builds
    vesla()
        .arg("detect")
        .arg(app.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Runtime: dockerfile"));
}

#[test]
fn eject_fails_on_second_run() {
    let app = node_app();

    vesla().arg("eject").arg(app.path()).assert().success();
    vesla().arg("eject").arg(app.path()).assert().failure();
}

// ── Init ──

#[test]
fn init_creates_config_and_manifest() {
    let tmp = TempDir::new().unwrap();

    vesla()
        .current_dir(tmp.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Created"));

    let toml = std::fs::read_to_string(tmp.path().join("vesla.toml")).unwrap();
    assert!(toml.contains("allowed_domains"));
    let yaml = std::fs::read_to_string(tmp.path().join("vesla.yaml")).unwrap();
    assert!(yaml.contains("app: myapp"));
}

#[test]
fn init_twice_creates_nothing() {
    let tmp = TempDir::new().unwrap();

    vesla().current_dir(tmp.path()).arg("init").assert().success();
    vesla()
        .current_dir(tmp.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Nothing to create"));
}

// ── Deploy (no Docker needed) ──

#[test]
fn deploy_without_manifest_fails() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "package.json", "{}");

    vesla()
        .current_dir(tmp.path())
        .arg("deploy")
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to read manifest"));
}

#[test]
fn deploy_rejects_domain_outside_allow_list() {
    let app = node_app();
    let config = TempDir::new().unwrap();
    write(
        config.path(),
        "vesla.toml",
        "[server]\nallowed_domains = [\"vesla-app.site\"]\n",
    );

    vesla()
        .env("DOCKER_HOST", "unix:///nonexistent/docker.sock")
        .arg("--config-dir")
        .arg(config.path())
        .arg("deploy")
        .arg(app.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("allowed base domains: vesla-app.site"))
        .stderr(predicate::str::contains("container engine").not());
}
