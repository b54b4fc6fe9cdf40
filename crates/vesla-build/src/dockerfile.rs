use std::path::Path;

use vesla_core::Manifest;

use crate::detect::RuntimeKind;
use crate::entrypoint;

/// Unprivileged user for Debian-based images.
const DEBIAN_USER: &str = "RUN useradd -m -u 1000 appuser";
/// Unprivileged user for Alpine-based images.
const ALPINE_USER: &str = "RUN adduser -D -u 1000 appuser";
/// Pinned cargo-chef release used by the Rust recipe.
const CARGO_CHEF_VERSION: &str = "0.1.68";

/// Renders a Dockerfile for a detected runtime.
///
/// The output depends only on the runtime kind, which files exist in the
/// build context, and the manifest's `PORT`.
pub struct DockerfileGenerator<'a> {
    kind: RuntimeKind,
    context_dir: &'a Path,
    manifest: &'a Manifest,
}

impl<'a> DockerfileGenerator<'a> {
    pub fn new(kind: RuntimeKind, context_dir: &'a Path, manifest: &'a Manifest) -> Self {
        Self {
            kind,
            context_dir,
            manifest,
        }
    }

    pub fn render(&self) -> Result<String, RecipeError> {
        let dir = self.context_dir;
        let port = self.manifest.port();

        let recipe = match self.kind {
            RuntimeKind::Python => python(dir, port),
            RuntimeKind::Node => node(dir, port),
            RuntimeKind::Go => go(dir, port),
            RuntimeKind::Rust => rust(dir, port),
            RuntimeKind::Ruby => ruby(dir, port),
            RuntimeKind::Php => php(dir, port),
            RuntimeKind::JavaMaven => java_maven(port),
            RuntimeKind::JavaGradle => java_gradle(port),
            RuntimeKind::DotNet => dotnet(dir, port),
            RuntimeKind::Static => static_site(dir, port),
            RuntimeKind::Dockerfile | RuntimeKind::Unknown => {
                return Err(RecipeError::NoTemplate(self.kind));
            }
        };

        Ok(recipe)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RecipeError {
    #[error("cannot generate a Dockerfile for runtime: {0}")]
    NoTemplate(RuntimeKind),
}

fn python(dir: &Path, port: &str) -> String {
    let (deps, post_copy) = if dir.join("requirements.txt").exists() {
        (
            "COPY requirements.txt ./\n\
             RUN pip install --no-cache-dir -r requirements.txt\n"
                .to_owned(),
            String::new(),
        )
    } else if dir.join("Pipfile").exists() {
        let deploy = if dir.join("Pipfile.lock").exists() {
            " --deploy"
        } else {
            ""
        };
        (
            format!(
                "COPY Pipfile Pipfile.lock* ./\n\
                 RUN pip install --no-cache-dir pipenv && pipenv install --system{deploy}\n"
            ),
            String::new(),
        )
    } else {
        // pyproject.toml / setup.py installs need the package source
        (
            String::new(),
            "RUN pip install --no-cache-dir .\n".to_owned(),
        )
    };

    let gunicorn = if entrypoint::python_needs_gunicorn(dir) {
        "RUN pip install --no-cache-dir gunicorn\n"
    } else {
        ""
    };

    format!(
        r#"FROM python:3.11-slim

ENV PYTHONUNBUFFERED=1
{DEBIAN_USER}

WORKDIR /app

# Dependencies first for layer caching
RUN pip install --no-cache-dir -U pip
{deps}{gunicorn}
COPY . .
{post_copy}RUN chown -R appuser:appuser /app

USER appuser

EXPOSE {port}

{cmd}
"#,
        cmd = exec_form("CMD", &entrypoint::python(dir, port)),
    )
}

fn node(dir: &Path, port: &str) -> String {
    let install = if dir.join("package-lock.json").exists() {
        "npm ci --omit=dev"
    } else {
        "npm install --omit=dev"
    };

    format!(
        r#"FROM node:20-slim

ENV NODE_ENV=production

WORKDIR /app

# Dependencies first for layer caching
COPY package*.json ./
RUN {install}

COPY . .
RUN chown -R node:node /app

# The base image ships an unprivileged `node` user (uid 1000)
USER node

EXPOSE {port}

{cmd}
"#,
        cmd = exec_form("CMD", &entrypoint::node(dir)),
    )
}

fn go(dir: &Path, port: &str) -> String {
    let sources = if dir.join("go.mod").exists() {
        "COPY go.mod go.sum* ./\n\
         RUN go mod download\n\
         \n\
         COPY . ."
    } else {
        "COPY . .\n\
         RUN go mod init app && go mod tidy"
    };

    format!(
        r#"# === Stage 1: Builder ===
FROM golang:1.22-alpine AS builder

WORKDIR /src

{sources}
RUN CGO_ENABLED=0 GOOS=linux go build -trimpath -ldflags="-s -w" -o /out/app .

# === Stage 2: Runtime ===
FROM alpine:3.19

RUN apk --no-cache add ca-certificates
{ALPINE_USER}

WORKDIR /app
COPY --from=builder /out/app ./app

USER appuser

EXPOSE {port}

CMD ["./app"]
"#
    )
}

fn rust(dir: &Path, port: &str) -> String {
    let binary = entrypoint::rust_binary(dir);

    format!(
        r#"# === Base: cargo-chef installed once ===
FROM rust:1.85-bookworm AS chef
RUN cargo install cargo-chef --version {CARGO_CHEF_VERSION} --locked
WORKDIR /app

# === Stage 1: Planner ===
FROM chef AS planner
COPY . .
RUN cargo chef prepare --recipe-path recipe.json

# === Stage 2: Cacher (dependency build) ===
FROM chef AS cacher
COPY --from=planner /app/recipe.json recipe.json
RUN cargo chef cook --release --recipe-path recipe.json

# === Stage 3: Builder ===
FROM chef AS builder
COPY --from=cacher /app/target target
COPY --from=cacher /usr/local/cargo /usr/local/cargo
COPY . .
RUN cargo build --release --bin {binary}

# === Stage 4: Runtime ===
FROM debian:bookworm-slim
RUN apt-get update && apt-get install -y --no-install-recommends ca-certificates \
    && rm -rf /var/lib/apt/lists/*
{DEBIAN_USER}

WORKDIR /app
COPY --from=builder /app/target/release/{binary} /usr/local/bin/app

USER appuser

EXPOSE {port}

CMD ["app"]
"#
    )
}

fn ruby(dir: &Path, port: &str) -> String {
    let gems = if dir.join("Gemfile").exists() {
        "COPY Gemfile Gemfile.lock* ./\n\
         RUN bundle config set --local without 'development test' && bundle install\n"
    } else {
        // Rack app without a Gemfile: bundle the minimum needed to boot it
        "RUN printf \"source 'https://rubygems.org'\\ngem 'rack'\\ngem 'rackup'\\ngem 'webrick'\\n\" > Gemfile \\\n    && bundle install\n"
    };

    format!(
        r#"FROM ruby:3.2-slim

RUN apt-get update && apt-get install -y --no-install-recommends build-essential libpq-dev \
    && rm -rf /var/lib/apt/lists/*
{DEBIAN_USER}

WORKDIR /app

# Dependencies first for layer caching
{gems}
COPY . .
RUN chown -R appuser:appuser /app

USER appuser

EXPOSE {port}

{cmd}
"#,
        cmd = exec_form("CMD", &entrypoint::ruby(dir, port)),
    )
}

fn php(dir: &Path, port: &str) -> String {
    let has_composer = dir.join("composer.json").exists();
    let deps = if has_composer {
        "COPY --from=composer:2 /usr/bin/composer /usr/bin/composer\n\
         COPY composer.json composer.lock* ./\n\
         RUN composer install --no-dev --no-scripts --no-autoloader --prefer-dist\n"
    } else {
        ""
    };
    let autoload = if has_composer {
        "RUN composer dump-autoload --optimize --no-dev\n"
    } else {
        ""
    };
    let bind = format!("0.0.0.0:{port}");
    let docroot = entrypoint::php_docroot(dir);

    format!(
        r#"FROM php:8.2-cli-alpine

{ALPINE_USER}

WORKDIR /app

{deps}
COPY . .
{autoload}RUN chown -R appuser:appuser /app

USER appuser

EXPOSE {port}

{cmd}
"#,
        cmd = exec_form("CMD", &["php", "-S", bind.as_str(), "-t", docroot]),
    )
}

/// Copies the first non-plain jar under `dir` to `/app/app.jar` in the builder stage.
fn collect_jar(dir: &str) -> String {
    format!(
        "RUN find {dir} -maxdepth 1 -name '*.jar' ! -name '*-plain.jar' ! -name '*-sources.jar' \\\n    | head -n 1 | xargs -I{{}} cp {{}} /app/app.jar"
    )
}

fn jvm_runtime(port: &str) -> String {
    format!(
        r#"# === Stage 2: Runtime ===
FROM eclipse-temurin:21-jre-alpine

{ALPINE_USER}

WORKDIR /app
COPY --from=builder /app/app.jar app.jar

USER appuser

EXPOSE {port}

CMD ["java", "-jar", "app.jar"]
"#
    )
}

fn java_maven(port: &str) -> String {
    format!(
        r#"# === Stage 1: Builder ===
FROM maven:3.9-eclipse-temurin-21-alpine AS builder

WORKDIR /app

# Resolve dependencies before copying sources
COPY pom.xml .
RUN mvn -B dependency:go-offline

COPY . .
RUN mvn -B package -DskipTests
{jar}

{runtime}"#,
        jar = collect_jar("target"),
        runtime = jvm_runtime(port),
    )
}

fn java_gradle(port: &str) -> String {
    format!(
        r#"# === Stage 1: Builder ===
FROM gradle:8.5-jdk21-alpine AS builder

WORKDIR /app

# Resolve dependencies before copying sources
COPY build.gradle* settings.gradle* ./
RUN gradle dependencies --no-daemon > /dev/null 2>&1 || true

COPY . .
RUN gradle build --no-daemon -x test
{jar}

{runtime}"#,
        jar = collect_jar("build/libs"),
        runtime = jvm_runtime(port),
    )
}

fn dotnet(dir: &Path, port: &str) -> String {
    let project = entrypoint::dotnet_project(dir).unwrap_or_else(|| "*.csproj".to_owned());

    format!(
        r#"# === Stage 1: Builder ===
FROM mcr.microsoft.com/dotnet/sdk:8.0 AS builder

WORKDIR /src

# Restore before copying sources
COPY {project} ./
RUN dotnet restore

COPY . .
RUN dotnet publish -c Release -o /out -p:AssemblyName=app

# === Stage 2: Runtime ===
FROM mcr.microsoft.com/dotnet/aspnet:8.0-alpine

{ALPINE_USER}

WORKDIR /app
COPY --from=builder /out .

USER appuser

ENV ASPNETCORE_URLS=http://+:{port}
EXPOSE {port}

ENTRYPOINT ["dotnet", "app.dll"]
"#
    )
}

fn static_site(dir: &Path, port: &str) -> String {
    let server_config = if dir.join("nginx.conf").exists() {
        "COPY nginx.conf /etc/nginx/conf.d/default.conf".to_owned()
    } else {
        format!(
            "RUN printf 'server {{\\n    listen {port};\\n    root /usr/share/nginx/html;\\n    index index.html;\\n    location / {{\\n        try_files $uri $uri/ =404;\\n    }}\\n}}\\n' \\\n    > /etc/nginx/conf.d/default.conf"
        )
    };

    format!(
        r#"FROM nginxinc/nginx-unprivileged:1.25-alpine

USER root
{server_config}
COPY . /usr/share/nginx/html
RUN rm -f /usr/share/nginx/html/nginx.conf \
    && chown -R nginx:nginx /usr/share/nginx/html /etc/nginx/conf.d

# Serve as the image's unprivileged nginx user
USER nginx

EXPOSE {port}
"#
    )
}

/// Render `CMD ["a", "b"]` with JSON string quoting.
fn exec_form<S: AsRef<str>>(instruction: &str, argv: &[S]) -> String {
    let args: Vec<String> = argv
        .iter()
        .map(|arg| serde_json::Value::from(arg.as_ref()).to_string())
        .collect();
    format!("{instruction} [{}]", args.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exec_form_quotes_arguments() {
        assert_eq!(
            exec_form("CMD", &["node", "index.js"]),
            r#"CMD ["node", "index.js"]"#
        );
        assert_eq!(
            exec_form("CMD", &["sh", "-c", "echo \"hi\""]),
            r#"CMD ["sh", "-c", "echo \"hi\""]"#
        );
    }

    #[test]
    fn collect_jar_skips_plain_jars() {
        let line = collect_jar("build/libs");
        assert!(line.contains("find build/libs"));
        assert!(line.contains("! -name '*-plain.jar'"));
        assert!(line.contains("cp {} /app/app.jar"));
    }
}
