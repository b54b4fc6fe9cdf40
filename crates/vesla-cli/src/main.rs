mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use vesla::build::RuntimeKind;

#[derive(Parser)]
#[command(name = "vesla", about = "Deploy apps to your own server with Docker and Traefik")]
#[command(version)]
struct Cli {
    /// Directory containing vesla.toml
    #[arg(long, global = true, default_value = ".")]
    config_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build and deploy an app directory (reads <DIR>/vesla.yaml)
    Deploy {
        #[arg(default_value = ".")]
        dir: PathBuf,
        /// Wait for the app's DNS record to resolve after deploying
        #[arg(long)]
        wait_dns: bool,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the container status of an app
    Status {
        app: String,
        #[arg(long)]
        json: bool,
    },
    /// Show recent container logs
    Logs {
        app: String,
        /// Number of log lines to show (default: 100)
        #[arg(long, short = 'n')]
        tail: Option<usize>,
    },
    /// Stop and remove an app's container
    Destroy {
        app: String,
        /// Skip confirmation prompt
        #[arg(long, short = 'y')]
        yes: bool,
        /// Also delete the app's DNS record
        #[arg(long)]
        release_dns: bool,
    },
    /// List every deployed app
    Apps {
        #[arg(long)]
        json: bool,
    },
    /// Show the detected runtime and the Dockerfile that would be generated
    Detect {
        #[arg(default_value = ".")]
        dir: PathBuf,
        /// Render the recipe for this runtime instead of the detected one
        #[arg(long)]
        runtime: Option<RuntimeKind>,
    },
    /// Write the generated Dockerfile into the app directory for manual customization
    Eject {
        #[arg(default_value = ".")]
        dir: PathBuf,
        /// Eject the recipe for this runtime instead of the detected one
        #[arg(long)]
        runtime: Option<RuntimeKind>,
    },
    /// Check Docker, network, config, and DNS readiness
    Doctor,
    /// Write a starter vesla.toml and vesla.yaml
    Init,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    match dotenvy::dotenv() {
        Ok(path) => tracing::debug!("loaded {}", path.display()),
        Err(e) if e.not_found() => tracing::debug!("no .env file: {e}"),
        Err(e) => tracing::warn!("failed to load .env: {e}"),
    }

    let cli = Cli::parse();
    let config_dir = cli.config_dir.as_path();

    match cli.command {
        Commands::Deploy {
            dir,
            wait_dns,
            json,
        } => commands::deploy(config_dir, &dir, wait_dns, json).await?,
        Commands::Status { app, json } => commands::status(config_dir, &app, json).await?,
        Commands::Logs { app, tail } => commands::logs(config_dir, &app, tail).await?,
        Commands::Destroy {
            app,
            yes,
            release_dns,
        } => commands::destroy(config_dir, &app, yes, release_dns).await?,
        Commands::Apps { json } => commands::apps(config_dir, json).await?,
        Commands::Detect { dir, runtime } => commands::detect(&dir, runtime)?,
        Commands::Eject { dir, runtime } => commands::eject(&dir, runtime)?,
        Commands::Doctor => commands::doctor(config_dir).await?,
        Commands::Init => commands::init(config_dir)?,
    }

    Ok(())
}
