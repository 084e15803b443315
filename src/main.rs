//! authgate binary: serve the settings gateway or inspect the posture.

use anyhow::Result;
use authgate::auth::{AuthModeStore, ConfigQuery};
use authgate::config::Settings;
use authgate::gateway;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "authgate", version, about = "Authentication posture control for self-hosted instances")]
struct Cli {
    /// Path to config.toml (defaults to the platform config dir).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP gateway.
    Serve {
        /// Override the bind host.
        #[arg(long)]
        host: Option<String>,
        /// Override the bind port.
        #[arg(long)]
        port: Option<u16>,
    },
    /// Print the current authentication posture.
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let mut settings = Settings::load(cli.config.as_deref())?;

    match cli.command {
        Command::Serve { host, port } => {
            if let Some(host) = host {
                settings.gateway.host = host;
            }
            if let Some(port) = port {
                settings.gateway.port = port;
            }
            gateway::run_gateway(settings).await
        }
        Command::Status => {
            let store = Arc::new(AuthModeStore::open(&settings.db_path()?)?);
            let desc = ConfigQuery::new(store).describe()?;
            println!("mode: {}", desc.mode);
            println!("requires auth: {}", desc.requires_auth);
            Ok(())
        }
    }
}
