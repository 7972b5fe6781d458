//! Binary entry point: load a `ServerConfig`, build the in-memory
//! `CatalogStore`, and serve until the process is signalled to stop.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use nntp_server::{Listener, ServerConfig};
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "nntpd", about = "Async NNTP news server")]
struct Args {
    /// Path to the server's TOML configuration file.
    #[arg(long, short)]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let config = match load_config(&args.config).await {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, path = %args.config.display(), "failed to load configuration");
            return ExitCode::FAILURE;
        }
    };

    let store = Arc::new(nntp_server::store::memory::MemoryStore::new());
    let listener = match Listener::new(Arc::new(config), store) {
        Ok(listener) => listener,
        Err(e) => {
            error!(error = %e, "failed to build listener");
            return ExitCode::FAILURE;
        }
    };

    info!("nntpd starting");
    tokio::select! {
        result = listener.serve() => {
            if let Err(e) = result {
                error!(error = %e, "server exited with error");
                return ExitCode::FAILURE;
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("received shutdown signal");
        }
    }

    ExitCode::SUCCESS
}

#[derive(Debug)]
enum ConfigError {
    Read(std::io::Error),
    Parse(toml::de::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Read(e) => write!(f, "{e}"),
            ConfigError::Parse(e) => write!(f, "{e}"),
        }
    }
}

async fn load_config(path: &PathBuf) -> Result<ServerConfig, ConfigError> {
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(ConfigError::Read)?;
    ServerConfig::from_toml(&text).map_err(ConfigError::Parse)
}
