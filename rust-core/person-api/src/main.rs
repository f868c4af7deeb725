// SPDX-License-Identifier: PMPL-1.0-or-later
//! Person API server binary
//!
//! Parses the command line, opens the configured storage backend and serves
//! the HTTP API until interrupted.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use person_api::{ApiConfig, BasicAuthConfig};
use person_storage::{open_storage, BackendKind, StorageConfig};

/// Person directory HTTP service.
#[derive(Parser, Debug)]
#[command(name = "person-api", version, about = "Person directory HTTP service")]
struct Cli {
    /// Address to bind to.
    #[arg(long, env = "PERSON_HOST", default_value = "0.0.0.0")]
    host: String,

    /// Port to listen on.
    #[arg(long, env = "PERSON_PORT", default_value_t = 5002)]
    port: u16,

    /// Storage backend: memory, document or relational.
    #[arg(short, long, env = "PERSON_STORAGE", default_value_t = BackendKind::Memory)]
    storage: BackendKind,

    /// Directory for on-disk database files.
    #[arg(long, env = "PERSON_DATA_DIR", default_value = "./data")]
    data_dir: PathBuf,

    /// Include request and response bodies in the access log.
    #[arg(long, env = "PERSON_LOG_BODY")]
    log_body: bool,

    /// Basic auth user name.
    #[arg(long, env = "PERSON_AUTH_USER", default_value = "admin")]
    auth_user: String,

    /// Basic auth password.
    #[arg(long, env = "PERSON_AUTH_PASSWORD", default_value = "admin", hide_env_values = true)]
    auth_password: String,

    /// Log output format.
    #[arg(long, env = "PERSON_LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

impl Cli {
    fn into_config(self) -> ApiConfig {
        ApiConfig {
            host: self.host,
            port: self.port,
            log_body: self.log_body,
            auth: BasicAuthConfig::new(self.auth_user, self.auth_password),
            storage: StorageConfig {
                backend: self.storage,
                data_dir: self.data_dir,
            },
        }
    }
}

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    match format {
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    let config = cli.into_config();
    tracing::info!(
        "Starting Person API on {}:{} with {} storage",
        config.host,
        config.port,
        config.storage.backend
    );

    let storage = open_storage(&config.storage)?;
    person_api::serve(config, storage).await?;

    Ok(())
}
