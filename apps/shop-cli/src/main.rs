//! # Shop CLI
//!
//! Command-line shell over the shop client engine.
//!
//! ## Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  args ──► config (file → env → flags) ──► ShopClient::from_config      │
//! │                                                 │                       │
//! │                                                 ▼                       │
//! │                        start(): restore persisted session, validate     │
//! │                                                 │                       │
//! │                                                 ▼                       │
//! │                        run command ──► print ──► shutdown               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

mod cli;
mod commands;

use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use shop_sync::{ClientConfig, ShopClient};

use crate::cli::{Args, Command, ConfigCommand};

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_tracing(args.log_level.as_deref());

    if let Err(e) = run(args).await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = ClientConfig::load(args.config.clone())?;
    if let Some(url) = &args.api_url {
        config.api.base_url = url.clone();
    }
    if let Some(backend) = args.storage {
        config.storage.backend = backend;
    }
    config.validate()?;

    // Config commands never touch the network or the session store.
    if let Command::Config(cmd) = &args.command {
        return match cmd {
            ConfigCommand::Show => {
                print!("{}", toml::to_string_pretty(&config)?);
                Ok(())
            }
            ConfigCommand::Init => {
                config.save(args.config.clone())?;
                println!("Configuration written");
                Ok(())
            }
        };
    }

    let mut client = ShopClient::from_config(config).await?;
    client.start().await?;
    client.wait_for_validation().await;
    debug!(authenticated = client.session().is_authenticated(), "Client ready");

    let result = commands::execute(&client, args.command, args.json).await;
    client.shutdown().await;
    result
}

/// Initializes the tracing subscriber for structured logging.
///
/// ## Log Levels
/// - `--log-level debug` - Takes precedence over the environment
/// - `RUST_LOG=shop_sync=trace` - Trace for the engine only
/// - Default: warnings only, so command output stays readable
fn init_tracing(level: Option<&str>) {
    let filter = match level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("warn,shop_sync=info,sqlx=warn")),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
