//! Command-line arguments.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use shop_sync::StorageBackend;

/// Shop client command line.
#[derive(Parser, Debug, Clone)]
#[command(name = "shop", version, about = "Sign in to the shop and manage your cart")]
pub struct Args {
    /// Config file path (defaults to the platform config dir).
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Override the API base URL.
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Override the session storage backend (memory or sqlite).
    #[arg(long, global = true)]
    pub storage: Option<StorageBackend>,

    /// Log filter override, e.g. `debug` or `shop_sync=trace`.
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Print machine-readable JSON.
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Sign in and remember the session.
    Login {
        #[arg(short, long)]
        email: String,
        #[arg(short, long)]
        password: String,
    },

    /// Create an account and sign in with it.
    Register {
        #[arg(short, long)]
        username: String,
        #[arg(short, long)]
        firstname: String,
        #[arg(short, long)]
        email: String,
        #[arg(short, long)]
        password: String,
    },

    /// Forget the stored session.
    Logout,

    /// Show the signed-in user.
    Whoami,

    /// Inspect or change the cart.
    #[command(subcommand)]
    Cart(CartCommand),

    /// Inspect or write the configuration.
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Subcommand, Debug, Clone)]
pub enum CartCommand {
    /// Print the cart.
    Show,

    /// Add a product.
    Add {
        product_id: i64,
        #[arg(short, long, default_value_t = 1)]
        quantity: i64,
    },

    /// Set the quantity of a cart line. Zero removes it.
    Update { line_id: i64, quantity: i64 },

    /// Remove a cart line.
    Remove { line_id: i64 },

    /// Empty the cart.
    Clear,
}

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigCommand {
    /// Print the effective configuration.
    Show,

    /// Write the effective configuration to the config file.
    Init,
}
