//! CLI argument parsing via clap.

use clap::{Parser, Subcommand};

/// Sign in to the identity provider and mint tokens for the local user.
#[derive(Debug, Parser)]
#[command(name = "signon", version)]
pub struct Args {
    /// Path to an app config JSON file (default: embedded config).
    #[arg(long = "app-config")]
    pub app_config: Option<String>,

    /// Path to an OAuth client secret JSON file (default: embedded config).
    #[arg(short = 'c', long = "client-secret")]
    pub client_secret: Option<String>,

    /// Directory for cached users and tokens (default: ~/.config/signon).
    #[arg(long = "data-dir")]
    pub data_dir: Option<String>,

    /// Redirect identity endpoints to a local emulator (host:port).
    #[arg(long = "emulator-host")]
    pub emulator_host: Option<String>,

    /// Store the signed-in user in the OS keyring instead of a disk file.
    #[cfg(feature = "keyring")]
    #[arg(long = "keyring")]
    pub keyring: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Interactively sign in with an authorization code.
    #[command(alias = "signin")]
    Login,
    /// Sign out and clear the cached user.
    #[command(alias = "signout")]
    Logout,
    /// Show the currently signed-in user.
    Status,
    /// Print a currently valid access token.
    Token,
}
