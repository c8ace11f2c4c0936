//! CLI interface for mcn-auth

pub mod commands;
mod output;

pub use output::*;

use clap::{Parser, Subcommand, ValueEnum};

use crate::auth::LoginType;

#[derive(Parser)]
#[command(name = "mcn-auth")]
#[command(author = "Krakaw")]
#[command(version = "0.3.0")]
#[command(about = "Sign in to the MCN operations platform and manage the local session", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new mcn-auth.toml configuration file
    Init,

    /// Sign in with a phone number and SMS code
    Login {
        /// Phone number (prompted if omitted)
        #[arg(short, long)]
        phone: Option<String>,

        /// One-time SMS code (prompted if omitted)
        #[arg(short, long)]
        code: Option<String>,

        /// Dashboard to sign in to: brand, mcn or talent
        #[arg(short = 't', long = "type", default_value = "brand")]
        login_type: LoginType,

        /// Keep the session in memory only instead of remembering it on disk
        #[arg(long)]
        no_remember: bool,
    },

    /// Sign out and clear the stored session
    Logout,

    /// Show the current session state
    Status {
        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Show the signed-in user and their roles
    Whoami {
        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Reload the signed-in user's module permissions
    RefreshProfile,

    /// Run the development auth server
    Serve {
        /// Host to bind to
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
}
