use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mcn_auth::cli::{self, Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mcn_auth=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init => cli::commands::init().await,
        Commands::Login {
            phone,
            code,
            login_type,
            no_remember,
        } => cli::commands::login(phone, code, login_type, no_remember).await,
        Commands::Logout => cli::commands::logout().await,
        Commands::Status { format } => cli::commands::status(format).await,
        Commands::Whoami { format } => cli::commands::whoami(format).await,
        Commands::RefreshProfile => cli::commands::refresh_profile().await,
        Commands::Serve { host, port } => cli::commands::serve(host, port).await,
    }
}
