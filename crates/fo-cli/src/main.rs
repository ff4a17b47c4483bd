//! fo-ldap-check - validate LDAP settings and test credentials
//!
//! Reads the same `ldap.toml` the web application uses.

mod config;

use anyhow::Context;
use clap::{Parser, Subcommand};
use fo_auth::AuthClient;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "fo-ldap-check")]
#[command(version = fo_auth::VERSION)]
#[command(about = "Validate LDAP settings and test directory credentials", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, global = true, env = "FO_LDAP_CONFIG", default_value = "ldap.toml")]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "FO_LOG_LEVEL", default_value = "info")]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate the configuration and print it
    Validate,

    /// Authenticate a user against the directory
    Auth {
        /// Username to look up
        #[arg(short, long)]
        username: String,

        /// Password to bind with
        #[arg(short, long, env = "FO_LDAP_PASSWORD", hide_env_values = true)]
        password: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(filter)
        .init();

    let config = config::load(&cli.config)
        .with_context(|| format!("invalid LDAP configuration in {}", cli.config.display()))?;
    debug!("Loaded LDAP config: {:?}", config);

    match cli.command {
        Commands::Validate => {
            println!("{}", config::describe(&config));
            Ok(ExitCode::SUCCESS)
        }
        Commands::Auth { username, password } => {
            let client = AuthClient::new(config);

            if client.authenticate(&username, &password).await.is_authenticated() {
                println!("authenticated");
                Ok(ExitCode::SUCCESS)
            } else {
                println!("not authenticated");
                Ok(ExitCode::FAILURE)
            }
        }
    }
}
