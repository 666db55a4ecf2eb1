//! Scatch CLI - database migrations and management tools.
//!
//! # Usage
//!
//! ```bash
//! # Run storefront database migrations
//! scatch-cli migrate
//!
//! # Seed the bundled demo catalog (only into an empty catalog)
//! scatch-cli seed
//!
//! # Seed from a file and give sold-out products fresh stock
//! scatch-cli seed --file catalog.yaml --restock
//!
//! # Create an owner account
//! scatch-cli admin create -e owner@example.com -n "Owner Name" -p 'a long password'
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "scatch-cli")]
#[command(author, version, about = "Scatch CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Seed the product catalog
    Seed {
        /// YAML catalog file (defaults to the bundled demo catalog)
        #[arg(short, long)]
        file: Option<String>,

        /// Give every sold-out product fresh stock
        #[arg(long)]
        restock: bool,
    },
    /// Manage owner accounts
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
}

#[derive(Subcommand)]
enum AdminAction {
    /// Create a new owner account
    Create {
        /// Owner email address
        #[arg(short, long)]
        email: String,

        /// Owner display name
        #[arg(short, long)]
        name: String,

        /// Owner password (at least 8 characters)
        #[arg(short, long)]
        password: String,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Seed { file, restock } => {
            commands::seed::catalog(file.as_deref(), restock).await?;
        }
        Commands::Admin { action } => match action {
            AdminAction::Create {
                email,
                name,
                password,
            } => {
                commands::admin::create_user(&email, &name, &password).await?;
            }
        },
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_seed_flags_parse() {
        let cli = Cli::try_parse_from(["scatch-cli", "seed", "--file", "bags.yaml", "--restock"]);
        assert!(matches!(
            cli.map(|c| c.command),
            Ok(Commands::Seed { file: Some(ref f), restock: true }) if f == "bags.yaml"
        ));
    }
}
