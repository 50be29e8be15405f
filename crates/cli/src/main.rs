//! `ShopLite` CLI - database migrations, seed data and account management.
//!
//! # Usage
//!
//! ```bash
//! # Apply storefront migrations
//! shoplite-cli migrate
//!
//! # Load the built-in demo catalog and accounts
//! shoplite-cli seed
//!
//! # Load seed data from a YAML file instead
//! shoplite-cli seed --file seed/default.yaml
//!
//! # Create an administrator
//! shoplite-cli admin create -u ops -e ops@example.com -p 'change-me'
//! ```
//!
//! # Environment Variables
//!
//! - `SHOPLITE_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "shoplite-cli")]
#[command(author, version, about = "ShopLite CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Seed categories, products and demo accounts
    Seed {
        /// YAML file to load instead of the built-in data
        #[arg(short, long)]
        file: Option<String>,
    },
    /// Manage administrator accounts
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
}

#[derive(Subcommand)]
enum AdminAction {
    /// Create a new ADMIN user
    Create {
        /// Login name (3-50 characters)
        #[arg(short, long)]
        username: String,

        /// Email address
        #[arg(short, long)]
        email: String,

        /// Password (at least 6 characters)
        #[arg(short, long)]
        password: String,
    },
}

#[tokio::main]
async fn main() {
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
        Commands::Seed { file } => commands::seed::run(file.as_deref()).await?,
        Commands::Admin { action } => match action {
            AdminAction::Create {
                username,
                email,
                password,
            } => {
                commands::admin::create_user(&username, &email, &password).await?;
            }
        },
    }
    Ok(())
}
