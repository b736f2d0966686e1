//! JAPEM CLI - Database migrations and user/token management.
//!
//! # Usage
//!
//! ```bash
//! # Apply pending migrations
//! japem-cli migrate
//!
//! # Create a user and print their first API token
//! japem-cli user create -e ana@japem.example -n "Ana Ruiz" -r operador
//!
//! # Issue another token for an existing user
//! japem-cli token issue -e ana@japem.example
//!
//! # Revoke every active token of a user
//! japem-cli token revoke -e ana@japem.example
//! ```
//!
//! # Environment Variables
//!
//! - `JAPEM_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "japem-cli")]
#[command(author, version, about = "JAPEM CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage API users
    User {
        #[command(subcommand)]
        action: UserAction,
    },
    /// Manage bearer tokens
    Token {
        #[command(subcommand)]
        action: TokenAction,
    },
}

#[derive(Subcommand)]
enum UserAction {
    /// Create a user and issue their first token
    Create {
        /// User email address
        #[arg(short, long)]
        email: String,

        /// Display name
        #[arg(short, long)]
        name: String,

        /// Role (`admin`, `operador`, `consulta`)
        #[arg(short, long, default_value = "operador")]
        role: String,
    },
}

#[derive(Subcommand)]
enum TokenAction {
    /// Issue a new token for an existing user
    Issue {
        /// User email address
        #[arg(short, long)]
        email: String,
    },
    /// Revoke all active tokens of a user
    Revoke {
        /// User email address
        #[arg(short, long)]
        email: String,
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
        Commands::User { action } => match action {
            UserAction::Create { email, name, role } => {
                commands::user::create_user(&email, &name, &role).await?;
            }
        },
        Commands::Token { action } => match action {
            TokenAction::Issue { email } => commands::user::issue_token(&email).await?,
            TokenAction::Revoke { email } => commands::user::revoke_tokens(&email).await?,
        },
    }
    Ok(())
}
