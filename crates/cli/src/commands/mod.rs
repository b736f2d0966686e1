//! Subcommand implementations.

pub mod migrate;
pub mod user;

use secrecy::{ExposeSecret, SecretString};
use sqlx::PgPool;

/// Read the database URL from `JAPEM_DATABASE_URL` (or `DATABASE_URL`).
fn database_url() -> Option<SecretString> {
    dotenvy::dotenv().ok();

    std::env::var("JAPEM_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .ok()
        .filter(|v| !v.trim().is_empty())
        .map(SecretString::from)
}

/// Connect to the configured database.
async fn connect() -> Result<PgPool, ConnectError> {
    let url = database_url().ok_or(ConnectError::MissingEnvVar("JAPEM_DATABASE_URL"))?;

    tracing::info!("Connecting to database...");
    let options = japem_api::db::connect_options(url.expose_secret())?;
    Ok(PgPool::connect_with(options).await?)
}

/// Errors raised while opening the database connection.
#[derive(Debug, thiserror::Error)]
pub enum ConnectError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),
}
