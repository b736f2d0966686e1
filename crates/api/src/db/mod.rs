//! Database operations for the JAPEM `PostgreSQL` schema.
//!
//! ## Tables (schema `japem`)
//!
//! - `usuario`, `api_token` - Users and hashed bearer tokens
//! - `producto` - Product catalog (canonical product identity)
//! - `donacion` - Recorded donations
//! - `inventario` - Inventory lots (one receipt of one product)
//! - `iap` - Beneficiary institutions
//! - `asignacion`, `asignacion_detalle` - Allocations and the lots they drew from
//! - `entrega`, `entrega_detalle` - Direct deliveries and the lots they drew from
//!
//! Pool-backed repositories serve reads. Functions that take
//! `&mut PgConnection` are meant to run inside a caller-owned transaction.
//!
//! # Migrations
//!
//! Enum types live in the `japem` schema and are mapped by bare name, so
//! every connection puts `japem` on its `search_path` (see
//! [`connect_options`]).
//!
//! Migrations are stored in `crates/api/migrations/` and run via:
//! ```bash
//! cargo run -p japem-cli -- migrate
//! ```

pub mod asignaciones;
pub mod donaciones;
pub mod entregas;
pub mod iaps;
pub mod inventario;
pub mod productos;
pub mod tokens;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use thiserror::Error;

pub use asignaciones::AsignacionRepository;
pub use donaciones::DonacionRepository;
pub use entregas::EntregaRepository;
pub use iaps::IapRepository;
pub use inventario::InventoryLotRepository;
pub use productos::ProductoRepository;
pub use tokens::TokenRepository;

/// Default page size for listings.
pub const DEFAULT_LIMIT: i64 = 100;
/// Upper bound on page size for listings.
pub const MAX_LIMIT: i64 = 500;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., duplicate product name).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
/// * `max_connections` - Upper bound on pooled connections
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(
    database_url: &secrecy::SecretString,
    max_connections: u32,
) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .min_connections(2.min(max_connections))
        .acquire_timeout(Duration::from_secs(10))
        .connect_with(connect_options(database_url.expose_secret())?)
        .await
}

/// Schemas searched for unqualified names. `public` stays first so
/// `_sqlx_migrations` keeps living there.
pub const SEARCH_PATH: &str = "public,japem";

/// Parse a connection string and put `japem` on the `search_path`.
///
/// # Errors
///
/// Returns `sqlx::Error::Configuration` if the URL is malformed.
pub fn connect_options(database_url: &str) -> Result<PgConnectOptions, sqlx::Error> {
    Ok(database_url
        .parse::<PgConnectOptions>()?
        .options([("search_path", SEARCH_PATH)]))
}

/// Clamp a user-supplied page size into `1..=MAX_LIMIT`.
#[must_use]
pub fn clamp_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
}

/// Map a unique-violation into `RepositoryError::Conflict`.
pub(crate) fn map_unique_violation(err: sqlx::Error, message: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = err
        && db_err.is_unique_violation()
    {
        return RepositoryError::Conflict(message.to_owned());
    }
    RepositoryError::Database(err)
}
