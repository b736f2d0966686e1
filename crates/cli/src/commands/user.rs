//! User and bearer token management.
//!
//! Tokens are printed once to stdout and stored only as SHA-256 digests;
//! a lost token cannot be recovered, only revoked and reissued.

use japem_api::db::{RepositoryError, TokenRepository};
use japem_api::models::Usuario;
use japem_api::services::{generate_token, hash_token};
use japem_core::UserRole;
use sqlx::PgPool;
use thiserror::Error;

use super::{ConnectError, connect};

/// Errors that can occur during user operations.
#[derive(Debug, Error)]
pub enum UserError {
    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("Invalid role: {0}. Valid roles: admin, operador, consulta")]
    InvalidRole(String),

    #[error("Invalid email: {0}")]
    InvalidEmail(String),

    #[error("Name must not be empty")]
    EmptyName,

    #[error("No user with email: {0}")]
    UnknownUser(String),
}

/// Create a user and print their first token.
pub async fn create_user(email: &str, name: &str, role: &str) -> Result<(), UserError> {
    let role: UserRole = role
        .parse()
        .map_err(|_| UserError::InvalidRole(role.to_owned()))?;

    // Basic email validation
    if !email.contains('@') || !email.contains('.') {
        return Err(UserError::InvalidEmail(email.to_owned()));
    }
    if name.trim().is_empty() {
        return Err(UserError::EmptyName);
    }

    let pool = connect().await?;
    let repo = TokenRepository::new(&pool);

    let user = repo.create_user(email, name, role).await?;
    tracing::info!(
        "User created! ID: {}, Email: {}, Role: {}",
        user.id,
        user.email,
        user.rol
    );

    issue_for(&pool, &user).await
}

/// Issue an additional token for an existing user.
pub async fn issue_token(email: &str) -> Result<(), UserError> {
    let pool = connect().await?;
    let user = find_user(&pool, email).await?;

    issue_for(&pool, &user).await
}

/// Revoke every active token of a user.
pub async fn revoke_tokens(email: &str) -> Result<(), UserError> {
    let pool = connect().await?;
    let user = find_user(&pool, email).await?;

    let revoked = TokenRepository::new(&pool).revoke_all(user.id).await?;
    tracing::info!("Revoked {} token(s) for {}", revoked, user.email);

    Ok(())
}

async fn find_user(pool: &PgPool, email: &str) -> Result<Usuario, UserError> {
    TokenRepository::new(pool)
        .find_user_by_email(email)
        .await?
        .ok_or_else(|| UserError::UnknownUser(email.to_owned()))
}

async fn issue_for(pool: &PgPool, user: &Usuario) -> Result<(), UserError> {
    let token = generate_token();
    let token_id = TokenRepository::new(pool)
        .insert_token(user.id, &hash_token(&token))
        .await?;

    tracing::info!("Token {} issued for {}", token_id, user.email);

    #[allow(clippy::print_stdout)]
    {
        println!("{token}");
    }

    Ok(())
}
